//! Local-extremum detection with amplitude and separation constraints.
//!
//! Follows the candidate/height/distance sequence of `scipy.signal.find_peaks`
//! so results line up with exports analyzed in notebooks.

use crate::error::{AnalysisError, AnalysisResult};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Positive,
    Negative,
}

impl Polarity {
    fn orient(self, value: f64) -> f64 {
        match self {
            Polarity::Positive => value,
            Polarity::Negative => -value,
        }
    }
}

/// Detection parameters for one channel and polarity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakSpec {
    /// Minimum magnitude, measured on the un-negated signal for negative peaks.
    pub min_height: f64,
    /// Minimum index distance between two retained peaks.
    pub min_separation: usize,
    pub polarity: Polarity,
}

impl PeakSpec {
    pub fn positive(min_height: f64, min_separation: usize) -> Self {
        Self {
            min_height,
            min_separation,
            polarity: Polarity::Positive,
        }
    }

    pub fn negative(min_height: f64, min_separation: usize) -> Self {
        Self {
            min_height,
            min_separation,
            polarity: Polarity::Negative,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    pub index: usize,
    pub time: f64,
    /// Signed value of the channel at `index`
    pub value: f64,
    pub polarity: Polarity,
}

/// Detect peaks and attach their time stamps and signed values.
pub fn find_peaks(time: &[f64], signal: &[f64], spec: &PeakSpec) -> AnalysisResult<Vec<Peak>> {
    if time.len() != signal.len() {
        return Err(AnalysisError::ShapeMismatch {
            time: time.len(),
            values: signal.len(),
        });
    }
    Ok(peak_indices(signal, spec)
        .into_iter()
        .map(|index| Peak {
            index,
            time: time[index],
            value: signal[index],
            polarity: spec.polarity,
        })
        .collect())
}

/// Peak indices in ascending order.
pub fn peak_indices(signal: &[f64], spec: &PeakSpec) -> Vec<usize> {
    if signal.len() < 3 {
        warn!(
            "peak detection skipped: need at least 3 samples, got {}",
            signal.len()
        );
        return Vec::new();
    }
    let oriented: Vec<f64> = signal.iter().map(|v| spec.polarity.orient(*v)).collect();
    let mut peaks = local_maxima(&oriented);
    let candidates = peaks.len();
    peaks.retain(|&idx| oriented[idx] >= spec.min_height);
    let above_height = peaks.len();
    let peaks = select_by_separation(&oriented, &peaks, spec.min_separation);
    debug!(
        "{:?} peaks: {} candidates, {} above {}, {} kept at separation {}",
        spec.polarity,
        candidates,
        above_height,
        spec.min_height,
        peaks.len(),
        spec.min_separation
    );
    peaks
}

/// Interior local maxima. A flat top counts once, at its first sample, when
/// both neighbouring non-equal samples are lower.
pub fn local_maxima(x: &[f64]) -> Vec<usize> {
    let mut out = Vec::new();
    if x.len() < 3 {
        return out;
    }
    let last = x.len() - 1;
    let mut i = 1;
    while i < last {
        if x[i - 1] < x[i] {
            let mut ahead = i + 1;
            while ahead < last && x[ahead] == x[i] {
                ahead += 1;
            }
            if x[ahead] < x[i] {
                out.push(i);
                i = ahead;
            }
        }
        i += 1;
    }
    out
}

/// Greedy distance filter: the highest remaining candidate wins and removes
/// every neighbour closer than `min_separation`. Equal heights favour the later
/// index. `candidates` must be sorted ascending; so is the result.
pub fn select_by_separation(x: &[f64], candidates: &[usize], min_separation: usize) -> Vec<usize> {
    if min_separation <= 1 || candidates.len() < 2 {
        return candidates.to_vec();
    }
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|&a, &b| {
        x[candidates[a]]
            .total_cmp(&x[candidates[b]])
            .then(a.cmp(&b))
    });

    let mut keep = vec![true; candidates.len()];
    for &j in order.iter().rev() {
        if !keep[j] {
            continue;
        }
        let centre = candidates[j];
        let mut k = j;
        while k > 0 && centre - candidates[k - 1] < min_separation {
            keep[k - 1] = false;
            k -= 1;
        }
        let mut k = j + 1;
        while k < candidates.len() && candidates[k] - centre < min_separation {
            keep[k] = false;
            k += 1;
        }
    }

    candidates
        .iter()
        .zip(keep)
        .filter_map(|(&idx, kept)| kept.then_some(idx))
        .collect()
}

/// Signed values of a peak sequence.
pub fn peak_values(peaks: &[Peak]) -> Vec<f64> {
    peaks.iter().map(|p| p.value).collect()
}
