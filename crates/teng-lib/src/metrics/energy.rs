//! Event windows, per-event energy and cycle aggregation for the power channel.

use super::estimate::Estimate;
use crate::detectors::peaks::Peak;
use crate::error::{AnalysisError, AnalysisResult};
use log::debug;
use serde::{Deserialize, Serialize};

/// Sample bounds of one event around a peak.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakWindow {
    pub left_index: usize,
    pub right_index: usize,
    pub left_time: f64,
    pub right_time: f64,
}

/// One integrated excursion of the power channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub peak: Peak,
    pub window: PeakWindow,
    /// Joules
    pub energy: f64,
    /// Seconds
    pub duration: f64,
}

/// Two consecutive events: contact and separation of one actuation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cycle {
    pub first: Event,
    pub second: Event,
    pub energy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleSummary {
    pub cycles: Vec<Cycle>,
    /// Position of the trailing event left without a partner
    pub excluded_event: Option<usize>,
    pub average_cycle_energy: Estimate,
}

/// Fractional crossing positions `(left, right)` where the channel first
/// descends to `peak * (1 - rel_height)` on each side of `peak_index`.
pub fn crossing_points(
    channel: &[f64],
    peak_index: usize,
    rel_height: f64,
) -> AnalysisResult<(f64, f64)> {
    if peak_index >= channel.len() {
        return Err(AnalysisError::IndexOutOfRange {
            index: peak_index,
            len: channel.len(),
        });
    }
    if !(rel_height > 0.0 && rel_height < 1.0) {
        return Err(AnalysisError::InvalidConfig(format!(
            "relative height must lie in (0, 1), got {}",
            rel_height
        )));
    }
    let peak = channel[peak_index];
    let reference = peak * (1.0 - rel_height);
    if !(peak > 0.0) {
        return Ok((peak_index as f64, peak_index as f64));
    }

    let last = channel.len() - 1;
    let mut i = peak_index;
    while i > 0 && channel[i] > reference {
        i -= 1;
    }
    let mut left = i as f64;
    if channel[i] < reference {
        left += (reference - channel[i]) / (channel[i + 1] - channel[i]);
    }

    let mut i = peak_index;
    while i < last && channel[i] > reference {
        i += 1;
    }
    let mut right = i as f64;
    if channel[i] < reference {
        right -= (reference - channel[i]) / (channel[i - 1] - channel[i]);
    }
    Ok((left, right))
}

/// Event window from the relative-height rule: crossings floored/ceiled to
/// whole samples and clamped to the channel.
pub fn compute_window(
    time: &[f64],
    channel: &[f64],
    peak_index: usize,
    rel_height: f64,
) -> AnalysisResult<PeakWindow> {
    if time.len() != channel.len() {
        return Err(AnalysisError::ShapeMismatch {
            time: time.len(),
            values: channel.len(),
        });
    }
    let (left, right) = crossing_points(channel, peak_index, rel_height)?;
    let last = channel.len() - 1;
    let left_index = (left.floor().max(0.0) as usize).min(peak_index);
    let right_index = (right.ceil() as usize).clamp(peak_index, last);
    Ok(PeakWindow {
        left_index,
        right_index,
        left_time: time[left_index],
        right_time: time[right_index],
    })
}

/// Trapezoidal integral of `values` over `time`.
pub fn integrate_trapezoid(time: &[f64], values: &[f64]) -> f64 {
    time.windows(2)
        .zip(values.windows(2))
        .map(|(t, v)| 0.5 * (v[0] + v[1]) * (t[1] - t[0]))
        .sum()
}

/// Energy and duration of one window.
///
/// The integral covers samples `left_index..right_index` (right end
/// exclusive); the duration spans `time[left_index]..time[right_index]`.
/// Windows with fewer than two integrable samples give `(0, 0)`.
pub fn integrate_event(
    time: &[f64],
    power: &[f64],
    window: &PeakWindow,
) -> AnalysisResult<(f64, f64)> {
    if time.len() != power.len() {
        return Err(AnalysisError::ShapeMismatch {
            time: time.len(),
            values: power.len(),
        });
    }
    if window.right_index >= time.len() {
        return Err(AnalysisError::IndexOutOfRange {
            index: window.right_index,
            len: time.len(),
        });
    }
    let (left, right) = (window.left_index, window.right_index);
    if right <= left || right - left < 2 {
        return Ok((0.0, 0.0));
    }
    let energy = integrate_trapezoid(&time[left..right], &power[left..right]);
    Ok((energy, time[right] - time[left]))
}

/// Window and integrate every power peak, preserving peak order.
pub fn integrate_events(
    time: &[f64],
    power: &[f64],
    peaks: &[Peak],
    rel_height: f64,
) -> AnalysisResult<Vec<Event>> {
    peaks
        .iter()
        .map(|peak| {
            let window = compute_window(time, power, peak.index, rel_height)?;
            let (energy, duration) = integrate_event(time, power, &window)?;
            Ok(Event {
                peak: *peak,
                window,
                energy,
                duration,
            })
        })
        .collect()
}

/// Pair events `(0, 1), (2, 3), …` into cycles. An odd trailing event is
/// left out and reported in `excluded_event`.
pub fn aggregate_cycles(events: &[Event]) -> CycleSummary {
    let cycles: Vec<Cycle> = events
        .chunks_exact(2)
        .map(|pair| Cycle {
            first: pair[0],
            second: pair[1],
            energy: pair[0].energy + pair[1].energy,
        })
        .collect();
    let excluded_event = (events.len() % 2 == 1).then(|| events.len() - 1);
    if excluded_event.is_some() {
        debug!(
            "{} events form {} cycles; last event excluded",
            events.len(),
            cycles.len()
        );
    }
    let average_cycle_energy = if cycles.is_empty() {
        Estimate::Unavailable
    } else {
        Estimate::Value(cycles.iter().map(|c| c.energy).sum::<f64>() / cycles.len() as f64)
    };
    CycleSummary {
        cycles,
        excluded_event,
        average_cycle_energy,
    }
}
