use super::estimate::Estimate;
use crate::error::{AnalysisError, AnalysisResult};
use crate::signal::Waveform;
use serde::{Deserialize, Serialize};

/// Charging curve landmarks of a capacitor fed by the generator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChargingProfile {
    pub max_voltage: f64,
    pub max_index: usize,
    pub time_at_max: f64,
    /// Fraction of `max_voltage` used for `time_to_fraction`
    pub fraction: f64,
    /// Time of the first sample at or above `fraction * max_voltage`
    pub time_to_fraction: Estimate,
}

pub fn charging_profile(waveform: &Waveform, fraction: f64) -> AnalysisResult<ChargingProfile> {
    if waveform.is_empty() {
        return Err(AnalysisError::InsufficientSamples { needed: 1, got: 0 });
    }
    if !(fraction > 0.0 && fraction <= 1.0) {
        return Err(AnalysisError::InvalidConfig(format!(
            "charging fraction must lie in (0, 1], got {}",
            fraction
        )));
    }
    let mut max_index = 0;
    for (i, v) in waveform.values.iter().enumerate() {
        if *v > waveform.values[max_index] {
            max_index = i;
        }
    }
    let max_voltage = waveform.values[max_index];
    let target = fraction * max_voltage;
    let time_to_fraction = waveform
        .values
        .iter()
        .position(|v| *v >= target)
        .map(|i| waveform.time[i])
        .into();
    Ok(ChargingProfile {
        max_voltage,
        max_index,
        time_at_max: waveform.time[max_index],
        fraction,
        time_to_fraction,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rc_curve(tau: f64, v_inf: f64, n: usize, dt: f64) -> Waveform {
        let time: Vec<f64> = (0..n).map(|i| i as f64 * dt).collect();
        let values = time.iter().map(|t| v_inf * (1.0 - (-t / tau).exp())).collect();
        Waveform::new(time, values).unwrap()
    }

    #[test]
    fn finds_maximum_and_ninety_percent_point() {
        let wf = rc_curve(2.0, 10.0, 2_001, 0.01);
        let profile = charging_profile(&wf, 0.9).unwrap();
        assert_eq!(profile.max_index, 2_000);
        assert!((profile.time_at_max - 20.0).abs() < 1e-9);
        let t90 = profile.time_to_fraction.value().unwrap();
        let expected = -2.0 * (1.0 - 0.9 * profile.max_voltage / 10.0).ln();
        assert!((t90 - expected).abs() < 0.011, "{} vs {}", t90, expected);
    }

    #[test]
    fn first_maximum_wins_on_ties() {
        let wf = Waveform::new(vec![0.0, 1.0, 2.0, 3.0], vec![1.0, 4.0, 4.0, 2.0]).unwrap();
        let profile = charging_profile(&wf, 0.9).unwrap();
        assert_eq!(profile.max_index, 1);
        assert_eq!(profile.time_to_fraction, Estimate::Value(1.0));
    }

    #[test]
    fn empty_waveform_is_an_error() {
        let wf = Waveform::new(Vec::new(), Vec::new()).unwrap();
        assert_eq!(
            charging_profile(&wf, 0.9),
            Err(AnalysisError::InsufficientSamples { needed: 1, got: 0 })
        );
    }
}
