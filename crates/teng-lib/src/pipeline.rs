use crate::{
    detectors::peaks::{find_peaks, peak_values, Peak, PeakSpec},
    error::{AnalysisError, AnalysisResult},
    metrics::{
        energy::{aggregate_cycles, integrate_events, integrate_trapezoid, CycleSummary, Event},
        estimate::Estimate,
        magnitude::{average_peak_magnitude, average_power_peak},
    },
    signal::{derive_channels, Channels},
};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Load and detection parameters for one analysis run.
///
/// Heights are in channel units (V, A, W); separations are sample counts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Resistive load in ohms.
    pub load_resistance: f64,
    pub voltage_min_height_pos: f64,
    pub voltage_min_height_neg: f64,
    pub current_min_height_pos: f64,
    pub current_min_height_neg: f64,
    pub power_min_height: f64,
    pub voltage_min_separation: usize,
    pub current_min_separation: usize,
    pub power_min_separation: usize,
    /// Fraction of the power peak height an event window descends through.
    pub relative_height: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            load_resistance: 40e6,
            voltage_min_height_pos: 50.0,
            voltage_min_height_neg: 40.0,
            current_min_height_pos: 0.7e-6,
            current_min_height_neg: 0.7e-6,
            power_min_height: 5e-5,
            voltage_min_separation: 2000,
            current_min_separation: 2000,
            power_min_separation: 1200,
            relative_height: 0.98,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> AnalysisResult<()> {
        if !(self.load_resistance.is_finite() && self.load_resistance > 0.0) {
            return Err(AnalysisError::InvalidConfig(format!(
                "load_resistance must be positive, got {}",
                self.load_resistance
            )));
        }
        if !(self.relative_height > 0.0 && self.relative_height < 1.0) {
            return Err(AnalysisError::InvalidConfig(format!(
                "relative_height must lie in (0, 1), got {}",
                self.relative_height
            )));
        }
        let heights = [
            ("voltage_min_height_pos", self.voltage_min_height_pos),
            ("voltage_min_height_neg", self.voltage_min_height_neg),
            ("current_min_height_pos", self.current_min_height_pos),
            ("current_min_height_neg", self.current_min_height_neg),
            ("power_min_height", self.power_min_height),
        ];
        for (name, value) in heights {
            if value.is_nan() {
                return Err(AnalysisError::InvalidConfig(format!("{} is NaN", name)));
            }
        }
        Ok(())
    }

    pub fn voltage_specs(&self) -> (PeakSpec, PeakSpec) {
        (
            PeakSpec::positive(self.voltage_min_height_pos, self.voltage_min_separation),
            PeakSpec::negative(self.voltage_min_height_neg, self.voltage_min_separation),
        )
    }

    pub fn current_specs(&self) -> (PeakSpec, PeakSpec) {
        (
            PeakSpec::positive(self.current_min_height_pos, self.current_min_separation),
            PeakSpec::negative(self.current_min_height_neg, self.current_min_separation),
        )
    }

    pub fn power_spec(&self) -> PeakSpec {
        PeakSpec::positive(self.power_min_height, self.power_min_separation)
    }
}

/// Peak sequences per channel and polarity, each in index order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelPeaks {
    pub voltage_positive: Vec<Peak>,
    pub voltage_negative: Vec<Peak>,
    pub current_positive: Vec<Peak>,
    pub current_negative: Vec<Peak>,
    pub power: Vec<Peak>,
}

impl ChannelPeaks {
    pub fn detect(channels: &Channels, config: &AnalysisConfig) -> AnalysisResult<Self> {
        let time = &channels.time;
        let (v_pos, v_neg) = config.voltage_specs();
        let (i_pos, i_neg) = config.current_specs();
        Ok(Self {
            voltage_positive: find_peaks(time, &channels.voltage, &v_pos)?,
            voltage_negative: find_peaks(time, &channels.voltage, &v_neg)?,
            current_positive: find_peaks(time, &channels.current, &i_pos)?,
            current_negative: find_peaks(time, &channels.current, &i_neg)?,
            power: find_peaks(time, &channels.power, &config.power_spec())?,
        })
    }
}

/// Everything a report or plot needs from one recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub sample_count: usize,
    pub duration: f64,
    pub load_resistance: f64,
    pub peaks: ChannelPeaks,
    pub average_voltage: Estimate,
    pub average_current: Estimate,
    /// Power peaks summed per cycle, assuming two peaks per actuation
    pub average_power: Estimate,
    /// Odd number of power peaks: one has no partner in `average_power`
    pub power_peaks_unpaired: bool,
    pub events: Vec<Event>,
    /// Sum of all event energies (J)
    pub total_energy: f64,
    /// Integral of power over the whole recording (J)
    pub signal_energy: f64,
    #[serde(flatten)]
    pub cycles: CycleSummary,
}

impl AnalysisSummary {
    pub fn from_channels(channels: &Channels, config: &AnalysisConfig) -> AnalysisResult<Self> {
        config.validate()?;
        let peaks = ChannelPeaks::detect(channels, config)?;
        let average_voltage = average_peak_magnitude(
            &peak_values(&peaks.voltage_positive),
            &peak_values(&peaks.voltage_negative),
        );
        let average_current = average_peak_magnitude(
            &peak_values(&peaks.current_positive),
            &peak_values(&peaks.current_negative),
        );
        let average_power = average_power_peak(&peak_values(&peaks.power));
        let events = integrate_events(
            &channels.time,
            &channels.power,
            &peaks.power,
            config.relative_height,
        )?;
        let total_energy = events.iter().map(|e| e.energy).sum();
        let signal_energy = integrate_trapezoid(&channels.time, &channels.power);
        let cycles = aggregate_cycles(&events);
        debug!(
            "voltage peaks {}+/{}-, current peaks {}+/{}-, power peaks {}",
            peaks.voltage_positive.len(),
            peaks.voltage_negative.len(),
            peaks.current_positive.len(),
            peaks.current_negative.len(),
            peaks.power.len()
        );
        Ok(Self {
            sample_count: channels.len(),
            duration: match (channels.time.first(), channels.time.last()) {
                (Some(first), Some(last)) => last - first,
                _ => 0.0,
            },
            load_resistance: channels.load_resistance,
            power_peaks_unpaired: peaks.power.len() % 2 == 1,
            peaks,
            average_voltage,
            average_current,
            average_power,
            events,
            total_energy,
            signal_energy,
            cycles,
        })
    }
}

/// Derived channels together with their summary.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub channels: Channels,
    pub summary: AnalysisSummary,
}

/// Run derivation, peak detection, event integration and cycle aggregation.
pub fn run_analysis(
    time: &[f64],
    voltage: &[f64],
    config: &AnalysisConfig,
) -> AnalysisResult<Analysis> {
    config.validate()?;
    let channels = derive_channels(time, voltage, config.load_resistance)?;
    let summary = AnalysisSummary::from_channels(&channels, config)?;
    info!(
        "analyzed {} samples: {} events, {} cycles, total energy {:.3e} J",
        summary.sample_count,
        summary.events.len(),
        summary.cycles.cycles.len(),
        summary.total_energy
    );
    Ok(Analysis { channels, summary })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f64 = 1e-4;
    const HALF: usize = 30;

    /// Each actuation: +`pos` V pulse at 200, -`neg` V pulse at 700, period 1000.
    fn recording(pulses: &[(f64, f64)]) -> (Vec<f64>, Vec<f64>) {
        let n = pulses.len() * 1_000 + 200;
        let time: Vec<f64> = (0..n).map(|i| i as f64 * DT).collect();
        let mut voltage = vec![0.0; n];
        for (k, &(pos, neg)) in pulses.iter().enumerate() {
            for (centre, amp) in [(k * 1_000 + 200, pos), (k * 1_000 + 700, -neg)] {
                for (i, v) in voltage.iter_mut().enumerate() {
                    let d = i.abs_diff(centre);
                    if d < HALF {
                        *v += amp * (1.0 - d as f64 / HALF as f64);
                    }
                }
            }
        }
        (time, voltage)
    }

    fn config() -> AnalysisConfig {
        AnalysisConfig {
            voltage_min_separation: 300,
            current_min_separation: 300,
            power_min_separation: 300,
            ..AnalysisConfig::default()
        }
    }

    fn assert_close(a: f64, b: f64, rel: f64) {
        assert!((a - b).abs() <= rel * b.abs(), "{} vs {}", a, b);
    }

    #[test]
    fn full_cycles_produce_complete_summary() {
        let (time, voltage) = recording(&[(100.0, 80.0); 5]);
        let cfg = config();
        let analysis = run_analysis(&time, &voltage, &cfg).unwrap();
        let s = &analysis.summary;

        assert_eq!(s.peaks.voltage_positive.len(), 5);
        assert_eq!(s.peaks.voltage_negative.len(), 5);
        assert_eq!(s.peaks.current_positive.len(), 5);
        assert_eq!(s.peaks.current_negative.len(), 5);
        assert_eq!(s.peaks.power.len(), 10);
        assert_close(s.average_voltage.value().unwrap(), 180.0, 1e-12);
        assert_close(s.average_current.value().unwrap(), 180.0 / 40e6, 1e-12);
        let p_pos = 100.0_f64.powi(2) / 40e6;
        let p_neg = 80.0_f64.powi(2) / 40e6;
        assert_close(s.average_power.value().unwrap(), p_pos + p_neg, 1e-12);
        assert!(!s.power_peaks_unpaired);

        assert_eq!(s.events.len(), 10);
        assert_eq!(s.cycles.cycles.len(), 5);
        assert_eq!(s.cycles.excluded_event, None);
        // Squared triangle: area = peak * 2/3 * half-width.
        let cycle_energy = (p_pos + p_neg) * 2.0 / 3.0 * HALF as f64 * DT;
        for cycle in &s.cycles.cycles {
            assert_close(cycle.energy, cycle_energy, 0.03);
        }
        assert_close(
            s.cycles.average_cycle_energy.value().unwrap(),
            cycle_energy,
            0.03,
        );
        assert_close(s.total_energy, 5.0 * cycle_energy, 0.03);
        assert!(s.total_energy <= s.signal_energy);
        assert_eq!(analysis.channels.power.len(), time.len());
    }

    #[test]
    fn missing_negative_pulse_makes_voltage_unavailable() {
        let mut pulses = vec![(100.0, 80.0); 5];
        pulses.push((100.0, 0.0));
        let (time, voltage) = recording(&pulses);
        let s = run_analysis(&time, &voltage, &config()).unwrap().summary;

        assert_eq!(s.peaks.voltage_positive.len(), 6);
        assert_eq!(s.peaks.voltage_negative.len(), 5);
        assert_eq!(s.average_voltage, Estimate::Unavailable);
        assert_eq!(s.average_current, Estimate::Unavailable);
        assert_eq!(s.peaks.power.len(), 11);
        assert!(s.power_peaks_unpaired);
        assert_eq!(s.cycles.cycles.len(), 5);
        assert_eq!(s.cycles.excluded_event, Some(10));
    }

    #[test]
    fn quiet_recording_reports_unavailable_not_zero() {
        let (time, voltage) = recording(&[(10.0, 10.0); 3]);
        let s = run_analysis(&time, &voltage, &config()).unwrap().summary;
        assert!(s.events.is_empty());
        assert_eq!(s.total_energy, 0.0);
        assert_eq!(s.average_voltage, Estimate::Unavailable);
        assert_eq!(s.average_power, Estimate::Unavailable);
        assert_eq!(s.cycles.average_cycle_energy, Estimate::Unavailable);
    }

    #[test]
    fn shape_mismatch_aborts() {
        let err = run_analysis(&[0.0, 1.0, 2.0], &[0.0, 1.0], &AnalysisConfig::default());
        assert!(matches!(err, Err(AnalysisError::ShapeMismatch { .. })));
    }

    #[test]
    fn validate_rejects_out_of_range_parameters() {
        let bad_load = AnalysisConfig {
            load_resistance: -1.0,
            ..AnalysisConfig::default()
        };
        assert!(bad_load.validate().is_err());
        let bad_height = AnalysisConfig {
            relative_height: 1.0,
            ..AnalysisConfig::default()
        };
        assert!(bad_height.validate().is_err());
        assert!(AnalysisConfig::default().validate().is_ok());
    }

    #[test]
    fn summary_serializes_unavailable_as_null() {
        let (time, voltage) = recording(&[(10.0, 10.0)]);
        let s = run_analysis(&time, &voltage, &config()).unwrap().summary;
        let js: serde_json::Value = serde_json::to_value(&s).unwrap();
        assert!(js["average_cycle_energy"].is_null());
        assert!(js["average_voltage"].is_null());
        assert_eq!(js["cycles"].as_array().map(Vec::len), Some(0));
    }
}
