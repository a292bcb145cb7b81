use crate::error::{AnalysisError, AnalysisResult};
use serde::{Deserialize, Serialize};

/// Sampled waveform with an explicit (possibly non-uniform) time axis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Waveform {
    /// Sample times in seconds, strictly increasing
    pub time: Vec<f64>,
    /// Sample values
    pub values: Vec<f64>,
}

impl Waveform {
    pub fn new(time: Vec<f64>, values: Vec<f64>) -> AnalysisResult<Self> {
        check_shape(&time, &values)?;
        check_monotonic(&time)?;
        Ok(Self { time, values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn duration(&self) -> f64 {
        match (self.time.first(), self.time.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }

    /// `[time, value]` pairs, the shape the plot model consumes.
    pub fn points(&self) -> Vec<[f64; 2]> {
        self.time
            .iter()
            .zip(&self.values)
            .map(|(t, v)| [*t, *v])
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Voltage,
    Current,
    Power,
}

impl ChannelKind {
    pub fn label(&self) -> &'static str {
        match self {
            ChannelKind::Voltage => "Voltage",
            ChannelKind::Current => "Current",
            ChannelKind::Power => "Power",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            ChannelKind::Voltage => "V",
            ChannelKind::Current => "A",
            ChannelKind::Power => "W",
        }
    }
}

/// Voltage plus the current and power it drives through a resistive load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channels {
    pub time: Vec<f64>,
    pub voltage: Vec<f64>,
    pub current: Vec<f64>,
    pub power: Vec<f64>,
    /// Load resistance in ohms
    pub load_resistance: f64,
}

impl Channels {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn values(&self, kind: ChannelKind) -> &[f64] {
        match kind {
            ChannelKind::Voltage => &self.voltage,
            ChannelKind::Current => &self.current,
            ChannelKind::Power => &self.power,
        }
    }
}

/// Derive current (`v / R`) and power (`v * i`) from a voltage recording.
pub fn derive_channels(
    time: &[f64],
    voltage: &[f64],
    load_resistance: f64,
) -> AnalysisResult<Channels> {
    check_shape(time, voltage)?;
    check_monotonic(time)?;
    if !(load_resistance.is_finite() && load_resistance > 0.0) {
        return Err(AnalysisError::InvalidConfig(format!(
            "load resistance must be positive, got {}",
            load_resistance
        )));
    }
    let current: Vec<f64> = voltage.iter().map(|v| v / load_resistance).collect();
    let power = voltage.iter().zip(&current).map(|(v, i)| v * i).collect();
    Ok(Channels {
        time: time.to_vec(),
        voltage: voltage.to_vec(),
        current,
        power,
        load_resistance,
    })
}

fn check_shape(time: &[f64], values: &[f64]) -> AnalysisResult<()> {
    if time.len() != values.len() {
        return Err(AnalysisError::ShapeMismatch {
            time: time.len(),
            values: values.len(),
        });
    }
    Ok(())
}

fn check_monotonic(time: &[f64]) -> AnalysisResult<()> {
    match time.windows(2).position(|w| !(w[1] > w[0])) {
        Some(pos) => Err(AnalysisError::NonMonotonicTime { index: pos + 1 }),
        None => Ok(()),
    }
}
