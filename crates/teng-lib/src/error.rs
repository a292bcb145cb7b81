use thiserror::Error;

pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Failures raised by the analysis core.
///
/// Results that merely could not be computed (peak-count mismatch, no complete
/// cycle) are not errors; they are reported as [`crate::metrics::Estimate::Unavailable`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("time has {time} samples but values have {values}")]
    ShapeMismatch { time: usize, values: usize },
    #[error("time is not strictly increasing at sample {index}")]
    NonMonotonicTime { index: usize },
    #[error("need at least {needed} samples, got {got}")]
    InsufficientSamples { needed: usize, got: usize },
    #[error("index {index} is out of range for {len} samples")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
