pub mod detectors;
pub mod error;
pub mod io;
pub mod metrics;
pub mod pipeline;
pub mod plot;
pub mod report;
pub mod signal;

pub use detectors::*;
pub use error::{AnalysisError, AnalysisResult};
pub use metrics::*;
pub use pipeline::*;
pub use signal::*;
