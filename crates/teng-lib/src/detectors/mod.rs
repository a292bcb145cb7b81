pub mod peaks;

pub use peaks::*;
