pub mod config;
pub mod waveform;
