pub mod bands;
pub mod config;
pub mod error;
pub mod pitch;

pub use crate::bands::{FrequencyBand, ONSET_BANDS};
pub use crate::config::AnalyserConfig;
pub use crate::error::CaptureError;
pub use crate::pitch::PitchClass;
