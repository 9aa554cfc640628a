pub mod key;
pub mod pipeline;
pub mod tempo;
pub mod waveform;

pub use crate::key::KeyEstimator;
pub use crate::pipeline::{AnalysisOutput, AnalysisPipeline, TempoMode};
pub use crate::tempo::{SpectralFluxTempo, TempoEstimator, ThresholdPeakTempo};
pub use crate::waveform::WaveformSmoother;
