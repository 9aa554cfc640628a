pub mod analyser;
pub mod capture;
pub mod source;

pub use analyser::SpectrumAnalyser;
pub use capture::MicSource;
pub use source::{FrameSource, ScriptedSource};
