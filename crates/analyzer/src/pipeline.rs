use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::info;

use laya_audio::FrameSource;
use laya_domain::{CaptureError, PitchClass};

use crate::key::KeyEstimator;
use crate::tempo::{SpectralFluxTempo, TempoEstimator, ThresholdPeakTempo};
use crate::waveform::WaveformSmoother;

/// Tempo strategy selection. The flux estimator is the default; the
/// global-threshold variant is retained for comparison.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum TempoMode {
    SpectralFlux,
    ThresholdPeak,
}

/// Latest published outputs, replaced wholesale once per tick.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct AnalysisOutput {
    pub waveform: Vec<u8>,
    pub bpm: u16,
    pub key: Option<PitchClass>,
}

impl AnalysisOutput {
    /// Key as the presentation layer expects it: a note name, or an
    /// empty string while unknown.
    pub fn key_label(&self) -> &'static str {
        self.key.map(|k| k.name()).unwrap_or("")
    }
}

/// Per-session estimator state, built on `start` and discarded on `stop`
/// so every session begins cold.
struct Session {
    smoother: WaveformSmoother,
    tempo: Box<dyn TempoEstimator>,
    key: KeyEstimator,
}

/// Drives one frame source through the three estimators, one tick per
/// display-refresh cycle, and publishes the current outputs.
pub struct AnalysisPipeline {
    source: Box<dyn FrameSource>,
    mode: TempoMode,
    session: Option<Session>,
    output: AnalysisOutput,
}

impl AnalysisPipeline {
    pub fn new(source: Box<dyn FrameSource>) -> Self {
        Self::with_mode(source, TempoMode::SpectralFlux)
    }

    pub fn with_mode(source: Box<dyn FrameSource>, mode: TempoMode) -> Self {
        Self {
            source,
            mode,
            session: None,
            output: AnalysisOutput::default(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    /// Opens the frame source and builds fresh estimator state. On
    /// failure the pipeline stays in the not-started state.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        self.source.open()?;
        let config = self.source.config();
        let tempo: Box<dyn TempoEstimator> = match self.mode {
            TempoMode::SpectralFlux => Box::new(SpectralFluxTempo::new(config)),
            TempoMode::ThresholdPeak => Box::new(ThresholdPeakTempo::new(config)),
        };
        self.session = Some(Session {
            smoother: WaveformSmoother::new(),
            tempo,
            key: KeyEstimator::new(Instant::now()),
        });
        self.output = AnalysisOutput::default();
        info!(?config, mode = ?self.mode, "analysis session started");
        Ok(())
    }

    /// Pulls one snapshot pair and routes it through the estimators.
    /// A no-op until `start` has succeeded.
    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    /// `tick` with an injectable clock for the key estimator's gate.
    pub fn tick_at(&mut self, now: Instant) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let time = self.source.time_frame();
        let freq = self.source.freq_frame();
        self.output.waveform = session.smoother.smooth(&time);
        self.output.bpm = session.tempo.estimate(&freq);
        self.output.key = session.key.estimate(&freq, now);
    }

    /// Releases the frame source and discards all session state, so a
    /// subsequent `start` begins from a cold state.
    pub fn stop(&mut self) {
        self.source.close();
        self.session = None;
        self.output = AnalysisOutput::default();
        info!("analysis session stopped");
    }

    pub fn output(&self) -> &AnalysisOutput {
        &self.output
    }
}
