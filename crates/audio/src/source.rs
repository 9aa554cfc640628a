use laya_domain::{AnalyserConfig, CaptureError};

/// Supplier of fixed-length time-domain and frequency-domain byte
/// snapshots. The pipeline never buffers frames itself: each call returns
/// only the current snapshot, so slow consumers simply skip intermediate
/// frames.
///
/// Both frame getters return an empty vector until `open` has succeeded.
pub trait FrameSource {
    fn open(&mut self) -> Result<(), CaptureError>;
    fn time_frame(&mut self) -> Vec<u8>;
    fn freq_frame(&mut self) -> Vec<u8>;
    /// Releases underlying resources. Idempotent.
    fn close(&mut self);
    fn config(&self) -> AnalyserConfig;
}

/// Deterministic frame source driven by pre-built frame scripts. Used to
/// exercise the pipeline without an audio device; each getter advances
/// its own cursor and repeats the last frame once the script runs out.
pub struct ScriptedSource {
    config: AnalyserConfig,
    time_frames: Vec<Vec<u8>>,
    freq_frames: Vec<Vec<u8>>,
    time_cursor: usize,
    freq_cursor: usize,
    opened: bool,
    open_failure: Option<CaptureError>,
}

impl ScriptedSource {
    pub fn new(
        config: AnalyserConfig,
        time_frames: Vec<Vec<u8>>,
        freq_frames: Vec<Vec<u8>>,
    ) -> Self {
        Self {
            config,
            time_frames,
            freq_frames,
            time_cursor: 0,
            freq_cursor: 0,
            opened: false,
            open_failure: None,
        }
    }

    /// A source whose `open` fails once with the given error.
    pub fn failing(config: AnalyserConfig, error: CaptureError) -> Self {
        let mut source = Self::new(config, Vec::new(), Vec::new());
        source.open_failure = Some(error);
        source
    }

    fn next_frame(frames: &[Vec<u8>], cursor: &mut usize) -> Vec<u8> {
        if frames.is_empty() {
            return Vec::new();
        }
        let index = (*cursor).min(frames.len() - 1);
        *cursor += 1;
        frames[index].clone()
    }
}

impl FrameSource for ScriptedSource {
    fn open(&mut self) -> Result<(), CaptureError> {
        if let Some(error) = self.open_failure.take() {
            return Err(error);
        }
        self.opened = true;
        self.time_cursor = 0;
        self.freq_cursor = 0;
        Ok(())
    }

    fn time_frame(&mut self) -> Vec<u8> {
        if !self.opened {
            return Vec::new();
        }
        Self::next_frame(&self.time_frames, &mut self.time_cursor)
    }

    fn freq_frame(&mut self) -> Vec<u8> {
        if !self.opened {
            return Vec::new();
        }
        Self::next_frame(&self.freq_frames, &mut self.freq_cursor)
    }

    fn close(&mut self) {
        self.opened = false;
    }

    fn config(&self) -> AnalyserConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_are_empty_until_opened() {
        let mut source = ScriptedSource::new(
            AnalyserConfig::default(),
            vec![vec![128; 4]],
            vec![vec![0; 4]],
        );
        assert!(source.time_frame().is_empty());
        source.open().unwrap();
        assert_eq!(source.time_frame(), vec![128; 4]);
    }

    #[test]
    fn script_repeats_last_frame() {
        let mut source = ScriptedSource::new(
            AnalyserConfig::default(),
            vec![vec![1; 2], vec![2; 2]],
            Vec::new(),
        );
        source.open().unwrap();
        assert_eq!(source.time_frame(), vec![1; 2]);
        assert_eq!(source.time_frame(), vec![2; 2]);
        assert_eq!(source.time_frame(), vec![2; 2]);
        assert!(source.freq_frame().is_empty());
    }

    #[test]
    fn failing_source_fails_once() {
        let mut source = ScriptedSource::failing(
            AnalyserConfig::default(),
            CaptureError::NoInputDevice,
        );
        assert!(source.open().is_err());
        assert!(source.open().is_ok());
    }

    #[test]
    fn close_is_idempotent() {
        let mut source =
            ScriptedSource::new(AnalyserConfig::default(), vec![vec![128; 4]], Vec::new());
        source.open().unwrap();
        source.close();
        source.close();
        assert!(source.time_frame().is_empty());
    }
}
