use serde::{Deserialize, Serialize};

/// Transform parameters shared between the frame source and the analysis
/// pipeline. The bin math in the estimators is only correct when these
/// match the source's actual transform configuration.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct AnalyserConfig {
    pub fft_size: usize,
    pub sample_rate: u32,
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            sample_rate: 44_100,
        }
    }
}

impl AnalyserConfig {
    /// Number of usable frequency bins; also the length of every frame.
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Center frequency of bin `index`.
    pub fn bin_to_hz(&self, index: usize) -> f64 {
        index as f64 * self.sample_rate as f64 / self.fft_size as f64
    }

    /// Lowest bin whose frequency is at or above `hz`, truncated.
    pub fn hz_to_bin(&self, hz: f64) -> usize {
        (hz * self.fft_size as f64 / self.sample_rate as f64).floor() as usize
    }

    /// Duration one transform window covers, in seconds.
    pub fn frame_period_secs(&self) -> f64 {
        self.fft_size as f64 / self.sample_rate as f64
    }
}
