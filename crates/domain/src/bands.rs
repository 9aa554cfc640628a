use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::AnalyserConfig;

/// One frequency band of the onset detector, with the weight its flux
/// contributes to the combined onset signal.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct FrequencyBand {
    pub start_hz: f64,
    pub end_hz: f64,
    pub flux_weight: f32,
}

/// Canonical band set for onset detection. Percussive onsets concentrate
/// in the low bands, hence the extra weight on sub-bass and bass.
pub const ONSET_BANDS: [FrequencyBand; 4] = [
    FrequencyBand {
        start_hz: 20.0,
        end_hz: 60.0,
        flux_weight: 2.0,
    },
    FrequencyBand {
        start_hz: 60.0,
        end_hz: 200.0,
        flux_weight: 1.5,
    },
    FrequencyBand {
        start_hz: 200.0,
        end_hz: 800.0,
        flux_weight: 1.0,
    },
    FrequencyBand {
        start_hz: 800.0,
        end_hz: 2000.0,
        flux_weight: 1.0,
    },
];

impl FrequencyBand {
    /// Half-open bin range `[floor(start), floor(end))` covered by this
    /// band under `config`, clamped to the available bins.
    pub fn bin_range(&self, config: &AnalyserConfig) -> Range<usize> {
        let start = config.hz_to_bin(self.start_hz).min(config.bin_count());
        let end = config.hz_to_bin(self.end_hz).min(config.bin_count());
        start..end.max(start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_bands_are_contiguous() {
        for pair in ONSET_BANDS.windows(2) {
            assert_eq!(pair[0].end_hz, pair[1].start_hz);
        }
        assert_eq!(ONSET_BANDS[0].start_hz, 20.0);
        assert_eq!(ONSET_BANDS[3].end_hz, 2000.0);
    }

    #[test]
    fn bin_ranges_at_default_config() {
        let config = AnalyserConfig::default();
        assert_eq!(ONSET_BANDS[0].bin_range(&config), 0..2);
        assert_eq!(ONSET_BANDS[1].bin_range(&config), 2..9);
        assert_eq!(ONSET_BANDS[2].bin_range(&config), 9..37);
        assert_eq!(ONSET_BANDS[3].bin_range(&config), 37..92);
    }

    #[test]
    fn bin_range_clamps_to_bin_count() {
        let config = AnalyserConfig {
            fft_size: 64,
            sample_rate: 8_000,
        };
        let band = FrequencyBand {
            start_hz: 3_000.0,
            end_hz: 6_000.0,
            flux_weight: 1.0,
        };
        let range = band.bin_range(&config);
        assert!(range.end <= config.bin_count());
        assert!(range.start <= range.end);
    }
}
