use std::collections::VecDeque;

use tracing::trace;

use laya_domain::{AnalyserConfig, ONSET_BANDS};

/// Tempo estimation strategy. Returns the current BPM estimate, or 0
/// while no tempo is known. Never fails on sparse or degenerate input.
pub trait TempoEstimator {
    fn estimate(&mut self, freq: &[u8]) -> u16;
}

/// Per-band energy samples retained (≈1 s at the nominal 60 Hz tick).
const ENERGY_HISTORY_LEN: usize = 60;
/// Onset-strength samples retained (≈2 s).
const FLUX_HISTORY_LEN: usize = 120;
/// Newest flux samples considered for the adaptive threshold (≈1 s).
const THRESHOLD_WINDOW: usize = 60;
const THRESHOLD_SIGMA: f32 = 0.8;
/// Margin and half-width of the local-maximum test during peak picking.
const PEAK_WINDOW: usize = 5;
const MIN_BPM: f64 = 70.0;
const MAX_BPM: f64 = 180.0;
const BPM_HISTORY_LEN: usize = 8;

/// A detected onset peak: index into the flux history and its strength.
#[derive(Clone, Copy, Debug, PartialEq)]
struct PeakEvent {
    position_index: usize,
    value: f32,
}

/// Multiband spectral-flux tempo estimator. Tracks frame-to-frame energy
/// rises in four bass-weighted bands, picks onset peaks against an
/// adaptive threshold, converts peak intervals to BPM candidates and
/// smooths accepted candidates with a trimmed rank-weighted average.
pub struct SpectralFluxTempo {
    config: AnalyserConfig,
    energies: Vec<VecDeque<f32>>,
    flux: VecDeque<f32>,
    bpm_history: VecDeque<f64>,
    last_bpm: u16,
}

impl SpectralFluxTempo {
    pub fn new(config: AnalyserConfig) -> Self {
        Self {
            config,
            energies: vec![VecDeque::with_capacity(ENERGY_HISTORY_LEN); ONSET_BANDS.len()],
            flux: VecDeque::with_capacity(FLUX_HISTORY_LEN),
            bpm_history: VecDeque::with_capacity(BPM_HISTORY_LEN),
            last_bpm: 0,
        }
    }

    fn record_flux(&mut self, freq: &[u8]) {
        let mut total_flux = 0.0_f32;
        for (band, history) in ONSET_BANDS.iter().zip(self.energies.iter_mut()) {
            let range = band.bin_range(&self.config);
            let energy: f32 = freq[range.start.min(freq.len())..range.end.min(freq.len())]
                .iter()
                .map(|&b| {
                    let v = b as f32;
                    v * v
                })
                .sum();
            if let Some(&previous) = history.back() {
                total_flux += (energy - previous).max(0.0) * band.flux_weight;
            }
            push_bounded(history, energy, ENERGY_HISTORY_LEN);
        }
        push_bounded(&mut self.flux, total_flux, FLUX_HISTORY_LEN);
    }

    /// Mean + 0.8σ over the newest ~1 s of flux.
    fn adaptive_threshold(&self) -> f32 {
        let skip = self.flux.len().saturating_sub(THRESHOLD_WINDOW);
        let count = (self.flux.len() - skip) as f32;
        let mean = self.flux.iter().skip(skip).sum::<f32>() / count;
        let variance = self
            .flux
            .iter()
            .skip(skip)
            .map(|&v| (v - mean) * (v - mean))
            .sum::<f32>()
            / count;
        mean + THRESHOLD_SIGMA * variance.sqrt()
    }

    /// Strict local maxima above `threshold`, excluding a margin of
    /// `PEAK_WINDOW` samples at both ends of the history.
    fn pick_peaks(&self, threshold: f32) -> Vec<PeakEvent> {
        let flux: Vec<f32> = self.flux.iter().copied().collect();
        if flux.len() <= 2 * PEAK_WINDOW {
            return Vec::new();
        }
        let mut peaks = Vec::new();
        for i in PEAK_WINDOW..flux.len() - PEAK_WINDOW {
            let value = flux[i];
            if value <= threshold {
                continue;
            }
            let is_peak = (i - PEAK_WINDOW..=i + PEAK_WINDOW)
                .filter(|&j| j != i)
                .all(|j| flux[j] < value);
            if is_peak {
                peaks.push(PeakEvent {
                    position_index: i,
                    value,
                });
            }
        }
        peaks
    }

    fn candidates(&self, peaks: &[PeakEvent]) -> Vec<f64> {
        let frame_period = self.config.frame_period_secs();
        peaks
            .windows(2)
            .map(|pair| {
                let interval = (pair[1].position_index - pair[0].position_index) as f64;
                60.0 / (interval * frame_period)
            })
            .filter(|bpm| (MIN_BPM..=MAX_BPM).contains(bpm))
            .collect()
    }

    /// Trimmed rank-weighted average: sorted history minus its extremes,
    /// the k-th smallest remaining value weighted k.
    fn smoothed_bpm(&self) -> u16 {
        let mut sorted: Vec<f64> = self.bpm_history.iter().copied().collect();
        sorted.sort_by(f64::total_cmp);
        let trimmed = if sorted.len() >= 3 {
            &sorted[1..sorted.len() - 1]
        } else {
            &sorted[..]
        };
        let mut numerator = 0.0;
        let mut denominator = 0.0;
        for (rank, &value) in trimmed.iter().enumerate() {
            let weight = (rank + 1) as f64;
            numerator += weight * value;
            denominator += weight;
        }
        if denominator == 0.0 {
            return 0;
        }
        (numerator / denominator).round() as u16
    }
}

impl TempoEstimator for SpectralFluxTempo {
    fn estimate(&mut self, freq: &[u8]) -> u16 {
        if freq.is_empty() {
            return self.last_bpm;
        }
        self.record_flux(freq);

        let threshold = self.adaptive_threshold();
        let peaks = self.pick_peaks(threshold);
        if peaks.len() < 2 {
            return self.last_bpm;
        }

        let mut candidates = self.candidates(&peaks);
        if candidates.is_empty() {
            return self.last_bpm;
        }
        candidates.sort_by(f64::total_cmp);
        let mid = candidates.len() / 2;
        let median = if candidates.len() % 2 == 0 {
            (candidates[mid - 1] + candidates[mid]) / 2.0
        } else {
            candidates[mid]
        };
        push_bounded(&mut self.bpm_history, median, BPM_HISTORY_LEN);

        let bpm = self.smoothed_bpm();
        let strongest = peaks.iter().map(|p| p.value).fold(0.0_f32, f32::max);
        trace!(peaks = peaks.len(), strongest, median, bpm, "tempo tick");
        self.last_bpm = bpm;
        bpm
    }
}

/// Simple global-threshold variant kept as an alternate strategy: treats
/// loud bins as peaks and converts the mean inter-peak bin distance to a
/// tempo. Less robust to loudness variation than the flux estimator.
pub struct ThresholdPeakTempo {
    config: AnalyserConfig,
}

const PEAK_BYTE_THRESHOLD: u8 = 200;
const SIMPLE_MIN_BPM: f64 = 60.0;
const SIMPLE_MAX_BPM: f64 = 200.0;

impl ThresholdPeakTempo {
    pub fn new(config: AnalyserConfig) -> Self {
        Self { config }
    }
}

impl TempoEstimator for ThresholdPeakTempo {
    fn estimate(&mut self, freq: &[u8]) -> u16 {
        let peaks: Vec<usize> = freq
            .iter()
            .enumerate()
            .filter(|(_, &b)| b > PEAK_BYTE_THRESHOLD)
            .map(|(i, _)| i)
            .collect();
        if peaks.len() < 2 {
            return 0;
        }
        let total: usize = peaks.windows(2).map(|pair| pair[1] - pair[0]).sum();
        let average_interval = total as f64 / (peaks.len() - 1) as f64;
        let bpm = (60.0 * self.config.sample_rate as f64
            / (average_interval * self.config.fft_size as f64))
            .round();
        bpm.clamp(SIMPLE_MIN_BPM, SIMPLE_MAX_BPM) as u16
    }
}

fn push_bounded<T>(history: &mut VecDeque<T>, value: T, capacity: usize) {
    if history.len() == capacity {
        history.pop_front();
    }
    history.push_back(value);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AnalyserConfig {
        AnalyserConfig::default()
    }

    /// Baseline frame with sub-bass and bass bins spiked on pulse ticks.
    fn pulse_frame(tick: usize, interval: usize) -> Vec<u8> {
        let mut frame = vec![10u8; 1024];
        if tick % interval == 0 {
            for bin in 0..9 {
                frame[bin] = 255;
            }
        }
        frame
    }

    #[test]
    fn periodic_bass_pulse_recovers_tempo() {
        let mut tempo = SpectralFluxTempo::new(config());
        // 18 flux frames per pulse: 60 / (18 * 2048 / 44100) ≈ 71.8 BPM.
        let mut bpm = 0;
        for tick in 0..150 {
            bpm = tempo.estimate(&pulse_frame(tick, 18));
        }
        assert!((70..=74).contains(&bpm), "got {bpm}");
    }

    #[test]
    fn sparse_peaks_fall_back_to_last_estimate() {
        let mut tempo = SpectralFluxTempo::new(config());
        let mut settled = 0;
        for tick in 0..150 {
            settled = tempo.estimate(&pulse_frame(tick, 18));
        }
        assert_ne!(settled, 0);
        // Silence flushes the flux history; the estimate must hold.
        for _ in 0..150 {
            assert_eq!(tempo.estimate(&vec![0u8; 1024]), settled);
        }
    }

    #[test]
    fn all_zero_session_reports_unknown() {
        let mut tempo = SpectralFluxTempo::new(config());
        for _ in 0..200 {
            assert_eq!(tempo.estimate(&vec![0u8; 1024]), 0);
        }
    }

    #[test]
    fn empty_frame_returns_last_estimate() {
        let mut tempo = SpectralFluxTempo::new(config());
        assert_eq!(tempo.estimate(&[]), 0);
    }

    #[test]
    fn out_of_range_candidates_are_discarded() {
        let mut tempo = SpectralFluxTempo::new(config());
        // 22 frames per pulse ≈ 58.7 BPM, below the acceptance range.
        let mut bpm = 0;
        for tick in 0..200 {
            bpm = tempo.estimate(&pulse_frame(tick, 22));
        }
        assert_eq!(bpm, 0);
    }

    #[test]
    fn estimates_stay_in_range_or_unknown() {
        let mut tempo = SpectralFluxTempo::new(config());
        let mut seed = 0x2545_f491_4f6c_dd1d_u64;
        for _ in 0..300 {
            let frame: Vec<u8> = (0..1024)
                .map(|_| {
                    seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                    (seed >> 56) as u8
                })
                .collect();
            let bpm = tempo.estimate(&frame);
            assert!(bpm == 0 || (70..=180).contains(&bpm), "got {bpm}");
        }
    }

    #[test]
    fn histories_never_exceed_capacity() {
        let mut tempo = SpectralFluxTempo::new(config());
        for tick in 0..400 {
            tempo.estimate(&pulse_frame(tick, 18));
            assert!(tempo.flux.len() <= FLUX_HISTORY_LEN);
            assert!(tempo.bpm_history.len() <= BPM_HISTORY_LEN);
            for band in &tempo.energies {
                assert!(band.len() <= ENERGY_HISTORY_LEN);
            }
        }
    }

    #[test]
    fn trimmed_rank_weighting_drops_extremes() {
        let mut tempo = SpectralFluxTempo::new(config());
        for value in [100.0, 180.0, 70.0, 120.0, 120.0] {
            push_bounded(&mut tempo.bpm_history, value, BPM_HISTORY_LEN);
        }
        // Sorted minus extremes: [100, 120, 120]; weights 1, 2, 3.
        // (100 + 240 + 360) / 6 ≈ 116.7.
        assert_eq!(tempo.smoothed_bpm(), 117);
    }

    #[test]
    fn threshold_peak_matches_reference_arithmetic() {
        let mut tempo = ThresholdPeakTempo::new(config());
        let mut frame = vec![0u8; 1024];
        frame[100] = 255;
        frame[120] = 255;
        // 60 * 44100 / (20 * 2048) ≈ 64.6, rounded to 65.
        assert_eq!(tempo.estimate(&frame), 65);
    }

    #[test]
    fn threshold_peak_needs_two_peaks() {
        let mut tempo = ThresholdPeakTempo::new(config());
        let mut frame = vec![0u8; 1024];
        assert_eq!(tempo.estimate(&frame), 0);
        frame[50] = 255;
        assert_eq!(tempo.estimate(&frame), 0);
    }

    #[test]
    fn threshold_peak_clamps_to_simple_range() {
        let mut tempo = ThresholdPeakTempo::new(config());
        let mut frame = vec![0u8; 1024];
        // Adjacent peaks give an interval of 1 bin, far above 200 BPM.
        frame[10] = 255;
        frame[11] = 255;
        assert_eq!(tempo.estimate(&frame), 200);
    }
}
