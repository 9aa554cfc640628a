use std::sync::Arc;

use realfft::{num_complex::Complex, RealFftPlanner, RealToComplex};
use tracing::debug;

use laya_domain::AnalyserConfig;

/// Smoothing constant applied to successive magnitude spectra.
const SMOOTHING_TIME_CONSTANT: f32 = 0.8;
/// Decibel range mapped linearly onto the 0..=255 byte scale.
const MIN_DECIBELS: f32 = -100.0;
const MAX_DECIBELS: f32 = -30.0;

/// Converts a stream of mono samples into byte-valued time-domain and
/// frequency-domain snapshots: a sliding window of `fft_size` samples,
/// Blackman-windowed forward FFT, exponential magnitude smoothing, and a
/// dB-to-byte mapping over [-100, -30] dB. Frame length is `fft_size / 2`.
pub struct SpectrumAnalyser {
    config: AnalyserConfig,
    fft: Arc<dyn RealToComplex<f32>>,
    window: Vec<f32>,
    samples: Vec<f32>,
    smoothed: Vec<f32>,
    scratch: Vec<f32>,
    spectrum: Vec<Complex<f32>>,
}

impl SpectrumAnalyser {
    pub fn new(config: AnalyserConfig) -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(config.fft_size);
        let scratch = fft.make_input_vec();
        let spectrum = fft.make_output_vec();
        debug!(fft_size = config.fft_size, "created spectrum analyser");
        Self {
            config,
            fft,
            window: blackman_window(config.fft_size),
            samples: vec![0.0; config.fft_size],
            smoothed: vec![0.0; config.bin_count()],
            scratch,
            spectrum,
        }
    }

    pub fn config(&self) -> AnalyserConfig {
        self.config
    }

    /// Appends samples to the sliding window, dropping the oldest.
    pub fn push_samples(&mut self, samples: &[f32]) {
        let n = self.samples.len();
        if samples.len() >= n {
            self.samples.copy_from_slice(&samples[samples.len() - n..]);
        } else {
            self.samples.copy_within(samples.len().., 0);
            self.samples[n - samples.len()..].copy_from_slice(samples);
        }
    }

    /// The newest `fft_size / 2` samples mapped to bytes, silence at 128.
    pub fn time_bytes(&self) -> Vec<u8> {
        let count = self.config.bin_count();
        self.samples[self.samples.len() - count..]
            .iter()
            .map(|&s| (128.0 + 128.0 * s).round().clamp(0.0, 255.0) as u8)
            .collect()
    }

    /// Magnitude spectrum of the current window as bytes. Updates the
    /// internal smoothing state, so successive calls reflect the
    /// exponential average of recent spectra.
    pub fn freq_bytes(&mut self) -> Vec<u8> {
        for (dst, (&sample, &coeff)) in self
            .scratch
            .iter_mut()
            .zip(self.samples.iter().zip(self.window.iter()))
        {
            *dst = sample * coeff;
        }
        self.fft
            .process(&mut self.scratch, &mut self.spectrum)
            .expect("fft buffers sized by planner");

        let norm = 1.0 / self.config.fft_size as f32;
        let db_span = MAX_DECIBELS - MIN_DECIBELS;
        let mut bytes = Vec::with_capacity(self.config.bin_count());
        for (smoothed, bin) in self.smoothed.iter_mut().zip(self.spectrum.iter()) {
            let magnitude = bin.norm() * norm;
            *smoothed = SMOOTHING_TIME_CONSTANT * *smoothed
                + (1.0 - SMOOTHING_TIME_CONSTANT) * magnitude;
            let byte = if *smoothed > 0.0 {
                let db = 20.0 * smoothed.log10();
                (255.0 * (db - MIN_DECIBELS) / db_span).clamp(0.0, 255.0)
            } else {
                0.0
            };
            bytes.push(byte as u8);
        }
        bytes
    }

    /// Clears the sample window and smoothing state.
    pub fn reset(&mut self) {
        self.samples.fill(0.0);
        self.smoothed.fill(0.0);
    }
}

fn blackman_window(size: usize) -> Vec<f32> {
    let n = (size.max(2) - 1) as f32;
    (0..size)
        .map(|i| {
            let phase = 2.0 * std::f32::consts::PI * i as f32 / n;
            0.42 - 0.5 * phase.cos() + 0.08 * (2.0 * phase).cos()
        })
        .collect()
}
