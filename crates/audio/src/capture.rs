use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use ringbuf::{HeapConsumer, HeapRb};
use tracing::{debug, info, warn};

use laya_domain::{AnalyserConfig, CaptureError};

use crate::analyser::SpectrumAnalyser;
use crate::source::FrameSource;

/// Ring capacity in FFT windows; overflow drops the newest callback data,
/// which only costs snapshot freshness.
const RING_WINDOWS: usize = 4;

/// Microphone-backed frame source. The cpal callback mixes input to mono
/// and pushes it through an SPSC ring; frame getters drain the ring into
/// the spectrum analyser and snapshot it.
pub struct MicSource {
    config: AnalyserConfig,
    analyser: SpectrumAnalyser,
    stream: Option<cpal::Stream>,
    consumer: Option<HeapConsumer<f32>>,
    drain: Vec<f32>,
}

impl MicSource {
    /// `config.sample_rate` is the preferred rate; the rate actually
    /// granted by the device replaces it once `open` succeeds.
    pub fn new(config: AnalyserConfig) -> Self {
        Self {
            config,
            analyser: SpectrumAnalyser::new(config),
            stream: None,
            consumer: None,
            drain: vec![0.0; config.fft_size],
        }
    }

    fn drain_ring(&mut self) {
        let Some(consumer) = self.consumer.as_mut() else {
            return;
        };
        loop {
            let n = consumer.pop_slice(&mut self.drain);
            if n == 0 {
                break;
            }
            self.analyser.push_samples(&self.drain[..n]);
        }
    }
}

impl FrameSource for MicSource {
    fn open(&mut self) -> Result<(), CaptureError> {
        self.close();

        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(CaptureError::NoInputDevice)?;
        let name = device.name().map_err(|e| CaptureError::device(e.to_string()))?;

        let ranges = device
            .supported_input_configs()
            .map_err(|e| CaptureError::device(e.to_string()))?;
        // f32 input, fewest channels, then nearest supported rate.
        let range = ranges
            .filter(|r| r.sample_format() == SampleFormat::F32)
            .min_by_key(|r| {
                let rate = self.config.sample_rate;
                let distance = if rate < r.min_sample_rate().0 {
                    r.min_sample_rate().0 - rate
                } else if rate > r.max_sample_rate().0 {
                    rate - r.max_sample_rate().0
                } else {
                    0
                };
                (r.channels(), distance)
            })
            .ok_or(CaptureError::NoSupportedConfig)?;
        let rate = self
            .config
            .sample_rate
            .clamp(range.min_sample_rate().0, range.max_sample_rate().0);
        let supported = range.with_sample_rate(cpal::SampleRate(rate));
        let channels = supported.channels() as usize;
        let stream_config: cpal::StreamConfig = supported.into();

        self.config.sample_rate = rate;
        self.analyser = SpectrumAnalyser::new(self.config);

        let ring = HeapRb::<f32>::new(self.config.fft_size * RING_WINDOWS);
        let (mut producer, consumer) = ring.split();
        let mut mono = Vec::new();
        let stream = device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    mono.clear();
                    if channels == 1 {
                        mono.extend_from_slice(data);
                    } else {
                        mono.extend(
                            data.chunks_exact(channels)
                                .map(|frame| frame.iter().sum::<f32>() / channels as f32),
                        );
                    }
                    let _ = producer.push_slice(&mono);
                },
                |err| warn!(error = %err, "input stream error"),
                None,
            )
            .map_err(|e| CaptureError::stream(e.to_string()))?;
        stream
            .play()
            .map_err(|e| CaptureError::stream(e.to_string()))?;

        info!(device = %name, rate, channels, "capture session opened");
        self.stream = Some(stream);
        self.consumer = Some(consumer);
        Ok(())
    }

    fn time_frame(&mut self) -> Vec<u8> {
        if self.stream.is_none() {
            return Vec::new();
        }
        self.drain_ring();
        self.analyser.time_bytes()
    }

    fn freq_frame(&mut self) -> Vec<u8> {
        if self.stream.is_none() {
            return Vec::new();
        }
        self.drain_ring();
        self.analyser.freq_bytes()
    }

    fn close(&mut self) {
        if self.stream.take().is_some() {
            debug!("capture session closed");
        }
        self.consumer = None;
        self.analyser.reset();
    }

    fn config(&self) -> AnalyserConfig {
        self.config
    }
}
