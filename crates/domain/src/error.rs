use thiserror::Error;

/// Failures opening an audio capture session. Once a session is open,
/// nothing downstream of the frame source is fatal.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no audio input device available")]
    NoInputDevice,
    #[error("no supported input configuration for the requested format")]
    NoSupportedConfig,
    #[error("input device error: {0}")]
    Device(String),
    #[error("audio stream error: {0}")]
    Stream(String),
}

impl CaptureError {
    pub fn device<T: Into<String>>(message: T) -> Self {
        Self::Device(message.into())
    }

    pub fn stream<T: Into<String>>(message: T) -> Self {
        Self::Stream(message.into())
    }
}
