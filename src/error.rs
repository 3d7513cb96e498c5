use thiserror::Error;

/// User-facing capture failures. The payload is the platform's own description
/// of the cause, which is what ends up in the toast.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("Camera and microphone permissions have not been granted")]
    PermissionDenied,
    #[error("Couldn't take photo: {0}")]
    Photo(String),
    #[error("Video capture failed: {0}")]
    Recording(String),
    #[error("A recording is already in progress")]
    AlreadyRecording,
    #[error("Camera error: {0}")]
    Device(String),
    #[error("Storage error: {0}")]
    Storage(String),
}

impl CaptureError {
    pub fn photo(err: impl std::fmt::Display) -> Self {
        CaptureError::Photo(err.to_string())
    }

    pub fn recording(err: impl std::fmt::Display) -> Self {
        CaptureError::Recording(err.to_string())
    }

    pub fn device(err: impl std::fmt::Display) -> Self {
        CaptureError::Device(err.to_string())
    }

    /// The bare cause, without the category prefix used in log lines.
    pub fn cause(&self) -> String {
        match self {
            CaptureError::Photo(msg)
            | CaptureError::Recording(msg)
            | CaptureError::Device(msg)
            | CaptureError::Storage(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

impl From<std::io::Error> for CaptureError {
    fn from(err: std::io::Error) -> Self {
        CaptureError::Storage(err.to_string())
    }
}
