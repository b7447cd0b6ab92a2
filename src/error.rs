use thiserror::Error;

/// Failure taxonomy for a verification run.
///
/// An empty video is not an error: it produces the "no frames" verdict.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// Bad skip, threshold or label settings. Raised before any frame is read.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The video could not be opened or read. Aborts the run.
    #[error("video decode failed: {0}")]
    DecodeFailure(String),

    /// The detector failed on a single frame.
    #[error("detection failed on frame {frame_index}: {reason}")]
    DetectionFailure { frame_index: u64, reason: String },

    /// The caller aborted the run before a verdict was reached.
    #[error("verification cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl VerifyError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }

    pub(crate) fn decode(err: impl std::fmt::Display) -> Self {
        Self::DecodeFailure(err.to_string())
    }

    /// True for errors that end the run without a verdict.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::DetectionFailure { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection_failure_is_recoverable() {
        let err = VerifyError::DetectionFailure {
            frame_index: 10,
            reason: "bad tensor".to_string(),
        };
        assert!(!err.is_fatal());
        assert_eq!(
            err.to_string(),
            "detection failed on frame 10: bad tensor"
        );
    }

    #[test]
    fn decode_and_config_errors_are_fatal() {
        assert!(VerifyError::decode("no video track").is_fatal());
        assert!(VerifyError::config("frame_skip must be >= 1").is_fatal());
        assert!(VerifyError::Cancelled.is_fatal());
    }
}
