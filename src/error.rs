//! Typed failures surfaced to callers of the monitor.

/// Failures of the landmark-detector collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DetectorError {
    #[error("failed to initialize landmark detector: {message}")]
    Initialization { message: String },

    #[error("camera permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("landmark stream failed: {message}")]
    Stream { message: String },
}

impl DetectorError {
    pub fn initialization(msg: impl Into<String>) -> Self {
        Self::Initialization {
            message: msg.into(),
        }
    }

    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: msg.into(),
        }
    }

    pub fn stream(msg: impl Into<String>) -> Self {
        Self::Stream {
            message: msg.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error(transparent)]
    Detector(#[from] DetectorError),

    #[error("failed to persist session: {0}")]
    Persistence(#[source] anyhow::Error),
}

pub type MonitorResult<T> = Result<T, MonitorError>;
