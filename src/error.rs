use thiserror::Error;

/// The taxonomy a caller of this crate ever sees. Internal variants exist so
/// `?` works everywhere; each still maps onto one of the four surfaced
/// categories via [`CoreError::category`].
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("cluster connection failed: {0}")]
    ConnectionFailed(String),

    #[error("cluster unreachable: {0}")]
    ClusterUnreachable(String),

    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("internal error: {0}")]
    InternalError(String),
}

/// The taxonomy a caller-facing operation is ever allowed to surface
/// (`AI_ANALYSIS_FAILED` is deliberately absent: C6 never surfaces it, it
/// degrades to a fallback `DiagnosisResult` instead).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    ValidationFailed,
    NotFound,
    ConnectionFailed,
    ClusterUnreachable,
    Internal,
}

impl CoreError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            CoreError::ValidationFailed(_) => ErrorCategory::ValidationFailed,
            CoreError::NotFound(_) => ErrorCategory::NotFound,
            CoreError::ConnectionFailed(_) => ErrorCategory::ConnectionFailed,
            CoreError::ClusterUnreachable(_) | CoreError::KubeError(_) | CoreError::HttpError(_) => {
                ErrorCategory::ClusterUnreachable
            }
            CoreError::SerializationError(_) | CoreError::ConfigError(_) | CoreError::InternalError(_) => {
                ErrorCategory::Internal
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
