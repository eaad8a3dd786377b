use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoringErrorKind {
    InvalidRequest,
    ServiceUnavailable,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringError {
    pub kind: ScoringErrorKind,
    pub message: String,
}

impl ScoringError {
    pub fn new(kind: ScoringErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ScoringError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ScoringError {}

pub fn invalid_request(message: impl Into<String>) -> ScoringError {
    ScoringError::new(ScoringErrorKind::InvalidRequest, message)
}

pub fn service_unavailable(message: impl Into<String>) -> ScoringError {
    ScoringError::new(ScoringErrorKind::ServiceUnavailable, message)
}

pub fn internal_error(message: impl Into<String>) -> ScoringError {
    ScoringError::new(ScoringErrorKind::Internal, message)
}
