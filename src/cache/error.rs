use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheErrorKind {
    Io,
    Serialization,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheError {
    pub kind: CacheErrorKind,
    pub message: String,
}

impl CacheError {
    pub fn new(kind: CacheErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CacheError {}

pub fn io_error(message: impl Into<String>) -> CacheError {
    CacheError::new(CacheErrorKind::Io, message)
}

pub fn serialization_error(message: impl Into<String>) -> CacheError {
    CacheError::new(CacheErrorKind::Serialization, message)
}

pub fn internal_error(message: impl Into<String>) -> CacheError {
    CacheError::new(CacheErrorKind::Internal, message)
}
