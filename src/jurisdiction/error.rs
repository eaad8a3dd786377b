use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JurisdictionErrorKind {
    InsufficientData,
    Io,
    Serialization,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JurisdictionError {
    pub kind: JurisdictionErrorKind,
    pub message: String,
}

impl JurisdictionError {
    pub fn new(kind: JurisdictionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for JurisdictionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for JurisdictionError {}

pub fn insufficient_data(message: impl Into<String>) -> JurisdictionError {
    JurisdictionError::new(JurisdictionErrorKind::InsufficientData, message)
}

pub fn io_error(message: impl Into<String>) -> JurisdictionError {
    JurisdictionError::new(JurisdictionErrorKind::Io, message)
}

pub fn serialization_error(message: impl Into<String>) -> JurisdictionError {
    JurisdictionError::new(JurisdictionErrorKind::Serialization, message)
}

pub fn internal_error(message: impl Into<String>) -> JurisdictionError {
    JurisdictionError::new(JurisdictionErrorKind::Internal, message)
}
