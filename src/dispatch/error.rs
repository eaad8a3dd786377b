use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchErrorKind {
    UnknownTool,
    DuplicateTarget,
    ExternalService,
    RegistrationConflict,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchError {
    pub kind: DispatchErrorKind,
    pub message: String,
}

impl DispatchError {
    pub fn new(kind: DispatchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for DispatchError {}

pub fn unknown_tool(message: impl Into<String>) -> DispatchError {
    DispatchError::new(DispatchErrorKind::UnknownTool, message)
}

pub fn duplicate_target(message: impl Into<String>) -> DispatchError {
    DispatchError::new(DispatchErrorKind::DuplicateTarget, message)
}

pub fn external_service(message: impl Into<String>) -> DispatchError {
    DispatchError::new(DispatchErrorKind::ExternalService, message)
}

pub fn registration_conflict(message: impl Into<String>) -> DispatchError {
    DispatchError::new(DispatchErrorKind::RegistrationConflict, message)
}
