use thiserror::Error;

use crate::editor::EditorError;
use crate::preview::PreviewError;
use crate::submission::{ValidationError, VALIDATION_ALERT};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error(transparent)]
    Editor(#[from] EditorError),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

impl From<ValidationError> for DomainError {
    fn from(value: ValidationError) -> Self {
        Self::Editor(EditorError::Validation(value))
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Preview(#[from] PreviewError),
    #[error("invalid input: {0}")]
    Input(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
    #[error("rendering failure: {0}")]
    Rendering(String),
}

impl From<EditorError> for ApplicationError {
    fn from(value: EditorError) -> Self {
        Self::Domain(DomainError::Editor(value))
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("submission blocked: {message}")]
    Validation { message: String, correlation_id: String },
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Validation { .. } => VALIDATION_ALERT,
            Self::BadRequest { .. } => "The input could not be processed. Check it and try again.",
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::Validation { correlation_id, .. }
            | Self::BadRequest { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::Validation { correlation_id: id, .. }
            | InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::Domain(DomainError::Editor(EditorError::Validation(error))) => {
                Self::Validation { message: error.to_string(), correlation_id }
            }
            ApplicationError::Domain(DomainError::Editor(error)) => {
                Self::BadRequest { message: error.to_string(), correlation_id }
            }
            ApplicationError::Preview(error) => {
                Self::BadRequest { message: error.to_string(), correlation_id }
            }
            ApplicationError::Input(message) => Self::BadRequest { message, correlation_id },
            ApplicationError::Domain(DomainError::InvariantViolation(message))
            | ApplicationError::Configuration(message)
            | ApplicationError::Rendering(message) => Self::Internal { message, correlation_id },
        }
    }
}
