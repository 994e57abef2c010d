use thiserror::Error;

use crate::domain::request::RequestStatus;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("required fields missing or malformed: {fields:?}")]
    Validation { fields: Vec<String> },
    #[error("invalid transition from terminal status {from} to {to}")]
    InvalidTransition { from: RequestStatus, to: RequestStatus },
    #[error("request is already in status {status}")]
    NoOpTransition { status: RequestStatus },
    #[error("role {role} may not set status {target}")]
    RoleDenied { role: String, target: RequestStatus },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("persistence failure: {0}")]
    Storage(String),
    #[error("notification delivery failure: {0}")]
    NotificationDelivery(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("conflict: {message}")]
    Conflict { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::NotFound { .. } => "The requested record does not exist.",
            Self::Conflict { .. } => {
                "The request cannot change status from its current state."
            }
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::Conflict { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Domain(
                error @ (DomainError::Validation { .. } | DomainError::NoOpTransition { .. }),
            ) => Self::BadRequest {
                message: error.to_string(),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::Domain(
                error @ (DomainError::InvalidTransition { .. } | DomainError::RoleDenied { .. }),
            ) => Self::Conflict {
                message: error.to_string(),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::NotFound { entity, id } => Self::NotFound {
                message: format!("{entity} not found: {id}"),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::Storage(message) => {
                Self::ServiceUnavailable { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::NotificationDelivery(message) => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
        }
    }
}
