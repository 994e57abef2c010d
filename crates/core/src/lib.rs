pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod workflow;

pub use domain::notification::{Notification, NotificationId, SYSTEM_RECIPIENT};
pub use domain::request::{
    Actor, ActorRole, Attachment, CommentEntry, HistoryEntry, NewRequest, Priority, Request,
    RequestId, RequestStatus,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use workflow::{TransitionDecision, TransitionEngine, TransitionPolicy};
