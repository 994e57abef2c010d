use async_trait::async_trait;
use thiserror::Error;

use staffdesk_core::domain::notification::{Notification, NotificationId};
use staffdesk_core::domain::request::{
    CommentEntry, HistoryEntry, Request, RequestId, RequestStatus,
};

pub mod memory;
pub mod notification;
pub mod request;

pub use memory::{
    FailingNotificationRepository, InMemoryNotificationRepository, InMemoryRequestRepository,
};
pub use notification::SqlNotificationRepository;
pub use request::SqlRequestRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Read-side filter for `list`; all clauses are optional and combined with
/// AND. `search` is a case-insensitive substring match over employee name,
/// request type, and id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestFilter {
    pub status: Option<RequestStatus>,
    pub request_type: Option<String>,
    pub search: Option<String>,
}

/// Result of a guarded transition write.
///
/// `Conflict` means the row's status no longer matches what the decision
/// was made against: a concurrent writer won the race. Nothing is written
/// in the `NotFound` and `Conflict` cases.
#[derive(Clone, Debug, PartialEq)]
pub enum TransitionWriteOutcome {
    Applied(Request),
    NotFound,
    Conflict { actual: RequestStatus },
}

#[async_trait]
pub trait RequestRepository: Send + Sync {
    async fn create(&self, request: Request) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: &RequestId) -> Result<Option<Request>, RepositoryError>;

    /// Returns requests ordered by submission date, newest first.
    async fn list(&self, filter: &RequestFilter) -> Result<Vec<Request>, RepositoryError>;

    /// Atomically replaces the status and appends exactly one history entry
    /// (and at most one comment entry), guarded on `expected_current` so a
    /// lost race never produces a partial or double write.
    async fn apply_transition(
        &self,
        id: &RequestId,
        expected_current: RequestStatus,
        next: RequestStatus,
        history: HistoryEntry,
        comment: Option<CommentEntry>,
    ) -> Result<TransitionWriteOutcome, RepositoryError>;

    /// Appends a comment without touching the status or history. Returns
    /// the updated request, or `None` when the id does not exist.
    async fn append_comment(
        &self,
        id: &RequestId,
        comment: CommentEntry,
    ) -> Result<Option<Request>, RepositoryError>;

    /// Removes the request and its child rows. Returns false when the id
    /// does not exist.
    async fn delete(&self, id: &RequestId) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn insert(&self, notification: Notification) -> Result<(), RepositoryError>;

    /// Returns notifications for the user, newest first.
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Notification>, RepositoryError>;

    /// Flips is_read to true. Returns false when the id does not exist;
    /// marking an already-read notification succeeds again.
    async fn mark_read(&self, id: &NotificationId) -> Result<bool, RepositoryError>;
}
