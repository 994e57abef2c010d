//! In-memory repository implementations used by service and handler tests.
//!
//! They honor the same contracts as the SQL implementations: ordering,
//! the optimistic transition guard, and idempotent mark-read.

use std::collections::HashMap;

use tokio::sync::RwLock;

use staffdesk_core::audit;
use staffdesk_core::domain::notification::{Notification, NotificationId};
use staffdesk_core::domain::request::{
    CommentEntry, HistoryEntry, Request, RequestId, RequestStatus,
};

use super::{
    NotificationRepository, RepositoryError, RequestFilter, RequestRepository,
    TransitionWriteOutcome,
};

#[derive(Default)]
pub struct InMemoryRequestRepository {
    requests: RwLock<HashMap<String, Request>>,
}

fn matches_filter(request: &Request, filter: &RequestFilter) -> bool {
    if let Some(status) = filter.status {
        if request.status != status {
            return false;
        }
    }
    if let Some(request_type) = &filter.request_type {
        if &request.request_type != request_type {
            return false;
        }
    }
    if let Some(search) = &filter.search {
        let needle = search.to_lowercase();
        let haystack = [
            request.employee_name.to_lowercase(),
            request.request_type.to_lowercase(),
            request.id.0.to_lowercase(),
        ];
        if !haystack.iter().any(|field| field.contains(&needle)) {
            return false;
        }
    }
    true
}

#[async_trait::async_trait]
impl RequestRepository for InMemoryRequestRepository {
    async fn create(&self, request: Request) -> Result<(), RepositoryError> {
        let mut requests = self.requests.write().await;
        requests.insert(request.id.0.clone(), request);
        Ok(())
    }

    async fn find_by_id(&self, id: &RequestId) -> Result<Option<Request>, RepositoryError> {
        let requests = self.requests.read().await;
        Ok(requests.get(&id.0).cloned())
    }

    async fn list(&self, filter: &RequestFilter) -> Result<Vec<Request>, RepositoryError> {
        let requests = self.requests.read().await;
        let mut matching: Vec<Request> = requests
            .values()
            .filter(|request| matches_filter(request, filter))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.submission_date.cmp(&a.submission_date));
        Ok(matching)
    }

    async fn apply_transition(
        &self,
        id: &RequestId,
        expected_current: RequestStatus,
        next: RequestStatus,
        history: HistoryEntry,
        comment: Option<CommentEntry>,
    ) -> Result<TransitionWriteOutcome, RepositoryError> {
        let mut requests = self.requests.write().await;
        let Some(request) = requests.get_mut(&id.0) else {
            return Ok(TransitionWriteOutcome::NotFound);
        };
        if request.status != expected_current {
            return Ok(TransitionWriteOutcome::Conflict { actual: request.status });
        }

        request.status = next;
        request.history = audit::append(&request.history, history);
        if let Some(entry) = comment {
            request.comments = audit::append(&request.comments, entry);
        }
        Ok(TransitionWriteOutcome::Applied(request.clone()))
    }

    async fn append_comment(
        &self,
        id: &RequestId,
        comment: CommentEntry,
    ) -> Result<Option<Request>, RepositoryError> {
        let mut requests = self.requests.write().await;
        let Some(request) = requests.get_mut(&id.0) else {
            return Ok(None);
        };
        request.comments = audit::append(&request.comments, comment);
        Ok(Some(request.clone()))
    }

    async fn delete(&self, id: &RequestId) -> Result<bool, RepositoryError> {
        let mut requests = self.requests.write().await;
        Ok(requests.remove(&id.0).is_some())
    }
}

#[derive(Default)]
pub struct InMemoryNotificationRepository {
    notifications: RwLock<HashMap<String, Notification>>,
}

impl InMemoryNotificationRepository {
    /// Snapshot of everything recorded, for assertions.
    pub async fn all(&self) -> Vec<Notification> {
        let notifications = self.notifications.read().await;
        let mut all: Vec<Notification> = notifications.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all
    }
}

#[async_trait::async_trait]
impl NotificationRepository for InMemoryNotificationRepository {
    async fn insert(&self, notification: Notification) -> Result<(), RepositoryError> {
        let mut notifications = self.notifications.write().await;
        notifications.insert(notification.id.0.clone(), notification);
        Ok(())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Notification>, RepositoryError> {
        let notifications = self.notifications.read().await;
        let mut matching: Vec<Notification> = notifications
            .values()
            .filter(|notification| notification.recipient_user_id == user_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }

    async fn mark_read(&self, id: &NotificationId) -> Result<bool, RepositoryError> {
        let mut notifications = self.notifications.write().await;
        match notifications.get_mut(&id.0) {
            Some(notification) => {
                notification.is_read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Notification store that always fails, for proving that request
/// operations never depend on delivery succeeding.
#[derive(Default)]
pub struct FailingNotificationRepository;

#[async_trait::async_trait]
impl NotificationRepository for FailingNotificationRepository {
    async fn insert(&self, _notification: Notification) -> Result<(), RepositoryError> {
        Err(RepositoryError::Decode("notification store is down".to_owned()))
    }

    async fn list_for_user(&self, _user_id: &str) -> Result<Vec<Notification>, RepositoryError> {
        Err(RepositoryError::Decode("notification store is down".to_owned()))
    }

    async fn mark_read(&self, _id: &NotificationId) -> Result<bool, RepositoryError> {
        Err(RepositoryError::Decode("notification store is down".to_owned()))
    }
}
