//! Request service façade: orchestrates the transition engine, the request
//! store, and the notification dispatcher for the boundary operations.
//!
//! Ordering contract: persist before notify, and notification failures are
//! logged but never surfaced to the caller of the triggering operation.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use staffdesk_core::audit;
use staffdesk_core::domain::notification::{Notification, NotificationId};
use staffdesk_core::domain::request::{Actor, NewRequest, Request, RequestId, RequestStatus};
use staffdesk_core::errors::{ApplicationError, DomainError};
use staffdesk_core::workflow::TransitionEngine;
use staffdesk_db::repositories::{
    NotificationRepository, RepositoryError, RequestFilter, RequestRepository,
    TransitionWriteOutcome,
};

/// Result of an update-status call. `applied` is false when the request was
/// already in the target status (true no-op, e.g. a client retry after a
/// commit that the caller never saw).
#[derive(Clone, Debug, PartialEq)]
pub struct StatusUpdate {
    pub request: Request,
    pub applied: bool,
}

pub struct RequestService<R, N> {
    requests: Arc<R>,
    notifications: Arc<N>,
    engine: TransitionEngine,
}

impl<R, N> Clone for RequestService<R, N> {
    fn clone(&self) -> Self {
        Self {
            requests: self.requests.clone(),
            notifications: self.notifications.clone(),
            engine: self.engine,
        }
    }
}

fn storage(error: RepositoryError) -> ApplicationError {
    ApplicationError::Storage(error.to_string())
}

impl<R, N> RequestService<R, N>
where
    R: RequestRepository,
    N: NotificationRepository,
{
    pub fn new(requests: Arc<R>, notifications: Arc<N>, engine: TransitionEngine) -> Self {
        Self { requests, notifications, engine }
    }

    /// Validates and persists a new request, then informs the admin inbox.
    pub async fn submit(&self, new: NewRequest) -> Result<Request, ApplicationError> {
        new.validate()?;

        let request = Request {
            id: RequestId::generate(),
            employee_id: new.employee_id,
            employee_name: new.employee_name.clone(),
            request_type: new.request_type,
            status: RequestStatus::Pending,
            priority: new.priority,
            description: new.description,
            reason: new.reason,
            start_date: new.start_date,
            end_date: new.end_date,
            amount: new.amount,
            submission_date: Utc::now(),
            attachments: new.attachments,
            comments: Vec::new(),
            history: vec![audit::submission_entry(&new.employee_name)],
        };

        self.requests.create(request.clone()).await.map_err(storage)?;
        info!(
            event_name = "request.submitted",
            request_id = %request.id,
            request_type = %request.request_type,
            "request created"
        );

        self.notify(
            None,
            "new request submitted",
            format!(
                "{} submitted a {} request ({})",
                request.employee_name, request.request_type, request.id
            ),
            "request",
        )
        .await;

        Ok(request)
    }

    pub async fn get(&self, id: &RequestId) -> Result<Request, ApplicationError> {
        self.requests
            .find_by_id(id)
            .await
            .map_err(storage)?
            .ok_or_else(|| ApplicationError::NotFound { entity: "request", id: id.0.clone() })
    }

    pub async fn list(&self, filter: &RequestFilter) -> Result<Vec<Request>, ApplicationError> {
        self.requests.list(filter).await.map_err(storage)
    }

    /// Decides and applies a status change. A comment, when present, is
    /// recorded even if the status itself does not change.
    ///
    /// Lost races against a concurrent
    /// writer resolve by re-reading: if the row already carries the target
    /// status the retry succeeds as a no-op, otherwise the caller gets the
    /// transition error computed against the actual status.
    pub async fn update_status(
        &self,
        id: &RequestId,
        target: RequestStatus,
        comment: Option<&str>,
        actor: &Actor,
    ) -> Result<StatusUpdate, ApplicationError> {
        let current = self.get(id).await?;

        let decision = match self.engine.decide(current.status, target, actor, comment) {
            Ok(decision) => decision,
            Err(DomainError::NoOpTransition { .. }) => {
                // The comment append is independent of the status change:
                // a note on an unchanged status is still recorded.
                let request = match comment {
                    Some(text) => {
                        let entry = audit::comment_entry(actor.name.clone(), actor.role, text);
                        self.requests.append_comment(id, entry).await.map_err(storage)?.ok_or_else(
                            || ApplicationError::NotFound { entity: "request", id: id.0.clone() },
                        )?
                    }
                    None => current,
                };
                return Ok(StatusUpdate { request, applied: false });
            }
            Err(error) => return Err(error.into()),
        };

        let outcome = self
            .requests
            .apply_transition(id, decision.from, decision.to, decision.history, decision.comment)
            .await
            .map_err(storage)?;

        let request = match outcome {
            TransitionWriteOutcome::Applied(request) => request,
            TransitionWriteOutcome::NotFound => {
                return Err(ApplicationError::NotFound { entity: "request", id: id.0.clone() });
            }
            TransitionWriteOutcome::Conflict { actual } if actual == target => {
                let request = self.get(id).await?;
                return Ok(StatusUpdate { request, applied: false });
            }
            TransitionWriteOutcome::Conflict { actual } => {
                return Err(DomainError::InvalidTransition { from: actual, to: target }.into());
            }
        };

        info!(
            event_name = "request.status_changed",
            request_id = %request.id,
            from = %decision.from,
            to = %decision.to,
            actor = %actor.name,
            "transition applied"
        );

        self.notify(
            None,
            "request status updated",
            format!("request {} for {} is now {}", request.id, request.employee_name, target),
            "request",
        )
        .await;

        Ok(StatusUpdate { request, applied: true })
    }

    /// Administrative delete; sits outside the workflow, so terminal
    /// statuses are deletable too.
    pub async fn delete(&self, id: &RequestId) -> Result<(), ApplicationError> {
        let removed = self.requests.delete(id).await.map_err(storage)?;
        if removed {
            info!(event_name = "request.deleted", request_id = %id, "request removed");
            Ok(())
        } else {
            Err(ApplicationError::NotFound { entity: "request", id: id.0.clone() })
        }
    }

    pub async fn list_notifications(
        &self,
        user_id: &str,
    ) -> Result<Vec<Notification>, ApplicationError> {
        self.notifications.list_for_user(user_id).await.map_err(storage)
    }

    pub async fn mark_notification_read(
        &self,
        id: &NotificationId,
    ) -> Result<(), ApplicationError> {
        let found = self.notifications.mark_read(id).await.map_err(storage)?;
        if found {
            Ok(())
        } else {
            Err(ApplicationError::NotFound { entity: "notification", id: id.0.clone() })
        }
    }

    /// Best-effort dispatch. Failure here must never roll back or fail the
    /// operation that triggered it.
    async fn notify(
        &self,
        recipient: Option<&str>,
        title: &str,
        body: String,
        kind: &str,
    ) {
        let notification = Notification::new(recipient, title, body, kind);
        if let Err(error) = self.notifications.insert(notification).await {
            warn!(
                event_name = "notification.delivery_failed",
                error = %error,
                title,
                "notification dropped; continuing"
            );
        }
    }
}
