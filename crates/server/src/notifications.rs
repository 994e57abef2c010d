//! JSON API routes for the notification inbox.
//!
//! Endpoints:
//! - `GET /api/notifications?userId=...`   — list a recipient's notifications
//! - `PUT /api/notifications/{id}/read`    — mark one notification as read

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;

use staffdesk_core::domain::notification::{Notification, NotificationId, SYSTEM_RECIPIENT};
use staffdesk_db::repositories::{NotificationRepository, RequestRepository};

use crate::requests::{api_error, ApiError, ApiMessage};
use crate::service::RequestService;

#[derive(Debug, Default, Deserialize)]
pub struct InboxQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

pub fn router<R, N>(service: RequestService<R, N>) -> Router
where
    R: RequestRepository + Send + Sync + 'static,
    N: NotificationRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/api/notifications", get(list_notifications::<R, N>))
        .route("/api/notifications/{id}/read", put(mark_read::<R, N>))
        .with_state(service)
}

async fn list_notifications<R, N>(
    Query(query): Query<InboxQuery>,
    State(service): State<RequestService<R, N>>,
) -> Result<Json<Vec<Notification>>, (StatusCode, Json<ApiError>)>
where
    R: RequestRepository + Send + Sync,
    N: NotificationRepository + Send + Sync,
{
    // Missing userId means the shared operations inbox.
    let user_id = query.user_id.as_deref().unwrap_or(SYSTEM_RECIPIENT);
    let notifications = service.list_notifications(user_id).await.map_err(api_error)?;
    Ok(Json(notifications))
}

async fn mark_read<R, N>(
    Path(id): Path<String>,
    State(service): State<RequestService<R, N>>,
) -> Result<Json<ApiMessage>, (StatusCode, Json<ApiError>)>
where
    R: RequestRepository + Send + Sync,
    N: NotificationRepository + Send + Sync,
{
    service.mark_notification_read(&NotificationId(id.clone())).await.map_err(api_error)?;
    Ok(Json(ApiMessage { success: true, message: format!("notification {id} marked read") }))
}
