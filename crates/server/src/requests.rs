//! JSON API routes for the request lifecycle.
//!
//! Endpoints:
//! - `POST   /api/requests`              — submit a new request
//! - `GET    /api/requests`              — list requests (status/type/search filters)
//! - `GET    /api/requests/{id}`         — fetch one request with full history
//! - `PUT    /api/requests/{id}/status`  — move a request through the workflow
//! - `DELETE /api/requests/{id}`         — administrative removal

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use uuid::Uuid;

use staffdesk_core::domain::request::{Actor, ActorRole, NewRequest, RequestId, RequestStatus};
use staffdesk_core::errors::{ApplicationError, DomainError, InterfaceError};
use staffdesk_db::repositories::{NotificationRepository, RequestFilter, RequestRepository};

use crate::service::RequestService;

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: &'static str,
    #[serde(rename = "correlationId")]
    pub correlation_id: String,
}

#[derive(Debug, Serialize)]
pub struct ApiMessage {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub request_type: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: RequestStatus,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub role: Option<ActorRole>,
}

pub fn router<R, N>(service: RequestService<R, N>) -> Router
where
    R: RequestRepository + Send + Sync + 'static,
    N: NotificationRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/api/requests", get(list_requests::<R, N>).post(submit_request::<R, N>))
        .route("/api/requests/{id}", get(get_request::<R, N>).delete(delete_request::<R, N>))
        .route("/api/requests/{id}/status", put(update_status::<R, N>))
        .with_state(service)
}

async fn submit_request<R, N>(
    State(service): State<RequestService<R, N>>,
    Json(body): Json<NewRequest>,
) -> Result<(StatusCode, Json<staffdesk_core::domain::request::Request>), (StatusCode, Json<ApiError>)>
where
    R: RequestRepository + Send + Sync,
    N: NotificationRepository + Send + Sync,
{
    let request = service.submit(body).await.map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(request)))
}

async fn list_requests<R, N>(
    Query(query): Query<ListQuery>,
    State(service): State<RequestService<R, N>>,
) -> Result<Json<Vec<staffdesk_core::domain::request::Request>>, (StatusCode, Json<ApiError>)>
where
    R: RequestRepository + Send + Sync,
    N: NotificationRepository + Send + Sync,
{
    let filter = list_filter(&query).map_err(api_error)?;
    let requests = service.list(&filter).await.map_err(api_error)?;
    Ok(Json(requests))
}

async fn get_request<R, N>(
    Path(id): Path<String>,
    State(service): State<RequestService<R, N>>,
) -> Result<Json<staffdesk_core::domain::request::Request>, (StatusCode, Json<ApiError>)>
where
    R: RequestRepository + Send + Sync,
    N: NotificationRepository + Send + Sync,
{
    let request = service.get(&RequestId(id)).await.map_err(api_error)?;
    Ok(Json(request))
}

async fn update_status<R, N>(
    Path(id): Path<String>,
    State(service): State<RequestService<R, N>>,
    Json(body): Json<StatusBody>,
) -> Result<Json<staffdesk_core::domain::request::Request>, (StatusCode, Json<ApiError>)>
where
    R: RequestRepository + Send + Sync,
    N: NotificationRepository + Send + Sync,
{
    let actor = Actor {
        name: body.author.unwrap_or_else(|| "system".to_owned()),
        role: body.role.unwrap_or(ActorRole::Admin),
    };
    let update = service
        .update_status(&RequestId(id), body.status, body.comment.as_deref(), &actor)
        .await
        .map_err(api_error)?;
    Ok(Json(update.request))
}

async fn delete_request<R, N>(
    Path(id): Path<String>,
    State(service): State<RequestService<R, N>>,
) -> Result<Json<ApiMessage>, (StatusCode, Json<ApiError>)>
where
    R: RequestRepository + Send + Sync,
    N: NotificationRepository + Send + Sync,
{
    service.delete(&RequestId(id.clone())).await.map_err(api_error)?;
    Ok(Json(ApiMessage { success: true, message: format!("request {id} deleted") }))
}

/// Translates query-string filters into a repository filter, rejecting
/// unknown status values instead of silently matching nothing.
fn list_filter(query: &ListQuery) -> Result<RequestFilter, ApplicationError> {
    let status = match query.status.as_deref() {
        None | Some("") | Some("all") => None,
        Some(raw) => Some(RequestStatus::parse(raw).ok_or_else(|| {
            DomainError::Validation { fields: vec!["status".to_owned()] }
        })?),
    };
    Ok(RequestFilter {
        status,
        request_type: query.request_type.clone().filter(|value| !value.is_empty()),
        search: query.search.clone().filter(|value| !value.is_empty()),
    })
}

/// Maps an application failure to a response status, a stable client-safe
/// message, and a correlation id that also lands in the server log.
pub(crate) fn api_error(error: ApplicationError) -> (StatusCode, Json<ApiError>) {
    let correlation_id = Uuid::new_v4().simple().to_string();
    let interface = error.into_interface(correlation_id.clone());
    let status = match &interface {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
        InterfaceError::Conflict { .. } => StatusCode::CONFLICT,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        error!(
            event_name = "api.request_failed",
            correlation_id = %correlation_id,
            status = %status,
            error = %interface,
            "request handling failed"
        );
    } else {
        warn!(
            event_name = "api.request_rejected",
            correlation_id = %correlation_id,
            status = %status,
            error = %interface,
            "request rejected"
        );
    }

    (status, Json(ApiError { error: interface.user_message(), correlation_id }))
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request as HttpRequest, StatusCode};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::util::ServiceExt;

    use staffdesk_core::workflow::TransitionEngine;
    use staffdesk_db::repositories::{
        InMemoryNotificationRepository, InMemoryRequestRepository,
    };

    use crate::service::RequestService;

    fn app() -> axum::Router {
        let service = RequestService::new(
            Arc::new(InMemoryRequestRepository::default()),
            Arc::new(InMemoryNotificationRepository::default()),
            TransitionEngine::default(),
        );
        super::router(service)
    }

    async fn send(app: &axum::Router, request: HttpRequest<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, value)
    }

    fn json_request(method: &str, uri: &str, body: Value) -> HttpRequest<Body> {
        HttpRequest::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    fn get_request(uri: &str) -> HttpRequest<Body> {
        HttpRequest::builder().uri(uri).body(Body::empty()).expect("request")
    }

    fn submission() -> Value {
        json!({
            "employeeId": "EMP-7",
            "employeeName": "Sara Ahmadi",
            "requestType": "annual-leave",
            "priority": "high",
            "description": "two weeks in September",
        })
    }

    #[tokio::test]
    async fn submit_then_fetch_round_trips() {
        let app = app();

        let (status, created) =
            send(&app, json_request("POST", "/api/requests", submission())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["status"], "pending");
        assert_eq!(created["employeeName"], "Sara Ahmadi");
        assert_eq!(created["history"].as_array().expect("history").len(), 1);

        let id = created["id"].as_str().expect("id").to_owned();
        let (status, fetched) = send(&app, get_request(&format!("/api/requests/{id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["id"], id.as_str());
    }

    #[tokio::test]
    async fn submit_with_missing_fields_is_bad_request() {
        let app = app();

        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/api/requests",
                json!({
                    "employeeId": "",
                    "employeeName": "Sara",
                    "requestType": "leave",
                    "priority": "low",
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().expect("error").contains("could not be processed"));
        assert!(!body["correlationId"].as_str().expect("correlation id").is_empty());
    }

    #[tokio::test]
    async fn list_honors_status_and_search_filters() {
        let app = app();

        send(&app, json_request("POST", "/api/requests", submission())).await;
        let mut other = submission();
        other["employeeName"] = json!("Reza Karimi");
        other["requestType"] = json!("equipment");
        send(&app, json_request("POST", "/api/requests", other)).await;

        let (status, listed) = send(&app, get_request("/api/requests")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().expect("list").len(), 2);

        let (_, by_type) = send(&app, get_request("/api/requests?type=equipment")).await;
        assert_eq!(by_type.as_array().expect("list").len(), 1);

        let (_, by_search) = send(&app, get_request("/api/requests?search=sara")).await;
        assert_eq!(by_search.as_array().expect("list").len(), 1);
        assert_eq!(by_search[0]["employeeName"], "Sara Ahmadi");
    }

    #[tokio::test]
    async fn unknown_status_filter_is_rejected() {
        let app = app();
        let (status, _) = send(&app, get_request("/api/requests?status=archived")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn status_update_appends_history_and_comment() {
        let app = app();

        let (_, created) = send(&app, json_request("POST", "/api/requests", submission())).await;
        let id = created["id"].as_str().expect("id").to_owned();

        let (status, updated) = send(
            &app,
            json_request(
                "PUT",
                &format!("/api/requests/{id}/status"),
                json!({
                    "status": "approved-manager",
                    "comment": "headcount covered",
                    "author": "Leila Hosseini",
                    "role": "manager",
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["status"], "approved-manager");
        let history = updated["history"].as_array().expect("history");
        assert_eq!(history.len(), 2);
        assert_eq!(history[1]["action"], "status changed to approved-manager");
        let comments = updated["comments"].as_array().expect("comments");
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0]["comment"], "headcount covered");
    }

    #[tokio::test]
    async fn transition_out_of_terminal_state_conflicts() {
        let app = app();

        let (_, created) = send(&app, json_request("POST", "/api/requests", submission())).await;
        let id = created["id"].as_str().expect("id").to_owned();

        send(
            &app,
            json_request(
                "PUT",
                &format!("/api/requests/{id}/status"),
                json!({"status": "rejected-manager", "author": "Leila", "role": "manager"}),
            ),
        )
        .await;

        let (status, body) = send(
            &app,
            json_request(
                "PUT",
                &format!("/api/requests/{id}/status"),
                json!({"status": "approved-ceo", "author": "Omid", "role": "ceo"}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].as_str().expect("error").contains("cannot change status"));
    }

    #[tokio::test]
    async fn repeated_status_update_is_accepted_without_new_history() {
        let app = app();

        let (_, created) = send(&app, json_request("POST", "/api/requests", submission())).await;
        let id = created["id"].as_str().expect("id").to_owned();
        let body = json!({"status": "under-review", "author": "Leila", "role": "manager"});

        send(&app, json_request("PUT", &format!("/api/requests/{id}/status"), body.clone())).await;
        let (status, updated) =
            send(&app, json_request("PUT", &format!("/api/requests/{id}/status"), body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["status"], "under-review");
        assert_eq!(updated["history"].as_array().expect("history").len(), 2);
    }

    #[tokio::test]
    async fn delete_removes_request_regardless_of_status() {
        let app = app();

        let (_, created) = send(&app, json_request("POST", "/api/requests", submission())).await;
        let id = created["id"].as_str().expect("id").to_owned();

        let (status, body) = send(
            &app,
            HttpRequest::builder()
                .method("DELETE")
                .uri(format!("/api/requests/{id}"))
                .body(Body::empty())
                .expect("request"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let (status, _) = send(&app, get_request(&format!("/api/requests/{id}"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn missing_request_reports_not_found() {
        let app = app();
        let (status, body) = send(&app, get_request("/api/requests/REQ-missing")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "The requested record does not exist.");
    }
}
