//! `GET /healthz` and `POST /schedule` (C16, §6.3 `web`): a thin axum
//! surface standing in for the real chat-platform ingestion endpoint
//! spec.md scopes out. Grounded on the teacher's `axum::Router` +
//! `tower_http::trace::TraceLayer` binding shape.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use scheduler_core::{ScheduleApi, ScheduleError, ScheduleOutcome, ScheduleRequest};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub schedule: Arc<dyn ScheduleApi>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/schedule", post(schedule))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    StatusCode::OK
}

#[derive(Debug, Deserialize)]
struct ScheduleHttpRequest {
    job_type: String,
    payload: serde_json::Value,
    when: chrono::DateTime<chrono::Utc>,
    logical_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct ScheduleHttpResponse {
    job_id: Option<uuid::Uuid>,
    deduplicated: bool,
}

async fn schedule(
    State(state): State<AppState>,
    Json(request): Json<ScheduleHttpRequest>,
) -> Response {
    let mut schedule_request = ScheduleRequest::new(request.job_type, request.payload, request.when);
    if let Some(logical_id) = request.logical_id {
        schedule_request = schedule_request.with_logical_id(logical_id);
    }

    match state.schedule.schedule(schedule_request).await {
        Ok(ScheduleOutcome::Scheduled { job_id }) => (
            StatusCode::CREATED,
            Json(ScheduleHttpResponse {
                job_id: Some(job_id),
                deduplicated: false,
            }),
        )
            .into_response(),
        Ok(ScheduleOutcome::Deduplicated { existing_job_id }) => (
            StatusCode::OK,
            Json(ScheduleHttpResponse {
                job_id: existing_job_id,
                deduplicated: true,
            }),
        )
            .into_response(),
        Err(ScheduleError::UnknownJobType(job_type)) => {
            (StatusCode::BAD_REQUEST, format!("unknown job type: {job_type}")).into_response()
        }
        Err(ScheduleError::MalformedLogicalId(id)) => {
            (StatusCode::BAD_REQUEST, format!("malformed logical id: {id}")).into_response()
        }
        Err(ScheduleError::Store(err)) => {
            tracing::error!(error = %err, "schedule request failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use scheduler_core::testing::{InMemoryDedupIndex, InMemoryJobStore};
    use scheduler_core::FrozenClock;
    use tower::ServiceExt;

    fn test_router() -> Router {
        let clock = FrozenClock::new(chrono::Utc::now());
        let schedule = Arc::new(crate::schedule_api::DefaultScheduleApi::new(
            Arc::new(InMemoryJobStore::new()),
            Arc::new(InMemoryDedupIndex::new()),
            clock,
            vec!["daily_summary"],
        ));
        router(AppState { schedule })
    }

    #[tokio::test]
    async fn healthz_returns_200() {
        let response = test_router()
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn schedule_endpoint_accepts_a_known_job_type() {
        let body = serde_json::json!({
            "job_type": "daily_summary",
            "payload": {"user": "u1"},
            "when": chrono::Utc::now(),
        });
        let response = test_router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/schedule")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn schedule_endpoint_rejects_an_unknown_job_type() {
        let body = serde_json::json!({
            "job_type": "nope",
            "payload": {},
            "when": chrono::Utc::now(),
        });
        let response = test_router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/schedule")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
