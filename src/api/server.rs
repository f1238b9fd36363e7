//! API Server module
//!
//! JSON endpoints over a shared [`Core`] for the rendering layer, plus a
//! server-sent event stream that signals every state change.

use std::collections::HashSet;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::core::{Core, PlanResponse};
use crate::models::PlanRequest;
use crate::session::SessionError;

/// Identifies a task within a day
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskRef {
    pub day_index: usize,
    pub task_id: String,
}

/// Request to set or clear a reminder
#[derive(Debug, Serialize, Deserialize)]
pub struct ReminderRequest {
    pub day_index: usize,
    pub task_id: String,
    pub reminder: Option<DateTime<Utc>>,
}

/// Request to move a top-level task
#[derive(Debug, Serialize, Deserialize)]
pub struct MoveTaskRequest {
    pub from_day: usize,
    pub to_day: usize,
    pub task_id: String,
    pub target_index: Option<usize>,
}

/// Request to set completion on many tasks at once
#[derive(Debug, Serialize, Deserialize)]
pub struct BulkStatusRequest {
    pub task_ids: Vec<String>,
    pub completed: bool,
}

/// Request to rename an archive entry
#[derive(Debug, Serialize, Deserialize)]
pub struct RenameRequest {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

/// Server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub address: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: ([127, 0, 0, 1], 3000).into(),
        }
    }
}

/// API responses
#[derive(Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

fn error_status(error: &SessionError) -> StatusCode {
    match error {
        SessionError::NoPlan => StatusCode::NOT_FOUND,
        SessionError::Planner(_) | SessionError::Breakdown(_) => StatusCode::BAD_GATEWAY,
        SessionError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Helper function to map Core results to Axum responses
fn map_core_result_to_response<T: Serialize>(
    result: Result<PlanResponse<T>, SessionError>,
) -> Response {
    map_core_result_simple(result)
}

/// Helper function to map Core results (without PlanResponse) to Axum responses
fn map_core_result_simple<T: Serialize>(result: Result<T, SessionError>) -> Response {
    match result {
        Ok(data) => (StatusCode::OK, Json(ApiResponse::success(data))).into_response(),
        Err(e) => {
            let status = error_status(&e);
            if status.is_server_error() {
                tracing::error!("Request failed: {}", e);
            }
            (status, Json(ApiResponse::<T>::error(e.to_string()))).into_response()
        }
    }
}

fn ok<T: Serialize>(data: T) -> Response {
    map_core_result_simple(Ok::<T, SessionError>(data))
}

/// Builds the application router
pub fn router(core: Core) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // --- Session and plan --- //
        .route("/api/session", get(get_session))
        .route("/api/error", delete(dismiss_error))
        .route("/api/plan", get(get_plan).delete(discard_plan))
        .route("/api/plan/generate", post(generate_plan))
        .route("/api/plan/regenerate", post(regenerate_plan))
        .route("/api/plan/search", get(search_plan))
        .route("/api/plan/export", get(export_plan))
        // --- Task edits --- //
        .route("/api/tasks/toggle", post(toggle_task))
        .route("/api/tasks/expand", post(expand_task))
        .route("/api/tasks/reminder", post(set_reminder))
        .route("/api/tasks/breakdown", post(break_down_task))
        .route("/api/tasks/move", post(move_task))
        .route("/api/tasks/bulk", post(bulk_set_status))
        // --- Versioning --- //
        .route("/api/undo", post(undo))
        .route("/api/redo", post(redo))
        // --- History archive --- //
        .route("/api/history", get(list_history).post(save_history))
        .route("/api/history/last", post(load_last_session))
        .route(
            "/api/history/:id",
            delete(delete_history).put(rename_history),
        )
        .route("/api/history/:id/load", post(load_history))
        // --- Updates --- //
        .route("/api/events", get(events_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(core)
}

/// Starts the API server
pub async fn serve(core: Core, config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let app = router(core);

    tracing::info!("Starting server on {}", config.address);
    let listener = TcpListener::bind(config.address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Session and plan --- //

async fn get_session(State(core): State<Core>) -> impl IntoResponse {
    ok(core.view())
}

async fn dismiss_error(State(core): State<Core>) -> impl IntoResponse {
    ok(core.dismiss_error())
}

async fn get_plan(State(core): State<Core>) -> impl IntoResponse {
    ok(core.get_plan())
}

async fn discard_plan(State(core): State<Core>) -> impl IntoResponse {
    ok(core.discard())
}

async fn generate_plan(
    State(core): State<Core>,
    Json(payload): Json<PlanRequest>,
) -> impl IntoResponse {
    map_core_result_to_response(core.generate(payload).await)
}

async fn regenerate_plan(State(core): State<Core>) -> impl IntoResponse {
    map_core_result_to_response(core.regenerate().await)
}

async fn search_plan(
    State(core): State<Core>,
    Query(params): Query<SearchParams>,
) -> impl IntoResponse {
    map_core_result_simple(core.search(&params.q).ok_or(SessionError::NoPlan))
}

async fn export_plan(State(core): State<Core>) -> impl IntoResponse {
    map_core_result_simple(core.export_markdown().ok_or(SessionError::NoPlan))
}

// --- Task edits --- //

async fn toggle_task(State(core): State<Core>, Json(payload): Json<TaskRef>) -> impl IntoResponse {
    ok(core.toggle_completion(payload.day_index, &payload.task_id))
}

async fn expand_task(State(core): State<Core>, Json(payload): Json<TaskRef>) -> impl IntoResponse {
    ok(core.toggle_expanded(payload.day_index, &payload.task_id))
}

async fn set_reminder(
    State(core): State<Core>,
    Json(payload): Json<ReminderRequest>,
) -> impl IntoResponse {
    ok(core.set_reminder(payload.day_index, &payload.task_id, payload.reminder))
}

async fn break_down_task(
    State(core): State<Core>,
    Json(payload): Json<TaskRef>,
) -> impl IntoResponse {
    map_core_result_to_response(core.break_down(payload.day_index, &payload.task_id).await)
}

async fn move_task(
    State(core): State<Core>,
    Json(payload): Json<MoveTaskRequest>,
) -> impl IntoResponse {
    ok(core.move_task(
        payload.from_day,
        payload.to_day,
        &payload.task_id,
        payload.target_index,
    ))
}

async fn bulk_set_status(
    State(core): State<Core>,
    Json(payload): Json<BulkStatusRequest>,
) -> impl IntoResponse {
    let ids: HashSet<String> = payload.task_ids.into_iter().collect();
    ok(core.bulk_set_status(&ids, payload.completed))
}

// --- Versioning --- //

async fn undo(State(core): State<Core>) -> impl IntoResponse {
    ok(core.undo())
}

async fn redo(State(core): State<Core>) -> impl IntoResponse {
    ok(core.redo())
}

// --- History archive --- //

async fn list_history(State(core): State<Core>) -> impl IntoResponse {
    ok(core.history())
}

async fn save_history(State(core): State<Core>) -> impl IntoResponse {
    map_core_result_to_response(core.save_to_history())
}

async fn load_history(State(core): State<Core>, Path(id): Path<String>) -> impl IntoResponse {
    ok(core.load_history(&id))
}

async fn load_last_session(State(core): State<Core>) -> impl IntoResponse {
    ok(core.load_last_session())
}

async fn rename_history(
    State(core): State<Core>,
    Path(id): Path<String>,
    Json(payload): Json<RenameRequest>,
) -> impl IntoResponse {
    map_core_result_to_response(core.rename_history(&id, &payload.name))
}

async fn delete_history(State(core): State<Core>, Path(id): Path<String>) -> impl IntoResponse {
    map_core_result_to_response(core.delete_history(&id))
}

// --- Updates --- //

async fn events_handler(State(core): State<Core>) -> impl IntoResponse {
    let receiver = core.subscribe();
    let stream = EventStream::new(core, receiver);

    let headers = [
        (
            axum::http::header::CONTENT_TYPE,
            axum::http::HeaderValue::from_static("text/event-stream"),
        ),
        (
            axum::http::header::CACHE_CONTROL,
            axum::http::HeaderValue::from_static("no-cache"),
        ),
    ];

    (headers, axum::body::Body::from_stream(stream))
}

const UPDATE_EVENT: &str = "event: update\ndata: change\n\n";

struct EventStream {
    core: Core,
    receiver: tokio::sync::broadcast::Receiver<()>,
}

impl EventStream {
    fn new(core: Core, receiver: tokio::sync::broadcast::Receiver<()>) -> Self {
        Self { core, receiver }
    }
}

impl Stream for EventStream {
    type Item = Result<String, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.receiver.try_recv() {
            Ok(()) => Poll::Ready(Some(Ok(UPDATE_EVENT.to_string()))),
            Err(tokio::sync::broadcast::error::TryRecvError::Empty) => {
                let waker = cx.waker().clone();
                tokio::spawn(async move {
                    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                    waker.wake();
                });
                Poll::Pending
            }
            // Missed messages still mean something changed
            Err(tokio::sync::broadcast::error::TryRecvError::Lagged(_)) => {
                Poll::Ready(Some(Ok(UPDATE_EVENT.to_string())))
            }
            Err(tokio::sync::broadcast::error::TryRecvError::Closed) => {
                self.receiver = self.core.subscribe();
                Poll::Pending
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::MemoryStore;
    use crate::export::MarkdownExport;
    use crate::models::{GeneratedDay, GeneratedPlan, GeneratedTask, HistoryItem, PlanState};
    use crate::planner::{Planner, PlannerError};
    use crate::search::SearchView;
    use crate::session::{Session, SessionView};
    use axum::{body::Body, http::Request};
    use http_body_util::BodyExt;
    use pretty_assertions::assert_eq;
    use serde::de::DeserializeOwned;
    use serde_json::json;
    use std::sync::Arc;
    use tower::ServiceExt;

    struct FixedPlanner;

    #[async_trait::async_trait]
    impl Planner for FixedPlanner {
        async fn generate_plan(
            &self,
            goal: &str,
            duration: &str,
        ) -> Result<GeneratedPlan, PlannerError> {
            Ok(GeneratedPlan {
                plan_title: format!("{} in {}", goal, duration),
                overview: "Overview".to_string(),
                days: vec![
                    GeneratedDay {
                        day_number: 1,
                        day_label: "Day 1".to_string(),
                        theme: "Basics".to_string(),
                        tasks: vec![
                            GeneratedTask {
                                description: "Learn guitar basics".to_string(),
                                video_link: None,
                            },
                            GeneratedTask {
                                description: "Buy strings".to_string(),
                                video_link: None,
                            },
                        ],
                    },
                    GeneratedDay {
                        day_number: 2,
                        day_label: "Day 2".to_string(),
                        theme: "Chords".to_string(),
                        tasks: vec![GeneratedTask {
                            description: "Play G major".to_string(),
                            video_link: None,
                        }],
                    },
                ],
            })
        }

        async fn break_down_task(
            &self,
            description: &str,
        ) -> Result<Vec<GeneratedTask>, PlannerError> {
            if description.starts_with("Buy") {
                return Err(PlannerError::EmptyResponse);
            }
            Ok(vec![
                GeneratedTask {
                    description: "Hold the pick".to_string(),
                    video_link: None,
                },
                GeneratedTask {
                    description: "Strum".to_string(),
                    video_link: None,
                },
            ])
        }
    }

    fn setup_test_app() -> (Core, Router) {
        let session = Session::init(Box::new(MemoryStore::new()));
        let core = Core::new(session, Arc::new(FixedPlanner));
        (core.clone(), router(core))
    }

    // Helper to make requests and deserialize JSON response data
    async fn request_json<T: DeserializeOwned + Serialize>(
        app: &Router,
        method: &str,
        uri: &str,
        body: serde_json::Value,
    ) -> Result<(StatusCode, Option<T>), String> {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .header("Content-Type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let body_bytes = response.into_body().collect().await.unwrap().to_bytes();

        if status.is_success() {
            let api_resp: ApiResponse<T> = serde_json::from_slice(&body_bytes)
                .map_err(|e| format!("Failed to parse success response: {}", e))?;
            Ok((status, api_resp.data))
        } else {
            let api_resp: ApiResponse<()> = serde_json::from_slice(&body_bytes)
                .map_err(|_| format!("HTTP Error: {}", status))?;
            Err(format!(
                "API Error: {} (Status: {})",
                api_resp.error.unwrap_or_default(),
                status
            ))
        }
    }

    async fn generate(app: &Router) -> PlanState {
        let body = json!({ "goal": "Guitar", "duration": "1 Week" });
        let _: (_, Option<PlanResponse<()>>) =
            request_json(app, "POST", "/api/plan/generate", body)
                .await
                .expect("generate should succeed");
        let (_, plan): (_, Option<PlanResponse<Option<PlanState>>>) =
            request_json(app, "GET", "/api/plan", json!(null)).await.unwrap();
        plan.unwrap().res.unwrap()
    }

    #[tokio::test]
    async fn test_plan_lifecycle() {
        let (_core, app) = setup_test_app();

        let (_, empty): (_, Option<PlanResponse<Option<PlanState>>>) =
            request_json(&app, "GET", "/api/plan", json!(null)).await.unwrap();
        assert!(empty.unwrap().res.is_none());

        let plan = generate(&app).await;
        assert_eq!(plan.plan_title, "Guitar in 1 Week");
        let task_id = plan.days[0].tasks[0].id().to_string();

        let (_, toggled): (_, Option<PlanResponse<bool>>) = request_json(
            &app,
            "POST",
            "/api/tasks/toggle",
            json!({ "day_index": 0, "task_id": task_id }),
        )
        .await
        .unwrap();
        let toggled = toggled.unwrap();
        assert!(toggled.res);
        assert!(toggled.session.can_undo);
        assert_eq!(toggled.session.counts.completed, 1);

        let (_, undone): (_, Option<PlanResponse<bool>>) =
            request_json(&app, "POST", "/api/undo", json!(null)).await.unwrap();
        let undone = undone.unwrap();
        assert!(undone.res);
        assert_eq!(undone.session.counts.completed, 0);
        assert!(undone.session.can_redo);

        // Unknown ids are silently ignored
        let (_, missing): (_, Option<PlanResponse<bool>>) = request_json(
            &app,
            "POST",
            "/api/tasks/toggle",
            json!({ "day_index": 0, "task_id": "nope" }),
        )
        .await
        .unwrap();
        assert!(!missing.unwrap().res);
    }

    #[tokio::test]
    async fn test_move_and_bulk() {
        let (core, app) = setup_test_app();
        let plan = generate(&app).await;
        let first = plan.days[0].tasks[0].id().to_string();
        let third = plan.days[1].tasks[0].id().to_string();

        let (_, moved): (_, Option<PlanResponse<bool>>) = request_json(
            &app,
            "POST",
            "/api/tasks/move",
            json!({ "from_day": 0, "to_day": 1, "task_id": first, "target_index": 0 }),
        )
        .await
        .unwrap();
        assert!(moved.unwrap().res);

        let plan = core.get_plan().res.unwrap();
        assert_eq!(plan.days[0].tasks.len(), 1);
        assert_eq!(plan.days[1].tasks[0].id(), first);

        let (_, bulk): (_, Option<PlanResponse<bool>>) = request_json(
            &app,
            "POST",
            "/api/tasks/bulk",
            json!({ "task_ids": [first, third], "completed": true }),
        )
        .await
        .unwrap();
        let bulk = bulk.unwrap();
        assert!(bulk.res);
        assert_eq!(bulk.session.counts.completed, 2);
        assert_eq!(bulk.session.undo_depth, 2);
    }

    #[tokio::test]
    async fn test_breakdown_success_and_failure() {
        let (core, app) = setup_test_app();
        let plan = generate(&app).await;
        let learn = plan.days[0].tasks[0].id().to_string();
        let buy = plan.days[0].tasks[1].id().to_string();

        let (_, broken): (_, Option<PlanResponse<bool>>) = request_json(
            &app,
            "POST",
            "/api/tasks/breakdown",
            json!({ "day_index": 0, "task_id": learn }),
        )
        .await
        .unwrap();
        assert!(broken.unwrap().res);
        let plan = core.get_plan().res.unwrap();
        assert_eq!(plan.days[0].tasks[0].subtasks().len(), 2);
        assert!(plan.days[0].tasks[0].is_expanded());

        let failed: Result<(_, Option<PlanResponse<bool>>), _> = request_json(
            &app,
            "POST",
            "/api/tasks/breakdown",
            json!({ "day_index": 0, "task_id": buy }),
        )
        .await;
        let message = failed.unwrap_err();
        assert!(message.contains("Failed to break down task"), "{}", message);
        assert!(message.contains("502"), "{}", message);

        let (_, view): (_, Option<SessionView>) =
            request_json(&app, "GET", "/api/session", json!(null)).await.unwrap();
        assert!(view.unwrap().error.is_some());

        let _: (_, Option<PlanResponse<()>>) =
            request_json(&app, "DELETE", "/api/error", json!(null)).await.unwrap();
        assert!(core.view().error.is_none());
    }

    #[tokio::test]
    async fn test_history_endpoints() {
        let (core, app) = setup_test_app();

        let no_plan: Result<(_, Option<PlanResponse<String>>), _> =
            request_json(&app, "POST", "/api/history", json!(null)).await;
        assert!(no_plan.unwrap_err().contains("404"));

        generate(&app).await;
        let (_, saved): (_, Option<PlanResponse<String>>) =
            request_json(&app, "POST", "/api/history", json!(null)).await.unwrap();
        let id = saved.unwrap().res;

        let uri = format!("/api/history/{}", id);
        let (_, renamed): (_, Option<PlanResponse<bool>>) =
            request_json(&app, "PUT", &uri, json!({ "name": "Guitar v1" })).await.unwrap();
        assert!(renamed.unwrap().res);

        let (_, listed): (_, Option<Vec<HistoryItem>>) =
            request_json(&app, "GET", "/api/history", json!(null)).await.unwrap();
        let listed = listed.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Guitar v1");

        let _: (_, Option<PlanResponse<()>>) =
            request_json(&app, "DELETE", "/api/plan", json!(null)).await.unwrap();
        assert!(!core.view().has_plan);

        let (_, loaded): (_, Option<PlanResponse<bool>>) =
            request_json(&app, "POST", "/api/history/last", json!(null)).await.unwrap();
        let loaded = loaded.unwrap();
        assert!(loaded.res);
        assert_eq!(loaded.session.active_history_id.as_deref(), Some(id.as_str()));
        assert!(!loaded.session.can_regenerate);

        let (_, deleted): (_, Option<PlanResponse<bool>>) =
            request_json(&app, "DELETE", &uri, json!(null)).await.unwrap();
        let deleted = deleted.unwrap();
        assert!(deleted.res);
        assert!(deleted.session.active_history_id.is_none());
    }

    #[tokio::test]
    async fn test_search_and_export() {
        let (_core, app) = setup_test_app();

        let missing: Result<(_, Option<SearchView>), _> =
            request_json(&app, "GET", "/api/plan/search?q=guitar", json!(null)).await;
        assert!(missing.is_err());

        generate(&app).await;
        let (_, view): (_, Option<SearchView>) =
            request_json(&app, "GET", "/api/plan/search?q=GUITAR", json!(null)).await.unwrap();
        let view = view.unwrap();
        assert_eq!(view.days[0].tasks.len(), 1);
        assert!(view.days[1].tasks.is_empty());
        assert_eq!(view.days[0].counts.total, 2);

        let (_, export): (_, Option<MarkdownExport>) =
            request_json(&app, "GET", "/api/plan/export", json!(null)).await.unwrap();
        let export = export.unwrap();
        assert_eq!(export.file_name, "Guitar-in-1-Week.md");
        assert!(export.content.starts_with("# Guitar in 1 Week\n"));
        assert!(export.content.contains("- [ ] Learn guitar basics"));
    }
}
