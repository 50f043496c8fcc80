use std::net::SocketAddr;

use anyhow::Result;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use tourney_core::planning::{
    DeleteReport, PlanningDetails, PlanningError, PlanningOutcome, PlanningStatusView, Planner,
};
use tourney_db::models::PlanningStatus;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }
}

impl From<PlanningError> for AppError {
    fn from(err: PlanningError) -> Self {
        let status = if err.is_not_found() {
            StatusCode::NOT_FOUND
        } else if err.is_invalid_input() {
            StatusCode::BAD_REQUEST
        } else {
            tracing::error!(error = ?err, "planning request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            message: format!("{:#}", anyhow::Error::new(err)),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = ApiResponse::<()> {
            success: false,
            message: self.message,
            data: None,
        };
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Envelope shared by every route.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
            data: Some(data),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub tournament_id: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(planner: Planner) -> Router {
    Router::new()
        .route("/api/planning/generate", post(generate))
        .route(
            "/api/planning/tournament/{tournament_id}",
            get(planning_for_tournament),
        )
        .route("/api/planning/{id}", get(planning_details).delete(delete))
        .route("/api/planning/{id}/status", get(status).put(set_status))
        .route("/api/planning/{id}/regenerate", post(regenerate))
        .layer(CorsLayer::permissive())
        .with_state(planner)
}

pub async fn run_serve(planner: Planner, bind: &str, port: u16) -> Result<()> {
    let app = build_router(planner);
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    tracing::info!("tourney serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("tourney serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for Ctrl+C");
    }
}

fn parse_id(raw: &str, what: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw)
        .map_err(|_| AppError::bad_request(format!("invalid {what} ID: {raw:?}")))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn generate(
    State(planner): State<Planner>,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<PlanningOutcome>>), AppError> {
    let Json(request) = body.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    let tournament_id = parse_id(&request.tournament_id, "tournament")?;
    let outcome = planner.generate_planning(tournament_id).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok("Planning generated", outcome),
    ))
}

async fn regenerate(
    State(planner): State<Planner>,
    Path(id): Path<String>,
) -> ApiResult<PlanningOutcome> {
    let planning_id = parse_id(&id, "planning")?;
    let outcome = planner.regenerate_planning(planning_id).await?;
    Ok(ApiResponse::ok("Planning regenerated", outcome))
}

async fn status(
    State(planner): State<Planner>,
    Path(id): Path<String>,
) -> ApiResult<PlanningStatusView> {
    let planning_id = parse_id(&id, "planning")?;
    let view = planner.planning_status(planning_id).await?;
    Ok(ApiResponse::ok("Planning status", view))
}

async fn set_status(
    State(planner): State<Planner>,
    Path(id): Path<String>,
    body: Result<Json<StatusUpdateRequest>, JsonRejection>,
) -> ApiResult<PlanningStatusView> {
    let planning_id = parse_id(&id, "planning")?;
    let Json(request) = body.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    let status = request
        .status
        .parse::<PlanningStatus>()
        .map_err(|e| AppError::bad_request(e.to_string()))?;
    let planning = planner.update_planning_status(planning_id, status).await?;
    Ok(ApiResponse::ok(
        "Planning status updated",
        PlanningStatusView::from(&planning),
    ))
}

async fn planning_details(
    State(planner): State<Planner>,
    Path(id): Path<String>,
) -> ApiResult<PlanningDetails> {
    let planning_id = parse_id(&id, "planning")?;
    let details = planner.get_planning_details(planning_id).await?;
    Ok(ApiResponse::ok("Planning found", details))
}

async fn planning_for_tournament(
    State(planner): State<Planner>,
    Path(tournament_id): Path<String>,
) -> ApiResult<PlanningDetails> {
    let tournament_id = parse_id(&tournament_id, "tournament")?;
    let details = planner
        .get_planning_details_for_tournament(tournament_id)
        .await?;
    Ok(ApiResponse::ok("Planning found", details))
}

async fn delete(
    State(planner): State<Planner>,
    Path(id): Path<String>,
) -> ApiResult<DeleteReport> {
    let planning_id = parse_id(&id, "planning")?;
    let report = planner.delete_planning(planning_id).await?;
    let message = if report.is_noop() {
        "Nothing to delete"
    } else {
        "Planning deleted"
    };
    Ok(ApiResponse::ok(message, report))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
