//! JSON API handlers for the dashboard page

use crate::dashboard::DashboardCore;
use crate::errors::AppError;
use crate::ingest::{TableKind, Tables};
use crate::models::{
    AnalysisResponse, AskPayload, BooleanResponse, ChatEntry, DashboardView, SessionCreatedResponse,
};
use axum::body::Bytes;
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::sync::Arc;

pub type SharedCore = Arc<DashboardCore>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Input(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Advisor(_) => StatusCode::BAD_GATEWAY,
            AppError::Io(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string(), "code": self.code() }))).into_response()
    }
}

pub async fn health_handler(State(core): State<SharedCore>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "advisorEnabled": core.settings().advisor.enabled,
        "advisorModel": core.settings().advisor.model,
    }))
}

pub async fn create_session(State(core): State<SharedCore>) -> (StatusCode, Json<SessionCreatedResponse>) {
    let session_id = core.open_session().await;
    (StatusCode::CREATED, Json(SessionCreatedResponse { session_id }))
}

pub async fn close_session(
    State(core): State<SharedCore>,
    Path(session_id): Path<String>,
) -> Json<BooleanResponse> {
    let success = core.close_session(&session_id).await;
    Json(BooleanResponse { success })
}

/// Accepts `projects`, `employees` and `finances` file fields and runs the analysis.
pub async fn upload_analysis(
    State(core): State<SharedCore>,
    Path(session_id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<AnalysisResponse>, AppError> {
    let mut projects: Option<Bytes> = None;
    let mut employees: Option<Bytes> = None;
    let mut finances: Option<Bytes> = None;

    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        let name = field.name().unwrap_or_default().to_string();
        let data = field.bytes().await.map_err(upload_error)?;
        match name.as_str() {
            name if name == TableKind::Projects.as_str() => projects = Some(data),
            name if name == TableKind::Employees.as_str() => employees = Some(data),
            name if name == TableKind::Finances.as_str() => finances = Some(data),
            other => tracing::debug!(field = other, "ignoring unexpected upload field"),
        }
    }

    let (Some(projects), Some(employees), Some(finances)) = (projects, employees, finances) else {
        return Err(AppError::Input(
            "projects.csv, employees.csv and finances.csv are all required".to_string(),
        ));
    };

    let tables = Tables::from_bytes(&projects, &employees, &finances)?;
    Ok(Json(core.run_analysis(&session_id, tables).await?))
}

fn upload_error(error: MultipartError) -> AppError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(error.body_text())
    } else {
        AppError::Input(error.body_text())
    }
}

pub async fn dashboard_handler(
    State(core): State<SharedCore>,
    Path(session_id): Path<String>,
) -> Result<Json<Option<DashboardView>>, AppError> {
    Ok(Json(core.dashboard(&session_id).await?))
}

pub async fn ask_handler(
    State(core): State<SharedCore>,
    Path(session_id): Path<String>,
    Json(payload): Json<AskPayload>,
) -> Result<Json<ChatEntry>, AppError> {
    Ok(Json(core.ask(&session_id, &payload.question).await?))
}

pub async fn chat_handler(
    State(core): State<SharedCore>,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<ChatEntry>>, AppError> {
    Ok(Json(core.chat(&session_id).await?))
}
