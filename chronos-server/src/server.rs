//! Request router: the three pipeline operations over axum.
//!
//! Each handler is its own error boundary: stage failures become
//! `500 {"detail": ...}` responses and the process keeps serving. CORS is wide
//! open for the dev frontend; production deployments must narrow it.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info};

use chronos_core::event::{ScheduleEvent, TimeInterval};
use chronos_core::task::Task;
use chronos_core::time::{default_free_window, today_iso};

use crate::audit::{AuditLog, AuditRecord};
use crate::config::Config;
use crate::gemini::ModelGateway;
use crate::google_calendar::{CalendarGateway, busy_range};
use crate::pipeline::{self, CommitOutcome};

pub struct AppState {
    pub config: Config,
    pub model: Arc<dyn ModelGateway>,
    pub calendar: Arc<dyn CalendarGateway>,
    pub audit: AuditLog,
}

pub type SharedState = Arc<AppState>;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/parse", post(parse))
        .route("/api/optimize", post(optimize))
        .route("/api/schedule", post(schedule))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(state: SharedState) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", state.config.server.host, state.config.server.port)
        .parse()
        .context("invalid server host/port")?;

    info!(%addr, "chronos listening");
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    axum::serve(listener, router(state))
        .await
        .context("server failure")?;
    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

fn detail(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(json!({"detail": msg.into()}))).into_response()
}

#[derive(Debug, Deserialize)]
pub struct ParseRequest {
    pub text: String,
    #[serde(default)]
    pub date_iso: Option<String>,
    /// When set, current busy intervals are fetched and handed to the
    /// extractor so fixed-time suggestions avoid them.
    #[serde(default)]
    pub include_busy: bool,
}

#[derive(Debug, Serialize)]
pub struct ParseResponse {
    pub tasks: Vec<Task>,
}

async fn parse(State(state): State<SharedState>, Json(req): Json<ParseRequest>) -> Response {
    let date_iso = req
        .date_iso
        .clone()
        .or_else(|| state.config.current_date_override())
        .unwrap_or_default();

    let busy = if req.include_busy {
        let (range_start, range_end) = busy_range(state.config.calendar.lookahead_days);
        match state
            .calendar
            .list_busy_intervals(&state.config.calendar.calendar_id, range_start, range_end)
            .await
        {
            Ok(busy) => Some(busy),
            Err(e) => {
                error!(error = %e, "busy-interval fetch failed during parse");
                return detail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
            }
        }
    } else {
        None
    };

    match pipeline::extract_tasks(state.model.as_ref(), &req.text, &date_iso, busy.as_deref()).await
    {
        Ok(tasks) => {
            let record = AuditRecord::Parse { text: &req.text, date_iso: &date_iso, tasks: &tasks };
            if let Err(e) = state.audit.record(&record) {
                debug!(error = %e, "audit write failed");
            }
            (StatusCode::OK, Json(ParseResponse { tasks })).into_response()
        }
        Err(e) => {
            error!(error = %e, "parse failed");
            detail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OptimizeRequest {
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub free_windows: Option<Vec<TimeInterval>>,
}

#[derive(Debug, Serialize)]
pub struct OptimizeResponse {
    pub events: Vec<ScheduleEvent>,
}

async fn optimize(State(state): State<SharedState>, Json(req): Json<OptimizeRequest>) -> Response {
    match do_optimize(&state, req).await {
        Ok(events) => (StatusCode::OK, Json(OptimizeResponse { events })).into_response(),
        Err(e) => {
            error!(error = %e, "optimize failed");
            detail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn do_optimize(state: &AppState, req: OptimizeRequest) -> Result<Vec<ScheduleEvent>> {
    let tz = state.config.timezone()?;

    let free_windows = match req.free_windows {
        Some(windows) if !windows.is_empty() => windows,
        _ => {
            let date_iso = state
                .config
                .current_date_override()
                .unwrap_or_else(|| today_iso(tz));
            vec![default_free_window(
                &date_iso,
                state.config.planner.day_start_hour,
                state.config.planner.day_end_hour,
                tz,
            )?]
        }
    };

    let (range_start, range_end) = busy_range(state.config.calendar.lookahead_days);
    let busy = state
        .calendar
        .list_busy_intervals(&state.config.calendar.calendar_id, range_start, range_end)
        .await?;

    let events =
        pipeline::optimize_schedule(state.model.as_ref(), &req.tasks, &busy, &free_windows, tz)
            .await?;

    let record = AuditRecord::Optimize {
        tasks: &req.tasks,
        busy: &busy,
        free_windows: &free_windows,
        events: &events,
    };
    if let Err(e) = state.audit.record(&record) {
        debug!(error = %e, "audit write failed");
    }

    Ok(events)
}

#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    pub events: Vec<ScheduleEvent>,
}

async fn schedule(State(state): State<SharedState>, Json(req): Json<ScheduleRequest>) -> Response {
    if req.events.is_empty() {
        return detail(StatusCode::BAD_REQUEST, "events must not be empty");
    }

    match pipeline::commit_events(
        state.calendar.as_ref(),
        &state.config.calendar.calendar_id,
        &req.events,
    )
    .await
    {
        Ok(outcome) => (StatusCode::OK, Json::<CommitOutcome>(outcome)).into_response(),
        Err(e) => {
            error!(error = %e, "schedule failed");
            detail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
