//! Monitoring HTTP endpoints
//!
//! Thin layer over the engine: handlers always return a structured JSON body,
//! never a 5xx for engine-level faults (those ride inside the result's ERROR
//! status).

use std::sync::Arc;

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Local;
use serde::Serialize;
use serde_json::{json, Value};

use crate::monitoring::{
    classify, CycleMonitor, DailyCheckResult, DailyPresenceMonitor, MonitoringScheduler,
    OverallCheckResult, SchedulerState,
};

/// Shared handler state, wired once in main.
#[derive(Clone)]
pub struct AppState {
    pub scheduler: Arc<MonitoringScheduler>,
    pub monitor: Arc<CycleMonitor>,
    pub daily: Arc<DailyPresenceMonitor>,
    pub notifications_configured: bool,
}

/// Create the API router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/monitoring/check", get(run_check))
        .route("/api/monitoring/daily", get(run_daily_check))
        .route("/api/monitoring/status", get(get_status))
        .route("/api/monitoring/start", post(start_scheduler))
        .route("/api/monitoring/stop", post(stop_scheduler))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    }))
}

/// On-demand full check, independent of the scheduler's timer.
async fn run_check(State(state): State<AppState>) -> Json<OverallCheckResult> {
    Json(state.scheduler.run_check_now().await)
}

/// Has every tracked symbol produced any data today at all.
async fn run_daily_check(State(state): State<AppState>) -> Json<DailyCheckResult> {
    Json(state.daily.check().await)
}

#[derive(Debug, Serialize)]
struct CadenceStatus {
    cadence_id: String,
    next_expected_time: String,
    in_check_window: bool,
}

#[derive(Debug, Serialize)]
struct MonitoringStatusResponse {
    timestamp: String,
    scheduler: SchedulerState,
    expected_symbols: Vec<String>,
    tolerance_minutes: i64,
    cadences: Vec<CadenceStatus>,
    notifications_configured: bool,
}

async fn get_status(State(state): State<AppState>) -> Json<MonitoringStatusResponse> {
    let now = Local::now().naive_local();
    let config = state.monitor.config();

    let cadences = config
        .cadences
        .iter()
        .map(|cadence| {
            let schedule = classify(cadence, now, config.tolerance_minutes);
            CadenceStatus {
                cadence_id: cadence.id.clone(),
                next_expected_time: format!(
                    "{} {}",
                    schedule.date,
                    schedule.time.format("%H:%M:%S")
                ),
                in_check_window: schedule.is_in_window(),
            }
        })
        .collect();

    Json(MonitoringStatusResponse {
        timestamp: now.format("%Y-%m-%d %H:%M:%S").to_string(),
        scheduler: state.scheduler.status(),
        expected_symbols: config.expected_symbols.clone(),
        tolerance_minutes: config.tolerance_minutes,
        cadences,
        notifications_configured: state.notifications_configured,
    })
}

async fn start_scheduler(State(state): State<AppState>) -> Json<SchedulerState> {
    state.scheduler.start().await;
    Json(state.scheduler.status())
}

async fn stop_scheduler(State(state): State<AppState>) -> Json<SchedulerState> {
    state.scheduler.stop().await;
    Json(state.scheduler.status())
}
