use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::api::health::HealthState;
use crate::api::latency::{LatencySnapshot, QueryLatency};
use crate::error::AppError;
use crate::pipeline::BuildStats;
use crate::query::engine::{self, FilterResult, ResultRow};
use crate::query::{Criteria, CriteriaParams};
use crate::state::dataset::DatasetOptions;
use crate::state::Dataset;

#[derive(Clone)]
pub struct ApiState {
    pub dataset: Arc<Dataset>,
    pub latency: Arc<QueryLatency>,
    pub health: Arc<HealthState>,
}

impl ApiState {
    pub fn new(dataset: Arc<Dataset>) -> Self {
        Self {
            dataset,
            latency: Arc::new(QueryLatency::new()),
            health: Arc::new(HealthState::new()),
        }
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/transactions", get(get_transactions))
        .route("/transactions/rejected", get(get_rejected))
        .route("/options", get(get_options))
        .route("/health", get(get_health))
        .route("/stats/latency", get(get_stats_latency))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query param structs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct RejectedRow {
    /// Tag columns that came out false for this row.
    pub failed: Vec<String>,
    #[serde(flatten)]
    pub row: ResultRow,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub rows: usize,
    pub months: Vec<String>,
    pub build: BuildStats,
    pub queries_served: u64,
    pub queries_rejected: u64,
    pub uptime_secs: u64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn validate(state: &ApiState, params: CriteriaParams) -> Result<Criteria, AppError> {
    Criteria::try_from(params).map_err(|e| {
        state.health.inc_rejected();
        debug!("[API] rejected criteria: {e}");
        AppError::from(e)
    })
}

async fn get_transactions(
    State(state): State<ApiState>,
    Query(params): Query<CriteriaParams>,
) -> Result<Json<FilterResult>, AppError> {
    let criteria = validate(&state, params)?;

    let started = Instant::now();
    let result = engine::filter(&state.dataset, &criteria);
    let elapsed = started.elapsed();
    state.latency.record(elapsed);
    state.health.inc_served();

    info!(
        kept = result.rows.len(),
        scanned = state.dataset.len(),
        elapsed_us = elapsed.as_micros() as u64,
        "[API] /transactions kept {} of {} rows",
        result.rows.len(),
        state.dataset.len(),
    );
    Ok(Json(result))
}

/// Rows the query excluded, each with the criteria it failed.
async fn get_rejected(
    State(state): State<ApiState>,
    Query(params): Query<CriteriaParams>,
    Query(page): Query<LimitQuery>,
) -> Result<Json<Vec<RejectedRow>>, AppError> {
    let limit = page.limit.unwrap_or(100);
    let criteria = validate(&state, params)?;

    let rows = state.dataset.rows();
    let tags = engine::evaluate(rows, &criteria);
    state.health.inc_served();

    let rejected = (0..rows.len())
        .filter(|&i| !tags.kept(i))
        .take(limit)
        .map(|i| RejectedRow {
            failed: tags.failed(i).iter().map(|c| c.to_string()).collect(),
            row: ResultRow::from_row(&rows[i], criteria.area_unit),
        })
        .collect();

    Ok(Json(rejected))
}

async fn get_options(State(state): State<ApiState>) -> Json<DatasetOptions> {
    Json(state.dataset.options().clone())
}

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        rows: state.dataset.len(),
        months: state.dataset.months().to_vec(),
        build: state.dataset.stats().clone(),
        queries_served: state.health.queries_served(),
        queries_rejected: state.health.queries_rejected(),
        uptime_secs: state.health.uptime_secs(),
    })
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencySnapshot> {
    Json(state.latency.snapshot())
}
