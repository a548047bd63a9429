use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::dashboard::Dashboard;
use crate::error::PlanError;
use crate::executor::ExecutionSummary;
use crate::store::ThemeMode;
use crate::types::{OptimizationPlan, Order, RawMaterialRoll};
use crate::workshop::{Committed, Workshop};

/// The workshop sits behind one mutex, so concurrent executions against the
/// same roll serialize and the loser sees `EXECUTION_CONFLICT`.
#[derive(Clone)]
pub struct AppState {
    pub workshop: Arc<Mutex<Workshop>>,
}

impl AppState {
    pub fn new(workshop: Workshop) -> Self {
        Self {
            workshop: Arc::new(Mutex::new(workshop)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Workshop>, ApiError> {
        self.workshop.lock().map_err(|_| ApiError::Poisoned)
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error("plan execution requires operator confirmation")]
    Unconfirmed,

    #[error("workshop state lock poisoned")]
    Poisoned,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::Plan(e) => {
                let status = match e {
                    PlanError::InvalidInput { .. } | PlanError::InconsistentPlan { .. } => {
                        StatusCode::BAD_REQUEST
                    }
                    PlanError::NoCandidateRoll | PlanError::NoFeasiblePlan { .. } => {
                        StatusCode::UNPROCESSABLE_ENTITY
                    }
                    PlanError::ExecutionConflict { .. } | PlanError::DuplicateId(_) => {
                        StatusCode::CONFLICT
                    }
                    PlanError::RollNotFound(_) | PlanError::OrderNotFound(_) => {
                        StatusCode::NOT_FOUND
                    }
                    PlanError::PersistenceFailure { .. } => {
                        tracing::error!("persistence error: {e}");
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, e.code())
            }
            ApiError::Unconfirmed => (StatusCode::BAD_REQUEST, "UNCONFIRMED"),
            ApiError::Poisoned => {
                tracing::error!("workshop lock poisoned");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": self.to_string()
            }
        }));
        (status, body).into_response()
    }
}

#[derive(Deserialize, Serialize)]
pub struct NewRoll {
    pub batch_number: String,
    pub width: f64,
    pub weight: f64,
    pub material_type: String,
}

#[derive(Deserialize, Serialize)]
pub struct RollDimensions {
    pub width: f64,
    pub weight: f64,
}

#[derive(Deserialize, Serialize)]
pub struct NewOrder {
    pub customer_name: String,
    pub required_width: f64,
    pub target_weight: f64,
    pub due_date: NaiveDate,
}

#[derive(Deserialize, Serialize, Default)]
pub struct PlanRequest {
    #[serde(default)]
    pub roll_id: Option<String>,
    #[serde(default)]
    pub material_type: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct PlanResponse {
    pub plan: OptimizationPlan,
    /// Text for the operator's confirmation prompt.
    pub preview: String,
}

#[derive(Deserialize, Serialize)]
pub struct ExecuteRequest {
    pub plan: OptimizationPlan,
    #[serde(default)]
    pub confirmed: bool,
}

#[derive(Serialize)]
pub struct ExecuteResponse {
    pub summary: ExecutionSummary,
    pub message: String,
    pub persisted: bool,
}

#[derive(Deserialize, Default)]
pub struct RollQuery {
    #[serde(default)]
    pub query: String,
}

#[derive(Deserialize, Default)]
pub struct OrderQuery {
    #[serde(default)]
    pub all: bool,
}

#[derive(Deserialize, Default)]
pub struct DashboardQuery {
    pub today: Option<NaiveDate>,
}

#[derive(Deserialize, Serialize)]
pub struct ThemeBody {
    pub theme: ThemeMode,
}

async fn list_rolls(
    State(state): State<AppState>,
    Query(q): Query<RollQuery>,
) -> Result<Json<Vec<RawMaterialRoll>>, ApiError> {
    let workshop = state.lock()?;
    Ok(Json(
        workshop.search_rolls(&q.query).into_iter().cloned().collect(),
    ))
}

async fn add_roll(
    State(state): State<AppState>,
    Json(req): Json<NewRoll>,
) -> Result<(StatusCode, Json<Committed<RawMaterialRoll>>), ApiError> {
    let roll = RawMaterialRoll::new(req.batch_number, req.width, req.weight, req.material_type)?;
    let committed = state.lock()?.add_roll(roll)?;
    Ok((StatusCode::CREATED, Json(committed)))
}

async fn update_roll(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RollDimensions>,
) -> Result<Json<Committed<RawMaterialRoll>>, ApiError> {
    Ok(Json(state.lock()?.update_roll(&id, req.width, req.weight)?))
}

async fn remove_roll(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Committed<RawMaterialRoll>>, ApiError> {
    Ok(Json(state.lock()?.remove_roll(&id)?))
}

async fn list_orders(
    State(state): State<AppState>,
    Query(q): Query<OrderQuery>,
) -> Result<Json<Vec<Order>>, ApiError> {
    let workshop = state.lock()?;
    let orders = if q.all {
        workshop.orders().to_vec()
    } else {
        workshop.pending_orders().into_iter().cloned().collect()
    };
    Ok(Json(orders))
}

async fn add_order(
    State(state): State<AppState>,
    Json(req): Json<NewOrder>,
) -> Result<(StatusCode, Json<Committed<Order>>), ApiError> {
    let order = Order::new(
        req.customer_name,
        req.required_width,
        req.target_weight,
        req.due_date,
    )?;
    let committed = state.lock()?.add_order(order)?;
    Ok((StatusCode::CREATED, Json(committed)))
}

async fn plan(
    State(state): State<AppState>,
    Json(req): Json<PlanRequest>,
) -> Result<Json<PlanResponse>, ApiError> {
    tracing::info!(
        roll = req.roll_id.as_deref().unwrap_or("any"),
        material = req.material_type.as_deref().unwrap_or("any"),
        "POST /plan"
    );
    let workshop = state.lock()?;
    let plan = workshop.plan(req.roll_id.as_deref(), req.material_type.as_deref())?;
    let preview = workshop.preview(&plan);
    Ok(Json(PlanResponse { plan, preview }))
}

async fn execute(
    State(state): State<AppState>,
    Json(req): Json<ExecuteRequest>,
) -> Result<Json<ExecuteResponse>, ApiError> {
    tracing::info!(roll = %req.plan.roll_id, confirmed = req.confirmed, "POST /execute");
    if !req.confirmed {
        return Err(ApiError::Unconfirmed);
    }
    let committed = state.lock()?.execute(&req.plan)?;
    Ok(Json(ExecuteResponse {
        message: committed.value.to_string(),
        summary: committed.value,
        persisted: committed.persisted,
    }))
}

async fn dashboard(
    State(state): State<AppState>,
    Query(q): Query<DashboardQuery>,
) -> Result<Json<Dashboard>, ApiError> {
    let today = q.today.unwrap_or_else(|| Utc::now().date_naive());
    Ok(Json(state.lock()?.dashboard(today)))
}

async fn get_theme(State(state): State<AppState>) -> Result<Json<ThemeBody>, ApiError> {
    Ok(Json(ThemeBody {
        theme: state.lock()?.theme(),
    }))
}

async fn put_theme(
    State(state): State<AppState>,
    Json(body): Json<ThemeBody>,
) -> Result<Json<Committed<ThemeMode>>, ApiError> {
    Ok(Json(state.lock()?.set_theme(body.theme)))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/up", get(|| async { "ok" }))
        .route("/rolls", get(list_rolls).post(add_roll))
        .route("/rolls/{id}", patch(update_roll).delete(remove_roll))
        .route("/orders", get(list_orders).post(add_order))
        .route("/plan", post(plan))
        .route("/execute", post(execute))
        .route("/dashboard", get(dashboard))
        .route("/theme", get(get_theme).put(put_theme))
        .with_state(state)
}
