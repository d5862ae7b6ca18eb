//! HTTP adapter: maps requests onto [`ExpenseService`] calls and failures onto
//! status codes.

pub mod gate;

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::application::{ExpenseService, ServiceError};
use crate::domain::{Expense, ExpenseId};

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ExpenseService>,
}

impl AppState {
    pub fn new(service: Arc<ExpenseService>) -> Self {
        Self { service }
    }
}

/// Error rendered as `{"code": <status>, "message": <text>}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        let status = match &err {
            ServiceError::Closed => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::InvalidExpense(_) => StatusCode::BAD_REQUEST,
            ServiceError::NoExpense(_) => StatusCode::NOT_FOUND,
            ServiceError::Internal(_) => {
                error!(error = %err, "expense service failure");
                return Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "Internal Server Error".to_string(),
                };
            }
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({"code": self.status.as_u16(), "message": self.message})),
        )
            .into_response()
    }
}

/// Build the expense router. When `date_gate` is set every route sits behind
/// [`gate::require_date_header`].
pub fn router(state: AppState, date_gate: bool) -> Router {
    let mut app = Router::new()
        .route("/expenses", get(list_expenses).post(create_expense))
        .route("/expenses/:id", get(get_expense).put(update_expense))
        .with_state(state);

    if date_gate {
        app = app.layer(middleware::from_fn(gate::require_date_header));
    }

    app.layer(TraceLayer::new_for_http())
}

fn parse_id(raw: &str) -> Result<ExpenseId, ApiError> {
    raw.parse()
        .map_err(|err| ApiError::bad_request(format!("invalid expense id {raw:?}: {err}")))
}

/// POST /expenses
async fn create_expense(
    State(state): State<AppState>,
    payload: Result<Json<Expense>, JsonRejection>,
) -> Result<(StatusCode, Json<Expense>), ApiError> {
    let Json(expense) = payload?;

    let created = state.service.create(&expense).await?;
    info!(id = created.id, "created expense");
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /expenses
async fn list_expenses(State(state): State<AppState>) -> Result<Json<Vec<Expense>>, ApiError> {
    Ok(Json(state.service.list().await?))
}

/// GET /expenses/:id
async fn get_expense(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Expense>, ApiError> {
    let id = parse_id(&id)?;
    Ok(Json(state.service.get(id).await?))
}

/// PUT /expenses/:id
///
/// The id in the path wins over any id in the body.
async fn update_expense(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Expense>, JsonRejection>,
) -> Result<Json<Expense>, ApiError> {
    let id = parse_id(&id)?;
    let Json(mut expense) = payload?;
    expense.id = id;

    let updated = state.service.update(&expense).await?;
    info!(id = updated.id, "updated expense");
    Ok(Json(updated))
}
