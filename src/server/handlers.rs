use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::task;

use super::AppState;
use crate::catalog::{Model, Series, Tech};
use crate::graph::GraphView;
use crate::query::{CatalogStats, ModelDetail, ModelFilter, SeriesOverview};
use crate::store::StoreError;
use crate::types::{ConstraintError, ConstraintKind, ModelId, SeriesId, TableKind, TechId};

/// First id handed out per table when the table is empty or holds only
/// smaller ids.
const MODEL_ID_FLOOR: i64 = 9000;
const TECH_ID_FLOOR: i64 = 200;
const SERIES_ID_FLOOR: i64 = 1;

#[derive(Debug, Serialize)]
pub(super) struct Envelope<T> {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

fn ok<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope {
        ok: true,
        data: Some(data),
        message: None,
    })
}

pub(super) type ApiResult<T> = Result<Json<Envelope<T>>, AppError>;

#[derive(Debug, Error)]
pub(super) enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Constraint(#[from] ConstraintError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("internal task failure: {0}")]
    Join(#[from] task::JoinError),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

fn constraint_status(kind: ConstraintKind) -> StatusCode {
    match kind {
        ConstraintKind::NotFound => StatusCode::NOT_FOUND,
        ConstraintKind::PrimaryKeyExists | ConstraintKind::UniqueViolation => StatusCode::CONFLICT,
        ConstraintKind::NotNull
        | ConstraintKind::ForeignKeyMissing
        | ConstraintKind::CheckFailed
        | ConstraintKind::BusinessRuleViolation => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Constraint(err) => constraint_status(err.kind()),
            AppError::Store(err) => err
                .constraint_kind()
                .map_or(StatusCode::INTERNAL_SERVER_ERROR, constraint_status),
            AppError::Join(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = Json(Envelope::<()> {
            ok: false,
            data: None,
            message: Some(self.to_string()),
        });
        (status, body).into_response()
    }
}

#[derive(Debug, Serialize)]
pub(super) struct HealthResponse {
    status: &'static str,
}

pub(super) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub(super) async fn list_series(State(state): State<AppState>) -> ApiResult<Vec<SeriesOverview>> {
    Ok(ok(state.catalog.store().series_overview()))
}

pub(super) async fn list_techs(State(state): State<AppState>) -> ApiResult<Vec<Tech>> {
    Ok(ok(state.catalog.store().all_techs()))
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct ModelsParams {
    #[serde(default)]
    series_id: Option<String>,
    #[serde(default)]
    energy_type: Option<String>,
}

pub(super) async fn list_models(
    State(state): State<AppState>,
    Query(params): Query<ModelsParams>,
) -> ApiResult<Vec<ModelDetail>> {
    let series_id = match params.series_id.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(parse_id::<SeriesId>("series_id", raw)?),
    };
    let filter = ModelFilter {
        series_id,
        energy_type: params.energy_type.filter(|energy| !energy.is_empty()),
    };
    Ok(ok(state.catalog.store().list_models(&filter)))
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct IdParams {
    #[serde(default)]
    id: Option<String>,
}

pub(super) async fn model_detail(
    State(state): State<AppState>,
    Query(params): Query<IdParams>,
) -> ApiResult<ModelDetail> {
    let raw = params
        .id
        .as_deref()
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .ok_or_else(|| AppError::BadRequest("missing model id parameter".into()))?;
    let id = parse_id::<ModelId>("id", raw)?;
    Ok(ok(state.catalog.store().model_detail(id)?))
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct SearchParams {
    #[serde(default)]
    q: Option<String>,
}

pub(super) async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Vec<ModelDetail>> {
    let keyword = params.q.unwrap_or_default();
    if keyword.trim().is_empty() {
        return Err(AppError::BadRequest("search keyword must not be empty".into()));
    }
    Ok(ok(state.catalog.store().search_models(&keyword)))
}

pub(super) async fn stats(State(state): State<AppState>) -> ApiResult<CatalogStats> {
    Ok(ok(state.catalog.store().stats()))
}

pub(super) async fn graph(State(state): State<AppState>) -> ApiResult<GraphView> {
    Ok(ok(state.catalog.store().graph_view()))
}

#[derive(Debug, Deserialize)]
pub(super) struct AddModelRequest {
    model_name: String,
    series_id: SeriesId,
    price: f64,
    #[serde(default)]
    range_km: f64,
    energy_type: String,
    #[serde(default)]
    body_type: String,
    #[serde(default)]
    seats: u32,
    #[serde(default)]
    launch_year: String,
    #[serde(default)]
    tech_ids: Vec<TechId>,
}

/// Strict insert when `tech_ids` is non-empty, deferred otherwise.
pub(super) async fn add_model(
    State(state): State<AppState>,
    payload: Result<Json<AddModelRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(request) = payload?;
    let mut model = Model {
        id: 0,
        name: request.model_name,
        series_id: request.series_id,
        price: request.price,
        range_km: request.range_km,
        energy_type: request.energy_type,
        body_type: request.body_type,
        seats: request.seats,
        launch_year: request.launch_year,
    };
    let data = task::spawn_blocking(move || -> Result<Value, AppError> {
        let _allocation = state.allocation.lock();
        let store = state.catalog.store();
        let id = store.next_id(TableKind::Model, MODEL_ID_FLOOR);
        model.id = id;
        let tech_ids = if request.tech_ids.is_empty() {
            state.catalog.add_model_deferred(model)?;
            Vec::new()
        } else {
            state.catalog.add_model(model, &request.tech_ids)?;
            store
                .model_detail(id)
                .map(|detail| detail.tech_ids)
                .unwrap_or_default()
        };
        Ok(json!({ "model_id": id, "tech_ids": tech_ids }))
    })
    .await??;
    Ok(ok(data))
}

#[derive(Debug, Deserialize)]
pub(super) struct AddTechRequest {
    tech_name: String,
    #[serde(default)]
    intro: String,
}

pub(super) async fn add_tech(
    State(state): State<AppState>,
    payload: Result<Json<AddTechRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(request) = payload?;
    let AddTechRequest { tech_name: name, intro } = request;
    let data = task::spawn_blocking(move || -> Result<Value, AppError> {
        let _allocation = state.allocation.lock();
        let id = state.catalog.store().next_id(TableKind::Tech, TECH_ID_FLOOR);
        state.catalog.add_tech(Tech::new(id, name, intro))?;
        Ok(json!({ "tech_id": id }))
    })
    .await??;
    Ok(ok(data))
}

#[derive(Debug, Deserialize)]
pub(super) struct AddSeriesRequest {
    series_name: String,
    #[serde(default)]
    intro: String,
}

pub(super) async fn add_series(
    State(state): State<AppState>,
    payload: Result<Json<AddSeriesRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(request) = payload?;
    let AddSeriesRequest { series_name: name, intro } = request;
    let data = task::spawn_blocking(move || -> Result<Value, AppError> {
        let _allocation = state.allocation.lock();
        let id = state
            .catalog
            .store()
            .next_id(TableKind::Series, SERIES_ID_FLOOR);
        state.catalog.add_series(Series::new(id, name, intro))?;
        Ok(json!({ "series_id": id }))
    })
    .await??;
    Ok(ok(data))
}

#[derive(Debug, Deserialize)]
pub(super) struct LinkRequest {
    model_id: ModelId,
    tech_id: TechId,
}

pub(super) async fn link_model(
    State(state): State<AppState>,
    payload: Result<Json<LinkRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(request) = payload?;
    let data = task::spawn_blocking(move || -> Result<Value, AppError> {
        let created = state.catalog.link(request.model_id, request.tech_id)?;
        Ok(json!({
            "model_id": request.model_id,
            "tech_id": request.tech_id,
            "created": created,
        }))
    })
    .await??;
    Ok(ok(data))
}

fn parse_id<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, AppError> {
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("invalid {name} '{raw}'")))
}
