use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use crate::app::{analyze, ContextUpdate, Planner};
use crate::board::{export_board, BoardOptions, Theme};
use crate::config::Config;
use crate::error::PlannerError;
use crate::gemini::{spawn_image_requests, GenerativeBackend};
use crate::output::csv::plan_to_csv;
use crate::plan::{ImageApply, ImageRequest};
use crate::projector::Projection;
use crate::store::DebouncedSaver;
use crate::trips::{AnalyzedTrip, BreakdownComponent, Month, TripDraft, TripRequest, UserContext};

#[derive(Clone)]
struct ApiState {
    config: Arc<Config>,
    planner: Arc<Mutex<Planner>>,
    backend: Arc<dyn GenerativeBackend>,
    saver: Arc<DebouncedSaver>,
}

#[derive(Debug, Serialize)]
struct ApiResponse<T: Serialize> {
    ok: bool,
    data: T,
}

#[derive(Debug, Serialize)]
struct ApiErrorBody {
    ok: bool,
    error: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(error: impl std::fmt::Display) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: error.to_string(),
        }
    }
}

impl From<PlannerError> for ApiError {
    fn from(error: PlannerError) -> Self {
        let status = match &error {
            PlannerError::EmptyTripList
            | PlannerError::InvalidTrip(_)
            | PlannerError::InvalidAmount(_) => StatusCode::BAD_REQUEST,
            PlannerError::UnknownTrip(_) | PlannerError::NoPlan => StatusCode::NOT_FOUND,
            PlannerError::AnalysisFailed => StatusCode::BAD_GATEWAY,
        };
        Self {
            status,
            message: error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ApiErrorBody {
            ok: false,
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<ApiResponse<T>>, ApiError>;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct PlanResponse {
    epoch: u64,
    trips: Vec<AnalyzedTrip>,
}

#[derive(Debug, Serialize)]
struct AnalyzeResponse {
    epoch: u64,
    trips: Vec<AnalyzedTrip>,
    omitted: Vec<String>,
    unknown: Vec<String>,
}

#[derive(Debug, Serialize)]
struct DashboardResponse {
    context: UserContext,
    projection: Projection,
}

#[derive(Debug, Deserialize)]
struct MonthRequest {
    #[serde(default)]
    month: Option<Month>,
}

#[derive(Debug, Deserialize)]
struct BreakdownRequest {
    component: BreakdownComponent,
    value: f64,
}

#[derive(Debug, Default, Deserialize)]
struct BoardQuery {
    theme: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Serialize)]
struct ThemeInfo {
    slug: &'static str,
    name: &'static str,
    emotion: &'static str,
}

pub async fn run_server(
    config: Config,
    bind: SocketAddr,
    planner: Planner,
    backend: Arc<dyn GenerativeBackend>,
    saver: DebouncedSaver,
) -> Result<()> {
    let pending_images = planner.image_requests();
    let state = ApiState {
        config: Arc::new(config),
        planner: Arc::new(Mutex::new(planner)),
        backend,
        saver: Arc::new(saver),
    };
    let saver = Arc::clone(&state.saver);
    if !pending_images.is_empty() {
        info!("restoring {} destination image(s) for the saved plan", pending_images.len());
        fetch_images(&state, pending_images);
    }

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("REST API listening on http://{bind}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    match Arc::try_unwrap(saver) {
        Ok(saver) => saver.shutdown().await,
        Err(_) => warn!("state saver still in use at shutdown; pending changes may be lost"),
    }
    Ok(())
}

fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/context", get(show_context).put(update_context))
        .route("/v1/trips", get(list_trips).post(add_trip))
        .route("/v1/trips/:id", delete(remove_trip))
        .route("/v1/analyze", post(run_analysis))
        .route("/v1/plan", get(show_plan))
        .route("/v1/plan/trips/:id/month", put(set_month))
        .route("/v1/plan/trips/:id/breakdown", put(set_breakdown))
        .route("/v1/dashboard", get(dashboard))
        .route("/v1/export/csv", get(export_csv))
        .route("/v1/export/board", get(export_board_image))
        .route("/v1/themes", get(themes))
        .route("/v1/config", get(show_config))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed listening for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

/// Applies image arrivals to whichever plan is current when they land.
fn fetch_images(state: &ApiState, requests: Vec<ImageRequest>) {
    let mut arrivals = spawn_image_requests(Arc::clone(&state.backend), requests);
    let planner = Arc::clone(&state.planner);
    tokio::spawn(async move {
        while let Some(arrival) = arrivals.recv().await {
            let trip_id = arrival.trip_id.clone();
            match planner.lock().await.apply_image(arrival) {
                ImageApply::Applied => debug!("image ready for trip {trip_id}"),
                ImageApply::Stale => {}
                ImageApply::UnknownTrip => debug!("trip {trip_id} left the plan before its image"),
            }
        }
    });
}

async fn health() -> Json<ApiResponse<HealthResponse>> {
    ok(HealthResponse { status: "ok" })
}

async fn show_config(State(state): State<ApiState>) -> Json<ApiResponse<Config>> {
    ok(state.config.redacted())
}

async fn show_context(State(state): State<ApiState>) -> Json<ApiResponse<UserContext>> {
    ok(state.planner.lock().await.context().clone())
}

async fn update_context(
    State(state): State<ApiState>,
    Json(update): Json<ContextUpdate>,
) -> ApiResult<UserContext> {
    let mut planner = state.planner.lock().await;
    let context = planner.update_context(update)?.clone();
    state.saver.schedule(planner.snapshot());
    Ok(ok(context))
}

async fn list_trips(State(state): State<ApiState>) -> Json<ApiResponse<Vec<TripRequest>>> {
    ok(state.planner.lock().await.trips().to_vec())
}

async fn add_trip(
    State(state): State<ApiState>,
    Json(draft): Json<TripDraft>,
) -> ApiResult<TripRequest> {
    let mut planner = state.planner.lock().await;
    let trip = planner.add_trip(draft)?.clone();
    state.saver.schedule(planner.snapshot());
    Ok(ok(trip))
}

async fn remove_trip(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<TripRequest> {
    let mut planner = state.planner.lock().await;
    let removed = planner.remove_trip(&id)?;
    state.saver.schedule(planner.snapshot());
    Ok(ok(removed))
}

async fn run_analysis(State(state): State<ApiState>) -> ApiResult<AnalyzeResponse> {
    let (context, trips) = {
        let planner = state.planner.lock().await;
        planner.ensure_ready_for_analysis()?;
        (planner.context().clone(), planner.trips().to_vec())
    };

    let outcome = analyze(state.backend.as_ref(), &context, &trips).await?;

    let (epoch, requests) = {
        let mut planner = state.planner.lock().await;
        let epoch = planner.install_plan(outcome.trips.clone());
        state.saver.schedule(planner.snapshot());
        (epoch, planner.image_requests())
    };
    fetch_images(&state, requests);

    Ok(ok(AnalyzeResponse {
        epoch,
        trips: outcome.trips,
        omitted: outcome.omitted,
        unknown: outcome.unknown,
    }))
}

async fn show_plan(State(state): State<ApiState>) -> Json<ApiResponse<PlanResponse>> {
    let planner = state.planner.lock().await;
    ok(PlanResponse {
        epoch: planner.plan().epoch,
        trips: planner.plan().trips.clone(),
    })
}

async fn set_month(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(request): Json<MonthRequest>,
) -> ApiResult<AnalyzedTrip> {
    let mut planner = state.planner.lock().await;
    let trip = planner.reassign_month(&id, request.month)?.clone();
    state.saver.schedule(planner.snapshot());
    Ok(ok(trip))
}

async fn set_breakdown(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(request): Json<BreakdownRequest>,
) -> ApiResult<AnalyzedTrip> {
    let mut planner = state.planner.lock().await;
    let trip = planner
        .update_breakdown(&id, request.component, request.value)?
        .clone();
    state.saver.schedule(planner.snapshot());
    Ok(ok(trip))
}

async fn dashboard(State(state): State<ApiState>) -> Json<ApiResponse<DashboardResponse>> {
    let planner = state.planner.lock().await;
    ok(DashboardResponse {
        context: planner.context().clone(),
        projection: planner.projection(),
    })
}

async fn export_csv(State(state): State<ApiState>) -> Result<Response, ApiError> {
    let planner = state.planner.lock().await;
    if planner.plan().is_empty() {
        return Err(PlannerError::NoPlan.into());
    }
    let body = plan_to_csv(
        planner.context(),
        planner.plan(),
        &planner.projection(),
        state.config.export.resolved_year(),
    )
    .map_err(ApiError::internal)?;
    let disposition = format!("attachment; filename=\"{}\"", state.config.export.csv_path);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

async fn export_board_image(
    State(state): State<ApiState>,
    Query(query): Query<BoardQuery>,
) -> Result<Response, ApiError> {
    let theme = query
        .theme
        .as_deref()
        .map(str::parse::<Theme>)
        .transpose()
        .map_err(|err| ApiError::bad_request(err.to_string()))?;
    let options =
        BoardOptions::from_config(&state.config, theme, query.title).map_err(ApiError::internal)?;
    let plan = {
        let planner = state.planner.lock().await;
        if planner.plan().is_empty() {
            return Err(PlannerError::NoPlan.into());
        }
        planner.plan().clone()
    };

    let config = Arc::clone(&state.config);
    let jpeg = tokio::task::spawn_blocking(move || export_board(&plan, &config, &options))
        .await
        .map_err(ApiError::internal)?
        .map_err(|err| ApiError::internal(format!("{err:#}")))?;
    Ok(([(header::CONTENT_TYPE, "image/jpeg")], jpeg).into_response())
}

async fn themes() -> Json<ApiResponse<Vec<ThemeInfo>>> {
    ok(Theme::ALL
        .iter()
        .map(|theme| ThemeInfo {
            slug: theme.as_slug(),
            name: theme.name(),
            emotion: theme.emotion(),
        })
        .collect())
}

fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse { ok: true, data })
}
