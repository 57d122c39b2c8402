use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use contracts::{ApiError, Command, ErrorCode, QueryResponse, SCHEMA_VERSION_V1};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use crate::EngineApi;

const DEFAULT_PAGE_SIZE: usize = 500;
const MAX_PAGE_SIZE: usize = 5_000;

#[derive(Debug)]
pub enum ServerError {
    Io(std::io::Error),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "server io error: {err}"),
        }
    }
}

impl std::error::Error for ServerError {}

impl From<std::io::Error> for ServerError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

#[derive(Clone)]
struct AppState {
    api: Arc<Mutex<EngineApi>>,
}

struct HttpApiError {
    status: StatusCode,
    error: ApiError,
}

impl HttpApiError {
    fn not_found(entity: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            error: ApiError::new(
                ErrorCode::SessionNotFound,
                "no such entity in the active session",
                Some(entity.to_string()),
            ),
        }
    }
}

impl IntoResponse for HttpApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct EventsQuery {
    since: Option<u64>,
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct NowQuery {
    now: u64,
}

/// Serve the session API until the process is stopped. One session per
/// server; the mutex is the single-writer guarantee the kernel requires.
pub async fn serve(api: EngineApi, addr: SocketAddr) -> Result<(), ServerError> {
    let state = AppState {
        api: Arc::new(Mutex::new(api)),
    };
    let router = Router::new()
        .route("/api/v1/session/status", get(get_status))
        .route("/api/v1/session/command", post(post_command))
        .route("/api/v1/session/advance", post(post_advance))
        .route("/api/v1/session/events", get(get_events))
        .route("/api/v1/session/snapshot", get(get_snapshot))
        .route("/api/v1/session/player", get(get_player))
        .route(
            "/api/v1/session/business/{business_id}",
            get(get_business),
        )
        .route(
            "/api/v1/session/territory/{territory_id}",
            get(get_territory),
        )
        .with_state(state);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

async fn get_status(State(state): State<AppState>) -> Response {
    let api = state.api.lock().await;
    Json(api.status()).into_response()
}

async fn post_command(State(state): State<AppState>, Json(command): Json<Command>) -> Response {
    let mut api = state.api.lock().await;
    let result = api.submit_command(command);
    let status = if result.accepted {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    (status, Json(result)).into_response()
}

async fn post_advance(
    State(state): State<AppState>,
    Json(query): Json<NowQuery>,
) -> Response {
    let mut api = state.api.lock().await;
    let events = api.advance_to(query.now);
    Json(json!({
        "schema_version": SCHEMA_VERSION_V1,
        "advanced_to": query.now,
        "events": events,
        "catch_up": {
            "elapsed_secs": api.engine().last_catch_up().elapsed_secs,
            "cash_accrued": api.engine().last_catch_up().cash_accrued,
            "actions_resolved": api.engine().last_catch_up().actions_resolved,
        },
    }))
    .into_response()
}

async fn get_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Response {
    let api = state.api.lock().await;
    let since = query.since.unwrap_or(0) as usize;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .min(MAX_PAGE_SIZE);
    let events = api.events();
    let page: Vec<_> = events.iter().skip(since).take(limit).collect();
    Json(json!({
        "schema_version": SCHEMA_VERSION_V1,
        "total": events.len(),
        "since": since,
        "events": page,
    }))
    .into_response()
}

async fn get_snapshot(State(state): State<AppState>) -> Response {
    let api = state.api.lock().await;
    Json(api.snapshot()).into_response()
}

fn query_response(api: &EngineApi, query_type: &str, data: serde_json::Value) -> QueryResponse {
    let status = api.status();
    QueryResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        query_type: query_type.to_string(),
        session_id: status.session_id,
        generated_at: status.last_seen,
        data,
    }
}

async fn get_player(State(state): State<AppState>) -> Response {
    let api = state.api.lock().await;
    let view = api.engine().inspect_player();
    Json(query_response(&api, "player", view)).into_response()
}

async fn get_business(
    State(state): State<AppState>,
    Path(business_id): Path<String>,
    Query(query): Query<NowQuery>,
) -> Response {
    let api = state.api.lock().await;
    match api.engine().inspect_business(&business_id, query.now) {
        Some(view) => Json(query_response(&api, "business", view)).into_response(),
        None => HttpApiError::not_found(&business_id).into_response(),
    }
}

async fn get_territory(
    State(state): State<AppState>,
    Path(territory_id): Path<String>,
    Query(query): Query<NowQuery>,
) -> Response {
    let api = state.api.lock().await;
    match api.engine().inspect_territory(&territory_id, query.now) {
        Some(view) => Json(query_response(&api, "territory", view)).into_response(),
        None => HttpApiError::not_found(&territory_id).into_response(),
    }
}
