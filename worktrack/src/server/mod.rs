//! Reference work service.
//!
//! A small JSON API implementing the endpoints the client expects, backed
//! by an in-memory store that can be mirrored to a JSON file.
//!
//! Endpoints:
//! - GET /cards - Users with their last work session
//! - POST /cards - Register a user
//! - POST /work - Start a session
//! - PATCH /work/{id} - Update description and/or stop time
//! - GET /work/today, /work/lastweek, /work/lastmonth - Named windows
//! - GET /work/range?start=YYYY-MM-DD&end=YYYY-MM-DD - Custom window

mod store;

pub use store::{Bounds, StoreError, User, WindowEntry, WorkStore};

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::models::{Card, NewWorkSession, SessionPatch, WorkSession};

/// Shared server state.
pub struct ServerState {
    store: RwLock<WorkStore>,
}

impl ServerState {
    pub fn new(store: WorkStore) -> Arc<Self> {
        Arc::new(Self {
            store: RwLock::new(store),
        })
    }
}

/// How to run the service.
#[derive(Debug, Clone, Default)]
pub struct ServeOptions {
    pub port: u16,
    /// Users to register if the store has none yet.
    pub users: Vec<String>,
    pub data_file: Option<PathBuf>,
}

// === Request Types ===

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct RangeParams {
    pub start: Option<String>,
    pub end: Option<String>,
}

type ApiError = (StatusCode, String);

impl From<StoreError> for (StatusCode, String) {
    fn from(e: StoreError) -> Self {
        let status = match e {
            StoreError::UnknownOwner(_) | StoreError::UnknownSession(_) => StatusCode::NOT_FOUND,
            StoreError::AlreadyRunning(_) | StoreError::AlreadyStopped(_) => StatusCode::CONFLICT,
            StoreError::EmptyDescription | StoreError::StopBeforeStart | StoreError::EmptyName => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
        };
        (status, e.to_string())
    }
}

// === Server Lifecycle ===

/// Build the API router around `state`.
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/cards", get(list_cards).post(create_user))
        .route("/work", post(create_work))
        .route("/work/today", get(work_today))
        .route("/work/lastweek", get(work_last_week))
        .route("/work/lastmonth", get(work_last_month))
        .route("/work/range", get(work_range))
        .route("/work/{id}", patch(update_work))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Open the store described by `opts`, registering seed users into an empty one.
pub fn open_store(opts: &ServeOptions) -> Result<WorkStore> {
    let mut store = match &opts.data_file {
        Some(path) => WorkStore::open(path)?,
        None => WorkStore::in_memory(),
    };

    if store.users().is_empty() {
        for name in &opts.users {
            match store.add_user(name) {
                Ok(user) => info!(id = %user.id, name = %user.name, "registered user"),
                Err(e) => warn!(name = %name, error = %e, "skipping seed user"),
            }
        }
    }
    Ok(store)
}

/// Run the service until the process is stopped.
pub async fn start_server(opts: ServeOptions) -> Result<()> {
    let store = open_store(&opts)?;
    let users = store.users().len();
    let app = router(ServerState::new(store));

    let addr = SocketAddr::from(([127, 0, 0, 1], opts.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    println!("Work service listening on http://{addr}");
    println!("{users} registered user(s)");
    if let Some(path) = &opts.data_file {
        println!("Persisting to {}", path.display());
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("Server error")?;

    Ok(())
}

// === Handlers ===

async fn list_cards(State(state): State<Arc<ServerState>>) -> Json<Vec<Card>> {
    Json(state.store.read().await.cards())
}

async fn create_user(
    State(state): State<Arc<ServerState>>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = state.store.write().await.add_user(&req.name)?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn create_work(
    State(state): State<Arc<ServerState>>,
    Json(req): Json<NewWorkSession>,
) -> Result<(StatusCode, Json<WorkSession>), ApiError> {
    let session = state.store.write().await.create(&req)?;
    Ok((StatusCode::CREATED, Json(session)))
}

async fn update_work(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
    Json(req): Json<SessionPatch>,
) -> Result<Json<WorkSession>, ApiError> {
    let session = state.store.write().await.update(&id, &req)?;
    Ok(Json(session))
}

async fn work_today(State(state): State<Arc<ServerState>>) -> Json<Vec<WindowEntry>> {
    Json(state.store.read().await.window(Bounds::today(Utc::now())))
}

async fn work_last_week(State(state): State<Arc<ServerState>>) -> Json<Vec<WindowEntry>> {
    Json(state.store.read().await.window(Bounds::last_week(Utc::now())))
}

async fn work_last_month(State(state): State<Arc<ServerState>>) -> Json<Vec<WindowEntry>> {
    Json(state.store.read().await.window(Bounds::last_month(Utc::now())))
}

async fn work_range(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<RangeParams>,
) -> Result<Json<Vec<WindowEntry>>, ApiError> {
    let start = params
        .start
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or((StatusCode::BAD_REQUEST, "start is required".to_string()))
        .and_then(parse_date)?;
    let end = match params.end.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(s) => Some(parse_date(s)?),
    };

    Ok(Json(state.store.read().await.window(Bounds::range(start, end))))
}

fn parse_date(s: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            format!("'{s}' is not a YYYY-MM-DD date"),
        )
    })
}
