//! Upvote Board backend
//!
//! Signed-in users submit short feature requests and upvote each other's
//! requests; a live, vote-ranked list is pushed to clients as it changes.

pub mod api;
pub mod auth;
pub mod board;
pub mod client;
pub mod config;
pub mod db;
pub mod errors;
pub mod live;
pub mod models;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use board::RequestBoard;
use config::Config;
use db::Repository;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub board: RequestBoard,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(repo: Arc<Repository>, config: Config) -> Self {
        Self {
            board: RequestBoard::new(repo.clone()),
            repo,
            config: Arc::new(config),
        }
    }
}

/// Install the global tracing subscriber. `RUST_LOG` wins over the configured level.
pub fn init_tracing(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if config.log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Clone PSK for the auth layer
    let psk = state.config.api_psk.clone();

    // Everything the identity gateway fronts
    let gateway_routes = Router::new()
        // Callables
        .route("/sayHello", post(api::say_hello))
        .route("/addRequest", post(api::add_request))
        .route("/upvote", post(api::upvote))
        // Identity lifecycle
        .route("/hooks/identity/created", post(api::identity_created))
        .route("/hooks/identity/deleted", post(api::identity_deleted))
        // Ranked list
        .route("/requests", get(api::list_requests))
        .route("/requests/live", get(api::live_requests))
        .layer(middleware::from_fn(move |req, next| {
            auth::psk_auth_layer(psk.clone(), req, next)
        }));

    // Plain endpoints (no auth required)
    let public_routes = Router::new()
        .route("/randomNumber", get(api::random_number))
        .route("/toTheDojo", get(api::to_the_dojo))
        .route("/health", get(api::health_check));

    Router::new()
        .merge(gateway_routes)
        .merge(public_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
