//! Plain HTTP endpoints.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
};
use rand::Rng;

use crate::AppState;

/// GET /randomNumber - A random integer from 0 to 100 as plain text.
pub async fn random_number() -> String {
    let number: u32 = rand::rng().random_range(0..=100);
    number.to_string()
}

/// GET /toTheDojo - Redirect to the configured URL with 302 Found.
pub async fn to_the_dojo(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::FOUND,
        [(header::LOCATION, state.config.redirect_url.clone())],
    )
}

/// GET /health - Health check endpoint.
pub async fn health_check() -> &'static str {
    "OK"
}
