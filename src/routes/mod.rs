use axum::{routing::get, Router};

use crate::{config::AppConfig, state::AppState};

pub mod diagnostics;
pub mod health;
pub mod otc;

pub fn router(config: &AppConfig) -> Router<AppState> {
    let router = Router::new()
        .route("/health", get(health::health))
        .merge(diagnostics::router())
        .merge(otc::router());

    if config.debug_routes_enabled_runtime() {
        router.merge(diagnostics::debug_router())
    } else {
        router
    }
}
