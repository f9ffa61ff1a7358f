use axum::Router;

use crate::state::SharedState;

pub mod docs;
pub mod health;
pub mod registration;
pub mod settings;
pub mod signals;
pub mod stats;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(signals::router())
        .merge(registration::router())
        .merge(settings::router())
        .merge(stats::router());

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}
