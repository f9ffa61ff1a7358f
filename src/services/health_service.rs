use crate::{dto::health::HealthResponse, state::SharedState};

/// Respond with liveness plus registry counts.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let registered_users = state.registry().registered_users().await;
    let tracked_guilds = state.registry().tracked_guilds().await;
    HealthResponse::ok(registered_users, tracked_guilds)
}
