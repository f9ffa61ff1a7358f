use serde::Serialize;
use utoipa::ToSchema;

/// Health payload returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status; this service has no degraded mode, so always "ok".
    pub status: String,
    /// Registrations currently tracked across all guilds.
    pub registered_users: usize,
    /// Guilds with at least one registration.
    pub tracked_guilds: usize,
}

impl HealthResponse {
    /// Create a healthy response with current registry counts.
    pub fn ok(registered_users: usize, tracked_guilds: usize) -> Self {
        Self {
            status: "ok".to_string(),
            registered_users,
            tracked_guilds,
        }
    }
}
