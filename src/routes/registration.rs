use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, put},
};
use validator::Validate;

use crate::{
    dto::registration::{RegisterRequest, RegistrationSummary},
    error::AppError,
    services::registration_service,
    state::SharedState,
    state::ids::{GuildId, UserId},
};

/// Routes managing per-guild account registrations.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route(
            "/guilds/{guild}/members/{user}/registration",
            put(register),
        )
        .route(
            "/guilds/{guild}/members/{user}/registration",
            delete(unregister),
        )
}

/// Register (or replace) the member's Riot account in this guild.
#[utoipa::path(
    put,
    path = "/guilds/{guild}/members/{user}/registration",
    tag = "registration",
    params(
        ("guild" = String, Path, description = "Guild to register in"),
        ("user" = String, Path, description = "Member being registered")
    ),
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Registration stored", body = RegistrationSummary),
        (status = 400, description = "Invalid riot id or region"),
        (status = 404, description = "Account unknown to the provider")
    )
)]
pub async fn register(
    State(state): State<SharedState>,
    Path((guild, user)): Path<(GuildId, UserId)>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<RegistrationSummary>, AppError> {
    payload.validate()?;
    let summary = registration_service::register(&state, guild, user, payload).await?;
    Ok(Json(summary))
}

/// Remove the member's registration in this guild.
#[utoipa::path(
    delete,
    path = "/guilds/{guild}/members/{user}/registration",
    tag = "registration",
    params(
        ("guild" = String, Path, description = "Guild to unregister from"),
        ("user" = String, Path, description = "Member being unregistered")
    ),
    responses(
        (status = 204, description = "Registration removed"),
        (status = 404, description = "No registration existed")
    )
)]
pub async fn unregister(
    State(state): State<SharedState>,
    Path((guild, user)): Path<(GuildId, UserId)>,
) -> Result<StatusCode, AppError> {
    registration_service::unregister(&state, guild, user).await?;
    Ok(StatusCode::NO_CONTENT)
}
