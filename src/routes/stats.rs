use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::{
    dto::stats::{LastMatchSummary, RecentStatsSummary},
    error::AppError,
    services::stats_service,
    state::SharedState,
    state::ids::{GuildId, UserId},
};

/// Routes exposing on-demand match statistics.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/guilds/{guild}/members/{user}/stats", get(recent_stats))
        .route("/guilds/{guild}/members/{user}/last-match", get(last_match))
}

/// Aggregate the member's recent competitive matches.
#[utoipa::path(
    get,
    path = "/guilds/{guild}/members/{user}/stats",
    tag = "stats",
    params(
        ("guild" = String, Path, description = "Guild the member is registered in"),
        ("user" = String, Path, description = "Member being queried")
    ),
    responses(
        (status = 200, description = "Recent competitive aggregate", body = RecentStatsSummary),
        (status = 404, description = "Not registered or no competitive matches"),
        (status = 429, description = "Provider rate limited")
    )
)]
pub async fn recent_stats(
    State(state): State<SharedState>,
    Path((guild, user)): Path<(GuildId, UserId)>,
) -> Result<Json<RecentStatsSummary>, AppError> {
    let summary = stats_service::recent_stats(&state, guild, user).await?;
    Ok(Json(summary))
}

/// Detail view of the member's newest competitive match.
#[utoipa::path(
    get,
    path = "/guilds/{guild}/members/{user}/last-match",
    tag = "stats",
    params(
        ("guild" = String, Path, description = "Guild the member is registered in"),
        ("user" = String, Path, description = "Member being queried")
    ),
    responses(
        (status = 200, description = "Newest competitive match", body = LastMatchSummary),
        (status = 404, description = "Not registered or no competitive matches"),
        (status = 429, description = "Provider rate limited")
    )
)]
pub async fn last_match(
    State(state): State<SharedState>,
    Path((guild, user)): Path<(GuildId, UserId)>,
) -> Result<Json<LastMatchSummary>, AppError> {
    let summary = stats_service::last_match(&state, guild, user).await?;
    Ok(Json(summary))
}
