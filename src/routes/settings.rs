use axum::{
    Json, Router,
    extract::{Path, State},
    routing::put,
};

use crate::{
    dto::settings::{AnnounceChannelRequest, AnnounceChannelSummary},
    error::AppError,
    services::registration_service,
    state::SharedState,
    state::ids::GuildId,
};

/// Routes managing per-guild delivery settings.
pub fn router() -> Router<SharedState> {
    Router::new().route("/guilds/{guild}/announce-channel", put(set_announce_channel))
}

/// Choose the channel match announcements are posted to.
#[utoipa::path(
    put,
    path = "/guilds/{guild}/announce-channel",
    tag = "settings",
    params(("guild" = String, Path, description = "Guild being configured")),
    request_body = AnnounceChannelRequest,
    responses((status = 200, description = "Channel stored", body = AnnounceChannelSummary))
)]
pub async fn set_announce_channel(
    State(state): State<SharedState>,
    Path(guild): Path<GuildId>,
    Json(payload): Json<AnnounceChannelRequest>,
) -> Result<Json<AnnounceChannelSummary>, AppError> {
    registration_service::set_announce_channel(&state, guild, payload.channel_id).await?;
    Ok(Json(AnnounceChannelSummary {
        channel_id: payload.channel_id,
    }))
}
