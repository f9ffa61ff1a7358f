use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::post,
};

use crate::{
    dto::signal::{SignalAck, SignalRequest},
    error::{AppError, ServiceError},
    state::SharedState,
    state::ids::GuildId,
};

/// Routes ingesting raw activity signals from the presence source.
pub fn router() -> Router<SharedState> {
    Router::new().route("/guilds/{guild}/signals", post(ingest_signal))
}

/// Enqueue one activity signal for the tracker engine.
///
/// Signals are processed asynchronously in arrival order per user;
/// acceptance only means the signal entered the queue.
#[utoipa::path(
    post,
    path = "/guilds/{guild}/signals",
    tag = "signals",
    params(("guild" = String, Path, description = "Guild the signal belongs to")),
    request_body = SignalRequest,
    responses(
        (status = 202, description = "Signal queued", body = SignalAck),
        (status = 503, description = "Engine unavailable")
    )
)]
pub async fn ingest_signal(
    State(state): State<SharedState>,
    Path(guild): Path<GuildId>,
    Json(payload): Json<SignalRequest>,
) -> Result<(StatusCode, Json<SignalAck>), AppError> {
    state
        .engine()
        .submit(payload.into_signal(guild))
        .await
        .map_err(ServiceError::from)?;
    Ok((StatusCode::ACCEPTED, Json(SignalAck { queued: true })))
}
