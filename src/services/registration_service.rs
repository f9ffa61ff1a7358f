//! Registration and delivery-settings commands.

use tracing::info;

use crate::{
    dao::models::Region,
    dao::registry::new_registration,
    dao::valorant::FetchError,
    dto::registration::{RegisterRequest, RegistrationSummary},
    error::ServiceError,
    state::SharedState,
    state::ids::{ChannelId, GuildId, UserId},
};

/// Register a Riot account for tracking in one guild. The account is
/// verified against the provider before anything is stored, so typos
/// fail here instead of silently producing no announcements later.
pub async fn register(
    state: &SharedState,
    tenant: GuildId,
    user: UserId,
    request: RegisterRequest,
) -> Result<RegistrationSummary, ServiceError> {
    let region: Region = request
        .region
        .parse()
        .map_err(|err: crate::dao::models::UnknownRegion| {
            ServiceError::InvalidInput(err.to_string())
        })?;

    state
        .match_source()
        .account(&request.riot_name, &request.riot_tag)
        .await
        .map_err(|err| match err {
            FetchError::NotFound => ServiceError::NotFound(format!(
                "riot account {}#{} was not found",
                request.riot_name, request.riot_tag
            )),
            other => ServiceError::from(other),
        })?;

    let entity = new_registration(request.riot_name, request.riot_tag, region);
    state.registry().register(tenant, user, entity.clone()).await?;

    info!(%tenant, %user, riot_id = %entity.riot_id(), "registered account");
    Ok(entity.into())
}

/// Remove a user's registration in one guild.
pub async fn unregister(
    state: &SharedState,
    tenant: GuildId,
    user: UserId,
) -> Result<(), ServiceError> {
    if !state.registry().unregister(tenant, user).await? {
        return Err(ServiceError::NotRegistered);
    }
    info!(%tenant, %user, "unregistered account");
    Ok(())
}

/// Point a guild's announcements at a channel.
pub async fn set_announce_channel(
    state: &SharedState,
    tenant: GuildId,
    channel: ChannelId,
) -> Result<(), ServiceError> {
    state.registry().set_announce_channel(tenant, channel).await?;
    info!(%tenant, %channel, "announcement channel configured");
    Ok(())
}
