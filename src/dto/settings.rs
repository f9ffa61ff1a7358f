use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use utoipa::ToSchema;

use crate::state::ids::ChannelId;

/// Payload selecting the channel announcements are posted to.
#[serde_as]
#[derive(Debug, Deserialize, ToSchema)]
pub struct AnnounceChannelRequest {
    /// Target channel snowflake, as a string.
    #[serde_as(as = "DisplayFromStr")]
    #[schema(value_type = String)]
    pub channel_id: ChannelId,
}

/// Confirmation of the configured announcement channel.
#[serde_as]
#[derive(Debug, Serialize, ToSchema)]
pub struct AnnounceChannelSummary {
    /// Channel announcements will be posted to.
    #[serde_as(as = "DisplayFromStr")]
    #[schema(value_type = String)]
    pub channel_id: ChannelId,
}
