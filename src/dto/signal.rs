use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use utoipa::ToSchema;

use crate::{
    services::engine::ActivitySignal,
    state::activity::SignalKind,
    state::ids::{ChannelId, GuildId, UserId},
};

/// One raw activity signal from the presence source. Snowflake ids travel
/// as strings on the wire.
#[serde_as]
#[derive(Debug, Deserialize, ToSchema)]
pub struct SignalRequest {
    /// Member the signal is about.
    #[serde_as(as = "DisplayFromStr")]
    #[schema(value_type = String)]
    pub user_id: UserId,
    /// What happened.
    pub kind: SignalKindInput,
    /// Voice channel the member occupies, if any.
    #[serde(default)]
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[schema(value_type = Option<String>)]
    pub voice_channel_id: Option<ChannelId>,
}

/// Wire form of the signal kinds.
#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SignalKindInput {
    /// The member started playing.
    Started,
    /// The member stopped playing.
    Stopped,
    /// The member changed voice channels.
    VoiceMoved,
}

impl From<SignalKindInput> for SignalKind {
    fn from(kind: SignalKindInput) -> Self {
        match kind {
            SignalKindInput::Started => SignalKind::Started,
            SignalKindInput::Stopped => SignalKind::Stopped,
            SignalKindInput::VoiceMoved => SignalKind::VoiceMoved,
        }
    }
}

impl SignalRequest {
    /// Attach the guild from the route path to form the engine signal.
    pub fn into_signal(self, tenant: GuildId) -> ActivitySignal {
        ActivitySignal {
            tenant,
            user: self.user_id,
            kind: self.kind.into(),
            voice_channel: self.voice_channel_id,
        }
    }
}

/// Acknowledgement that a signal entered the processing queue.
#[derive(Debug, Serialize, ToSchema)]
pub struct SignalAck {
    /// Always true; failures surface as error statuses instead.
    pub queued: bool,
}
