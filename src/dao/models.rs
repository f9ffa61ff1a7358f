use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::state::ids::{ChannelId, GuildId, UserId};

/// Riot shard a registered account lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    /// North America.
    Na,
    /// Europe.
    Eu,
    /// Asia Pacific.
    Ap,
    /// Korea.
    Kr,
}

impl Region {
    /// All accepted regions, in the order the original registration
    /// command offered them.
    pub const ALL: [Region; 4] = [Region::Na, Region::Eu, Region::Ap, Region::Kr];

    /// Lowercase shard code used in provider URLs.
    pub fn as_str(self) -> &'static str {
        match self {
            Region::Na => "na",
            Region::Eu => "eu",
            Region::Ap => "ap",
            Region::Kr => "kr",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown region code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown region `{0}`, expected one of na, eu, ap, kr")]
pub struct UnknownRegion(pub String);

impl FromStr for Region {
    type Err = UnknownRegion;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "na" => Ok(Region::Na),
            "eu" => Ok(Region::Eu),
            "ap" => Ok(Region::Ap),
            "kr" => Ok(Region::Kr),
            other => Err(UnknownRegion(other.to_owned())),
        }
    }
}

/// A user's registered Riot account within one guild.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegistrationEntity {
    /// Riot account name (the part before the `#`).
    pub riot_name: String,
    /// Riot tag line (the part after the `#`).
    pub riot_tag: String,
    /// Shard the account is queried on.
    pub region: Region,
    /// When the registration was created.
    pub registered_at: SystemTime,
}

impl RegistrationEntity {
    /// `Name#TAG` form used in logs and announcement footers.
    pub fn riot_id(&self) -> String {
        format!("{}#{}", self.riot_name, self.riot_tag)
    }
}

/// Per-guild delivery settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TenantSettingsEntity {
    /// Channel announcements are posted to; unset until configured.
    pub announce_channel: Option<ChannelId>,
}

/// Registrations partitioned by guild, then user.
pub type RegistrationMap = HashMap<GuildId, HashMap<UserId, RegistrationEntity>>;

/// Settings partitioned by guild.
pub type SettingsMap = HashMap<GuildId, TenantSettingsEntity>;

/// Everything the registry store persists, as loaded at startup.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    /// All known registrations.
    pub registrations: RegistrationMap,
    /// All known per-guild settings.
    pub settings: SettingsMap,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_round_trips_through_str() {
        for region in Region::ALL {
            assert_eq!(region.as_str().parse::<Region>().unwrap(), region);
        }
    }

    #[test]
    fn region_parse_is_case_insensitive() {
        assert_eq!("EU".parse::<Region>().unwrap(), Region::Eu);
    }

    #[test]
    fn unknown_region_is_rejected() {
        let err = "latam".parse::<Region>().unwrap_err();
        assert_eq!(err, UnknownRegion("latam".into()));
    }

    #[test]
    fn riot_id_joins_name_and_tag() {
        let entity = RegistrationEntity {
            riot_name: "Sova".into(),
            riot_tag: "NA1".into(),
            region: Region::Na,
            registered_at: SystemTime::UNIX_EPOCH,
        };
        assert_eq!(entity.riot_id(), "Sova#NA1");
    }
}
