//! Domain match model and the provider wire payloads it is decoded from.

use serde::Deserialize;

use crate::state::ids::MatchId;

/// Which side of the lobby a player was on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamSide {
    /// Attacker-start side in provider payloads.
    Red,
    /// Defender-start side in provider payloads.
    Blue,
}

/// Final round score of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeamScore {
    /// Rounds won by red.
    pub red: u32,
    /// Rounds won by blue.
    pub blue: u32,
}

/// One player's line in a match roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerLine {
    /// Riot account name.
    pub name: String,
    /// Riot tag line.
    pub tag: String,
    /// Side the player fought on.
    pub team: TeamSide,
    /// Agent the player locked.
    pub agent: String,
    /// Kills scored.
    pub kills: u32,
    /// Deaths suffered.
    pub deaths: u32,
    /// Assists contributed.
    pub assists: u32,
    /// Whether the player's side won the match.
    pub won: bool,
}

impl PlayerLine {
    /// Kills-plus-assists per death, the ratio shown in announcements.
    pub fn kda(&self) -> f64 {
        f64::from(self.kills + self.assists) / f64::from(self.deaths.max(1))
    }
}

/// Authoritative record of one completed match.
///
/// Immutable once fetched; the resolver caches records only for the
/// lifetime of a single resolution cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRecord {
    /// Provider-assigned match identifier.
    pub id: MatchId,
    /// Map the match was played on.
    pub map: String,
    /// Game mode as reported by the provider.
    pub mode: String,
    /// Final score.
    pub score: TeamScore,
    /// Full roster with per-player stats.
    pub players: Vec<PlayerLine>,
}

impl MatchRecord {
    /// True when the provider reports the competitive queue.
    pub fn is_competitive(&self) -> bool {
        self.mode.eq_ignore_ascii_case("competitive")
    }

    /// Find a player's line by riot id, case-insensitively.
    pub fn player(&self, name: &str, tag: &str) -> Option<&PlayerLine> {
        self.players.iter().find(|line| {
            line.name.eq_ignore_ascii_case(name) && line.tag.eq_ignore_ascii_case(tag)
        })
    }
}

/// Minimal account profile returned by the provider's account endpoint;
/// only used to verify a registration points at a real account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccountProfile {
    /// Stable Riot player id.
    pub puuid: String,
}

// Wire payloads. The provider wraps everything in a `data` envelope and
// spells fields the way its v1/v3 endpoints do.

#[derive(Debug, Deserialize)]
pub(crate) struct AccountEnvelope {
    pub data: AccountProfile,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MatchListEnvelope {
    #[serde(default)]
    pub data: Vec<MatchPayload>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MatchPayload {
    pub metadata: MetadataPayload,
    pub players: PlayersPayload,
    pub teams: TeamsPayload,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MetadataPayload {
    pub matchid: String,
    pub map: String,
    pub mode: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlayersPayload {
    pub all_players: Vec<PlayerPayload>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlayerPayload {
    pub name: String,
    pub tag: String,
    pub team: String,
    pub character: String,
    pub stats: StatsPayload,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatsPayload {
    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TeamsPayload {
    pub red: TeamPayload,
    pub blue: TeamPayload,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TeamPayload {
    pub has_won: bool,
    pub rounds_won: u32,
}

impl From<MatchPayload> for MatchRecord {
    fn from(payload: MatchPayload) -> Self {
        let score = TeamScore {
            red: payload.teams.red.rounds_won,
            blue: payload.teams.blue.rounds_won,
        };
        let players = payload
            .players
            .all_players
            .into_iter()
            .map(|player| {
                let team = if player.team.eq_ignore_ascii_case("red") {
                    TeamSide::Red
                } else {
                    TeamSide::Blue
                };
                let won = match team {
                    TeamSide::Red => payload.teams.red.has_won,
                    TeamSide::Blue => payload.teams.blue.has_won,
                };
                PlayerLine {
                    name: player.name,
                    tag: player.tag,
                    team,
                    agent: player.character,
                    kills: player.stats.kills,
                    deaths: player.stats.deaths,
                    assists: player.stats.assists,
                    won,
                }
            })
            .collect();

        MatchRecord {
            id: MatchId(payload.metadata.matchid),
            map: payload.metadata.map,
            mode: payload.metadata.mode,
            score,
            players,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "status": 200,
        "data": [{
            "metadata": {"matchid": "3f8a", "map": "Ascent", "mode": "Competitive"},
            "players": {"all_players": [
                {"name": "Sova", "tag": "NA1", "team": "Red", "character": "Sova",
                 "stats": {"kills": 20, "deaths": 10, "assists": 5}},
                {"name": "Jett", "tag": "EU1", "team": "Blue", "character": "Jett",
                 "stats": {"kills": 14, "deaths": 16, "assists": 2}}
            ]},
            "teams": {
                "red": {"has_won": true, "rounds_won": 13},
                "blue": {"has_won": false, "rounds_won": 7}
            }
        }]
    }"#;

    #[test]
    fn match_payload_decodes_into_record() {
        let envelope: MatchListEnvelope = serde_json::from_str(SAMPLE).unwrap();
        let record: MatchRecord = envelope.data.into_iter().next().unwrap().into();

        assert_eq!(record.id, MatchId::from("3f8a"));
        assert_eq!(record.map, "Ascent");
        assert!(record.is_competitive());
        assert_eq!(record.score, TeamScore { red: 13, blue: 7 });

        let sova = record.player("sova", "na1").unwrap();
        assert_eq!(sova.team, TeamSide::Red);
        assert!(sova.won);
        assert_eq!(sova.kills, 20);

        let jett = record.player("Jett", "EU1").unwrap();
        assert!(!jett.won);
    }

    #[test]
    fn empty_match_list_decodes() {
        let envelope: MatchListEnvelope = serde_json::from_str(r#"{"status": 200}"#).unwrap();
        assert!(envelope.data.is_empty());
    }

    #[test]
    fn unknown_player_is_absent_from_roster_lookup() {
        let envelope: MatchListEnvelope = serde_json::from_str(SAMPLE).unwrap();
        let record: MatchRecord = envelope.data.into_iter().next().unwrap().into();
        assert!(record.player("Phoenix", "NA1").is_none());
    }

    #[test]
    fn kda_counts_assists_and_clamps_deaths() {
        let line = PlayerLine {
            name: "Sova".into(),
            tag: "NA1".into(),
            team: TeamSide::Red,
            agent: "Sova".into(),
            kills: 10,
            deaths: 0,
            assists: 5,
            won: true,
        };
        assert_eq!(line.kda(), 15.0);
    }
}
