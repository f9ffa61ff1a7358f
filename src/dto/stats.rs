use serde::Serialize;
use utoipa::ToSchema;

use crate::dao::valorant::{MatchRecord, PlayerLine};

/// Aggregate over a user's recent competitive matches.
#[derive(Debug, Serialize, ToSchema)]
pub struct RecentStatsSummary {
    /// `Name#TAG` of the registered account.
    pub riot_id: String,
    /// Competitive matches included in the aggregate (up to 5).
    pub matches: usize,
    /// Matches won.
    pub wins: usize,
    /// Matches lost.
    pub losses: usize,
    /// Total kills across the window.
    pub kills: u32,
    /// Total deaths across the window.
    pub deaths: u32,
    /// Total assists across the window.
    pub assists: u32,
    /// Mean kills per match.
    pub average_kills: f64,
    /// Mean deaths per match.
    pub average_deaths: f64,
}

/// Detail view of the newest competitive match.
#[derive(Debug, Serialize, ToSchema)]
pub struct LastMatchSummary {
    /// Provider match identifier.
    pub match_id: String,
    /// Map the match was played on.
    pub map: String,
    /// Game mode.
    pub mode: String,
    /// Final score from the player's perspective, `own - enemy`.
    pub score: String,
    /// Agent the player locked.
    pub agent: String,
    /// Kills scored.
    pub kills: u32,
    /// Deaths suffered.
    pub deaths: u32,
    /// Assists contributed.
    pub assists: u32,
    /// Whether the player's side won.
    pub won: bool,
}

impl LastMatchSummary {
    /// Build the summary from a record and the player's own line in it.
    pub fn from_record(record: &MatchRecord, line: &PlayerLine) -> Self {
        use crate::dao::valorant::TeamSide;

        let (own, enemy) = match line.team {
            TeamSide::Red => (record.score.red, record.score.blue),
            TeamSide::Blue => (record.score.blue, record.score.red),
        };

        Self {
            match_id: record.id.to_string(),
            map: record.map.clone(),
            mode: record.mode.clone(),
            score: format!("{own} - {enemy}"),
            agent: line.agent.clone(),
            kills: line.kills,
            deaths: line.deaths,
            assists: line.assists,
            won: line.won,
        }
    }
}
