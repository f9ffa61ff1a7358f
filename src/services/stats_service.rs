//! Read-only convenience queries over the provider's match history.

use crate::{
    dao::valorant::MatchRecord,
    dto::stats::{LastMatchSummary, RecentStatsSummary},
    error::ServiceError,
    state::SharedState,
    state::ids::{GuildId, UserId},
};

/// How many recent competitive matches the aggregate covers.
const STATS_WINDOW: usize = 5;

/// Aggregate a user's recent competitive matches.
pub async fn recent_stats(
    state: &SharedState,
    tenant: GuildId,
    user: UserId,
) -> Result<RecentStatsSummary, ServiceError> {
    let registration = state
        .registry()
        .registration(tenant, user)
        .await
        .ok_or(ServiceError::NotRegistered)?;

    let history = state
        .match_source()
        .match_history(
            registration.region,
            &registration.riot_name,
            &registration.riot_tag,
        )
        .await?;

    let competitive: Vec<&MatchRecord> = history
        .iter()
        .filter(|record| record.is_competitive())
        .take(STATS_WINDOW)
        .collect();
    if competitive.is_empty() {
        return Err(ServiceError::NotFound(
            "no recent competitive matches".into(),
        ));
    }

    let mut wins = 0;
    let mut kills = 0;
    let mut deaths = 0;
    let mut assists = 0;
    let mut counted = 0;
    for record in &competitive {
        let Some(line) = record.player(&registration.riot_name, &registration.riot_tag) else {
            continue;
        };
        counted += 1;
        kills += line.kills;
        deaths += line.deaths;
        assists += line.assists;
        if line.won {
            wins += 1;
        }
    }
    if counted == 0 {
        return Err(ServiceError::NotFound(
            "registered account not present in recent matches".into(),
        ));
    }

    Ok(RecentStatsSummary {
        riot_id: registration.riot_id(),
        matches: counted,
        wins,
        losses: counted - wins,
        kills,
        deaths,
        assists,
        average_kills: f64::from(kills) / counted as f64,
        average_deaths: f64::from(deaths) / counted as f64,
    })
}

/// Detail view of the user's newest competitive match.
pub async fn last_match(
    state: &SharedState,
    tenant: GuildId,
    user: UserId,
) -> Result<LastMatchSummary, ServiceError> {
    let registration = state
        .registry()
        .registration(tenant, user)
        .await
        .ok_or(ServiceError::NotRegistered)?;

    let history = state
        .match_source()
        .match_history(
            registration.region,
            &registration.riot_name,
            &registration.riot_tag,
        )
        .await?;

    let record = history
        .iter()
        .find(|record| record.is_competitive())
        .ok_or_else(|| ServiceError::NotFound("no recent competitive matches".into()))?;
    let line = record
        .player(&registration.riot_name, &registration.riot_tag)
        .ok_or_else(|| {
            ServiceError::NotFound("registered account not present in the match".into())
        })?;

    Ok(LastMatchSummary::from_record(record, line))
}
