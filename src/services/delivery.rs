//! Announcement rendering and the delivery-gateway sink.

use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, StatusCode, header::AUTHORIZATION};
use serde_json::{Value, json};
use thiserror::Error;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::config::GatewayConfig;
use crate::dao::registry::Registry;
use crate::dao::valorant::{PlayerLine, TeamScore, TeamSide};
use crate::state::ids::{GuildId, MatchId, UserId};

/// Match-level fields shared by every member of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchHeader {
    /// Map the match was played on.
    pub map: String,
    /// Game mode.
    pub mode: String,
    /// Final round score.
    pub score: TeamScore,
}

/// One announced member with their stats line.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchMember {
    /// Guild member being announced.
    pub user: UserId,
    /// `Name#TAG` of the registered account.
    pub riot_id: String,
    /// The member's line from the shared match record.
    pub line: PlayerLine,
}

/// One announcement: every verified member of one match in one guild.
/// Ephemeral; built by the resolver, consumed once by the sink.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnouncementBatch {
    /// Guild the announcement belongs to.
    pub tenant: GuildId,
    /// Match all members share.
    pub match_id: MatchId,
    /// Match-level display fields.
    pub header: MatchHeader,
    /// Members in squad-arrival order.
    pub members: Vec<BatchMember>,
}

/// Failures while handing a batch to the delivery gateway.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The guild has no announcement channel configured.
    #[error("no announcement channel configured for this guild")]
    NoChannel,
    /// The request never reached the gateway.
    #[error("failed to reach delivery gateway")]
    Send {
        #[source]
        source: reqwest::Error,
    },
    /// The gateway rejected the message.
    #[error("delivery gateway answered {status}")]
    Status {
        /// Status the gateway answered with.
        status: StatusCode,
    },
}

/// Collaborator that posts finished announcements. Failure is terminal
/// for the cycle; the core never re-delivers.
pub trait AnnouncementSink: Send + Sync {
    /// Deliver one batch; `Ok` means the collaborator accepted it.
    fn deliver<'a>(&'a self, batch: &'a AnnouncementBatch)
    -> BoxFuture<'a, Result<(), DeliveryError>>;
}

/// Sink posting rendered announcements to the message gateway's
/// per-channel message endpoint.
pub struct GatewaySink {
    client: Client,
    base_url: Arc<str>,
    token: Option<Arc<str>>,
    registry: Registry,
}

impl GatewaySink {
    /// Build the sink from gateway configuration and the registry the
    /// per-guild channel is looked up in.
    pub fn new(config: &GatewayConfig, registry: Registry) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .build()
            .map_err(|source| DeliveryError::Send { source })?;
        Ok(Self {
            client,
            base_url: Arc::from(config.base_url.trim_end_matches('/')),
            token: config.token.as_deref().map(Arc::from),
            registry,
        })
    }
}

impl AnnouncementSink for GatewaySink {
    fn deliver<'a>(
        &'a self,
        batch: &'a AnnouncementBatch,
    ) -> BoxFuture<'a, Result<(), DeliveryError>> {
        Box::pin(async move {
            let channel = self
                .registry
                .announce_channel(batch.tenant)
                .await
                .ok_or(DeliveryError::NoChannel)?;

            let url = format!("{}/channels/{}/messages", self.base_url, channel);
            let mut request = self.client.post(url).json(&render_payload(batch));
            if let Some(token) = &self.token {
                request = request.header(AUTHORIZATION, format!("Bot {token}"));
            }

            let response = request
                .send()
                .await
                .map_err(|source| DeliveryError::Send { source })?;
            if response.status().is_success() {
                Ok(())
            } else {
                Err(DeliveryError::Status {
                    status: response.status(),
                })
            }
        })
    }
}

/// Render the gateway message body for a batch: member mentions plus an
/// embed with match info and one stats field per member.
pub fn render_payload(batch: &AnnouncementBatch) -> Value {
    let mentions = batch
        .members
        .iter()
        .map(|member| format!("<@{}>", member.user))
        .collect::<Vec<_>>()
        .join(" ");

    let title = if batch.members.len() == 1 {
        "Match complete!".to_owned()
    } else {
        format!("Squad match complete! ({} players)", batch.members.len())
    };

    let fields = member_fields(batch);
    let footer = batch
        .members
        .iter()
        .map(|member| member.riot_id.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into());

    json!({
        "content": mentions,
        "embeds": [{
            "title": title,
            "color": embed_color(batch),
            "fields": fields,
            "footer": { "text": footer },
            "timestamp": timestamp,
        }],
    })
}

fn member_fields(batch: &AnnouncementBatch) -> Vec<Value> {
    let mut fields = vec![
        json!({ "name": "Map", "value": batch.header.map, "inline": true }),
        json!({ "name": "Mode", "value": batch.header.mode, "inline": true }),
        json!({
            "name": "Score",
            "value": format!("{} - {}", batch.header.score.red, batch.header.score.blue),
            "inline": true,
        }),
    ];

    for member in &batch.members {
        let line = &member.line;
        let result = if line.won { "Victory" } else { "Defeat" };
        let side = match line.team {
            TeamSide::Red => "Red",
            TeamSide::Blue => "Blue",
        };
        fields.push(json!({
            "name": member.riot_id,
            "value": format!(
                "{result} ({side}) — **{}** | K/D/A: **{}/{}/{}** (KDA: {:.2})",
                line.agent, line.kills, line.deaths, line.assists, line.kda(),
            ),
            "inline": false,
        }));
    }

    fields
}

/// Green for a win, red for a loss, gold when the squad straddled both
/// teams; keyed off the first member like the score line.
fn embed_color(batch: &AnnouncementBatch) -> u32 {
    const GREEN: u32 = 0x57F287;
    const RED: u32 = 0xED4245;
    const GOLD: u32 = 0xFEE75C;

    let mut sides = batch.members.iter().map(|member| member.line.team);
    let first_side = match sides.next() {
        Some(side) => side,
        None => return GOLD,
    };
    if sides.any(|side| side != first_side) {
        return GOLD;
    }

    match batch.members.first() {
        Some(member) if member.line.won => GREEN,
        _ => RED,
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn member(user: u64, riot_id: &str, team: TeamSide, won: bool) -> BatchMember {
        BatchMember {
            user: UserId(user),
            riot_id: riot_id.into(),
            line: PlayerLine {
                name: riot_id.split('#').next().unwrap().into(),
                tag: riot_id.split('#').nth(1).unwrap_or("NA1").into(),
                team,
                agent: "Sova".into(),
                kills: 20,
                deaths: 10,
                assists: 5,
                won,
            },
        }
    }

    fn batch(members: Vec<BatchMember>) -> AnnouncementBatch {
        AnnouncementBatch {
            tenant: GuildId(1),
            match_id: MatchId::from("m1"),
            header: MatchHeader {
                map: "Ascent".into(),
                mode: "Competitive".into(),
                score: TeamScore { red: 13, blue: 7 },
            },
            members,
        }
    }

    #[test]
    fn payload_mentions_every_member() {
        let payload = render_payload(&batch(vec![
            member(1, "Sova#NA1", TeamSide::Red, true),
            member(2, "Jett#NA1", TeamSide::Red, true),
        ]));
        assert_eq!(payload["content"], "<@1> <@2>");
        assert_eq!(
            payload["embeds"][0]["title"],
            "Squad match complete! (2 players)"
        );
    }

    #[test]
    fn solo_batch_uses_singular_title() {
        let payload = render_payload(&batch(vec![member(1, "Sova#NA1", TeamSide::Red, true)]));
        assert_eq!(payload["embeds"][0]["title"], "Match complete!");
    }

    #[test]
    fn stats_line_includes_kda_ratio() {
        let payload = render_payload(&batch(vec![member(1, "Sova#NA1", TeamSide::Red, true)]));
        let value = payload["embeds"][0]["fields"][3]["value"].as_str().unwrap();
        assert!(value.contains("20/10/5"), "{value}");
        assert!(value.contains("2.50"), "{value}");
    }

    #[test]
    fn embed_color_reflects_result() {
        let win = batch(vec![member(1, "Sova#NA1", TeamSide::Red, true)]);
        let loss = batch(vec![member(1, "Sova#NA1", TeamSide::Blue, false)]);
        let mixed = batch(vec![
            member(1, "Sova#NA1", TeamSide::Red, true),
            member(2, "Jett#NA1", TeamSide::Blue, false),
        ]);

        assert_eq!(embed_color(&win), 0x57F287);
        assert_eq!(embed_color(&loss), 0xED4245);
        assert_eq!(embed_color(&mixed), 0xFEE75C);
    }
}
