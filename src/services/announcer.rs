//! Announcement deduplication and publication.

use std::sync::Arc;

use tracing::{info, warn};

use crate::services::delivery::{AnnouncementBatch, AnnouncementSink};
use crate::state::ledger::AnnouncementLedger;

/// What happened to a published batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The sink accepted the batch; the count is members actually sent.
    Delivered(usize),
    /// Every member was already announced for this match; nothing sent.
    Suppressed,
    /// The sink rejected the batch; terminal for this cycle, ledger
    /// untouched.
    Failed,
}

/// Publishes batches at most once per (guild, match, user).
#[derive(Clone)]
pub struct Announcer {
    ledger: Arc<AnnouncementLedger>,
    sink: Arc<dyn AnnouncementSink>,
}

impl Announcer {
    /// Create an announcer over the given ledger and sink.
    pub fn new(ledger: Arc<AnnouncementLedger>, sink: Arc<dyn AnnouncementSink>) -> Self {
        Self { ledger, sink }
    }

    /// Filter already-announced members out of the batch, deliver what
    /// remains, and record the ledger only after the sink accepts.
    pub async fn publish(&self, mut batch: AnnouncementBatch) -> PublishOutcome {
        let tenant = batch.tenant;
        let match_id = batch.match_id.clone();

        batch
            .members
            .retain(|member| !self.ledger.already_announced(tenant, member.user, &match_id));

        if batch.members.is_empty() {
            info!(%tenant, %match_id, "announcement suppressed, all members already announced");
            return PublishOutcome::Suppressed;
        }

        match self.sink.deliver(&batch).await {
            Ok(()) => {
                let users: Vec<_> = batch.members.iter().map(|member| member.user).collect();
                self.ledger.record(tenant, &users, &match_id);
                info!(%tenant, %match_id, members = users.len(), "announcement delivered");
                PublishOutcome::Delivered(users.len())
            }
            Err(err) => {
                warn!(%tenant, %match_id, error = %err, "announcement delivery failed");
                PublishOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::valorant::{PlayerLine, TeamScore, TeamSide};
    use crate::services::delivery::testing::{FailingSink, RecordingSink};
    use crate::services::delivery::{BatchMember, MatchHeader};
    use crate::state::ids::{GuildId, MatchId, UserId};

    fn batch(tenant: u64, match_id: &str, users: &[u64]) -> AnnouncementBatch {
        let members = users
            .iter()
            .map(|user| BatchMember {
                user: UserId(*user),
                riot_id: format!("Player{user}#NA1"),
                line: PlayerLine {
                    name: format!("Player{user}"),
                    tag: "NA1".into(),
                    team: TeamSide::Red,
                    agent: "Sova".into(),
                    kills: 12,
                    deaths: 8,
                    assists: 4,
                    won: true,
                },
            })
            .collect();

        AnnouncementBatch {
            tenant: GuildId(tenant),
            match_id: MatchId::from(match_id),
            header: MatchHeader {
                map: "Ascent".into(),
                mode: "Competitive".into(),
                score: TeamScore { red: 13, blue: 7 },
            },
            members,
        }
    }

    fn announcer_with_recording() -> (Announcer, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::new());
        let announcer = Announcer::new(Arc::new(AnnouncementLedger::new()), sink.clone());
        (announcer, sink)
    }

    #[tokio::test]
    async fn first_publish_delivers_every_member() {
        let (announcer, sink) = announcer_with_recording();
        let outcome = announcer.publish(batch(1, "m1", &[1, 2])).await;

        assert_eq!(outcome, PublishOutcome::Delivered(2));
        assert_eq!(sink.delivered().len(), 1);
    }

    #[tokio::test]
    async fn republishing_a_delivered_batch_is_suppressed() {
        let (announcer, sink) = announcer_with_recording();
        announcer.publish(batch(1, "m1", &[1, 2])).await;

        let outcome = announcer.publish(batch(1, "m1", &[1, 2])).await;
        assert_eq!(outcome, PublishOutcome::Suppressed);
        assert_eq!(sink.delivered().len(), 1);
    }

    #[tokio::test]
    async fn partially_announced_batch_delivers_remaining_members() {
        let (announcer, sink) = announcer_with_recording();
        announcer.publish(batch(1, "m1", &[1])).await;

        let outcome = announcer.publish(batch(1, "m1", &[1, 2])).await;
        assert_eq!(outcome, PublishOutcome::Delivered(1));

        let second = &sink.delivered()[1];
        assert_eq!(second.members.len(), 1);
        assert_eq!(second.members[0].user, UserId(2));
    }

    #[tokio::test]
    async fn a_new_match_announces_again() {
        let (announcer, _sink) = announcer_with_recording();
        announcer.publish(batch(1, "m1", &[1])).await;

        let outcome = announcer.publish(batch(1, "m2", &[1])).await;
        assert_eq!(outcome, PublishOutcome::Delivered(1));
    }

    #[tokio::test]
    async fn failed_delivery_leaves_ledger_untouched() {
        let ledger = Arc::new(AnnouncementLedger::new());
        let failing = Announcer::new(ledger.clone(), Arc::new(FailingSink));

        assert_eq!(failing.publish(batch(1, "m1", &[1])).await, PublishOutcome::Failed);

        // A later publish through a working sink still delivers.
        let working = Announcer::new(ledger, Arc::new(RecordingSink::new()));
        assert_eq!(
            working.publish(batch(1, "m1", &[1])).await,
            PublishOutcome::Delivered(1)
        );
    }

    #[tokio::test]
    async fn ledger_state_never_crosses_tenants() {
        let (announcer, sink) = announcer_with_recording();
        announcer.publish(batch(1, "m1", &[7])).await;

        let outcome = announcer.publish(batch(2, "m1", &[7])).await;
        assert_eq!(outcome, PublishOutcome::Delivered(1));
        assert_eq!(sink.delivered().len(), 2);
    }
}
