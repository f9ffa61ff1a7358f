//! One resolution cycle: settle, fetch, verify match identity, partition
//! into squads, and publish.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use tokio::time::sleep;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::dao::models::RegistrationEntity;
use crate::dao::registry::Registry;
use crate::dao::valorant::{FetchClass, MatchRecord, MatchSource};
use crate::services::announcer::{Announcer, PublishOutcome};
use crate::services::delivery::{AnnouncementBatch, BatchMember, MatchHeader};
use crate::state::ids::{GuildId, MatchId, UserId};

/// Why a member produced no announcement this cycle. Member-level only;
/// one member's drop never aborts the rest of the squad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Registration disappeared between grouping and resolution.
    Unregistered,
    /// Provider has no account or no recent match.
    NoRecentMatch,
    /// Newest match was filtered by the mode policy.
    ModeExcluded,
    /// Provider stayed unreachable through the refetch.
    Unavailable,
    /// Rate limit budget exhausted twice.
    RateLimited,
    /// Verified match roster does not contain the registered account.
    MissingFromRoster,
    /// The delivery sink rejected the member's batch.
    DeliveryFailed,
}

/// Typed outcome of one resolution cycle.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResolutionReport {
    /// Batches the sink accepted.
    pub delivered: usize,
    /// Batches fully suppressed by the ledger.
    pub suppressed: usize,
    /// Members that produced no announcement, with the reason.
    pub dropped: Vec<(UserId, DropReason)>,
}

/// Dependencies a resolution cycle runs against.
pub struct ResolveContext {
    /// Shared runtime configuration.
    pub config: Arc<AppConfig>,
    /// Registration lookups.
    pub registry: Registry,
    /// Match-data provider.
    pub source: Arc<dyn MatchSource>,
    /// Deduplicating publisher.
    pub announcer: Announcer,
}

/// Resolve one finalized group: verify which members actually share a
/// match and publish one batch per distinct match id.
pub async fn resolve(
    ctx: &ResolveContext,
    tenant: GuildId,
    members: Vec<UserId>,
) -> ResolutionReport {
    let span = info_span!("resolution", %tenant, cycle = %Uuid::new_v4());
    run_cycle(ctx, tenant, members).instrument(span).await
}

type FetchOutcome = Result<MatchRecord, FetchClass>;

async fn run_cycle(
    ctx: &ResolveContext,
    tenant: GuildId,
    members: Vec<UserId>,
) -> ResolutionReport {
    let mut report = ResolutionReport::default();
    if members.is_empty() {
        return report;
    }

    info!(members = members.len(), "resolving group");

    // Give the provider time to ingest the finished match. Once per
    // cycle, not per account.
    sleep(ctx.config.windows.api_settle).await;

    let mut cache: HashMap<String, FetchOutcome> = HashMap::new();
    let mut fetched: Vec<(UserId, RegistrationEntity, MatchRecord)> = Vec::new();
    let mut transient: Vec<(UserId, RegistrationEntity)> = Vec::new();

    for user in &members {
        let Some(registration) = ctx.registry.registration(tenant, *user).await else {
            report.dropped.push((*user, DropReason::Unregistered));
            continue;
        };
        match fetch_cached(ctx, &mut cache, &registration).await {
            Ok(record) => fetched.push((*user, registration, record)),
            Err(FetchClass::NotFound) => report.dropped.push((*user, DropReason::NoRecentMatch)),
            Err(FetchClass::ModeExcluded) => report.dropped.push((*user, DropReason::ModeExcluded)),
            Err(FetchClass::RateLimited | FetchClass::Unavailable) => {
                transient.push((*user, registration));
            }
        }
    }

    // Transient failures get exactly one more shot after a fixed delay;
    // the cycle never retries beyond that.
    if !transient.is_empty() {
        sleep(ctx.config.windows.refetch_delay).await;
        for (user, registration) in transient {
            cache.remove(&account_key(&registration));
            match fetch_cached(ctx, &mut cache, &registration).await {
                Ok(record) => fetched.push((user, registration, record)),
                Err(FetchClass::NotFound) => report.dropped.push((user, DropReason::NoRecentMatch)),
                Err(FetchClass::ModeExcluded) => {
                    report.dropped.push((user, DropReason::ModeExcluded));
                }
                Err(FetchClass::RateLimited) => {
                    warn!(%user, "dropping member, provider still rate limited");
                    report.dropped.push((user, DropReason::RateLimited));
                }
                Err(FetchClass::Unavailable) => {
                    warn!(%user, "dropping member, provider still unavailable");
                    report.dropped.push((user, DropReason::Unavailable));
                }
            }
        }
    }

    // Partition by match id in a single pass; members who were merely in
    // the same voice channel but played different matches split here.
    let mut partitions: IndexMap<MatchId, Vec<(UserId, RegistrationEntity)>> = IndexMap::new();
    let mut records: HashMap<MatchId, MatchRecord> = HashMap::new();
    for (user, registration, record) in fetched {
        partitions
            .entry(record.id.clone())
            .or_default()
            .push((user, registration));
        records.entry(record.id.clone()).or_insert(record);
    }

    for (match_id, squad) in partitions {
        let record = &records[&match_id];
        let mut batch_members = Vec::with_capacity(squad.len());
        for (user, registration) in squad {
            match record.player(&registration.riot_name, &registration.riot_tag) {
                Some(line) => batch_members.push(BatchMember {
                    user,
                    riot_id: registration.riot_id(),
                    line: line.clone(),
                }),
                None => {
                    warn!(%user, %match_id, "registered account missing from match roster");
                    report.dropped.push((user, DropReason::MissingFromRoster));
                }
            }
        }

        if batch_members.is_empty() {
            continue;
        }
        let users: Vec<UserId> = batch_members.iter().map(|member| member.user).collect();
        let batch = AnnouncementBatch {
            tenant,
            match_id: match_id.clone(),
            header: MatchHeader {
                map: record.map.clone(),
                mode: record.mode.clone(),
                score: record.score,
            },
            members: batch_members,
        };

        match ctx.announcer.publish(batch).await {
            PublishOutcome::Delivered(_) => report.delivered += 1,
            PublishOutcome::Suppressed => report.suppressed += 1,
            PublishOutcome::Failed => {
                report
                    .dropped
                    .extend(users.into_iter().map(|user| (user, DropReason::DeliveryFailed)));
            }
        }
    }

    info!(
        delivered = report.delivered,
        suppressed = report.suppressed,
        dropped = report.dropped.len(),
        "resolution finished"
    );
    report
}

/// Fetch through the per-cycle cache so one account is queried at most
/// once per pass, no matter how many members share it.
async fn fetch_cached(
    ctx: &ResolveContext,
    cache: &mut HashMap<String, FetchOutcome>,
    registration: &RegistrationEntity,
) -> FetchOutcome {
    let key = account_key(registration);
    if let Some(outcome) = cache.get(&key) {
        return outcome.clone();
    }

    let outcome = match ctx
        .source
        .latest_match(
            registration.region,
            &registration.riot_name,
            &registration.riot_tag,
        )
        .await
    {
        Ok(record) => Ok(record),
        Err(err) => {
            debug!(account = %key, error = %err, "match fetch failed");
            Err(err.class())
        }
    };
    cache.insert(key, outcome.clone());
    outcome
}

fn account_key(registration: &RegistrationEntity) -> String {
    format!(
        "{}#{}@{}",
        registration.riot_name.to_lowercase(),
        registration.riot_tag.to_lowercase(),
        registration.region,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::registry::{new_registration, test_registry};
    use crate::dao::valorant::testing::{ScriptStep, ScriptedSource, sample_record};
    use crate::services::delivery::testing::{FailingSink, RecordingSink};
    use crate::state::ledger::AnnouncementLedger;

    const TENANT: GuildId = GuildId(100);

    struct Harness {
        ctx: ResolveContext,
        source: Arc<ScriptedSource>,
        sink: Arc<RecordingSink>,
    }

    async fn harness() -> Harness {
        let source = Arc::new(ScriptedSource::new());
        let sink = Arc::new(RecordingSink::new());
        let announcer = Announcer::new(Arc::new(AnnouncementLedger::new()), sink.clone());
        Harness {
            ctx: ResolveContext {
                config: Arc::new(AppConfig::default()),
                registry: test_registry().await,
                source: source.clone(),
                announcer,
            },
            source,
            sink,
        }
    }

    async fn register(harness: &Harness, user: u64, name: &str) {
        harness
            .ctx
            .registry
            .register(
                TENANT,
                UserId(user),
                new_registration(name.into(), "NA1".into(), crate::dao::models::Region::Na),
            )
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn shared_match_id_produces_one_squad_batch() {
        let harness = harness().await;
        register(&harness, 1, "Sova").await;
        register(&harness, 2, "Jett").await;

        let roster = sample_record("m1", &[("Sova", "NA1"), ("Jett", "NA1")]);
        harness.source.script("Sova", vec![ScriptStep::Match(roster.clone())]);
        harness.source.script("Jett", vec![ScriptStep::Match(roster)]);

        let report = resolve(&harness.ctx, TENANT, vec![UserId(1), UserId(2)]).await;

        assert_eq!(report.delivered, 1);
        assert!(report.dropped.is_empty());
        let batches = harness.sink.delivered();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].match_id, MatchId::from("m1"));
        assert_eq!(
            batches[0].members.iter().map(|m| m.user).collect::<Vec<_>>(),
            vec![UserId(1), UserId(2)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn differing_match_ids_split_into_singleton_batches() {
        let harness = harness().await;
        register(&harness, 1, "Sova").await;
        register(&harness, 2, "Jett").await;

        harness.source.script(
            "Sova",
            vec![ScriptStep::Match(sample_record("m1", &[("Sova", "NA1")]))],
        );
        harness.source.script(
            "Jett",
            vec![ScriptStep::Match(sample_record("m2", &[("Jett", "NA1")]))],
        );

        let report = resolve(&harness.ctx, TENANT, vec![UserId(1), UserId(2)]).await;

        assert_eq!(report.delivered, 2);
        let batches = harness.sink.delivered();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].match_id, MatchId::from("m1"));
        assert_eq!(batches[1].match_id, MatchId::from("m2"));
        assert_eq!(batches[0].members.len(), 1);
        assert_eq!(batches[1].members.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_match_sets_member_aside_without_blocking_squad() {
        let harness = harness().await;
        register(&harness, 1, "Sova").await;
        register(&harness, 2, "Jett").await;

        harness.source.script(
            "Sova",
            vec![ScriptStep::Match(sample_record("m1", &[("Sova", "NA1")]))],
        );
        harness.source.script("Jett", vec![ScriptStep::NotFound]);

        let report = resolve(&harness.ctx, TENANT, vec![UserId(1), UserId(2)]).await;

        assert_eq!(report.delivered, 1);
        assert_eq!(report.dropped, vec![(UserId(2), DropReason::NoRecentMatch)]);
    }

    #[tokio::test(start_paused = true)]
    async fn excluded_mode_drops_member_silently() {
        let harness = harness().await;
        register(&harness, 1, "Sova").await;
        register(&harness, 2, "Jett").await;

        harness.source.script(
            "Sova",
            vec![ScriptStep::Match(sample_record("m1", &[("Sova", "NA1")]))],
        );
        harness
            .source
            .script("Jett", vec![ScriptStep::ModeExcluded("Swiftplay".into())]);

        let report = resolve(&harness.ctx, TENANT, vec![UserId(1), UserId(2)]).await;

        assert_eq!(report.delivered, 1);
        assert_eq!(report.dropped, vec![(UserId(2), DropReason::ModeExcluded)]);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failure_is_retried_once_then_delivered() {
        let harness = harness().await;
        register(&harness, 1, "Sova").await;

        harness.source.script(
            "Sova",
            vec![
                ScriptStep::RateLimited,
                ScriptStep::Match(sample_record("m1", &[("Sova", "NA1")])),
            ],
        );

        let report = resolve(&harness.ctx, TENANT, vec![UserId(1)]).await;

        assert_eq!(report.delivered, 1);
        assert!(report.dropped.is_empty());
        assert_eq!(harness.source.calls_for("Sova"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_transient_failure_drops_member_after_one_refetch() {
        let harness = harness().await;
        register(&harness, 1, "Sova").await;

        harness
            .source
            .script("Sova", vec![ScriptStep::Unavailable, ScriptStep::Unavailable]);

        let report = resolve(&harness.ctx, TENANT, vec![UserId(1)]).await;

        assert_eq!(report.delivered, 0);
        assert_eq!(report.dropped, vec![(UserId(1), DropReason::Unavailable)]);
        assert_eq!(harness.source.calls_for("Sova"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn shared_account_is_fetched_once_per_cycle() {
        let harness = harness().await;
        register(&harness, 1, "Sova").await;
        register(&harness, 2, "Sova").await;

        harness.source.script(
            "Sova",
            vec![ScriptStep::Match(sample_record("m1", &[("Sova", "NA1")]))],
        );

        let report = resolve(&harness.ctx, TENANT, vec![UserId(1), UserId(2)]).await;

        assert_eq!(harness.source.calls_for("Sova"), 1);
        assert_eq!(report.delivered, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn member_absent_from_roster_is_dropped() {
        let harness = harness().await;
        register(&harness, 1, "Sova").await;

        harness.source.script(
            "Sova",
            vec![ScriptStep::Match(sample_record("m1", &[("Jett", "NA1")]))],
        );

        let report = resolve(&harness.ctx, TENANT, vec![UserId(1)]).await;

        assert_eq!(report.delivered, 0);
        assert_eq!(report.dropped, vec![(UserId(1), DropReason::MissingFromRoster)]);
    }

    #[tokio::test(start_paused = true)]
    async fn unregistered_member_is_reported() {
        let harness = harness().await;

        let report = resolve(&harness.ctx, TENANT, vec![UserId(9)]).await;

        assert_eq!(report.dropped, vec![(UserId(9), DropReason::Unregistered)]);
        assert!(harness.sink.delivered().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn empty_member_set_produces_nothing() {
        let harness = harness().await;
        let report = resolve(&harness.ctx, TENANT, Vec::new()).await;
        assert_eq!(report, ResolutionReport::default());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_delivery_reports_every_batch_member() {
        let source = Arc::new(ScriptedSource::new());
        let announcer = Announcer::new(Arc::new(AnnouncementLedger::new()), Arc::new(FailingSink));
        let ctx = ResolveContext {
            config: Arc::new(AppConfig::default()),
            registry: test_registry().await,
            source: source.clone(),
            announcer,
        };
        ctx.registry
            .register(
                TENANT,
                UserId(1),
                new_registration("Sova".into(), "NA1".into(), crate::dao::models::Region::Na),
            )
            .await
            .unwrap();
        source.script(
            "Sova",
            vec![ScriptStep::Match(sample_record("m1", &[("Sova", "NA1")]))],
        );

        let report = resolve(&ctx, TENANT, vec![UserId(1)]).await;

        assert_eq!(report.delivered, 0);
        assert_eq!(report.dropped, vec![(UserId(1), DropReason::DeliveryFailed)]);
    }
}
