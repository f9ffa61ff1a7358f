//! The coordinating task: serializes every session and group mutation,
//! arms group-window timers, and launches resolution cycles.

use std::collections::HashMap;
use std::sync::Arc;

use time::OffsetDateTime;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, trace};

use crate::services::resolver::{self, ResolveContext};
use crate::state::activity::{SessionBoard, SignalKind, SignalOutcome};
use crate::state::groups::{GroupBoard, GroupKey, GroupTimer};
use crate::state::ids::{ChannelId, GuildId, UserId};

/// Raw activity signal as delivered by the presence source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivitySignal {
    /// Guild the signal belongs to.
    pub tenant: GuildId,
    /// Member the signal is about.
    pub user: UserId,
    /// What happened.
    pub kind: SignalKind,
    /// Voice channel the member occupies, if any.
    pub voice_channel: Option<ChannelId>,
}

/// Commands consumed by the engine loop. Timers and resolution tasks
/// report back through the same channel, so all state mutations are
/// serialized through one task.
enum EngineCommand {
    Signal(ActivitySignal),
    GroupElapsed {
        tenant: GuildId,
        key: GroupKey,
        generation: u64,
    },
    ResolutionFinished {
        tenant: GuildId,
        members: Vec<UserId>,
    },
}

/// Cheap handle used by the ingestion route to feed the engine.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineCommand>,
}

/// Error returned when the engine task is gone.
#[derive(Debug, thiserror::Error)]
#[error("signal queue is closed")]
pub struct QueueClosed;

impl EngineHandle {
    /// Enqueue one signal, preserving per-sender arrival order.
    pub async fn submit(&self, signal: ActivitySignal) -> Result<(), QueueClosed> {
        self.tx
            .send(EngineCommand::Signal(signal))
            .await
            .map_err(|_| QueueClosed)
    }
}

const COMMAND_BUFFER: usize = 256;

/// Spawn the engine task and return the handle routes submit through.
pub fn spawn(ctx: ResolveContext) -> EngineHandle {
    let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
    let engine = Engine {
        ctx: Arc::new(ctx),
        tenants: HashMap::new(),
        tx: tx.clone(),
    };
    tokio::spawn(run(engine, rx));
    EngineHandle { tx }
}

/// Session and group state for one guild; never shared across guilds.
#[derive(Default)]
struct TenantBoard {
    sessions: SessionBoard,
    groups: GroupBoard,
}

struct Engine {
    ctx: Arc<ResolveContext>,
    tenants: HashMap<GuildId, TenantBoard>,
    tx: mpsc::Sender<EngineCommand>,
}

async fn run(mut engine: Engine, mut rx: mpsc::Receiver<EngineCommand>) {
    info!("tracker engine started");
    while let Some(command) = rx.recv().await {
        engine.handle(command).await;
    }
    info!("tracker engine stopped, signal queue closed");
}

impl Engine {
    async fn handle(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::Signal(signal) => self.on_signal(signal).await,
            EngineCommand::GroupElapsed {
                tenant,
                key,
                generation,
            } => self.on_group_elapsed(tenant, key, generation),
            EngineCommand::ResolutionFinished { tenant, members } => {
                self.on_resolution_finished(tenant, &members);
            }
        }
    }

    async fn on_signal(&mut self, signal: ActivitySignal) {
        let ActivitySignal {
            tenant,
            user,
            kind,
            voice_channel,
        } = signal;

        if !self.ctx.registry.is_registered(tenant, user).await {
            trace!(%tenant, %user, "ignoring signal for unregistered user");
            return;
        }

        let board = self.tenants.entry(tenant).or_default();
        match board
            .sessions
            .on_signal(user, kind, voice_channel, OffsetDateTime::now_utc())
        {
            SignalOutcome::SessionStarted => {
                info!(%tenant, %user, ?voice_channel, "session started");
            }
            SignalOutcome::Refreshed => {
                debug!(%tenant, %user, ?voice_channel, "session refreshed");
            }
            SignalOutcome::Ignored => {
                trace!(%tenant, %user, ?kind, "signal ignored");
            }
            SignalOutcome::SessionEnded(event) => {
                let key = GroupKey::for_session(event.user, event.voice_channel);
                let windows = &self.ctx.config.windows;
                let timer = board.groups.admit(
                    key,
                    event.user,
                    Instant::now(),
                    windows.group_wait,
                    windows.max_group_wait,
                );
                info!(%tenant, %user, ?key, "session ended, queued for grouping");
                self.arm_group_timer(tenant, timer);
            }
        }
    }

    fn arm_group_timer(&self, tenant: GuildId, timer: GroupTimer) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            sleep_until(timer.deadline).await;
            let _ = tx
                .send(EngineCommand::GroupElapsed {
                    tenant,
                    key: timer.key,
                    generation: timer.generation,
                })
                .await;
        });
    }

    fn on_group_elapsed(&mut self, tenant: GuildId, key: GroupKey, generation: u64) {
        let Some(board) = self.tenants.get_mut(&tenant) else {
            return;
        };
        let Some(members) = board.groups.close(&key, generation) else {
            trace!(%tenant, ?key, generation, "group timer superseded");
            return;
        };

        info!(%tenant, ?key, members = members.len(), "group window expired, resolving");
        let ctx = self.ctx.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            resolver::resolve(&ctx, tenant, members.clone()).await;
            let _ = tx
                .send(EngineCommand::ResolutionFinished { tenant, members })
                .await;
        });
    }

    fn on_resolution_finished(&mut self, tenant: GuildId, members: &[UserId]) {
        if let Some(board) = self.tenants.get_mut(&tenant) {
            board.sessions.release(members);
            debug!(%tenant, members = members.len(), "sessions released after resolution");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::future::BoxFuture;
    use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
    use tokio::time::{sleep, timeout};

    use super::*;
    use crate::config::AppConfig;
    use crate::dao::models::Region;
    use crate::dao::registry::{Registry, new_registration, test_registry};
    use crate::dao::valorant::testing::{ScriptStep, ScriptedSource, sample_record};
    use crate::services::announcer::Announcer;
    use crate::services::delivery::{AnnouncementBatch, AnnouncementSink, DeliveryError};
    use crate::state::ledger::AnnouncementLedger;

    struct ChannelSink {
        tx: UnboundedSender<AnnouncementBatch>,
    }

    impl AnnouncementSink for ChannelSink {
        fn deliver<'a>(
            &'a self,
            batch: &'a AnnouncementBatch,
        ) -> BoxFuture<'a, Result<(), DeliveryError>> {
            let _ = self.tx.send(batch.clone());
            Box::pin(async { Ok(()) })
        }
    }

    struct Harness {
        engine: EngineHandle,
        registry: Registry,
        source: Arc<ScriptedSource>,
        batches: UnboundedReceiver<AnnouncementBatch>,
    }

    async fn harness() -> Harness {
        let source = Arc::new(ScriptedSource::new());
        let registry = test_registry().await;
        let (tx, batches) = unbounded_channel();
        let announcer = Announcer::new(
            Arc::new(AnnouncementLedger::new()),
            Arc::new(ChannelSink { tx }),
        );
        let engine = spawn(ResolveContext {
            config: Arc::new(AppConfig::default()),
            registry: registry.clone(),
            source: source.clone(),
            announcer,
        });
        Harness {
            engine,
            registry,
            source,
            batches,
        }
    }

    impl Harness {
        async fn register(&self, tenant: u64, user: u64, name: &str) {
            self.registry
                .register(
                    GuildId(tenant),
                    UserId(user),
                    new_registration(name.into(), "NA1".into(), Region::Na),
                )
                .await
                .unwrap();
        }

        async fn send(&self, tenant: u64, user: u64, kind: SignalKind, voice: Option<u64>) {
            self.engine
                .submit(ActivitySignal {
                    tenant: GuildId(tenant),
                    user: UserId(user),
                    kind,
                    voice_channel: voice.map(ChannelId),
                })
                .await
                .unwrap();
        }

        /// Wait for the next batch; the paused clock fast-forwards through
        /// the group window and settle delays.
        async fn expect_batch(&mut self) -> AnnouncementBatch {
            timeout(Duration::from_secs(3_600), self.batches.recv())
                .await
                .expect("no batch before virtual deadline")
                .expect("sink channel closed")
        }

        /// Assert nothing is announced within a long virtual window.
        async fn expect_quiet(&mut self) {
            let outcome = timeout(Duration::from_secs(3_600), self.batches.recv()).await;
            assert!(outcome.is_err(), "unexpected batch: {outcome:?}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn squad_finishing_within_window_is_announced_together() {
        let mut harness = harness().await;
        harness.register(1, 1, "Sova").await;
        harness.register(1, 2, "Jett").await;

        let roster = sample_record("m1", &[("Sova", "NA1"), ("Jett", "NA1")]);
        harness.source.script("Sova", vec![ScriptStep::Match(roster.clone())]);
        harness.source.script("Jett", vec![ScriptStep::Match(roster)]);

        harness.send(1, 1, SignalKind::Started, Some(5)).await;
        harness.send(1, 2, SignalKind::Started, Some(5)).await;
        harness.send(1, 1, SignalKind::Stopped, None).await;
        sleep(Duration::from_secs(5)).await;
        harness.send(1, 2, SignalKind::Stopped, None).await;

        let batch = harness.expect_batch().await;
        assert_eq!(batch.tenant, GuildId(1));
        assert_eq!(batch.match_id.0, "m1");
        assert_eq!(
            batch.members.iter().map(|m| m.user).collect::<Vec<_>>(),
            vec![UserId(1), UserId(2)]
        );
        harness.expect_quiet().await;
    }

    #[tokio::test(start_paused = true)]
    async fn same_channel_different_matches_split_batches() {
        let mut harness = harness().await;
        harness.register(1, 1, "Sova").await;
        harness.register(1, 2, "Jett").await;

        harness.source.script(
            "Sova",
            vec![ScriptStep::Match(sample_record("m1", &[("Sova", "NA1")]))],
        );
        harness.source.script(
            "Jett",
            vec![ScriptStep::Match(sample_record("m2", &[("Jett", "NA1")]))],
        );

        harness.send(1, 1, SignalKind::Started, Some(5)).await;
        harness.send(1, 2, SignalKind::Started, Some(5)).await;
        harness.send(1, 1, SignalKind::Stopped, None).await;
        harness.send(1, 2, SignalKind::Stopped, None).await;

        let first = harness.expect_batch().await;
        let second = harness.expect_batch().await;
        assert_eq!(first.members.len(), 1);
        assert_eq!(second.members.len(), 1);
        assert_ne!(first.match_id, second.match_id);
    }

    #[tokio::test(start_paused = true)]
    async fn solo_user_resolves_to_singleton_batch() {
        let mut harness = harness().await;
        harness.register(1, 3, "Neon").await;
        harness.source.script(
            "Neon",
            vec![ScriptStep::Match(sample_record("m9", &[("Neon", "NA1")]))],
        );

        harness.send(1, 3, SignalKind::Started, None).await;
        harness.send(1, 3, SignalKind::Stopped, None).await;

        let batch = harness.expect_batch().await;
        assert_eq!(batch.members.len(), 1);
        assert_eq!(batch.members[0].user, UserId(3));
    }

    #[tokio::test(start_paused = true)]
    async fn unregistered_users_never_produce_announcements() {
        let mut harness = harness().await;

        harness.send(1, 42, SignalKind::Started, Some(5)).await;
        harness.send(1, 42, SignalKind::Stopped, None).await;

        harness.expect_quiet().await;
    }

    #[tokio::test(start_paused = true)]
    async fn sessions_are_released_for_a_new_cycle_after_resolution() {
        let mut harness = harness().await;
        harness.register(1, 1, "Sova").await;
        harness.source.script(
            "Sova",
            vec![
                ScriptStep::Match(sample_record("m1", &[("Sova", "NA1")])),
                ScriptStep::Match(sample_record("m2", &[("Sova", "NA1")])),
            ],
        );

        harness.send(1, 1, SignalKind::Started, None).await;
        harness.send(1, 1, SignalKind::Stopped, None).await;
        assert_eq!(harness.expect_batch().await.match_id.0, "m1");

        harness.send(1, 1, SignalKind::Started, None).await;
        harness.send(1, 1, SignalKind::Stopped, None).await;
        assert_eq!(harness.expect_batch().await.match_id.0, "m2");
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_stop_signals_do_not_double_announce() {
        let mut harness = harness().await;
        harness.register(1, 1, "Sova").await;
        harness.source.script(
            "Sova",
            vec![ScriptStep::Match(sample_record("m1", &[("Sova", "NA1")]))],
        );

        harness.send(1, 1, SignalKind::Started, None).await;
        harness.send(1, 1, SignalKind::Stopped, None).await;
        harness.send(1, 1, SignalKind::Stopped, None).await;

        let batch = harness.expect_batch().await;
        assert_eq!(batch.members.len(), 1);
        harness.expect_quiet().await;
    }

    #[tokio::test(start_paused = true)]
    async fn separate_voice_channels_resolve_separately() {
        let mut harness = harness().await;
        harness.register(1, 1, "Sova").await;
        harness.register(1, 2, "Jett").await;

        harness.source.script(
            "Sova",
            vec![ScriptStep::Match(sample_record("m1", &[("Sova", "NA1")]))],
        );
        harness.source.script(
            "Jett",
            vec![ScriptStep::Match(sample_record("m1", &[("Jett", "NA1")]))],
        );

        harness.send(1, 1, SignalKind::Started, Some(5)).await;
        harness.send(1, 2, SignalKind::Started, Some(6)).await;
        harness.send(1, 1, SignalKind::Stopped, None).await;
        harness.send(1, 2, SignalKind::Stopped, None).await;

        let first = harness.expect_batch().await;
        let second = harness.expect_batch().await;
        assert_eq!(first.members.len(), 1);
        assert_eq!(second.members.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn tenants_are_tracked_independently() {
        let mut harness = harness().await;
        harness.register(1, 7, "Sova").await;
        harness.register(2, 7, "Sova").await;
        harness.source.script(
            "Sova",
            vec![
                ScriptStep::Match(sample_record("m1", &[("Sova", "NA1")])),
                ScriptStep::Match(sample_record("m1", &[("Sova", "NA1")])),
            ],
        );

        harness.send(1, 7, SignalKind::Started, None).await;
        harness.send(2, 7, SignalKind::Started, None).await;
        harness.send(1, 7, SignalKind::Stopped, None).await;
        harness.send(2, 7, SignalKind::Stopped, None).await;

        let first = harness.expect_batch().await;
        let second = harness.expect_batch().await;
        let mut tenants = [first.tenant, second.tenant];
        tenants.sort();
        assert_eq!(tenants, [GuildId(1), GuildId(2)]);
    }

    #[tokio::test(start_paused = true)]
    async fn voice_move_mid_game_regroups_under_latest_channel() {
        let mut harness = harness().await;
        harness.register(1, 1, "Sova").await;
        harness.register(1, 2, "Jett").await;

        let roster = sample_record("m1", &[("Sova", "NA1"), ("Jett", "NA1")]);
        harness.source.script("Sova", vec![ScriptStep::Match(roster.clone())]);
        harness.source.script("Jett", vec![ScriptStep::Match(roster)]);

        harness.send(1, 1, SignalKind::Started, Some(5)).await;
        harness.send(1, 2, SignalKind::Started, Some(6)).await;
        // User 2 joins user 1's channel before finishing.
        harness.send(1, 2, SignalKind::VoiceMoved, Some(5)).await;
        harness.send(1, 1, SignalKind::Stopped, None).await;
        harness.send(1, 2, SignalKind::Stopped, None).await;

        let batch = harness.expect_batch().await;
        assert_eq!(batch.members.len(), 2);
        harness.expect_quiet().await;
    }
}
