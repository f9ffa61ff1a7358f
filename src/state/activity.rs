use std::collections::HashMap;

use time::OffsetDateTime;

use crate::state::ids::{ChannelId, UserId};

/// Raw activity signal kinds delivered by the presence source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    /// The user started playing.
    Started,
    /// The user stopped playing.
    Stopped,
    /// The user changed voice channels while a session may be active.
    VoiceMoved,
}

/// State of a single user's activity session.
///
/// Idle is represented by absence from the board, so a user can never hold
/// two states at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    /// A game is in progress.
    Playing {
        /// When the session was first observed.
        started_at: OffsetDateTime,
        /// Voice channel the user currently occupies, if any.
        voice_channel: Option<ChannelId>,
    },
    /// The session ended and is waiting for match resolution; no new
    /// session can start until the resolver releases this user.
    PendingResolution {
        /// When the stop signal arrived.
        ended_at: OffsetDateTime,
        /// Voice channel at stop time; decides the grouping key.
        voice_channel: Option<ChannelId>,
    },
}

/// Event emitted when a Playing session transitions to PendingResolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEnded {
    /// User whose session ended.
    pub user: UserId,
    /// Voice channel recorded at stop time.
    pub voice_channel: Option<ChannelId>,
    /// Stop-signal timestamp.
    pub ended_at: OffsetDateTime,
}

/// Result of feeding one signal into the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalOutcome {
    /// A fresh session was created.
    SessionStarted,
    /// An existing Playing session was refreshed (voice channel may have
    /// been updated).
    Refreshed,
    /// The session moved to PendingResolution; the event must be handed to
    /// the group collector.
    SessionEnded(SessionEnded),
    /// Duplicate or out-of-place signal; nothing changed.
    Ignored,
}

/// Per-tenant map of active sessions. Purely in-memory, no I/O.
#[derive(Debug, Default)]
pub struct SessionBoard {
    sessions: HashMap<UserId, SessionPhase>,
}

impl SessionBoard {
    /// Apply one signal and report what happened.
    pub fn on_signal(
        &mut self,
        user: UserId,
        kind: SignalKind,
        voice_channel: Option<ChannelId>,
        now: OffsetDateTime,
    ) -> SignalOutcome {
        match (kind, self.sessions.get_mut(&user)) {
            (SignalKind::Started, None) => {
                self.sessions.insert(
                    user,
                    SessionPhase::Playing {
                        started_at: now,
                        voice_channel,
                    },
                );
                SignalOutcome::SessionStarted
            }
            (
                SignalKind::Started,
                Some(SessionPhase::Playing {
                    voice_channel: current,
                    ..
                }),
            ) => {
                // A user can move voice channels mid-game; the latest value
                // decides the grouping key at stop time.
                *current = voice_channel;
                SignalOutcome::Refreshed
            }
            (SignalKind::Started, Some(SessionPhase::PendingResolution { .. })) => {
                SignalOutcome::Ignored
            }
            (SignalKind::Stopped, Some(phase)) => {
                let SessionPhase::Playing { voice_channel, .. } = phase else {
                    return SignalOutcome::Ignored;
                };
                let voice_channel = *voice_channel;
                *phase = SessionPhase::PendingResolution {
                    ended_at: now,
                    voice_channel,
                };
                SignalOutcome::SessionEnded(SessionEnded {
                    user,
                    voice_channel,
                    ended_at: now,
                })
            }
            (SignalKind::Stopped, None) => SignalOutcome::Ignored,
            (
                SignalKind::VoiceMoved,
                Some(SessionPhase::Playing {
                    voice_channel: current,
                    ..
                }),
            ) => {
                *current = voice_channel;
                SignalOutcome::Refreshed
            }
            (SignalKind::VoiceMoved, _) => SignalOutcome::Ignored,
        }
    }

    /// Return the given users to Idle after a resolution cycle. Users not
    /// in PendingResolution are left untouched.
    pub fn release(&mut self, users: &[UserId]) {
        for user in users {
            if matches!(
                self.sessions.get(user),
                Some(SessionPhase::PendingResolution { .. })
            ) {
                self.sessions.remove(user);
            }
        }
    }

    /// Current phase of a user's session, if one exists.
    pub fn phase(&self, user: UserId) -> Option<&SessionPhase> {
        self.sessions.get(&user)
    }

    /// Number of non-idle sessions on this board.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// True when no session is active.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
