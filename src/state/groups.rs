use std::collections::HashMap;
use std::time::Duration;

use indexmap::IndexSet;
use tokio::time::Instant;

use crate::state::ids::{ChannelId, UserId};

/// Key a pending group is collected under. Solo players get a private key
/// so they never merge with anyone else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKey {
    /// Members sharing this voice channel are candidates for one squad.
    Voice(ChannelId),
    /// A player outside voice waits alone.
    Solo(UserId),
}

impl GroupKey {
    /// Derive the key from the voice channel recorded at session end.
    pub fn for_session(user: UserId, voice_channel: Option<ChannelId>) -> Self {
        match voice_channel {
            Some(channel) => GroupKey::Voice(channel),
            None => GroupKey::Solo(user),
        }
    }
}

/// Candidate squad accumulating members until its window expires.
#[derive(Debug)]
struct PendingGroup {
    members: IndexSet<UserId>,
    opened_at: Instant,
    generation: u64,
}

/// Timer handed back by [`GroupBoard::admit`]; the caller schedules a wake
/// at `deadline` and reports back with the key and generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupTimer {
    /// Group the timer belongs to.
    pub key: GroupKey,
    /// When the window expires.
    pub deadline: Instant,
    /// Generation the timer was armed for; stale generations are discarded
    /// on expiry, which is how rescheduling works.
    pub generation: u64,
}

/// Per-tenant collection of pending groups.
///
/// Each admit supersedes the group's previous timer by bumping the
/// generation, so no cancellation token is needed: an old timer fires,
/// fails the generation check, and is dropped.
#[derive(Debug, Default)]
pub struct GroupBoard {
    groups: HashMap<GroupKey, PendingGroup>,
    generations: u64,
}

impl GroupBoard {
    /// Add a member to the group under `key`, opening the group if needed,
    /// and return the timer to arm. The deadline extends by `window` per
    /// member but never past `opened_at + max_total`.
    pub fn admit(
        &mut self,
        key: GroupKey,
        user: UserId,
        now: Instant,
        window: Duration,
        max_total: Duration,
    ) -> GroupTimer {
        self.generations += 1;
        let generation = self.generations;

        let group = self.groups.entry(key).or_insert_with(|| PendingGroup {
            members: IndexSet::new(),
            opened_at: now,
            generation,
        });
        group.members.insert(user);
        group.generation = generation;

        let deadline = (now + window).min(group.opened_at + max_total);
        GroupTimer {
            key,
            deadline,
            generation,
        }
    }

    /// Close the group if `generation` is still current, handing back its
    /// members in arrival order. Returns `None` for superseded timers or
    /// unknown keys.
    pub fn close(&mut self, key: &GroupKey, generation: u64) -> Option<Vec<UserId>> {
        match self.groups.get(key) {
            Some(group) if group.generation == generation => {
                let group = self.groups.remove(key)?;
                Some(group.members.into_iter().collect())
            }
            _ => None,
        }
    }

    /// Number of groups currently waiting.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// True when no group is pending.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
