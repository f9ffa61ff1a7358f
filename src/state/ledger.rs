use std::collections::HashMap;

use dashmap::DashMap;

use crate::state::ids::{GuildId, MatchId, UserId};

/// Last announced match per (tenant, user).
///
/// Partitioned by tenant at the top level so lookups can never cross
/// guilds. Entries are only written after the delivery sink has accepted a
/// batch, which is what makes retried resolutions at-most-once. The ledger
/// is process-local; durability across restarts is out of scope.
#[derive(Debug, Default)]
pub struct AnnouncementLedger {
    tenants: DashMap<GuildId, HashMap<UserId, MatchId>>,
}

impl AnnouncementLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// True when `match_id` was already announced for this user in this
    /// tenant.
    pub fn already_announced(&self, tenant: GuildId, user: UserId, match_id: &MatchId) -> bool {
        self.tenants
            .get(&tenant)
            .is_some_and(|entries| entries.get(&user) == Some(match_id))
    }

    /// Record a delivered announcement for every listed user.
    pub fn record(&self, tenant: GuildId, users: &[UserId], match_id: &MatchId) {
        let mut entries = self.tenants.entry(tenant).or_default();
        for user in users {
            entries.insert(*user, match_id.clone());
        }
    }
}
