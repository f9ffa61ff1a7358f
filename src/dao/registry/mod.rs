//! Registration and per-guild settings: persistent store trait plus the
//! in-memory view the rest of the service reads from.

mod json;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

use futures::future::BoxFuture;
use tokio::sync::RwLock;

use crate::{
    dao::models::{Region, RegistrationEntity, RegistrationMap, RegistrySnapshot, SettingsMap},
    dao::storage::StorageResult,
    state::ids::{ChannelId, GuildId, UserId},
};

pub use json::JsonRegistryStore;

/// Persistence backend for registrations and settings.
///
/// Backends persist whole snapshots: registrations change rarely and the
/// maps are small, so save-everything keeps the on-disk format trivially
/// crash-safe together with the write-then-rename in the JSON backend.
pub trait RegistryStore: Send + Sync {
    /// Load everything persisted, or empty maps on first start.
    fn load(&self) -> BoxFuture<'static, StorageResult<RegistrySnapshot>>;

    /// Persist the full registration map.
    fn save_registrations(&self, map: RegistrationMap) -> BoxFuture<'static, StorageResult<()>>;

    /// Persist the full settings map.
    fn save_settings(&self, map: SettingsMap) -> BoxFuture<'static, StorageResult<()>>;
}

struct RegistryInner {
    registrations: RwLock<RegistrationMap>,
    settings: RwLock<SettingsMap>,
    store: Arc<dyn RegistryStore>,
}

/// Shared in-memory view of registrations and settings.
///
/// Reads are lock-cheap lookups; every mutation persists the affected map
/// through the store while still holding the write guard, so writers to
/// the same map are fully serialized.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

impl Registry {
    /// Load the registry from the given store.
    pub async fn load(store: Arc<dyn RegistryStore>) -> StorageResult<Self> {
        let snapshot = store.load().await?;
        Ok(Self {
            inner: Arc::new(RegistryInner {
                registrations: RwLock::new(snapshot.registrations),
                settings: RwLock::new(snapshot.settings),
                store,
            }),
        })
    }

    /// Registration for a user in a guild, if any.
    pub async fn registration(&self, tenant: GuildId, user: UserId) -> Option<RegistrationEntity> {
        let guard = self.inner.registrations.read().await;
        guard.get(&tenant).and_then(|users| users.get(&user)).cloned()
    }

    /// True when the user is registered in the guild.
    pub async fn is_registered(&self, tenant: GuildId, user: UserId) -> bool {
        let guard = self.inner.registrations.read().await;
        guard.get(&tenant).is_some_and(|users| users.contains_key(&user))
    }

    /// Insert or replace a registration and persist.
    pub async fn register(
        &self,
        tenant: GuildId,
        user: UserId,
        entity: RegistrationEntity,
    ) -> StorageResult<()> {
        let mut guard = self.inner.registrations.write().await;
        guard.entry(tenant).or_default().insert(user, entity);
        self.inner.store.save_registrations(guard.clone()).await
    }

    /// Remove a registration and persist; returns whether one existed.
    pub async fn unregister(&self, tenant: GuildId, user: UserId) -> StorageResult<bool> {
        let mut guard = self.inner.registrations.write().await;
        let Some(users) = guard.get_mut(&tenant) else {
            return Ok(false);
        };
        if users.remove(&user).is_none() {
            return Ok(false);
        }
        if users.is_empty() {
            guard.remove(&tenant);
        }
        self.inner.store.save_registrations(guard.clone()).await?;
        Ok(true)
    }

    /// Announcement channel configured for a guild, if any.
    pub async fn announce_channel(&self, tenant: GuildId) -> Option<ChannelId> {
        let guard = self.inner.settings.read().await;
        guard.get(&tenant).and_then(|settings| settings.announce_channel)
    }

    /// Set the announcement channel for a guild and persist.
    pub async fn set_announce_channel(
        &self,
        tenant: GuildId,
        channel: ChannelId,
    ) -> StorageResult<()> {
        let mut guard = self.inner.settings.write().await;
        guard.entry(tenant).or_default().announce_channel = Some(channel);
        self.inner.store.save_settings(guard.clone()).await
    }

    /// Total registrations across all guilds (health reporting).
    pub async fn registered_users(&self) -> usize {
        let guard = self.inner.registrations.read().await;
        guard.values().map(HashMap::len).sum()
    }

    /// Number of guilds with at least one registration.
    pub async fn tracked_guilds(&self) -> usize {
        let guard = self.inner.registrations.read().await;
        guard.len()
    }
}

/// Build a registration entity stamped with the current time.
pub fn new_registration(riot_name: String, riot_tag: String, region: Region) -> RegistrationEntity {
    RegistrationEntity {
        riot_name,
        riot_tag,
        region,
        registered_at: SystemTime::now(),
    }
}

/// In-memory store used by unit tests; persists nothing.
#[cfg(test)]
pub(crate) struct MemoryRegistryStore;

#[cfg(test)]
impl RegistryStore for MemoryRegistryStore {
    fn load(&self) -> BoxFuture<'static, StorageResult<RegistrySnapshot>> {
        Box::pin(async { Ok(RegistrySnapshot::default()) })
    }

    fn save_registrations(&self, _map: RegistrationMap) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn save_settings(&self, _map: SettingsMap) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
pub(crate) async fn test_registry() -> Registry {
    Registry::load(Arc::new(MemoryRegistryStore)).await.unwrap()
}
