use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::fs;
use tracing::debug;

use crate::dao::{
    models::{RegistrationMap, RegistrySnapshot, SettingsMap},
    registry::RegistryStore,
    storage::{StorageError, StorageResult},
};

const REGISTRATIONS_FILE: &str = "registrations.json";
const SETTINGS_FILE: &str = "settings.json";

/// Registry store persisting two JSON documents under a data directory.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// crash mid-save leaves the previous document intact.
#[derive(Clone)]
pub struct JsonRegistryStore {
    dir: Arc<PathBuf>,
}

impl JsonRegistryStore {
    /// Create a store rooted at `dir`. The directory is created on first
    /// save if missing.
    pub fn new(dir: PathBuf) -> Self {
        Self { dir: Arc::new(dir) }
    }

    async fn read_document<T>(path: &Path) -> StorageResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let contents = match fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(StorageError::unavailable(
                    format!("reading {}", path.display()),
                    err,
                ));
            }
        };

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|err| StorageError::corrupt(format!("parsing {}", path.display()), err))
    }

    async fn write_document<T>(dir: &Path, name: &str, value: &T) -> StorageResult<()>
    where
        T: Serialize,
    {
        fs::create_dir_all(dir)
            .await
            .map_err(|err| StorageError::unavailable(format!("creating {}", dir.display()), err))?;

        let body = serde_json::to_vec_pretty(value)
            .map_err(|err| StorageError::corrupt(format!("encoding {name}"), err))?;

        let target = dir.join(name);
        let staging = dir.join(format!("{name}.tmp"));
        fs::write(&staging, body)
            .await
            .map_err(|err| StorageError::unavailable(format!("writing {}", staging.display()), err))?;
        fs::rename(&staging, &target)
            .await
            .map_err(|err| StorageError::unavailable(format!("renaming {}", target.display()), err))?;

        debug!(path = %target.display(), "persisted registry document");
        Ok(())
    }
}

impl RegistryStore for JsonRegistryStore {
    fn load(&self) -> BoxFuture<'static, StorageResult<RegistrySnapshot>> {
        let store = self.clone();
        Box::pin(async move {
            let registrations = Self::read_document::<RegistrationMap>(
                &store.dir.join(REGISTRATIONS_FILE),
            )
            .await?
            .unwrap_or_default();
            let settings = Self::read_document::<SettingsMap>(&store.dir.join(SETTINGS_FILE))
                .await?
                .unwrap_or_default();
            Ok(RegistrySnapshot {
                registrations,
                settings,
            })
        })
    }

    fn save_registrations(&self, map: RegistrationMap) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { Self::write_document(&store.dir, REGISTRATIONS_FILE, &map).await })
    }

    fn save_settings(&self, map: SettingsMap) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { Self::write_document(&store.dir, SETTINGS_FILE, &map).await })
    }
}
