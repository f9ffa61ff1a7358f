//! Tracker state (sessions, groups, ledger) and the shared application
//! state handed to routes.

pub mod activity;
pub mod groups;
pub mod ids;
pub mod ledger;

use std::sync::Arc;

use crate::{dao::registry::Registry, dao::valorant::MatchSource, services::engine::EngineHandle};

/// Shared application state wrapped in an [`Arc`].
pub type SharedState = Arc<AppState>;

/// Everything the HTTP surface needs: the registry view, the engine
/// handle for signal ingestion, and the provider client for on-demand
/// queries. Tracker state itself is owned by the engine task.
pub struct AppState {
    registry: Registry,
    engine: EngineHandle,
    match_source: Arc<dyn MatchSource>,
}

impl AppState {
    /// Assemble the shared state.
    pub fn new(
        registry: Registry,
        engine: EngineHandle,
        match_source: Arc<dyn MatchSource>,
    ) -> SharedState {
        Arc::new(Self {
            registry,
            engine,
            match_source,
        })
    }

    /// Registration and settings view.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Handle for submitting activity signals.
    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    /// Match-data provider client.
    pub fn match_source(&self) -> &Arc<dyn MatchSource> {
        &self.match_source
    }
}
