use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde::Serialize;

use crate::backend::PortalBackend;
use crate::models::{Enquiry, EventMedia, EventRecord, Role};
use crate::store::{EntityStore, SharedStore};

/// A remotely synced collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    /// Events together with the media they embed.
    Events,
    Enquiries,
}

/// Which collections each role loads. Students, grades and parents are
/// session-local and never appear here.
pub const SYNC_PLAN: &[(Role, &[Collection])] = &[
    (Role::Parent, &[Collection::Events]),
    (Role::Franchise, &[Collection::Events, Collection::Enquiries]),
    (Role::Admin, &[Collection::Enquiries]),
];

const ALL_COLLECTIONS: &[Collection] = &[Collection::Events, Collection::Enquiries];

pub fn collections_for(role: Role) -> &'static [Collection] {
    SYNC_PLAN
        .iter()
        .find(|(planned, _)| *planned == role)
        .map(|(_, collections)| *collections)
        .unwrap_or(&[])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "role", rename_all = "snake_case")]
pub enum SyncState {
    Unauthenticated,
    Loading(Role),
    Loaded(Role),
    Failed(Role),
}

/// Role-conditioned initial load.
///
/// Read failures are soft: the affected collection is cleared and the
/// failure is only visible through [`SyncState::Failed`].
pub struct SyncEngine {
    backend: Arc<dyn PortalBackend>,
    store: SharedStore,
    state: RwLock<SyncState>,
    /// Bumped by every [`SyncEngine::load`]; only the newest load may write.
    generation: AtomicU64,
}

impl SyncEngine {
    pub fn new(backend: Arc<dyn PortalBackend>, store: SharedStore) -> Self {
        Self {
            backend,
            store,
            state: RwLock::new(SyncState::Unauthenticated),
            generation: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> SyncState {
        *self
            .state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_state(&self, state: SyncState) {
        *self
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = state;
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Repopulates the store for `role`. Requests are never cancelled, but a
    /// load overtaken by a newer one discards its results and leaves the
    /// state alone.
    pub async fn load(&self, role: Option<Role>) -> SyncState {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let Some(role) = role else {
            self.store.update(|store| store.clear_all());
            self.set_state(SyncState::Unauthenticated);
            log::info!("Sync: session unauthenticated, store cleared");
            return SyncState::Unauthenticated;
        };

        self.set_state(SyncState::Loading(role));
        let planned = collections_for(role);
        log::info!("Sync: loading {:?} for role '{}'", planned, role);

        self.store.update(|store| {
            for collection in ALL_COLLECTIONS.iter().filter(|c| !planned.contains(*c)) {
                clear_collection(store, *collection);
            }
        });

        let mut failed = false;
        for collection in planned {
            if !self.load_collection(generation, role, *collection).await {
                failed = true;
            }
        }

        if !self.is_current(generation) {
            log::debug!("Sync: load for role '{role}' superseded, keeping newer state");
            return self.state();
        }
        let state = if failed {
            SyncState::Failed(role)
        } else {
            SyncState::Loaded(role)
        };
        self.set_state(state);
        state
    }

    async fn load_collection(&self, generation: u64, role: Role, collection: Collection) -> bool {
        let loaded = match collection {
            Collection::Events => self.backend.list_events(role).await.map(|bundles| {
                let mut events = Vec::with_capacity(bundles.len());
                let mut media = Vec::new();
                for bundle in bundles {
                    events.push(bundle.event);
                    media.extend(bundle.media);
                }
                Loaded::Events(events, media)
            }),
            Collection::Enquiries => self
                .backend
                .list_enquiries(role)
                .await
                .map(Loaded::Enquiries),
        };

        // Checked under the store lock: a newer load bumps the generation
        // before its first write.
        let ok = loaded.is_ok();
        let applied = self.store.update(|store| {
            if !self.is_current(generation) {
                return false;
            }
            match loaded {
                Ok(Loaded::Events(events, media)) => {
                    log::info!(
                        "Sync: loaded {} events and {} media items",
                        events.len(),
                        media.len()
                    );
                    store.replace_events(events, media);
                }
                Ok(Loaded::Enquiries(enquiries)) => {
                    log::info!("Sync: loaded {} enquiries", enquiries.len());
                    store.replace_enquiries(enquiries);
                }
                Err(err) => {
                    log::warn!("Sync: {collection:?} load failed for '{role}', clearing: {err}");
                    clear_collection(store, collection);
                }
            }
            true
        });
        if !applied {
            log::debug!("Sync: dropping stale {collection:?} result for '{role}'");
        }
        ok
    }
}

enum Loaded {
    Events(Vec<EventRecord>, Vec<EventMedia>),
    Enquiries(Vec<Enquiry>),
}

fn clear_collection(store: &mut EntityStore, collection: Collection) {
    match collection {
        Collection::Events => store.clear_events(),
        Collection::Enquiries => store.clear_enquiries(),
    }
}
