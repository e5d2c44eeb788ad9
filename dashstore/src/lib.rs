pub mod backend;
pub mod config;
pub mod errors;
pub mod models;
pub mod mutation;
pub mod store;
pub mod sync;
pub mod upload;

use std::sync::{Arc, RwLock};

use serde::Serialize;

use crate::backend::{BlobFetcher, PortalBackend};
use crate::errors::Result;
use crate::models::{
    BulkImportSummary, Enquiry, EnquiryStatus, EnquirySubmission, EventDraft, EventMedia,
    EventPatch, EventRecord, GradeRow, MediaKind, Parent, ParentInput, Role, Student,
    StudentInput,
};
use crate::mutation::MutationPipeline;
use crate::store::{CollectionCounts, SharedStore};
use crate::sync::{SyncEngine, SyncState};
use crate::upload::{MediaSource, UploadAdapter};

/// The data layer behind one dashboard session.
///
/// `PortalSession` owns:
/// - a [`SharedStore`] holding parents, students, grades, events, event media
///   and enquiries,
/// - a [`SyncEngine`] that repopulates the remote collections whenever the
///   acting role changes,
/// - a [`MutationPipeline`] that round-trips writes through the backend before
///   merging them into the store.
///
/// Collaborators are injected, so tests can build isolated sessions over mock
/// backends.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use dashstore::{PortalSession, backend::{BlobFetcher, PortalBackend}, models::Role};
///
/// async fn open(backend: Arc<dyn PortalBackend>, blobs: Arc<dyn BlobFetcher>) {
///     let session = PortalSession::new(backend, blobs);
///     session.set_role(Some(Role::Franchise)).await;
///     println!("{} events", session.store().events().len());
/// }
/// ```
pub struct PortalSession {
    store: SharedStore,
    sync: SyncEngine,
    mutations: MutationPipeline,
    role: RwLock<Option<Role>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub role: Option<Role>,
    pub sync: SyncState,
    pub counts: CollectionCounts,
}

impl PortalSession {
    pub fn new(backend: Arc<dyn PortalBackend>, blobs: Arc<dyn BlobFetcher>) -> Self {
        let store = SharedStore::new();
        let sync = SyncEngine::new(Arc::clone(&backend), store.clone());
        let mutations = MutationPipeline::new(backend, store.clone(), UploadAdapter::new(blobs));
        Self {
            store,
            sync,
            mutations,
            role: RwLock::new(None),
        }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn mutations(&self) -> &MutationPipeline {
        &self.mutations
    }

    pub fn role(&self) -> Option<Role> {
        *self
            .role
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn sync_state(&self) -> SyncState {
        self.sync.state()
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            role: self.role(),
            sync: self.sync.state(),
            counts: self.store.counts(),
        }
    }

    /// Switches the acting role and runs the sync engine if it changed.
    pub async fn set_role(&self, role: Option<Role>) -> SyncState {
        let previous = {
            let mut current = self
                .role
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            std::mem::replace(&mut *current, role)
        };
        if previous == role && self.sync.state() != SyncState::Unauthenticated {
            return self.sync.state();
        }
        self.sync.load(role).await
    }

    /// Re-runs the sync plan for the current role.
    pub async fn refresh(&self) -> SyncState {
        self.sync.load(self.role()).await
    }

    pub async fn create_event(&self, draft: EventDraft) -> Result<EventRecord> {
        self.mutations.create_event(self.role(), draft).await
    }

    pub async fn update_event(&self, id: &str, draft: EventDraft) -> Result<EventRecord> {
        self.mutations.update_event(self.role(), id, draft).await
    }

    pub async fn patch_event(&self, id: &str, patch: EventPatch) -> Result<EventRecord> {
        self.mutations.patch_event(self.role(), id, patch).await
    }

    pub async fn delete_event(&self, id: &str) -> Result<()> {
        self.mutations.delete_event(self.role(), id).await
    }

    pub async fn create_event_media(
        &self,
        event_id: Option<&str>,
        source: MediaSource,
        kind: MediaKind,
        caption: Option<String>,
    ) -> Result<EventMedia> {
        self.mutations
            .create_event_media(self.role(), event_id, source, kind, caption)
            .await
    }

    pub async fn create_enquiry(&self, submission: EnquirySubmission) -> Result<Enquiry> {
        self.mutations.create_enquiry(self.role(), submission).await
    }

    pub async fn update_enquiry_status(&self, id: &str, status: EnquiryStatus) -> Result<Enquiry> {
        self.mutations
            .update_enquiry_status(self.role(), id, status)
            .await
    }

    pub fn add_parent(&self, input: ParentInput) -> Result<Parent> {
        self.mutations.add_parent(self.role(), input)
    }

    pub fn upsert_student(&self, input: StudentInput) -> Result<Student> {
        self.mutations.upsert_student(self.role(), input)
    }

    pub fn add_grades_bulk(&self, rows: Vec<GradeRow>) -> Result<BulkImportSummary> {
        self.mutations.add_grades_bulk(self.role(), rows)
    }
}
