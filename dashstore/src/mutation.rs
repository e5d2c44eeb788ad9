use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use crate::backend::PortalBackend;
use crate::errors::{DataError, Result};
use crate::models::{
    BulkImportSummary, Enquiry, EnquiryStatus, EnquirySubmission, EventDraft, EventMedia,
    EventPatch, EventRecord, GradeRecord, GradeRow, MediaKind, Parent, ParentInput, Role,
    Student, StudentInput,
};
use crate::store::SharedStore;
use crate::sync::{collections_for, Collection};
use crate::upload::{MediaSource, UploadAdapter};

const FRANCHISE_ONLY: &[Role] = &[Role::Franchise];
const STAFF: &[Role] = &[Role::Admin, Role::Franchise];

/// Every mutating operation, keyed for the authorization table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CreateEvent,
    UpdateEvent,
    DeleteEvent,
    CreateEventMedia,
    CreateEnquiry,
    UpdateEnquiryStatus,
    AddParent,
    UpsertStudent,
    AddGradesBulk,
}

impl Operation {
    pub fn describe(&self) -> &'static str {
        match self {
            Operation::CreateEvent => "create events",
            Operation::UpdateEvent => "update events",
            Operation::DeleteEvent => "delete events",
            Operation::CreateEventMedia => "upload event media",
            Operation::CreateEnquiry => "submit enquiries",
            Operation::UpdateEnquiryStatus => "change enquiry status",
            Operation::AddParent => "add parents",
            Operation::UpsertStudent => "edit students",
            Operation::AddGradesBulk => "import grades",
        }
    }

    /// `None` means the operation is open to everyone, signed in or not.
    pub fn allowed_roles(&self) -> Option<&'static [Role]> {
        match self {
            Operation::CreateEvent
            | Operation::UpdateEvent
            | Operation::DeleteEvent
            | Operation::CreateEventMedia => Some(FRANCHISE_ONLY),
            Operation::CreateEnquiry => None,
            Operation::UpdateEnquiryStatus
            | Operation::AddParent
            | Operation::UpsertStudent
            | Operation::AddGradesBulk => Some(STAFF),
        }
    }
}

pub fn authorize(operation: Operation, role: Option<Role>) -> Result<()> {
    let Some(allowed) = operation.allowed_roles() else {
        return Ok(());
    };
    match role {
        Some(role) if allowed.contains(&role) => Ok(()),
        Some(role) => Err(DataError::Authorization(format!(
            "the {role} role cannot {}",
            operation.describe()
        ))),
        None => Err(DataError::Authorization(format!(
            "sign in to {}",
            operation.describe()
        ))),
    }
}

/// Serializes mutations that target the same entity.
#[derive(Default)]
struct EntityLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl EntityLocks {
    async fn acquire(&self, key: String) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(key).or_default())
        };
        lock.lock_owned().await
    }
}

/// Create/update/delete against the backend, reconciled into the store only
/// after the backend call succeeds. A failed call leaves the store untouched.
pub struct MutationPipeline {
    backend: Arc<dyn PortalBackend>,
    store: SharedStore,
    uploads: UploadAdapter,
    locks: EntityLocks,
}

impl MutationPipeline {
    pub fn new(
        backend: Arc<dyn PortalBackend>,
        store: SharedStore,
        uploads: UploadAdapter,
    ) -> Self {
        Self {
            backend,
            store,
            uploads,
            locks: EntityLocks::default(),
        }
    }

    fn require_event(&self, id: &str) -> Result<()> {
        if self.store.view(|store| store.event(id).is_some()) {
            Ok(())
        } else {
            Err(DataError::NotFound(format!("event '{id}'")))
        }
    }

    fn require_enquiry(&self, id: &str) -> Result<()> {
        if self.store.view(|store| store.enquiry(id).is_some()) {
            Ok(())
        } else {
            Err(DataError::NotFound(format!("enquiry '{id}'")))
        }
    }

    pub async fn create_event(&self, role: Option<Role>, draft: EventDraft) -> Result<EventRecord> {
        authorize(Operation::CreateEvent, role)?;
        validate_event(&draft)?;

        let bundle = self.backend.create_event(&draft).await?;
        let event = bundle.event.clone();
        self.store
            .update(|store| store.prepend_event(bundle.event, bundle.media));
        log::info!("Created event '{}'", event.id);
        Ok(event)
    }

    pub async fn update_event(
        &self,
        role: Option<Role>,
        id: &str,
        draft: EventDraft,
    ) -> Result<EventRecord> {
        authorize(Operation::UpdateEvent, role)?;
        validate_event(&draft)?;
        let _guard = self.locks.acquire(format!("event:{id}")).await;
        self.require_event(id)?;

        let bundle = self.backend.update_event(id, &draft).await?;
        let event = bundle.event;
        if self.store.update(|store| store.replace_event(event.clone())) {
            log::info!("Updated event '{}'", event.id);
        } else {
            log::warn!("Updated event '{}' is no longer in the store", event.id);
        }
        Ok(event)
    }

    /// Applies a partial update on top of the stored record, then runs
    /// the regular update.
    pub async fn patch_event(
        &self,
        role: Option<Role>,
        id: &str,
        patch: EventPatch,
    ) -> Result<EventRecord> {
        authorize(Operation::UpdateEvent, role)?;
        let current = self
            .store
            .view(|store| store.event(id).cloned())
            .ok_or_else(|| DataError::NotFound(format!("event '{id}'")))?;
        self.update_event(role, id, patch.merge_onto(&current)).await
    }

    pub async fn delete_event(&self, role: Option<Role>, id: &str) -> Result<()> {
        authorize(Operation::DeleteEvent, role)?;
        let _guard = self.locks.acquire(format!("event:{id}")).await;
        self.require_event(id)?;

        self.backend.delete_event(id).await?;
        let removed_media = self.store.update(|store| store.remove_event(id));
        log::info!("Deleted event '{id}' and {removed_media} media items");
        Ok(())
    }

    pub async fn create_event_media(
        &self,
        role: Option<Role>,
        event_id: Option<&str>,
        source: MediaSource,
        kind: MediaKind,
        caption: Option<String>,
    ) -> Result<EventMedia> {
        authorize(Operation::CreateEventMedia, role)?;
        source.ensure_present()?;
        let event_id = event_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| DataError::NotFound("no event selected for this media".to_string()))?;
        let _guard = self.locks.acquire(format!("event:{event_id}")).await;
        self.require_event(event_id)?;

        let upload = self.uploads.prepare(source, kind, caption).await?;
        let mut media = self.backend.upload_event_media(event_id, upload).await?;
        if media.event_id.as_deref().is_none_or(str::is_empty) {
            media.event_id = Some(event_id.to_string());
        }
        self.store.update(|store| store.prepend_media(media.clone()));
        log::info!("Uploaded media '{}' for event '{event_id}'", media.id);
        Ok(media)
    }

    pub async fn create_enquiry(
        &self,
        role: Option<Role>,
        submission: EnquirySubmission,
    ) -> Result<Enquiry> {
        authorize(Operation::CreateEnquiry, role)?;
        validate_enquiry(&submission)?;

        let enquiry = self.backend.submit_enquiry(&submission).await?;
        let visible = role
            .map(|role| collections_for(role).contains(&Collection::Enquiries))
            .unwrap_or(false);
        if visible {
            self.store.update(|store| store.prepend_enquiry(enquiry.clone()));
        }
        log::info!("Submitted enquiry '{}'", enquiry.id);
        Ok(enquiry)
    }

    pub async fn update_enquiry_status(
        &self,
        role: Option<Role>,
        id: &str,
        status: EnquiryStatus,
    ) -> Result<Enquiry> {
        authorize(Operation::UpdateEnquiryStatus, role)?;
        let scope = role.ok_or_else(|| DataError::Authorization("sign in first".to_string()))?;
        let _guard = self.locks.acquire(format!("enquiry:{id}")).await;
        self.require_enquiry(id)?;

        let enquiry = self.backend.update_enquiry_status(scope, id, status).await?;
        if !self.store.update(|store| store.replace_enquiry(enquiry.clone())) {
            log::warn!("Enquiry '{id}' left the store while its status changed");
        }
        log::info!("Enquiry '{id}' moved to {:?}", enquiry.status);
        Ok(enquiry)
    }

    // --- Session-local mutations ---

    pub fn add_parent(&self, role: Option<Role>, input: ParentInput) -> Result<Parent> {
        authorize(Operation::AddParent, role)?;
        let name = input.name.trim();
        if name.is_empty() {
            return Err(DataError::Validation("parent name is required".to_string()));
        }
        let parent = Parent {
            id: input
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            name: name.to_string(),
            email: input.email.trim().to_string(),
            phone: input.phone.trim().to_string(),
        };
        if !self.store.update(|store| store.push_parent(parent.clone())) {
            return Err(DataError::Validation(format!(
                "parent '{}' already exists",
                parent.id
            )));
        }
        Ok(parent)
    }

    pub fn upsert_student(&self, role: Option<Role>, input: StudentInput) -> Result<Student> {
        authorize(Operation::UpsertStudent, role)?;
        let has_key = !input.roll_number.trim().is_empty()
            || input.id.as_deref().is_some_and(|id| !id.trim().is_empty());
        if !has_key {
            return Err(DataError::Validation(
                "a roll number or student id is required".to_string(),
            ));
        }
        Ok(self.store.update(|store| store.upsert_student(input)))
    }

    /// Imports grade rows in one pass. Rows without a roll number, subject or
    /// term are skipped; `inserted + skipped` always equals `rows.len()`.
    pub fn add_grades_bulk(
        &self,
        role: Option<Role>,
        rows: Vec<GradeRow>,
    ) -> Result<BulkImportSummary> {
        authorize(Operation::AddGradesBulk, role)?;
        let summary = self.store.update(|store| {
            let mut summary = BulkImportSummary::default();
            for row in rows {
                let roll_number = row.roll_number.trim();
                let subject = row.subject.trim();
                let term = row.term.trim();
                if roll_number.is_empty() || subject.is_empty() || term.is_empty() {
                    summary.skipped += 1;
                    continue;
                }

                let student = store.upsert_student(StudentInput {
                    id: None,
                    roll_number: roll_number.to_string(),
                    name: row.student_name.clone(),
                    grade: row.grade_level.clone(),
                    section: row.section.clone(),
                    parent_id: row.parent_id.clone(),
                });
                store.push_grade(GradeRecord {
                    id: Uuid::new_v4().to_string(),
                    student_id: student.id,
                    subject: subject.to_string(),
                    term: term.to_string(),
                    grade: row.grade.filter(|grade| !grade.trim().is_empty()),
                    score: row.score,
                    remarks: row.remarks.filter(|remarks| !remarks.trim().is_empty()),
                });
                summary.inserted += 1;
            }
            summary
        });
        log::info!(
            "Grade import: {} inserted, {} skipped",
            summary.inserted,
            summary.skipped
        );
        Ok(summary)
    }
}

fn validate_event(draft: &EventDraft) -> Result<()> {
    if draft.title.trim().is_empty() {
        return Err(DataError::Validation("event title is required".to_string()));
    }
    Ok(())
}

fn validate_enquiry(submission: &EnquirySubmission) -> Result<()> {
    let missing: Vec<&str> = [
        ("name", submission.name.as_str()),
        ("email", submission.email.as_str()),
        ("message", submission.message.as_str()),
    ]
    .into_iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(field, _)| field)
    .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(DataError::Validation(format!(
            "missing {}",
            missing.join(", ")
        )))
    }
}
