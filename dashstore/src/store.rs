use std::collections::HashSet;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use uuid::Uuid;

use crate::models::{
    Enquiry, EventMedia, EventRecord, GradeRecord, Parent, Student, StudentInput,
};

/// In-memory collections for one dashboard session.
///
/// Reads are open to everyone. Writes are crate-private: only the sync engine
/// (bulk replace) and the mutation pipeline (incremental merge) touch them.
#[derive(Debug, Default, Clone)]
pub struct EntityStore {
    parents: Vec<Parent>,
    students: Vec<Student>,
    grades: Vec<GradeRecord>,
    events: Vec<EventRecord>,
    event_media: Vec<EventMedia>,
    enquiries: Vec<Enquiry>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CollectionCounts {
    pub parents: usize,
    pub students: usize,
    pub grades: usize,
    pub events: usize,
    pub event_media: usize,
    pub enquiries: usize,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parents(&self) -> &[Parent] {
        &self.parents
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn grades(&self) -> &[GradeRecord] {
        &self.grades
    }

    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }

    pub fn event_media(&self) -> &[EventMedia] {
        &self.event_media
    }

    pub fn enquiries(&self) -> &[Enquiry] {
        &self.enquiries
    }

    pub fn counts(&self) -> CollectionCounts {
        CollectionCounts {
            parents: self.parents.len(),
            students: self.students.len(),
            grades: self.grades.len(),
            events: self.events.len(),
            event_media: self.event_media.len(),
            enquiries: self.enquiries.len(),
        }
    }

    pub fn event(&self, id: &str) -> Option<&EventRecord> {
        self.events.iter().find(|event| event.id == id)
    }

    pub fn enquiry(&self, id: &str) -> Option<&Enquiry> {
        self.enquiries.iter().find(|enquiry| enquiry.id == id)
    }

    pub fn student_by_roll_number(&self, roll_number: &str) -> Option<&Student> {
        self.students
            .iter()
            .find(|student| student.roll_number == roll_number)
    }

    pub fn grades_for_student(&self, student_id: &str) -> Vec<&GradeRecord> {
        self.grades
            .iter()
            .filter(|grade| grade.student_id == student_id)
            .collect()
    }

    pub fn media_for_event(&self, event_id: &str) -> Vec<&EventMedia> {
        self.event_media
            .iter()
            .filter(|media| media.event_id.as_deref() == Some(event_id))
            .collect()
    }

    // --- Derived queries ---

    pub fn students_for_parent(&self, parent_id: &str) -> Vec<&Student> {
        self.students
            .iter()
            .filter(|student| student.parent_id == parent_id)
            .collect()
    }

    pub fn grades_for_parent(&self, parent_id: &str) -> Vec<&GradeRecord> {
        let student_ids: HashSet<&str> = self
            .students_for_parent(parent_id)
            .into_iter()
            .map(|student| student.id.as_str())
            .collect();
        self.grades
            .iter()
            .filter(|grade| student_ids.contains(grade.student_id.as_str()))
            .collect()
    }

    /// Media not bound to a student is visible to every parent; student-bound
    /// media only to that student's parent.
    pub fn event_media_for_parent(&self, parent_id: &str) -> Vec<&EventMedia> {
        let student_ids: HashSet<&str> = self
            .students_for_parent(parent_id)
            .into_iter()
            .map(|student| student.id.as_str())
            .collect();
        self.event_media
            .iter()
            .filter(|media| match media.student_id.as_deref() {
                None | Some("") => true,
                Some(student_id) => student_ids.contains(student_id),
            })
            .collect()
    }

    // --- Bulk replace (sync engine) ---

    pub(crate) fn replace_events(&mut self, events: Vec<EventRecord>, media: Vec<EventMedia>) {
        self.events = events;
        self.event_media = media;
    }

    pub(crate) fn clear_events(&mut self) {
        self.events.clear();
        self.event_media.clear();
    }

    pub(crate) fn replace_enquiries(&mut self, enquiries: Vec<Enquiry>) {
        self.enquiries = enquiries;
    }

    pub(crate) fn clear_enquiries(&mut self) {
        self.enquiries.clear();
    }

    pub(crate) fn clear_all(&mut self) {
        *self = Self::default();
    }

    // --- Incremental merge (mutation pipeline) ---

    pub(crate) fn prepend_event(&mut self, event: EventRecord, media: Vec<EventMedia>) {
        self.events.insert(0, event);
        for item in media.into_iter().rev() {
            self.event_media.insert(0, item);
        }
    }

    /// Replaces the event in place. An event that has left the store since
    /// the request was issued stays gone; returns whether a slot matched.
    pub(crate) fn replace_event(&mut self, event: EventRecord) -> bool {
        match self.events.iter_mut().find(|existing| existing.id == event.id) {
            Some(slot) => {
                *slot = event;
                true
            }
            None => false,
        }
    }

    /// Removes the event and every media item that references it.
    /// Returns the number of media items removed.
    pub(crate) fn remove_event(&mut self, id: &str) -> usize {
        self.events.retain(|event| event.id != id);
        let before = self.event_media.len();
        self.event_media
            .retain(|media| media.event_id.as_deref() != Some(id));
        before - self.event_media.len()
    }

    pub(crate) fn prepend_media(&mut self, media: EventMedia) {
        self.event_media.insert(0, media);
    }

    pub(crate) fn prepend_enquiry(&mut self, enquiry: Enquiry) {
        self.enquiries.insert(0, enquiry);
    }

    pub(crate) fn replace_enquiry(&mut self, enquiry: Enquiry) -> bool {
        match self
            .enquiries
            .iter_mut()
            .find(|existing| existing.id == enquiry.id)
        {
            Some(slot) => {
                *slot = enquiry;
                true
            }
            None => false,
        }
    }

    /// Appends the parent unless one with the same id is already stored.
    pub(crate) fn push_parent(&mut self, parent: Parent) -> bool {
        if self.parents.iter().any(|existing| existing.id == parent.id) {
            return false;
        }
        self.parents.push(parent);
        true
    }

    pub(crate) fn push_grade(&mut self, grade: GradeRecord) {
        self.grades.push(grade);
    }

    /// The single upsert rule for students: match on roll number first, then
    /// on the surrogate id, otherwise insert with a generated id. Empty input
    /// fields keep whatever the matched record already holds.
    pub(crate) fn upsert_student(&mut self, input: StudentInput) -> Student {
        let roll_number = input.roll_number.trim().to_string();
        let by_roll = (!roll_number.is_empty())
            .then(|| {
                self.students
                    .iter()
                    .position(|student| student.roll_number == roll_number)
            })
            .flatten();
        let position = by_roll.or_else(|| {
            input
                .id
                .as_deref()
                .filter(|id| !id.is_empty())
                .and_then(|id| self.students.iter().position(|student| student.id == id))
        });

        match position {
            Some(idx) => {
                let student = &mut self.students[idx];
                if !roll_number.is_empty() {
                    student.roll_number = roll_number;
                }
                keep_or_replace(&mut student.name, input.name);
                keep_or_replace(&mut student.grade, input.grade);
                keep_or_replace(&mut student.section, input.section);
                keep_or_replace(&mut student.parent_id, input.parent_id);
                student.clone()
            }
            None => {
                let name = non_empty(input.name).unwrap_or_else(|| roll_number.clone());
                let student = Student {
                    id: input
                        .id
                        .filter(|id| !id.is_empty())
                        .unwrap_or_else(|| Uuid::new_v4().to_string()),
                    roll_number,
                    name,
                    grade: input.grade.trim().to_string(),
                    section: input.section.trim().to_string(),
                    parent_id: input.parent_id.trim().to_string(),
                };
                self.students.push(student.clone());
                student
            }
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn keep_or_replace(slot: &mut String, incoming: String) {
    if let Some(value) = non_empty(incoming) {
        *slot = value;
    }
}

/// Cloneable handle to one session's [`EntityStore`].
///
/// Accessors hand out owned copies so no lock is held across an `.await`.
#[derive(Debug, Default, Clone)]
pub struct SharedStore {
    inner: Arc<RwLock<EntityStore>>,
}

impl SharedStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, EntityStore> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, EntityStore> {
        self.inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Runs a read-only closure against the current state.
    pub fn view<R>(&self, f: impl FnOnce(&EntityStore) -> R) -> R {
        f(&self.read())
    }

    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut EntityStore) -> R) -> R {
        f(&mut self.write())
    }

    pub fn snapshot(&self) -> EntityStore {
        self.read().clone()
    }

    pub fn counts(&self) -> CollectionCounts {
        self.read().counts()
    }

    pub fn events(&self) -> Vec<EventRecord> {
        self.read().events().to_vec()
    }

    pub fn event_media(&self) -> Vec<EventMedia> {
        self.read().event_media().to_vec()
    }

    pub fn enquiries(&self) -> Vec<Enquiry> {
        self.read().enquiries().to_vec()
    }

    pub fn parents(&self) -> Vec<Parent> {
        self.read().parents().to_vec()
    }

    pub fn students(&self) -> Vec<Student> {
        self.read().students().to_vec()
    }

    pub fn grades(&self) -> Vec<GradeRecord> {
        self.read().grades().to_vec()
    }

    pub fn students_for_parent(&self, parent_id: &str) -> Vec<Student> {
        self.read()
            .students_for_parent(parent_id)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn grades_for_parent(&self, parent_id: &str) -> Vec<GradeRecord> {
        self.read()
            .grades_for_parent(parent_id)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn event_media_for_parent(&self, parent_id: &str) -> Vec<EventMedia> {
        self.read()
            .event_media_for_parent(parent_id)
            .into_iter()
            .cloned()
            .collect()
    }
}
