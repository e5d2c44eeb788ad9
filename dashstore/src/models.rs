use serde::{Deserialize, Serialize};

use crate::errors::DataError;

/// The actor a dashboard session is acting as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Parent,
    Franchise,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Parent => "parent",
            Role::Franchise => "franchise",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = DataError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "parent" => Ok(Role::Parent),
            "franchise" => Ok(Role::Franchise),
            "admin" => Ok(Role::Admin),
            other => Err(DataError::Validation(format!("unknown role '{other}'"))),
        }
    }
}

// --- Local-only entities ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parent {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    pub roll_number: String,
    pub name: String,
    pub grade: String,
    pub section: String,
    /// Weak reference to a [`Parent`]; empty when unknown.
    pub parent_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeRecord {
    pub id: String,
    pub student_id: String,
    pub subject: String,
    pub term: String,
    pub grade: Option<String>,
    pub score: Option<f64>,
    pub remarks: Option<String>,
}

// --- Remotely persisted entities ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: String,
    pub title: String,
    /// ISO date; empty when the backend did not supply one.
    pub date: String,
    pub venue: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    #[default]
    Image,
    Video,
}

impl MediaKind {
    /// Spelling expected by the upload endpoint.
    pub fn wire_name(&self) -> &'static str {
        match self {
            MediaKind::Image => "IMAGE",
            MediaKind::Video => "VIDEO",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMedia {
    pub id: String,
    pub kind: MediaKind,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub event_id: Option<String>,
    pub student_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnquiryType {
    Admission,
    Franchise,
    Contact,
}

impl EnquiryType {
    pub fn wire_name(&self) -> &'static str {
        match self {
            EnquiryType::Admission => "ADMISSION",
            EnquiryType::Franchise => "FRANCHISE",
            EnquiryType::Contact => "CONTACT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnquiryStatus {
    #[serde(rename = "new")]
    New,
    #[serde(rename = "in-progress", alias = "in_progress")]
    InProgress,
    #[serde(rename = "closed")]
    Closed,
}

impl EnquiryStatus {
    pub fn wire_name(&self) -> &'static str {
        match self {
            EnquiryStatus::New => "NEW",
            EnquiryStatus::InProgress => "IN_PROGRESS",
            EnquiryStatus::Closed => "CLOSED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnquiryChannel {
    Web,
    Dashboard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enquiry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: EnquiryType,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
    /// Server timestamp, passed through verbatim.
    pub created_at: String,
    pub status: EnquiryStatus,
    pub channel: EnquiryChannel,
}

// --- Mutation inputs ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventDraft {
    pub title: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub venue: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Partial event update. Absent fields keep the stored value; an empty
/// `notes` clears them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl EventPatch {
    pub fn merge_onto(self, current: &EventRecord) -> EventDraft {
        EventDraft {
            title: self.title.unwrap_or_else(|| current.title.clone()),
            date: self.date.unwrap_or_else(|| current.date.clone()),
            end_date: self.end_date,
            venue: self.venue.unwrap_or_else(|| current.venue.clone()),
            notes: self.notes.or_else(|| current.notes.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnquirySubmission {
    #[serde(rename = "type")]
    pub kind: EnquiryType,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub message: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub child_age: Option<String>,
    #[serde(default)]
    pub franchise_slug: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParentInput {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

/// Upsert input for a student. Empty fields leave the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentInput {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub roll_number: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub grade: String,
    #[serde(default)]
    pub section: String,
    #[serde(default)]
    pub parent_id: String,
}

/// One row of a bulk grade import.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GradeRow {
    #[serde(default)]
    pub roll_number: String,
    #[serde(default)]
    pub student_name: String,
    #[serde(default)]
    pub grade_level: String,
    #[serde(default)]
    pub section: String,
    #[serde(default)]
    pub parent_id: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub term: String,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkImportSummary {
    pub inserted: usize,
    pub skipped: usize,
}
