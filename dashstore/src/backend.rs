use async_trait::async_trait;

use crate::errors::Result;
use crate::models::{
    Enquiry, EnquiryStatus, EnquirySubmission, EventDraft, EventMedia, EventRecord, MediaKind,
    Role,
};

/// An event as returned by the backend, together with the media it embeds.
#[derive(Debug, Clone, PartialEq)]
pub struct EventBundle {
    pub event: EventRecord,
    pub media: Vec<EventMedia>,
}

impl EventBundle {
    pub fn new(event: EventRecord) -> Self {
        Self {
            event,
            media: Vec::new(),
        }
    }
}

/// A file ready to be posted as a multipart media upload.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    pub kind: MediaKind,
    pub caption: Option<String>,
}

/// Raw result of fetching a remote resource.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteBlob {
    pub status: u16,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl RemoteBlob {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The remote REST backend, already speaking domain types.
///
/// Implementations own the wire format: every DTO is mapped before it
/// crosses this boundary in either direction.
#[async_trait]
pub trait PortalBackend: Send + Sync {
    async fn list_events(&self, scope: Role) -> Result<Vec<EventBundle>>;

    async fn create_event(&self, draft: &EventDraft) -> Result<EventBundle>;

    async fn update_event(&self, id: &str, draft: &EventDraft) -> Result<EventBundle>;

    async fn delete_event(&self, id: &str) -> Result<()>;

    async fn upload_event_media(&self, event_id: &str, upload: MediaUpload) -> Result<EventMedia>;

    async fn list_enquiries(&self, scope: Role) -> Result<Vec<Enquiry>>;

    async fn submit_enquiry(&self, submission: &EnquirySubmission) -> Result<Enquiry>;

    async fn update_enquiry_status(
        &self,
        scope: Role,
        id: &str,
        status: EnquiryStatus,
    ) -> Result<Enquiry>;
}

/// Fetches arbitrary URLs for the upload adapter.
///
/// A non-success status is returned as data, not as an error; transport
/// failures are errors.
#[async_trait]
pub trait BlobFetcher: Send + Sync {
    async fn fetch_blob(&self, url: &str) -> Result<RemoteBlob>;
}
