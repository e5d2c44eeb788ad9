#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashstore::{
    backend::{BlobFetcher, EventBundle, MediaUpload, PortalBackend, RemoteBlob},
    errors::{DataError, Result},
    models::{
        Enquiry, EnquiryChannel, EnquiryStatus, EnquirySubmission, EnquiryType, EventDraft,
        EventMedia, EventRecord, MediaKind, Role,
    },
    PortalSession,
};
use tokio::sync::{Mutex, Notify};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn event(id: &str, title: &str) -> EventRecord {
    EventRecord {
        id: id.into(),
        title: title.into(),
        date: "2024-06-01".into(),
        venue: "Main hall".into(),
        notes: None,
    }
}

pub fn media(id: &str, event_id: &str) -> EventMedia {
    EventMedia {
        id: id.into(),
        kind: MediaKind::Image,
        title: format!("Photo {id}"),
        url: format!("https://cdn.example/media/{id}.png"),
        description: None,
        event_id: Some(event_id.into()),
        student_id: None,
    }
}

pub fn enquiry(id: &str, status: EnquiryStatus) -> Enquiry {
    Enquiry {
        id: id.into(),
        kind: EnquiryType::Admission,
        name: "Asha".into(),
        email: "asha@example.com".into(),
        phone: None,
        message: "Seats for next term?".into(),
        created_at: "2024-05-01T10:00:00Z".into(),
        status,
        channel: EnquiryChannel::Web,
    }
}

pub fn submission() -> EnquirySubmission {
    EnquirySubmission {
        kind: EnquiryType::Contact,
        name: "Ravi".into(),
        email: "ravi@example.com".into(),
        phone: Some("555-0100".into()),
        message: "Please call me".into(),
        city: Some("Pune".into()),
        child_age: None,
        franchise_slug: None,
    }
}

pub fn draft(title: &str) -> EventDraft {
    EventDraft {
        title: title.into(),
        date: "2024-07-01".into(),
        end_date: None,
        venue: "Playground".into(),
        notes: Some("Bring water".into()),
    }
}

/// In-memory stand-in for the REST backend.
#[derive(Default)]
pub struct MockBackend {
    pub events: Mutex<Vec<EventBundle>>,
    pub enquiries: Mutex<Vec<Enquiry>>,
    pub calls: Mutex<Vec<String>>,
    pub fail_events: AtomicBool,
    pub fail_enquiries: AtomicBool,
    pub fail_writes: AtomicBool,
    /// When set, `list_enquiries` parks on `gate` after recording its call.
    pub hold_enquiries: AtomicBool,
    /// When set, `update_event` parks on `gate` after recording its call.
    pub hold_updates: AtomicBool,
    pub gate: Notify,
    next_id: AtomicUsize,
}

impl MockBackend {
    pub fn with_data(events: Vec<EventBundle>, enquiries: Vec<Enquiry>) -> Self {
        Self {
            events: Mutex::new(events),
            enquiries: Mutex::new(enquiries),
            ..Default::default()
        }
    }

    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    pub async fn clear_calls(&self) {
        self.calls.lock().await.clear();
    }

    /// Lets one parked call continue.
    pub fn release(&self) {
        self.gate.notify_one();
    }

    pub async fn wait_for_call(&self, call: &str) {
        while !self.calls().await.iter().any(|c| c == call) {
            tokio::task::yield_now().await;
        }
    }

    pub async fn wait_for_calls(&self, count: usize) {
        while self.calls().await.len() < count {
            tokio::task::yield_now().await;
        }
    }

    async fn hold(&self, flag: &AtomicBool) {
        if flag.load(Ordering::SeqCst) {
            self.gate.notified().await;
        }
    }

    async fn record(&self, call: String) {
        self.calls.lock().await.push(call);
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{prefix}-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn write_guard(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(DataError::Network("HTTP 500 Internal Server Error".into()))
        } else {
            Ok(())
        }
    }
}

fn record_from_draft(id: String, draft: &EventDraft) -> EventRecord {
    EventRecord {
        id,
        title: draft.title.clone(),
        date: draft.date.clone(),
        venue: draft.venue.clone(),
        notes: draft.notes.clone(),
    }
}

#[async_trait]
impl PortalBackend for MockBackend {
    async fn list_events(&self, scope: Role) -> Result<Vec<EventBundle>> {
        self.record(format!("list_events:{scope}")).await;
        if self.fail_events.load(Ordering::SeqCst) {
            return Err(DataError::Network("HTTP 503".into()));
        }
        Ok(self.events.lock().await.clone())
    }

    async fn create_event(&self, draft: &EventDraft) -> Result<EventBundle> {
        self.record("create_event".into()).await;
        self.write_guard()?;
        let bundle = EventBundle::new(record_from_draft(self.next_id("evt"), draft));
        self.events.lock().await.push(bundle.clone());
        Ok(bundle)
    }

    async fn update_event(&self, id: &str, draft: &EventDraft) -> Result<EventBundle> {
        self.record(format!("update_event:{id}")).await;
        self.hold(&self.hold_updates).await;
        self.write_guard()?;
        let mut events = self.events.lock().await;
        let slot = events
            .iter_mut()
            .find(|bundle| bundle.event.id == id)
            .ok_or_else(|| DataError::NotFound(format!("event '{id}'")))?;
        slot.event = record_from_draft(id.to_string(), draft);
        Ok(slot.clone())
    }

    async fn delete_event(&self, id: &str) -> Result<()> {
        self.record(format!("delete_event:{id}")).await;
        self.write_guard()?;
        self.events.lock().await.retain(|bundle| bundle.event.id != id);
        Ok(())
    }

    async fn upload_event_media(
        &self,
        event_id: &str,
        upload: MediaUpload,
    ) -> Result<EventMedia> {
        self.record(format!("upload_event_media:{event_id}:{}", upload.file_name))
            .await;
        self.write_guard()?;
        Ok(EventMedia {
            id: self.next_id("media"),
            kind: upload.kind,
            title: upload.caption.clone().unwrap_or_default(),
            url: format!("https://cdn.example/uploads/{}", upload.file_name),
            description: None,
            event_id: None,
            student_id: None,
        })
    }

    async fn list_enquiries(&self, scope: Role) -> Result<Vec<Enquiry>> {
        self.record(format!("list_enquiries:{scope}")).await;
        self.hold(&self.hold_enquiries).await;
        if self.fail_enquiries.load(Ordering::SeqCst) {
            return Err(DataError::Network("HTTP 503".into()));
        }
        Ok(self.enquiries.lock().await.clone())
    }

    async fn submit_enquiry(&self, submission: &EnquirySubmission) -> Result<Enquiry> {
        self.record("submit_enquiry".into()).await;
        self.write_guard()?;
        let created = Enquiry {
            id: self.next_id("enq"),
            kind: submission.kind,
            name: submission.name.clone(),
            email: submission.email.clone(),
            phone: submission.phone.clone(),
            message: submission.message.clone(),
            created_at: "2024-06-01T09:00:00Z".into(),
            status: EnquiryStatus::New,
            channel: EnquiryChannel::Web,
        };
        self.enquiries.lock().await.push(created.clone());
        Ok(created)
    }

    async fn update_enquiry_status(
        &self,
        scope: Role,
        id: &str,
        status: EnquiryStatus,
    ) -> Result<Enquiry> {
        self.record(format!("update_enquiry_status:{scope}:{id}")).await;
        self.write_guard()?;
        let mut enquiries = self.enquiries.lock().await;
        let slot = enquiries
            .iter_mut()
            .find(|enquiry| enquiry.id == id)
            .ok_or_else(|| DataError::NotFound(format!("enquiry '{id}'")))?;
        slot.status = status;
        Ok(slot.clone())
    }
}

/// Serves canned blobs by URL; unknown URLs answer 404.
#[derive(Default)]
pub struct MockBlobFetcher {
    pub blobs: Mutex<HashMap<String, RemoteBlob>>,
    pub calls: Mutex<Vec<String>>,
}

impl MockBlobFetcher {
    pub async fn insert(&self, url: &str, content_type: Option<&str>, bytes: &[u8]) {
        self.blobs.lock().await.insert(
            url.to_string(),
            RemoteBlob {
                status: 200,
                content_type: content_type.map(str::to_string),
                bytes: bytes.to_vec(),
            },
        );
    }

    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl BlobFetcher for MockBlobFetcher {
    async fn fetch_blob(&self, url: &str) -> Result<RemoteBlob> {
        self.calls.lock().await.push(url.to_string());
        Ok(self
            .blobs
            .lock()
            .await
            .get(url)
            .cloned()
            .unwrap_or(RemoteBlob {
                status: 404,
                content_type: None,
                bytes: Vec::new(),
            }))
    }
}

pub struct TestContext {
    pub backend: Arc<MockBackend>,
    pub blobs: Arc<MockBlobFetcher>,
    pub session: PortalSession,
}

pub fn init_test_context(backend: MockBackend) -> TestContext {
    init_logging();
    let backend = Arc::new(backend);
    let blobs = Arc::new(MockBlobFetcher::default());
    let session = PortalSession::new(
        Arc::clone(&backend) as Arc<dyn PortalBackend>,
        Arc::clone(&blobs) as Arc<dyn BlobFetcher>,
    );
    TestContext {
        backend,
        blobs,
        session,
    }
}

/// A franchise session already loaded with two events (e1 owns m1, m2;
/// e2 owns m3) and one enquiry.
pub async fn franchise_context() -> TestContext {
    let backend = MockBackend::with_data(
        vec![
            EventBundle {
                event: event("e1", "Sports day"),
                media: vec![media("m1", "e1"), media("m2", "e1")],
            },
            EventBundle {
                event: event("e2", "Art fair"),
                media: vec![media("m3", "e2")],
            },
        ],
        vec![enquiry("q1", EnquiryStatus::New)],
    );
    let ctx = init_test_context(backend);
    ctx.session.set_role(Some(Role::Franchise)).await;
    ctx.backend.clear_calls().await;
    ctx
}
