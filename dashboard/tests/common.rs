#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use dashboard::{build_router, AppState};
use dashstore::{
    backend::{BlobFetcher, EventBundle, MediaUpload, PortalBackend, RemoteBlob},
    errors::{DataError, Result},
    models::{
        Enquiry, EnquiryChannel, EnquiryStatus, EnquirySubmission, EventDraft, EventMedia,
        EventRecord, Role,
    },
    PortalSession,
};
use serde_json::Value;
use tower::util::ServiceExt;

const BODY_LIMIT: usize = 1 << 20;

/// Backend double holding one seeded event with one media item.
#[derive(Default)]
pub struct StubBackend {
    pub events: Mutex<Vec<EventBundle>>,
    pub enquiries: Mutex<Vec<Enquiry>>,
    pub offline: AtomicBool,
    next_id: AtomicUsize,
}

impl StubBackend {
    pub fn seeded() -> Self {
        let event = EventRecord {
            id: "e1".into(),
            title: "Sports day".into(),
            date: "2024-06-01".into(),
            venue: "Ground".into(),
            notes: None,
        };
        let media = EventMedia {
            id: "m1".into(),
            kind: Default::default(),
            title: "Start line".into(),
            url: "https://cdn.example/m1.png".into(),
            description: None,
            event_id: Some("e1".into()),
            student_id: None,
        };
        Self {
            events: Mutex::new(vec![EventBundle {
                event,
                media: vec![media],
            }]),
            ..Default::default()
        }
    }

    fn id(&self, prefix: &str) -> String {
        format!("{prefix}-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(DataError::Network("connection refused".into()))
        } else {
            Ok(())
        }
    }
}

fn record(id: String, draft: &EventDraft) -> EventRecord {
    EventRecord {
        id,
        title: draft.title.clone(),
        date: draft.date.clone(),
        venue: draft.venue.clone(),
        notes: draft.notes.clone(),
    }
}

#[async_trait]
impl PortalBackend for StubBackend {
    async fn list_events(&self, _scope: Role) -> Result<Vec<EventBundle>> {
        self.online()?;
        Ok(self.events.lock().unwrap().clone())
    }

    async fn create_event(&self, draft: &EventDraft) -> Result<EventBundle> {
        self.online()?;
        Ok(EventBundle::new(record(self.id("evt"), draft)))
    }

    async fn update_event(&self, id: &str, draft: &EventDraft) -> Result<EventBundle> {
        self.online()?;
        Ok(EventBundle::new(record(id.to_string(), draft)))
    }

    async fn delete_event(&self, _id: &str) -> Result<()> {
        self.online()
    }

    async fn upload_event_media(&self, event_id: &str, upload: MediaUpload) -> Result<EventMedia> {
        self.online()?;
        Ok(EventMedia {
            id: self.id("media"),
            kind: upload.kind,
            title: upload.caption.unwrap_or_default(),
            url: format!("https://cdn.example/{}", upload.file_name),
            description: Some(format!("{} bytes", upload.bytes.len())),
            event_id: Some(event_id.to_string()),
            student_id: None,
        })
    }

    async fn list_enquiries(&self, _scope: Role) -> Result<Vec<Enquiry>> {
        self.online()?;
        Ok(self.enquiries.lock().unwrap().clone())
    }

    async fn submit_enquiry(&self, submission: &EnquirySubmission) -> Result<Enquiry> {
        self.online()?;
        Ok(Enquiry {
            id: self.id("enq"),
            kind: submission.kind,
            name: submission.name.clone(),
            email: submission.email.clone(),
            phone: submission.phone.clone(),
            message: submission.message.clone(),
            created_at: "2024-06-01T09:00:00Z".into(),
            status: EnquiryStatus::New,
            channel: EnquiryChannel::Web,
        })
    }

    async fn update_enquiry_status(
        &self,
        _scope: Role,
        id: &str,
        status: EnquiryStatus,
    ) -> Result<Enquiry> {
        self.online()?;
        let mut enquiries = self.enquiries.lock().unwrap();
        let slot = enquiries
            .iter_mut()
            .find(|enquiry| enquiry.id == id)
            .ok_or_else(|| DataError::NotFound(format!("enquiry '{id}'")))?;
        slot.status = status;
        Ok(slot.clone())
    }
}

/// Every URL is unreachable.
pub struct OfflineBlobs;

#[async_trait]
impl BlobFetcher for OfflineBlobs {
    async fn fetch_blob(&self, _url: &str) -> Result<RemoteBlob> {
        Ok(RemoteBlob {
            status: 404,
            content_type: None,
            bytes: Vec::new(),
        })
    }
}

pub struct TestApp {
    pub router: Router,
    pub backend: Arc<StubBackend>,
    pub session: Arc<PortalSession>,
}

pub fn test_app() -> TestApp {
    let backend = Arc::new(StubBackend::seeded());
    let session = Arc::new(PortalSession::new(
        Arc::clone(&backend) as Arc<dyn PortalBackend>,
        Arc::new(OfflineBlobs) as Arc<dyn BlobFetcher>,
    ));
    TestApp {
        router: build_router(AppState::new(Arc::clone(&session))),
        backend,
        session,
    }
}

impl TestApp {
    pub async fn call(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> anyhow::Result<(StatusCode, Value)> {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), BODY_LIMIT).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, value))
    }
}
