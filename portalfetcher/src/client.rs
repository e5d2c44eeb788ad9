use async_trait::async_trait;
use dashstore::backend::{BlobFetcher, EventBundle, MediaUpload, PortalBackend, RemoteBlob};
use dashstore::config::PortalConfig;
use dashstore::errors::{DataError, Result as DataResult};
use dashstore::models::{
    Enquiry, EnquiryStatus, EnquirySubmission, EventDraft, EventMedia, Role,
};
use reqwest::{header, multipart, Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{FetcherError, Result};
use crate::mapper;
use crate::models::{EnquiryDto, EventDto, ListEnvelope, MediaDto};

fn build_client(user_agent: &str) -> Result<Client> {
    Ok(Client::builder().user_agent(user_agent).build()?)
}

/// Parses `raw` as a base URL, forcing a trailing slash so relative joins
/// append instead of replacing the last segment.
fn base_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.ends_with('/') {
        Ok(Url::parse(trimmed)?)
    } else {
        Ok(Url::parse(&format!("{trimmed}/"))?)
    }
}

fn events_path(scope: Role) -> &'static str {
    match scope {
        Role::Parent => "events/parent/",
        Role::Franchise | Role::Admin => "events/franchise/",
    }
}

fn enquiries_path(scope: Role) -> &'static str {
    match scope {
        Role::Admin => "enquiries/admin/",
        Role::Parent | Role::Franchise => "enquiries/franchise/",
    }
}

/// reqwest implementation of [`PortalBackend`].
#[derive(Clone, Debug)]
pub struct HttpBackend {
    http: Client,
    base: Url,
    media_base: Url,
    token: Option<String>,
}

impl HttpBackend {
    pub fn new(config: &PortalConfig) -> Result<Self> {
        Ok(Self {
            http: build_client(&config.user_agent)?,
            base: base_url(&config.api_base_url)?,
            media_base: base_url(config.media_base())?,
            token: config.auth_token.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path)?)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self.authorized(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::debug!("Backend answered {status}: {body}");
            return Err(FetcherError::api(status.as_u16(), &body));
        }
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let bytes = self.send(request).await?.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn fetch_events(&self, scope: Role) -> Result<Vec<EventBundle>> {
        let url = self.endpoint(events_path(scope))?;
        log::debug!("GET {url}");
        let list: ListEnvelope<EventDto> = self.send_json(self.http.get(url)).await?;
        Ok(list
            .into_items()
            .into_iter()
            .map(|dto| mapper::event_to_domain(dto, Some(&self.media_base)))
            .collect())
    }

    async fn write_event(&self, id: Option<&str>, draft: &EventDraft) -> Result<EventBundle> {
        let payload = mapper::event_to_wire(draft);
        let request = match id {
            Some(id) => {
                let url = self.endpoint(&format!("events/franchise/{id}/"))?;
                log::debug!("PATCH {url}");
                self.http.patch(url)
            }
            None => {
                let url = self.endpoint("events/franchise/")?;
                log::debug!("POST {url}");
                self.http.post(url)
            }
        };
        let dto: EventDto = self.send_json(request.json(&payload)).await?;
        Ok(mapper::event_to_domain(dto, Some(&self.media_base)))
    }

    async fn remove_event(&self, id: &str) -> Result<()> {
        let url = self.endpoint(&format!("events/franchise/{id}/"))?;
        log::debug!("DELETE {url}");
        self.send(self.http.delete(url)).await?;
        Ok(())
    }

    async fn post_media(&self, event_id: &str, upload: MediaUpload) -> Result<EventMedia> {
        let url = self.endpoint(&format!("events/franchise/{event_id}/media/"))?;
        log::debug!("POST {url} ({} bytes)", upload.bytes.len());
        let file = multipart::Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str(&upload.content_type)?;
        let mut form = multipart::Form::new()
            .part("file", file)
            .text("media_type", upload.kind.wire_name());
        if let Some(caption) = upload.caption {
            form = form.text("caption", caption);
        }
        let dto: MediaDto = self.send_json(self.http.post(url).multipart(form)).await?;
        Ok(mapper::media_to_domain(dto, Some(&self.media_base)))
    }

    async fn fetch_enquiries(&self, scope: Role) -> Result<Vec<Enquiry>> {
        let url = self.endpoint(enquiries_path(scope))?;
        log::debug!("GET {url}");
        let list: ListEnvelope<EnquiryDto> = self.send_json(self.http.get(url)).await?;
        Ok(list
            .into_items()
            .into_iter()
            .map(mapper::enquiry_to_domain)
            .collect())
    }

    async fn post_enquiry(&self, submission: &EnquirySubmission) -> Result<Enquiry> {
        let url = self.endpoint("enquiries/submit/")?;
        log::debug!("POST {url}");
        let payload = mapper::enquiry_to_wire(submission);
        let dto: EnquiryDto = self.send_json(self.http.post(url).json(&payload)).await?;
        Ok(mapper::enquiry_to_domain(dto))
    }

    async fn patch_status(&self, scope: Role, id: &str, status: EnquiryStatus) -> Result<Enquiry> {
        let url = self.endpoint(&format!("{}{id}/", enquiries_path(scope)))?;
        log::debug!("PATCH {url}");
        let payload = mapper::status_to_wire(status);
        let dto: EnquiryDto = self.send_json(self.http.patch(url).json(&payload)).await?;
        Ok(mapper::enquiry_to_domain(dto))
    }
}

#[async_trait]
impl PortalBackend for HttpBackend {
    async fn list_events(&self, scope: Role) -> DataResult<Vec<EventBundle>> {
        Ok(self.fetch_events(scope).await?)
    }

    async fn create_event(&self, draft: &EventDraft) -> DataResult<EventBundle> {
        Ok(self.write_event(None, draft).await?)
    }

    async fn update_event(&self, id: &str, draft: &EventDraft) -> DataResult<EventBundle> {
        Ok(self.write_event(Some(id), draft).await?)
    }

    async fn delete_event(&self, id: &str) -> DataResult<()> {
        Ok(self.remove_event(id).await?)
    }

    async fn upload_event_media(
        &self,
        event_id: &str,
        upload: MediaUpload,
    ) -> DataResult<EventMedia> {
        Ok(self.post_media(event_id, upload).await?)
    }

    async fn list_enquiries(&self, scope: Role) -> DataResult<Vec<Enquiry>> {
        Ok(self.fetch_enquiries(scope).await?)
    }

    async fn submit_enquiry(&self, submission: &EnquirySubmission) -> DataResult<Enquiry> {
        Ok(self.post_enquiry(submission).await?)
    }

    async fn update_enquiry_status(
        &self,
        scope: Role,
        id: &str,
        status: EnquiryStatus,
    ) -> DataResult<Enquiry> {
        Ok(self.patch_status(scope, id, status).await?)
    }
}

/// Plain GET of arbitrary media URLs. Non-success statuses come back as data.
#[derive(Clone, Debug)]
pub struct ReqwestBlobFetcher {
    http: Client,
}

impl ReqwestBlobFetcher {
    pub fn new(config: &PortalConfig) -> Result<Self> {
        Ok(Self {
            http: build_client(&config.user_agent)?,
        })
    }

    async fn get(&self, url: &str) -> Result<RemoteBlob> {
        let url = Url::parse(url)?;
        log::debug!("GET {url}");
        let response = self.http.get(url).send().await?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?.to_vec();
        Ok(RemoteBlob {
            status,
            content_type,
            bytes,
        })
    }
}

#[async_trait]
impl BlobFetcher for ReqwestBlobFetcher {
    async fn fetch_blob(&self, url: &str) -> DataResult<RemoteBlob> {
        self.get(url)
            .await
            .map_err(|err| DataError::Network(err.to_string()))
    }
}
