//! Wire shapes exchanged with the portal REST backend.
//!
//! Every field is defaulted so partially populated payloads still decode;
//! the mapper turns absent values into empty strings.

use serde::{Deserialize, Deserializer, Serialize};

/// Accepts ids sent as strings, integers or null.
fn opaque_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value: serde_json::Value = Deserialize::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

fn optional_opaque_id<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let id = opaque_id(deserializer)?;
    Ok((!id.is_empty()).then_some(id))
}

/// List endpoints answer either a bare array or a paginated envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListEnvelope<T> {
    Plain(Vec<T>),
    Paged { results: Vec<T> },
}

impl<T> ListEnvelope<T> {
    pub fn into_items(self) -> Vec<T> {
        match self {
            ListEnvelope::Plain(items) => items,
            ListEnvelope::Paged { results } => results,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventDto {
    #[serde(default, deserialize_with = "opaque_id")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub media: Option<Vec<MediaDto>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaDto {
    #[serde(default, deserialize_with = "opaque_id")]
    pub id: String,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Stored file path or absolute URL.
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "optional_opaque_id")]
    pub event: Option<String>,
    #[serde(default, deserialize_with = "optional_opaque_id")]
    pub student: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnquiryDto {
    #[serde(default, deserialize_with = "opaque_id")]
    pub id: String,
    #[serde(default)]
    pub enquiry_type: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventPayload {
    pub title: String,
    pub description: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnquiryPayload {
    pub enquiry_type: &'static str,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
    pub city: Option<String>,
    pub child_age: Option<String>,
    pub franchise_slug: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusPayload {
    pub status: &'static str,
}
