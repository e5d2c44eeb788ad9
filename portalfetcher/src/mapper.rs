//! DTO ⇄ domain translation.
//!
//! These functions are total: missing wire fields become empty strings or
//! the documented defaults, never errors.

use dashstore::backend::EventBundle;
use dashstore::models::{
    Enquiry, EnquiryChannel, EnquiryStatus, EnquirySubmission, EnquiryType, EventDraft,
    EventMedia, EventRecord, MediaKind,
};
use url::Url;

use crate::models::{EnquiryDto, EnquiryPayload, EventDto, EventPayload, MediaDto, StatusPayload};

fn text(value: Option<String>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Maps an event and the media it embeds. Embedded media without an
/// explicit event reference are attached to this event.
pub fn event_to_domain(dto: EventDto, media_base: Option<&Url>) -> EventBundle {
    let event = EventRecord {
        id: dto.id,
        title: text(dto.title),
        date: text(dto.start_date),
        venue: text(dto.location),
        notes: optional_text(dto.description),
    };
    let media = dto
        .media
        .unwrap_or_default()
        .into_iter()
        .map(|item| {
            let mut media = media_to_domain(item, media_base);
            if media.event_id.is_none() {
                media.event_id = Some(event.id.clone());
            }
            media
        })
        .collect();
    EventBundle { event, media }
}

pub fn media_to_domain(dto: MediaDto, media_base: Option<&Url>) -> EventMedia {
    let kind = match dto.media_type.as_deref().map(str::trim) {
        Some(kind) if kind.eq_ignore_ascii_case("video") => MediaKind::Video,
        _ => MediaKind::Image,
    };
    let raw = optional_text(dto.file).or_else(|| optional_text(dto.url));
    EventMedia {
        id: dto.id,
        kind,
        title: text(dto.caption),
        url: raw
            .map(|path| resolve_media_url(&path, media_base))
            .unwrap_or_default(),
        description: optional_text(dto.description),
        event_id: dto.event,
        student_id: dto.student,
    }
}

/// Absolute URLs pass through; relative paths are joined onto `base`.
pub fn resolve_media_url(path: &str, base: Option<&Url>) -> String {
    if Url::parse(path).is_ok() {
        return path.to_string();
    }
    base.and_then(|base| base.join(path).ok())
        .map(String::from)
        .unwrap_or_else(|| path.to_string())
}

pub fn enquiry_to_domain(dto: EnquiryDto) -> Enquiry {
    Enquiry {
        id: dto.id,
        kind: parse_enquiry_type(dto.enquiry_type.as_deref()),
        name: text(dto.name),
        email: text(dto.email),
        phone: optional_text(dto.phone),
        message: text(dto.message),
        created_at: text(dto.created_at),
        status: parse_status(dto.status.as_deref()),
        channel: match dto.channel.as_deref().map(str::trim) {
            Some(channel) if channel.eq_ignore_ascii_case("dashboard") => {
                EnquiryChannel::Dashboard
            }
            _ => EnquiryChannel::Web,
        },
    }
}

fn parse_enquiry_type(raw: Option<&str>) -> EnquiryType {
    match raw.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        Some("admission") => EnquiryType::Admission,
        Some("franchise") => EnquiryType::Franchise,
        _ => EnquiryType::Contact,
    }
}

pub fn parse_status(raw: Option<&str>) -> EnquiryStatus {
    let normalized = raw
        .map(|v| v.trim().to_ascii_lowercase().replace('_', "-"))
        .unwrap_or_default();
    match normalized.as_str() {
        "in-progress" => EnquiryStatus::InProgress,
        "closed" => EnquiryStatus::Closed,
        _ => EnquiryStatus::New,
    }
}

/// The end date falls back to the start date; blank values go out as null.
pub fn event_to_wire(draft: &EventDraft) -> EventPayload {
    let start_date = optional_text(Some(draft.date.clone()));
    let end_date = optional_text(draft.end_date.clone()).or_else(|| start_date.clone());
    EventPayload {
        title: draft.title.trim().to_string(),
        description: optional_text(draft.notes.clone()),
        start_date,
        end_date,
        location: draft.venue.trim().to_string(),
    }
}

pub fn enquiry_to_wire(submission: &EnquirySubmission) -> EnquiryPayload {
    EnquiryPayload {
        enquiry_type: submission.kind.wire_name(),
        name: submission.name.trim().to_string(),
        email: submission.email.trim().to_string(),
        phone: optional_text(submission.phone.clone()),
        message: submission.message.trim().to_string(),
        city: optional_text(submission.city.clone()),
        child_age: optional_text(submission.child_age.clone()),
        franchise_slug: optional_text(submission.franchise_slug.clone()),
    }
}

pub fn status_to_wire(status: EnquiryStatus) -> StatusPayload {
    StatusPayload {
        status: status.wire_name(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> Url {
        Url::parse("https://api.example/").unwrap()
    }

    #[test]
    fn event_maps_fields_and_embedded_media() {
        let dto: EventDto = serde_json::from_value(json!({
            "id": 9,
            "title": " Sports day ",
            "description": "",
            "start_date": "2024-06-01",
            "location": "Ground",
            "media": [
                {"id": 1, "media_type": "VIDEO", "file": "/media/clip.mp4", "caption": "Race"},
                {"id": 2, "url": "https://cdn.example/a.png", "event": 3}
            ]
        }))
        .unwrap();

        let bundle = event_to_domain(dto, Some(&base()));
        assert_eq!(bundle.event.id, "9");
        assert_eq!(bundle.event.title, "Sports day");
        assert_eq!(bundle.event.date, "2024-06-01");
        assert_eq!(bundle.event.venue, "Ground");
        assert_eq!(bundle.event.notes, None);

        assert_eq!(bundle.media[0].kind, MediaKind::Video);
        assert_eq!(bundle.media[0].url, "https://api.example/media/clip.mp4");
        assert_eq!(bundle.media[0].event_id.as_deref(), Some("9"));
        assert_eq!(bundle.media[1].kind, MediaKind::Image);
        assert_eq!(bundle.media[1].url, "https://cdn.example/a.png");
        assert_eq!(bundle.media[1].event_id.as_deref(), Some("3"));
    }

    #[test]
    fn partial_event_maps_to_empty_strings() {
        let bundle = event_to_domain(EventDto::default(), None);
        assert_eq!(bundle.event.title, "");
        assert_eq!(bundle.event.date, "");
        assert!(bundle.media.is_empty());
    }

    #[test]
    fn media_without_type_defaults_to_image() {
        let media = media_to_domain(
            MediaDto {
                id: "m".into(),
                file: Some("uploads/x.bin".into()),
                ..Default::default()
            },
            None,
        );
        assert_eq!(media.kind, MediaKind::Image);
        assert_eq!(media.url, "uploads/x.bin");
    }

    #[test]
    fn enquiry_status_is_lenient() {
        assert_eq!(parse_status(Some("IN_PROGRESS")), EnquiryStatus::InProgress);
        assert_eq!(parse_status(Some("in-progress")), EnquiryStatus::InProgress);
        assert_eq!(parse_status(Some("Closed")), EnquiryStatus::Closed);
        assert_eq!(parse_status(None), EnquiryStatus::New);

        let enquiry = enquiry_to_domain(EnquiryDto {
            id: "5".into(),
            enquiry_type: Some("FRANCHISE".into()),
            channel: Some("dashboard".into()),
            phone: Some("  ".into()),
            ..Default::default()
        });
        assert_eq!(enquiry.kind, EnquiryType::Franchise);
        assert_eq!(enquiry.channel, EnquiryChannel::Dashboard);
        assert_eq!(enquiry.phone, None);
        assert_eq!(enquiry.status, EnquiryStatus::New);
    }

    #[test]
    fn event_payload_defaults_end_date() {
        let payload = event_to_wire(&EventDraft {
            title: "Fair".into(),
            date: "2024-07-01".into(),
            end_date: None,
            venue: "Hall".into(),
            notes: Some(" ".into()),
        });
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "title": "Fair",
                "description": null,
                "start_date": "2024-07-01",
                "end_date": "2024-07-01",
                "location": "Hall"
            })
        );
    }

    #[test]
    fn outgoing_enums_use_wire_spelling() {
        assert_eq!(status_to_wire(EnquiryStatus::InProgress).status, "IN_PROGRESS");
        let payload = enquiry_to_wire(&EnquirySubmission {
            kind: EnquiryType::Admission,
            name: "A".into(),
            email: "a@example.com".into(),
            phone: None,
            message: "hi".into(),
            city: Some("Pune".into()),
            child_age: None,
            franchise_slug: None,
        });
        assert_eq!(payload.enquiry_type, "ADMISSION");
        assert_eq!(payload.city.as_deref(), Some("Pune"));
    }
}
