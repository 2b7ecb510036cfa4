use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Link-collection fields of the intake form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct IntakeLinks {
    pub landing_pages: Option<String>,
    pub calendars: Option<String>,
    pub webinar_links: Option<String>,
    pub forms_surveys: Option<String>,
    pub other_assets: Option<String>,
}

/// Summary of one uploaded file, recorded while walking the multipart body.
///
/// Created when a file passes the form's extension filtering and is sent for
/// a token upload; never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFileSummary {
    /// Originating form field name (e.g. `brandVoiceFile`).
    pub field: String,
    /// Final filename after the sanitize-and-rename step.
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub content_type: String,
    /// Attachment token handed out by the store's upload API, when the
    /// token upload succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_token: Option<String>,
}

/// Raw URL attachment reference (fallback when no upload token exists).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UrlAttachment {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

/// The normalized onboarding submission.
///
/// Every field is optional at the type level; required-ness is enforced by
/// the form before submission, never here.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct IntakePayload {
    pub company_name: Option<String>,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub instagram: Option<String>,
    pub crm: Option<String>,
    pub email_platform: Option<String>,
    pub links: IntakeLinks,
    pub brand_voice: Option<String>,
    pub sales_pitch: Option<String>,
    pub offer_info: Option<String>,
    #[serde(rename = "brandFAQ")]
    pub brand_faq: Option<String>,
    #[serde(rename = "productFAQ")]
    pub product_faq: Option<String>,
    pub sales_guide: Option<String>,
    pub lead_qualification: Option<String>,
    pub credentials: Option<String>,
    pub notes: Option<String>,
    pub loom_url: Option<String>,
    pub uploaded_files: Vec<UploadedFileSummary>,
    pub attachments: Vec<UrlAttachment>,
}

/// A record as the external store returns it. Owned and assigned by the
/// store; this service only reads and writes it through the store's API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreRecord {
    pub id: String,
    #[serde(
        rename = "createdTime",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub created_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Value>,
}

/// Record-creation response. The store answers with either a batch shape
/// (`{"records": [...]}`) or a single record; anything else is carried as-is.
///
/// Resolved once at the API boundary so no caller has to re-sniff the shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum CreateResponse {
    Batch { records: Vec<StoreRecord> },
    Single(StoreRecord),
    Other(Value),
}

impl CreateResponse {
    /// Id of the created record, if the response shape exposes one.
    pub fn first_record_id(&self) -> Option<&str> {
        match self {
            CreateResponse::Batch { records } => records.first().map(|r| r.id.as_str()),
            CreateResponse::Single(record) => Some(record.id.as_str()),
            CreateResponse::Other(_) => None,
        }
    }

    /// Normalize to a record list: batch responses yield their records, a
    /// single record is wrapped, unknown shapes yield nothing.
    pub fn into_records(self) -> Vec<StoreRecord> {
        match self {
            CreateResponse::Batch { records } => records,
            CreateResponse::Single(record) => vec![record],
            CreateResponse::Other(_) => Vec::new(),
        }
    }
}

/// Outcome of one webhook delivery. Never an error: failures reduce to
/// `ok: false` so a dead automation endpoint cannot fail a submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebhookResult {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

/// Success body of `POST /api/submit`.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitResponse {
    pub ok: bool,
    /// Raw record-store creation response, echoed for the caller.
    pub airtable: CreateResponse,
    /// The freshly fetched record when available, else the creation response.
    pub record: Value,
    pub webhook: WebhookResult,
    pub webhook2: WebhookResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_single_record_response() {
        let json = r#"{"id": "rec1", "createdTime": "2025-04-01T12:00:00.000Z", "fields": {"Company Name": "Acme"}}"#;
        let parsed: CreateResponse = serde_json::from_str(json).unwrap();
        match &parsed {
            CreateResponse::Single(record) => assert_eq!(record.id, "rec1"),
            other => panic!("Expected single record, got {:?}", other),
        }
        assert_eq!(parsed.first_record_id(), Some("rec1"));
        assert_eq!(parsed.into_records().len(), 1);
    }

    #[test]
    fn parse_batch_record_response() {
        let json = r#"{"records": [{"id": "rec1"}, {"id": "rec2"}]}"#;
        let parsed: CreateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.first_record_id(), Some("rec1"));
        assert_eq!(parsed.into_records().len(), 2);
    }

    #[test]
    fn unknown_shape_normalizes_to_empty() {
        let json = r#"{"status": "queued"}"#;
        let parsed: CreateResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(parsed, CreateResponse::Other(_)));
        assert_eq!(parsed.first_record_id(), None);
        assert!(parsed.into_records().is_empty());
    }

    #[test]
    fn payload_json_round_trip_uses_wire_names() {
        let json = r#"{
            "companyName": "Acme Inc.",
            "brandFAQ": "answers",
            "links": {"landingPages": "https://a.example"},
            "uploadedFiles": [{"field": "brandVoiceFile", "name": "brandVoiceFile.pdf", "size": 10, "type": "application/pdf"}]
        }"#;
        let payload: IntakePayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.company_name.as_deref(), Some("Acme Inc."));
        assert_eq!(payload.brand_faq.as_deref(), Some("answers"));
        assert_eq!(
            payload.links.landing_pages.as_deref(),
            Some("https://a.example")
        );
        assert_eq!(payload.uploaded_files.len(), 1);
        assert!(payload.uploaded_files[0].upload_token.is_none());

        let back = serde_json::to_value(&payload).unwrap();
        assert!(back.get("brandFAQ").is_some());
        assert!(back.get("companyName").is_some());
    }
}
