use crate::attachment_upload::{AttachmentClient, MAX_DIRECT_UPLOAD_BYTES};
use crate::config::Config;
use crate::errors::AppError;
use crate::models::{
    CreateResponse, IntakeLinks, IntakePayload, StoreRecord, SubmitResponse, UploadedFileSummary,
};
use crate::record_store::RecordStore;
use crate::schema_lookup::SchemaLookup;
use crate::webhook_notifier::WebhookNotifier;
use axum::{
    extract::{DefaultBodyLimit, FromRequest, Multipart, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

/// Request body ceiling. Files above the 5 MB direct-attach cap still flow
/// through the token upload path, so this sits well above it.
pub const MAX_REQUEST_BYTES: usize = 25 * 1024 * 1024;

/// Display name of the store's attachment field, used when the schema
/// lookup cannot produce a stable field id.
const ATTACHMENTS_FIELD: &str = "Attachments";

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Record store client (create + fetch).
    pub record_store: RecordStore,
    /// Attachment upload client (token + direct paths).
    pub attachments: AttachmentClient,
    /// Schema metadata client for field-id resolution.
    pub schema: SchemaLookup,
    /// Downstream automation webhook notifier.
    pub webhooks: WebhookNotifier,
}

impl AppState {
    pub fn from_config(config: Config) -> Result<Self, AppError> {
        Ok(Self {
            record_store: RecordStore::new(&config)?,
            attachments: AttachmentClient::new(&config)?,
            schema: SchemaLookup::new(&config)?,
            webhooks: WebhookNotifier::new(&config)?,
            config,
        })
    }
}

/// Routes without the operational middleware; `main` adds rate limiting,
/// tracing, and CORS on top.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/submit", post(submit))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BYTES))
        .with_state(state)
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "intake-api",
            "version": "0.1.0"
        })),
    )
}

/// POST /api/submit
///
/// Branches on content type: multipart submissions carry files and the
/// flattened form fields, anything else is treated as a JSON payload.
/// Every failure collapses to the same generic 500 body; only the log
/// sees the cause.
pub async fn submit(State(state): State<Arc<AppState>>, req: Request) -> Response {
    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let outcome = if content_type.contains("multipart/form-data") {
        match Multipart::from_request(req, &()).await {
            Ok(multipart) => submit_multipart(&state, multipart).await,
            Err(e) => Err(AppError::Internal(format!(
                "Invalid multipart request: {}",
                e
            ))),
        }
    } else {
        submit_json(&state, req).await
    };

    match outcome {
        Ok(response) => Json(response).into_response(),
        Err(e) => {
            tracing::error!("/api/submit failed: {}", e);
            e.into_response()
        }
    }
}

/// One file pulled out of the multipart body, kept around for the
/// direct-attach fallback after record creation.
struct FileEntry {
    field: String,
    name: String,
    content_type: String,
    bytes: Vec<u8>,
}

async fn submit_multipart(
    state: &AppState,
    mut multipart: Multipart,
) -> Result<SubmitResponse, AppError> {
    let mut texts: HashMap<String, String> = HashMap::new();
    let mut uploaded_files: Vec<UploadedFileSummary> = Vec::new();
    let mut file_entries: Vec<FileEntry> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Internal(format!("Invalid multipart body: {}", e)))?
    {
        let field_name = field.name().unwrap_or_default().to_string();

        if let Some(original_name) = field.file_name().map(str::to_string) {
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field.bytes().await.map_err(|e| {
                AppError::Internal(format!("Failed to read upload '{}': {}", field_name, e))
            })?;
            if bytes.is_empty() {
                continue;
            }

            // Rename the upload after its input field so downstream names
            // stay predictable: brandVoiceFile + guide.pdf -> brandVoiceFile.pdf
            let new_name = format!(
                "{}{}",
                sanitize_field_name(&field_name),
                file_extension(&original_name)
            );

            // One file at a time; a slow upload for one file must not race
            // another.
            let token = state
                .attachments
                .upload_for_token(&new_name, &content_type, bytes.to_vec())
                .await?;

            uploaded_files.push(UploadedFileSummary {
                field: field_name.clone(),
                name: new_name.clone(),
                size: bytes.len() as u64,
                content_type: content_type.clone(),
                upload_token: token,
            });
            file_entries.push(FileEntry {
                field: field_name,
                name: new_name,
                content_type,
                bytes: bytes.to_vec(),
            });
        } else {
            let value = field.text().await.map_err(|e| {
                AppError::Internal(format!("Failed to read field '{}': {}", field_name, e))
            })?;
            texts.insert(field_name, value);
        }
    }

    let payload = payload_from_texts(&texts, uploaded_files);

    let airtable = state.record_store.create_intake_record(&payload).await?;
    let created_record_id = airtable.first_record_id().map(str::to_string);

    if let Some(record_id) = created_record_id.as_deref() {
        // Best-effort from here: the record exists, so nothing in the
        // fallback pass may fail the request.
        if let Err(e) =
            attach_files_without_tokens(state, record_id, &payload.uploaded_files, &file_entries)
                .await
        {
            tracing::warn!("Direct attachment pass failed: {}", e);
        }
    }

    finalize(state, airtable, created_record_id).await
}

async fn submit_json(state: &AppState, req: Request) -> Result<SubmitResponse, AppError> {
    let bytes = axum::body::to_bytes(req.into_body(), MAX_REQUEST_BYTES)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to read request body: {}", e)))?;

    // An unparseable body degrades to an empty payload, matching the
    // multipart path's treatment of absent fields.
    let payload: IntakePayload = serde_json::from_slice(&bytes).unwrap_or_default();

    let airtable = state.record_store.create_intake_record(&payload).await?;
    let record_id = airtable.first_record_id().map(str::to_string);
    finalize(state, airtable, record_id).await
}

/// Shared tail of both content-type paths: re-fetch the canonical record,
/// normalize the webhook record set, fan out to both webhooks concurrently,
/// and assemble the success body.
async fn finalize(
    state: &AppState,
    airtable: CreateResponse,
    record_id: Option<String>,
) -> Result<SubmitResponse, AppError> {
    let full_record = match record_id.as_deref() {
        Some(id) => state.record_store.fetch_record(id).await,
        None => None,
    };

    let records = records_for_webhook(&airtable, full_record.as_ref());
    let (webhook, webhook2) = tokio::join!(
        state.webhooks.notify_primary(&records),
        state.webhooks.notify_secondary(&records)
    );

    let record = match &full_record {
        Some(record) => serde_json::to_value(record)?,
        None => serde_json::to_value(&airtable)?,
    };

    Ok(SubmitResponse {
        ok: true,
        airtable,
        record,
        webhook,
        webhook2,
    })
}

/// Directly attaches every file that did not receive an upload token and
/// fits the size cap. Resolves the attachment field id once, falling back
/// to the display name when the schema lookup comes up empty.
async fn attach_files_without_tokens(
    state: &AppState,
    record_id: &str,
    uploaded: &[UploadedFileSummary],
    entries: &[FileEntry],
) -> Result<(), AppError> {
    let field_target = match state.config.store_table_name.as_deref() {
        Some(table) => state
            .schema
            .field_id_by_name(table, ATTACHMENTS_FIELD)
            .await
            .map(|r| r.field_id)
            .unwrap_or_else(|| ATTACHMENTS_FIELD.to_string()),
        None => ATTACHMENTS_FIELD.to_string(),
    };

    for entry in entries {
        let has_token = uploaded
            .iter()
            .find(|u| u.field == entry.field && u.name == entry.name)
            .and_then(|u| u.upload_token.as_ref())
            .is_some();
        if !has_token && entry.bytes.len() as u64 <= MAX_DIRECT_UPLOAD_BYTES {
            state
                .attachments
                .upload_to_record(
                    record_id,
                    &field_target,
                    &entry.name,
                    &entry.content_type,
                    &entry.bytes,
                )
                .await?;
        }
    }
    Ok(())
}

fn payload_from_texts(
    texts: &HashMap<String, String>,
    uploaded_files: Vec<UploadedFileSummary>,
) -> IntakePayload {
    let text = |name: &str| texts.get(name).cloned().unwrap_or_default();

    IntakePayload {
        company_name: Some(text("companyName")),
        contact_name: Some(text("contactName")),
        email: Some(text("email")),
        phone: Some(preferred_phone(texts)),
        website: Some(text("website")),
        instagram: Some(text("instagram")),
        crm: Some(text("crm")),
        email_platform: Some(text("emailPlatform")),
        links: IntakeLinks {
            landing_pages: Some(text("links.landingPages")),
            calendars: Some(text("links.calendars")),
            webinar_links: Some(text("links.webinarLinks")),
            forms_surveys: Some(text("links.formsSurveys")),
            other_assets: Some(text("links.otherAssets")),
        },
        brand_voice: Some(text("brandVoice")),
        sales_pitch: Some(text("salesPitch")),
        offer_info: Some(text("offerInfo")),
        brand_faq: Some(text("brandFAQ")),
        product_faq: Some(text("productFAQ")),
        sales_guide: Some(text("salesGuide")),
        lead_qualification: Some(text("leadQualification")),
        credentials: Some(text("credentials")),
        notes: Some(text("notes")),
        loom_url: Some(text("loomUrl")),
        uploaded_files,
        attachments: Vec::new(),
    }
}

/// Phone preference chain: a validated E.164 value wins, then the
/// country-code + digits-only-national concatenation, then the raw field.
/// The concatenation is best-effort and may not be a real number.
fn preferred_phone(texts: &HashMap<String, String>) -> String {
    let text = |name: &str| texts.get(name).cloned().unwrap_or_default();

    let e164 = text("phone_e164");
    if !e164.is_empty() {
        return e164;
    }

    let code = text("phone_code");
    let national = text("phone_national");
    if !code.is_empty() && !national.is_empty() {
        return format!("{}{}", code, digits_only(&national));
    }

    text("phone")
}

fn digits_only(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

/// Keeps alphanumerics, underscore, dot, and hyphen; everything else
/// becomes an underscore.
pub fn sanitize_field_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Extension of the original filename, dot included; empty when there is none.
pub fn file_extension(name: &str) -> &str {
    name.rfind('.').map(|i| &name[i..]).unwrap_or("")
}

/// The record set handed to the webhooks: the freshly fetched record when
/// available, else whatever the creation response normalizes to.
pub fn records_for_webhook(
    create: &CreateResponse,
    fetched: Option<&StoreRecord>,
) -> Vec<StoreRecord> {
    if let Some(record) = fetched {
        return vec![record.clone()];
    }
    create.clone().into_records()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_keeps_the_allowed_set() {
        assert_eq!(sanitize_field_name("brandVoiceFile"), "brandVoiceFile");
        assert_eq!(sanitize_field_name("links.landingPages"), "links.landingPages");
        assert_eq!(sanitize_field_name("weird field/name!"), "weird_field_name_");
    }

    #[test]
    fn extension_includes_the_dot() {
        assert_eq!(file_extension("guide.pdf"), ".pdf");
        assert_eq!(file_extension("archive.tar.gz"), ".gz");
        assert_eq!(file_extension("README"), "");
    }

    #[test]
    fn phone_preference_order() {
        let mut texts = HashMap::new();
        texts.insert("phone".to_string(), "(212) 555-0100".to_string());
        texts.insert("phone_code".to_string(), "+1".to_string());
        texts.insert("phone_national".to_string(), "(212) 555-0100".to_string());
        texts.insert("phone_e164".to_string(), "+12125550100".to_string());
        assert_eq!(preferred_phone(&texts), "+12125550100");

        texts.remove("phone_e164");
        assert_eq!(preferred_phone(&texts), "+12125550100");

        texts.remove("phone_code");
        assert_eq!(preferred_phone(&texts), "(212) 555-0100");

        texts.remove("phone");
        assert_eq!(preferred_phone(&texts), "");
    }

    #[test]
    fn webhook_records_prefer_the_fetched_record() {
        let create = CreateResponse::Single(StoreRecord {
            id: "recCreate".to_string(),
            created_time: None,
            fields: None,
        });
        let fetched = StoreRecord {
            id: "recCreate".to_string(),
            created_time: None,
            fields: Some(json!({"Company Name": "Acme"})),
        };
        let records = records_for_webhook(&create, Some(&fetched));
        assert_eq!(records.len(), 1);
        assert!(records[0].fields.is_some());
    }

    #[test]
    fn webhook_records_normalize_both_create_shapes() {
        let batch: CreateResponse =
            serde_json::from_str(r#"{"records": [{"id": "rec1"}]}"#).unwrap();
        let single: CreateResponse = serde_json::from_str(r#"{"id": "rec1"}"#).unwrap();
        let records_batch = records_for_webhook(&batch, None);
        let records_single = records_for_webhook(&single, None);
        assert_eq!(records_batch, records_single);
        assert_eq!(records_batch[0].id, "rec1");

        let other: CreateResponse = serde_json::from_str(r#"{"queued": true}"#).unwrap();
        assert!(records_for_webhook(&other, None).is_empty());
    }
}
