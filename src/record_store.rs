use crate::config::{AttachmentsMode, Config};
use crate::errors::AppError;
use crate::models::{CreateResponse, IntakePayload, StoreRecord};
use serde_json::{json, Map, Value};
use std::time::Duration;
use url::Url;

/// Client for the external record store's REST API.
///
/// Narrow surface by design: create one record, fetch one record. Everything
/// Airtable-shaped about the wire format lives behind it.
#[derive(Clone)]
pub struct RecordStore {
    client: reqwest::Client,
    api_base_url: String,
    api_key: Option<String>,
    base_id: Option<String>,
    table_name: Option<String>,
    attachments_mode: AttachmentsMode,
}

impl RecordStore {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                AppError::Internal(format!("Failed to create record store client: {}", e))
            })?;

        Ok(Self {
            client,
            api_base_url: config.store_api_base_url.clone(),
            api_key: config.store_api_key.clone(),
            base_id: config.store_base_id.clone(),
            table_name: config.store_table_name.clone(),
            attachments_mode: config.attachments_mode,
        })
    }

    /// Required credentials, or a config error naming the first missing one.
    fn credentials(&self) -> Result<(&str, &str, &str), AppError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::Config("Missing required env var: AIRTABLE_API_KEY".into()))?;
        let base_id = self
            .base_id
            .as_deref()
            .ok_or_else(|| AppError::Config("Missing required env var: AIRTABLE_BASE_ID".into()))?;
        let table_name = self.table_name.as_deref().ok_or_else(|| {
            AppError::Config("Missing required env var: AIRTABLE_TABLE_NAME".into())
        })?;
        Ok((api_key, base_id, table_name))
    }

    fn table_url(&self, base_id: &str, table_name: &str) -> Result<Url, AppError> {
        let mut url = Url::parse(&self.api_base_url)
            .map_err(|e| AppError::Internal(format!("Invalid store API base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| AppError::Internal("Store API base URL cannot hold a path".into()))?
            .extend(["v0", base_id, table_name]);
        Ok(url)
    }

    /// Creates one intake record from the payload's field mapping.
    pub async fn create_intake_record(
        &self,
        payload: &IntakePayload,
    ) -> Result<CreateResponse, AppError> {
        let (api_key, base_id, table_name) = self.credentials()?;
        let fields = intake_fields(payload, self.attachments_mode)?;
        let url = self.table_url(base_id, table_name)?;

        tracing::info!("Creating intake record in table '{}'", table_name);

        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&json!({ "fields": fields }))
            .send()
            .await
            .map_err(|e| AppError::ExternalApi(format!("Record store request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApi(format!(
                "Record store error: {} {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown"),
                body
            )));
        }

        let created: CreateResponse = response.json().await.map_err(|e| {
            AppError::ExternalApi(format!("Failed to parse record store response: {}", e))
        })?;

        tracing::info!(
            "✓ Intake record created: {}",
            created.first_record_id().unwrap_or("<no id>")
        );
        Ok(created)
    }

    /// Fetches the full, current record by id.
    ///
    /// Best-effort: missing config, network failure, a non-success status,
    /// or an unparseable body all yield `None` so callers can fall back to
    /// the creation response.
    pub async fn fetch_record(&self, record_id: &str) -> Option<StoreRecord> {
        let (api_key, base_id, table_name) = self.credentials().ok()?;
        let mut url = self.table_url(base_id, table_name).ok()?;
        url.path_segments_mut().ok()?.push(record_id);

        let response = match self
            .client
            .get(url)
            .header("Authorization", format!("Bearer {}", api_key))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Record fetch failed for {}: {}", record_id, e);
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::warn!(
                "Record fetch for {} returned status {}",
                record_id,
                response.status()
            );
            return None;
        }

        match response.json::<StoreRecord>().await {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("Failed to parse fetched record {}: {}", record_id, e);
                None
            }
        }
    }
}

/// Builds the store field mapping for an intake payload.
///
/// Fields whose value is null, an empty or whitespace-only string, or an
/// empty list are absent from the mapping, never sent as empty.
pub fn intake_fields(
    payload: &IntakePayload,
    mode: AttachmentsMode,
) -> Result<Map<String, Value>, AppError> {
    let mut fields = Map::new();

    set_field(&mut fields, "Company Name", json!(payload.company_name));
    set_field(&mut fields, "Contact Name", json!(payload.contact_name));
    set_field(&mut fields, "Email", json!(payload.email));
    set_field(&mut fields, "Phone", json!(payload.phone));
    set_field(&mut fields, "Website", json!(payload.website));
    set_field(&mut fields, "Instagram", json!(payload.instagram));
    set_field(&mut fields, "CRM", json!(payload.crm));
    set_field(&mut fields, "Email Platform", json!(payload.email_platform));
    set_field(&mut fields, "Landing Pages", json!(payload.links.landing_pages));
    set_field(&mut fields, "Calendars", json!(payload.links.calendars));
    set_field(&mut fields, "Webinar Links", json!(payload.links.webinar_links));
    set_field(&mut fields, "Forms/Surveys", json!(payload.links.forms_surveys));
    set_field(&mut fields, "Other Tech Assets", json!(payload.links.other_assets));
    set_field(&mut fields, "Brand Voice (Text)", json!(payload.brand_voice));
    set_field(&mut fields, "Sales Pitch (Text)", json!(payload.sales_pitch));
    set_field(&mut fields, "Offer Info (Text)", json!(payload.offer_info));
    set_field(&mut fields, "Brand FAQ (Text)", json!(payload.brand_faq));
    set_field(&mut fields, "Product FAQ (Text)", json!(payload.product_faq));
    set_field(&mut fields, "Sales Guide (Text)", json!(payload.sales_guide));
    set_field(
        &mut fields,
        "Lead Qualification (Text)",
        json!(payload.lead_qualification),
    );
    set_field(&mut fields, "Credentials/API Keys", json!(payload.credentials));
    set_field(&mut fields, "Notes", json!(payload.notes));
    set_field(&mut fields, "Loom URL", json!(payload.loom_url));
    set_field(
        &mut fields,
        "Uploaded Files (names)",
        json!(payload
            .uploaded_files
            .iter()
            .map(|f| f.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")),
    );

    match mode {
        AttachmentsMode::Attachment => {
            // Prefer upload tokens from the token-upload flow, fall back to
            // the raw URL attachment list.
            let tokens: Vec<Value> = payload
                .uploaded_files
                .iter()
                .filter_map(|f| f.upload_token.as_deref())
                .map(|token| json!({ "id": token }))
                .collect();
            if !tokens.is_empty() {
                set_field(&mut fields, "Attachments", Value::Array(tokens));
            } else {
                set_field(&mut fields, "Attachments", json!(payload.attachments));
            }
        }
        AttachmentsMode::Text => {
            let urls = payload
                .attachments
                .iter()
                .map(|a| a.url.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            set_field(&mut fields, "Attachments", json!(urls));
        }
    }

    set_field(&mut fields, "Raw JSON", json!(serde_json::to_string(payload)?));

    Ok(fields)
}

fn set_field(fields: &mut Map<String, Value>, name: &str, value: Value) {
    match &value {
        Value::Null => return,
        Value::String(s) if s.trim().is_empty() => return,
        Value::Array(items) if items.is_empty() => return,
        _ => {}
    }
    fields.insert(name.to_string(), value);
}
