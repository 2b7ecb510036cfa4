use crate::config::Config;
use crate::errors::AppError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

/// Files above this size are never attached directly to a record.
pub const MAX_DIRECT_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

/// Result of a direct record-field upload. Failures carry the upstream
/// status and body for the log, nothing more.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadOutcome {
    pub ok: bool,
    pub status: Option<u16>,
    pub body: Option<String>,
}

/// Client for the store's two attachment upload paths: the token upload
/// (reusable attachment token, consumed at record creation) and the direct
/// upload into a field of an existing record.
#[derive(Clone)]
pub struct AttachmentClient {
    client: reqwest::Client,
    api_base_url: String,
    content_base_url: String,
    api_key: Option<String>,
    base_id: Option<String>,
}

impl AttachmentClient {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                AppError::Internal(format!("Failed to create attachment client: {}", e))
            })?;

        Ok(Self {
            client,
            api_base_url: config.store_api_base_url.clone(),
            content_base_url: config.store_content_base_url.clone(),
            api_key: config.store_api_key.clone(),
            base_id: config.store_base_id.clone(),
        })
    }

    fn credentials(&self) -> Result<(&str, &str), AppError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::Config("Missing required env var: AIRTABLE_API_KEY".into()))?;
        let base_id = self
            .base_id
            .as_deref()
            .ok_or_else(|| AppError::Config("Missing required env var: AIRTABLE_BASE_ID".into()))?;
        Ok((api_key, base_id))
    }

    /// Uploads file bytes for a reusable attachment token.
    ///
    /// The store exposes two endpoint variants for this; a 404 from the
    /// primary triggers exactly one retry against the alternate path. Any
    /// other failure is terminal for the file and yields `Ok(None)`, so a
    /// single unuploadable file never sinks the submission.
    pub async fn upload_for_token(
        &self,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<Option<String>, AppError> {
        let (api_key, base_id) = self.credentials()?;

        let primary = format!("{}/v0/bases/{}/attachments", self.api_base_url, base_id);
        let fallback = format!("{}/v0/{}/attachments", self.api_base_url, base_id);

        let mut response = self
            .client
            .post(&primary)
            .header("Authorization", format!("Bearer {}", api_key))
            .multipart(token_upload_form(filename, content_type, bytes.clone()))
            .send()
            .await
            .map_err(|e| AppError::ExternalApi(format!("Token upload request failed: {}", e)))?;

        if !response.status().is_success() {
            let first_status = response.status();
            let first_body = response.text().await.unwrap_or_default();
            if first_status == reqwest::StatusCode::NOT_FOUND {
                response = self
                    .client
                    .post(&fallback)
                    .header("Authorization", format!("Bearer {}", api_key))
                    .multipart(token_upload_form(filename, content_type, bytes))
                    .send()
                    .await
                    .map_err(|e| {
                        AppError::ExternalApi(format!("Token upload request failed: {}", e))
                    })?;
                if !response.status().is_success() {
                    let body = response.text().await.unwrap_or_default();
                    tracing::error!(
                        "Token upload failed 404 on both endpoints for '{}': primary='{}' fallback='{}'",
                        filename,
                        first_body,
                        body
                    );
                    return Ok(None);
                }
            } else {
                tracing::error!(
                    "Token upload failed for '{}': {} {}",
                    filename,
                    first_status,
                    first_body
                );
                return Ok(None);
            }
        }

        let body: Value = response.json().await.map_err(|e| {
            AppError::ExternalApi(format!("Failed to parse token upload response: {}", e))
        })?;

        Ok(extract_token(&body))
    }

    /// Attaches raw bytes directly to a field of an existing record.
    ///
    /// Failure is reduced to an `ok: false` outcome and logged; only missing
    /// configuration bubbles up, and the orchestrator's best-effort block
    /// swallows even that.
    pub async fn upload_to_record(
        &self,
        record_id: &str,
        field: &str,
        filename: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<UploadOutcome, AppError> {
        let (api_key, base_id) = self.credentials()?;

        let mut url = Url::parse(&self.content_base_url)
            .map_err(|e| AppError::Internal(format!("Invalid content base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| AppError::Internal("Content base URL cannot hold a path".into()))?
            .extend(["v0", base_id, record_id, field, "uploadAttachment"]);

        let body = json!({
            "contentType": content_type,
            "file": BASE64.encode(bytes),
            "filename": filename,
        });

        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ExternalApi(format!("Direct upload request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                "Direct attachment upload failed for '{}': {} {}",
                filename,
                status,
                body
            );
            return Ok(UploadOutcome {
                ok: false,
                status: Some(status.as_u16()),
                body: Some(body),
            });
        }

        tracing::info!("✓ Attached '{}' to record {}", filename, record_id);
        Ok(UploadOutcome {
            ok: true,
            status: None,
            body: None,
        })
    }
}

fn token_upload_form(filename: &str, content_type: &str, bytes: Vec<u8>) -> Form {
    let mime = if content_type.is_empty() {
        "application/octet-stream"
    } else {
        content_type
    };
    // A client-supplied content type may not parse as a mime; send untyped then.
    let part = match Part::bytes(bytes.clone())
        .file_name(filename.to_string())
        .mime_str(mime)
    {
        Ok(part) => part,
        Err(_) => Part::bytes(bytes).file_name(filename.to_string()),
    };
    Form::new().part("file", part)
}

/// The upload API answers with one of three shapes; first match wins.
fn extract_token(body: &Value) -> Option<String> {
    body.get("id")
        .and_then(Value::as_str)
        .or_else(|| {
            body.get("attachment")
                .and_then(|a| a.get("id"))
                .and_then(Value::as_str)
        })
        .or_else(|| body.get("token").and_then(Value::as_str))
        .map(str::to_string)
}
