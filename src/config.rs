use serde::Deserialize;

/// Default primary automation webhook (n8n).
pub const DEFAULT_WEBHOOK_URL: &str =
    "https://n8n.techifyserver.com/webhook/1ffccbab-f785-438e-b85e-b831271e6d58";

/// Default secondary (form) automation webhook (n8n).
pub const DEFAULT_FORM_WEBHOOK_URL: &str =
    "https://n8n.techifyserver.com/webhook/19c4b559-64ea-4b6a-ab11-eb98745d58f9";

const DEFAULT_STORE_API_BASE_URL: &str = "https://api.airtable.com";
const DEFAULT_STORE_CONTENT_BASE_URL: &str = "https://content.airtable.com";

/// How uploaded files end up in the record store's Attachments field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentsMode {
    /// Attachment objects: upload-token references, or raw URL attachments.
    Attachment,
    /// Comma-joined URL string written into a long-text field.
    Text,
}

impl AttachmentsMode {
    fn parse(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "attachment" => AttachmentsMode::Attachment,
            "text" => AttachmentsMode::Text,
            other => {
                tracing::warn!(
                    "Unknown AIRTABLE_ATTACHMENTS_MODE '{}', falling back to 'attachment'",
                    other
                );
                AttachmentsMode::Attachment
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Record store credentials. Optional at load time: a missing value
    /// fails the operation that needs it, not server startup.
    pub store_api_key: Option<String>,
    pub store_base_id: Option<String>,
    pub store_table_name: Option<String>,
    pub attachments_mode: AttachmentsMode,
    /// Base URL for the store's REST API (records, schema metadata).
    pub store_api_base_url: String,
    /// Base URL for the store's content API (direct attachment upload).
    pub store_content_base_url: String,
    pub webhook_url: String,
    pub form_webhook_url: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            store_api_key: optional_env("AIRTABLE_API_KEY"),
            store_base_id: optional_env("AIRTABLE_BASE_ID"),
            store_table_name: optional_env("AIRTABLE_TABLE_NAME"),
            attachments_mode: AttachmentsMode::parse(
                &std::env::var("AIRTABLE_ATTACHMENTS_MODE")
                    .unwrap_or_else(|_| "attachment".to_string()),
            ),
            store_api_base_url: url_env("AIRTABLE_API_BASE_URL", DEFAULT_STORE_API_BASE_URL)?,
            store_content_base_url: url_env(
                "AIRTABLE_CONTENT_BASE_URL",
                DEFAULT_STORE_CONTENT_BASE_URL,
            )?,
            webhook_url: url_env("N8N_WEBHOOK_URL", DEFAULT_WEBHOOK_URL)?,
            form_webhook_url: url_env("N8N_FORM_WEBHOOK_URL", DEFAULT_FORM_WEBHOOK_URL)?,
        };

        // Log successful configuration load (without sensitive values)
        if config.store_api_key.is_none() {
            tracing::warn!("AIRTABLE_API_KEY not set; record creation will fail until configured");
        }
        tracing::debug!("Store API base URL: {}", config.store_api_base_url);
        tracing::debug!("Store content base URL: {}", config.store_content_base_url);
        tracing::debug!("Attachments mode: {:?}", config.attachments_mode);
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}

fn url_env(name: &str, default: &str) -> anyhow::Result<String> {
    let value = std::env::var(name)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default.to_string());
    if !value.starts_with("http://") && !value.starts_with("https://") {
        anyhow::bail!("{} must start with http:// or https://", name);
    }
    // Trailing slashes break path-segment joins later on
    Ok(value.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_mode_falls_back_to_attachment() {
        assert_eq!(
            AttachmentsMode::parse("attachment"),
            AttachmentsMode::Attachment
        );
        assert_eq!(AttachmentsMode::parse("TEXT"), AttachmentsMode::Text);
        assert_eq!(AttachmentsMode::parse("bogus"), AttachmentsMode::Attachment);
    }
}
