use crate::config::Config;
use crate::errors::AppError;
use crate::models::{StoreRecord, WebhookResult};
use std::time::Duration;

/// Fans created records out to the downstream automation webhooks.
///
/// Both destinations get the same JSON array of records. Delivery is
/// best-effort by contract: a failed or unreachable endpoint reduces to
/// `{ok: false}` and never changes the submission's outcome.
#[derive(Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    webhook_url: String,
    form_webhook_url: String,
}

impl WebhookNotifier {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create webhook client: {}", e)))?;

        Ok(Self {
            client,
            webhook_url: config.webhook_url.clone(),
            form_webhook_url: config.form_webhook_url.clone(),
        })
    }

    pub async fn notify_primary(&self, records: &[StoreRecord]) -> WebhookResult {
        self.post_records(&self.webhook_url, records).await
    }

    pub async fn notify_secondary(&self, records: &[StoreRecord]) -> WebhookResult {
        self.post_records(&self.form_webhook_url, records).await
    }

    async fn post_records(&self, url: &str, records: &[StoreRecord]) -> WebhookResult {
        match self.client.post(url).json(&records).send().await {
            Ok(response) => {
                let status = response.status();
                if !status.is_success() {
                    tracing::warn!("Webhook {} answered {}", url, status);
                }
                WebhookResult {
                    ok: status.is_success(),
                    status: Some(status.as_u16()),
                }
            }
            Err(e) => {
                tracing::error!("Webhook delivery to {} failed: {}", url, e);
                WebhookResult {
                    ok: false,
                    status: None,
                }
            }
        }
    }
}
