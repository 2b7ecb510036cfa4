use crate::config::Config;
use crate::errors::AppError;
use moka::future::Cache;
use serde::Deserialize;
use std::time::Duration;

/// Stable identifiers for a table/field pair in the record store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    pub table_id: String,
    pub field_id: String,
}

#[derive(Debug, Deserialize)]
struct SchemaResponse {
    tables: Vec<SchemaTable>,
}

#[derive(Debug, Deserialize)]
struct SchemaTable {
    id: String,
    name: String,
    fields: Vec<SchemaField>,
}

#[derive(Debug, Deserialize)]
struct SchemaField {
    id: String,
    name: String,
}

/// Resolves display names to stable field identifiers via the store's
/// schema metadata, so direct attachment uploads survive a field rename.
#[derive(Clone)]
pub struct SchemaLookup {
    client: reqwest::Client,
    api_base_url: String,
    api_key: Option<String>,
    base_id: Option<String>,
    // Successful resolutions only; a rename is picked up on expiry.
    cache: Cache<String, FieldRef>,
}

impl SchemaLookup {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create schema client: {}", e)))?;

        let cache = Cache::builder()
            .time_to_live(Duration::from_secs(3600))
            .max_capacity(1_000)
            .build();

        Ok(Self {
            client,
            api_base_url: config.store_api_base_url.clone(),
            api_key: config.store_api_key.clone(),
            base_id: config.store_base_id.clone(),
            cache,
        })
    }

    /// Looks up the identifier pair for `field_name` in `table_name` by
    /// exact name match. Never throws: missing config, a failed request,
    /// or no match all yield `None`.
    pub async fn field_id_by_name(&self, table_name: &str, field_name: &str) -> Option<FieldRef> {
        let cache_key = format!("{}::{}", table_name, field_name);
        if let Some(cached) = self.cache.get(&cache_key).await {
            tracing::debug!("Schema cache HIT for {}", cache_key);
            return Some(cached);
        }

        let resolved = self.resolve(table_name, field_name).await?;
        self.cache.insert(cache_key, resolved.clone()).await;
        Some(resolved)
    }

    async fn resolve(&self, table_name: &str, field_name: &str) -> Option<FieldRef> {
        let api_key = self.api_key.as_deref()?;
        let base_id = self.base_id.as_deref()?;
        let url = format!("{}/v0/meta/bases/{}/tables", self.api_base_url, base_id);

        let response = match self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Failed to fetch store schema: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Schema fetch returned {}: {}", status, body);
            return None;
        }

        let schema: SchemaResponse = match response.json().await {
            Ok(schema) => schema,
            Err(e) => {
                tracing::warn!("Failed to parse store schema: {}", e);
                return None;
            }
        };

        let table = schema.tables.into_iter().find(|t| t.name == table_name)?;
        let field = table.fields.into_iter().find(|f| f.name == field_name)?;
        Some(FieldRef {
            table_id: table.id,
            field_id: field.id,
        })
    }
}
