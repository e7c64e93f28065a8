use anyhow::{anyhow, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::AirtableConfig;

/// One record as Airtable returns it from a list call.
#[derive(Debug, Clone, Deserialize)]
pub struct AirtableRecord {
    pub id: String,
    #[serde(rename = "createdTime")]
    pub created_time: Option<String>,
    #[serde(default)]
    pub fields: Value,
}

/// Minimal Airtable REST client used by the ingest cataloger and the
/// markdown exporter
#[derive(Debug, Clone)]
pub struct AirtableClient {
    client: reqwest::Client,
    api_key: String,
    base_id: String,
}

impl AirtableClient {
    pub fn from_config(config: &AirtableConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| anyhow!("AIRTABLE_API_KEY is not configured"))?;
        let base_id = config
            .base_id
            .clone()
            .ok_or_else(|| anyhow!("Airtable base ID is not configured"))?;
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_id,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("https://api.airtable.com/v0/{}/{}", self.base_id, table)
    }

    /// Find the first record matching a formula, returning its record ID.
    pub async fn find_first(&self, table: &str, formula: &str) -> Result<Option<String>> {
        debug!("Searching {} for {}", table, formula);

        let response = self
            .client
            .get(self.table_url(table))
            .bearer_auth(&self.api_key)
            .query(&[("maxRecords", "1"), ("filterByFormula", formula)])
            .send()
            .await?
            .error_for_status()?;

        let body: Value = response.json().await?;
        let id = body["records"]
            .as_array()
            .and_then(|records| records.first())
            .and_then(|r| r["id"].as_str())
            .map(str::to_string);

        Ok(id)
    }

    /// List every record in a view, following Airtable's pagination
    /// offsets until the last page.
    pub async fn list_view_records(&self, table: &str, view: &str) -> Result<Vec<AirtableRecord>> {
        let mut records = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(self.table_url(table))
                .bearer_auth(&self.api_key)
                .query(&[("view", view)]);
            if let Some(cursor) = &offset {
                request = request.query(&[("offset", cursor.as_str())]);
            }

            let body: Value = request.send().await?.error_for_status()?.json().await?;
            let page: Vec<AirtableRecord> = serde_json::from_value(body["records"].clone())?;
            debug!("Fetched page of {} records from {}", page.len(), table);
            records.extend(page);

            match body["offset"].as_str() {
                Some(cursor) => offset = Some(cursor.to_string()),
                None => break,
            }
        }

        info!("📋 Fetched {} records from {}/{}", records.len(), table, view);
        Ok(records)
    }

    /// Create one record with the given fields.
    pub async fn create_record(&self, table: &str, fields: Value) -> Result<Value> {
        let response = self
            .client
            .post(self.table_url(table))
            .bearer_auth(&self.api_key)
            .json(&json!({ "fields": fields }))
            .send()
            .await?
            .error_for_status()?;

        let record: Value = response.json().await?;
        info!(
            "📋 Created {} record {}",
            table,
            record["id"].as_str().unwrap_or("?")
        );
        Ok(record)
    }
}
