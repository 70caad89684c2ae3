//! Supabase-backed contact store.
//!
//! Inserts rows through the PostgREST endpoint
//! (`POST {url}/rest/v1/{table}`) using the service-role key. Single
//! shot, no retry; PostgREST enforces the table schema.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use tracing::debug;

use super::{ContactRecord, ContactStore};

/// Configuration for [`SupabaseContacts`].
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://xyzcompany.supabase.co`.
    pub url: String,
    /// Service-role key (server-only, bypasses row-level security).
    pub service_role_key: String,
    /// Target table.
    pub table: String,
}

pub struct SupabaseContacts {
    config: SupabaseConfig,
    client: reqwest::Client,
}

impl SupabaseContacts {
    pub fn new(config: SupabaseConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ContactStore for SupabaseContacts {
    async fn insert(&self, record: &ContactRecord) -> Result<()> {
        let endpoint = format!(
            "{}/rest/v1/{}",
            self.config.url.trim_end_matches('/'),
            self.config.table
        );

        let response = self
            .client
            .post(&endpoint)
            .header("apikey", &self.config.service_role_key)
            .bearer_auth(&self.config.service_role_key)
            .header("Prefer", "return=minimal")
            .json(record)
            .send()
            .await
            .context("contact insert request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("contact insert returned {status}: {body}");
        }

        debug!(table = %self.config.table, "contact row inserted");
        Ok(())
    }

    fn name(&self) -> &str {
        "supabase"
    }
}
