//! Server entry point.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use burncheck::Config;
use burncheck::contacts::supabase::{SupabaseConfig, SupabaseContacts};
use burncheck::provider::openai::{OpenAiClient, OpenAiConfig};
use burncheck::server::{AppState, serve};
use burncheck::speech::SpeechGateway;
use burncheck::speech::cache::AudioCache;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    info!(version = env!("CARGO_PKG_VERSION"), "starting burncheck");

    let mut openai = OpenAiConfig::new(config.openai_api_key.clone());
    openai.model = config.model.clone();
    openai.tts_model = config.tts_model.clone();
    let client = Arc::new(OpenAiClient::new(openai));

    let cache = AudioCache::open(&config.cache_path, config.cache_max_mb)
        .with_context(|| format!("failed to open audio cache at {}", config.cache_path))?;
    let speech = Arc::new(SpeechGateway::new(client.clone(), cache));
    match speech.cache_stats() {
        Ok((entries, bytes)) => {
            info!(entries, bytes, path = %config.cache_path, "audio cache ready");
        }
        Err(err) => warn!(error = %err, path = %config.cache_path, "audio cache stats unavailable"),
    }

    let contacts = Arc::new(SupabaseContacts::new(SupabaseConfig {
        url: config.supabase_url.clone(),
        service_role_key: config.supabase_service_role_key.clone(),
        table: config.contacts_table.clone(),
    }));

    let state = AppState {
        model: client,
        speech,
        contacts,
    };

    serve(state, config.addr).await
}
