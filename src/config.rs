//! Runtime configuration.
//!
//! All knobs come from the environment (or flags, which mainly help
//! local development). Upstream credentials are required; everything
//! else has a sensible default.

use std::net::SocketAddr;

use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "burncheck", version, about = "Voice-driven burnout self-assessment service")]
pub struct Config {
    /// Address to listen on.
    #[arg(long, env = "BURNCHECK_ADDR", default_value = "127.0.0.1:8787")]
    pub addr: SocketAddr,

    /// OpenAI API key.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: String,

    /// Model for classification and scoring calls.
    #[arg(long, env = "BURNCHECK_MODEL", default_value = "gpt-4o-mini")]
    pub model: String,

    /// Model for speech synthesis.
    #[arg(long, env = "BURNCHECK_TTS_MODEL", default_value = "gpt-4o-mini-tts")]
    pub tts_model: String,

    /// Path of the audio cache database.
    #[arg(long, env = "BURNCHECK_CACHE_PATH", default_value = "burncheck-audio-cache.db")]
    pub cache_path: String,

    /// Audio cache size bound in megabytes (LRU beyond this).
    #[arg(long, env = "BURNCHECK_CACHE_MAX_MB", default_value_t = 500)]
    pub cache_max_mb: u64,

    /// Supabase project URL.
    #[arg(long, env = "SUPABASE_URL")]
    pub supabase_url: String,

    /// Supabase service-role key (server-only).
    #[arg(long, env = "SUPABASE_SERVICE_ROLE_KEY", hide_env_values = true)]
    pub supabase_service_role_key: String,

    /// Contacts table name.
    #[arg(long, env = "BURNCHECK_CONTACTS_TABLE", default_value = "contacts")]
    pub contacts_table: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_in() {
        let config = Config::try_parse_from([
            "burncheck",
            "--openai-api-key",
            "sk-test",
            "--supabase-url",
            "https://x.supabase.co",
            "--supabase-service-role-key",
            "key",
        ])
        .unwrap();
        assert_eq!(config.addr.port(), 8787);
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.cache_max_mb, 500);
        assert_eq!(config.contacts_table, "contacts");
    }

    #[test]
    fn missing_api_key_is_an_error() {
        // Only meaningful when the env var isn't set in the test
        // environment.
        if std::env::var("OPENAI_API_KEY").is_err() {
            let result = Config::try_parse_from([
                "burncheck",
                "--supabase-url",
                "https://x.supabase.co",
                "--supabase-service-role-key",
                "key",
            ]);
            assert!(result.is_err());
        }
    }
}
