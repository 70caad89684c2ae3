//! Persistent audio cache.
//!
//! Synthesized question audio is stored as SQLite BLOBs keyed by a
//! SHA-256 hash of the (voice, instructions, input) triple, so repeat
//! requests for the same spoken question never hit the upstream TTS
//! API. Total size is bounded with LRU eviction on an access sequence
//! counter.

use anyhow::{Context, Result};
use rusqlite::{Connection, params};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::provider::SpeechRequest;

/// The triple that identifies one synthesized utterance.
#[derive(Debug, Clone, Serialize)]
pub struct AudioKey<'a> {
    pub voice: &'a str,
    pub instructions: &'a str,
    pub input: &'a str,
}

impl<'a> From<&'a SpeechRequest> for AudioKey<'a> {
    fn from(req: &'a SpeechRequest) -> Self {
        Self {
            voice: &req.voice,
            instructions: &req.instructions,
            input: &req.input,
        }
    }
}

/// SQLite BLOB store for synthesized audio.
pub struct AudioCache {
    conn: Connection,
    /// Maximum total size of cached audio in bytes.
    max_total_bytes: u64,
}

impl AudioCache {
    /// Open (or create) a cache database at the given path with a
    /// max total size in megabytes.
    pub fn open(db_path: &str, max_total_size_mb: u64) -> Result<Self> {
        let conn = Connection::open(db_path).context("failed to open audio cache database")?;
        let cache = Self {
            conn,
            max_total_bytes: max_total_size_mb * 1024 * 1024,
        };
        cache.init_schema()?;
        Ok(cache)
    }

    /// Create an in-memory cache (for testing).
    pub fn in_memory(max_total_size_mb: u64) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let cache = Self {
            conn,
            max_total_bytes: max_total_size_mb * 1024 * 1024,
        };
        cache.init_schema()?;
        Ok(cache)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
            CREATE TABLE IF NOT EXISTS audio_cache (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                cache_key TEXT NOT NULL UNIQUE,
                voice TEXT NOT NULL,
                instructions TEXT NOT NULL,
                input TEXT NOT NULL,
                audio_data BLOB NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                last_used_at TEXT NOT NULL DEFAULT (datetime('now')),
                use_count INTEGER NOT NULL DEFAULT 1,
                access_seq INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_audio_cache_key ON audio_cache(cache_key);
            CREATE INDEX IF NOT EXISTS idx_audio_cache_seq ON audio_cache(access_seq);
            ",
            )
            .context("failed to initialize audio cache schema")?;
        Ok(())
    }

    /// Look up cached audio by synthesis triple.
    ///
    /// On hit, bumps the access metadata used for LRU ordering.
    pub fn lookup(&self, key: &AudioKey<'_>) -> Result<Option<Vec<u8>>> {
        let hash = cache_key(key);

        let result = self.conn.query_row(
            "SELECT audio_data FROM audio_cache WHERE cache_key = ?1",
            params![hash],
            |row| row.get::<_, Vec<u8>>(0),
        );

        match result {
            Ok(audio) => {
                self.conn.execute(
                    "UPDATE audio_cache SET last_used_at = datetime('now'), use_count = use_count + 1, access_seq = (SELECT COALESCE(MAX(access_seq), 0) + 1 FROM audio_cache) WHERE cache_key = ?1",
                    params![hash],
                )?;
                debug!(cache_key = %hash, "audio cache hit");
                Ok(Some(audio))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                debug!(cache_key = %hash, "audio cache miss");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Write-through insert. Same triple always maps to the same key,
    /// so replacing an existing row is harmless.
    pub fn insert(&self, key: &AudioKey<'_>, audio_data: &[u8]) -> Result<()> {
        let hash = cache_key(key);

        self.conn.execute(
            "INSERT OR REPLACE INTO audio_cache
             (cache_key, voice, instructions, input, audio_data, access_seq)
             VALUES (?1, ?2, ?3, ?4, ?5, (SELECT COALESCE(MAX(access_seq), 0) + 1 FROM audio_cache))",
            params![hash, key.voice, key.instructions, key.input, audio_data],
        )?;

        debug!(cache_key = %hash, bytes = audio_data.len(), "audio cache insert");

        self.evict_if_needed()?;
        Ok(())
    }

    /// Total size of cached audio data in bytes.
    pub fn total_size_bytes(&self) -> Result<u64> {
        let size: i64 = self
            .conn
            .query_row(
                "SELECT COALESCE(SUM(length(audio_data)), 0) FROM audio_cache",
                [],
                |row| row.get(0),
            )
            .context("failed to query total cache size")?;
        Ok(size as u64)
    }

    /// Number of cached entries.
    pub fn entry_count(&self) -> Result<u64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM audio_cache", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Evict least-recently-used entries until total size is within the limit.
    fn evict_if_needed(&self) -> Result<()> {
        loop {
            let total = self.total_size_bytes()?;
            if total <= self.max_total_bytes {
                break;
            }

            let deleted = self.conn.execute(
                "DELETE FROM audio_cache WHERE id = (
                    SELECT id FROM audio_cache ORDER BY access_seq ASC LIMIT 1
                )",
                [],
            )?;

            if deleted == 0 {
                break; // safety: no rows left
            }

            debug!(
                total_bytes = total,
                limit_bytes = self.max_total_bytes,
                "audio cache: evicted LRU entry"
            );
        }
        Ok(())
    }
}

/// SHA-256 over the canonical JSON form of the synthesis triple.
pub fn cache_key(key: &AudioKey<'_>) -> String {
    let canonical = serde_json::to_string(key).expect("cache key serialization should not fail");
    let hash = Sha256::digest(canonical.as_bytes());
    hex::encode(hash)
}
