//! Contact capture gateway.
//!
//! One row per session into a hosted contacts table. The store is a
//! trait so the session controller and HTTP handler can be tested
//! against an in-memory implementation.

pub mod supabase;

use std::sync::Mutex;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::utils::digit_count;

/// Minimum digits for a phone number to be considered dialable.
const MIN_PHONE_DIGITS: usize = 7;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    // Deliberately loose: one @, no whitespace, a dot in the domain.
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid")
});

/// One captured contact. All fields optional at the type level; which
/// ones are required depends on the entry point (the HTTP endpoint
/// requires email, the session form accepts email and optional phone).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

#[derive(Debug, Error)]
pub enum ContactError {
    #[error("email required")]
    EmailRequired,

    #[error("invalid email address")]
    InvalidEmail,

    #[error("phone number needs at least {MIN_PHONE_DIGITS} digits")]
    InvalidPhone,
}

pub fn valid_email(s: &str) -> bool {
    EMAIL_RE.is_match(s)
}

pub fn valid_phone(s: &str) -> bool {
    digit_count(s) >= MIN_PHONE_DIGITS
}

impl ContactRecord {
    /// Session-form validation: a well-formed email is required, and a
    /// phone number, when given, must look dialable.
    pub fn validate(&self) -> Result<(), ContactError> {
        let email = self.email.as_deref().ok_or(ContactError::EmailRequired)?;
        if !valid_email(email) {
            return Err(ContactError::InvalidEmail);
        }
        if let Some(phone) = self.phone.as_deref()
            && !phone.trim().is_empty()
            && !valid_phone(phone)
        {
            return Err(ContactError::InvalidPhone);
        }
        Ok(())
    }
}

/// Destination for captured contacts.
#[async_trait]
pub trait ContactStore: Send + Sync {
    /// Insert one row. No idempotency key: a retried request can
    /// create a duplicate row.
    async fn insert(&self, record: &ContactRecord) -> anyhow::Result<()>;

    /// Human-readable store name.
    fn name(&self) -> &str;
}

// ── In-memory store (tests) ──────────────────────────────────────

/// Collects records in memory; optionally fails every insert.
pub struct MemoryContacts {
    records: Mutex<Vec<ContactRecord>>,
    fail: bool,
}

impl MemoryContacts {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn records(&self) -> Vec<ContactRecord> {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Default for MemoryContacts {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContactStore for MemoryContacts {
    async fn insert(&self, record: &ContactRecord) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("scripted insert failure");
        }
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
