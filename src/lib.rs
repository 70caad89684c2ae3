//! burncheck - voice-driven burnout self-assessment
//!
//! This crate provides:
//! - An interview session state machine (question sequencing, answer
//!   capture, classification gating, submission)
//! - Gateways to the hosted model: speech synthesis with a persistent
//!   audio cache, free-text classification, transcript scoring
//! - Contact capture into a hosted Postgres table
//! - The HTTP server the frontend talks to

pub mod assess;
pub mod classify;
pub mod config;
pub mod contacts;
pub mod interview;
pub mod provider;
pub mod server;
pub mod speech;
pub mod utils;

pub use config::Config;
