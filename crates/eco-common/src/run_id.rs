//! Identifiers that tie log lines to the match they belong to.
//!
//! `instance()` names the running eco-api process and shows up in `/health`
//! and in panic events. `generate()` stamps each pipeline run; the same value
//! is logged when the run starts and finishes and is returned as `run_id`.

use once_cell::sync::Lazy;
use ulid::Ulid;

static INSTANCE_ID: Lazy<String> = Lazy::new(|| Ulid::new().to_string());

/// Stable for the process lifetime.
#[inline]
pub fn instance() -> &'static str {
    &INSTANCE_ID
}

/// Time-ordered, so ids of later runs sort after earlier ones.
#[inline]
pub fn generate() -> String {
    Ulid::new().to_string()
}
