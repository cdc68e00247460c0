//! Ambient, process-wide runtime context.
//!
//! Two pieces of state live here for the whole life of the process:
//! - the node identifier stamped into execution stats, resolved once on first
//!   use from `STRATA_NODE_ID` or generated as a UUID;
//! - the warn-once registry. It starts empty, a key is checked-and-inserted
//!   under a single lock, and entries are never removed.

use std::collections::HashSet;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use uuid::Uuid;

use crate::config::BlockConfig;

static NODE_ID: Lazy<String> = Lazy::new(|| {
    BlockConfig::from_env()
        .node_id
        .unwrap_or_else(|| Uuid::new_v4().simple().to_string())
});

static LOGGED_KEYS: Lazy<Mutex<HashSet<String>>> = Lazy::new(|| Mutex::new(HashSet::new()));

/// Identifier of the node this process runs on.
pub fn node_id() -> &'static str {
    NODE_ID.as_str()
}

/// Returns `true` the first time it is called with `key` in this process and
/// `false` afterwards. Safe to call from any thread.
pub fn log_once(key: &str) -> bool {
    let mut seen = LOGGED_KEYS.lock().unwrap_or_else(|e| e.into_inner());
    if seen.contains(key) {
        return false;
    }
    seen.insert(key.to_string())
}
