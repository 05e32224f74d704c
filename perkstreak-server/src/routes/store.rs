//! `/api/store/*` routes — the localStorage mirror.
//!
//! The page restores the worker's store from `localStorage` once at
//! startup, and can pull a full snapshot at any time. Mutating routes also
//! write through on their own (see `with_effects`).

use std::collections::BTreeMap;
use tracing::debug;

use crate::routes::util::{get_param, parse_form_body};
use crate::routes::{render_page, view_query, with_effects};
use crate::tracker::state::with_state_mut;
use crate::tracker::storage::keys;

/// Handle GET /api/store/snapshot
/// Returns every stored key as a JSON object of key → raw string.
pub fn handle_snapshot_get(_query: &str) -> String {
    with_state_mut(|s| {
        s.store.mark_clean();
        s.store.snapshot_json()
    })
}

/// Handle POST /api/store/restore
/// Body is a JSON object of key → raw string, raw or as `state=<json>`.
/// Unrelated keys are ignored. Returns the page for the restored state.
pub fn handle_restore_post(body: &str) -> String {
    let json = if body.trim_start().starts_with('{') {
        body.to_string()
    } else {
        let params = parse_form_body(body);
        get_param(&params, "state").unwrap_or("").to_string()
    };
    let entries: BTreeMap<String, String> = match serde_json::from_str(&json) {
        Ok(e) => e,
        Err(e) => return format!("error: {}", e),
    };
    let known: Vec<(String, String)> = entries
        .into_iter()
        .filter(|(k, _)| keys::ALL.contains(&k.as_str()))
        .collect();
    debug!(keys = known.len(), "restoring store");

    with_state_mut(|s| {
        s.restore_store(known);
        // Only values rewritten by pruning are written back.
        let q = view_query(&[], s);
        let page = render_page(s, &q);
        with_effects(page, s)
    })
}
