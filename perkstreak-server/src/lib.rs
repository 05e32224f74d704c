//! Perkstreak in-browser WASM server.
//!
//! Exports `handle_request(method, path, query, body)` for the Web Worker
//! bridge to call. Uses `matchit` for URL routing — the same router
//! engine that powers Axum.
//!
//! All tracker state (catalog, progress, settings, selection, overlay
//! bridge) lives in the worker for the whole browser session; durable
//! values are mirrored to `localStorage` through `/api/store/*`.

use wasm_bindgen::prelude::*;

pub mod catalog;
pub mod error;
pub mod routes;
pub mod tracker;

/// Process an HTTP-like request and return an HTML fragment.
///
/// Called from JavaScript (Web Worker) via wasm-bindgen.
///
/// # Arguments
/// * `method` — HTTP method (e.g., "GET", "POST")
/// * `path`   — URL path (e.g., "/api/perks/assign")
/// * `query`  — Query string (e.g., "?role=killers&search=bond")
/// * `body`   — Request body (e.g., POST form data). Empty string for GET requests.
///
/// # Returns
/// An HTML string fragment suitable for HTMX to swap into the DOM, or JSON
/// for the store snapshot and progress summary routes.
#[wasm_bindgen]
pub fn handle_request(method: &str, path: &str, query: &str, body: &str) -> String {
    // Build the router. matchit compiles route patterns into a radix tree.
    let mut router = matchit::Router::new();

    // Register routes — the value is a &str tag we match on below
    router.insert("/api/catalog", "catalog").ok();
    router.insert("/api/view", "view").ok();

    router.insert("/api/characters", "characters").ok();
    router.insert("/api/characters/select", "characters_select").ok();
    router.insert("/api/characters/complete", "characters_complete").ok();
    router.insert("/api/characters/order", "characters_order").ok();

    router.insert("/api/perks", "perks").ok();
    router.insert("/api/perks/assign", "perks_assign").ok();
    router.insert("/api/perks/remove", "perks_remove").ok();
    router.insert("/api/perks/random", "perks_random").ok();

    router.insert("/api/reset", "reset").ok();
    router.insert("/api/settings", "settings").ok();

    router.insert("/api/store/snapshot", "store_snapshot").ok();
    router.insert("/api/store/restore", "store_restore").ok();

    router.insert("/api/progress/export", "progress_export").ok();
    router.insert("/api/progress/import", "progress_import").ok();
    router.insert("/api/progress/summary", "progress_summary").ok();

    router.insert("/api/overlay/status", "overlay_status").ok();
    router.insert("/api/overlay/outcome", "overlay_outcome").ok();
    router.insert("/api/overlay/retry", "overlay_retry").ok();
    router.insert("/api/overlay/settings", "overlay_settings").ok();

    match router.at(path) {
        Ok(matched) => match (*matched.value, method) {
            ("catalog", "POST") => routes::page::handle_catalog_post(query, body),
            ("view", "GET") => routes::page::handle_view_get(query),

            ("characters", "GET") => routes::characters::handle_list_get(query),
            ("characters_select", "POST") => routes::characters::handle_select_post(body),
            ("characters_complete", "POST") => routes::characters::handle_complete_post(body),
            ("characters_order", "POST") => routes::characters::handle_order_post(body),

            ("perks", "GET") => routes::perks::handle_pool_get(query),
            ("perks_assign", "POST") => routes::perks::handle_assign_post(body),
            ("perks_remove", "POST") => routes::perks::handle_remove_post(body),
            ("perks_random", "POST") => routes::perks::handle_random_post(body),

            ("reset", "POST") => routes::progress::handle_reset_post(body),
            ("settings", "GET") => routes::settings::handle_settings_get(query),
            ("settings", "POST") => routes::settings::handle_settings_post(body),

            ("store_snapshot", "GET") => routes::store::handle_snapshot_get(query),
            ("store_restore", "POST") => routes::store::handle_restore_post(body),

            ("progress_export", "GET") => routes::progress::handle_export_get(query),
            ("progress_import", "POST") => routes::progress::handle_import_post(body),
            ("progress_summary", "GET") => routes::progress::handle_summary_get(query),

            ("overlay_status", "GET") => routes::overlay::handle_status_get(query),
            ("overlay_outcome", "POST") => routes::overlay::handle_outcome_post(body),
            ("overlay_retry", "POST") => routes::overlay::handle_retry_post(body),
            ("overlay_settings", "POST") => routes::overlay::handle_settings_post(body),

            _ => method_not_allowed(),
        },
        Err(_) => not_found(),
    }
}

fn not_found() -> String {
    r#"<span class="text-streak-red">404 — route not found</span>"#.to_string()
}

fn method_not_allowed() -> String {
    r#"<span class="text-streak-red">405 — method not allowed</span>"#.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::SAMPLE_JSON;
    use crate::tracker::state::{AppState, replace_state, with_state};

    fn reset_state() {
        replace_state(AppState::default());
    }

    fn load() {
        reset_state();
        handle_request("POST", "/api/catalog", "", SAMPLE_JSON);
    }

    #[test]
    fn returns_404_for_unknown_route() {
        let html = handle_request("GET", "/api/nonexistent", "", "");
        assert!(html.contains("404"));
    }

    #[test]
    fn returns_405_for_wrong_method() {
        let html = handle_request("POST", "/api/view", "", "");
        assert!(html.contains("405"));
        let html = handle_request("GET", "/api/perks/assign", "", "");
        assert!(html.contains("405"));
    }

    #[test]
    fn routes_view_get() {
        load();
        let html = handle_request("GET", "/api/view", "?role=survivors", "");
        assert!(html.contains("Dwight Fairfield"));
        reset_state();
    }

    #[test]
    fn completion_protection_scenario() {
        load();
        handle_request("POST", "/api/settings", "", "key=perks_locked&value=false");
        handle_request("POST", "/api/perks/assign", "", "perk=p1&character=the-trapper");
        handle_request("POST", "/api/characters/complete", "", "action=mark&character=the-trapper");
        handle_request("POST", "/api/characters/select", "", "character=the-wraith");

        let html = handle_request("POST", "/api/perks/assign", "", "perk=p1");
        assert!(html.contains("who is completed"));
        with_state(|s| assert_eq!(s.progress.assignment.owner_of("p1"), Some("the-trapper")));

        handle_request(
            "POST",
            "/api/settings",
            "",
            "key=allow_remove_from_completed&value=true",
        );
        handle_request("POST", "/api/perks/assign", "", "perk=p1");
        with_state(|s| assert_eq!(s.progress.assignment.owner_of("p1"), Some("the-wraith")));
        reset_state();
    }

    #[test]
    fn export_then_import_round_trips() {
        load();
        handle_request("POST", "/api/perks/assign", "", "perk=s3&character=claudette");
        handle_request("POST", "/api/characters/complete", "", "action=toggle&character=dwight");
        let before = with_state(|s| s.progress.clone());
        let blob = with_state(|s| {
            serde_json::to_string(&tracker::storage::export(&s.progress, chrono::Utc::now())).unwrap()
        });

        handle_request("POST", "/api/reset", "", "role=survivors&scope=all");
        with_state(|s| assert!(s.progress.completed.is_empty()));

        let html = handle_request("POST", "/api/progress/import", "", &blob);
        assert!(html.contains("successfully"));
        with_state(|s| assert_eq!(s.progress, before));
        reset_state();
    }

    #[test]
    fn routes_store_snapshot_is_json() {
        load();
        handle_request("POST", "/api/settings", "", "key=colorful_perks");
        let json = handle_request("GET", "/api/store/snapshot", "", "");
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["dbd_colorful_perks"], "true");
        reset_state();
    }

    #[test]
    fn routes_overlay_status_get() {
        reset_state();
        let html = handle_request("GET", "/api/overlay/status", "", "");
        assert!(html.contains("overlay-status"));
    }
}
