//! `/api/catalog` and `/api/view` — catalog loading and whole-page renders.

use crate::routes::render::notice_error;
use crate::routes::util::{get_param, parse_form_body, parse_query};
use crate::routes::{render_page, view_query, with_effects};
use crate::tracker::state::with_state_mut;

// ── POST /api/catalog ──────────────────────────────────────────────

/// Handle POST /api/catalog
/// Body is the `characters.json` document, raw or as `catalog=<json>`.
/// Returns the page for the requested role, or the degraded page plus an
/// error notice when the document can't be parsed.
pub fn handle_catalog_post(query: &str, body: &str) -> String {
    let json = if body.trim_start().starts_with('{') {
        body.to_string()
    } else {
        let params = parse_form_body(body);
        get_param(&params, "catalog").unwrap_or("").to_string()
    };
    let params = parse_query(query);

    with_state_mut(|s| {
        let loaded = s.load_catalog(&json);
        let q = view_query(&params, s);
        let page = render_page(s, &q);
        let html = match loaded {
            Ok(()) => {
                s.push_overlay();
                page
            }
            Err(e) => notice_error(&e.to_string()) + &page,
        };
        with_effects(html, s)
    })
}

// ── GET /api/view ──────────────────────────────────────────────────

/// Handle GET /api/view?role={killers|survivors}&search={text}
pub fn handle_view_get(query: &str) -> String {
    let params = parse_query(query);
    with_state_mut(|s| {
        let q = view_query(&params, s);
        let page = render_page(s, &q);
        with_effects(page, s)
    })
}
