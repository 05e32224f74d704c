//! `/api/characters/*` routes — character list, selection, completion and
//! tierlist ordering.

use crate::catalog::parse_role;
use crate::routes::render::{HtmlRenderer, error_message, notice_error};
use crate::routes::util::{get_all, get_param, parse_form_body, parse_query};
use crate::routes::{render_page, view_query, with_effects};
use crate::tracker::assignment::resolve_target;
use crate::tracker::completion::{mark_completed, toggle_completed, unmark_completed};
use crate::tracker::state::{with_state, with_state_mut};
use crate::tracker::view::{Renderer, derive_view};
use tracing::debug;

// ── GET /api/characters ────────────────────────────────────────────

/// Handle GET /api/characters?role={role}
/// Returns just the character list fragment.
pub fn handle_list_get(query: &str) -> String {
    let params = parse_query(query);
    with_state(|s| {
        let q = view_query(&params, s);
        let view = derive_view(
            &s.catalog,
            &s.progress,
            &s.settings,
            s.selection.as_deref(),
            &q,
        );
        HtmlRenderer.characters(&view)
    })
}

// ── POST /api/characters/select ────────────────────────────────────

/// Handle POST /api/characters/select
/// Body: `character={id}`. An empty id clears the selection.
pub fn handle_select_post(body: &str) -> String {
    let params = parse_form_body(body);
    let character = get_param(&params, "character");

    with_state_mut(|s| {
        let result = s.select(character);
        let q = view_query(&params, s);
        let page = render_page(s, &q);
        let html = match result {
            Ok(()) => {
                s.push_overlay();
                page
            }
            Err(e) => notice_error(&error_message(&s.catalog, &e)) + &page,
        };
        with_effects(html, s)
    })
}

// ── POST /api/characters/complete ──────────────────────────────────

/// Handle POST /api/characters/complete
/// Body params:
///   - action=toggle&character={id} → flip; marking also selects it
///   - action=mark[&character={id}]   → mark the given or selected character
///   - action=unmark[&character={id}] → reset the given or selected character
///     (its perks stay assigned)
pub fn handle_complete_post(body: &str) -> String {
    let params = parse_form_body(body);
    let action = get_param(&params, "action").unwrap_or("toggle");
    let explicit = get_param(&params, "character");

    with_state_mut(|s| {
        let selection = s.selection.clone();
        let target = match resolve_target(explicit, selection.as_deref()) {
            Ok(t) => t.to_string(),
            Err(e) => {
                let q = view_query(&params, s);
                return notice_error(&error_message(&s.catalog, &e)) + &render_page(s, &q);
            }
        };
        if s.catalog.character(&target).is_none() {
            let e = crate::error::AssignmentError::UnknownCharacter(target);
            let q = view_query(&params, s);
            return notice_error(&error_message(&s.catalog, &e)) + &render_page(s, &q);
        }

        let changed = match action {
            "mark" => mark_completed(&mut s.progress, &target),
            "unmark" => unmark_completed(&mut s.progress, &target),
            _ => {
                let now_completed = toggle_completed(&mut s.progress, &target);
                if now_completed {
                    s.selection = Some(target.clone());
                }
                true
            }
        };
        debug!(character = %target, action, changed, "completion updated");
        if changed {
            s.persist_progress();
        }
        s.push_overlay();

        let q = view_query(&params, s);
        let page = render_page(s, &q);
        with_effects(page, s)
    })
}

// ── POST /api/characters/order ─────────────────────────────────────

/// Handle POST /api/characters/order
/// Body: `role={role}&order={id}&order={id}…` (or one comma-separated
/// `order`). Returns the re-rendered character list.
pub fn handle_order_post(body: &str) -> String {
    let params = parse_form_body(body);
    let Some(role) = get_param(&params, "role").and_then(parse_role) else {
        return r#"<span class="text-streak-red">Missing role parameter</span>"#.to_string();
    };
    let order: Vec<String> = get_all(&params, "order")
        .into_iter()
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();

    with_state_mut(|s| {
        s.settings.character_order.set(role, order);
        s.persist_settings();
        let q = view_query(&params, s);
        let view = derive_view(
            &s.catalog,
            &s.progress,
            &s.settings,
            s.selection.as_deref(),
            &q,
        );
        let html = HtmlRenderer.characters(&view);
        with_effects(html, s)
    })
}
