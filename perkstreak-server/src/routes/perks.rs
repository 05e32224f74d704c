//! `/api/perks/*` routes — the perk pool and every assignment action.

use rand::thread_rng;

use crate::routes::render::{HtmlRenderer, error_message, notice_error};
use crate::routes::util::{get_param, parse_form_body, parse_query};
use crate::routes::{render_page, view_query, with_effects};
use crate::tracker::assignment::{self, AssignmentMutation, resolve_target};
use crate::tracker::state::{AppState, with_state, with_state_mut};
use crate::tracker::view::{Renderer, derive_view};

// ── GET /api/perks ─────────────────────────────────────────────────

/// Handle GET /api/perks?role={role}&search={text}
/// Returns just the perk pool fragment.
pub fn handle_pool_get(query: &str) -> String {
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
        HtmlRenderer.perks(&view)
    })
}

/// Persist and push after a successful mutation, then render.
fn finish(s: &mut AppState, params: &[(String, String)], mutation: AssignmentMutation) -> String {
    if mutation.changed() {
        s.persist_progress();
        s.push_overlay();
    }
    let q = view_query(params, s);
    let page = render_page(s, &q);
    with_effects(page, s)
}

fn rejected(s: &AppState, params: &[(String, String)], message: &str) -> String {
    let q = view_query(params, s);
    notice_error(message) + &render_page(s, &q)
}

// ── POST /api/perks/assign ─────────────────────────────────────────

/// Handle POST /api/perks/assign
/// Body: `perk={id}[&character={id}]`. Without a character the current
/// selection is the target. Assigning a perk the target already holds
/// removes it.
pub fn handle_assign_post(body: &str) -> String {
    let params = parse_form_body(body);
    let perk = get_param(&params, "perk").unwrap_or("");
    let explicit = get_param(&params, "character");

    with_state_mut(|s| {
        let selection = s.selection.clone();
        let result = resolve_target(explicit, selection.as_deref()).and_then(|target| {
            assignment::assign(&s.catalog, &s.settings, &mut s.progress, target, perk)
        });
        match result {
            Ok(mutation) => finish(s, &params, mutation),
            Err(e) => {
                let message = error_message(&s.catalog, &e);
                rejected(s, &params, &message)
            }
        }
    })
}

// ── POST /api/perks/remove ─────────────────────────────────────────

/// Handle POST /api/perks/remove
/// Body: `perk={id}[&character={id}]`. Without a character the perk is
/// taken from whoever holds it. Never blocked by lock or protection.
pub fn handle_remove_post(body: &str) -> String {
    let params = parse_form_body(body);
    let Some(perk) = get_param(&params, "perk").filter(|p| !p.is_empty()) else {
        return r#"<span class="text-streak-red">Missing perk parameter</span>"#.to_string();
    };

    with_state_mut(|s| {
        let mutation = match get_param(&params, "character").filter(|c| !c.is_empty()) {
            Some(character) => assignment::remove(&mut s.progress, character, perk),
            None => assignment::remove_from_owner(&mut s.progress, perk),
        };
        finish(s, &params, mutation)
    })
}

// ── POST /api/perks/random ─────────────────────────────────────────

/// Handle POST /api/perks/random
/// Body: `[character={id}]`. Adds one random unused perk of the target's
/// role. Full loadouts and exhausted pools are silent no-ops.
pub fn handle_random_post(body: &str) -> String {
    let params = parse_form_body(body);
    let explicit = get_param(&params, "character");

    with_state_mut(|s| {
        let selection = s.selection.clone();
        let result = resolve_target(explicit, selection.as_deref()).and_then(|target| {
            assignment::add_random(
                &s.catalog,
                &s.settings,
                &mut s.progress,
                target,
                &mut thread_rng(),
            )
        });
        match result {
            Ok(mutation) => finish(s, &params, mutation),
            Err(e) => {
                let message = error_message(&s.catalog, &e);
                rejected(s, &params, &message)
            }
        }
    })
}
