//! Route handlers for `handle_request`. Each handler takes the raw query
//! string or form body and returns an HTML fragment (or JSON for the few
//! machine-facing routes).

pub mod characters;
pub mod overlay;
pub mod page;
pub mod perks;
pub mod progress;
pub mod render;
pub mod settings;
pub mod store;
pub mod util;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::catalog::{Role, parse_role};
use crate::tracker::overlay::{PUSH_TIMEOUT_MS, QueuedRequest};
use crate::tracker::state::AppState;
use crate::tracker::view::{Renderer, ViewQuery, derive_view};

use self::render::HtmlRenderer;
use self::util::get_param;

/// Role and search for the page being re-rendered: explicit `role`, else
/// the selection's role, else killers.
pub(crate) fn view_query(params: &[(String, String)], state: &AppState) -> ViewQuery {
    let role = get_param(params, "role")
        .and_then(parse_role)
        .or_else(|| {
            state
                .selection
                .as_deref()
                .and_then(|id| state.catalog.role_of_character(id))
        })
        .unwrap_or(Role::Killer);
    ViewQuery {
        role,
        search: get_param(params, "search").unwrap_or("").to_string(),
    }
}

/// Full `#tracker` fragment for the current state.
pub(crate) fn render_page(state: &AppState, query: &ViewQuery) -> String {
    let view = derive_view(
        &state.catalog,
        &state.progress,
        &state.settings,
        state.selection.as_deref(),
        query,
    );
    HtmlRenderer.page(&view)
}

/// `#tracker` marked for an out-of-band swap, for responses whose main
/// target is another element.
pub(crate) fn render_page_oob(state: &AppState, query: &ViewQuery) -> String {
    render_page(state, query).replacen(
        r#"<div id="tracker""#,
        r#"<div id="tracker" hx-swap-oob="true""#,
        1,
    )
}

/// Append what a mutating request owes the page: a localStorage
/// write-through when the store changed, and any queued overlay pushes.
pub(crate) fn with_effects(mut html: String, state: &mut AppState) -> String {
    if state.store.is_dirty() {
        html.push_str(&persist_script(&state.store.snapshot_json()));
        state.store.mark_clean();
    }
    let requests = state.outbox.drain();
    if !requests.is_empty() {
        html.push_str(&overlay_script(&requests));
    }
    html
}

fn persist_script(snapshot_json: &str) -> String {
    let encoded = STANDARD.encode(snapshot_json);
    format!(
        r#"<script>
(function() {{
  var s = JSON.parse(new TextDecoder().decode(Uint8Array.from(atob('{encoded}'), function(c) {{ return c.charCodeAt(0); }})));
  for (var k in s) {{ localStorage.setItem(k, s[k]); }}
}})();
</script>"#
    )
}

/// Fire-and-forget pushes to the companion. Static hosting never has one,
/// so anything but localhost reports unavailable without a request.
fn overlay_script(requests: &[QueuedRequest]) -> String {
    let json = serde_json::to_string(requests).unwrap_or_else(|_| "[]".to_string());
    let encoded = STANDARD.encode(json);
    format!(
        r#"<script>
(function() {{
  function report(ok, err) {{
    htmx.ajax('POST', '/api/overlay/outcome', {{values: {{ok: ok, error: err || ''}}, swap: 'none'}});
  }}
  var h = window.location.hostname;
  if (h !== 'localhost' && h !== '127.0.0.1') {{ report('false', 'static hosting'); return; }}
  var reqs = JSON.parse(new TextDecoder().decode(Uint8Array.from(atob('{encoded}'), function(c) {{ return c.charCodeAt(0); }})));
  Promise.all(reqs.map(function(r) {{
    return fetch(r.path, {{method: 'POST', headers: {{'Content-Type': 'application/json'}}, body: r.body, signal: AbortSignal.timeout({timeout})}})
      .then(function(res) {{ if (!res.ok) throw new Error('HTTP ' + res.status); }});
  }})).then(function() {{ report('true'); }}, function(e) {{ report('false', String(e)); }});
}})();
</script>"#,
        timeout = PUSH_TIMEOUT_MS,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::SAMPLE_JSON;

    #[test]
    fn view_query_falls_back_to_selection_role() {
        let mut state = AppState::default();
        state.load_catalog(SAMPLE_JSON).unwrap();
        state.select(Some("dwight")).unwrap();

        let params = util::parse_form_body("search=bond");
        let q = view_query(&params, &state);
        assert_eq!(q.role, Role::Survivor);
        assert_eq!(q.search, "bond");

        let params = util::parse_form_body("role=killers");
        assert_eq!(view_query(&params, &state).role, Role::Killer);
    }

    #[test]
    fn effects_flush_store_and_outbox() {
        let mut state = AppState::default();
        state.load_catalog(SAMPLE_JSON).unwrap();
        state.progress.completed = ["the-trapper".to_string()].into_iter().collect();
        state.persist_progress();
        state.push_overlay();

        let html = with_effects(String::new(), &mut state);
        assert!(html.contains("localStorage.setItem"));
        assert!(html.contains("AbortSignal.timeout(5000)"));
        assert!(!state.store.is_dirty());
        assert!(state.outbox.is_empty());

        assert_eq!(with_effects("x".into(), &mut state), "x");
    }
}
