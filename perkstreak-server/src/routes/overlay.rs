//! `/api/overlay/*` routes — bridge status, push outcomes reported by the
//! page, the manual re-probe, and overlay display settings.

use crate::error::BridgeError;
use crate::routes::render::render_bridge_status;
use crate::routes::util::{get_param, parse_flag, parse_form_body};
use crate::routes::with_effects;
use crate::tracker::state::{with_state, with_state_mut};

/// Handle GET /api/overlay/status
pub fn handle_status_get(_query: &str) -> String {
    with_state(|s| render_bridge_status(s.bridge.status()))
}

/// Handle POST /api/overlay/outcome
/// Body: `ok={true|false}[&error={text}]`, sent by the push script once
/// its requests settle.
pub fn handle_outcome_post(body: &str) -> String {
    let params = parse_form_body(body);
    let ok = get_param(&params, "ok").and_then(parse_flag).unwrap_or(false);
    let result = if ok {
        Ok(())
    } else {
        let detail = get_param(&params, "error").unwrap_or("no response");
        Err(BridgeError::Unavailable(detail.to_string()))
    };
    with_state_mut(|s| {
        s.bridge.record_outcome(result);
        render_bridge_status(s.bridge.status())
    })
}

/// Handle POST /api/overlay/retry
/// The single way back from an unavailable bridge. Re-sends the current
/// state immediately.
pub fn handle_retry_post(_body: &str) -> String {
    with_state_mut(|s| {
        s.bridge.retry();
        s.push_overlay();
        let html = render_bridge_status(s.bridge.status());
        with_effects(html, s)
    })
}

/// Handle POST /api/overlay/settings
/// Body: any of `show_killers`, `show_survivors`, `show_current_character`,
/// `compact_mode` with `true`/`false`. Missing fields keep their value.
pub fn handle_settings_post(body: &str) -> String {
    let params = parse_form_body(body);
    let flag = |name: &str| get_param(&params, name).and_then(parse_flag);

    with_state_mut(|s| {
        let overlay = &mut s.settings.overlay;
        if let Some(v) = flag("show_killers") {
            overlay.show_killers = v;
        }
        if let Some(v) = flag("show_survivors") {
            overlay.show_survivors = v;
        }
        if let Some(v) = flag("show_current_character") {
            overlay.show_current_character = v;
        }
        if let Some(v) = flag("compact_mode") {
            overlay.compact_mode = v;
        }
        s.persist_settings();
        s.push_overlay();
        let html = render_bridge_status(s.bridge.status());
        with_effects(html, s)
    })
}
