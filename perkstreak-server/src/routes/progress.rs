//! `/api/reset` and `/api/progress/*` routes — role resets, export/import
//! of the progress file, and the summary the overlay consumes.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use tracing::{info, warn};

use crate::catalog::parse_role;
use crate::routes::render::{notice_error, notice_ok};
use crate::routes::util::{get_param, parse_form_body};
use crate::routes::{render_page, view_query, with_effects};
use crate::tracker::completion::{ResetScope, reset_role};
use crate::tracker::overlay::summarize;
use crate::tracker::state::{with_state, with_state_mut};
use crate::tracker::storage::{export, export_file_name, parse_import};

// ── POST /api/reset ────────────────────────────────────────────────

/// Handle POST /api/reset
/// Body: `role={role}&scope={completion|perks|all}`. Any reset also clears
/// the selection.
pub fn handle_reset_post(body: &str) -> String {
    let params = parse_form_body(body);
    let Some(role) = get_param(&params, "role").and_then(parse_role) else {
        return r#"<span class="text-streak-red">Missing role parameter</span>"#.to_string();
    };
    let Some(scope) = get_param(&params, "scope").and_then(ResetScope::parse) else {
        return r#"<span class="text-streak-red">Missing or invalid scope parameter</span>"#
            .to_string();
    };

    with_state_mut(|s| {
        let outcome = reset_role(&s.catalog, &mut s.progress, role, scope);
        s.selection = None;
        if outcome.changed() {
            info!(role = role.as_path(), ?scope, ?outcome, "progress reset");
            s.persist_progress();
            s.push_overlay();
        }
        let q = view_query(&params, s);
        let page = render_page(s, &q);
        with_effects(page, s)
    })
}

// ── GET /api/progress/export ───────────────────────────────────────

/// Handle GET /api/progress/export
/// Returns a <script> tag that downloads the progress file. The JSON rides
/// in a base64 `data:` URL so names with quotes can't break the script.
pub fn handle_export_get(_query: &str) -> String {
    let now = Utc::now();
    let json = with_state(|s| {
        serde_json::to_string_pretty(&export(&s.progress, now)).unwrap_or_else(|_| "{}".to_string())
    });
    let encoded = STANDARD.encode(json);
    format!(
        r#"<script>
(function() {{
  var a = document.createElement('a');
  a.href = 'data:application/json;base64,{encoded}';
  a.download = '{file}';
  a.click();
  console.log('[perkstreak] Progress exported');
}})();
</script>"#,
        file = export_file_name(now),
    )
}

// ── POST /api/progress/import ──────────────────────────────────────

/// Handle POST /api/progress/import
/// Body is the progress file, raw or as `data=<json>`. Replaces completion
/// and assignments wholesale; an invalid file changes nothing.
pub fn handle_import_post(body: &str) -> String {
    let json = if body.trim_start().starts_with('{') {
        body.to_string()
    } else {
        let params = parse_form_body(body);
        get_param(&params, "data").unwrap_or("").to_string()
    };

    with_state_mut(|s| {
        let q = view_query(&[], s);
        match parse_import(&json) {
            Ok(mut imported) => {
                let report = imported.prune(&s.catalog);
                s.progress = imported;
                s.persist_progress();
                s.push_overlay();
                info!(?report, "progress imported");
                let html = notice_ok("Progress imported successfully!") + &render_page(s, &q);
                with_effects(html, s)
            }
            Err(e) => {
                warn!(error = %e, "progress import rejected");
                notice_error(&e.to_string()) + &render_page(s, &q)
            }
        }
    })
}

// ── GET /api/progress/summary ──────────────────────────────────────

/// Handle GET /api/progress/summary
/// Returns the overlay progress summary as JSON.
pub fn handle_summary_get(_query: &str) -> String {
    with_state(|s| {
        serde_json::to_string(&summarize(&s.catalog, &s.progress))
            .unwrap_or_else(|_| "{}".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::SAMPLE_JSON;
    use crate::routes::perks::handle_assign_post;
    use crate::tracker::state::{AppState, replace_state};

    fn reset_state() {
        replace_state(AppState::default());
        with_state_mut(|s| s.load_catalog(SAMPLE_JSON).unwrap());
    }

    fn seed() {
        handle_assign_post("perk=p1&character=the-trapper");
        handle_assign_post("perk=s1&character=dwight");
        with_state_mut(|s| {
            s.progress.completed = ["the-trapper".to_string(), "dwight".to_string()]
                .into_iter()
                .collect();
        });
    }

    #[test]
    fn reset_perks_only_touches_role() {
        reset_state();
        seed();
        handle_reset_post("role=killers&scope=perks");
        with_state(|s| {
            assert!(s.progress.assignment.perks_of("the-trapper").is_empty());
            assert_eq!(s.progress.assignment.perks_of("dwight"), ["s1"]);
            assert_eq!(s.progress.completed.len(), 2);
        });
        reset_state();
    }

    #[test]
    fn reset_clears_selection() {
        reset_state();
        seed();
        with_state_mut(|s| s.select(Some("the-trapper")).unwrap());
        let html = handle_reset_post("role=killers&scope=completion");
        assert!(html.contains("Select a character to assign perks."));
        with_state(|s| {
            assert!(s.selection.is_none());
            assert_eq!(s.progress.assignment.perks_of("the-trapper"), ["p1"]);
        });
        reset_state();
    }

    #[test]
    fn reset_validates_params() {
        reset_state();
        assert!(handle_reset_post("scope=all").contains("Missing role"));
        assert!(handle_reset_post("role=killers&scope=some").contains("invalid scope"));
        reset_state();
    }

    #[test]
    fn export_emits_download_script() {
        reset_state();
        seed();
        let html = handle_export_get("");
        assert!(html.contains("data:application/json;base64,"));
        assert!(html.contains("dbd-progress-"));
        assert!(html.contains(".json"));
        reset_state();
    }

    #[test]
    fn import_replaces_state_wholesale() {
        reset_state();
        seed();
        let html = handle_import_post(
            r#"{"completedChars":["claudette"],"usedPerks":{"the-wraith":["p2"]},"version":"1.0"}"#,
        );
        assert!(html.contains("Progress imported successfully!"));
        with_state(|s| {
            assert!(s.progress.completed.contains("claudette"));
            assert!(!s.progress.completed.contains("the-trapper"));
            assert_eq!(s.progress.assignment.perks_of("the-wraith"), ["p2"]);
            assert!(s.progress.assignment.perks_of("the-trapper").is_empty());
        });
        reset_state();
    }

    #[test]
    fn invalid_import_changes_nothing() {
        reset_state();
        seed();
        let before = with_state(|s| s.progress.clone());
        let html = handle_import_post(r#"{"usedPerks":{}}"#);
        assert!(html.contains("Invalid progress file format"));
        with_state(|s| assert_eq!(s.progress, before));
        reset_state();
    }

    #[test]
    fn summary_is_json_counts() {
        reset_state();
        seed();
        let json: serde_json::Value = serde_json::from_str(&handle_summary_get("")).unwrap();
        assert_eq!(json["killerCompleted"], 1);
        assert_eq!(json["survivorCompleted"], 1);
        assert_eq!(json["killerTotal"], 2);
        reset_state();
    }
}
