//! `/api/settings` routes — the settings panel.

use tracing::debug;

use crate::routes::render::render_settings;
use crate::routes::util::{get_param, parse_flag, parse_form_body};
use crate::routes::{render_page_oob, view_query, with_effects};
use crate::tracker::settings::{SettingKey, UsedPerksMode, ViewMode};
use crate::tracker::state::{with_state, with_state_mut};

/// Handle GET /api/settings
pub fn handle_settings_get(_query: &str) -> String {
    with_state(|s| render_settings(&s.settings))
}

/// Handle POST /api/settings
/// Body params:
///   - key={name}               → flip a toggle or advance a cycle by one
///   - key={name}&value={value} → set it explicitly (`true`/`false`, the
///     mode code `0|1|2`, or `normal`/`tierlist`)
///
/// Returns the re-rendered panel plus an out-of-band `#tracker` swap. An
/// optional `role` keeps the page on the role being viewed.
pub fn handle_settings_post(body: &str) -> String {
    let params = parse_form_body(body);
    let Some(key) = get_param(&params, "key").and_then(SettingKey::parse) else {
        return r#"<span class="text-streak-red">Unknown setting</span>"#.to_string();
    };
    let value = get_param(&params, "value");

    with_state_mut(|s| {
        let settings = &mut s.settings;
        match (key, value) {
            (_, None) => settings.advance(key),
            (SettingKey::ShowUsedPerksMode, Some(v)) => {
                let Some(mode) = v.parse().ok().and_then(UsedPerksMode::from_code) else {
                    return invalid_value();
                };
                settings.show_used_perks_mode = mode;
            }
            (SettingKey::ViewMode, Some(v)) => {
                let Some(mode) = ViewMode::parse(v) else {
                    return invalid_value();
                };
                settings.view_mode = mode;
            }
            (_, Some(v)) => {
                let Some(flag) = parse_flag(v) else {
                    return invalid_value();
                };
                let field = match key {
                    SettingKey::PerksLocked => &mut settings.perks_locked,
                    SettingKey::AllowRemoveFromCompleted => &mut settings.allow_remove_from_completed,
                    SettingKey::ShowCompleted => &mut settings.show_completed,
                    _ => &mut settings.colorful_perks,
                };
                *field = flag;
            }
        }
        debug!(key = key.as_str(), "setting changed");
        s.persist_settings();
        // Most settings change what the tracker shows, so it is swapped too.
        let q = view_query(&params, s);
        let html = render_settings(&s.settings) + &render_page_oob(s, &q);
        with_effects(html, s)
    })
}

fn invalid_value() -> String {
    r#"<span class="text-streak-red">Invalid value</span>"#.to_string()
}
