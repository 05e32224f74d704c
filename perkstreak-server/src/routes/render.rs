//! HTML adapter for the view model. Produces HTMX-swappable fragments; every
//! interactive element posts back to a `/api/*` route and swaps `#tracker`.

use serde_json::json;

use crate::catalog::{Catalog, Role};
use crate::error::AssignmentError;
use crate::routes::util::escape_html;
use crate::tracker::completion::RoleProgress;
use crate::tracker::overlay::BridgeStatus;
use crate::tracker::settings::{SettingKey, Settings, ViewMode};
use crate::tracker::view::{
    CharacterCard, PerkInteraction, PerkTile, Renderer, SavedEntry, SelectedCharacter, ViewModel,
};

pub struct HtmlRenderer;

/// `hx-vals` attribute value, escaped for a single-quoted attribute.
fn hx_vals(vals: serde_json::Value) -> String {
    escape_html(&vals.to_string())
}

fn post_button(class: &str, route: &str, vals: serde_json::Value, label: &str) -> String {
    format!(
        r##"<button class="{class}" hx-post="{route}" hx-vals='{vals}' hx-target="#tracker" hx-swap="outerHTML">{label}</button>"##,
        vals = hx_vals(vals),
    )
}

impl Renderer for HtmlRenderer {
    type Output = String;

    fn page(&self, view: &ViewModel) -> String {
        let role = view.role.as_path();
        if !view.catalog_available {
            return format!(
                r#"<div id="tracker" data-role="{role}"><input type="hidden" id="tracker-role" name="role" value="{role}"><p class="text-streak-red">Character data could not be loaded. Progress is kept and will reappear once the data loads.</p></div>"#
            );
        }

        let mut html = String::with_capacity(8192);
        html.push_str(&format!(
            r#"<div id="tracker" data-role="{role}"><input type="hidden" id="tracker-role" name="role" value="{role}">"#
        ));
        render_progress_bars(&mut html, &view.progress);
        match &view.selected {
            Some(selected) => render_selected(&mut html, view.role, selected),
            None => html.push_str(
                r#"<div id="selected-character" class="text-sm italic">Select a character to assign perks.</div>"#,
            ),
        }
        html.push_str(&self.characters(view));
        html.push_str(&self.perks(view));
        render_saved(&mut html, &view.saved);
        html.push_str("</div>");
        html
    }

    fn characters(&self, view: &ViewModel) -> String {
        let role = view.role;
        let mut html = String::with_capacity(2048);
        let (tag, class) = match view.view_mode {
            ViewMode::Normal => ("div", "character-grid grid grid-cols-4 gap-2"),
            ViewMode::Tierlist => ("ol", "tierlist flex flex-col gap-1"),
        };
        html.push_str(&format!(
            r#"<{tag} id="character-list" class="{class}" data-role="{}">"#,
            role.as_path()
        ));
        for card in &view.characters {
            render_character_card(&mut html, role, view.view_mode, card);
        }
        html.push_str(&format!("</{tag}>"));
        html
    }

    fn perks(&self, view: &ViewModel) -> String {
        let mut html = String::with_capacity(4096);
        let colorful = if view.colorful_perks { " perk-colorful" } else { "" };
        html.push_str(&format!(
            r#"<div id="perk-pool" class="grid grid-cols-6 gap-1{colorful}">"#
        ));
        if view.perks.is_empty() {
            html.push_str(r#"<p class="col-span-6 text-sm italic">No perks match.</p>"#);
        }
        for tile in &view.perks {
            render_perk_tile(&mut html, view.role, tile);
        }
        html.push_str("</div>");
        html
    }
}

fn render_progress_bars(html: &mut String, bars: &[RoleProgress]) {
    html.push_str(r#"<div id="progress-bars" class="grid grid-cols-2 gap-4">"#);
    for bar in bars {
        let pct = bar.percent();
        html.push_str(&format!(
            r#"<div class="progress-{path}"><p class="text-xs font-bold">{label}: {done}/{total}</p><div class="w-full bg-slate-200 rounded-full h-1.5"><div class="bg-streak-red h-1.5 rounded-full" style="width: {pct}%"></div></div></div>"#,
            path = bar.role.as_path(),
            label = bar.role.label(),
            done = bar.completed,
            total = bar.total,
        ));
    }
    html.push_str("</div>");
}

fn render_selected(html: &mut String, role: Role, selected: &SelectedCharacter) {
    let path = role.as_path();
    html.push_str(&format!(
        r#"<div id="selected-character" data-character="{}">"#,
        escape_html(&selected.id)
    ));
    html.push_str(&format!(
        r#"<h2 class="font-bold">{}{}</h2>"#,
        escape_html(&selected.name),
        if selected.completed { " 🏆" } else { "" }
    ));
    html.push_str(r#"<div class="perk-slots flex gap-2">"#);
    for (i, slot) in selected.slots.iter().enumerate() {
        match slot {
            Some(perk) => html.push_str(&format!(
                r#"<div class="perk-slot filled" data-slot="{i}"><span>{}</span>{}</div>"#,
                escape_html(&perk.name),
                post_button(
                    "slot-remove",
                    "/api/perks/remove",
                    json!({"character": selected.id, "perk": perk.id, "role": path}),
                    "×",
                ),
            )),
            None => html.push_str(&format!(
                r#"<div class="perk-slot empty" data-slot="{i}"></div>"#
            )),
        }
    }
    html.push_str("</div>");

    let (action, label) = if selected.completed {
        ("unmark", "Reset Character")
    } else {
        ("mark", "Mark Character as Completed")
    };
    html.push_str(r#"<div class="flex gap-2 mt-2">"#);
    html.push_str(&post_button(
        "btn-complete",
        "/api/characters/complete",
        json!({"character": selected.id, "action": action, "role": path}),
        label,
    ));
    html.push_str(&post_button(
        "btn-random",
        "/api/perks/random",
        json!({"character": selected.id, "role": path}),
        "🎲 Random Perk",
    ));
    html.push_str("</div></div>");
}

fn render_character_card(html: &mut String, role: Role, mode: ViewMode, card: &CharacterCard) {
    let mut class = String::from("character-card");
    if card.completed {
        class.push_str(" completed");
    }
    if card.selected {
        class.push_str(" selected");
    }
    let tag = match mode {
        ViewMode::Normal => "div",
        ViewMode::Tierlist => "li",
    };
    let draggable = if mode == ViewMode::Tierlist { r#" draggable="true""# } else { "" };
    html.push_str(&format!(
        r#"<{tag} class="{class}" data-id="{id}"{draggable}>"#,
        id = escape_html(&card.id),
    ));
    html.push_str(&post_button(
        "character-select",
        "/api/characters/select",
        json!({"character": card.id, "role": role.as_path()}),
        &format!(
            r#"<img src="images/{}/{}.webp" alt=""><span>{}</span><span class="perk-count">{}/4</span>"#,
            role.as_path(),
            escape_html(&card.id),
            escape_html(&card.name),
            card.perk_count,
        ),
    ));
    html.push_str(&post_button(
        "character-toggle",
        "/api/characters/complete",
        json!({"character": card.id, "action": "toggle", "role": role.as_path()}),
        if card.completed { "🏆" } else { "☐" },
    ));
    html.push_str(&format!("</{tag}>"));
}

fn interaction_class(interaction: PerkInteraction) -> &'static str {
    match interaction {
        PerkInteraction::Assign => "perk-free",
        PerkInteraction::Reassign => "perk-used",
        PerkInteraction::RemoveOnly => "perk-used perk-locked",
        PerkInteraction::Protected => "perk-used perk-protected",
    }
}

fn render_perk_tile(html: &mut String, role: Role, tile: &PerkTile) {
    let title = match &tile.owner {
        Some(owner) => format!("{} (used by {})", tile.name, owner.name),
        None => tile.name.clone(),
    };
    html.push_str(&format!(
        r#"<div class="perk-tile {class}" data-perk="{id}" title="{title}">"#,
        class = interaction_class(tile.interaction),
        id = escape_html(&tile.id),
        title = escape_html(&title),
    ));
    html.push_str(&post_button(
        "perk-assign",
        "/api/perks/assign",
        json!({"perk": tile.id, "role": role.as_path()}),
        &format!(
            r#"<img src="images/perks/{}/{}" alt=""><span>{}</span>"#,
            role.as_path(),
            escape_html(&tile.id),
            escape_html(&tile.name),
        ),
    ));
    if tile.owner.is_some() {
        html.push_str(&post_button(
            "perk-remove",
            "/api/perks/remove",
            json!({"perk": tile.id, "role": role.as_path()}),
            "×",
        ));
    }
    html.push_str("</div>");
}

fn render_saved(html: &mut String, saved: &[SavedEntry]) {
    html.push_str(r#"<div id="saved-progress"><h3 class="font-bold">Saved Progress</h3>"#);
    if saved.is_empty() {
        html.push_str(r#"<p class="text-sm italic">No perks assigned yet.</p>"#);
    }
    for entry in saved {
        let perks: Vec<String> = entry.perks.iter().map(|p| escape_html(&p.name)).collect();
        html.push_str(&format!(
            r#"<div class="saved-entry {role}{done}"><span class="font-bold">{name}</span>: {perks}</div>"#,
            role = entry.role.as_path(),
            done = if entry.completed { " completed" } else { "" },
            name = escape_html(&entry.name),
            perks = perks.join(", "),
        ));
    }
    html.push_str("</div>");
}

// ── Settings & status panels ───────────────────────────────────────

pub fn render_settings(settings: &Settings) -> String {
    let mut html = String::with_capacity(1024);
    html.push_str(r#"<div id="settings-panel" class="flex flex-wrap gap-2">"#);
    for key in SettingKey::ALL {
        html.push_str(&format!(
            r##"<button class="setting-toggle" data-key="{key}" hx-post="/api/settings" hx-vals='{{"key":"{key}"}}' hx-include="#tracker-role" hx-target="#settings-panel" hx-swap="outerHTML">{label}</button>"##,
            key = key.as_str(),
            label = settings.describe(key),
        ));
    }
    html.push_str("</div>");
    html
}

pub fn render_bridge_status(status: BridgeStatus) -> String {
    match status {
        BridgeStatus::Unknown => {
            r#"<span id="overlay-status" class="text-slate-500">Overlay: checking…</span>"#
                .to_string()
        }
        BridgeStatus::Available => {
            r#"<span id="overlay-status" class="text-emerald-600">Overlay: connected</span>"#
                .to_string()
        }
        BridgeStatus::Unavailable => r##"<span id="overlay-status" class="text-streak-red">Overlay: not connected <button hx-post="/api/overlay/retry" hx-target="#overlay-status" hx-swap="outerHTML">Retry</button></span>"##
            .to_string(),
    }
}

// ── Notifications ──────────────────────────────────────────────────

pub fn notice_error(message: &str) -> String {
    format!(
        r#"<div id="notice" class="text-streak-red" role="alert">{}</div>"#,
        escape_html(message)
    )
}

pub fn notice_ok(message: &str) -> String {
    format!(
        r#"<div id="notice" class="text-emerald-600">{}</div>"#,
        escape_html(message)
    )
}

/// User-facing text for a rejected action, with ids swapped for names.
pub fn error_message(catalog: &Catalog, error: &AssignmentError) -> String {
    match error {
        AssignmentError::NoCharacterSelected => error.to_string(),
        AssignmentError::UnknownCharacter(id) => format!("Unknown character: {id}"),
        AssignmentError::UnknownPerk(id) => format!("Unknown perk: {id}"),
        AssignmentError::RoleMismatch { character, perk } => format!(
            "{} can't use {}: it belongs to the other role.",
            catalog.character_name(character),
            catalog.perk_name(perk)
        ),
        AssignmentError::PerkLocked { perk, owner } => format!(
            "{} is already used by {}. Unlock perks to reassign it.",
            catalog.perk_name(perk),
            catalog.character_name(owner)
        ),
        AssignmentError::ProtectedByCompletion { perk, owner } => format!(
            "{} belongs to {}, who is completed. Allow removal from completed characters to reassign it.",
            catalog.perk_name(perk),
            catalog.character_name(owner)
        ),
        AssignmentError::SlotsFull { character } => format!(
            "{} already has 4 perks. Remove one first.",
            catalog.character_name(character)
        ),
    }
}
