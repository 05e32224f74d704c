//! Progress Store — persistence of progress and settings through a small
//! string→string key-value API, plus the export/import file format.
//!
//! Reads never fail: a missing or unparseable value falls back to its
//! default and is logged at `debug`. Writes serialize the whole value and
//! replace the key in one call.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::catalog::{Catalog, Role};
use crate::error::ImportError;
use crate::tracker::progress::{Assignment, CompletionSet, Progress, PruneReport};
use crate::tracker::settings::{OverlaySettings, Settings, UsedPerksMode, ViewMode};

/// Fixed storage keys. Shared with the page's existing localStorage data.
pub mod keys {
    pub const COMPLETED_CHARS: &str = "dbd_completed_chars";
    pub const USED_PERKS: &str = "dbd_used_perks";
    pub const PERKS_LOCKED: &str = "dbd_perks_locked";
    pub const ALLOW_REMOVE_COMPLETED: &str = "dbd_allow_remove_completed";
    pub const SHOW_USED_PERKS_MODE: &str = "dbd_show_used_perks_mode";
    pub const SHOW_COMPLETED: &str = "dbd_show_completed";
    pub const COLORFUL_PERKS: &str = "dbd_colorful_perks";
    pub const VIEW_MODE: &str = "dbd_view_mode";
    pub const OVERLAY_SETTINGS: &str = "dbd_overlay_settings";
    pub const CHARACTER_ORDER_KILLERS: &str = "dbd_character_order_killers";
    pub const CHARACTER_ORDER_SURVIVORS: &str = "dbd_character_order_survivors";

    pub const ALL: [&str; 11] = [
        COMPLETED_CHARS,
        USED_PERKS,
        PERKS_LOCKED,
        ALLOW_REMOVE_COMPLETED,
        SHOW_USED_PERKS_MODE,
        SHOW_COMPLETED,
        COLORFUL_PERKS,
        VIEW_MODE,
        OVERLAY_SETTINGS,
        CHARACTER_ORDER_KILLERS,
        CHARACTER_ORDER_SURVIVORS,
    ];

    pub fn character_order(role: super::Role) -> &'static str {
        match role {
            super::Role::Killer => CHARACTER_ORDER_KILLERS,
            super::Role::Survivor => CHARACTER_ORDER_SURVIVORS,
        }
    }
}

/// Minimal string store. The browser mirrors `localStorage` into a
/// [`MemoryStore`]; anything else with get/set semantics works too.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);
    fn remove(&mut self, key: &str);
    fn entries(&self) -> Vec<(String, String)>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    values: BTreeMap<String, String>,
    dirty: bool,
}

impl MemoryStore {
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self {
            values: entries.into_iter().collect(),
            dirty: false,
        }
    }

    /// Whether anything was written since the last [`MemoryStore::mark_clean`].
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// JSON object of key → raw string, ready for `localStorage.setItem`.
    pub fn snapshot_json(&self) -> String {
        serde_json::to_string(&self.values).unwrap_or_else(|_| "{}".to_string())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        if self.values.get(key) != Some(&value) {
            self.values.insert(key.to_string(), value);
            self.dirty = true;
        }
    }

    fn remove(&mut self, key: &str) {
        if self.values.remove(key).is_some() {
            self.dirty = true;
        }
    }

    fn entries(&self) -> Vec<(String, String)> {
        self.values
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

// ── Typed reads/writes ─────────────────────────────────────────────

fn read_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = store.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(key, error = %e, "ignoring unreadable stored value");
            None
        }
    }
}

fn write_json<T: Serialize>(store: &mut dyn KeyValueStore, key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(json) => store.set(key, json),
        Err(e) => debug!(key, error = %e, "value not serializable; key left untouched"),
    }
}

/// Load progress and prune it against the catalog. Cleaned values are
/// written back so stale ids don't linger in storage.
pub fn load_progress(store: &mut dyn KeyValueStore, catalog: &Catalog) -> (Progress, PruneReport) {
    let mut progress = Progress {
        assignment: read_json::<Assignment>(store, keys::USED_PERKS).unwrap_or_default(),
        completed: read_json::<CompletionSet>(store, keys::COMPLETED_CHARS).unwrap_or_default(),
    };
    let report = progress.prune(catalog);
    if report.assignment_changed() {
        write_json(store, keys::USED_PERKS, &progress.assignment);
    }
    if report.completion_changed() {
        write_json(store, keys::COMPLETED_CHARS, &progress.completed);
    }
    if report != PruneReport::default() {
        debug!(?report, "pruned stale progress");
    }
    (progress, report)
}

pub fn save_progress(store: &mut dyn KeyValueStore, progress: &Progress) {
    write_json(store, keys::USED_PERKS, &progress.assignment);
    write_json(store, keys::COMPLETED_CHARS, &progress.completed);
}

pub fn load_settings(store: &dyn KeyValueStore) -> Settings {
    let defaults = Settings::default();
    let view_mode = match store.get(keys::VIEW_MODE) {
        Some(raw) => serde_json::from_str::<String>(&raw)
            .ok()
            .and_then(|s| ViewMode::parse(&s))
            // Older pages stored the bare word without JSON quoting.
            .or_else(|| ViewMode::parse(raw.trim()))
            .unwrap_or(defaults.view_mode),
        None => defaults.view_mode,
    };

    let mut settings = Settings {
        perks_locked: read_json(store, keys::PERKS_LOCKED).unwrap_or(defaults.perks_locked),
        allow_remove_from_completed: read_json(store, keys::ALLOW_REMOVE_COMPLETED)
            .unwrap_or(defaults.allow_remove_from_completed),
        show_used_perks_mode: read_json::<u8>(store, keys::SHOW_USED_PERKS_MODE)
            .and_then(UsedPerksMode::from_code)
            .unwrap_or(defaults.show_used_perks_mode),
        show_completed: read_json(store, keys::SHOW_COMPLETED).unwrap_or(defaults.show_completed),
        colorful_perks: read_json(store, keys::COLORFUL_PERKS).unwrap_or(defaults.colorful_perks),
        view_mode,
        overlay: read_json::<OverlaySettings>(store, keys::OVERLAY_SETTINGS).unwrap_or_default(),
        character_order: Default::default(),
    };
    for role in Role::ALL {
        if let Some(order) = read_json::<Vec<String>>(store, keys::character_order(role)) {
            settings.character_order.set(role, order);
        }
    }
    settings
}

pub fn save_settings(store: &mut dyn KeyValueStore, settings: &Settings) {
    write_json(store, keys::PERKS_LOCKED, &settings.perks_locked);
    write_json(
        store,
        keys::ALLOW_REMOVE_COMPLETED,
        &settings.allow_remove_from_completed,
    );
    write_json(
        store,
        keys::SHOW_USED_PERKS_MODE,
        &settings.show_used_perks_mode.code(),
    );
    write_json(store, keys::SHOW_COMPLETED, &settings.show_completed);
    write_json(store, keys::COLORFUL_PERKS, &settings.colorful_perks);
    write_json(store, keys::VIEW_MODE, &settings.view_mode.as_str());
    write_json(store, keys::OVERLAY_SETTINGS, &settings.overlay);
    for role in Role::ALL {
        write_json(
            store,
            keys::character_order(role),
            &settings.character_order.get(role),
        );
    }
}

// ── Export / import ────────────────────────────────────────────────

pub const EXPORT_VERSION: &str = "1.0";

/// The downloadable progress file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBlob {
    pub completed_chars: CompletionSet,
    pub used_perks: Assignment,
    /// Informational; never checked on import.
    #[serde(default)]
    pub export_date: Option<String>,
    /// Accepted without being enforced.
    #[serde(default)]
    pub version: Option<String>,
}

pub fn export(progress: &Progress, now: DateTime<Utc>) -> ExportBlob {
    ExportBlob {
        completed_chars: progress.completed.clone(),
        used_perks: progress.assignment.clone(),
        export_date: Some(now.to_rfc3339()),
        version: Some(EXPORT_VERSION.to_string()),
    }
}

pub fn export_file_name(now: DateTime<Utc>) -> String {
    format!("dbd-progress-{}.json", now.format("%Y-%m-%d"))
}

/// Parse an uploaded file. Both `completedChars` and `usedPerks` must be
/// present with the right shapes; nothing is mutated here.
pub fn parse_import(json: &str) -> Result<Progress, ImportError> {
    let blob: ExportBlob =
        serde_json::from_str(json).map_err(|e| ImportError::InvalidFormat(e.to_string()))?;
    Ok(Progress {
        assignment: blob.used_perks,
        completed: blob.completed_chars,
    })
}
