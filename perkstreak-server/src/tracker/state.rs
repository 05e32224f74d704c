//! Global tracker state container.
//!
//! Uses `thread_local!` + `RefCell` for safe mutable access in single-threaded
//! WASM. The Web Worker keeps the WASM module alive, so state persists across
//! `handle_request` calls for the entire browser session. Durable values live
//! in `store`, which the page mirrors to and from `localStorage`.

use chrono::Utc;
use std::cell::RefCell;
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::error::{AssignmentError, CatalogError};
use crate::tracker::overlay::{OverlayBridge, PushOutcome, QueuedSink, overlay_update};
use crate::tracker::progress::Progress;
use crate::tracker::settings::Settings;
use crate::tracker::storage::{self, KeyValueStore, MemoryStore};

#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub catalog: Catalog,
    pub progress: Progress,
    pub settings: Settings,
    /// Currently selected character id. Never persisted.
    pub selection: Option<String>,
    pub bridge: OverlayBridge,
    /// Overlay requests waiting for the page to send them.
    pub outbox: QueuedSink,
    pub store: MemoryStore,
}

thread_local! {
    static STATE: RefCell<AppState> = RefCell::new(AppState::default());
}

/// Execute a closure with read access to the tracker state.
pub fn with_state<F, R>(f: F) -> R
where
    F: FnOnce(&AppState) -> R,
{
    STATE.with(|s| f(&s.borrow()))
}

/// Execute a closure with mutable access to the tracker state.
pub fn with_state_mut<F, R>(f: F) -> R
where
    F: FnOnce(&mut AppState) -> R,
{
    STATE.with(|s| f(&mut s.borrow_mut()))
}

/// Replace the entire tracker state.
pub fn replace_state(new_state: AppState) {
    STATE.with(|s| {
        *s.borrow_mut() = new_state;
    });
}

impl AppState {
    /// Install a catalog and re-read progress against it. A document that
    /// fails to parse leaves an empty catalog behind so every view degrades
    /// instead of erroring.
    pub fn load_catalog(&mut self, json: &str) -> Result<(), CatalogError> {
        match Catalog::from_json(json) {
            Ok(catalog) => {
                self.catalog = catalog;
                self.reload_progress();
                if let Some(id) = self.selection.as_deref() {
                    if self.catalog.character(id).is_none() {
                        self.selection = None;
                    }
                }
                info!(
                    characters = self.catalog.total(crate::catalog::Role::Killer)
                        + self.catalog.total(crate::catalog::Role::Survivor),
                    "catalog loaded"
                );
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "catalog unavailable");
                self.catalog = Catalog::default();
                self.selection = None;
                Err(e)
            }
        }
    }

    /// Hydrate from the page's `localStorage` entries.
    pub fn restore_store<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.store = MemoryStore::from_entries(entries);
        self.settings = storage::load_settings(&self.store);
        self.reload_progress();
    }

    fn reload_progress(&mut self) {
        let (progress, report) = storage::load_progress(&mut self.store, &self.catalog);
        self.progress = progress;
        if report.assignment_changed() || report.completion_changed() {
            debug!(?report, "stale progress written back");
        }
    }

    pub fn persist_progress(&mut self) {
        storage::save_progress(&mut self.store, &self.progress);
    }

    pub fn persist_settings(&mut self) {
        storage::save_settings(&mut self.store, &self.settings);
    }

    /// Select a character, or clear the selection with `None`.
    pub fn select(&mut self, character_id: Option<&str>) -> Result<(), AssignmentError> {
        match character_id.filter(|id| !id.is_empty()) {
            Some(id) if self.catalog.character(id).is_none() => {
                Err(AssignmentError::UnknownCharacter(id.to_string()))
            }
            Some(id) => {
                self.selection = Some(id.to_string());
                Ok(())
            }
            None => {
                self.selection = None;
                Ok(())
            }
        }
    }

    /// Queue an overlay push reflecting the current state.
    pub fn push_overlay(&mut self) -> PushOutcome {
        if self.catalog.is_empty() {
            return PushOutcome::Suppressed;
        }
        let mut update = overlay_update(
            &self.catalog,
            &self.progress,
            &self.settings.overlay,
            self.selection.as_deref(),
        );
        update.last_updated = Some(Utc::now().to_rfc3339());
        self.bridge.push(&mut self.outbox, &update)
    }

    /// Raw stored value for one key.
    pub fn stored(&self, key: &str) -> Option<String> {
        self.store.get(key)
    }
}
