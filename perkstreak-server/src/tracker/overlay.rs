//! Overlay Bridge — best-effort pushes of a read-only progress summary to
//! the local companion server.
//!
//! Availability is a three-state machine: `Unknown` until the first push
//! resolves, then `Available` or `Unavailable`. Once unavailable nothing is
//! sent until [`OverlayBridge::retry`] is called from an explicit user
//! action. Identical payloads are never sent twice in a row.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, Role};
use crate::error::BridgeError;
use crate::tracker::completion::completed_count;
use crate::tracker::progress::Progress;
use crate::tracker::settings::OverlaySettings;

pub const UPDATE_PROGRESS_PATH: &str = "/api/update-progress";
pub const UPDATE_OVERLAY_PATH: &str = "/api/update-overlay";

/// How long the page waits for the companion before giving up.
pub const PUSH_TIMEOUT_MS: u32 = 5000;

// ── Payloads ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedCharacter {
    pub id: String,
    pub name: String,
    /// Perk display names.
    pub perks: Vec<String>,
}

/// Counts per role, as stored in the companion's `progress.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    pub killer_completed: usize,
    pub killer_total: usize,
    pub survivor_completed: usize,
    pub survivor_total: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub completed_killers: Vec<CompletedCharacter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentCharacter {
    pub name: String,
    pub perks: Vec<String>,
}

/// The richer payload the companion turns into the overlay page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayUpdate {
    #[serde(flatten)]
    pub progress: ProgressSummary,
    #[serde(default)]
    pub current_killer: Option<CurrentCharacter>,
    #[serde(default)]
    pub current_survivor: Option<CurrentCharacter>,
    #[serde(default)]
    pub settings: OverlaySettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

fn perk_names(catalog: &Catalog, progress: &Progress, character_id: &str) -> Vec<String> {
    progress
        .assignment
        .perks_of(character_id)
        .iter()
        .map(|p| catalog.perk_name(p).to_string())
        .collect()
}

pub fn summarize(catalog: &Catalog, progress: &Progress) -> ProgressSummary {
    ProgressSummary {
        killer_completed: completed_count(catalog, progress, Role::Killer),
        killer_total: catalog.total(Role::Killer),
        survivor_completed: completed_count(catalog, progress, Role::Survivor),
        survivor_total: catalog.total(Role::Survivor),
        completed_killers: catalog
            .characters(Role::Killer)
            .filter(|c| progress.completed.contains(&c.id))
            .map(|c| CompletedCharacter {
                id: c.id.clone(),
                name: c.name.clone(),
                perks: perk_names(catalog, progress, &c.id),
            })
            .collect(),
    }
}

/// Summary plus the selected character's loadout, if any.
pub fn overlay_update(
    catalog: &Catalog,
    progress: &Progress,
    settings: &OverlaySettings,
    selection: Option<&str>,
) -> OverlayUpdate {
    let mut update = OverlayUpdate {
        progress: summarize(catalog, progress),
        settings: settings.clone(),
        ..OverlayUpdate::default()
    };
    if let Some(character) = selection.and_then(|id| catalog.character(id)) {
        let current = CurrentCharacter {
            name: character.name.clone(),
            perks: perk_names(catalog, progress, &character.id),
        };
        match character.role {
            Role::Killer => update.current_killer = Some(current),
            Role::Survivor => update.current_survivor = Some(current),
        }
    }
    update
}

// ── Transport ──────────────────────────────────────────────────────

/// Where pushes go. Implementations must not block for long; a failure is
/// reported back as [`BridgeError::Unavailable`].
pub trait OverlaySink {
    fn post(&mut self, path: &str, body: &str) -> Result<(), BridgeError>;

    /// Whether `Ok` from [`OverlaySink::post`] means the companion accepted
    /// the request. Deferred sinks report the real outcome later through
    /// [`OverlayBridge::record_outcome`].
    fn confirms_delivery(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueuedRequest {
    pub path: String,
    pub body: String,
}

/// Collects requests for the page to send with `fetch`.
#[derive(Debug, Clone, Default)]
pub struct QueuedSink {
    queue: Vec<QueuedRequest>,
}

impl QueuedSink {
    pub fn drain(&mut self) -> Vec<QueuedRequest> {
        std::mem::take(&mut self.queue)
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl OverlaySink for QueuedSink {
    fn post(&mut self, path: &str, body: &str) -> Result<(), BridgeError> {
        self.queue.push(QueuedRequest {
            path: path.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }

    fn confirms_delivery(&self) -> bool {
        false
    }
}

// ── State machine ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BridgeStatus {
    #[default]
    Unknown,
    Available,
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Sent,
    /// Same payload as the last push.
    Duplicate,
    /// Bridge is unavailable; waiting for an explicit retry.
    Suppressed,
    Failed,
}

#[derive(Debug, Clone, Default)]
pub struct OverlayBridge {
    status: BridgeStatus,
    last_sent: Option<String>,
}

impl OverlayBridge {
    pub fn status(&self) -> BridgeStatus {
        self.status
    }

    /// Send `update` to both companion endpoints. `last_updated` is ignored
    /// when deciding whether the payload changed.
    pub fn push(&mut self, sink: &mut dyn OverlaySink, update: &OverlayUpdate) -> PushOutcome {
        if self.status == BridgeStatus::Unavailable {
            return PushOutcome::Suppressed;
        }

        let key = OverlayUpdate {
            last_updated: None,
            ..update.clone()
        };
        let (Ok(key), Ok(summary_body), Ok(overlay_body)) = (
            serde_json::to_string(&key),
            serde_json::to_string(&update.progress),
            serde_json::to_string(update),
        ) else {
            debug!("overlay payload not serializable");
            return PushOutcome::Failed;
        };
        if self.last_sent.as_deref() == Some(key.as_str()) {
            return PushOutcome::Duplicate;
        }

        let sent = sink
            .post(UPDATE_PROGRESS_PATH, &summary_body)
            .and_then(|()| sink.post(UPDATE_OVERLAY_PATH, &overlay_body));
        match sent {
            Ok(()) => {
                self.last_sent = Some(key);
                if sink.confirms_delivery() {
                    self.mark_available();
                }
                PushOutcome::Sent
            }
            Err(e) => {
                self.mark_unavailable(&e);
                PushOutcome::Failed
            }
        }
    }

    /// Result of a deferred push reported by the page.
    pub fn record_outcome(&mut self, result: Result<(), BridgeError>) {
        match result {
            Ok(()) if self.status == BridgeStatus::Unknown => self.mark_available(),
            Ok(()) => {}
            Err(e) => self.mark_unavailable(&e),
        }
    }

    /// The only way back from `Unavailable`.
    pub fn retry(&mut self) {
        debug!(from = ?self.status, "overlay bridge re-probe requested");
        self.status = BridgeStatus::Unknown;
        self.last_sent = None;
    }

    fn mark_available(&mut self) {
        if self.status != BridgeStatus::Available {
            info!("overlay companion detected; sync enabled");
        }
        self.status = BridgeStatus::Available;
    }

    fn mark_unavailable(&mut self, error: &BridgeError) {
        if self.status != BridgeStatus::Unavailable {
            warn!(%error, "overlay sync disabled until retried");
        }
        self.status = BridgeStatus::Unavailable;
        self.last_sent = None;
    }
}
