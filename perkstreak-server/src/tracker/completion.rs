//! Completion Tracker — the "done" flag per character, plus role-scoped
//! resets. Completion and perk assignment are independent axes; nothing in
//! here touches a perk unless a reset scope explicitly asks for it.

use crate::catalog::{Catalog, Role};
use crate::tracker::progress::Progress;

/// Idempotent. Returns whether the set changed.
pub fn mark_completed(progress: &mut Progress, character_id: &str) -> bool {
    progress.completed.insert(character_id)
}

/// Idempotent. Returns whether the set changed.
pub fn unmark_completed(progress: &mut Progress, character_id: &str) -> bool {
    progress.completed.remove(character_id)
}

pub fn is_completed(progress: &Progress, character_id: &str) -> bool {
    progress.completed.contains(character_id)
}

/// Flip the flag. Returns the new state.
pub fn toggle_completed(progress: &mut Progress, character_id: &str) -> bool {
    if progress.completed.remove(character_id) {
        false
    } else {
        progress.completed.insert(character_id);
        true
    }
}

/// How much of one role a reset clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetScope {
    Completion,
    Perks,
    All,
}

impl ResetScope {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "completion" => Some(ResetScope::Completion),
            "perks" => Some(ResetScope::Perks),
            "all" => Some(ResetScope::All),
            _ => None,
        }
    }

    fn clears_completion(self) -> bool {
        matches!(self, ResetScope::Completion | ResetScope::All)
    }

    fn clears_perks(self) -> bool {
        matches!(self, ResetScope::Perks | ResetScope::All)
    }
}

/// What a reset removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResetOutcome {
    pub completions_cleared: usize,
    pub assignments_cleared: usize,
}

impl ResetOutcome {
    pub fn changed(&self) -> bool {
        self.completions_cleared > 0 || self.assignments_cleared > 0
    }
}

/// Clear one role's completion flags, perk assignments, or both. Entries
/// whose character the catalog doesn't know are left alone.
pub fn reset_role(
    catalog: &Catalog,
    progress: &mut Progress,
    role: Role,
    scope: ResetScope,
) -> ResetOutcome {
    let in_role = |id: &str| catalog.role_of_character(id) == Some(role);
    let mut outcome = ResetOutcome::default();
    if scope.clears_completion() {
        outcome.completions_cleared = progress.completed.retain(|id| !in_role(id));
    }
    if scope.clears_perks() {
        outcome.assignments_cleared = progress.assignment.retain_characters(|id| !in_role(id));
    }
    outcome
}

/// Completed/total for one role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleProgress {
    pub role: Role,
    pub completed: usize,
    pub total: usize,
}

impl RoleProgress {
    /// Whole percent, clamped to 0..=100. A role with no characters is 0 %.
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        let pct = (self.completed as f64 / self.total as f64 * 100.0).round();
        pct.clamp(0.0, 100.0) as u32
    }
}

pub fn completed_count(catalog: &Catalog, progress: &Progress, role: Role) -> usize {
    progress
        .completed
        .iter()
        .filter(|id| catalog.role_of_character(id) == Some(role))
        .count()
}

pub fn role_progress(catalog: &Catalog, progress: &Progress, role: Role) -> RoleProgress {
    RoleProgress {
        role,
        completed: completed_count(catalog, progress, role),
        total: catalog.total(role),
    }
}
