//! Persisted progress: which perks sit on which character, and which
//! characters are done.
//!
//! Both halves serialize exactly as the page has always stored them in
//! localStorage: `dbd_used_perks` is a JSON object of character id → perk id
//! array, `dbd_completed_chars` is a JSON array of character ids.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::catalog::Catalog;

/// Perk slots per character.
pub const MAX_SLOTS: usize = 4;

/// Character id → ordered perk ids. A perk id appears in at most one list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Assignment(BTreeMap<String, Vec<String>>);

impl Assignment {
    pub fn perks_of(&self, character_id: &str) -> &[String] {
        self.0.get(character_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Which character currently holds `perk_id`. Linear scan; the catalog
    /// is bounded by game content so this stays small.
    pub fn owner_of(&self, perk_id: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(_, perks)| perks.iter().any(|p| p == perk_id))
            .map(|(character, _)| character.as_str())
    }

    /// Perk id → owning character id, for rendering a whole pool at once.
    pub fn owners(&self) -> HashMap<&str, &str> {
        let mut owners = HashMap::new();
        for (character, perks) in &self.0 {
            for perk in perks {
                owners.insert(perk.as_str(), character.as_str());
            }
        }
        owners
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(c, p)| (c.as_str(), p.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of characters with at least one perk.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub(crate) fn push(&mut self, character_id: &str, perk_id: &str) {
        debug_assert!(self.owner_of(perk_id).is_none(), "perk {perk_id} already owned");
        self.0
            .entry(character_id.to_string())
            .or_default()
            .push(perk_id.to_string());
    }

    /// Remove one perk from one character. An emptied list drops the entry.
    pub(crate) fn take(&mut self, character_id: &str, perk_id: &str) -> bool {
        let Some(perks) = self.0.get_mut(character_id) else {
            return false;
        };
        let before = perks.len();
        perks.retain(|p| p != perk_id);
        let removed = perks.len() != before;
        if perks.is_empty() {
            self.0.remove(character_id);
        }
        removed
    }

    pub(crate) fn retain_characters<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&str) -> bool,
    {
        let before = self.0.len();
        self.0.retain(|character, _| keep(character));
        before - self.0.len()
    }
}

impl FromIterator<(String, Vec<String>)> for Assignment {
    fn from_iter<T: IntoIterator<Item = (String, Vec<String>)>>(iter: T) -> Self {
        Assignment(iter.into_iter().collect())
    }
}

/// Ordered set of completed character ids. Duplicates in stored or
/// imported data collapse on read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>")]
pub struct CompletionSet(Vec<String>);

impl CompletionSet {
    pub fn contains(&self, character_id: &str) -> bool {
        self.0.iter().any(|c| c == character_id)
    }

    /// Returns `false` when the id was already present.
    pub(crate) fn insert(&mut self, character_id: &str) -> bool {
        if self.contains(character_id) {
            return false;
        }
        self.0.push(character_id.to_string());
        true
    }

    /// Returns `false` when the id was not present.
    pub(crate) fn remove(&mut self, character_id: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|c| c != character_id);
        before != self.0.len()
    }

    pub(crate) fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&str) -> bool,
    {
        let before = self.0.len();
        self.0.retain(|c| keep(c));
        before - self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for CompletionSet {
    fn from(ids: Vec<String>) -> Self {
        ids.into_iter().collect()
    }
}

impl FromIterator<String> for CompletionSet {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        let mut set = CompletionSet::default();
        for id in iter {
            set.insert(&id);
        }
        set
    }
}

/// Everything the user has recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Progress {
    pub assignment: Assignment,
    pub completed: CompletionSet,
}

/// What a pruning pass removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub stale_completions: usize,
    pub stale_assignments: usize,
}

impl PruneReport {
    pub fn assignment_changed(&self) -> bool {
        self.stale_assignments > 0
    }

    pub fn completion_changed(&self) -> bool {
        self.stale_completions > 0
    }
}

impl Progress {
    /// Drop every reference the catalog cannot back: unknown characters,
    /// unknown or wrong-role perks, perks already held by an earlier
    /// character, and anything past the fourth slot.
    ///
    /// An empty catalog means the data source failed, so nothing is pruned.
    pub fn prune(&mut self, catalog: &Catalog) -> PruneReport {
        let mut report = PruneReport::default();
        if catalog.is_empty() {
            return report;
        }

        report.stale_completions = self.completed.retain(|id| catalog.character(id).is_some());

        let mut seen: HashSet<String> = HashSet::new();
        let mut cleaned = BTreeMap::new();
        for (character_id, perks) in std::mem::take(&mut self.assignment.0) {
            let Some(character) = catalog.character(&character_id) else {
                report.stale_assignments += perks.len().max(1);
                continue;
            };
            if perks.is_empty() {
                report.stale_assignments += 1;
                continue;
            }
            let mut kept = Vec::with_capacity(MAX_SLOTS);
            for perk_id in perks {
                let valid = catalog
                    .perk(&perk_id)
                    .is_some_and(|p| p.role == character.role);
                if valid && kept.len() < MAX_SLOTS && seen.insert(perk_id.clone()) {
                    kept.push(perk_id);
                } else {
                    report.stale_assignments += 1;
                }
            }
            if kept.is_empty() {
                continue;
            }
            cleaned.insert(character_id, kept);
        }
        self.assignment = Assignment(cleaned);
        report
    }

    /// Global uniqueness, slot bound and role match.
    pub fn check_invariants(&self, catalog: &Catalog) -> Result<(), String> {
        let mut seen = HashSet::new();
        for (character_id, perks) in self.assignment.iter() {
            if perks.len() > MAX_SLOTS {
                return Err(format!("{character_id} holds {} perks", perks.len()));
            }
            if perks.is_empty() {
                return Err(format!("{character_id} has an empty perk list"));
            }
            let role = catalog.role_of_character(character_id);
            for perk_id in perks {
                if !seen.insert(perk_id.as_str()) {
                    return Err(format!("{perk_id} is assigned twice"));
                }
                if let (Some(role), Some(perk)) = (role, catalog.perk(perk_id)) {
                    if perk.role != role {
                        return Err(format!("{perk_id} does not match {character_id}'s role"));
                    }
                }
            }
        }
        Ok(())
    }
}
