//! View derivation. `derive_view` projects catalog, progress, settings and
//! the selection into a plain [`ViewModel`]; a [`Renderer`] turns that into
//! whatever output the host needs. Nothing here keeps state between calls.

use serde::Serialize;
use std::collections::HashMap;

use crate::catalog::{Catalog, Character, Role};
use crate::tracker::completion::{RoleProgress, role_progress};
use crate::tracker::progress::{MAX_SLOTS, Progress};
use crate::tracker::settings::{Settings, UsedPerksMode, ViewMode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewQuery {
    pub role: Role,
    /// Case-insensitive substring filter on perk names. Empty shows all.
    pub search: String,
}

impl ViewQuery {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            search: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CharacterCard {
    pub id: String,
    pub name: String,
    pub completed: bool,
    pub selected: bool,
    pub perk_count: usize,
}

/// What clicking a perk tile would do for the current selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PerkInteraction {
    /// Free perk.
    Assign,
    /// Held by another character; unlocked, so it can move.
    Reassign,
    /// Held and locked, or held by the selection itself. Only removal works.
    RemoveOnly,
    /// Held by a completed character while completed loadouts are protected.
    Protected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PerkTile {
    pub id: String,
    pub name: String,
    pub owner: Option<NamedRef>,
    pub owner_completed: bool,
    pub interaction: PerkInteraction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectedCharacter {
    pub id: String,
    pub name: String,
    pub completed: bool,
    /// Always [`MAX_SLOTS`] entries; `None` is an empty slot.
    pub slots: Vec<Option<NamedRef>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedEntry {
    pub id: String,
    pub name: String,
    pub role: Role,
    pub completed: bool,
    pub perks: Vec<NamedRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewModel {
    pub role: Role,
    /// False when the catalog failed to load; the page shows a degraded state.
    pub catalog_available: bool,
    pub view_mode: ViewMode,
    pub colorful_perks: bool,
    pub perks_locked: bool,
    pub characters: Vec<CharacterCard>,
    pub perks: Vec<PerkTile>,
    pub selected: Option<SelectedCharacter>,
    pub saved: Vec<SavedEntry>,
    pub progress: [RoleProgress; 2],
}

/// Turns a view model into host output. The browser build renders HTML
/// fragments; tests use a plain-text renderer.
pub trait Renderer {
    type Output;

    fn page(&self, view: &ViewModel) -> Self::Output;
    fn characters(&self, view: &ViewModel) -> Self::Output;
    fn perks(&self, view: &ViewModel) -> Self::Output;
}

pub fn derive_view(
    catalog: &Catalog,
    progress: &Progress,
    settings: &Settings,
    selection: Option<&str>,
    query: &ViewQuery,
) -> ViewModel {
    let owners = progress.assignment.owners();
    let selected_char = selection
        .and_then(|id| catalog.character(id))
        .filter(|c| c.role == query.role);

    ViewModel {
        role: query.role,
        catalog_available: !catalog.is_empty(),
        view_mode: settings.view_mode,
        colorful_perks: settings.colorful_perks,
        perks_locked: settings.perks_locked,
        characters: character_cards(catalog, progress, settings, selection, query.role),
        perks: perk_tiles(catalog, progress, settings, &owners, selection, query),
        selected: selected_char.map(|c| selected_character(catalog, progress, c)),
        saved: saved_entries(catalog, progress),
        progress: [
            role_progress(catalog, progress, Role::Killer),
            role_progress(catalog, progress, Role::Survivor),
        ],
    }
}

/// Tierlist order: saved ids first (unknown ones skipped), then everything
/// else in catalog order.
fn ordered_characters<'c>(catalog: &'c Catalog, settings: &Settings, role: Role) -> Vec<&'c Character> {
    let in_role: Vec<&Character> = catalog.characters(role).collect();
    if settings.view_mode != ViewMode::Tierlist {
        return in_role;
    }
    let mut ordered: Vec<&Character> = Vec::with_capacity(in_role.len());
    for id in settings.character_order.get(role) {
        if let Some(&c) = in_role.iter().find(|c| &c.id == id) {
            if !ordered.iter().any(|o| o.id == c.id) {
                ordered.push(c);
            }
        }
    }
    for c in in_role {
        if !ordered.iter().any(|o| o.id == c.id) {
            ordered.push(c);
        }
    }
    ordered
}

fn character_cards(
    catalog: &Catalog,
    progress: &Progress,
    settings: &Settings,
    selection: Option<&str>,
    role: Role,
) -> Vec<CharacterCard> {
    ordered_characters(catalog, settings, role)
        .into_iter()
        .filter_map(|c| {
            let completed = progress.completed.contains(&c.id);
            let selected = selection == Some(c.id.as_str());
            if completed && !settings.show_completed && !selected {
                return None;
            }
            Some(CharacterCard {
                id: c.id.clone(),
                name: c.name.clone(),
                completed,
                selected,
                perk_count: progress.assignment.perks_of(&c.id).len(),
            })
        })
        .collect()
}

fn perk_tiles(
    catalog: &Catalog,
    progress: &Progress,
    settings: &Settings,
    owners: &HashMap<&str, &str>,
    selection: Option<&str>,
    query: &ViewQuery,
) -> Vec<PerkTile> {
    let needle = query.search.trim().to_lowercase();
    catalog
        .perks(query.role)
        .filter(|p| needle.is_empty() || p.name.to_lowercase().contains(&needle))
        .filter_map(|p| {
            let owner = owners.get(p.id.as_str()).copied();
            let owner_completed = owner.is_some_and(|o| progress.completed.contains(o));
            let hidden = match settings.show_used_perks_mode {
                UsedPerksMode::ShowAll => false,
                UsedPerksMode::HideUsed => owner.is_some(),
                UsedPerksMode::HideCompletedOwners => owner_completed,
            };
            if hidden {
                return None;
            }
            let interaction = match owner {
                None => PerkInteraction::Assign,
                Some(o) if Some(o) == selection => PerkInteraction::RemoveOnly,
                Some(_) if settings.perks_locked => PerkInteraction::RemoveOnly,
                Some(_) if owner_completed && !settings.allow_remove_from_completed => {
                    PerkInteraction::Protected
                }
                Some(_) => PerkInteraction::Reassign,
            };
            Some(PerkTile {
                id: p.id.clone(),
                name: p.name.clone(),
                owner: owner.map(|o| NamedRef {
                    id: o.to_string(),
                    name: catalog.character_name(o).to_string(),
                }),
                owner_completed,
                interaction,
            })
        })
        .collect()
}

fn named_perks(catalog: &Catalog, progress: &Progress, character_id: &str) -> Vec<NamedRef> {
    progress
        .assignment
        .perks_of(character_id)
        .iter()
        .map(|p| NamedRef {
            id: p.clone(),
            name: catalog.perk_name(p).to_string(),
        })
        .collect()
}

fn selected_character(catalog: &Catalog, progress: &Progress, character: &Character) -> SelectedCharacter {
    let mut slots: Vec<Option<NamedRef>> = named_perks(catalog, progress, &character.id)
        .into_iter()
        .map(Some)
        .collect();
    slots.resize(MAX_SLOTS, None);
    SelectedCharacter {
        id: character.id.clone(),
        name: character.name.clone(),
        completed: progress.completed.contains(&character.id),
        slots,
    }
}

fn saved_entries(catalog: &Catalog, progress: &Progress) -> Vec<SavedEntry> {
    Role::ALL
        .into_iter()
        .flat_map(|role| catalog.characters(role))
        .filter(|c| !progress.assignment.perks_of(&c.id).is_empty())
        .map(|c| SavedEntry {
            id: c.id.clone(),
            name: c.name.clone(),
            role: c.role,
            completed: progress.completed.contains(&c.id),
            perks: named_perks(catalog, progress, &c.id),
        })
        .collect()
}
