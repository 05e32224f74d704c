//! Assignment Engine — decides whether a perk may go on a character and
//! applies the change.
//!
//! Policy for `assign`, in order:
//! 1. perk already on the target → toggle it off;
//! 2. perk on another character → blocked when perks are locked, blocked
//!    when that owner is completed and protection is on, otherwise moved;
//! 3. perk of the other role → rejected;
//! 4. target already has four perks → rejected;
//! 5. append to the target.
//!
//! Every check runs before anything is touched, so a rejected call leaves
//! the assignment exactly as it was.

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::debug;

use crate::catalog::{Catalog, Perk, Role};
use crate::error::AssignmentError;
use crate::tracker::progress::{Assignment, MAX_SLOTS, Progress};
use crate::tracker::settings::Settings;

/// What an engine call changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignmentMutation {
    Added { character: String, perk: String },
    Removed { character: String, perk: String },
    Reassigned { from: String, to: String, perk: String },
    Unchanged,
}

impl AssignmentMutation {
    pub fn changed(&self) -> bool {
        !matches!(self, AssignmentMutation::Unchanged)
    }
}

/// Pick the character an action targets: the explicit one if given,
/// otherwise the current selection.
pub fn resolve_target<'a>(
    explicit: Option<&'a str>,
    selection: Option<&'a str>,
) -> Result<&'a str, AssignmentError> {
    explicit
        .filter(|id| !id.is_empty())
        .or(selection)
        .ok_or(AssignmentError::NoCharacterSelected)
}

/// Assign `perk_id` to `character_id` following the module-level policy.
pub fn assign(
    catalog: &Catalog,
    settings: &Settings,
    progress: &mut Progress,
    character_id: &str,
    perk_id: &str,
) -> Result<AssignmentMutation, AssignmentError> {
    let character = catalog
        .character(character_id)
        .ok_or_else(|| AssignmentError::UnknownCharacter(character_id.to_string()))?;
    let perk = catalog
        .perk(perk_id)
        .ok_or_else(|| AssignmentError::UnknownPerk(perk_id.to_string()))?;
    let owner = progress.assignment.owner_of(perk_id).map(str::to_string);

    if owner.as_deref() == Some(character_id) {
        progress.assignment.take(character_id, perk_id);
        debug!(character = character_id, perk = perk_id, "perk toggled off");
        return Ok(finish(
            catalog,
            progress,
            AssignmentMutation::Removed {
                character: character_id.to_string(),
                perk: perk_id.to_string(),
            },
        ));
    }

    if let Some(owner) = owner.as_deref() {
        if settings.perks_locked {
            return Err(AssignmentError::PerkLocked {
                perk: perk_id.to_string(),
                owner: owner.to_string(),
            });
        }
        if progress.completed.contains(owner) && !settings.allow_remove_from_completed {
            return Err(AssignmentError::ProtectedByCompletion {
                perk: perk_id.to_string(),
                owner: owner.to_string(),
            });
        }
    }

    // Ownership policy answers first; a wrong-role perk still never lands.
    if perk.role != character.role {
        return Err(AssignmentError::RoleMismatch {
            character: character_id.to_string(),
            perk: perk_id.to_string(),
        });
    }

    // Moving a perk off its owner never frees a slot on the target.
    if progress.assignment.perks_of(character_id).len() >= MAX_SLOTS {
        return Err(AssignmentError::SlotsFull {
            character: character_id.to_string(),
        });
    }

    let mutation = match owner {
        Some(owner) => {
            progress.assignment.take(&owner, perk_id);
            progress.assignment.push(character_id, perk_id);
            AssignmentMutation::Reassigned {
                from: owner,
                to: character_id.to_string(),
                perk: perk_id.to_string(),
            }
        }
        None => {
            progress.assignment.push(character_id, perk_id);
            AssignmentMutation::Added {
                character: character_id.to_string(),
                perk: perk_id.to_string(),
            }
        }
    };
    debug!(?mutation, "perk assigned");
    Ok(finish(catalog, progress, mutation))
}

/// Remove `perk_id` from `character_id`. Never blocked by lock or
/// completion settings.
pub fn remove(progress: &mut Progress, character_id: &str, perk_id: &str) -> AssignmentMutation {
    if progress.assignment.take(character_id, perk_id) {
        AssignmentMutation::Removed {
            character: character_id.to_string(),
            perk: perk_id.to_string(),
        }
    } else {
        AssignmentMutation::Unchanged
    }
}

/// Remove `perk_id` from whoever holds it.
pub fn remove_from_owner(progress: &mut Progress, perk_id: &str) -> AssignmentMutation {
    match progress.assignment.owner_of(perk_id).map(str::to_string) {
        Some(owner) => remove(progress, &owner, perk_id),
        None => AssignmentMutation::Unchanged,
    }
}

/// Uniformly pick a perk of `role` that nobody holds.
pub fn pick_random_unused<'c, R>(
    catalog: &'c Catalog,
    assignment: &Assignment,
    role: Role,
    rng: &mut R,
) -> Option<&'c Perk>
where
    R: Rng + ?Sized,
{
    let owners = assignment.owners();
    let pool: Vec<&Perk> = catalog
        .perks(role)
        .filter(|p| !owners.contains_key(p.id.as_str()))
        .collect();
    pool.choose(rng).copied()
}

/// Put a random unused perk on `character_id`. A full loadout or an empty
/// pool is a no-op rather than an error.
pub fn add_random<R>(
    catalog: &Catalog,
    settings: &Settings,
    progress: &mut Progress,
    character_id: &str,
    rng: &mut R,
) -> Result<AssignmentMutation, AssignmentError>
where
    R: Rng + ?Sized,
{
    let character = catalog
        .character(character_id)
        .ok_or_else(|| AssignmentError::UnknownCharacter(character_id.to_string()))?;
    if progress.assignment.perks_of(character_id).len() >= MAX_SLOTS {
        return Ok(AssignmentMutation::Unchanged);
    }
    let Some(perk) = pick_random_unused(catalog, &progress.assignment, character.role, rng) else {
        return Ok(AssignmentMutation::Unchanged);
    };
    let perk_id = perk.id.clone();
    assign(catalog, settings, progress, character_id, &perk_id)
}

fn finish(catalog: &Catalog, progress: &Progress, mutation: AssignmentMutation) -> AssignmentMutation {
    debug_assert_eq!(progress.check_invariants(catalog), Ok(()));
    mutation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::sample_catalog;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn unlocked() -> Settings {
        Settings {
            perks_locked: false,
            ..Settings::default()
        }
    }

    #[test]
    fn fills_four_slots_then_rejects_fifth() {
        let catalog = sample_catalog();
        let settings = Settings::default();
        let mut progress = Progress::default();
        for perk in ["p1", "p2", "p3", "p4"] {
            let m = assign(&catalog, &settings, &mut progress, "the-trapper", perk).unwrap();
            assert!(matches!(m, AssignmentMutation::Added { .. }));
        }
        assert_eq!(progress.assignment.perks_of("the-trapper").len(), 4);

        let err = assign(&catalog, &settings, &mut progress, "the-trapper", "p5").unwrap_err();
        assert_eq!(
            err,
            AssignmentError::SlotsFull {
                character: "the-trapper".into()
            }
        );
        assert_eq!(progress.assignment.owner_of("p5"), None);
    }

    #[test]
    fn assigning_own_perk_toggles_it_off() {
        let catalog = sample_catalog();
        let settings = Settings::default();
        let mut progress = Progress::default();
        assign(&catalog, &settings, &mut progress, "the-trapper", "p1").unwrap();
        let m = assign(&catalog, &settings, &mut progress, "the-trapper", "p1").unwrap();
        assert_eq!(
            m,
            AssignmentMutation::Removed {
                character: "the-trapper".into(),
                perk: "p1".into()
            }
        );
        assert!(progress.assignment.is_empty());
    }

    #[test]
    fn toggle_off_works_even_when_full_and_locked() {
        let catalog = sample_catalog();
        let settings = Settings::default();
        let mut progress = Progress::default();
        for perk in ["p1", "p2", "p3", "p4"] {
            assign(&catalog, &settings, &mut progress, "the-trapper", perk).unwrap();
        }
        assert!(assign(&catalog, &settings, &mut progress, "the-trapper", "p3").is_ok());
        assert_eq!(progress.assignment.perks_of("the-trapper"), ["p1", "p2", "p4"]);
    }

    #[test]
    fn locked_perk_cannot_move() {
        let catalog = sample_catalog();
        let settings = Settings::default();
        let mut progress = Progress::default();
        assign(&catalog, &settings, &mut progress, "the-trapper", "p1").unwrap();
        let before = progress.clone();

        let err = assign(&catalog, &settings, &mut progress, "the-wraith", "p1").unwrap_err();
        assert!(matches!(err, AssignmentError::PerkLocked { ref owner, .. } if owner == "the-trapper"));
        assert_eq!(progress, before);
    }

    #[test]
    fn unlocked_perk_moves_to_new_owner() {
        let catalog = sample_catalog();
        let settings = unlocked();
        let mut progress = Progress::default();
        assign(&catalog, &settings, &mut progress, "the-trapper", "p1").unwrap();

        let m = assign(&catalog, &settings, &mut progress, "the-wraith", "p1").unwrap();
        assert_eq!(
            m,
            AssignmentMutation::Reassigned {
                from: "the-trapper".into(),
                to: "the-wraith".into(),
                perk: "p1".into()
            }
        );
        assert_eq!(progress.assignment.owner_of("p1"), Some("the-wraith"));
        // Emptied owner entry is gone entirely.
        assert_eq!(progress.assignment.len(), 1);
    }

    #[test]
    fn completed_owner_is_protected_unless_allowed() {
        let catalog = sample_catalog();
        let mut settings = unlocked();
        let mut progress = Progress::default();
        assign(&catalog, &settings, &mut progress, "the-trapper", "p1").unwrap();
        progress.completed.insert("the-trapper");
        let before = progress.clone();

        let err = assign(&catalog, &settings, &mut progress, "the-wraith", "p1").unwrap_err();
        assert!(matches!(err, AssignmentError::ProtectedByCompletion { .. }));
        assert_eq!(progress, before);

        settings.allow_remove_from_completed = true;
        assign(&catalog, &settings, &mut progress, "the-wraith", "p1").unwrap();
        assert_eq!(progress.assignment.owner_of("p1"), Some("the-wraith"));
        assert!(progress.assignment.perks_of("the-trapper").is_empty());
    }

    #[test]
    fn lock_is_checked_before_protection() {
        let catalog = sample_catalog();
        let settings = Settings::default();
        let mut progress = Progress::default();
        assign(&catalog, &settings, &mut progress, "the-trapper", "p1").unwrap();
        progress.completed.insert("the-trapper");
        let err = assign(&catalog, &settings, &mut progress, "the-wraith", "p1").unwrap_err();
        assert!(matches!(err, AssignmentError::PerkLocked { .. }));
    }

    #[test]
    fn reassignment_still_respects_target_cap() {
        let catalog = sample_catalog();
        let settings = unlocked();
        let mut progress = Progress::default();
        for perk in ["p1", "p2", "p3", "p4"] {
            assign(&catalog, &settings, &mut progress, "the-wraith", perk).unwrap();
        }
        assign(&catalog, &settings, &mut progress, "the-trapper", "p5").unwrap();
        let before = progress.clone();

        let err = assign(&catalog, &settings, &mut progress, "the-wraith", "p5").unwrap_err();
        assert!(matches!(err, AssignmentError::SlotsFull { .. }));
        assert_eq!(progress, before);
    }

    #[test]
    fn survivor_cannot_take_killer_perk() {
        let catalog = sample_catalog();
        let settings = unlocked();
        let mut progress = Progress::default();
        let err = assign(&catalog, &settings, &mut progress, "claudette", "p1").unwrap_err();
        assert!(matches!(err, AssignmentError::RoleMismatch { .. }));
        assert!(progress.assignment.is_empty());
    }

    #[test]
    fn protected_scenario_leaves_perk_on_trapper() {
        let catalog = sample_catalog();
        let settings = unlocked();
        let mut progress = Progress::default();
        assign(&catalog, &settings, &mut progress, "the-trapper", "p1").unwrap();
        progress.completed.insert("the-trapper");

        let err = assign(&catalog, &settings, &mut progress, "claudette", "p1").unwrap_err();
        assert!(matches!(err, AssignmentError::ProtectedByCompletion { ref owner, .. } if owner == "the-trapper"));
        let err = assign(&catalog, &settings, &mut progress, "the-wraith", "p1").unwrap_err();
        assert!(matches!(err, AssignmentError::ProtectedByCompletion { .. }));
        assert_eq!(progress.assignment.owner_of("p1"), Some("the-trapper"));
    }

    #[test]
    fn cross_role_request_reports_lock_first() {
        let catalog = sample_catalog();
        let settings = Settings::default();
        let mut progress = Progress::default();
        assign(&catalog, &settings, &mut progress, "the-trapper", "p1").unwrap();
        let before = progress.clone();

        let err = assign(&catalog, &settings, &mut progress, "dwight", "p1").unwrap_err();
        assert!(matches!(err, AssignmentError::PerkLocked { .. }));

        // Unlocked and unprotected, the role check still keeps p1 off a survivor.
        let err = assign(&catalog, &unlocked(), &mut progress, "dwight", "p1").unwrap_err();
        assert!(matches!(err, AssignmentError::RoleMismatch { .. }));
        assert_eq!(progress, before);
    }

    #[test]
    fn unknown_ids_are_rejected() {
        let catalog = sample_catalog();
        let settings = Settings::default();
        let mut progress = Progress::default();
        assert!(matches!(
            assign(&catalog, &settings, &mut progress, "nobody", "p1"),
            Err(AssignmentError::UnknownCharacter(_))
        ));
        assert!(matches!(
            assign(&catalog, &settings, &mut progress, "the-trapper", "nothing"),
            Err(AssignmentError::UnknownPerk(_))
        ));
    }

    #[test]
    fn remove_ignores_lock_and_protection() {
        let catalog = sample_catalog();
        let settings = Settings::default();
        let mut progress = Progress::default();
        assign(&catalog, &settings, &mut progress, "the-trapper", "p1").unwrap();
        progress.completed.insert("the-trapper");

        let m = remove_from_owner(&mut progress, "p1");
        assert!(m.changed());
        assert!(progress.assignment.is_empty());
        assert_eq!(remove(&mut progress, "the-trapper", "p1"), AssignmentMutation::Unchanged);
    }

    #[test]
    fn resolve_target_prefers_explicit() {
        assert_eq!(resolve_target(Some("a"), Some("b")), Ok("a"));
        assert_eq!(resolve_target(Some(""), Some("b")), Ok("b"));
        assert_eq!(resolve_target(None, Some("b")), Ok("b"));
        assert_eq!(
            resolve_target(None, None),
            Err(AssignmentError::NoCharacterSelected)
        );
    }

    #[test]
    fn random_pick_only_returns_free_perks_of_role() {
        let catalog = sample_catalog();
        let settings = Settings::default();
        let mut progress = Progress::default();
        for perk in ["p1", "p2", "p3", "p4"] {
            assign(&catalog, &settings, &mut progress, "the-wraith", perk).unwrap();
        }
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10 {
            let pick = pick_random_unused(&catalog, &progress.assignment, Role::Killer, &mut rng);
            assert_eq!(pick.map(|p| p.id.as_str()), Some("p5"));
        }
        assign(&catalog, &settings, &mut progress, "the-trapper", "p5").unwrap();
        assert!(pick_random_unused(&catalog, &progress.assignment, Role::Killer, &mut rng).is_none());
    }

    #[test]
    fn add_random_fills_until_pool_or_slots_run_out() {
        let catalog = sample_catalog();
        let settings = Settings::default();
        let mut progress = Progress::default();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..3 {
            let m = add_random(&catalog, &settings, &mut progress, "dwight", &mut rng).unwrap();
            assert!(m.changed());
        }
        // Three survivor perks exist; the fourth attempt finds an empty pool.
        let m = add_random(&catalog, &settings, &mut progress, "dwight", &mut rng).unwrap();
        assert_eq!(m, AssignmentMutation::Unchanged);
        assert_eq!(progress.assignment.perks_of("dwight").len(), 3);
        assert!(progress.check_invariants(&catalog).is_ok());
    }

    #[test]
    fn uniqueness_holds_across_mixed_operations() {
        let catalog = sample_catalog();
        let mut settings = unlocked();
        settings.allow_remove_from_completed = true;
        let mut progress = Progress::default();
        let ops = [
            ("the-trapper", "p1"),
            ("the-wraith", "p1"),
            ("the-trapper", "p2"),
            ("the-wraith", "p2"),
            ("the-wraith", "p1"),
            ("the-trapper", "p1"),
            ("claudette", "s1"),
            ("dwight", "s1"),
        ];
        for (character, perk) in ops {
            let _ = assign(&catalog, &settings, &mut progress, character, perk);
            assert!(progress.check_invariants(&catalog).is_ok());
        }
        assert_eq!(progress.assignment.owner_of("s1"), Some("dwight"));
    }
}
