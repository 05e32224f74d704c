//! Error families surfaced by the tracker.
//!
//! Policy failures are recoverable and reported straight back to the action
//! that caused them. Persistence read failures never show up here; they fall
//! back to defaults inside the storage layer.

use thiserror::Error;

/// A rejected assignment, removal or completion action. State is untouched
/// whenever one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssignmentError {
    #[error("Pick a character first.")]
    NoCharacterSelected,

    #[error("unknown character: {0}")]
    UnknownCharacter(String),

    #[error("unknown perk: {0}")]
    UnknownPerk(String),

    #[error("perk {perk} belongs to the other role than {character}")]
    RoleMismatch { character: String, perk: String },

    #[error("perk {perk} is already used by {owner}; unlock perks to reassign it")]
    PerkLocked { perk: String, owner: String },

    #[error("perk {perk} is assigned to completed character {owner}; allow removal from completed to reassign it")]
    ProtectedByCompletion { perk: String, owner: String },

    #[error("{character} already has 4 perks")]
    SlotsFull { character: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    #[error("Invalid progress file format: {0}")]
    InvalidFormat(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("character data could not be loaded: {0}")]
    LoadFailure(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("overlay bridge unavailable: {0}")]
    Unavailable(String),
}
