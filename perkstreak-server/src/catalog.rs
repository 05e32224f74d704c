//! Catalog Store — every character and perk, for both roles.
//!
//! Parsed once from the `characters.json` document the page ships with and
//! read-only afterwards. An entry's role is the array it was listed in; ids
//! are never inspected to guess a role.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::CatalogError;

/// The two sides of the game. Perks are only usable within their own role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Killer,
    Survivor,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Killer, Role::Survivor];

    /// Plural form used by page paths, asset folders and storage keys.
    pub fn as_path(self) -> &'static str {
        match self {
            Role::Killer => "killers",
            Role::Survivor => "survivors",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Role::Killer => "Killers",
            Role::Survivor => "Survivors",
        }
    }
}

/// Parse a role from a query/form value. Accepts singular and plural forms.
pub fn parse_role(s: &str) -> Option<Role> {
    match s.trim().to_ascii_lowercase().as_str() {
        "killer" | "killers" => Some(Role::Killer),
        "survivor" | "survivors" => Some(Role::Survivor),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Character {
    /// Stable file-like key, e.g. `the-trapper`.
    pub id: String,
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Perk {
    /// Stable file-like key, e.g. `iconHelpLoudNoises.webp`.
    pub id: String,
    pub name: String,
    pub role: Role,
}

// ── Source document ────────────────────────────────────────────────

#[derive(Deserialize)]
struct CatalogDoc {
    killers: Vec<DocEntry>,
    survivors: Vec<DocEntry>,
    perks: PerkDoc,
}

#[derive(Deserialize)]
struct PerkDoc {
    killers: Vec<DocEntry>,
    survivors: Vec<DocEntry>,
}

/// One `{file, name}` entry. A `type` field may be present and is ignored.
#[derive(Deserialize)]
struct DocEntry {
    #[serde(alias = "id")]
    file: String,
    #[serde(default)]
    name: Option<String>,
}

impl DocEntry {
    fn into_parts(self) -> (String, String) {
        let name = self.name.unwrap_or_else(|| self.file.clone());
        (self.file, name)
    }
}

// ── Catalog ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    characters: Vec<Character>,
    perks: Vec<Perk>,
    character_index: HashMap<String, usize>,
    perk_index: HashMap<String, usize>,
}

impl Catalog {
    /// Build a catalog from already-typed entries. Later duplicates of an id
    /// are dropped so lookups stay unambiguous.
    pub fn new(characters: Vec<Character>, perks: Vec<Perk>) -> Self {
        let mut catalog = Catalog::default();
        for character in characters {
            if character.id.is_empty() || catalog.character_index.contains_key(&character.id) {
                continue;
            }
            catalog
                .character_index
                .insert(character.id.clone(), catalog.characters.len());
            catalog.characters.push(character);
        }
        for perk in perks {
            if perk.id.is_empty() || catalog.perk_index.contains_key(&perk.id) {
                continue;
            }
            catalog.perk_index.insert(perk.id.clone(), catalog.perks.len());
            catalog.perks.push(perk);
        }
        catalog
    }

    /// Parse the `characters.json` document.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let doc: CatalogDoc =
            serde_json::from_str(json).map_err(|e| CatalogError::LoadFailure(e.to_string()))?;

        let mut characters = Vec::with_capacity(doc.killers.len() + doc.survivors.len());
        for (entries, role) in [(doc.killers, Role::Killer), (doc.survivors, Role::Survivor)] {
            characters.extend(entries.into_iter().map(|e| {
                let (id, name) = e.into_parts();
                Character { id, name, role }
            }));
        }

        let mut perks = Vec::with_capacity(doc.perks.killers.len() + doc.perks.survivors.len());
        for (entries, role) in [
            (doc.perks.killers, Role::Killer),
            (doc.perks.survivors, Role::Survivor),
        ] {
            perks.extend(entries.into_iter().map(|e| {
                let (id, name) = e.into_parts();
                Perk { id, name, role }
            }));
        }

        Ok(Catalog::new(characters, perks))
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty() && self.perks.is_empty()
    }

    pub fn character(&self, id: &str) -> Option<&Character> {
        self.character_index.get(id).map(|&i| &self.characters[i])
    }

    pub fn perk(&self, id: &str) -> Option<&Perk> {
        self.perk_index.get(id).map(|&i| &self.perks[i])
    }

    /// Characters of one role, in document order.
    pub fn characters(&self, role: Role) -> impl Iterator<Item = &Character> {
        self.characters.iter().filter(move |c| c.role == role)
    }

    /// Perks of one role, in document order.
    pub fn perks(&self, role: Role) -> impl Iterator<Item = &Perk> {
        self.perks.iter().filter(move |p| p.role == role)
    }

    pub fn total(&self, role: Role) -> usize {
        self.characters(role).count()
    }

    pub fn role_of_character(&self, id: &str) -> Option<Role> {
        self.character(id).map(|c| c.role)
    }

    /// Display name for a character id, falling back to the id itself.
    pub fn character_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.character(id).map(|c| c.name.as_str()).unwrap_or(id)
    }

    /// Display name for a perk id, falling back to the id itself.
    pub fn perk_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.perk(id).map(|p| p.name.as_str()).unwrap_or(id)
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::sample_catalog;
    use super::*;

    #[test]
    fn parses_roles_from_source_arrays() {
        let catalog = sample_catalog();
        assert_eq!(catalog.total(Role::Killer), 2);
        assert_eq!(catalog.total(Role::Survivor), 2);
        assert_eq!(catalog.role_of_character("claudette"), Some(Role::Survivor));
        assert_eq!(catalog.perk("p5").map(|p| p.role), Some(Role::Killer));
        assert_eq!(catalog.perks(Role::Survivor).count(), 3);
    }

    #[test]
    fn role_never_comes_from_id_prefix() {
        let json = r#"{
            "killers": [{"file": "onryo", "name": "The Onryo"}],
            "survivors": [{"file": "the-survivor", "name": "Odd Name"}],
            "perks": {"killers": [], "survivors": []}
        }"#;
        let catalog = Catalog::from_json(json).unwrap();
        assert_eq!(catalog.role_of_character("onryo"), Some(Role::Killer));
        assert_eq!(catalog.role_of_character("the-survivor"), Some(Role::Survivor));
    }

    #[test]
    fn missing_name_falls_back_to_id() {
        let json = r#"{
            "killers": [{"file": "the-nurse"}],
            "survivors": [],
            "perks": {"killers": [], "survivors": []}
        }"#;
        let catalog = Catalog::from_json(json).unwrap();
        assert_eq!(catalog.character_name("the-nurse"), "the-nurse");
    }

    #[test]
    fn duplicate_ids_keep_first() {
        let json = r#"{
            "killers": [{"file": "the-nurse", "name": "First"}, {"file": "the-nurse", "name": "Second"}],
            "survivors": [],
            "perks": {"killers": [], "survivors": []}
        }"#;
        let catalog = Catalog::from_json(json).unwrap();
        assert_eq!(catalog.total(Role::Killer), 1);
        assert_eq!(catalog.character_name("the-nurse"), "First");
    }

    #[test]
    fn malformed_document_is_load_failure() {
        assert!(matches!(
            Catalog::from_json("not json"),
            Err(CatalogError::LoadFailure(_))
        ));
        assert!(Catalog::from_json(r#"{"killers": []}"#).is_err());
    }

    #[test]
    fn parse_role_accepts_both_forms() {
        assert_eq!(parse_role("killers"), Some(Role::Killer));
        assert_eq!(parse_role("Survivor"), Some(Role::Survivor));
        assert_eq!(parse_role("spectator"), None);
    }
}
