//! User settings. Each field is persisted under its own key and read
//! independently; nothing here constrains any other field.

use serde::{Deserialize, Serialize};

use crate::catalog::Role;

/// Which perks the pool shows. Persisted as `0`, `1`, `2`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UsedPerksMode {
    #[default]
    ShowAll,
    HideUsed,
    /// Hide only perks whose owner is a completed character.
    HideCompletedOwners,
}

impl UsedPerksMode {
    pub fn code(self) -> u8 {
        match self {
            UsedPerksMode::ShowAll => 0,
            UsedPerksMode::HideUsed => 1,
            UsedPerksMode::HideCompletedOwners => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(UsedPerksMode::ShowAll),
            1 => Some(UsedPerksMode::HideUsed),
            2 => Some(UsedPerksMode::HideCompletedOwners),
            _ => None,
        }
    }

    /// Toggle button cycle: show all → hide used → hide completed → show all.
    pub fn next(self) -> Self {
        match self {
            UsedPerksMode::ShowAll => UsedPerksMode::HideUsed,
            UsedPerksMode::HideUsed => UsedPerksMode::HideCompletedOwners,
            UsedPerksMode::HideCompletedOwners => UsedPerksMode::ShowAll,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            UsedPerksMode::ShowAll => "Show All",
            UsedPerksMode::HideUsed => "Hide Used",
            UsedPerksMode::HideCompletedOwners => "Hide Completed",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewMode {
    #[default]
    Normal,
    Tierlist,
}

impl ViewMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ViewMode::Normal => "normal",
            ViewMode::Tierlist => "tierlist",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "normal" => Some(ViewMode::Normal),
            "tierlist" => Some(ViewMode::Tierlist),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            ViewMode::Normal => ViewMode::Tierlist,
            ViewMode::Tierlist => ViewMode::Normal,
        }
    }
}

/// Display options forwarded to the broadcaster overlay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OverlaySettings {
    pub show_killers: bool,
    pub show_survivors: bool,
    pub show_current_character: bool,
    pub compact_mode: bool,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            show_killers: true,
            show_survivors: true,
            show_current_character: false,
            compact_mode: false,
        }
    }
}

/// Manual tierlist ordering, one list of character ids per role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharacterOrder {
    pub killers: Vec<String>,
    pub survivors: Vec<String>,
}

impl CharacterOrder {
    pub fn get(&self, role: Role) -> &[String] {
        match role {
            Role::Killer => &self.killers,
            Role::Survivor => &self.survivors,
        }
    }

    pub fn set(&mut self, role: Role, order: Vec<String>) {
        match role {
            Role::Killer => self.killers = order,
            Role::Survivor => self.survivors = order,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub perks_locked: bool,
    pub allow_remove_from_completed: bool,
    pub show_used_perks_mode: UsedPerksMode,
    pub show_completed: bool,
    pub colorful_perks: bool,
    pub view_mode: ViewMode,
    pub overlay: OverlaySettings,
    pub character_order: CharacterOrder,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            perks_locked: true, // Reassignment needs an explicit unlock
            allow_remove_from_completed: false,
            show_used_perks_mode: UsedPerksMode::ShowAll,
            show_completed: true,
            colorful_perks: false,
            view_mode: ViewMode::Normal,
            overlay: OverlaySettings::default(),
            character_order: CharacterOrder::default(),
        }
    }
}

/// A setting the settings panel can flip or cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    PerksLocked,
    AllowRemoveFromCompleted,
    ShowUsedPerksMode,
    ShowCompleted,
    ColorfulPerks,
    ViewMode,
}

impl SettingKey {
    pub const ALL: [SettingKey; 6] = [
        SettingKey::PerksLocked,
        SettingKey::AllowRemoveFromCompleted,
        SettingKey::ShowUsedPerksMode,
        SettingKey::ShowCompleted,
        SettingKey::ColorfulPerks,
        SettingKey::ViewMode,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SettingKey::PerksLocked => "perks_locked",
            SettingKey::AllowRemoveFromCompleted => "allow_remove_from_completed",
            SettingKey::ShowUsedPerksMode => "show_used_perks_mode",
            SettingKey::ShowCompleted => "show_completed",
            SettingKey::ColorfulPerks => "colorful_perks",
            SettingKey::ViewMode => "view_mode",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        SettingKey::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

impl Settings {
    /// Flip a boolean or advance a multi-state setting by one step.
    pub fn advance(&mut self, key: SettingKey) {
        match key {
            SettingKey::PerksLocked => self.perks_locked = !self.perks_locked,
            SettingKey::AllowRemoveFromCompleted => {
                self.allow_remove_from_completed = !self.allow_remove_from_completed
            }
            SettingKey::ShowUsedPerksMode => {
                self.show_used_perks_mode = self.show_used_perks_mode.next()
            }
            SettingKey::ShowCompleted => self.show_completed = !self.show_completed,
            SettingKey::ColorfulPerks => self.colorful_perks = !self.colorful_perks,
            SettingKey::ViewMode => self.view_mode = self.view_mode.toggled(),
        }
    }

    /// Short human-readable state for the settings panel buttons.
    pub fn describe(&self, key: SettingKey) -> &'static str {
        match key {
            SettingKey::PerksLocked => {
                if self.perks_locked {
                    "🔒 Perks Locked"
                } else {
                    "🔓 Perks Unlocked"
                }
            }
            SettingKey::AllowRemoveFromCompleted => {
                if self.allow_remove_from_completed {
                    "🔓 Allow Remove from Completed"
                } else {
                    "🔒 Protect Completed"
                }
            }
            SettingKey::ShowUsedPerksMode => self.show_used_perks_mode.label(),
            SettingKey::ShowCompleted => {
                if self.show_completed {
                    "🏆 Completed Shown"
                } else {
                    "🏆 Completed Hidden"
                }
            }
            SettingKey::ColorfulPerks => {
                if self.colorful_perks {
                    "🎨 Colorful Perks"
                } else {
                    "🖤 Simple Perks"
                }
            }
            SettingKey::ViewMode => match self.view_mode {
                ViewMode::Normal => "Normal View",
                ViewMode::Tierlist => "Tierlist View",
            },
        }
    }
}
