//! Read-only item catalog.
//!
//! The table is produced offline (scraped reference data) and injected into
//! whatever needs it; nothing here mutates at runtime. Keys are the same
//! numeric ids the save stores in `item_no`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Type strings that classify as armor for flag decoding.
pub const ARMOR_TYPES: [&str; 7] = [
    "Arms Armor",
    "Chest Clothing",
    "Cloak",
    "Head Armor",
    "Leg Armor",
    "Leg Clothing",
    "Torso Armor",
];

/// Type strings that classify as weapons for flag decoding.
pub const WEAPON_TYPES: [&str; 12] = [
    "Archistaves",
    "Daggers",
    "Longbows",
    "Longswords",
    "Maces",
    "Magick Bows",
    "Magick Shields",
    "Shields",
    "Shortbows",
    "Staves",
    "Swords",
    "Warhammers",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemCategory {
    Weapon,
    Armor,
    Jewelry,
    Other,
}

impl ItemCategory {
    pub fn from_type_name(kind: &str) -> Self {
        if WEAPON_TYPES.contains(&kind) {
            Self::Weapon
        } else if ARMOR_TYPES.contains(&kind) {
            Self::Armor
        } else if kind == "Jewelry" {
            Self::Jewelry
        } else {
            Self::Other
        }
    }

    pub fn is_equipment(self) -> bool {
        matches!(self, Self::Weapon | Self::Armor)
    }
}

/// One catalog row. Field names follow the scraped reference tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemEntry {
    #[serde(rename = "ID")]
    pub id: i64,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "desc", default)]
    pub description: String,
}

#[derive(Debug, Clone, Default)]
pub struct ItemCatalog {
    entries: BTreeMap<i64, ItemEntry>,
}

impl ItemCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries<I: IntoIterator<Item = ItemEntry>>(entries: I) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|entry| (entry.id, entry))
                .collect(),
        }
    }

    pub fn lookup(&self, id: i64) -> Option<&ItemEntry> {
        self.entries.get(&id)
    }

    /// Category for flag decoding; ids the catalog does not know fall back
    /// to `Other`.
    pub fn category(&self, id: i64) -> ItemCategory {
        self.lookup(id)
            .map(|entry| ItemCategory::from_type_name(&entry.kind))
            .unwrap_or(ItemCategory::Other)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &ItemEntry> {
        self.entries.values()
    }
}
