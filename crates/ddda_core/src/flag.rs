//! Bit-packed per-row flag word.
//!
//! Weapons and armor carry an enhancement tier plus two state bits; jewelry
//! carries a word whose layout is still unmapped and is passed through
//! opaquely. Which reading applies is decided once, from the item's catalog
//! category, and never re-inspected afterwards.

use serde::{Deserialize, Serialize};

use crate::catalog::ItemCategory;
use crate::error::{Result, SaveError};

pub const EQUIPPED_BIT: u32 = 0x02;
pub const PURIFIED_BIT: u32 = 0x80;
const STATE_BITS: u32 = EQUIPPED_BIT | PURIFIED_BIT;

/// Fixed id <-> tier table. Ids are compared with the state bits cleared on
/// both sides; 1 and 3 both read as "no stars" (the bare id and the id as
/// the game writes it).
const TIERS: [(u32, TierTag); 8] = [
    (1, TierTag::NoStars),
    (3, TierTag::NoStars),
    (13, TierTag::OneStar),
    (19, TierTag::TwoStars),
    (35, TierTag::ThreeStars),
    (67, TierTag::Dragonforged),
    (515, TierTag::SilverForged),
    (1027, TierTag::GoldForged),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TierTag {
    NoStars,
    OneStar,
    TwoStars,
    ThreeStars,
    Dragonforged,
    SilverForged,
    GoldForged,
}

impl TierTag {
    pub const ALL: [TierTag; 7] = [
        TierTag::NoStars,
        TierTag::OneStar,
        TierTag::TwoStars,
        TierTag::ThreeStars,
        TierTag::Dragonforged,
        TierTag::SilverForged,
        TierTag::GoldForged,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoStars => "no stars",
            Self::OneStar => "1 star",
            Self::TwoStars => "2 stars",
            Self::ThreeStars => "3 stars",
            Self::Dragonforged => "dragonforged",
            Self::SilverForged => "silver forged",
            Self::GoldForged => "gold forged",
        }
    }

    /// Table id with the state bits cleared; what `encode` writes.
    fn base_id(self) -> u32 {
        match self {
            Self::NoStars => 1,
            Self::OneStar => 13,
            Self::TwoStars => 17,
            Self::ThreeStars => 33,
            Self::Dragonforged => 65,
            Self::SilverForged => 513,
            Self::GoldForged => 1025,
        }
    }
}

impl std::fmt::Display for TierTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded tier state of a weapon or armor row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierFlag {
    pub tier: TierTag,
    pub equipped: bool,
    pub purified: bool,
}

impl TierFlag {
    pub fn decode(raw: u32) -> Result<Self> {
        let masked = raw & !STATE_BITS;
        let tier = TIERS
            .iter()
            .find(|(id, _)| id & !STATE_BITS == masked)
            .map(|&(_, tag)| tag)
            .ok_or(SaveError::UnknownTier { raw, masked })?;
        Ok(Self {
            tier,
            equipped: raw & EQUIPPED_BIT != 0,
            purified: raw & PURIFIED_BIT != 0,
        })
    }

    pub fn encode(self) -> u32 {
        let mut raw = self.tier.base_id();
        if self.equipped {
            raw |= EQUIPPED_BIT;
        }
        if self.purified {
            raw |= PURIFIED_BIT;
        }
        raw
    }
}

/// A row's flag word, read according to the item's catalog category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Flag {
    Tier(TierFlag),
    /// Jewelry sub-flags are not decoded yet; the raw word rides along.
    Jewel(u32),
    /// Non-equipment rows; carries the raw word for display only.
    Unknown(u32),
}

impl Flag {
    pub fn decode(raw: u32, category: ItemCategory) -> Result<Self> {
        match category {
            ItemCategory::Weapon | ItemCategory::Armor => {
                TierFlag::decode(raw).map(Flag::Tier)
            }
            ItemCategory::Jewelry => Ok(Flag::Jewel(raw)),
            ItemCategory::Other => Ok(Flag::Unknown(raw)),
        }
    }

    /// Recompose the on-disk word. An `Unknown` flag cannot be encoded;
    /// asking for it means a category was lost upstream.
    pub fn encode(self) -> Result<u32> {
        match self {
            Flag::Tier(tier) => Ok(tier.encode()),
            Flag::Jewel(raw) => Ok(raw),
            Flag::Unknown(raw) => Err(SaveError::InvalidOperation(format!(
                "flag {raw:#010x} has no known layout to encode"
            ))),
        }
    }

    /// Display tag, mirroring what the tier table calls each state.
    pub fn tag(&self) -> String {
        match self {
            Flag::Tier(tier) => tier.tier.as_str().to_string(),
            Flag::Jewel(raw) => raw.to_string(),
            Flag::Unknown(_) => "UNKNOWN".to_string(),
        }
    }
}
