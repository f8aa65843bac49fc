//! Fixed vocation table, indexed by the save's vocation byte.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vocation {
    pub name: &'static str,
    pub primary: &'static [&'static str],
    pub secondary: &'static [&'static str],
}

pub const VOCATION_COUNT: usize = 9;

pub const VOCATIONS: [Vocation; VOCATION_COUNT] = [
    Vocation {
        name: "Fighter",
        primary: &["Swords"],
        secondary: &["Shields"],
    },
    Vocation {
        name: "Strider",
        primary: &["Daggers"],
        secondary: &["Shortbows"],
    },
    Vocation {
        name: "Mage",
        primary: &["Staves"],
        secondary: &[],
    },
    Vocation {
        name: "Mystic Knight",
        primary: &["Swords", "Staves", "Maces"],
        secondary: &["Magick Shields"],
    },
    Vocation {
        name: "Assassin",
        primary: &["Swords", "Daggers"],
        secondary: &["Shields", "Shortbows"],
    },
    Vocation {
        name: "Magick Archer",
        primary: &["Staves", "Daggers"],
        secondary: &["Magick Bows"],
    },
    Vocation {
        name: "Warrior",
        primary: &["Longswords", "Warhammers"],
        secondary: &["Shields"],
    },
    Vocation {
        name: "Ranger",
        primary: &["Daggers"],
        secondary: &["Longbows"],
    },
    Vocation {
        name: "Sorcerer",
        primary: &["Archistaves"],
        secondary: &[],
    },
];

pub fn get(index: i64) -> Option<&'static Vocation> {
    usize::try_from(index).ok().and_then(|i| VOCATIONS.get(i))
}

pub fn name(index: i64) -> &'static str {
    get(index).map(|vocation| vocation.name).unwrap_or("Unknown")
}
