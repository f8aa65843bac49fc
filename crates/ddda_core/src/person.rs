//! The five logical owners of equipment and inventory.
//!
//! A [`Person`] is a bundle of node handles resolved once at load time; all
//! later reads and writes go straight through the record tree at O(1), no
//! re-querying. Storage is the odd one out: inventory and count only, no
//! body.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SaveError};
use crate::tree::{NodeId, Sel, Tree};
use crate::vocation::VOCATION_COUNT;

pub const LEVEL_MIN: i64 = 1;
pub const LEVEL_MAX: i64 = 200;
pub const VOCATION_MAX: i64 = VOCATION_COUNT as i64 - 1;
pub const PROFICIENCY_MIN: i64 = 1;
pub const PROFICIENCY_MAX: i64 = 9;

const ROW_TYPE: &str = "sItemManager::cITEM_PARAM_DATA";
const NAME_SENTINEL: &str = "???";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PersonKind {
    Player,
    MainPawn,
    PawnA,
    PawnB,
    Storage,
}

impl PersonKind {
    pub const ALL: [PersonKind; 5] = [
        PersonKind::Player,
        PersonKind::MainPawn,
        PersonKind::PawnA,
        PersonKind::PawnB,
        PersonKind::Storage,
    ];

    pub fn index(self) -> usize {
        match self {
            Self::Player => 0,
            Self::MainPawn => 1,
            Self::PawnA => 2,
            Self::PawnB => 3,
            Self::Storage => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Player => "Player",
            Self::MainPawn => "Main Pawn",
            Self::PawnA => "Pawn A",
            Self::PawnB => "Pawn B",
            Self::Storage => "Storage",
        }
    }
}

impl fmt::Display for PersonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The eleven fixed equipment slots, in the order the save stores them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EquipSlot {
    PrimaryWeapon,
    SecondaryWeapon,
    ChestClothing,
    LegClothing,
    HeadArmor,
    TorsoArmor,
    ArmsArmor,
    LegArmor,
    Cloak,
    Jewelry1,
    Jewelry2,
}

impl EquipSlot {
    pub const ALL: [EquipSlot; 11] = [
        EquipSlot::PrimaryWeapon,
        EquipSlot::SecondaryWeapon,
        EquipSlot::ChestClothing,
        EquipSlot::LegClothing,
        EquipSlot::HeadArmor,
        EquipSlot::TorsoArmor,
        EquipSlot::ArmsArmor,
        EquipSlot::LegArmor,
        EquipSlot::Cloak,
        EquipSlot::Jewelry1,
        EquipSlot::Jewelry2,
    ];

    pub fn index(self) -> usize {
        match self {
            Self::PrimaryWeapon => 0,
            Self::SecondaryWeapon => 1,
            Self::ChestClothing => 2,
            Self::LegClothing => 3,
            Self::HeadArmor => 4,
            Self::TorsoArmor => 5,
            Self::ArmsArmor => 6,
            Self::LegArmor => 7,
            Self::Cloak => 8,
            Self::Jewelry1 => 9,
            Self::Jewelry2 => 10,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PrimaryWeapon => "Primary Weapon",
            Self::SecondaryWeapon => "Secondary Weapon",
            Self::ChestClothing => "Chest Clothing",
            Self::LegClothing => "Leg Clothing",
            Self::HeadArmor => "Head Armor",
            Self::TorsoArmor => "Torso Armor",
            Self::ArmsArmor => "Arms Armor",
            Self::LegArmor => "Leg Armor",
            Self::Cloak => "Cloak",
            Self::Jewelry1 => "Jewelry 1",
            Self::Jewelry2 => "Jewelry 2",
        }
    }
}

impl fmt::Display for EquipSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field handles for one `sItemManager::cITEM_PARAM_DATA` row.
#[derive(Debug, Clone, Copy)]
pub struct ItemRow {
    num: NodeId,
    item_no: NodeId,
    flag: NodeId,
    chg_num: NodeId,
    day1: NodeId,
    day2: NodeId,
    day3: NodeId,
    mutation_pool: NodeId,
    owner_id: NodeId,
    key: NodeId,
}

impl ItemRow {
    pub(crate) fn bind(tree: &Tree, class: NodeId) -> Result<Self> {
        Ok(Self {
            num: tree.get_child(class, &Sel::tag("s16").name("data.mNum"))?,
            item_no: tree.get_child(class, &Sel::tag("s16").name("data.mItemNo"))?,
            flag: tree.get_child(class, &Sel::tag("u32").name("data.mFlag"))?,
            chg_num: tree.get_child(class, &Sel::tag("u16").name("data.mChgNum"))?,
            day1: tree.get_child(class, &Sel::tag("u16").name("data.mDay1"))?,
            day2: tree.get_child(class, &Sel::tag("u16").name("data.mDay2"))?,
            day3: tree.get_child(class, &Sel::tag("u16").name("data.mDay3"))?,
            mutation_pool: tree.get_child(class, &Sel::tag("s8").name("data.mMutationPool"))?,
            owner_id: tree.get_child(class, &Sel::tag("s8").name("data.mOwnerId"))?,
            key: tree.get_child(class, &Sel::tag("u32").name("data.mKey"))?,
        })
    }

    pub fn num(&self, tree: &Tree) -> Result<i64> {
        tree.value(self.num)
    }

    pub fn item_no(&self, tree: &Tree) -> Result<i64> {
        tree.value(self.item_no)
    }

    pub fn flag(&self, tree: &Tree) -> Result<i64> {
        tree.value(self.flag)
    }

    pub fn day1(&self, tree: &Tree) -> Result<i64> {
        tree.value(self.day1)
    }

    pub fn day2(&self, tree: &Tree) -> Result<i64> {
        tree.value(self.day2)
    }

    pub fn day3(&self, tree: &Tree) -> Result<i64> {
        tree.value(self.day3)
    }

    pub fn owner_id(&self, tree: &Tree) -> Result<i64> {
        tree.value(self.owner_id)
    }

    /// A row holds an item when the quantity is positive and the id is set.
    pub fn is_valid(&self, tree: &Tree) -> Result<bool> {
        Ok(self.num(tree)? > 0 && self.item_no(tree)? >= 0)
    }

    pub(crate) fn set_num(&self, tree: &mut Tree, value: i64) -> Result<()> {
        tree.set_value(self.num, value)
    }

    pub(crate) fn set_item_no(&self, tree: &mut Tree, value: i64) -> Result<()> {
        tree.set_value(self.item_no, value)
    }

    pub fn set_flag(&self, tree: &mut Tree, value: i64) -> Result<()> {
        tree.set_value(self.flag, value)
    }

    pub(crate) fn set_owner_id(&self, tree: &mut Tree, value: i64) -> Result<()> {
        tree.set_value(self.owner_id, value)
    }

    /// The three legacy quantity replicas, written together with `num`.
    pub(crate) fn set_day_replicas(&self, tree: &mut Tree, value: i64) -> Result<()> {
        tree.set_value(self.day1, value)?;
        tree.set_value(self.day2, value)?;
        tree.set_value(self.day3, value)
    }

    /// Full reset to the blank-row shape.
    pub(crate) fn clear(&self, tree: &mut Tree) -> Result<()> {
        tree.set_value(self.num, 0)?;
        tree.set_value(self.item_no, -1)?;
        tree.set_value(self.flag, 0)?;
        tree.set_value(self.chg_num, 0)?;
        self.set_day_replicas(tree, 0)?;
        tree.set_value(self.mutation_pool, 0)?;
        tree.set_value(self.owner_id, 0)?;
        tree.set_value(self.key, 0)
    }

    pub(crate) fn init(
        &self,
        tree: &mut Tree,
        item_no: i64,
        num: i64,
        flag: i64,
        owner: i64,
    ) -> Result<()> {
        tree.set_value(self.num, num)?;
        tree.set_value(self.item_no, item_no)?;
        tree.set_value(self.flag, flag)?;
        tree.set_value(self.chg_num, 0)?;
        self.set_day_replicas(tree, num)?;
        tree.set_value(self.mutation_pool, 0)?;
        tree.set_value(self.owner_id, owner)?;
        tree.set_value(self.key, 0)
    }
}

#[derive(Debug, Clone)]
struct Body {
    name: Vec<NodeId>,
    level: NodeId,
    vocation: NodeId,
    proficiency: Vec<NodeId>,
    equipment: Vec<ItemRow>,
}

#[derive(Debug, Clone)]
pub struct Person {
    kind: PersonKind,
    body: Option<Body>,
    rows: Vec<ItemRow>,
    count: NodeId,
}

impl Person {
    /// Resolve the fixed sub-trees for one person and cache every handle.
    pub fn load(tree: &Tree, kind: PersonKind) -> Result<Self> {
        let root = tree.root();

        if kind == PersonKind::Storage {
            let count = tree.get(root, &[Sel::tag("u32").name("mStorageItemCount")])?;
            let array = tree.get(root, &[Sel::tag("array").name("mStorageItem")])?;
            let rows = bind_rows(tree, array)?;
            return Ok(Self {
                kind,
                body: None,
                rows,
                count,
            });
        }

        let pdata = match kind {
            PersonKind::Player => tree.get(root, &[Sel::tag("class").name("mPl")])?,
            _ => {
                let pawns = tree.find_all(
                    root,
                    &[
                        Sel::tag("array").name("mCmc"),
                        Sel::tag("class").typed("cSAVE_DATA_CMC"),
                    ],
                );
                let pawn_index = kind.index() - 1;
                *pawns.get(pawn_index).ok_or_else(|| SaveError::Schema {
                    path: format!("array[name=mCmc]/class[type=cSAVE_DATA_CMC] #{pawn_index}"),
                })?
            }
        };

        // The four personal stores live side by side under the outer mItem
        // array, in person order.
        let stores = tree.find_all(
            root,
            &[
                Sel::tag("array").name("mItem"),
                Sel::tag("class").typed("cSAVE_DATA_ITEM"),
            ],
        );
        let store = *stores.get(kind.index()).ok_or_else(|| SaveError::Schema {
            path: format!(
                "array[name=mItem]/class[type=cSAVE_DATA_ITEM] #{}",
                kind.index()
            ),
        })?;
        let count = tree.get(store, &[Sel::tag("u32").name("mItemCount")])?;
        let inner = tree.get(store, &[Sel::tag("array").name("mItem")])?;
        let rows = bind_rows(tree, inner)?;

        let name = tree.find_all(
            pdata,
            &[Sel::tag("array").name("(u8*)mNameStr"), Sel::tag("u8")],
        );
        if name.is_empty() {
            return Err(SaveError::Schema {
                path: format!("{kind}: array[name=(u8*)mNameStr]/u8"),
            });
        }

        let level = tree.get(pdata, &[Sel::tag("u8").name("mLevel")])?;
        let vocation = tree.get(pdata, &[Sel::tag("u8").name("mJob")])?;
        let proficiency = tree.find_all(
            pdata,
            &[Sel::tag("array").name("mJobLevel"), Sel::tag("u8")],
        );
        if proficiency.len() != VOCATION_COUNT {
            return Err(SaveError::Schema {
                path: format!(
                    "{kind}: array[name=mJobLevel] has {} entries, expected {VOCATION_COUNT}",
                    proficiency.len()
                ),
            });
        }

        let equip_array = tree.get(pdata, &[Sel::tag("array").name("mEquipItem")])?;
        let equip_classes =
            tree.collect_descendants(equip_array, &Sel::tag("class").typed(ROW_TYPE));
        if equip_classes.len() < EquipSlot::ALL.len() {
            return Err(SaveError::Schema {
                path: format!(
                    "{kind}: array[name=mEquipItem] has {} rows, expected at least {}",
                    equip_classes.len(),
                    EquipSlot::ALL.len()
                ),
            });
        }
        let equipment = equip_classes[..EquipSlot::ALL.len()]
            .iter()
            .map(|&class| ItemRow::bind(tree, class))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            kind,
            body: Some(Body {
                name,
                level,
                vocation,
                proficiency,
                equipment,
            }),
            rows,
            count,
        })
    }

    pub fn kind(&self) -> PersonKind {
        self.kind
    }

    /// Whether this person carries identity and equipment (Storage does not).
    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    fn body(&self) -> Result<&Body> {
        self.body.as_ref().ok_or_else(|| {
            SaveError::InvalidOperation(format!("{} has no character data", self.kind))
        })
    }

    /// Display name decoded from the codepoint array; stops at the first
    /// non-positive code. Empty decodes to the `???` sentinel.
    pub fn name(&self, tree: &Tree) -> String {
        let Some(body) = &self.body else {
            return NAME_SENTINEL.to_string();
        };
        let mut name = String::new();
        for &id in &body.name {
            match tree.value(id) {
                Ok(code) if code > 0 => {
                    if let Some(ch) = char::from_u32(code as u32) {
                        name.push(ch);
                    }
                }
                _ => break,
            }
        }
        if name.is_empty() {
            NAME_SENTINEL.to_string()
        } else {
            name
        }
    }

    /// Write codepoints into the fixed-length name array, zero-filling the
    /// remainder. Refuses names that do not fit the array or a u8 code.
    pub fn set_name(&self, tree: &mut Tree, name: &str) -> Result<()> {
        let body = self.body()?;
        let codes: Vec<u32> = name.chars().map(u32::from).collect();
        if codes.len() > body.name.len() {
            return Err(SaveError::Value(format!(
                "name {name:?} needs {} codes, the save holds {}",
                codes.len(),
                body.name.len()
            )));
        }
        if codes.iter().any(|&code| code == 0 || code > 0xFF) {
            return Err(SaveError::Value(format!(
                "name {name:?} contains a codepoint outside the save's 8-bit range"
            )));
        }
        for (i, &id) in body.name.iter().enumerate() {
            let code = codes.get(i).copied().unwrap_or(0);
            tree.set_value(id, i64::from(code))?;
        }
        Ok(())
    }

    pub fn level(&self, tree: &Tree) -> Result<i64> {
        tree.value(self.body()?.level)
    }

    pub fn set_level(&self, tree: &mut Tree, level: i64) -> Result<()> {
        if !(LEVEL_MIN..=LEVEL_MAX).contains(&level) {
            return Err(SaveError::Value(format!(
                "level {level} outside {LEVEL_MIN}..={LEVEL_MAX}"
            )));
        }
        tree.set_value(self.body()?.level, level)
    }

    pub fn vocation(&self, tree: &Tree) -> Result<i64> {
        tree.value(self.body()?.vocation)
    }

    pub fn set_vocation(&self, tree: &mut Tree, vocation: i64) -> Result<()> {
        if !(0..=VOCATION_MAX).contains(&vocation) {
            return Err(SaveError::Value(format!(
                "vocation {vocation} outside 0..={VOCATION_MAX}"
            )));
        }
        tree.set_value(self.body()?.vocation, vocation)
    }

    /// Proficiency of the currently selected vocation.
    pub fn proficiency(&self, tree: &Tree) -> Result<i64> {
        let body = self.body()?;
        let vocation = tree.value(body.vocation)?;
        let slot = usize::try_from(vocation)
            .ok()
            .and_then(|i| body.proficiency.get(i))
            .ok_or_else(|| {
                SaveError::Value(format!(
                    "vocation {vocation} does not address the {VOCATION_COUNT}-entry proficiency array"
                ))
            })?;
        tree.value(*slot)
    }

    pub fn set_proficiency(&self, tree: &mut Tree, value: i64) -> Result<()> {
        if !(PROFICIENCY_MIN..=PROFICIENCY_MAX).contains(&value) {
            return Err(SaveError::Value(format!(
                "proficiency {value} outside {PROFICIENCY_MIN}..={PROFICIENCY_MAX}"
            )));
        }
        let body = self.body()?;
        let vocation = tree.value(body.vocation)?;
        let slot = usize::try_from(vocation)
            .ok()
            .and_then(|i| body.proficiency.get(i))
            .copied()
            .ok_or_else(|| {
                SaveError::Value(format!(
                    "vocation {vocation} does not address the {VOCATION_COUNT}-entry proficiency array"
                ))
            })?;
        tree.set_value(slot, value)
    }

    /// The row backing one equipment slot.
    pub fn equip_row(&self, slot: EquipSlot) -> Result<&ItemRow> {
        Ok(&self.body()?.equipment[slot.index()])
    }

    pub fn rows(&self) -> &[ItemRow] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Result<&ItemRow> {
        self.rows.get(index).ok_or_else(|| {
            SaveError::Lookup(format!(
                "{} row {index} (inventory has {})",
                self.kind,
                self.rows.len()
            ))
        })
    }

    pub(crate) fn count_node(&self) -> NodeId {
        self.count
    }

    /// The aggregate counter as recorded in the save.
    pub fn recorded_count(&self, tree: &Tree) -> Result<i64> {
        tree.value(self.count)
    }

    /// The aggregate the counter should hold: sum of valid row quantities.
    pub fn computed_count(&self, tree: &Tree) -> Result<i64> {
        let mut total = 0;
        for row in &self.rows {
            if row.is_valid(tree)? {
                total += row.num(tree)?;
            }
        }
        Ok(total)
    }
}

fn bind_rows(tree: &Tree, array: NodeId) -> Result<Vec<ItemRow>> {
    tree.find_all(array, &[Sel::tag("class").typed(ROW_TYPE)])
        .into_iter()
        .map(|class| ItemRow::bind(tree, class))
        .collect()
}
