//! Editing session: owns the decoded tree and applies the mutations that
//! keep each inventory's aggregate counter consistent.
//!
//! Anything that smells wrong but is survivable (replica mismatches, count
//! drift, a full inventory) is an [`Anomaly`]: logged, handed to observers,
//! visible in the diff, never silently corrected and never fatal. Load and
//! save failures are real errors and abort outright.

use std::fmt;
use std::fs;
use std::path::Path;

use log::warn;
use serde::Serialize;

use crate::container::{self, Header};
use crate::diff::{self, DiffLine};
use crate::error::{Result, SaveError};
use crate::person::{EquipSlot, Person, PersonKind};
use crate::tree::{NodeId, Tree};

/// Owner written into rows this engine creates. The game itself is
/// inconsistent here (0, the person index, or 4 have all been observed);
/// 0 is what the last known-good revision wrote.
pub const DEFAULT_OWNER: i64 = 0;

/// Tier table id for a factory-fresh row.
const LOWEST_TIER_ID: i64 = 1;

/// Survivable inconsistencies surfaced to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Anomaly {
    /// `day1/day2/day3` must replicate `num` on every held row.
    QuantityReplicaMismatch {
        person: PersonKind,
        row: usize,
        num: i64,
        day1: i64,
        day2: i64,
        day3: i64,
    },
    /// The recorded aggregate disagrees with the summed row quantities.
    CountMismatch {
        person: PersonKind,
        recorded: i64,
        computed: i64,
    },
    /// A row whose owner byte is not the person holding it.
    UnexpectedOwner {
        person: PersonKind,
        row: usize,
        owner: i64,
    },
    /// `add` found no blank row; the inventory was left untouched.
    NoFreeSlot { person: PersonKind, item_no: i64 },
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QuantityReplicaMismatch {
                person,
                row,
                num,
                day1,
                day2,
                day3,
            } => write!(
                f,
                "{person} row {row}: quantities do not match ({num} :: {day1} :: {day2} :: {day3})"
            ),
            Self::CountMismatch {
                person,
                recorded,
                computed,
            } => write!(
                f,
                "{person}: item count mismatch (recorded {recorded} != computed {computed})"
            ),
            Self::UnexpectedOwner { person, row, owner } => {
                write!(f, "{person} row {row}: unexpected owner {owner}")
            }
            Self::NoFreeSlot { person, item_no } => {
                write!(f, "{person}: no free slot for item {item_no}")
            }
        }
    }
}

/// Notifications dispatched to observers after each mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SessionEvent {
    PersonChanged { person: PersonKind },
    RowChanged { person: PersonKind, row: usize },
    Anomaly(Anomaly),
}

pub type Observer = Box<dyn FnMut(&SessionEvent)>;

/// Identity summary of one person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonSnapshot {
    pub person: PersonKind,
    pub name: Option<String>,
    pub level: Option<i64>,
    pub vocation: Option<i64>,
    pub proficiency: Option<i64>,
    pub recorded_count: i64,
    pub computed_count: i64,
}

/// One held inventory row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ItemSnapshot {
    pub row: usize,
    pub item_no: i64,
    pub num: i64,
    pub flag: u32,
    pub owner: i64,
}

/// One equipment slot; `item_no` is -1 when nothing is worn there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EquipmentSnapshot {
    pub slot: EquipSlot,
    pub item_no: i64,
    pub flag: u32,
}

pub struct EditSession {
    header: Header,
    tree: Tree,
    original_xml: String,
    persons: Vec<Person>,
    observers: Vec<Observer>,
}

impl std::fmt::Debug for EditSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditSession")
            .field("header", &self.header)
            .field("tree", &self.tree)
            .field("original_xml", &self.original_xml)
            .field("persons", &self.persons)
            .field("observers", &format_args!("[{} observer(s)]", self.observers.len()))
            .finish()
    }
}

impl EditSession {
    /// Decode a full save block and bind the five persons. Any failure
    /// aborts the load; no partial session is ever returned.
    pub fn from_bytes(block: &[u8]) -> Result<Self> {
        let (header, payload) = container::decode(block)?;
        let original_xml = String::from_utf8(payload)
            .map_err(|e| SaveError::Decode(format!("payload is not UTF-8: {e}")))?;
        let tree = Tree::parse(original_xml.as_bytes())?;
        let persons = PersonKind::ALL
            .iter()
            .map(|&kind| Person::load(&tree, kind))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            header,
            tree,
            original_xml,
            persons,
            observers: Vec::new(),
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_bytes(&fs::read(path)?)
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn person(&self, kind: PersonKind) -> &Person {
        &self.persons[kind.index()]
    }

    pub fn subscribe(&mut self, observer: Observer) {
        self.observers.push(observer);
    }

    fn emit(&mut self, event: SessionEvent) {
        for observer in &mut self.observers {
            observer(&event);
        }
    }

    pub fn snapshot(&self, kind: PersonKind) -> Result<PersonSnapshot> {
        let person = self.person(kind);
        let (name, level, vocation, proficiency) = if person.has_body() {
            (
                Some(person.name(&self.tree)),
                Some(person.level(&self.tree)?),
                Some(person.vocation(&self.tree)?),
                person.proficiency(&self.tree).ok(),
            )
        } else {
            (None, None, None, None)
        };
        Ok(PersonSnapshot {
            person: kind,
            name,
            level,
            vocation,
            proficiency,
            recorded_count: person.recorded_count(&self.tree)?,
            computed_count: person.computed_count(&self.tree)?,
        })
    }

    /// Valid rows of one inventory, in index order.
    pub fn items(&self, kind: PersonKind) -> Result<Vec<ItemSnapshot>> {
        let person = self.person(kind);
        let mut out = Vec::new();
        for (index, row) in person.rows().iter().enumerate() {
            if !row.is_valid(&self.tree)? {
                continue;
            }
            out.push(ItemSnapshot {
                row: index,
                item_no: row.item_no(&self.tree)?,
                num: row.num(&self.tree)?,
                flag: row.flag(&self.tree)? as u32,
                owner: row.owner_id(&self.tree)?,
            });
        }
        Ok(out)
    }

    /// All eleven equipment slots of a person, empty ones included.
    pub fn equipment(&self, kind: PersonKind) -> Result<Vec<EquipmentSnapshot>> {
        let person = self.person(kind);
        let mut out = Vec::with_capacity(EquipSlot::ALL.len());
        for slot in EquipSlot::ALL {
            let row = person.equip_row(slot)?;
            out.push(EquipmentSnapshot {
                slot,
                item_no: row.item_no(&self.tree)?,
                flag: row.flag(&self.tree)? as u32,
            });
        }
        Ok(out)
    }

    pub fn set_name(&mut self, kind: PersonKind, name: &str) -> Result<()> {
        self.persons[kind.index()].set_name(&mut self.tree, name)?;
        self.emit(SessionEvent::PersonChanged { person: kind });
        Ok(())
    }

    pub fn set_level(&mut self, kind: PersonKind, level: i64) -> Result<()> {
        self.persons[kind.index()].set_level(&mut self.tree, level)?;
        self.emit(SessionEvent::PersonChanged { person: kind });
        Ok(())
    }

    pub fn set_vocation(&mut self, kind: PersonKind, vocation: i64) -> Result<()> {
        self.persons[kind.index()].set_vocation(&mut self.tree, vocation)?;
        self.emit(SessionEvent::PersonChanged { person: kind });
        Ok(())
    }

    pub fn set_proficiency(&mut self, kind: PersonKind, value: i64) -> Result<()> {
        self.persons[kind.index()].set_proficiency(&mut self.tree, value)?;
        self.emit(SessionEvent::PersonChanged { person: kind });
        Ok(())
    }

    /// Apply a quantity delta to one row.
    ///
    /// A positive result writes `num` and all three day replicas; a result
    /// at or below zero resets the whole row to the blank shape. The
    /// inventory's aggregate moves by exactly the clamped difference either
    /// way.
    pub fn row_inc(&mut self, kind: PersonKind, row: usize, delta: i64) -> Result<()> {
        let handle = *self.person(kind).row(row)?;
        let count = self.person(kind).count_node();
        let old = handle.num(&self.tree)?;
        let new = old + delta;
        if new > 0 {
            handle.set_num(&mut self.tree, new)?;
            handle.set_day_replicas(&mut self.tree, new)?;
        } else {
            handle.clear(&mut self.tree)?;
        }
        self.bump_count(count, new.max(0) - old)?;
        self.emit(SessionEvent::RowChanged { person: kind, row });
        Ok(())
    }

    /// Put one unit of `item_no` into the first blank row.
    ///
    /// Returns the row used. A full inventory returns `None` with a
    /// `NoFreeSlot` anomaly and no mutation at all.
    pub fn add(&mut self, kind: PersonKind, item_no: i64) -> Result<Option<usize>> {
        let mut target = None;
        for index in 0..self.person(kind).rows().len() {
            let handle = *self.person(kind).row(index)?;
            if handle.num(&self.tree)? == 0 {
                target = Some((index, handle));
                break;
            }
        }
        let Some((index, handle)) = target else {
            let anomaly = Anomaly::NoFreeSlot {
                person: kind,
                item_no,
            };
            warn!("{anomaly}");
            self.emit(SessionEvent::Anomaly(anomaly));
            return Ok(None);
        };
        let count = self.person(kind).count_node();
        handle.init(&mut self.tree, item_no, 1, LOWEST_TIER_ID, DEFAULT_OWNER)?;
        self.bump_count(count, 1)?;
        self.emit(SessionEvent::RowChanged { person: kind, row: index });
        Ok(Some(index))
    }

    /// Merge a delta into the stack already carrying `item_no`, or open a
    /// fresh row for a positive delta. Returns the row touched.
    pub fn give(&mut self, kind: PersonKind, item_no: i64, delta: i64) -> Result<Option<usize>> {
        for index in 0..self.person(kind).rows().len() {
            let handle = *self.person(kind).row(index)?;
            if handle.is_valid(&self.tree)? && handle.item_no(&self.tree)? == item_no {
                self.row_inc(kind, index, delta)?;
                return Ok(Some(index));
            }
        }
        if delta <= 0 {
            return Ok(None);
        }
        let Some(index) = self.add(kind, item_no)? else {
            return Ok(None);
        };
        if delta > 1 {
            self.row_inc(kind, index, delta - 1)?;
        }
        Ok(Some(index))
    }

    /// Sweep one inventory for survivable inconsistencies. Everything found
    /// is logged and dispatched; nothing is corrected.
    pub fn validate(&mut self, kind: PersonKind) -> Result<Vec<Anomaly>> {
        let mut found = Vec::new();
        let person = self.person(kind);
        let expected_owner = kind.index() as i64;
        for (index, row) in person.rows().iter().enumerate() {
            if !row.is_valid(&self.tree)? {
                continue;
            }
            let num = row.num(&self.tree)?;
            let day1 = row.day1(&self.tree)?;
            let day2 = row.day2(&self.tree)?;
            let day3 = row.day3(&self.tree)?;
            if num != day1 || num != day2 || num != day3 {
                found.push(Anomaly::QuantityReplicaMismatch {
                    person: kind,
                    row: index,
                    num,
                    day1,
                    day2,
                    day3,
                });
            }
            if kind != PersonKind::Storage {
                let owner = row.owner_id(&self.tree)?;
                if owner != expected_owner {
                    found.push(Anomaly::UnexpectedOwner {
                        person: kind,
                        row: index,
                        owner,
                    });
                }
            }
        }
        let recorded = person.recorded_count(&self.tree)?;
        let computed = person.computed_count(&self.tree)?;
        if recorded != computed {
            found.push(Anomaly::CountMismatch {
                person: kind,
                recorded,
                computed,
            });
        }
        for anomaly in &found {
            warn!("{anomaly}");
        }
        for anomaly in found.clone() {
            self.emit(SessionEvent::Anomaly(anomaly));
        }
        Ok(found)
    }

    fn bump_count(&mut self, count: NodeId, delta: i64) -> Result<()> {
        if delta != 0 {
            let current = self.tree.value(count)?;
            self.tree.set_value(count, current + delta)?;
        }
        Ok(())
    }

    /// Current payload serialization, the exact bytes a save would compress.
    pub fn to_xml(&self) -> String {
        self.tree.to_xml()
    }

    pub fn pretty_xml(&self) -> String {
        self.tree.to_pretty_xml()
    }

    pub fn compact_xml(&self) -> String {
        self.tree.to_compact_xml()
    }

    /// Every line changed since load, for operator review.
    pub fn diff(&self) -> Vec<DiffLine> {
        diff::lines(&self.original_xml, &self.to_xml())
    }

    /// Re-encode the tree into a full save block.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        container::encode(self.to_xml().as_bytes())
    }

    /// Plain write; the backup-before-overwrite policy belongs to callers.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_bytes()?)?;
        Ok(())
    }
}
