//! Shared JSON and text rendering for DDDA save data.
//!
//! Everything renders from core snapshot types; nothing here touches the
//! record tree. Catalog lookups are optional; without one, ids and raw
//! flag words are printed as numbers.

use std::fmt::Write as _;

use ddda_core::catalog::ItemCatalog;
use ddda_core::diff::DiffLine;
use ddda_core::flag::Flag;
use ddda_core::session::{Anomaly, EquipmentSnapshot, ItemSnapshot, PersonSnapshot};
use ddda_core::vocation;
use serde_json::{Map as JsonMap, Value as JsonValue};

const ITEM_NAME_WIDTH: usize = 28;
const FLAG_TAG_WIDTH: usize = 14;
const SLOT_WIDTH: usize = 17;

fn item_name(catalog: Option<&ItemCatalog>, item_no: i64) -> String {
    catalog
        .and_then(|catalog| catalog.lookup(item_no))
        .map(|entry| entry.name.clone())
        .unwrap_or_else(|| format!("item {item_no}"))
}

fn flag_tag(catalog: Option<&ItemCatalog>, item_no: i64, raw: u32) -> String {
    match catalog {
        Some(catalog) => match Flag::decode(raw, catalog.category(item_no)) {
            Ok(flag) => flag.tag(),
            Err(_) => format!("raw {raw}"),
        },
        None => raw.to_string(),
    }
}

pub fn person_json(snapshot: &PersonSnapshot) -> JsonValue {
    let mut map = JsonMap::new();
    map.insert(
        "person".to_string(),
        JsonValue::String(snapshot.person.as_str().to_string()),
    );
    if let Some(name) = &snapshot.name {
        map.insert("name".to_string(), JsonValue::String(name.clone()));
    }
    if let Some(level) = snapshot.level {
        map.insert("level".to_string(), JsonValue::from(level));
    }
    if let Some(index) = snapshot.vocation {
        map.insert("vocation".to_string(), JsonValue::from(index));
        map.insert(
            "vocation_name".to_string(),
            JsonValue::String(vocation::name(index).to_string()),
        );
    }
    if let Some(proficiency) = snapshot.proficiency {
        map.insert("vocation_level".to_string(), JsonValue::from(proficiency));
    }
    map.insert(
        "item_count".to_string(),
        JsonValue::from(snapshot.recorded_count),
    );
    map.insert(
        "computed_item_count".to_string(),
        JsonValue::from(snapshot.computed_count),
    );
    JsonValue::Object(map)
}

pub fn items_json(items: &[ItemSnapshot], catalog: Option<&ItemCatalog>) -> JsonValue {
    let rows = items
        .iter()
        .map(|item| {
            let mut map = JsonMap::new();
            map.insert("row".to_string(), JsonValue::from(item.row));
            map.insert("id".to_string(), JsonValue::from(item.item_no));
            if let Some(entry) = catalog.and_then(|catalog| catalog.lookup(item.item_no)) {
                map.insert("name".to_string(), JsonValue::String(entry.name.clone()));
                map.insert("type".to_string(), JsonValue::String(entry.kind.clone()));
            }
            map.insert("quantity".to_string(), JsonValue::from(item.num));
            map.insert("flag".to_string(), JsonValue::from(item.flag));
            map.insert(
                "flag_tag".to_string(),
                JsonValue::String(flag_tag(catalog, item.item_no, item.flag)),
            );
            map.insert("owner".to_string(), JsonValue::from(item.owner));
            JsonValue::Object(map)
        })
        .collect();
    JsonValue::Array(rows)
}

pub fn equipment_json(slots: &[EquipmentSnapshot], catalog: Option<&ItemCatalog>) -> JsonValue {
    let rows = slots
        .iter()
        .map(|slot| {
            let mut map = JsonMap::new();
            map.insert(
                "slot".to_string(),
                JsonValue::String(slot.slot.as_str().to_string()),
            );
            if slot.item_no >= 0 {
                map.insert("id".to_string(), JsonValue::from(slot.item_no));
                map.insert(
                    "name".to_string(),
                    JsonValue::String(item_name(catalog, slot.item_no)),
                );
                map.insert("flag".to_string(), JsonValue::from(slot.flag));
                map.insert(
                    "flag_tag".to_string(),
                    JsonValue::String(flag_tag(catalog, slot.item_no, slot.flag)),
                );
            }
            JsonValue::Object(map)
        })
        .collect();
    JsonValue::Array(rows)
}

pub fn anomalies_json(anomalies: &[Anomaly]) -> JsonValue {
    serde_json::to_value(anomalies).unwrap_or(JsonValue::Null)
}

pub fn diff_json(diff: &[DiffLine]) -> JsonValue {
    serde_json::to_value(diff).unwrap_or(JsonValue::Null)
}

/// `key=value` lines, one per known field. Storage gets counts only.
pub fn info_text(snapshot: &PersonSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "person={}", snapshot.person.as_str());
    if let Some(name) = &snapshot.name {
        let _ = writeln!(out, "name={name}");
    }
    if let Some(level) = snapshot.level {
        let _ = writeln!(out, "level={level}");
    }
    if let Some(index) = snapshot.vocation {
        let _ = writeln!(out, "vocation={index} ({})", vocation::name(index));
    }
    if let Some(proficiency) = snapshot.proficiency {
        let _ = writeln!(out, "vocation_level={proficiency}");
    }
    let _ = writeln!(out, "item_count={}", snapshot.recorded_count);
    let _ = writeln!(out, "computed_item_count={}", snapshot.computed_count);
    out
}

pub fn items_text(items: &[ItemSnapshot], catalog: Option<&ItemCatalog>) -> String {
    let mut out = String::new();
    for item in items {
        let name = item_name(catalog, item.item_no);
        let tag = flag_tag(catalog, item.item_no, item.flag);
        let _ = writeln!(
            out,
            "{:>4}  {:>5}  {:<ITEM_NAME_WIDTH$}  {:>4}  {:<FLAG_TAG_WIDTH$}  {:>3}",
            item.row, item.item_no, name, item.num, tag, item.owner
        );
    }
    out
}

pub fn equipment_text(slots: &[EquipmentSnapshot], catalog: Option<&ItemCatalog>) -> String {
    let mut out = String::new();
    for slot in slots {
        if slot.item_no < 0 {
            let _ = writeln!(out, "{:<SLOT_WIDTH$}  -", slot.slot.as_str());
        } else {
            let _ = writeln!(
                out,
                "{:<SLOT_WIDTH$}  {:<ITEM_NAME_WIDTH$}  {}",
                slot.slot.as_str(),
                item_name(catalog, slot.item_no),
                flag_tag(catalog, slot.item_no, slot.flag)
            );
        }
    }
    out
}

pub fn anomalies_text(anomalies: &[Anomaly]) -> String {
    let mut out = String::new();
    for anomaly in anomalies {
        let _ = writeln!(out, "{anomaly}");
    }
    out
}

pub fn diff_text(diff: &[DiffLine]) -> String {
    let mut out = String::new();
    for line in diff {
        let _ = writeln!(out, "line {}:", line.line);
        let _ = writeln!(out, "  - {}", line.old);
        let _ = writeln!(out, "  + {}", line.new);
    }
    out
}
