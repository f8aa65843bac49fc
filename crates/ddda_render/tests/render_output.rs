use ddda_core::catalog::{ItemCatalog, ItemEntry};
use ddda_core::person::{EquipSlot, PersonKind};
use ddda_core::session::{Anomaly, EquipmentSnapshot, ItemSnapshot, PersonSnapshot};
use ddda_render::{
    anomalies_text, equipment_json, equipment_text, info_text, items_json, items_text,
    person_json,
};
use serde_json::Value;

fn catalog() -> ItemCatalog {
    ItemCatalog::from_entries([
        ItemEntry {
            id: 101,
            name: "Rusted Sword".to_string(),
            kind: "Swords".to_string(),
            description: "A sword corroded by rust.".to_string(),
        },
        ItemEntry {
            id: 201,
            name: "Harspud Sauce".to_string(),
            kind: "Curatives".to_string(),
            description: "Restores Health.".to_string(),
        },
        ItemEntry {
            id: 301,
            name: "Silver Ring".to_string(),
            kind: "Jewelry".to_string(),
            description: "A plain silver ring.".to_string(),
        },
    ])
}

fn player_snapshot() -> PersonSnapshot {
    PersonSnapshot {
        person: PersonKind::Player,
        name: Some("Arisen".to_string()),
        level: Some(12),
        vocation: Some(2),
        proficiency: Some(3),
        recorded_count: 4,
        computed_count: 4,
    }
}

#[test]
fn person_json_has_stable_fields() {
    let value = person_json(&player_snapshot());
    assert_eq!(value["person"], Value::from("Player"));
    assert_eq!(value["name"], Value::from("Arisen"));
    assert_eq!(value["level"], Value::from(12));
    assert_eq!(value["vocation"], Value::from(2));
    assert_eq!(value["vocation_name"], Value::from("Mage"));
    assert_eq!(value["vocation_level"], Value::from(3));
    assert_eq!(value["item_count"], Value::from(4));
}

#[test]
fn storage_json_omits_identity() {
    let snapshot = PersonSnapshot {
        person: PersonKind::Storage,
        name: None,
        level: None,
        vocation: None,
        proficiency: None,
        recorded_count: 6,
        computed_count: 6,
    };
    let value = person_json(&snapshot);
    assert_eq!(value["person"], Value::from("Storage"));
    assert!(value.get("name").is_none());
    assert!(value.get("level").is_none());
    assert_eq!(value["item_count"], Value::from(6));
}

#[test]
fn info_text_is_key_value_lines() {
    let text = info_text(&player_snapshot());
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        vec![
            "person=Player",
            "name=Arisen",
            "level=12",
            "vocation=2 (Mage)",
            "vocation_level=3",
            "item_count=4",
            "computed_item_count=4",
        ]
    );
}

#[test]
fn items_render_with_catalog_names_and_tiers() {
    let catalog = catalog();
    let items = [
        ItemSnapshot {
            row: 0,
            item_no: 201,
            num: 3,
            flag: 1,
            owner: 0,
        },
        ItemSnapshot {
            row: 1,
            item_no: 101,
            num: 1,
            flag: 3,
            owner: 0,
        },
    ];

    let value = items_json(&items, Some(&catalog));
    assert_eq!(value[0]["name"], Value::from("Harspud Sauce"));
    assert_eq!(value[0]["quantity"], Value::from(3));
    // Curatives are not equipment: the raw word is shown, no tier reading.
    assert_eq!(value[0]["flag_tag"], Value::from("UNKNOWN"));
    assert_eq!(value[1]["name"], Value::from("Rusted Sword"));
    assert_eq!(value[1]["flag_tag"], Value::from("no stars"));

    let text = items_text(&items, Some(&catalog));
    assert!(text.contains("Harspud Sauce"));
    assert!(text.contains("Rusted Sword"));
    assert!(text.contains("no stars"));
}

#[test]
fn items_render_without_catalog_falls_back_to_numbers() {
    let items = [ItemSnapshot {
        row: 0,
        item_no: 999,
        num: 2,
        flag: 19,
        owner: 0,
    }];
    let value = items_json(&items, None);
    assert!(value[0].get("name").is_none());
    assert_eq!(value[0]["flag_tag"], Value::from("19"));

    let text = items_text(&items, None);
    assert!(text.contains("item 999"));
}

#[test]
fn equipment_renders_empty_slots_as_dashes() {
    let catalog = catalog();
    let slots = [
        EquipmentSnapshot {
            slot: EquipSlot::PrimaryWeapon,
            item_no: 101,
            flag: 3,
        },
        EquipmentSnapshot {
            slot: EquipSlot::Cloak,
            item_no: -1,
            flag: 0,
        },
        EquipmentSnapshot {
            slot: EquipSlot::Jewelry1,
            item_no: 301,
            flag: 77,
        },
    ];

    let value = equipment_json(&slots, Some(&catalog));
    assert_eq!(value[0]["slot"], Value::from("Primary Weapon"));
    assert_eq!(value[0]["name"], Value::from("Rusted Sword"));
    assert_eq!(value[0]["flag_tag"], Value::from("no stars"));
    assert!(value[1].get("id").is_none());
    // Jewelry carries its raw word as the tag: sub-flags are not decoded.
    assert_eq!(value[2]["flag_tag"], Value::from("77"));

    let text = equipment_text(&slots, Some(&catalog));
    assert!(text.contains("Primary Weapon"));
    assert!(text.contains("Cloak"));
    assert!(text.lines().any(|line| line.starts_with("Cloak") && line.ends_with('-')));
}

#[test]
fn anomalies_render_their_display_form() {
    let anomalies = [Anomaly::NoFreeSlot {
        person: PersonKind::Storage,
        item_no: 47,
    }];
    let text = anomalies_text(&anomalies);
    assert_eq!(text.trim(), "Storage: no free slot for item 47");
}
