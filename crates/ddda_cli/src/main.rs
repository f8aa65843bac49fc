use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Parser, ValueEnum};
use ddda_core::catalog::{ItemCatalog, ItemEntry};
use ddda_core::person::PersonKind;
use ddda_core::session::EditSession;
use ddda_core::{Result, SaveError};
use serde_json::{Map as JsonMap, Value as JsonValue};

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum PersonArg {
    Player,
    MainPawn,
    PawnA,
    PawnB,
    Storage,
}

impl From<PersonArg> for PersonKind {
    fn from(arg: PersonArg) -> Self {
        match arg {
            PersonArg::Player => PersonKind::Player,
            PersonArg::MainPawn => PersonKind::MainPawn,
            PersonArg::PawnA => PersonKind::PawnA,
            PersonArg::PawnB => PersonKind::PawnB,
            PersonArg::Storage => PersonKind::Storage,
        }
    }
}

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(value_name = "DDDA.sav")]
    path: PathBuf,
    /// Which person queries and edits apply to.
    #[arg(long, value_enum, default_value_t = PersonArg::Player)]
    person: PersonArg,
    /// Item catalog JSON (scraped reference data) for names and tier tags.
    #[arg(long, value_name = "items.json")]
    catalog: Option<PathBuf>,
    #[arg(long)]
    info: bool,
    #[arg(long)]
    equipment: bool,
    #[arg(long)]
    inventory: bool,
    /// Sweep the selected person for replica/count/owner anomalies.
    #[arg(long)]
    anomalies: bool,
    #[arg(long)]
    json: bool,
    #[arg(long = "set-name", value_name = "NAME")]
    set_name: Option<String>,
    #[arg(long = "set-level", value_name = "1..200")]
    set_level: Option<i64>,
    #[arg(long = "set-vocation", value_name = "0..8")]
    set_vocation: Option<i64>,
    #[arg(long = "set-vocation-level", value_name = "1..9")]
    set_vocation_level: Option<i64>,
    /// Add one of an item by catalog id (repeatable; merges into stacks).
    #[arg(long = "add-item", value_name = "ITEM_ID")]
    add_item: Vec<i64>,
    /// Remove one of an item by catalog id (repeatable).
    #[arg(long = "take-item", value_name = "ITEM_ID")]
    take_item: Vec<i64>,
    /// Print the payload serialization.
    #[arg(long = "dump-xml")]
    dump_xml: bool,
    /// Re-indent the dump for reading.
    #[arg(long, requires = "dump_xml")]
    pretty: bool,
    /// Strip the dump to a single line.
    #[arg(long, requires = "dump_xml", conflicts_with = "pretty")]
    compact: bool,
    /// Show every payload line changed by this invocation's edits.
    #[arg(long)]
    diff: bool,
    /// Re-encode and write the save here (backs up an existing file first).
    #[arg(long, value_name = "OUT.sav")]
    output: Option<PathBuf>,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(err) = run(&cli) {
        eprintln!("error: {err}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let mut session = EditSession::from_file(&cli.path)?;
    let catalog = match &cli.catalog {
        Some(path) => Some(load_catalog(path)?),
        None => None,
    };
    let kind = PersonKind::from(cli.person);

    if let Some(name) = &cli.set_name {
        session.set_name(kind, name)?;
    }
    if let Some(level) = cli.set_level {
        session.set_level(kind, level)?;
    }
    if let Some(vocation) = cli.set_vocation {
        session.set_vocation(kind, vocation)?;
    }
    if let Some(value) = cli.set_vocation_level {
        session.set_proficiency(kind, value)?;
    }
    for &item_no in &cli.add_item {
        session.give(kind, item_no, 1)?;
    }
    for &item_no in &cli.take_item {
        session.give(kind, item_no, -1)?;
    }

    let any_query = cli.info || cli.equipment || cli.inventory || cli.anomalies;
    let show_info = cli.info
        || (!any_query && !cli.dump_xml && !cli.diff && cli.output.is_none());

    if cli.json {
        let mut map = JsonMap::new();
        if show_info {
            map.insert(
                "person".to_string(),
                ddda_render::person_json(&session.snapshot(kind)?),
            );
        }
        if cli.equipment {
            map.insert(
                "equipment".to_string(),
                ddda_render::equipment_json(&session.equipment(kind)?, catalog.as_ref()),
            );
        }
        if cli.inventory {
            map.insert(
                "inventory".to_string(),
                ddda_render::items_json(&session.items(kind)?, catalog.as_ref()),
            );
        }
        if cli.anomalies {
            map.insert(
                "anomalies".to_string(),
                ddda_render::anomalies_json(&session.validate(kind)?),
            );
        }
        if cli.diff {
            map.insert(
                "diff".to_string(),
                ddda_render::diff_json(&session.diff()),
            );
        }
        if !map.is_empty() {
            println!("{}", JsonValue::Object(map));
        }
    } else {
        if show_info {
            print!("{}", ddda_render::info_text(&session.snapshot(kind)?));
        }
        if cli.equipment {
            print!(
                "{}",
                ddda_render::equipment_text(&session.equipment(kind)?, catalog.as_ref())
            );
        }
        if cli.inventory {
            print!(
                "{}",
                ddda_render::items_text(&session.items(kind)?, catalog.as_ref())
            );
        }
        if cli.anomalies {
            print!("{}", ddda_render::anomalies_text(&session.validate(kind)?));
        }
        if cli.diff {
            print!("{}", ddda_render::diff_text(&session.diff()));
        }
    }

    if cli.dump_xml {
        if cli.pretty {
            print!("{}", session.pretty_xml());
        } else if cli.compact {
            println!("{}", session.compact_xml());
        } else {
            print!("{}", session.to_xml());
        }
    }

    if let Some(output) = &cli.output {
        backup_existing(output)?;
        session.save_to(output)?;
        println!("wrote {}", output.display());
    }

    Ok(())
}

fn load_catalog(path: &Path) -> Result<ItemCatalog> {
    let bytes = fs::read(path)?;
    let entries: Vec<ItemEntry> = serde_json::from_slice(&bytes)
        .map_err(|e| SaveError::Decode(format!("item catalog {}: {e}", path.display())))?;
    Ok(ItemCatalog::from_entries(entries))
}

/// Copy an existing file aside as `<stem>-YYYYmmdd_HHMMSS<ext>` (UTC, from
/// its mtime) before it gets overwritten. A backup already carrying that
/// stamp means this second was handled; nothing is copied twice.
fn backup_existing(path: &Path) -> Result<()> {
    if !path.is_file() {
        return Ok(());
    }
    let modified = fs::metadata(path)?.modified()?;
    let backup = backup_path(path, &format_utc_stamp(modified));
    if backup.is_file() {
        return Ok(());
    }
    fs::copy(path, &backup)?;
    Ok(())
}

fn backup_path(path: &Path, stamp: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}-{stamp}.{}", ext.to_string_lossy()),
        None => format!("{stem}-{stamp}"),
    };
    path.with_file_name(name)
}

fn format_utc_stamp(time: SystemTime) -> String {
    let secs = time
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let days = (secs / 86400) as i64;
    let rem = secs % 86400;
    let (year, month, day) = civil_from_days(days);
    format!(
        "{year:04}{month:02}{day:02}_{:02}{:02}{:02}",
        rem / 3600,
        rem % 3600 / 60,
        rem % 60
    )
}

// Gregorian date from days since the epoch (Howard Hinnant's civil_from_days).
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719468;
    let era = z.div_euclid(146097);
    let doe = z.rem_euclid(146097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let year = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    (if month <= 2 { year + 1 } else { year }, month, day)
}
