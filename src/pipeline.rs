//! Pipeline functions for programmatic use by the CLI.
//!
//! Each operation takes a config struct and returns a summary string. A
//! failure inside one input file or one entity logs an error and the batch
//! continues; only setup failures (unreadable directories) abort.

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use std::fs::File;
use std::io::{Read as _, Write as _};
use std::path::{Path, PathBuf};

use crate::grid::{load_workbook, Sheet};
use crate::mappings::Mappings;
use crate::render::{render_workbook, sanitize_filename, WeekGrid};
use crate::resolve::{resolve_pianist_day, resolve_student_day, resolve_teacher_day};

lazy_static! {
    /// Master-file naming convention: `flute-campa-time-table.xlsx`,
    /// `Cello-CampB-time-table v2.xlsx`, etc.
    static ref MASTER_FILE: Regex =
        Regex::new(r"(?i)^([a-z ]+)-(camp[ab])-time-table.*\.xlsx$").unwrap();
    /// Pianist sheet names: `<pianist>-campa` / `<pianist>-campb`.
    static ref PIANIST_SHEET: Regex = Regex::new(r"(?i)^(.+)-(camp[ab])\s*$").unwrap();
}

const PIANIST_MASTER: &str = "pianist-master-time-table.xlsx";

// ============================================================================
// Camps
// ============================================================================

/// The two one-week camps. Each has its own start date and its own set of
/// mapping CSVs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Camp {
    A,
    B,
}

impl Camp {
    pub fn from_token(token: &str) -> Option<Camp> {
        match token.to_lowercase().as_str() {
            "campa" => Some(Camp::A),
            "campb" => Some(Camp::B),
            _ => None,
        }
    }

    /// Lowercase mapping-file suffix.
    pub fn suffix(&self) -> &'static str {
        match self {
            Camp::A => "campa",
            Camp::B => "campb",
        }
    }

    /// Display label used in output filenames.
    pub fn label(&self) -> &'static str {
        match self {
            Camp::A => "CampA",
            Camp::B => "CampB",
        }
    }

    /// First day of the camp (a Monday).
    pub fn start_date(&self) -> NaiveDate {
        match self {
            Camp::A => NaiveDate::from_ymd_opt(2025, 7, 14).expect("valid camp date"),
            Camp::B => NaiveDate::from_ymd_opt(2025, 7, 21).expect("valid camp date"),
        }
    }

    /// Day-header labels for `count` consecutive days from the start date.
    pub fn day_labels(&self, count: usize) -> Vec<String> {
        (0..count)
            .map(|i| {
                (self.start_date() + Duration::days(i as i64))
                    .format("%d %B (%A)")
                    .to_string()
            })
            .collect()
    }
}

/// One discovered master workbook.
#[derive(Debug, Clone)]
pub struct MasterFile {
    pub path: PathBuf,
    /// Instrument display name, capitalized ("Flute").
    pub instrument: String,
    pub camp: Camp,
}

/// Scan `input_dir` for master workbooks matching the naming convention.
/// Results are sorted by filename so runs are reproducible.
pub fn discover_master_files(input_dir: &Path) -> Result<Vec<MasterFile>> {
    let mut files = Vec::new();
    let entries = std::fs::read_dir(input_dir)
        .with_context(|| format!("Failed to read input directory {}", input_dir.display()))?;
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        let Some(caps) = MASTER_FILE.captures(&name) else {
            continue;
        };
        let Some(camp) = Camp::from_token(&caps[2]) else {
            continue;
        };
        files.push(MasterFile {
            path: entry.path(),
            instrument: capitalize(caps[1].trim()),
            camp,
        });
    }
    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ============================================================================
// Entity discovery
// ============================================================================

/// Students present in a master workbook: instrument-prefixed ids harvested
/// from every cell, plus mapped display names that appear in the grid (some
/// offices type names instead of ids). Ids sort numerically, names follow.
pub fn discover_students(sheets: &[Sheet], instrument: &str, maps: &Mappings) -> Vec<String> {
    let prefix = instrument
        .chars()
        .next()
        .map(|c| c.to_ascii_uppercase())
        .unwrap_or('F');
    let id_re = Regex::new(&format!(r"\b{}\d+\b", prefix)).expect("prefix is a single letter");

    let mut ids: HashSet<String> = HashSet::new();
    let mut names: HashSet<String> = HashSet::new();
    for sheet in sheets {
        for row in &sheet.rows {
            for cell in &row.cells {
                for m in id_re.find_iter(cell) {
                    ids.insert(m.as_str().to_string());
                }
                let lower = cell.to_lowercase();
                for name in maps.student_names.values() {
                    if lower.contains(&name.to_lowercase()) {
                        names.insert(name.clone());
                    }
                }
            }
        }
    }

    let mut ids: Vec<String> = ids.into_iter().collect();
    ids.sort_by_key(|id| id[1..].parse::<u32>().unwrap_or(u32::MAX));
    let mut names: Vec<String> = names.into_iter().collect();
    names.sort();
    ids.extend(names);
    ids
}

/// Teachers named in the header row of any sheet, deduplicated
/// case-insensitively, in order of first appearance.
pub fn discover_teachers(sheets: &[Sheet]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut teachers = Vec::new();
    for sheet in sheets {
        for name in &sheet.teachers {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            if seen.insert(name.to_lowercase()) {
                teachers.push(name.to_string());
            }
        }
    }
    teachers
}

// ============================================================================
// Generation passes
// ============================================================================

/// Configuration shared by the generation operations.
pub struct GenerateConfig {
    /// Directory holding master workbooks and mapping CSVs.
    pub input_dir: PathBuf,
    /// Directory to write per-entity workbooks into (created if missing).
    pub output_dir: PathBuf,
}

fn ensure_output_dir(config: &GenerateConfig) -> Result<()> {
    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            config.output_dir.display()
        )
    })
}

fn output_path(config: &GenerateConfig, identity: &str, camp: Camp) -> PathBuf {
    config.output_dir.join(format!(
        "{}_{}_timetable.xlsx",
        sanitize_filename(identity),
        camp.label()
    ))
}

/// Generate one workbook per student found in each master file.
/// Returns a summary string on success.
pub fn generate_student_timetables(config: &GenerateConfig) -> Result<String> {
    ensure_output_dir(config)?;
    let masters = discover_master_files(&config.input_dir)?;
    let mut written = 0usize;
    let mut errors = 0usize;

    for master in &masters {
        let sheets = match load_workbook(&master.path) {
            Ok(s) => s,
            Err(e) => {
                log::error!("Skipping {}: {:#}", master.path.display(), e);
                errors += 1;
                continue;
            }
        };
        let maps = Mappings::load(&config.input_dir, master.camp.suffix(), &master.instrument);
        let students = discover_students(&sheets, &master.instrument, &maps);
        log::info!(
            "{}: {} sheets, {} students",
            master.path.display(),
            sheets.len(),
            students.len()
        );

        for student in &students {
            let days: Vec<_> = sheets
                .iter()
                .enumerate()
                .map(|(day, sheet)| {
                    Some(resolve_student_day(
                        student,
                        sheet,
                        day,
                        &maps,
                        &master.instrument,
                    ))
                })
                .collect();
            let grid = WeekGrid {
                identity: maps.display_name(student).to_string(),
                day_labels: master.camp.day_labels(days.len()),
                days,
            };
            let path = output_path(config, &grid.identity, master.camp);
            match render_workbook(&grid, &path) {
                Ok(()) => written += 1,
                Err(e) => {
                    log::error!("Failed to write schedule for {}: {:#}", student, e);
                    errors += 1;
                }
            }
        }
    }

    Ok(format!(
        "Student timetables: {} written from {} master file(s) ({} errors)",
        written,
        masters.len(),
        errors
    ))
}

/// Generate one workbook per teacher named in any sheet header.
/// Returns a summary string on success.
pub fn generate_teacher_timetables(config: &GenerateConfig) -> Result<String> {
    ensure_output_dir(config)?;
    let masters = discover_master_files(&config.input_dir)?;
    let mut written = 0usize;
    let mut errors = 0usize;

    for master in &masters {
        let sheets = match load_workbook(&master.path) {
            Ok(s) => s,
            Err(e) => {
                log::error!("Skipping {}: {:#}", master.path.display(), e);
                errors += 1;
                continue;
            }
        };
        let maps = Mappings::load(&config.input_dir, master.camp.suffix(), &master.instrument);
        let teachers = discover_teachers(&sheets);
        log::info!("{}: {} teachers", master.path.display(), teachers.len());

        for teacher in &teachers {
            // A missing column on some day is an absent day, not an error.
            let days: Vec<_> = sheets
                .iter()
                .enumerate()
                .map(|(day, sheet)| resolve_teacher_day(teacher, sheet, day, &maps))
                .collect();
            let grid = WeekGrid {
                identity: teacher.clone(),
                day_labels: master.camp.day_labels(days.len()),
                days,
            };
            let path = output_path(config, teacher, master.camp);
            match render_workbook(&grid, &path) {
                Ok(()) => written += 1,
                Err(e) => {
                    log::error!("Failed to write schedule for {}: {:#}", teacher, e);
                    errors += 1;
                }
            }
        }
    }

    Ok(format!(
        "Teacher timetables: {} written from {} master file(s) ({} errors)",
        written,
        masters.len(),
        errors
    ))
}

/// Generate one workbook per pianist sheet in the pianist master file. The
/// pianist master is a single workbook whose sheets are named
/// `<pianist>-camp{a|b}` and carry one column per day.
pub fn generate_pianist_timetables(config: &GenerateConfig) -> Result<String> {
    ensure_output_dir(config)?;
    let master_path = config.input_dir.join(PIANIST_MASTER);
    if !master_path.exists() {
        log::warn!("No {} in {}", PIANIST_MASTER, config.input_dir.display());
        return Ok("Pianist timetables: no pianist master file found".to_string());
    }

    let sheets = load_workbook(&master_path)?;
    let mut written = 0usize;
    let mut errors = 0usize;
    let mut skipped = 0usize;

    for sheet in &sheets {
        let Some(caps) = PIANIST_SHEET.captures(&sheet.name) else {
            log::warn!("Ignoring pianist sheet '{}': unrecognized name", sheet.name);
            skipped += 1;
            continue;
        };
        let pianist = caps[1].trim().to_string();
        let Some(camp) = Camp::from_token(&caps[2]) else {
            skipped += 1;
            continue;
        };
        let maps = Mappings::load(&config.input_dir, camp.suffix(), "Pianist");

        let days: Vec<_> = (0..sheet.teachers.len())
            .map(|col| Some(resolve_pianist_day(sheet, col, &maps)))
            .collect();
        let grid = WeekGrid {
            identity: pianist.clone(),
            // Pianist sheets carry their own day headers.
            day_labels: sheet.teachers.clone(),
            days,
        };
        let path = output_path(config, &pianist, camp);
        match render_workbook(&grid, &path) {
            Ok(()) => written += 1,
            Err(e) => {
                log::error!("Failed to write schedule for {}: {:#}", pianist, e);
                errors += 1;
            }
        }
    }

    Ok(format!(
        "Pianist timetables: {} written, {} sheet(s) skipped ({} errors)",
        written, skipped, errors
    ))
}

/// Run all three generation passes.
pub fn generate_all(config: &GenerateConfig) -> Result<String> {
    let students = generate_student_timetables(config)?;
    let teachers = generate_teacher_timetables(config)?;
    let pianists = generate_pianist_timetables(config)?;
    Ok(format!("{}\n{}\n{}", students, teachers, pianists))
}

// ============================================================================
// Packaging
// ============================================================================

/// Configuration for zipping the generated workbooks.
pub struct PackageConfig {
    /// Directory holding generated `.xlsx` files.
    pub output_dir: PathBuf,
    /// Explicit archive path; defaults to a timestamped name inside
    /// `output_dir`.
    pub archive: Option<PathBuf>,
}

/// Bundle every `.xlsx` in the output directory into one zip archive.
/// Returns a summary string on success.
pub fn package_outputs(config: &PackageConfig) -> Result<String> {
    let archive_path = config.archive.clone().unwrap_or_else(|| {
        config.output_dir.join(format!(
            "timetables-{}.zip",
            chrono::Local::now().format("%Y%m%d-%H%M%S")
        ))
    });

    let mut names: Vec<PathBuf> = std::fs::read_dir(&config.output_dir)
        .with_context(|| format!("Failed to read {}", config.output_dir.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().map(|e| e == "xlsx").unwrap_or(false))
        .collect();
    names.sort();
    if names.is_empty() {
        anyhow::bail!("No .xlsx files found in {}", config.output_dir.display());
    }

    let file = File::create(&archive_path)
        .with_context(|| format!("Failed to create {}", archive_path.display()))?;
    let mut zip = zip::ZipWriter::new(file);
    let deflated = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    for path in &names {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .context("Non-UTF-8 filename in output directory")?;
        zip.start_file(name, deflated)?;
        let mut content = Vec::new();
        File::open(path)?.read_to_end(&mut content)?;
        zip.write_all(&content)?;
    }
    zip.finish()?;

    Ok(format!(
        "Packaged {} timetable(s) into {}",
        names.len(),
        archive_path.display()
    ))
}
