//! Grid Debug Utility
//!
//! Loads one master workbook, dumps the normalized grid of a chosen sheet,
//! and optionally resolves a single student or teacher for that day so
//! cascade decisions can be eyeballed against the source cells.
//!
//! Usage: cargo run --bin grid-debug -- <workbook.xlsx> [--day N]
//!        [--student <id-or-name>] [--teacher <name>]
//!        [--mappings <dir> --camp <campa|campb> --instrument <name>]

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use timetable_toolkit::assemble::merge_runs;
use timetable_toolkit::grid::load_workbook;
use timetable_toolkit::mappings::Mappings;
use timetable_toolkit::resolve::{resolve_student_day, resolve_teacher_day};
use timetable_toolkit::timeslot::normalize_time;

fn main() -> Result<()> {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();

    let mut workbook_arg: Option<String> = None;
    let mut day: usize = 0;
    let mut student: Option<String> = None;
    let mut teacher: Option<String> = None;
    let mut mappings_dir: Option<PathBuf> = None;
    let mut camp = "campa".to_string();
    let mut instrument = "Flute".to_string();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--day" => {
                day = args
                    .get(i + 1)
                    .context("--day needs a value")?
                    .parse()
                    .context("--day must be a number (1-based)")?;
                day = day.saturating_sub(1);
                i += 2;
            }
            "--student" => {
                student = Some(args.get(i + 1).context("--student needs a value")?.clone());
                i += 2;
            }
            "--teacher" => {
                teacher = Some(args.get(i + 1).context("--teacher needs a value")?.clone());
                i += 2;
            }
            "--mappings" => {
                mappings_dir = Some(PathBuf::from(
                    args.get(i + 1).context("--mappings needs a value")?,
                ));
                i += 2;
            }
            "--camp" => {
                camp = args.get(i + 1).context("--camp needs a value")?.clone();
                i += 2;
            }
            "--instrument" => {
                instrument = args
                    .get(i + 1)
                    .context("--instrument needs a value")?
                    .clone();
                i += 2;
            }
            other if !other.starts_with('-') => {
                workbook_arg = Some(other.to_string());
                i += 1;
            }
            other => {
                eprintln!("Unknown option: {}", other);
                std::process::exit(1);
            }
        }
    }

    let Some(workbook_path) = workbook_arg else {
        eprintln!("Usage: {} <workbook.xlsx> [--day N]", args[0]);
        eprintln!("       [--student <id-or-name>] [--teacher <name>]");
        eprintln!("       [--mappings <dir> --camp <campa|campb> --instrument <name>]");
        std::process::exit(1);
    };

    let sheets = load_workbook(Path::new(&workbook_path))?;
    let sheet = sheets
        .get(day)
        .with_context(|| format!("Workbook has {} sheet(s), no day {}", sheets.len(), day + 1))?;

    println!("=== Sheet '{}' (day {}) ===", sheet.name, day + 1);
    println!("Teachers: {:?}", sheet.teachers);
    for row in &sheet.rows {
        let time = normalize_time(&row.time_raw);
        println!("{:>10} [{:?}] {:?}", row.time_raw, time, row.cells);
    }

    let maps = match mappings_dir {
        Some(dir) => Mappings::load(&dir, &camp, &instrument),
        None => Mappings::default(),
    };

    if let Some(student) = student {
        println!("\n=== Resolved day for student '{}' ===", student);
        let entries = resolve_student_day(&student, sheet, day, &maps, &instrument);
        for entry in &entries {
            println!("{:>5}  {:?}", entry.time, entry.text);
        }
        println!("--- merged blocks ---");
        for block in merge_runs(&entries) {
            println!("{} .. {}  {:?}", block.start, block.end, block.display_text());
        }
    }

    if let Some(teacher) = teacher {
        println!("\n=== Resolved day for teacher '{}' ===", teacher);
        match resolve_teacher_day(&teacher, sheet, day, &maps) {
            None => println!("(no column for this teacher on this sheet)"),
            Some(entries) => {
                for entry in &entries {
                    println!("{:>5}  {:?}", entry.time, entry.text);
                }
                println!("--- merged blocks ---");
                for block in merge_runs(&entries) {
                    println!("{} .. {}  {:?}", block.start, block.end, block.display_text());
                }
            }
        }
    }

    Ok(())
}
