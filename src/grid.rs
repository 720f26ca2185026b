//! Workbook loading.
//!
//! Each sheet of the master file is one calendar day: row 1 holds teacher
//! names from column 2 onward, row 2 is reserved, and rows 3+ are
//! time-indexed activity cells with the time in column 1. Merged spreadsheet
//! ranges are expanded by replicating the top-left value into every covered
//! cell, so downstream code always sees a plain rectangular table.

use anyhow::{Context, Result};
use calamine::{open_workbook, Data, DataType, Reader, Xlsx};
use std::path::Path;

/// One schedule row: the raw time cell plus the activity cells aligned to the
/// header's teacher columns.
#[derive(Debug, Clone)]
pub struct GridRow {
    pub time_raw: String,
    pub cells: Vec<String>,
}

/// One day's grid, unmerged and stringified.
#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    /// Header entities (teacher names, or day labels on pianist sheets),
    /// aligned to `GridRow::cells`.
    pub teachers: Vec<String>,
    pub rows: Vec<GridRow>,
}

impl Sheet {
    /// Build a sheet from an already rectangular table of strings, using the
    /// standard layout (row 1 header, row 2 reserved, rows 3+ data). Used by
    /// tests and the debug tooling; `load_workbook` goes through here too.
    pub fn from_table(name: &str, table: Vec<Vec<String>>) -> Self {
        let teachers = table
            .first()
            .map(|header| header.iter().skip(1).map(|s| s.trim().to_string()).collect())
            .unwrap_or_default();
        let rows = table
            .into_iter()
            .skip(2)
            .map(|mut row| {
                if row.is_empty() {
                    row.push(String::new());
                }
                let time_raw = row[0].clone();
                GridRow {
                    time_raw,
                    cells: row.into_iter().skip(1).collect(),
                }
            })
            .collect();
        Sheet {
            name: name.to_string(),
            teachers,
            rows,
        }
    }
}

/// Load every sheet of an xlsx workbook, in workbook order, with merged
/// ranges expanded.
pub fn load_workbook(path: &Path) -> Result<Vec<Sheet>> {
    let mut workbook: Xlsx<_> = open_workbook(path)
        .with_context(|| format!("Failed to open workbook {}", path.display()))?;
    workbook
        .load_merged_regions()
        .with_context(|| format!("Failed to read merged regions from {}", path.display()))?;

    let sheet_names = workbook.sheet_names().to_owned();
    let mut sheets = Vec::with_capacity(sheet_names.len());

    for name in sheet_names {
        let range = workbook
            .worksheet_range(&name)
            .with_context(|| format!("Failed to read sheet '{}'", name))?;

        let (height, width) = match range.end() {
            Some((r, c)) => (r as usize + 1, c as usize + 1),
            None => {
                log::warn!("Sheet '{}' is empty", name);
                sheets.push(Sheet::from_table(&name, Vec::new()));
                continue;
            }
        };

        let mut table: Vec<Vec<String>> = (0..height)
            .map(|r| {
                (0..width)
                    .map(|c| {
                        range
                            .get_value((r as u32, c as u32))
                            .map(cell_to_string)
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect();

        // Expand merged ranges: every covered cell takes the top-left value.
        for (_, _, dims) in workbook.merged_regions_by_sheet(&name) {
            let (r0, c0) = (dims.start.0 as usize, dims.start.1 as usize);
            let (r1, c1) = (dims.end.0 as usize, dims.end.1 as usize);
            if r0 >= height || c0 >= width {
                continue;
            }
            let value = table[r0][c0].clone();
            for row in table.iter_mut().take((r1 + 1).min(height)).skip(r0) {
                for cell in row.iter_mut().take((c1 + 1).min(width)).skip(c0) {
                    *cell = value.clone();
                }
            }
        }

        sheets.push(Sheet::from_table(&name, table));
    }

    Ok(sheets)
}

/// Stringify one cell. Clock-time cells format straight to `HH:MM`; numbers
/// drop a trailing `.0` so room codes survive round-tripping through Excel.
fn cell_to_string(data: &Data) -> String {
    match data {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Bool(b) => b.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::DateTime(_) => match data.as_time() {
            Some(t) => t.format("%H:%M").to_string(),
            None => data
                .as_datetime()
                .map(|dt| dt.format("%H:%M").to_string())
                .unwrap_or_default(),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    }
}
