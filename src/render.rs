//! Per-entity output workbooks.
//!
//! Each entity gets one xlsx file: a merged identity banner, a day-header
//! row, a time column built from the union of the week's slots, and one
//! column per day in which each merged block spans its run of slot rows.

use anyhow::{Context, Result};
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook};
use std::collections::HashMap;
use std::path::Path;

use crate::assemble::{merge_runs, union_time_index};
use crate::resolve::ResolvedEntry;

/// One entity's resolved week, ready to draw. `days[i]` is `None` when the
/// entity has no schedule that day (no column on the sheet), which renders as
/// an untouched column rather than a column of blanks.
#[derive(Debug, Clone)]
pub struct WeekGrid {
    /// Banner text, e.g. "Amy (F3)" or "Jane Doe".
    pub identity: String,
    /// Day-header labels, aligned to `days`.
    pub day_labels: Vec<String>,
    pub days: Vec<Option<Vec<ResolvedEntry>>>,
}

const TIME_COL_WIDTH: f64 = 15.0;
const DAY_COL_WIDTH: f64 = 80.0;
const BANNER_ROW_HEIGHT: f64 = 50.0;
const HEADER_ROW_HEIGHT: f64 = 30.0;
const DATA_ROW_HEIGHT: f64 = 60.0;

/// Write one entity's workbook to `path`.
pub fn render_workbook(grid: &WeekGrid, path: &Path) -> Result<()> {
    let banner_fmt = Format::new()
        .set_bold()
        .set_font_size(28)
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_border(FormatBorder::Thin);
    let header_fmt = Format::new()
        .set_bold()
        .set_font_size(20)
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_text_wrap()
        .set_border(FormatBorder::Thin);
    let body_fmt = Format::new()
        .set_font_size(20)
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_text_wrap()
        .set_border(FormatBorder::Thin);

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    let day_count = grid.days.len();
    let last_col = day_count as u16; // col 0 is the time column

    // Banner row.
    if last_col > 0 {
        sheet.merge_range(0, 0, 0, last_col, &grid.identity, &banner_fmt)?;
    } else {
        sheet.write_string_with_format(0, 0, &grid.identity, &banner_fmt)?;
    }
    sheet.set_row_height(0, BANNER_ROW_HEIGHT)?;

    // Header row: "Time" plus one label per day.
    sheet.write_string_with_format(1, 0, "Time", &header_fmt)?;
    for (i, label) in grid.day_labels.iter().enumerate() {
        sheet.write_string_with_format(1, 1 + i as u16, label, &header_fmt)?;
    }
    sheet.set_row_height(1, HEADER_ROW_HEIGHT)?;

    // Union time index defines the data rows.
    let times = union_time_index(&grid.days);
    let row_of: HashMap<&str, u32> = times
        .iter()
        .enumerate()
        .map(|(i, t)| (t.as_str(), 2 + i as u32))
        .collect();

    for (time, row) in &row_of {
        sheet.write_string_with_format(*row, 0, *time, &body_fmt)?;
        sheet.set_row_height(*row, DATA_ROW_HEIGHT)?;
    }

    // One column per day; each block spans its run of slot rows.
    for (day, entries) in grid.days.iter().enumerate() {
        let Some(entries) = entries else { continue };
        let col = 1 + day as u16;
        for block in merge_runs(entries) {
            let (Some(&start), Some(&end)) =
                (row_of.get(block.start.as_str()), row_of.get(block.end.as_str()))
            else {
                continue;
            };
            if start == end {
                sheet.write_string_with_format(start, col, block.display_text(), &body_fmt)?;
            } else {
                sheet.merge_range(start, col, end, col, block.display_text(), &body_fmt)?;
            }
        }
    }

    sheet.set_column_width(0, TIME_COL_WIDTH)?;
    for day in 0..day_count {
        sheet.set_column_width(1 + day as u16, DAY_COL_WIDTH)?;
    }

    workbook
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Strip characters that break filenames on any platform, plus line breaks
/// (identity strings can carry multi-line cell text).
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '\\' | '/' | '*' | '?' | ':' | '"' | '<' | '>' | '|' | '\n' | '\r'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::ResolvedEntry;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("Jane / Doe: *?\"<>|"), "Jane  Doe ");
        assert_eq!(sanitize_filename("Amy\n(F3)"), "Amy(F3)");
        assert_eq!(sanitize_filename("plain"), "plain");
    }

    #[test]
    fn test_render_writes_workbook() {
        let grid = WeekGrid {
            identity: "Amy (F3)".into(),
            day_labels: vec!["14 July (Monday)".into(), "15 July (Tuesday)".into()],
            days: vec![
                Some(vec![
                    ResolvedEntry::new("09:00", "Lunch"),
                    ResolvedEntry::new("09:15", "Lunch"),
                    ResolvedEntry::new("09:30", "Practice\n(Flute practice room)"),
                ]),
                None,
            ],
        };
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("amy.xlsx");
        render_workbook(&grid, &path).unwrap();
        let meta = std::fs::metadata(&path).unwrap();
        assert!(meta.len() > 0);
    }

    #[test]
    fn test_render_empty_week() {
        let grid = WeekGrid {
            identity: "Nobody".into(),
            day_labels: Vec::new(),
            days: Vec::new(),
        };
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.xlsx");
        render_workbook(&grid, &path).unwrap();
        assert!(path.exists());
    }
}
