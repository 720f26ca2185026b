//! Time-slot normalization and reporting windows.
//!
//! The master grid's time column is hand-typed: real clock times, `HH:MM`
//! strings, 12-hour forms, and loosely punctuated numerics (`9.30`, `0930`)
//! all occur. Everything is canonicalized to an `HH:MM` string, which doubles
//! as the ordering key for a day.

use chrono::NaiveTime;
use lazy_static::lazy_static;
use regex::Regex;

use crate::resolve::EntityKind;

/// Sentinel resolved text for the day-6 late-afternoon block. It merges like
/// any other text but renders as an empty cell.
pub const FREE_TIME_BLOCK: &str = "DAY_6_FREE_TIME_BLOCK";

/// Strptime-style formats tried in order for string time cells.
const TIME_FORMATS: [&str; 4] = ["%H:%M:%S", "%H:%M", "%I:%M %p", "%I:%M:%S %p"];

lazy_static! {
    // Loosely punctuated numeric forms, searched (not anchored) so that
    // trailing seconds or stray annotations don't defeat the match.
    static ref PUNCTUATED: Regex = Regex::new(r"(\d{1,2}):(\d{2})").unwrap();
    static ref DOTTED: Regex = Regex::new(r"(\d{1,2})\.(\d{2})").unwrap();
    static ref BARE_DIGITS: Regex = Regex::new(r"\b(\d{1,2})(\d{2})\b").unwrap();
}

/// Canonicalize a raw time cell to `HH:MM`, or `None` when the cell is not a
/// time at all (the row is then skipped, never defaulted).
///
/// A string that matches no known form but contains a colon is passed through
/// as-is: the source grids routinely carry malformed but recognizable values.
pub fn normalize_time(raw: &str) -> Option<String> {
    let s = raw.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("none") || s.eq_ignore_ascii_case("nan") {
        return None;
    }

    for fmt in TIME_FORMATS {
        if let Ok(t) = NaiveTime::parse_from_str(s, fmt) {
            return Some(t.format("%H:%M").to_string());
        }
    }

    for re in [&*PUNCTUATED, &*DOTTED, &*BARE_DIGITS] {
        if let Some(caps) = re.captures(s) {
            let hours: u32 = caps[1].parse().ok()?;
            let minutes: u32 = caps[2].parse().ok()?;
            if hours <= 23 && minutes <= 59 {
                return Some(format!("{:02}:{:02}", hours, minutes));
            }
        }
    }

    if s.contains(':') {
        return Some(s.to_string());
    }
    None
}

/// What to do with a normalized slot for a given day and entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotWindow {
    /// Resolve the row normally.
    Keep,
    /// Drop the row for this entity/day.
    Skip,
    /// Emit the free-time placeholder instead of resolving.
    FreeTimeBlock,
}

/// Apply the per-day, per-entity reporting window.
///
/// Students and teachers finish at 17:00 every day. On day 6 (index 5) the
/// 16:30–17:00 stretch is kept as a placeholder rather than dropped, and
/// teachers additionally start at 11:00 while students keep the earlier slots.
/// This asymmetry is a fixed rule of the source schedule, not an oversight.
/// Pianist grids carry evening slots and are never window-filtered.
pub fn slot_window(time: &str, day_index: usize, kind: EntityKind) -> SlotWindow {
    if kind == EntityKind::Pianist {
        return SlotWindow::Keep;
    }
    // Lenient pass-through values that don't parse are kept; the window only
    // applies to well-formed clock times.
    let Ok(t) = NaiveTime::parse_from_str(time, "%H:%M") else {
        return SlotWindow::Keep;
    };

    let five_pm = NaiveTime::from_hms_opt(17, 0, 0).unwrap();
    if t >= five_pm {
        return SlotWindow::Skip;
    }

    let is_day_6 = day_index == 5;
    if is_day_6 {
        let half_four = NaiveTime::from_hms_opt(16, 30, 0).unwrap();
        if t >= half_four {
            return SlotWindow::FreeTimeBlock;
        }
        let eleven_am = NaiveTime::from_hms_opt(11, 0, 0).unwrap();
        if kind == EntityKind::Teacher && t < eleven_am {
            return SlotWindow::Skip;
        }
    }
    SlotWindow::Keep
}
