//! The resolution cascade.
//!
//! For a target entity and one grid row, an ordered list of rules decides
//! which cell (if any) applies to that entity and what the clean activity
//! text is. Rules are tried in priority order; within a rule, cells are
//! scanned left to right; the first match wins for that time slot. No rule
//! ever errors: each one matches or falls through, so resolution is a pure,
//! deterministic function of the row and the mapping tables.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

use crate::grid::Sheet;
use crate::mappings::Mappings;
use crate::timeslot::{normalize_time, slot_window, SlotWindow, FREE_TIME_BLOCK};

/// Who a schedule is being resolved for. The reporting windows and the
/// unmatched-slot text differ per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Student,
    Teacher,
    Pianist,
}

/// One resolved (time, text) pair. `text == ""` means "nothing scheduled";
/// a slot missing from the list entirely means the slot does not exist for
/// this entity on this day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntry {
    pub time: String,
    pub text: String,
}

impl ResolvedEntry {
    pub fn new(time: impl Into<String>, text: impl Into<String>) -> Self {
        ResolvedEntry {
            time: time.into(),
            text: text.into(),
        }
    }
}

/// Everything a rule needs to classify one row for one student.
pub struct RowCtx<'a> {
    /// The student's identifier (e.g. `F3`) or typed display name.
    pub student: &'a str,
    /// Activity cells, aligned to `teachers`.
    pub cells: &'a [String],
    /// Column-header teacher names.
    pub teachers: &'a [String],
    pub maps: &'a Mappings,
    /// Instrument display name ("Flute"), used for practice-room text.
    pub instrument: &'a str,
}

/// A cascade rule: pure predicate + transform. Returns the resolved text when
/// the rule claims the row.
pub type Rule = fn(&RowCtx) -> Option<String>;

/// The student cascade, in priority order. A cell matching an earlier rule
/// always beats a cell matching a later one, regardless of column order.
pub const STUDENT_RULES: &[(&str, Rule)] = &[
    ("masterclass", rule_masterclass),
    ("direct-match", rule_direct_match),
    ("group-qualifier", rule_group_qualifier),
    ("simple-group", rule_simple_group),
    ("common-activity", rule_common_activity),
];

/// Shared activities that apply to everyone when no entity-specific rule
/// claimed the row.
const COMMON_ACTIVITIES: &[&str] = &[
    "Welcome",
    "Lunch",
    "Break",
    "Ensemble Coaching",
    "Workshop",
    "Toilet Break",
    "Rehearsal for Students and Friends Concert",
    "Lina Summer Camp of Music Students & Friends Concert",
    "After concert refreshment (Maritime Museum)",
    "Group Activity",
    "Briefing for Saturday",
    "Yoga Class",
    "Harp Regulation Workshop",
    "Harp Regulation Class",
    "Harp Regulation",
    "Cello Regulation & Maintenance Class",
    "Workshop - Warm Up",
    "Cello MasterClass",
    "MasterClass",
    "Flute MasterClass",
    "Harp MasterClass",
];

/// Activities blanked out of teacher schedules on days 1-5; they only concern
/// the students.
const TEACHER_SUPPRESSED: &[&str] = &["workshop", "briefing for saturday"];

/// The day-6 check-in block: four fixed 15-minute entries, added once per day.
const CHECK_IN_KEYWORD: &str = "Check in Maritime Museum";
const CHECK_IN_TIMES: [&str; 4] = ["10:00", "10:15", "10:30", "10:45"];
const CHECK_IN_TEXT: &str =
    "Check in Maritime Museum\nBriefing for Saturday Concert\nMaritime Museum Tour";

lazy_static! {
    static ref ID_LIKE: Regex = Regex::new(r"^[A-Z]\d+$").unwrap();
    static ref TRAILING_PAREN: Regex = Regex::new(r"\s*\([^)]+\)$").unwrap();
    static ref COMMA_WS_RUN: Regex = Regex::new(r"[,\s]+").unwrap();
    static ref EDGE_COMMA_WS: Regex = Regex::new(r"^[,\s]+|[,\s]+$").unwrap();
    static ref PIANIST_LESSON: Regex =
        Regex::new(r"(?i)lesson with (.+?) & pianist").unwrap();
    static ref ROOM_IN_PAREN: Regex = Regex::new(r"(?i)\(Room\s+(.+?)\)").unwrap();
    static ref GROUP_NUMBER_ONLY: Regex = Regex::new(r"^\s*Group\s+\d+\s*$").unwrap();
}

// ============================================================================
// Entity matching
// ============================================================================

/// Whether `text` references the student. Ids match word-bounded and
/// case-sensitively (so `F1` never fires inside `F12`); typed names match as
/// case-insensitive substrings, tolerating the grid's inconsistent casing.
pub fn mentions_student(student: &str, text: &str) -> bool {
    if ID_LIKE.is_match(student) {
        word_bounded(student).is_match(text)
    } else {
        text.to_lowercase().contains(&student.to_lowercase())
    }
}

/// Remove the student's identifier/name from `text` and tidy the edges.
fn strip_student(student: &str, text: &str) -> String {
    let removed = if ID_LIKE.is_match(student) {
        word_bounded(student).replace_all(text, "").into_owned()
    } else {
        Regex::new(&format!(r"(?i){}", regex::escape(student)))
            .expect("escaped name is a valid pattern")
            .replace_all(text, "")
            .into_owned()
    };
    EDGE_COMMA_WS.replace_all(removed.trim(), "").into_owned()
}

fn word_bounded(id: &str) -> Regex {
    Regex::new(&format!(r"\b{}\b", regex::escape(id))).expect("escaped id is a valid pattern")
}

fn column_teacher<'a>(ctx: &'a RowCtx, col: usize) -> Option<&'a str> {
    ctx.teachers
        .get(col)
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
}

// ============================================================================
// Student cascade rules
// ============================================================================

/// Rule 1: a masterclass cell naming this student. The owning teacher is the
/// longest known teacher name found inside the cell, falling back to the
/// column header.
fn rule_masterclass(ctx: &RowCtx) -> Option<String> {
    for (i, cell) in ctx.cells.iter().enumerate() {
        if cell.is_empty()
            || !cell.to_lowercase().contains("masterclass")
            || !mentions_student(ctx.student, cell)
        {
            continue;
        }

        // Longest names first, so "Jane Doe-Smith" wins over "Jane Doe".
        let mut known: Vec<&String> = ctx.maps.teacher_rooms.keys().collect();
        known.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        let teacher = known
            .into_iter()
            .map(String::as_str)
            .find(|name| cell.contains(name))
            .or_else(|| column_teacher(ctx, i));

        let room = teacher
            .and_then(|t| ctx.maps.room_for_teacher(t))
            .unwrap_or("TBD");

        let base = strip_student(ctx.student, cell);
        let base = TRAILING_PAREN.replace(&base, "");
        let base = COMMA_WS_RUN.replace_all(base.trim(), " ");
        return Some(format!("{}\n({})", base.trim(), room));
    }
    None
}

/// Rule 2: the cell names the student directly, either a private lesson or
/// some other activity with the student written in.
fn rule_direct_match(ctx: &RowCtx) -> Option<String> {
    for (i, cell) in ctx.cells.iter().enumerate() {
        if cell.is_empty() || !mentions_student(ctx.student, cell) {
            continue;
        }
        let cleaned = strip_student(ctx.student, cell);

        // "Lesson with <T> & pianist": the named teacher appears in the text,
        // but the room comes from the *column* teacher. That divergence is
        // how the source grid works; keep it.
        if let Some(caps) = PIANIST_LESSON.captures(&cleaned) {
            let named_teacher = caps[1].trim().to_string();
            let room = column_teacher(ctx, i)
                .and_then(|t| ctx.maps.room_for_teacher(t))
                .unwrap_or("TBD");
            return Some(format!(
                "Private Lesson with {} & pianist\n({})",
                named_teacher, room
            ));
        }

        let is_private_lesson =
            cleaned.is_empty() || cleaned.to_lowercase().contains("private lesson");
        if is_private_lesson {
            return Some(match column_teacher(ctx, i) {
                Some(teacher) => {
                    let desc = if cleaned.is_empty() {
                        format!("Private Lesson with {}", teacher)
                    } else {
                        cleaned.clone()
                    };
                    match ctx.maps.room_for_teacher(teacher) {
                        Some(room) => format!("{}\n({})", desc, room),
                        None => desc,
                    }
                }
                // No teacher in this column: the student practises instead.
                None => format!("Practice\n({} practice room)", ctx.instrument),
            });
        }

        if cleaned.eq_ignore_ascii_case("practice") {
            return Some(format!("Practice\n({} practice room)", ctx.instrument));
        }
        return Some(cleaned);
    }
    None
}

/// Rule 3: "Group 2, 5 Acting Class (Room 4)": group numbers plus a residual
/// activity phrase. Applies when the student's groups intersect the listed
/// ones.
fn rule_group_qualifier(ctx: &RowCtx) -> Option<String> {
    let student_groups = ctx.maps.groups_for(ctx.student);
    for cell in ctx.cells {
        let lower = cell.to_lowercase();
        if !lower.starts_with("group") || !cell.contains(',') {
            continue;
        }
        let body = cell["Group".len()..].trim().replace(',', " ");

        let mut involved: HashSet<String> = HashSet::new();
        let mut phrase_parts: Vec<&str> = Vec::new();
        for token in body.split_whitespace() {
            if token.chars().all(|c| c.is_ascii_digit()) {
                involved.insert(format!("Group {}", token));
            } else {
                phrase_parts.push(token);
            }
        }
        let phrase = phrase_parts.join(" ");

        let belongs = student_groups
            .map(|groups| !groups.is_disjoint(&involved))
            .unwrap_or(false);
        if !belongs {
            continue;
        }

        let phrase_lower = phrase.to_lowercase();
        if phrase_lower.contains("acting class") {
            let room = ctx
                .maps
                .teacher_rooms
                .get("Room Acting Class")
                .map(String::as_str)
                .unwrap_or("Room Acting Class");
            return Some(format!("Acting Class\n({})", room));
        }
        if phrase_lower.contains("group") || phrase_lower.contains("room") {
            return Some(phrase);
        }
        return Some(format!("{}\n(Group)", phrase));
    }
    None
}

/// Rule 4: a plain group cell ("Group 3 ...") whose group name literally
/// prefixes the text. The room comes from an explicit `(Room X)` in the cell
/// or from the column teacher's mapping.
fn rule_simple_group(ctx: &RowCtx) -> Option<String> {
    let student_groups = ctx.maps.groups_for(ctx.student)?;
    let mut groups: Vec<&String> = student_groups.iter().collect();
    groups.sort();

    for (i, cell) in ctx.cells.iter().enumerate() {
        if !cell.to_lowercase().starts_with("group") {
            continue;
        }
        for group_name in &groups {
            if !cell.starts_with(group_name.as_str()) {
                continue;
            }
            if let Some(caps) = ROOM_IN_PAREN.captures(cell) {
                return Some(format!("Ensemble\n(Room {})", caps[1].trim()));
            }
            let room = column_teacher(ctx, i)
                .and_then(|t| ctx.maps.room_for_teacher(t))
                .unwrap_or("TBD");
            return Some(format!("Ensemble\n({})", room));
        }
    }
    None
}

/// Rule 5: shared-activity fallback over the whole row. A masterclass cell is
/// skipped unless it names the current student; another student's named
/// masterclass is not a common activity.
fn rule_common_activity(ctx: &RowCtx) -> Option<String> {
    for cell in ctx.cells {
        if cell.is_empty() {
            continue;
        }
        if cell.to_lowercase().contains("masterclass")
            && !mentions_student(ctx.student, cell)
        {
            continue;
        }
        if COMMON_ACTIVITIES.iter().any(|a| cell.contains(a)) {
            return Some(cell.clone());
        }
    }
    None
}

/// Run the student cascade over one row. Always resolves: an unmatched row is
/// the empty text, which is distinct from the slot being absent.
pub fn resolve_student_row(ctx: &RowCtx) -> String {
    for (_, rule) in STUDENT_RULES {
        if let Some(text) = rule(ctx) {
            return text;
        }
    }
    String::new()
}

// ============================================================================
// Day 6
// ============================================================================

/// Day-6 rows use a simpler cascade for every entity kind: the first
/// non-empty cell is taken verbatim, except the check-in cell which expands
/// once per day into four fixed 15-minute entries. `check_in_added` is the
/// per-day guard; it must be freshly false at the start of each day's pass.
pub fn resolve_day6_row(
    time: &str,
    cells: &[String],
    check_in_added: &mut bool,
) -> Vec<ResolvedEntry> {
    for cell in cells {
        if cell.is_empty() {
            continue;
        }
        if cell.contains(CHECK_IN_KEYWORD) {
            if *check_in_added {
                return Vec::new();
            }
            *check_in_added = true;
            return CHECK_IN_TIMES
                .iter()
                .map(|t| ResolvedEntry::new(*t, CHECK_IN_TEXT))
                .collect();
        }
        return vec![ResolvedEntry::new(time, cell.clone())];
    }
    vec![ResolvedEntry::new(time, "")]
}

// ============================================================================
// Per-day resolution passes
// ============================================================================

/// Resolve one day of one student's schedule. Rows whose time cell is not a
/// time are skipped silently; the result is sorted by time.
pub fn resolve_student_day(
    student: &str,
    sheet: &Sheet,
    day_index: usize,
    maps: &Mappings,
    instrument: &str,
) -> Vec<ResolvedEntry> {
    let mut entries = Vec::new();
    let mut check_in_added = false;

    for row in &sheet.rows {
        let Some(time) = normalize_time(&row.time_raw) else {
            continue;
        };
        match slot_window(&time, day_index, EntityKind::Student) {
            SlotWindow::Skip => continue,
            SlotWindow::FreeTimeBlock => {
                entries.push(ResolvedEntry::new(time, FREE_TIME_BLOCK));
                continue;
            }
            SlotWindow::Keep => {}
        }

        if day_index == 5 {
            entries.extend(resolve_day6_row(&time, &row.cells, &mut check_in_added));
        } else {
            let ctx = RowCtx {
                student,
                cells: &row.cells,
                teachers: &sheet.teachers,
                maps,
                instrument,
            };
            entries.push(ResolvedEntry::new(time, resolve_student_row(&ctx)));
        }
    }

    entries.sort_by(|a, b| a.time.cmp(&b.time));
    entries
}

/// Resolve one day of one teacher's schedule. Returns `None` when the teacher
/// has no column on this sheet (the day is absent, not empty).
pub fn resolve_teacher_day(
    teacher: &str,
    sheet: &Sheet,
    day_index: usize,
    maps: &Mappings,
) -> Option<Vec<ResolvedEntry>> {
    let col = sheet
        .teachers
        .iter()
        .position(|t| t.eq_ignore_ascii_case(teacher))?;

    let mut entries = Vec::new();
    let mut check_in_added = false;

    for row in &sheet.rows {
        let Some(time) = normalize_time(&row.time_raw) else {
            continue;
        };
        match slot_window(&time, day_index, EntityKind::Teacher) {
            SlotWindow::Skip => continue,
            SlotWindow::FreeTimeBlock => {
                entries.push(ResolvedEntry::new(time, FREE_TIME_BLOCK));
                continue;
            }
            SlotWindow::Keep => {}
        }

        if day_index == 5 {
            entries.extend(resolve_day6_row(&time, &row.cells, &mut check_in_added));
            continue;
        }

        let cell = row.cells.get(col).map(|c| c.trim()).unwrap_or("");
        if cell.is_empty() {
            entries.push(ResolvedEntry::new(time, "Free Time"));
        } else {
            entries.push(ResolvedEntry::new(
                time,
                teacher_substitutions(cell, day_index, maps),
            ));
        }
    }

    entries.sort_by(|a, b| a.time.cmp(&b.time));
    Some(entries)
}

/// Post-substitutions applied to a teacher's chosen cell text: student ids
/// become display names, a bare "Group N" gains its "Ensemble Coaching"
/// suffix, room names become room numbers, and student-only activities are
/// blanked on days 1-5.
pub fn teacher_substitutions(text: &str, day_index: usize, maps: &Mappings) -> String {
    let mut out = maps.substitute_student_names(text);
    if GROUP_NUMBER_ONLY.is_match(&out) && !out.contains("Ensemble Coaching") {
        out = format!("{} Ensemble Coaching", out.trim());
    }
    out = maps.substitute_room_numbers(&out);

    if day_index != 5 {
        let lower = out.to_lowercase();
        if TEACHER_SUPPRESSED.iter().any(|k| lower.contains(k)) {
            return String::new();
        }
    }
    out
}

/// Resolve one day column of a pianist sheet. Pianist grids already carry one
/// column per day; cells only receive the uniform substitutions.
pub fn resolve_pianist_day(sheet: &Sheet, day_col: usize, maps: &Mappings) -> Vec<ResolvedEntry> {
    let mut entries = Vec::new();
    for row in &sheet.rows {
        let Some(time) = normalize_time(&row.time_raw) else {
            continue;
        };
        let cell = row.cells.get(day_col).map(|c| c.trim()).unwrap_or("");
        let text = maps.substitute_room_numbers(&maps.substitute_student_names(cell));
        entries.push(ResolvedEntry::new(time, text));
    }
    entries.sort_by(|a, b| a.time.cmp(&b.time));
    entries
}
