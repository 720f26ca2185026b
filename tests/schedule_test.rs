//! End-to-end resolution and merge tests over hand-built in-memory grids.
//!
//! These exercise the same path the pipeline takes per day: build a `Sheet`,
//! resolve it for one entity, merge the result into blocks.

use timetable_toolkit::assemble::{merge_runs, union_time_index, Block};
use timetable_toolkit::grid::Sheet;
use timetable_toolkit::mappings::Mappings;
use timetable_toolkit::resolve::{
    resolve_student_day, resolve_teacher_day, ResolvedEntry,
};
use timetable_toolkit::timeslot::FREE_TIME_BLOCK;

fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|s| s.to_string()).collect()
}

/// One weekday sheet with two teacher columns.
fn weekday_sheet(rows: Vec<Vec<String>>) -> Sheet {
    let mut table = vec![row(&["", "Jane Doe", "John Smith"]), row(&[""])];
    table.extend(rows);
    Sheet::from_table("Day 1", table)
}

fn camp_mappings() -> Mappings {
    let mut maps = Mappings::default();
    maps.student_names.insert("F3".into(), "Amy".into());
    maps.student_names.insert("F7".into(), "Ben".into());
    maps.teacher_rooms.insert("Jane Doe".into(), "12B".into());
    maps.teacher_rooms.insert("John Smith".into(), "UG4".into());
    maps.groups
        .insert("Group 5".into(), vec!["F3".into(), "F7".into()]);
    maps.room_numbers
        .insert("Maritime Museum".into(), "Room 101".into());
    maps.rebuild_student_groups();
    maps
}

#[test]
fn test_bare_id_becomes_private_lesson() {
    let sheet = weekday_sheet(vec![row(&["09:00", "F3", ""])]);
    let maps = camp_mappings();
    let entries = resolve_student_day("F3", &sheet, 0, &maps, "Flute");
    assert_eq!(
        entries,
        vec![ResolvedEntry::new(
            "09:00",
            "Private Lesson with Jane Doe\n(12B)"
        )]
    );
}

#[test]
fn test_acting_class_literal_room_fallback() {
    // The acting-class room mapping is unset, so the lookup key itself is the
    // room text.
    let sheet = weekday_sheet(vec![row(&["14:00", "Group 2, 5 Acting Class (Room 4)", ""])]);
    let maps = camp_mappings();
    let entries = resolve_student_day("F3", &sheet, 0, &maps, "Flute");
    assert_eq!(
        entries,
        vec![ResolvedEntry::new(
            "14:00",
            "Acting Class\n(Room Acting Class)"
        )]
    );
}

#[test]
fn test_consecutive_lunch_slots_merge_into_one_block() {
    let sheet = weekday_sheet(vec![
        row(&["12:00", "Lunch", ""]),
        row(&["12:15", "Lunch", ""]),
        row(&["12:30", "Lunch", ""]),
        row(&["12:45", "F3", ""]),
    ]);
    let maps = camp_mappings();
    let entries = resolve_student_day("F3", &sheet, 0, &maps, "Flute");
    let blocks = merge_runs(&entries);
    assert_eq!(blocks.len(), 2);
    assert_eq!(
        blocks[0],
        Block {
            start: "12:00".into(),
            end: "12:30".into(),
            text: "Lunch".into()
        }
    );
}

#[test]
fn test_rule_priority_beats_column_order() {
    // A group cell in column 1 loses to a masterclass cell in column 2.
    let sheet = weekday_sheet(vec![row(&[
        "10:00",
        "Group 5 rehearsal",
        "Flute MasterClass F3",
    ])]);
    let maps = camp_mappings();
    let entries = resolve_student_day("F3", &sheet, 0, &maps, "Flute");
    assert_eq!(
        entries,
        vec![ResolvedEntry::new("10:00", "Flute MasterClass\n(UG4)")]
    );
}

#[test]
fn test_resolution_is_idempotent() {
    let sheet = weekday_sheet(vec![
        row(&["09:00", "F3", "F7"]),
        row(&["09:30", "", "Lunch"]),
        row(&["10:00", "Group 5 (Room UG24)", ""]),
    ]);
    let maps = camp_mappings();
    let first = resolve_student_day("F3", &sheet, 0, &maps, "Flute");
    let second = resolve_student_day("F3", &sheet, 0, &maps, "Flute");
    assert_eq!(first, second);
}

#[test]
fn test_seventeen_hundred_cutoff_applies() {
    let sheet = weekday_sheet(vec![
        row(&["16:45", "Lunch", ""]),
        row(&["17:00", "Lunch", ""]),
        row(&["18:00", "Dinner", ""]),
    ]);
    let maps = camp_mappings();
    let entries = resolve_student_day("F3", &sheet, 0, &maps, "Flute");
    assert_eq!(entries, vec![ResolvedEntry::new("16:45", "Lunch")]);
}

#[test]
fn test_day6_check_in_expands_once_per_day() {
    let table = vec![
        row(&["", "Jane Doe", "John Smith"]),
        row(&[""]),
        row(&["09:45", "Check in Maritime Museum at 10", ""]),
        row(&["10:15", "Check in Maritime Museum at 10", ""]),
        row(&["11:00", "Rehearsal for Students and Friends Concert", ""]),
    ];
    let sheet = Sheet::from_table("Day 6", table);
    let maps = camp_mappings();
    let entries = resolve_student_day("F3", &sheet, 5, &maps, "Flute");

    let check_ins: Vec<&ResolvedEntry> = entries
        .iter()
        .filter(|e| e.text.starts_with("Check in Maritime Museum"))
        .collect();
    assert_eq!(check_ins.len(), 4);
    assert_eq!(check_ins[0].time, "10:00");
    assert_eq!(check_ins[3].time, "10:45");
    assert!(entries
        .iter()
        .any(|e| e.time == "11:00"
            && e.text == "Rehearsal for Students and Friends Concert"));
}

#[test]
fn test_day6_free_time_block_merges_and_renders_blank() {
    let table = vec![
        row(&["", "Jane Doe"]),
        row(&[""]),
        row(&["16:30", "ignored", ""]),
        row(&["16:45", "ignored", ""]),
        row(&["17:00", "ignored", ""]),
    ];
    let sheet = Sheet::from_table("Day 6", table);
    let maps = camp_mappings();
    let entries = resolve_student_day("F3", &sheet, 5, &maps, "Flute");
    assert_eq!(
        entries,
        vec![
            ResolvedEntry::new("16:30", FREE_TIME_BLOCK),
            ResolvedEntry::new("16:45", FREE_TIME_BLOCK),
        ]
    );
    let blocks = merge_runs(&entries);
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].display_text(), "");
}

#[test]
fn test_absent_day_differs_from_empty_day() {
    let with_column = weekday_sheet(vec![row(&["09:00", "", ""])]);
    let without_column = Sheet::from_table(
        "Day 2",
        vec![
            row(&["", "John Smith"]),
            row(&[""]),
            row(&["09:00", "whatever"]),
        ],
    );
    let maps = camp_mappings();

    // Day with a column but no work: one "Free Time" slot.
    let present = resolve_teacher_day("Jane Doe", &with_column, 0, &maps).unwrap();
    assert_eq!(present, vec![ResolvedEntry::new("09:00", "Free Time")]);

    // Day without a column: absent entirely.
    assert!(resolve_teacher_day("Jane Doe", &without_column, 1, &maps).is_none());

    // The absent day contributes nothing to the union row index.
    let days = vec![
        Some(present),
        resolve_teacher_day("Jane Doe", &without_column, 1, &maps),
    ];
    assert_eq!(union_time_index(&days), vec!["09:00"]);
}

#[test]
fn test_teacher_sees_student_names_and_room_numbers() {
    let sheet = weekday_sheet(vec![
        row(&["09:00", "F3", ""]),
        row(&["09:30", "Group 5", ""]),
        row(&["10:00", "Meet at Maritime Museum", ""]),
        row(&["10:30", "Workshop - Warm Up", ""]),
    ]);
    let maps = camp_mappings();
    let entries = resolve_teacher_day("Jane Doe", &sheet, 0, &maps).unwrap();
    assert_eq!(
        entries,
        vec![
            ResolvedEntry::new("09:00", "Amy"),
            ResolvedEntry::new("09:30", "Group 5 Ensemble Coaching"),
            ResolvedEntry::new("10:00", "Meet at Room 101"),
            ResolvedEntry::new("10:30", ""),
        ]
    );
}

#[test]
fn test_unmatched_slots_merge_as_one_empty_block() {
    let sheet = weekday_sheet(vec![
        row(&["09:00", "F7", ""]),
        row(&["09:15", "F7", ""]),
        row(&["09:30", "F3", ""]),
    ]);
    let maps = camp_mappings();
    let entries = resolve_student_day("F3", &sheet, 0, &maps, "Flute");
    let blocks = merge_runs(&entries);
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].text, "");
    assert_eq!(blocks[0].start, "09:00");
    assert_eq!(blocks[0].end, "09:15");
    assert_eq!(blocks[1].text, "Private Lesson with Jane Doe\n(12B)");
}

#[test]
fn test_name_keyed_student_resolves_case_insensitively() {
    let sheet = weekday_sheet(vec![row(&["09:00", "", "CARLA VOSS"])]);
    let maps = camp_mappings();
    let entries = resolve_student_day("Carla Voss", &sheet, 0, &maps, "Flute");
    assert_eq!(
        entries,
        vec![ResolvedEntry::new(
            "09:00",
            "Private Lesson with John Smith\n(UG4)"
        )]
    );
}
