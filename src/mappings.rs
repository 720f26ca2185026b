//! CSV lookup tables.
//!
//! Four small key→value tables are loaded per camp: student-id→display-name,
//! teacher→room, group-number→member list, and room-name→room-number. All of
//! them are optional: a missing or malformed file logs a warning and degrades
//! to an empty map, so unresolved identifiers and room names pass through as
//! literal text instead of aborting the batch.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

lazy_static! {
    /// Student identifiers as they appear in cells: an instrument prefix
    /// letter followed by a number (F3, C12, H5).
    pub static ref STUDENT_ID: Regex = Regex::new(r"\b[FCH]\d+\b").unwrap();
    static ref MEMBER_SPLIT: Regex = Regex::new(r"[,;&\n]+").unwrap();
    static ref HAS_LETTER: Regex = Regex::new(r"[A-Za-z]").unwrap();
}

#[derive(Debug, Deserialize)]
struct StudentRow {
    student_no: String,
    student_name: String,
}

#[derive(Debug, Deserialize)]
struct TeacherRoomRow {
    teacher_name: String,
    #[serde(alias = "room_number")]
    room_name: String,
}

#[derive(Debug, Deserialize)]
struct GroupRow {
    group_number: String,
    student_no: String,
}

#[derive(Debug, Deserialize)]
struct RoomNoRow {
    room_name: String,
    room_number: String,
}

/// The per-camp lookup tables consumed by the resolution engine. Immutable
/// after loading; one instance per camp/instrument.
#[derive(Debug, Default, Clone)]
pub struct Mappings {
    /// student-id → display name.
    pub student_names: HashMap<String, String>,
    /// teacher name → room.
    pub teacher_rooms: HashMap<String, String>,
    /// "Group N" → member identifiers (ids or names, as typed).
    pub groups: HashMap<String, Vec<String>>,
    /// room name → room number, substring-replaced in rendered text.
    pub room_numbers: HashMap<String, String>,
    /// Derived reverse map: member identifier → groups it belongs to.
    student_groups: HashMap<String, HashSet<String>>,
}

impl Mappings {
    /// Load all four tables for one camp. `camp_suffix` is the lowercase file
    /// suffix (`campa` / `campb`); `instrument` picks the id prefix used when
    /// extracting group members (e.g. "Flute" → `F`).
    pub fn load(input_dir: &Path, camp_suffix: &str, instrument: &str) -> Mappings {
        let mut maps = Mappings {
            student_names: load_student_names(
                &input_dir.join(format!("student_mapping-{}.csv", camp_suffix)),
            ),
            teacher_rooms: load_teacher_rooms(
                &input_dir.join(format!("room_mapping-{}.csv", camp_suffix)),
            ),
            groups: load_groups(
                &input_dir.join(format!("group_mapping-{}.csv", camp_suffix)),
                instrument,
            ),
            room_numbers: load_room_numbers(
                &input_dir.join(format!("room_no_mapping-{}.csv", camp_suffix)),
            ),
            student_groups: HashMap::new(),
        };
        maps.rebuild_student_groups();
        maps
    }

    /// Rebuild the reverse member→groups index. Called after `groups` is
    /// populated (tests build `Mappings` by hand).
    pub fn rebuild_student_groups(&mut self) {
        self.student_groups.clear();
        for (group, members) in &self.groups {
            for member in members {
                self.student_groups
                    .entry(member.clone())
                    .or_default()
                    .insert(group.clone());
            }
        }
    }

    /// Groups a student belongs to, by id or typed name.
    pub fn groups_for(&self, student: &str) -> Option<&HashSet<String>> {
        self.student_groups.get(student)
    }

    /// Room for a teacher; key matching is case-insensitive.
    pub fn room_for_teacher(&self, teacher: &str) -> Option<&str> {
        self.teacher_rooms
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(teacher))
            .map(|(_, room)| room.as_str())
    }

    /// Display name for a student id, or the id itself when unmapped.
    pub fn display_name<'a>(&'a self, student: &'a str) -> &'a str {
        self.student_names
            .get(student)
            .map(String::as_str)
            .unwrap_or(student)
    }

    /// Replace every student id in `text` with its display name.
    pub fn substitute_student_names(&self, text: &str) -> String {
        let mut out = text.to_string();
        let ids: HashSet<String> = STUDENT_ID
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect();
        for id in ids {
            if let Some(name) = self.student_names.get(&id) {
                let re = Regex::new(&format!(r"\b{}\b", regex::escape(&id)))
                    .expect("escaped id is a valid pattern");
                out = re.replace_all(&out, name.as_str()).into_owned();
            }
        }
        out
    }

    /// Substring-replace room names with their room numbers. Longer names are
    /// replaced first so "Maritime Museum Annex" is never eaten by
    /// "Maritime Museum".
    pub fn substitute_room_numbers(&self, text: &str) -> String {
        let mut names: Vec<&String> = self.room_numbers.keys().collect();
        names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        let mut out = text.to_string();
        for room_name in names {
            if out.contains(room_name.as_str()) {
                out = out.replace(room_name.as_str(), &self.room_numbers[room_name]);
            }
        }
        out
    }
}

/// Read a CSV file into typed rows, tolerating a UTF-8 BOM (the camp office
/// exports these from Excel). Missing or unreadable files return an empty
/// Vec after logging a warning.
fn read_records<T: for<'de> Deserialize<'de>>(path: &Path) -> Vec<T> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            log::warn!(
                "Mapping file {} not available ({}); identifiers will pass through as-is",
                path.display(),
                e
            );
            return Vec::new();
        }
    };
    let content = content.trim_start_matches('\u{feff}');
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content.as_bytes());
    let mut rows = Vec::new();
    for result in reader.deserialize() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => log::warn!("Skipping malformed row in {}: {}", path.display(), e),
        }
    }
    rows
}

fn load_student_names(path: &Path) -> HashMap<String, String> {
    read_records::<StudentRow>(path)
        .into_iter()
        .filter(|r| !r.student_no.trim().is_empty() && !r.student_name.trim().is_empty())
        .map(|r| (r.student_no.trim().to_string(), r.student_name.trim().to_string()))
        .collect()
}

fn load_teacher_rooms(path: &Path) -> HashMap<String, String> {
    read_records::<TeacherRoomRow>(path)
        .into_iter()
        .filter(|r| !r.teacher_name.trim().is_empty() && !r.room_name.trim().is_empty())
        .map(|r| (r.teacher_name.trim().to_string(), r.room_name.trim().to_string()))
        .collect()
}

fn load_room_numbers(path: &Path) -> HashMap<String, String> {
    read_records::<RoomNoRow>(path)
        .into_iter()
        .filter(|r| !r.room_name.trim().is_empty() && !r.room_number.trim().is_empty())
        .map(|r| (r.room_name.trim().to_string(), r.room_number.trim().to_string()))
        .collect()
}

/// Parse group membership rows. The `student_no` column is a free-form blob:
/// instrument-prefixed ids are extracted by pattern, and anything else that
/// splits out as a plausible name is kept verbatim so name-keyed grids work.
fn load_groups(path: &Path, instrument: &str) -> HashMap<String, Vec<String>> {
    let prefix = instrument
        .chars()
        .next()
        .map(|c| c.to_ascii_uppercase())
        .unwrap_or('F');
    let id_re = Regex::new(&format!(r"\b{}\d+\b", prefix)).expect("prefix is a single letter");
    let id_only_re =
        Regex::new(&format!(r"^{}\d+$", prefix)).expect("prefix is a single letter");

    let mut groups: HashMap<String, Vec<String>> = HashMap::new();
    for row in read_records::<GroupRow>(path) {
        let number = row.group_number.trim();
        let blob = row.student_no.trim();
        if number.is_empty() || blob.is_empty() {
            continue;
        }
        let group_name = format!("Group {}", number);
        let members = groups.entry(group_name).or_default();

        for m in id_re.find_iter(blob) {
            members.push(m.as_str().to_string());
        }
        for part in MEMBER_SPLIT.split(blob) {
            let name = part.trim();
            if name.len() >= 2 && HAS_LETTER.is_match(name) && !id_only_re.is_match(name) {
                members.push(name.to_string());
            }
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, content: &str) {
        let mut f = std::fs::File::create(dir.path().join(name)).unwrap();
        f.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn test_load_full_set() {
        let dir = TempDir::new().unwrap();
        write_file(
            &dir,
            "student_mapping-campa.csv",
            "student_no,student_name\nF3,Amy\nF4,Ben\n",
        );
        write_file(
            &dir,
            "room_mapping-campa.csv",
            "teacher_name,room_name\nJane Doe,12B\n",
        );
        write_file(
            &dir,
            "group_mapping-campa.csv",
            "group_number,student_no\n1,\"F3, F4\"\n5,\"F3 & Carla Voss\"\n",
        );
        write_file(
            &dir,
            "room_no_mapping-campa.csv",
            "room_name,room_number\nMaritime Museum,Room 101\n",
        );

        let maps = Mappings::load(dir.path(), "campa", "Flute");
        assert_eq!(maps.display_name("F3"), "Amy");
        assert_eq!(maps.room_for_teacher("jane doe"), Some("12B"));
        assert!(maps.groups_for("F3").unwrap().contains("Group 1"));
        assert!(maps.groups_for("F3").unwrap().contains("Group 5"));
        assert!(maps.groups_for("Carla Voss").unwrap().contains("Group 5"));
        assert_eq!(
            maps.substitute_room_numbers("Check in Maritime Museum"),
            "Check in Room 101"
        );
    }

    #[test]
    fn test_missing_files_degrade() {
        let dir = TempDir::new().unwrap();
        let maps = Mappings::load(dir.path(), "campb", "Cello");
        assert!(maps.student_names.is_empty());
        assert_eq!(maps.display_name("C7"), "C7");
        assert_eq!(maps.room_for_teacher("Anyone"), None);
    }

    #[test]
    fn test_bom_tolerated() {
        let dir = TempDir::new().unwrap();
        write_file(
            &dir,
            "student_mapping-campa.csv",
            "\u{feff}student_no,student_name\nH2,Iris\n",
        );
        let maps = Mappings::load(dir.path(), "campa", "Harp");
        assert_eq!(maps.display_name("H2"), "Iris");
    }

    #[test]
    fn test_substitute_student_names_word_bounded() {
        let dir = TempDir::new().unwrap();
        write_file(
            &dir,
            "student_mapping-campa.csv",
            "student_no,student_name\nF1,Amy\nF12,Ben\n",
        );
        let maps = Mappings::load(dir.path(), "campa", "Flute");
        assert_eq!(maps.substitute_student_names("F1 and F12"), "Amy and Ben");
    }
}
