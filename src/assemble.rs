//! Merging resolved slots into spanning blocks.
//!
//! Consecutive slots with byte-identical resolved text collapse into one
//! `Block` covering the whole run. Equality is exact: "Lunch" and "Lunch "
//! are different activities and stay separate. Empty texts merge like any
//! other, which is how a quiet afternoon becomes one tall blank cell instead
//! of a stack of small ones.

use std::collections::BTreeSet;

use crate::resolve::ResolvedEntry;
use crate::timeslot::FREE_TIME_BLOCK;

/// A maximal run of identical resolved text. `start` and `end` are inclusive
/// `HH:MM` slot keys; a single-slot block has `start == end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub start: String,
    pub end: String,
    pub text: String,
}

impl Block {
    /// The text to draw. The day-6 free-time placeholder reserves its rows
    /// but renders blank.
    pub fn display_text(&self) -> &str {
        if self.text == FREE_TIME_BLOCK {
            ""
        } else {
            &self.text
        }
    }
}

/// Collapse a sorted day's entries into maximal equal-text runs.
pub fn merge_runs(entries: &[ResolvedEntry]) -> Vec<Block> {
    let mut blocks: Vec<Block> = Vec::new();
    for entry in entries {
        match blocks.last_mut() {
            Some(last) if last.text == entry.text => last.end = entry.time.clone(),
            _ => blocks.push(Block {
                start: entry.time.clone(),
                end: entry.time.clone(),
                text: entry.text.clone(),
            }),
        }
    }
    blocks
}

/// The union of slot keys across all days of one entity's week, sorted. Days
/// the entity has no column for contribute nothing (absent, not empty); the
/// output grid's rows come from this index.
pub fn union_time_index(days: &[Option<Vec<ResolvedEntry>>]) -> Vec<String> {
    let mut times: BTreeSet<String> = BTreeSet::new();
    for day in days.iter().flatten() {
        for entry in day {
            times.insert(entry.time.clone());
        }
    }
    times.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(pairs: &[(&str, &str)]) -> Vec<ResolvedEntry> {
        pairs
            .iter()
            .map(|(t, x)| ResolvedEntry::new(*t, *x))
            .collect()
    }

    #[test]
    fn test_consecutive_identical_slots_merge() {
        let blocks = merge_runs(&entries(&[
            ("12:00", "Lunch"),
            ("12:15", "Lunch"),
            ("12:30", "Lunch"),
            ("12:45", "Yoga Class"),
        ]));
        assert_eq!(
            blocks,
            vec![
                Block {
                    start: "12:00".into(),
                    end: "12:30".into(),
                    text: "Lunch".into()
                },
                Block {
                    start: "12:45".into(),
                    end: "12:45".into(),
                    text: "Yoga Class".into()
                },
            ]
        );
    }

    #[test]
    fn test_no_adjacent_blocks_share_text() {
        let blocks = merge_runs(&entries(&[
            ("09:00", "A"),
            ("09:15", ""),
            ("09:30", ""),
            ("09:45", "A"),
        ]));
        assert_eq!(blocks.len(), 3);
        for pair in blocks.windows(2) {
            assert_ne!(pair[0].text, pair[1].text);
        }
    }

    #[test]
    fn test_equality_is_exact() {
        let blocks = merge_runs(&entries(&[("09:00", "Lunch"), ("09:15", "Lunch ")]));
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn test_free_time_placeholder_merges_but_renders_blank() {
        let blocks = merge_runs(&entries(&[
            ("16:30", FREE_TIME_BLOCK),
            ("16:45", FREE_TIME_BLOCK),
        ]));
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, FREE_TIME_BLOCK);
        assert_eq!(blocks[0].display_text(), "");
    }

    #[test]
    fn test_union_index_skips_absent_days() {
        let days = vec![
            Some(entries(&[("09:00", "A"), ("10:00", "B")])),
            None,
            Some(entries(&[("09:30", "C"), ("09:00", "D")])),
        ];
        assert_eq!(union_time_index(&days), vec!["09:00", "09:30", "10:00"]);
    }
}
