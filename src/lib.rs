//! Timetable Toolkit
//!
//! Splits a master summer-camp timetable workbook (one sheet per day, columns
//! per teacher, time-slot rows) into individually addressed schedules.
//!
//! This library provides:
//! - `timeslot`: time-cell normalization and per-day reporting windows
//! - `grid`: xlsx loading with merged-range expansion
//! - `mappings`: per-camp CSV lookup tables
//! - `resolve`: the per-entity resolution cascade
//! - `assemble`: run-length merge of resolved slots into spanning blocks
//! - `render`: per-entity output workbooks
//! - `pipeline`: batch orchestration (discovery, generation, packaging)
//!
//! Binaries:
//! - `timetable`: batch generation and packaging CLI
//! - `grid-debug`: single-entity resolution spot-check utility

pub mod assemble;
pub mod grid;
pub mod mappings;
pub mod pipeline;
pub mod render;
pub mod resolve;
pub mod timeslot;
