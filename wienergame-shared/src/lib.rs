//! Domain logic shared by the WienerGame bot: message rules, CSV decoding,
//! report rendering and scheduling. Nothing here performs I/O.

pub mod admin;
pub mod csv_import;
pub mod domain;
pub mod report;
pub mod rules;
pub mod schedule;

pub use domain::{ScoreRow, TaskEntry, Username};
