//! Decoding of task-definition CSV files.
//!
//! Expected header: `task_description,points`. Extra columns are ignored.

use std::io::Read;

use serde::{Deserialize, Serialize};

pub const DESCRIPTION_COLUMN: &str = "task_description";
pub const POINTS_COLUMN: &str = "points";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub description: String,
    pub points: i32,
}

#[derive(Debug, thiserror::Error)]
pub enum CsvImportError {
    #[error("csv is missing required column `{0}`")]
    MissingColumn(&'static str),

    #[error("line {line}: {reason}")]
    Row { line: u64, reason: String },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    task_description: Option<String>,
    points: Option<String>,
}

/// Decodes every record or none: the first bad row aborts with its line number.
/// When a description repeats, the later row wins.
pub fn decode<R: Read>(reader: R) -> Result<Vec<TaskDefinition>, CsvImportError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers: csv::StringRecord = rdr
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}'))
        .collect();
    for required in [DESCRIPTION_COLUMN, POINTS_COLUMN] {
        if !headers.iter().any(|h| h == required) {
            return Err(CsvImportError::MissingColumn(required));
        }
    }

    let mut out: Vec<TaskDefinition> = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let raw: RawRecord = record
            .deserialize(Some(&headers))
            .map_err(|e| CsvImportError::Row {
                line,
                reason: e.to_string(),
            })?;
        let def = validate(raw).map_err(|reason| CsvImportError::Row { line, reason })?;
        match out.iter_mut().find(|d| d.description == def.description) {
            Some(existing) => existing.points = def.points,
            None => out.push(def),
        }
    }
    Ok(out)
}

fn validate(raw: RawRecord) -> Result<TaskDefinition, String> {
    let description = raw
        .task_description
        .filter(|d| !d.is_empty())
        .ok_or_else(|| format!("`{DESCRIPTION_COLUMN}` is empty"))?;
    let points_raw = raw
        .points
        .filter(|p| !p.is_empty())
        .ok_or_else(|| format!("`{POINTS_COLUMN}` is empty for {description:?}"))?;
    let points = points_raw
        .parse::<i32>()
        .map_err(|_| format!("`{POINTS_COLUMN}` is not an integer: {points_raw:?}"))?;
    Ok(TaskDefinition {
        description,
        points,
    })
}
