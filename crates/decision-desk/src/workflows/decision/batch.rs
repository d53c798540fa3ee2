use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use serde_json::Value;

use super::domain::ModelDetail;
use super::form::{ScenarioForm, SubmissionBlocked};

/// Raw entries of one CSV row, keyed by header.
pub type ScenarioRow = BTreeMap<String, String>;

#[derive(Debug, thiserror::Error)]
pub enum BatchImportError {
    #[error("failed to read scenario file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid scenario CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("delimiter must be a single ASCII character, got '{0}'")]
    Delimiter(String),
}

pub fn parse_delimiter(raw: &str) -> Result<u8, BatchImportError> {
    match raw.as_bytes() {
        [byte] if byte.is_ascii() => Ok(*byte),
        _ if raw == "\\t" => Ok(b'\t'),
        _ => Err(BatchImportError::Delimiter(raw.to_string())),
    }
}

pub fn read_rows_from_path<P: AsRef<Path>>(
    path: P,
    delimiter: u8,
) -> Result<Vec<ScenarioRow>, BatchImportError> {
    let file = std::fs::File::open(path)?;
    read_rows(file, delimiter)
}

/// Reads a header row followed by one scenario per line.
pub fn read_rows<R: Read>(reader: R, delimiter: u8) -> Result<Vec<ScenarioRow>, BatchImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in csv_reader.deserialize::<ScenarioRow>() {
        rows.push(record?);
    }
    Ok(rows)
}

/// Row that failed validation, numbered from 1 after the header.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRow {
    pub row: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreparedBatch {
    /// Processed inputs ready for the batch decision endpoint.
    pub inputs: Vec<Value>,
    pub rejected: Vec<RejectedRow>,
}

/// Runs every row through a fresh scenario form; only clean rows become batch inputs.
pub fn prepare_batch(model: &ModelDetail, rows: Vec<ScenarioRow>) -> PreparedBatch {
    let mut batch = PreparedBatch::default();

    for (offset, row) in rows.into_iter().enumerate() {
        let row_number = offset + 1;
        let mut form = ScenarioForm::for_model(model);
        let known: Vec<(String, String)> = row
            .into_iter()
            .filter(|(name, _)| model.metadata.field(name).is_some())
            .collect();

        if let Err(err) = form.fill(known) {
            batch.rejected.push(RejectedRow {
                row: row_number,
                reason: err.to_string(),
            });
            continue;
        }

        match form.prepare_submission() {
            Ok(payload) => match serde_json::to_value(payload.into_input()) {
                Ok(input) => batch.inputs.push(input),
                Err(err) => batch.rejected.push(RejectedRow {
                    row: row_number,
                    reason: err.to_string(),
                }),
            },
            Err(blocked) => batch.rejected.push(RejectedRow {
                row: row_number,
                reason: describe(&blocked),
            }),
        }
    }

    batch
}

fn describe(blocked: &SubmissionBlocked) -> String {
    match blocked {
        SubmissionBlocked::InvalidFields { errors } => errors
            .iter()
            .map(|(name, error)| format!("{name}: {error}"))
            .collect::<Vec<_>>()
            .join("; "),
        other => other.to_string(),
    }
}
