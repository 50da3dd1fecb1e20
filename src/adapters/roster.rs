use crate::config::toml_config::RosterConfig;
use crate::domain::model::{normalize_key, Roster, StudentRecord};
use crate::utils::error::{IdGenError, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

/// Reads the CSV roster and checks it against the roster settings.
pub struct RosterReader<'a> {
    config: &'a RosterConfig,
}

impl<'a> RosterReader<'a> {
    pub fn new(config: &'a RosterConfig) -> Self {
        Self { config }
    }

    pub fn read_path(&self, path: &Path) -> Result<Roster> {
        let file = File::open(path)
            .map_err(|e| IdGenError::data(format!("cannot open {}: {}", path.display(), e)))?;
        self.read(file)
    }

    pub fn read<R: Read>(&self, reader: R) -> Result<Roster> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();
        check_headers(&headers)?;
        let headers: Arc<[String]> = headers.into();

        let key_column = match &self.config.key_column {
            Some(column) => resolve_column(&headers, "roster.key_column", column)?,
            None => headers[0].clone(),
        };
        let photo_column = match &self.config.photo_column {
            Some(column) => resolve_column(&headers, "roster.photo_column", column)?,
            None => key_column.clone(),
        };
        let group_column = self
            .config
            .group_column
            .as_deref()
            .map(|column| resolve_column(&headers, "roster.group_column", column))
            .transpose()?;
        let barcode_column = match &self.config.barcode_column {
            Some(column) => resolve_column(&headers, "roster.barcode_column", column)?,
            None => key_column.clone(),
        };

        let mut records = Vec::new();

        for (idx, result) in csv_reader.records().enumerate() {
            let row = result?;
            let line = row
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(idx + 2);
            let record = StudentRecord::new(
                line,
                Arc::clone(&headers),
                row.iter().map(str::to_string).collect(),
            );

            tracing::debug!("Row {}: {}", line, row.iter().collect::<Vec<_>>().join(", "));

            records.push(record);
        }

        tracing::debug!(
            "Roster columns: {:?} (key: {}, photo: {}, group: {:?}, barcode: {})",
            headers,
            key_column,
            photo_column,
            group_column,
            barcode_column
        );

        Ok(Roster {
            headers,
            records,
            key_column,
            photo_column,
            group_column,
            barcode_column,
        })
    }
}

fn check_headers(headers: &[String]) -> Result<()> {
    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(IdGenError::data("roster has no header row"));
    }

    let mut seen: HashMap<String, usize> = HashMap::new();
    for (idx, header) in headers.iter().enumerate() {
        let normalized = normalize_key(header);
        if normalized.is_empty() {
            return Err(IdGenError::data(format!(
                "header column {} has no name",
                idx + 1
            )));
        }
        if let Some(previous) = seen.insert(normalized, idx) {
            return Err(IdGenError::data(format!(
                "header columns '{}' and '{}' have the same name",
                headers[previous], header
            )));
        }
    }
    Ok(())
}

fn resolve_column(headers: &[String], setting: &str, wanted: &str) -> Result<String> {
    let normalized = normalize_key(wanted);
    headers
        .iter()
        .find(|h| h.as_str() == wanted)
        .or_else(|| headers.iter().find(|h| normalize_key(h) == normalized))
        .cloned()
        .ok_or_else(|| {
            IdGenError::data(format!(
                "{} '{}' is not a roster column (columns: {})",
                setting,
                wanted,
                headers.join(", ")
            ))
        })
}
