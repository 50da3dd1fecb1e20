use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Canonical form of a column or placeholder name: trimmed, lower-cased, with runs of
/// whitespace, `-` and `_` collapsed to a single `_`.
pub fn normalize_key(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;
    for ch in raw.trim().chars() {
        if ch.is_whitespace() || ch == '-' || ch == '_' {
            pending_sep = true;
            continue;
        }
        if pending_sep && !out.is_empty() {
            out.push('_');
        }
        pending_sep = false;
        out.extend(ch.to_lowercase());
    }
    out
}

/// One roster row. Values line up with the shared header.
#[derive(Debug, Clone)]
pub struct StudentRecord {
    row: usize,
    headers: Arc<[String]>,
    values: Vec<String>,
}

impl StudentRecord {
    pub fn new(row: usize, headers: Arc<[String]>, values: Vec<String>) -> Self {
        debug_assert_eq!(headers.len(), values.len());
        Self {
            row,
            headers,
            values,
        }
    }

    /// 1-based line number in the roster file (the header is line 1).
    pub fn row(&self) -> usize {
        self.row
    }

    /// Looks up a field by exact column name, then by normalized name.
    pub fn get(&self, column: &str) -> Option<&str> {
        let idx = self
            .headers
            .iter()
            .position(|h| h == column)
            .or_else(|| {
                let wanted = normalize_key(column);
                self.headers.iter().position(|h| normalize_key(h) == wanted)
            })?;
        self.values.get(idx).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(String::as_str))
    }
}

/// The parsed roster together with the columns that drive card generation.
#[derive(Debug, Clone)]
pub struct Roster {
    pub headers: Arc<[String]>,
    pub records: Vec<StudentRecord>,
    pub key_column: String,
    pub photo_column: String,
    pub group_column: Option<String>,
    pub barcode_column: String,
}

impl Roster {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn key<'a>(&self, record: &'a StudentRecord) -> &'a str {
        record.get(&self.key_column).unwrap_or_default()
    }

    pub fn photo_value<'a>(&self, record: &'a StudentRecord) -> &'a str {
        record.get(&self.photo_column).unwrap_or_default()
    }

    pub fn barcode_value<'a>(&self, record: &'a StudentRecord) -> &'a str {
        record.get(&self.barcode_column).unwrap_or_default()
    }

    pub fn group_value<'a>(&self, record: &'a StudentRecord) -> Option<&'a str> {
        self.group_column
            .as_deref()
            .and_then(|column| record.get(column))
            .filter(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Front,
    Back,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Front, Side::Back];

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Front => "front",
            Side::Back => "back",
        }
    }
}

/// An image on disk that belongs to a student.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoAsset {
    pub path: PathBuf,
    /// Top-level subdirectory of the images root holding the file, e.g. the year.
    pub group: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoMatch {
    Found(PhotoAsset),
    NotFound,
    Ambiguous(Vec<PathBuf>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchWarningKind {
    EmptyPhotoValue,
    NotFound { lookup: String },
    Ambiguous { lookup: String, candidates: Vec<PathBuf> },
    Unreadable { path: PathBuf, reason: String },
    /// The key cell is empty; the card is named after its row instead.
    EmptyKey { file: String },
    /// Another card already took this key's file name.
    Renamed { file: String },
    BarcodeUnavailable { value: String, reason: String },
}

/// Non-fatal per-record problem. The batch keeps going.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchWarning {
    pub card: String,
    pub row: usize,
    #[serde(flatten)]
    pub kind: MatchWarningKind,
}

impl fmt::Display for MatchWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "card '{}' (row {}): ", self.card, self.row)?;
        match &self.kind {
            MatchWarningKind::EmptyPhotoValue => write!(f, "photo cell is empty"),
            MatchWarningKind::NotFound { lookup } => write!(f, "no photo named '{}'", lookup),
            MatchWarningKind::Ambiguous { lookup, candidates } => write!(
                f,
                "{} photos named '{}': {}",
                candidates.len(),
                lookup,
                candidates
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            MatchWarningKind::Unreadable { path, reason } => {
                write!(f, "cannot read photo {}: {}", path.display(), reason)
            }
            MatchWarningKind::EmptyKey { file } => {
                write!(f, "key cell is empty, written as '{}'", file)
            }
            MatchWarningKind::Renamed { file } => {
                write!(f, "file name already used, written as '{}'", file)
            }
            MatchWarningKind::BarcodeUnavailable { value, reason } => {
                write!(f, "no barcode for '{}': {}", value, reason)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PhotoStatus {
    Embedded { path: PathBuf },
    Missing,
}

#[derive(Debug, Clone)]
pub struct RenderedCard {
    pub key: String,
    pub file_stem: String,
    pub front: String,
    pub back: String,
    pub photo: PhotoStatus,
}

impl RenderedCard {
    pub fn side(&self, side: Side) -> &str {
        match side {
            Side::Front => &self.front,
            Side::Back => &self.back,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TransformResult {
    pub cards: Vec<RenderedCard>,
    pub skipped: Vec<String>,
    pub warnings: Vec<MatchWarning>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CardEntry {
    pub key: String,
    pub file: String,
    pub front: String,
    pub back: String,
    pub photo: PhotoStatus,
}

/// Outcome of one batch; also written out as `manifest.json`.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub generated_at: String,
    pub output_dir: PathBuf,
    pub cards: Vec<CardEntry>,
    pub skipped: Vec<String>,
    pub warnings: Vec<MatchWarning>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> StudentRecord {
        let headers: Arc<[String]> = vec!["First".to_string(), "ID Number".to_string()].into();
        StudentRecord::new(2, headers, vec!["Alice".to_string(), "001".to_string()])
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("ID Number"), "id_number");
        assert_eq!(normalize_key("  id-number "), "id_number");
        assert_eq!(normalize_key("Photo  __ Number"), "photo_number");
        assert_eq!(normalize_key("_name"), "name");
        assert_eq!(normalize_key("NAME"), "name");
    }

    #[test]
    fn test_record_lookup_by_exact_and_normalized_name() {
        let rec = record();
        assert_eq!(rec.get("First"), Some("Alice"));
        assert_eq!(rec.get("first"), Some("Alice"));
        assert_eq!(rec.get("id_number"), Some("001"));
        assert_eq!(rec.get("Last"), None);
        assert_eq!(rec.iter().count(), 2);
    }

    #[test]
    fn test_match_warning_display() {
        let warning = MatchWarning {
            card: "002".to_string(),
            row: 3,
            kind: MatchWarningKind::NotFound {
                lookup: "Bob".to_string(),
            },
        };
        assert_eq!(warning.to_string(), "card '002' (row 3): no photo named 'Bob'");

        let warning = MatchWarning {
            card: "Alice".to_string(),
            row: 3,
            kind: MatchWarningKind::Renamed {
                file: "Alice-3".to_string(),
            },
        };
        assert_eq!(
            warning.to_string(),
            "card 'Alice' (row 3): file name already used, written as 'Alice-3'"
        );
    }
}
