use crate::domain::ports::Storage;
use crate::utils::error::{IdGenError, Result};
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

pub const TMP_DIR: &str = "tmp";

/// File name (without extension) used for a card: the key with anything outside
/// `[A-Za-z0-9._-]` replaced by `_`.
pub fn card_file_stem(key: &str) -> String {
    let stem: String = key
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    // A leading dot would hide the file; "." and ".." would escape the directory.
    if stem.starts_with('.') {
        format!("_{}", &stem[1..])
    } else {
        stem
    }
}

/// Hands out card file stems that stay distinct on case-insensitive filesystems.
#[derive(Debug, Default)]
pub struct FileStems {
    taken: HashSet<String>,
}

impl FileStems {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stem for the card on roster line `row`. An empty key becomes `row-<row>`; a stem
    /// already handed out gets `-<row>` appended (then `-2`, `-3`, ... if even that is taken).
    pub fn claim(&mut self, key: &str, row: usize) -> String {
        let base = match card_file_stem(key) {
            stem if stem.is_empty() => format!("row-{}", row),
            stem => stem,
        };
        if self.taken.insert(base.to_lowercase()) {
            return base;
        }

        let with_row = format!("{}-{}", base, row);
        let mut candidate = with_row.clone();
        let mut n = 2;
        while !self.taken.insert(candidate.to_lowercase()) {
            candidate = format!("{}-{}", with_row, n);
            n += 1;
        }
        candidate
    }
}

/// Output directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    create_missing: bool,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            create_missing: false,
        }
    }

    pub fn with_create_missing(mut self, create_missing: bool) -> Self {
        self.create_missing = create_missing;
        self
    }
}

impl Storage for LocalStorage {
    fn ensure_ready(&self) -> Result<()> {
        let tmp = self.base_path.join(TMP_DIR);
        if tmp.is_dir() {
            return Ok(());
        }

        if self.create_missing {
            tracing::debug!("{} does not exist. Creating it...", tmp.display());
            fs::create_dir_all(&tmp)?;
            return Ok(());
        }

        let missing = if self.base_path.is_dir() {
            tmp
        } else {
            self.base_path.clone()
        };
        Err(IdGenError::OutputDirError { path: missing })
    }

    fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        // Parents are never created here; ensure_ready owns the directory layout.
        fs::write(self.resolve(path), data)?;
        Ok(())
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.base_path.join(path)
    }
}
