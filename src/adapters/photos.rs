use crate::domain::model::{PhotoAsset, PhotoMatch};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageFormat;
use std::collections::HashMap;
use std::path::Path;
use walkdir::WalkDir;

/// True for files whose extension names a raster image format.
pub fn is_photo_file(path: &Path) -> bool {
    path.extension()
        .and_then(ImageFormat::from_extension)
        .is_some()
}

/// Lookup key for a photo cell: lower-cased, with a trailing image extension dropped
/// so `Alice.JPG` and `alice` find the same file.
fn lookup_key(value: &str) -> String {
    let value = value.trim();
    let path = Path::new(value);
    let stem = if is_photo_file(path) {
        path.file_stem().and_then(|s| s.to_str()).unwrap_or(value)
    } else {
        value
    };
    stem.to_lowercase()
}

/// Every image under the images root, keyed by lower-cased file stem.
#[derive(Debug, Clone, Default)]
pub struct PhotoIndex {
    by_stem: HashMap<String, Vec<PhotoAsset>>,
    count: usize,
}

impl PhotoIndex {
    pub fn scan(root: &Path) -> Self {
        let mut index = Self::default();

        for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                    continue;
                }
            };
            if !entry.file_type().is_file() || !is_photo_file(entry.path()) {
                continue;
            }
            let Some(stem) = entry.path().file_stem().and_then(|s| s.to_str()) else {
                tracing::debug!("Skipping photo with non UTF-8 name: {}", entry.path().display());
                continue;
            };

            let group = entry.path().strip_prefix(root).ok().and_then(|relative| {
                let mut components = relative.components();
                let first = components.next()?;
                // Files directly under the root belong to no group.
                components.next()?;
                first.as_os_str().to_str().map(str::to_string)
            });

            index
                .by_stem
                .entry(stem.to_lowercase())
                .or_default()
                .push(PhotoAsset {
                    path: entry.path().to_path_buf(),
                    group,
                });
            index.count += 1;
        }

        tracing::debug!("Indexed {} photos under {}", index.count, root.display());
        index
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Finds the photo for `name`. When `group` is given and some candidates sit in a
    /// subdirectory of that name, only those are considered.
    pub fn lookup(&self, name: &str, group: Option<&str>) -> PhotoMatch {
        let candidates = match self.by_stem.get(&lookup_key(name)) {
            Some(candidates) => candidates,
            None => return PhotoMatch::NotFound,
        };

        let in_group: Vec<&PhotoAsset> = match group {
            Some(group) => candidates
                .iter()
                .filter(|asset| {
                    asset
                        .group
                        .as_deref()
                        .is_some_and(|g| g.to_lowercase() == group.trim().to_lowercase())
                })
                .collect(),
            None => Vec::new(),
        };
        let chosen: Vec<&PhotoAsset> = if in_group.is_empty() {
            candidates.iter().collect()
        } else {
            in_group
        };

        match chosen.as_slice() {
            [] => PhotoMatch::NotFound,
            [only] => PhotoMatch::Found((*only).clone()),
            many => PhotoMatch::Ambiguous(many.iter().map(|a| a.path.clone()).collect()),
        }
    }
}

/// Reads the photo and returns it as a `data:` URI. The MIME type comes from the
/// file contents, falling back to the extension.
pub fn embed_photo(asset: &PhotoAsset) -> std::io::Result<String> {
    let bytes = std::fs::read(&asset.path)?;
    let format = image::guess_format(&bytes)
        .ok()
        .or_else(|| ImageFormat::from_path(&asset.path).ok());
    let mime = format
        .map(|f| f.to_mime_type())
        .unwrap_or("application/octet-stream");
    Ok(format!("data:{};base64,{}", mime, STANDARD.encode(&bytes)))
}
