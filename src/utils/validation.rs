use crate::utils::error::{IdGenError, Result};
use std::collections::HashSet;
use std::path::Path;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &Path) -> Result<()> {
    let raw = path.to_string_lossy();
    if raw.is_empty() {
        return Err(IdGenError::ArgumentError {
            field: field_name.to_string(),
            message: "Path cannot be empty".to_string(),
        });
    }

    if raw.contains('\0') {
        return Err(IdGenError::ArgumentError {
            field: field_name.to_string(),
            message: format!("Path contains null bytes: {}", raw),
        });
    }

    Ok(())
}

pub fn validate_existing_dir(field_name: &str, path: &Path) -> Result<()> {
    validate_path(field_name, path)?;
    if !path.is_dir() {
        return Err(IdGenError::ArgumentError {
            field: field_name.to_string(),
            message: format!("{} does not exist or is not a directory", path.display()),
        });
    }
    Ok(())
}

pub fn validate_existing_file(field_name: &str, path: &Path) -> Result<()> {
    validate_path(field_name, path)?;
    if !path.is_file() {
        return Err(IdGenError::ArgumentError {
            field: field_name.to_string(),
            message: format!("{} does not exist or is not a file", path.display()),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(IdGenError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_file_extensions(
    field_name: &str,
    files: &[&str],
    allowed_extensions: &[&str],
) -> Result<()> {
    let allowed_set: HashSet<&str> = allowed_extensions.iter().copied().collect();

    for file in files {
        let extension = Path::new(file)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension {
            Some(ext) if allowed_set.contains(ext.as_str()) => {}
            Some(ext) => {
                return Err(IdGenError::InvalidConfigValueError {
                    field: field_name.to_string(),
                    value: file.to_string(),
                    reason: format!(
                        "Unsupported file extension: {}. Allowed extensions: {}",
                        ext,
                        allowed_extensions.join(", ")
                    ),
                });
            }
            None => {
                return Err(IdGenError::InvalidConfigValueError {
                    field: field_name.to_string(),
                    value: file.to_string(),
                    reason: "File has no extension or invalid filename".to_string(),
                });
            }
        }
    }

    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    // NaN compares false both ways, so test for the accepted interval.
    if !(value >= min && value <= max) {
        return Err(IdGenError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}
