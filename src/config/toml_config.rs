use crate::utils::error::{IdGenError, Result};
use crate::utils::validation::{
    validate_file_extensions, validate_non_empty_string, validate_range, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

/// Card layout settings, usually read from `--config card.toml`.
/// Every section is optional; `CardConfig::default()` is what runs without a file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CardConfig {
    #[serde(default)]
    pub templates: TemplateFiles,
    #[serde(default)]
    pub roster: RosterConfig,
    /// Derived placeholders, e.g. `name = "{First} {Last}"`.
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    #[serde(default)]
    pub render: RenderConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemplateFiles {
    pub front: String,
    pub back: String,
}

impl Default for TemplateFiles {
    fn default() -> Self {
        Self {
            front: "front.svg".to_string(),
            back: "back.svg".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RosterConfig {
    /// Column naming the output files; the first column when unset.
    pub key_column: Option<String>,
    /// Column looked up in the images directory; the key column when unset.
    pub photo_column: Option<String>,
    /// Column naming the preferred images subdirectory (e.g. the class year).
    pub group_column: Option<String>,
    /// Column encoded into the `barcode` placeholder; the key column when unset.
    pub barcode_column: Option<String>,
    pub skip_without_photo: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingFieldPolicy {
    #[default]
    Error,
    Blank,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    pub missing_field: MissingFieldPolicy,
    pub card_width: f64,
    pub card_height: f64,
    pub barcode: BarcodeConfig,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            missing_field: MissingFieldPolicy::Error,
            card_width: 323.0,
            card_height: 204.0,
            barcode: BarcodeConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BarcodeConfig {
    pub module_width: f64,
    pub height: f64,
    /// Blank modules on each side of the symbol.
    pub quiet_zone: u32,
}

impl Default for BarcodeConfig {
    fn default() -> Self {
        Self {
            module_width: 1.0,
            height: 50.0,
            quiet_zone: 10,
        }
    }
}

impl CardConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| IdGenError::ConfigError {
            message: format!("cannot read {}: {}", path.as_ref().display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| IdGenError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables stay as written.
    fn substitute_env_vars(content: &str) -> String {
        static ENV_VAR: OnceLock<Regex> = OnceLock::new();
        let re = ENV_VAR.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("valid regex"));

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }
}

impl Validate for CardConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("templates.front", &self.templates.front)?;
        validate_non_empty_string("templates.back", &self.templates.back)?;
        validate_file_extensions(
            "templates",
            &[self.templates.front.as_str(), self.templates.back.as_str()],
            &["svg"],
        )?;

        let columns = [
            ("roster.key_column", &self.roster.key_column),
            ("roster.photo_column", &self.roster.photo_column),
            ("roster.group_column", &self.roster.group_column),
            ("roster.barcode_column", &self.roster.barcode_column),
        ];
        for (field, column) in columns {
            if let Some(column) = column {
                validate_non_empty_string(field, column)?;
            }
        }

        for (name, pattern) in &self.fields {
            validate_non_empty_string("fields", name)?;
            if matches!(name.trim().to_ascii_lowercase().as_str(), "photo" | "barcode") {
                return Err(IdGenError::InvalidConfigValueError {
                    field: format!("fields.{}", name),
                    value: pattern.clone(),
                    reason: "'photo' and 'barcode' are reserved placeholder names".to_string(),
                });
            }
        }

        validate_range("render.card_width", self.render.card_width, 1.0, 100_000.0)?;
        validate_range("render.card_height", self.render.card_height, 1.0, 100_000.0)?;
        validate_range(
            "render.barcode.module_width",
            self.render.barcode.module_width,
            0.01,
            100.0,
        )?;
        validate_range("render.barcode.height", self.render.barcode.height, 0.01, 10_000.0)?;
        validate_range("render.barcode.quiet_zone", self.render.barcode.quiet_zone, 0, 1_000)?;
        Ok(())
    }
}
