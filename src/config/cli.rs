use crate::config::toml_config::CardConfig;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{IdGenError, Result};
use crate::utils::validation::{
    validate_existing_dir, validate_existing_file, validate_path, Validate,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "id-gen", version)]
#[command(about = "Bulk generates student IDs from a template, csv data file, and images")]
pub struct CliConfig {
    /// The path to the template SVG directory
    #[arg(long)]
    pub template: PathBuf,

    /// The path to the CSV data file
    #[arg(long)]
    pub data: PathBuf,

    /// The path to the directory of student photo images (optionally with year subdirectories)
    #[arg(long)]
    pub images: PathBuf,

    /// The path to the desired output directory. Note: fails if the directory (or its tmp
    /// subdirectory) does not already exist, unless --create-out is given
    #[arg(long, default_value = "./id_gen_out")]
    pub out: PathBuf,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,

    /// Optional TOML file with card settings (columns, derived fields, barcode)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Create the output directory and its tmp subdirectory when missing
    #[arg(long)]
    pub create_out: bool,

    /// Emit log lines as JSON
    #[arg(long)]
    pub log_json: bool,

    #[arg(skip)]
    #[serde(skip)]
    pub card: CardConfig,
}

impl CliConfig {
    /// Loads `--config` into `self.card`. Without the flag the defaults stay in place.
    pub fn load_card_config(&mut self) -> Result<()> {
        if let Some(path) = &self.config {
            validate_existing_file("config", path)?;
            self.card = CardConfig::from_file(path)?;
            tracing::debug!("Card config loaded from {}: {:?}", path.display(), self.card);
        }
        Ok(())
    }
}

impl ConfigProvider for CliConfig {
    fn template_dir(&self) -> &Path {
        &self.template
    }

    fn data_path(&self) -> &Path {
        &self.data
    }

    fn images_dir(&self) -> &Path {
        &self.images
    }

    fn output_dir(&self) -> &Path {
        &self.out
    }

    fn card(&self) -> &CardConfig {
        &self.card
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        // A missing roster or template set belongs to the stage that reads it.
        if !self.template.is_dir() {
            return Err(IdGenError::template(
                &self.template,
                "template directory does not exist",
            ));
        }
        if !self.data.is_file() {
            return Err(IdGenError::data(format!(
                "roster {} does not exist",
                self.data.display()
            )));
        }
        validate_existing_dir("images", &self.images)?;
        // Existence of --out is checked by the output storage, as an IO error.
        validate_path("out", &self.out)?;
        self.card.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::ErrorCategory;
    use tempfile::TempDir;

    #[test]
    fn test_parse_required_and_default_arguments() {
        let config = CliConfig::try_parse_from([
            "id-gen",
            "--template",
            "templates",
            "--data",
            "students.csv",
            "--images",
            "photos",
        ])
        .unwrap();

        assert_eq!(config.template, PathBuf::from("templates"));
        assert_eq!(config.out, PathBuf::from("./id_gen_out"));
        assert!(!config.debug);
        assert!(!config.create_out);
        assert!(config.config.is_none());
        assert_eq!(config.card, CardConfig::default());
    }

    #[test]
    fn test_missing_required_argument_is_rejected() {
        let err = CliConfig::try_parse_from(["id-gen", "--template", "t", "--data", "d.csv"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_validate_reports_missing_paths() {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("students.csv");
        std::fs::write(&data, "name,id\n").unwrap();

        let mut config = CliConfig::try_parse_from([
            "id-gen",
            "--template",
            dir.path().to_str().unwrap(),
            "--data",
            data.to_str().unwrap(),
            "--images",
            dir.path().join("photos").to_str().unwrap(),
            "--debug",
        ])
        .unwrap();

        let err = config.validate().unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Argument);
        assert!(matches!(err, IdGenError::ArgumentError { ref field, .. } if field == "images"));

        config.images = dir.path().to_path_buf();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_roster_and_templates_keep_their_categories() {
        let dir = TempDir::new().unwrap();
        let mut config = CliConfig::try_parse_from([
            "id-gen",
            "--template",
            dir.path().to_str().unwrap(),
            "--data",
            dir.path().join("students.csv").to_str().unwrap(),
            "--images",
            dir.path().to_str().unwrap(),
        ])
        .unwrap();

        let err = config.validate().unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Data);
        assert_eq!(err.exit_code(), 1);

        config.template = dir.path().join("templates");
        let err = config.validate().unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Template);
    }

    #[test]
    fn test_load_card_config() {
        let dir = TempDir::new().unwrap();
        let card = dir.path().join("card.toml");
        std::fs::write(&card, "[roster]\nkey_column = \"ID Number\"\n").unwrap();

        let mut config = CliConfig::try_parse_from([
            "id-gen",
            "--template",
            "t",
            "--data",
            "d.csv",
            "--images",
            "i",
            "--config",
            card.to_str().unwrap(),
        ])
        .unwrap();

        config.load_card_config().unwrap();
        assert_eq!(config.card.roster.key_column.as_deref(), Some("ID Number"));
    }
}
