use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IdGenError {
    #[error("Invalid argument '{field}': {message}")]
    ArgumentError { field: String, message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid config value for '{field}' ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Roster error: {message}")]
    DataError { message: String },

    #[error("Template error ({}): {message}", .path.display())]
    TemplateError { path: PathBuf, message: String },

    #[error("Output directory {} does not exist", .path.display())]
    OutputDirError { path: PathBuf },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Render error for card '{card}': {message}")]
    RenderError { card: String, message: String },

    #[error("Unknown placeholder {placeholder} in {}", .template.display())]
    UnknownPlaceholder {
        placeholder: String,
        template: PathBuf,
    },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Argument,
    Config,
    Data,
    Template,
    Io,
    Render,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl IdGenError {
    pub fn data(message: impl Into<String>) -> Self {
        Self::DataError {
            message: message.into(),
        }
    }

    pub fn render(card: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RenderError {
            card: card.into(),
            message: message.into(),
        }
    }

    pub fn template(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::TemplateError {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ArgumentError { .. } => ErrorCategory::Argument,
            Self::ConfigError { .. } | Self::InvalidConfigValueError { .. } => {
                ErrorCategory::Config
            }
            Self::CsvError(_) | Self::DataError { .. } => ErrorCategory::Data,
            Self::TemplateError { .. } => ErrorCategory::Template,
            Self::OutputDirError { .. } | Self::IoError(_) | Self::SerializationError(_) => {
                ErrorCategory::Io
            }
            Self::RenderError { .. } | Self::UnknownPlaceholder { .. } => ErrorCategory::Render,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Argument | ErrorCategory::Config => ErrorSeverity::Medium,
            ErrorCategory::Data | ErrorCategory::Template | ErrorCategory::Render => {
                ErrorSeverity::High
            }
            ErrorCategory::Io => ErrorSeverity::Critical,
        }
    }

    /// Process exit code for a fatal error. Argument problems share clap's usage code.
    pub fn exit_code(&self) -> i32 {
        match self.category() {
            ErrorCategory::Argument | ErrorCategory::Config => 2,
            _ => 1,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            Self::ArgumentError { field, .. } => {
                format!("Check the value passed to --{}", field.replace('_', "-"))
            }
            Self::ConfigError { .. } | Self::InvalidConfigValueError { .. } => {
                "Fix the card configuration file and run again".to_string()
            }
            Self::CsvError(_) | Self::DataError { .. } => {
                "Make sure the roster is UTF-8 CSV with a header row and the same number of columns on every row".to_string()
            }
            Self::TemplateError { .. } => {
                "The template directory must contain the front and back SVG files".to_string()
            }
            Self::OutputDirError { path } => format!(
                "Create {} and its tmp subdirectory, or pass --create-out",
                path.display()
            ),
            Self::IoError(_) | Self::SerializationError(_) => {
                "Check file permissions and free disk space".to_string()
            }
            Self::RenderError { .. } | Self::UnknownPlaceholder { .. } => {
                "Add the missing column to the roster, or set render.missing_field = \"blank\"".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Argument => format!("Invalid arguments: {}", self),
            ErrorCategory::Config => format!("Invalid card configuration: {}", self),
            ErrorCategory::Data => format!("Could not read the roster: {}", self),
            ErrorCategory::Template => format!("Could not load the templates: {}", self),
            ErrorCategory::Io => format!("Could not write the output: {}", self),
            ErrorCategory::Render => format!("Could not render the cards: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, IdGenError>;
