use crate::config::toml_config::CardConfig;
use crate::domain::model::{BatchReport, Roster, TransformResult};
use crate::utils::error::Result;
use std::path::{Path, PathBuf};

/// Where rendered cards end up. Paths are relative to the storage root.
pub trait Storage {
    /// Fails before anything is written when the root or its `tmp` directory is unusable.
    fn ensure_ready(&self) -> Result<()>;
    fn write_file(&self, path: &str, data: &[u8]) -> Result<()>;
    fn resolve(&self, path: &str) -> PathBuf;
}

pub trait ConfigProvider {
    fn template_dir(&self) -> &Path;
    fn data_path(&self) -> &Path;
    fn images_dir(&self) -> &Path;
    fn output_dir(&self) -> &Path;
    fn card(&self) -> &CardConfig;
}

pub trait Pipeline {
    /// Inputs loaded once per batch (templates, photo index).
    type Prepared;

    fn prepare(&self) -> Result<Self::Prepared>;
    fn extract(&self) -> Result<Roster>;
    fn transform(&self, prepared: &Self::Prepared, roster: Roster) -> Result<TransformResult>;
    fn load(&self, result: TransformResult) -> Result<BatchReport>;
}
