pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::CardConfig;

pub use adapters::storage::LocalStorage;
pub use crate::core::{etl::BatchEngine, pipeline::CardPipeline};
pub use utils::error::{IdGenError, Result};
