pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use config::{cli::LocalStorage, toml_config::TomlConfig};
#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use core::{etl::FormatEngine, formatter::DataFormatter, pipeline::FormatterPipeline};
pub use domain::model::{CadSystem, CanonicalField, Record, ToolId, UserMapping};
pub use utils::error::{FormatterError, Result};
