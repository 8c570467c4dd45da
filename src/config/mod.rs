pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use crate::core::ConfigProvider;
#[cfg(feature = "cli")]
use crate::domain::model::{CadSystem, ToolId, UserMapping};
#[cfg(feature = "cli")]
use crate::utils::error::{FormatterError, Result};
#[cfg(feature = "cli")]
use crate::utils::validation::{self, Validate};
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use serde::{Deserialize, Serialize};

/// 可接受的輸入副檔名
pub const INPUT_EXTENSIONS: &[&str] = &["csv", "tsv", "tab", "txt", "json", "geojson"];

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "incident-formatter")]
#[command(about = "Reformat CAD incident exports for the dashboard tools")]
pub struct CliConfig {
    /// Input file or http(s) URL (CSV, TSV or JSON)
    #[arg(long, short)]
    pub input: String,

    #[arg(long, default_value = "./output")]
    pub output_path: String,

    #[arg(long, default_value = "formatted_output.zip")]
    pub output_filename: String,

    /// Target tool, e.g. response-time or call-density
    #[arg(long, short)]
    pub tool: ToolId,

    /// Skip detection and treat the input as this CAD system
    #[arg(long)]
    pub cad_system: Option<CadSystem>,

    /// Explicit field mapping, repeatable: --map incident_type=NatureCode
    #[arg(long = "map", value_name = "TARGET=SOURCE", value_parser = parse_mapping)]
    pub mappings: Vec<(String, String)>,

    #[arg(long, value_delimiter = ',', default_value = "csv,tsv,json")]
    pub output_formats: Vec<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub log_json: bool,

    #[arg(skip)]
    #[serde(skip)]
    field_mapping: UserMapping,
}

/// Parses one `target=source` pair.
#[cfg(feature = "cli")]
pub fn parse_mapping(raw: &str) -> std::result::Result<(String, String), String> {
    let (target, source) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected TARGET=SOURCE, got '{}'", raw))?;
    let (target, source) = (target.trim(), source.trim());
    if target.is_empty() || source.is_empty() {
        return Err(format!("both sides of '{}' must be non-empty", raw));
    }
    Ok((target.to_string(), source.to_string()))
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// Parses process arguments and builds the field mapping.
    pub fn from_args() -> Self {
        Self::parse().with_resolved_mapping()
    }

    /// 後面出現的同名目標覆蓋前面的
    pub fn with_resolved_mapping(mut self) -> Self {
        self.field_mapping = self.mappings.iter().cloned().collect();
        self
    }
}

#[cfg(feature = "cli")]
impl ConfigProvider for CliConfig {
    fn input(&self) -> &str {
        &self.input
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn tool(&self) -> ToolId {
        self.tool
    }

    fn cad_system(&self) -> Option<CadSystem> {
        self.cad_system
    }

    fn field_mapping(&self) -> &UserMapping {
        &self.field_mapping
    }

    fn output_formats(&self) -> &[String] {
        &self.output_formats
    }

    fn output_filename(&self) -> &str {
        &self.output_filename
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_source("input", &self.input, INPUT_EXTENSIONS)?;
        validation::validate_path("output_path", &self.output_path)?;
        validation::validate_non_empty_string("output_filename", &self.output_filename)?;
        validation::validate_output_formats("output_formats", &self.output_formats)?;

        if self.field_mapping.is_empty() && !self.mappings.is_empty() {
            return Err(FormatterError::ConfigError {
                message: "field mappings were parsed but not resolved".to_string(),
            });
        }
        if self.field_mapping.len() < self.mappings.len() {
            tracing::warn!("⚠️ Some targets are mapped more than once, the last mapping wins");
        }

        Ok(())
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliConfig {
        let mut argv = vec!["incident-formatter"];
        argv.extend_from_slice(args);
        CliConfig::parse_from(argv).with_resolved_mapping()
    }

    #[test]
    fn test_parse_minimal_args() {
        let config = parse(&["--input", "calls.csv", "--tool", "response-time"]);

        assert_eq!(config.tool(), ToolId::ResponseTime);
        assert_eq!(config.cad_system(), None);
        assert_eq!(config.output_path(), "./output");
        assert_eq!(config.output_formats(), &["csv", "tsv", "json"]);
        assert_eq!(config.output_filename(), "formatted_output.zip");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_mappings_and_system() {
        let config = parse(&[
            "-i",
            "https://data.example.gov/calls.json",
            "-t",
            "call-density",
            "--cad-system",
            "newworld",
            "--map",
            "incident_type=Nature Code",
            "--map",
            "station = FIRE_STA",
            "--output-formats",
            "csv,json",
        ]);

        assert_eq!(config.cad_system(), Some(CadSystem::Tyler));
        assert_eq!(
            config.field_mapping().get("incident_type").map(String::as_str),
            Some("Nature Code")
        );
        assert_eq!(
            config.field_mapping().get("station").map(String::as_str),
            Some("FIRE_STA")
        );
        assert_eq!(config.output_formats(), &["csv", "json"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_mapping_rejects_malformed_pairs() {
        assert!(parse_mapping("incident_type").is_err());
        assert!(parse_mapping("=CALL_TYPE").is_err());
        assert!(parse_mapping("incident_type= ").is_err());
        assert_eq!(
            parse_mapping("unit=PRIMARY_UNIT").unwrap(),
            ("unit".to_string(), "PRIMARY_UNIT".to_string())
        );
    }

    #[test]
    fn test_unknown_tool_is_rejected() {
        let result = CliConfig::try_parse_from(["incident-formatter", "-i", "a.csv", "-t", "heatmap"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_failures() {
        let config = parse(&["-i", "calls.xlsx", "-t", "incident-logger"]);
        assert!(config.validate().is_err());

        let config = parse(&["-i", "calls.csv", "-t", "incident-logger", "--output-formats", "xml"]);
        assert!(config.validate().is_err());

        let config = parse(&["-i", "", "-t", "incident-logger"]);
        assert!(config.validate().is_err());
    }
}
