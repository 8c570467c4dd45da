use crate::config::INPUT_EXTENSIONS;
use crate::core::alias_table::AliasTable;
use crate::core::ConfigProvider;
use crate::domain::model::{CadSystem, CanonicalField, ToolId, UserMapping};
use crate::utils::error::{FormatterError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub job: JobConfig,
    pub source: SourceConfig,
    pub format: FormatConfig,
    pub load: LoadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// 本地檔案或 http(s) URL
    pub input: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatConfig {
    #[serde(deserialize_with = "from_str_field")]
    pub tool: ToolId,
    #[serde(default, deserialize_with = "from_str_opt")]
    pub cad_system: Option<CadSystem>,
    /// 目標欄位 -> 來源欄位
    #[serde(default)]
    pub field_mapping: UserMapping,
    /// 系統名稱 -> 標準欄位 -> 額外別名
    #[serde(default)]
    pub aliases: HashMap<String, HashMap<String, Vec<String>>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub output_path: String,
    pub output_formats: Vec<String>,
    pub filename: Option<String>,
}

/// Vendor and tool names go through `FromStr` so the same spellings work in
/// the config file and on the command line.
fn from_str_field<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let raw = String::deserialize(deserializer)?;
    T::from_str(raw.trim()).map_err(|e| serde::de::Error::custom(format!("'{}': {}", raw, e)))
}

fn from_str_opt<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() || raw.trim().eq_ignore_ascii_case("auto") => Ok(None),
        Some(raw) => T::from_str(raw.trim())
            .map(Some)
            .map_err(|e| serde::de::Error::custom(format!("'{}': {}", raw, e))),
    }
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(FormatterError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| FormatterError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${DATA_URL})，未設定的保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| FormatterError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// Builds the alias table from `[format.aliases.<system>]`.
    pub fn alias_table(&self) -> Result<AliasTable> {
        let mut table = AliasTable::new();

        for (system_name, fields) in &self.format.aliases {
            let system = CadSystem::from_str(system_name).map_err(|_| {
                FormatterError::InvalidConfigValueError {
                    field: "format.aliases".to_string(),
                    value: system_name.clone(),
                    reason: "Unknown CAD system".to_string(),
                }
            })?;

            for (field_name, columns) in fields {
                let field = CanonicalField::from_str(field_name).map_err(|_| {
                    FormatterError::InvalidConfigValueError {
                        field: format!("format.aliases.{}", system_name),
                        value: field_name.clone(),
                        reason: "Unknown canonical field".to_string(),
                    }
                })?;
                table.add_aliases(system, field, columns.iter().cloned());
            }
        }

        Ok(table)
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("job.name", &self.job.name)?;
        validation::validate_source("source.input", &self.source.input, INPUT_EXTENSIONS)?;
        validation::validate_path("load.output_path", &self.load.output_path)?;
        validation::validate_output_formats("load.output_formats", &self.load.output_formats)?;

        if let Some(filename) = &self.load.filename {
            validation::validate_file_extensions("load.filename", &[filename.clone()], &["zip"])?;
        }

        for (target, source) in &self.format.field_mapping {
            validation::validate_non_empty_string("format.field_mapping", target)?;
            validation::validate_non_empty_string(&format!("format.field_mapping.{}", target), source)?;
        }

        self.alias_table()?;
        Ok(())
    }
}

impl ConfigProvider for TomlConfig {
    fn input(&self) -> &str {
        &self.source.input
    }

    fn output_path(&self) -> &str {
        &self.load.output_path
    }

    fn tool(&self) -> ToolId {
        self.format.tool
    }

    fn cad_system(&self) -> Option<CadSystem> {
        self.format.cad_system
    }

    fn field_mapping(&self) -> &UserMapping {
        &self.format.field_mapping
    }

    fn output_formats(&self) -> &[String] {
        &self.load.output_formats
    }

    fn output_filename(&self) -> &str {
        self.load.filename.as_deref().unwrap_or("formatted_output.zip")
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BASIC: &str = r#"
[job]
name = "station-12-response"

[source]
input = "./exports/calls.csv"

[format]
tool = "response-time"
cad_system = "PremierOne"

[format.field_mapping]
incident_type = "Final Disposition"

[format.aliases.motorola]
station = ["FIRE_STA", "STA_NO"]

[load]
output_path = "./test-output"
output_formats = ["csv", "json"]
"#;

    #[test]
    fn test_parse_basic_toml_config() {
        let config = TomlConfig::from_toml_str(BASIC).unwrap();

        assert_eq!(config.job.name, "station-12-response");
        assert_eq!(config.input(), "./exports/calls.csv");
        assert_eq!(config.tool(), ToolId::ResponseTime);
        assert_eq!(config.cad_system(), Some(CadSystem::Motorola));
        assert_eq!(
            config.field_mapping().get("incident_type").map(String::as_str),
            Some("Final Disposition")
        );
        assert_eq!(config.output_filename(), "formatted_output.zip");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_alias_table_from_config() {
        let config = TomlConfig::from_toml_str(BASIC).unwrap();
        let table = config.alias_table().unwrap();

        let candidates = table.candidates(CadSystem::Motorola, "station");
        assert_eq!(&candidates[..3], &["station", "FIRE_STA", "STA_NO"]);
    }

    #[test]
    fn test_auto_cad_system_means_detect() {
        let toml_content = BASIC.replace("cad_system = \"PremierOne\"", "cad_system = \"auto\"");
        let config = TomlConfig::from_toml_str(&toml_content).unwrap();
        assert_eq!(config.cad_system(), None);
    }

    #[test]
    fn test_unknown_tool_fails_to_parse() {
        let toml_content = BASIC.replace("response-time", "heat-map");
        let err = TomlConfig::from_toml_str(&toml_content).unwrap_err();
        assert!(err.to_string().contains("heat-map"));
    }

    #[test]
    fn test_unknown_alias_field_fails_validation() {
        let toml_content = BASIC.replace("station = [", "firehouse = [");
        let config = TomlConfig::from_toml_str(&toml_content).unwrap();
        assert!(config.alias_table().is_err());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("TEST_CAD_EXPORT_URL", "https://data.example.gov/calls.json");

        let toml_content = BASIC.replace("./exports/calls.csv", "${TEST_CAD_EXPORT_URL}");
        let config = TomlConfig::from_toml_str(&toml_content).unwrap();
        assert_eq!(config.input(), "https://data.example.gov/calls.json");
        assert!(config.validate().is_ok());

        std::env::remove_var("TEST_CAD_EXPORT_URL");
    }

    #[test]
    fn test_config_validation() {
        let toml_content = BASIC.replace("[\"csv\", \"json\"]", "[\"csv\", \"xlsx\"]");
        let config = TomlConfig::from_toml_str(&toml_content).unwrap();
        assert!(config.validate().is_err());

        let toml_content = BASIC.replace("./exports/calls.csv", "./exports/calls.pdf");
        let config = TomlConfig::from_toml_str(&toml_content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(BASIC.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.job.name, "station-12-response");
    }
}
