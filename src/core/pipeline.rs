use crate::core::alias_table::AliasTable;
use crate::core::field_mapper::FieldMapper;
use crate::core::formatter::DataFormatter;
use crate::core::tools::RESPONSE_TIME_FIELD;
use crate::core::{ConfigProvider, Pipeline, Record, Storage, TransformResult};
use crate::domain::model::{ToolId, UserMapping};
use crate::utils::error::{FormatterError, Result};
use crate::utils::validation::is_remote_source;
use reqwest::Client;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

/// 輸入檔案格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    Tsv,
    Json,
}

impl InputFormat {
    /// 依副檔名判斷，URL 會先去掉 query string
    pub fn from_source(source: &str) -> Option<Self> {
        let path = source.split(['?', '#']).next().unwrap_or(source);
        let extension = path.rsplit_once('.')?.1.to_ascii_lowercase();
        match extension.as_str() {
            "csv" => Some(Self::Csv),
            "tsv" | "tab" => Some(Self::Tsv),
            "json" | "geojson" => Some(Self::Json),
            _ => None,
        }
    }

    /// 無法從名稱判斷時看內容
    pub fn sniff(content: &[u8]) -> Self {
        let content = strip_bom(content);
        match content.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'[') | Some(b'{') => Self::Json,
            _ => {
                let first_line = content.split(|b| *b == b'\n').next().unwrap_or_default();
                if first_line.contains(&b'\t') {
                    Self::Tsv
                } else {
                    Self::Csv
                }
            }
        }
    }
}

fn strip_bom(content: &[u8]) -> &[u8] {
    content.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(content)
}

/// Parses delimited text. Every cell becomes a JSON string.
pub fn parse_delimited(content: &[u8], delimiter: u8) -> Result<Vec<Record>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(strip_bom(content));

    let headers = reader.headers()?.clone();
    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        records.push(Record::from_pairs(
            headers
                .iter()
                .zip(row.iter())
                .map(|(h, v)| (h, Value::String(v.to_string()))),
        ));
    }
    Ok(records)
}

/// Accepts an array of objects, a single object, or an object that wraps the
/// rows in `records`, `data` or `features`.
pub fn parse_json(content: &[u8]) -> Result<Vec<Record>> {
    let value: Value = serde_json::from_slice(strip_bom(content))?;
    records_from_value(value)
}

fn records_from_value(value: Value) -> Result<Vec<Record>> {
    match value {
        Value::Array(items) => {
            let total = items.len();
            let records: Vec<Record> = items.into_iter().filter_map(record_from_item).collect();
            if records.len() < total {
                tracing::warn!("Skipped {} non-object rows", total - records.len());
            }
            Ok(records)
        }
        Value::Object(mut obj) => {
            for key in ["records", "data", "features"] {
                if matches!(obj.get(key), Some(Value::Array(_))) {
                    if let Some(inner) = obj.remove(key) {
                        tracing::debug!("Reading rows from '{}' array", key);
                        return records_from_value(inner);
                    }
                }
            }
            Ok(vec![Record::from(obj)])
        }
        other => Err(FormatterError::InputFormatError {
            message: format!("expected JSON array or object, got {}", json_kind(&other)),
        }),
    }
}

/// GeoJSON features are flattened: their properties become columns and the
/// geometry is kept under `geometry`.
fn record_from_item(item: Value) -> Option<Record> {
    let Value::Object(mut obj) = item else {
        return None;
    };
    if obj.get("type").and_then(Value::as_str) == Some("Feature") {
        let mut record = match obj.remove("properties") {
            Some(Value::Object(props)) => Record::from(props),
            _ => Record::new(),
        };
        if let Some(geometry) = obj.remove("geometry") {
            record.insert("geometry", geometry);
        }
        return Some(record);
    }
    Some(Record::from(obj))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Output columns: the tool's schema, derived fields, then user-mapped
/// fields outside the schema in name order.
pub fn output_columns(tool: ToolId, user_mapping: &UserMapping) -> Vec<String> {
    let mut columns = tool.target_schema();
    if tool == ToolId::ResponseTime {
        columns.push(RESPONSE_TIME_FIELD.to_string());
    }
    let mut extra: Vec<String> = user_mapping
        .keys()
        .filter(|k| !columns.contains(k))
        .cloned()
        .collect();
    extra.sort_unstable();
    columns.extend(extra);
    columns
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

pub fn render_delimited(records: &[Record], columns: &[String], delimiter: u8) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());

    writer.write_record(columns)?;
    for record in records {
        writer.write_record(columns.iter().map(|c| cell(record.get(c))))?;
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    String::from_utf8(bytes).map_err(|e| FormatterError::ProcessingError {
        message: format!("rendered output is not UTF-8: {}", e),
    })
}

/// 依欄位順序輸出 JSON，避免 HashMap 順序不定
fn ordered_rows(records: &[Record]) -> Vec<BTreeMap<&str, &Value>> {
    records
        .iter()
        .map(|r| r.data.iter().map(|(k, v)| (k.as_str(), v)).collect())
        .collect()
}

pub struct FormatterPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    client: Client,
    formatter: DataFormatter,
}

impl<S: Storage, C: ConfigProvider> FormatterPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        let formatter = Self::build_formatter(&config, AliasTable::default());
        Self {
            storage,
            config,
            client: Client::new(),
            formatter,
        }
    }

    /// Replaces the alias table, e.g. with site-specific columns from a
    /// config file.
    pub fn with_aliases(mut self, aliases: AliasTable) -> Self {
        self.formatter = Self::build_formatter(&self.config, aliases);
        self
    }

    pub fn formatter(&self) -> &DataFormatter {
        &self.formatter
    }

    pub fn config(&self) -> &C {
        &self.config
    }

    fn build_formatter(config: &C, aliases: AliasTable) -> DataFormatter {
        let formatter = DataFormatter::new(FieldMapper::new(aliases));
        match config.cad_system() {
            Some(system) => formatter.with_cad_system(system),
            None => formatter,
        }
    }

    async fn fetch(&self, url: &str) -> Result<(Vec<u8>, Option<InputFormat>)> {
        tracing::debug!("Making request to: {}", url);
        let response = self.client.get(url).send().await?.error_for_status()?;
        tracing::debug!("Response status: {}", response.status());

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let format = if content_type.contains("json") {
            Some(InputFormat::Json)
        } else if content_type.contains("tab-separated") {
            Some(InputFormat::Tsv)
        } else if content_type.contains("csv") {
            Some(InputFormat::Csv)
        } else {
            None
        };

        Ok((response.bytes().await?.to_vec(), format))
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for FormatterPipeline<S, C> {
    async fn extract(&self) -> Result<Vec<Record>> {
        let input = self.config.input();

        let (content, hinted) = if is_remote_source(input) {
            self.fetch(input).await?
        } else {
            tracing::debug!("Reading input file: {}", input);
            (self.storage.read_file(input).await?, None)
        };

        let format = InputFormat::from_source(input)
            .or(hinted)
            .unwrap_or_else(|| InputFormat::sniff(&content));
        tracing::debug!("Parsing {} bytes as {:?}", content.len(), format);

        let records = match format {
            InputFormat::Csv => parse_delimited(&content, b',')?,
            InputFormat::Tsv => parse_delimited(&content, b'\t')?,
            InputFormat::Json => parse_json(&content)?,
        };

        if records.is_empty() {
            tracing::warn!("⚠️ Input '{}' contains no records", input);
        }
        Ok(records)
    }

    async fn transform(&self, data: Vec<Record>) -> Result<TransformResult> {
        let tool = self.config.tool();
        let mapping = self.config.field_mapping();

        let outcome = self.formatter.format(&data, tool, mapping);
        tracing::info!(
            "🔎 Formatting {} records from '{}' for '{}'",
            outcome.records.len(),
            outcome.cad_system,
            tool
        );

        let columns = output_columns(tool, mapping);
        let csv_output = render_delimited(&outcome.records, &columns, b',')?;
        let tsv_output = render_delimited(&outcome.records, &columns, b'\t')?;
        let incomplete_records = outcome.incomplete_records();

        Ok(TransformResult {
            cad_system: outcome.cad_system,
            tool,
            columns,
            processed_records: outcome.records,
            csv_output,
            tsv_output,
            incomplete_records,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let output_path = format!(
            "{}/{}",
            self.config.output_path().trim_end_matches('/'),
            self.config.output_filename()
        );

        let zip_data = {
            let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

            for format in self.config.output_formats() {
                match format.as_str() {
                    "csv" => {
                        zip.start_file::<_, ()>("formatted.csv", FileOptions::default())?;
                        zip.write_all(result.csv_output.as_bytes())?;
                    }
                    "tsv" => {
                        zip.start_file::<_, ()>("formatted.tsv", FileOptions::default())?;
                        zip.write_all(result.tsv_output.as_bytes())?;
                    }
                    "json" => {
                        zip.start_file::<_, ()>("formatted.json", FileOptions::default())?;
                        let json_data =
                            serde_json::to_string_pretty(&ordered_rows(&result.processed_records))?;
                        zip.write_all(json_data.as_bytes())?;
                    }
                    other => tracing::warn!("Skipping unsupported output format '{}'", other),
                }
            }

            // 缺欄位的紀錄另存一份
            if !result.incomplete_records.is_empty() {
                zip.start_file::<_, ()>("incomplete.json", FileOptions::default())?;
                let json_data = serde_json::to_string_pretty(&result.incomplete_records)?;
                zip.write_all(json_data.as_bytes())?;
            }

            let summary = serde_json::json!({
                "cad_system": result.cad_system,
                "tool": result.tool,
                "columns": result.columns,
                "record_count": result.processed_records.len(),
                "incomplete_count": result.incomplete_records.len(),
                "generated_at": chrono::Utc::now().to_rfc3339(),
            });
            zip.start_file::<_, ()>("summary.json", FileOptions::default())?;
            zip.write_all(serde_json::to_string_pretty(&summary)?.as_bytes())?;

            let cursor = zip.finish()?;
            cursor.into_inner()
        };

        tracing::debug!("Writing ZIP file ({} bytes) to {}", zip_data.len(), output_path);
        self.storage.write_file(&output_path, &zip_data).await?;

        Ok(output_path)
    }
}
