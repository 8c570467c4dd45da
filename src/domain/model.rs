use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::EnumIter;
use strum_macros::{AsRefStr, Display, EnumString, IntoStaticStr};

/// 一筆資料列：上傳時為原始欄位，格式化後為標準欄位
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    pub data: HashMap<String, serde_json::Value>,
}

/// Row as it arrived from the CAD export.
pub type RawRecord = Record;
/// Row rewritten into the target tool's schema.
pub type CanonicalRecord = Record;

/// 使用者指定的對應：目標欄位 -> 來源欄位
pub type UserMapping = HashMap<String, String>;

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, I>(pairs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, serde_json::Value)>,
    {
        Self {
            data: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.as_str())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.data.insert(key.into(), value);
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for Record {
    fn from(obj: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            data: obj.into_iter().collect(),
        }
    }
}

/// CAD vendor whose export conventions a batch follows.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum CadSystem {
    /// Motorola PremierOne
    #[strum(to_string = "motorola", serialize = "premierone")]
    Motorola,
    /// Tyler New World
    #[strum(to_string = "tyler", serialize = "newworld")]
    Tyler,
    /// Hexagon (formerly Intergraph)
    #[strum(to_string = "hexagon", serialize = "intergraph")]
    Hexagon,
    #[strum(to_string = "centralsquare")]
    CentralSquare,
    #[default]
    #[strum(to_string = "generic")]
    Generic,
}

/// Fields the downstream tools know how to consume.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    IntoStaticStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CanonicalField {
    IncidentId,
    IncidentDate,
    IncidentTime,
    DispatchTime,
    EnRouteTime,
    ArrivalTime,
    ClearTime,
    Latitude,
    Longitude,
    IncidentType,
    Priority,
    Address,
    City,
    State,
    ZipCode,
    Unit,
    Station,
}

impl CanonicalField {
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    pub fn is_coordinate(self) -> bool {
        matches!(self, Self::Latitude | Self::Longitude)
    }
}

/// Dashboard tool a formatted batch is destined for.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum ToolId {
    ResponseTime,
    CallDensity,
    IsochroneStations,
    FireMapPro,
    IncidentLogger,
    CoverageGap,
}

/// 缺少必要欄位的紀錄，另外輸出供人工檢查
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncompleteRecord {
    pub row: usize,
    pub missing: Vec<CanonicalField>,
    pub record: Record,
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub cad_system: CadSystem,
    pub tool: ToolId,
    /// Output column order shared by the CSV and TSV renderings.
    pub columns: Vec<String>,
    pub processed_records: Vec<Record>,
    pub csv_output: String,
    pub tsv_output: String,
    pub incomplete_records: Vec<IncompleteRecord>,
}
