//! Rewrites raw CAD rows into a canonical schema.
//!
//! Per target field the first hit wins:
//!
//! 1. the caller's explicit mapping, if its source column holds a value
//! 2. the alias candidates for the detected CAD system, each tried with an
//!    exact key and then a folded key (case, spaces and dashes ignored);
//!    an alias hit for `address` that holds a point is skipped
//! 3. for CentralSquare dates and times, the combined `reported_dt` column
//!
//! Fields that resolve to nothing are left out of the output record.

use crate::core::alias_table::AliasTable;
use crate::core::classifier::normalize_column;
use crate::core::coordinates::parse_combined;
use crate::core::timestamp::normalize_value;
use crate::domain::model::{CadSystem, CanonicalField, Record, UserMapping};
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;

/// Where a canonical field's value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSource {
    UserMapping(String),
    Alias(String),
    /// Date or time half of the CentralSquare `reported_dt` column.
    ReportedDateTime(String),
}

impl FieldSource {
    pub fn column(&self) -> &str {
        match self {
            Self::UserMapping(c) | Self::Alias(c) | Self::ReportedDateTime(c) => c,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FieldMapper {
    aliases: AliasTable,
}

fn has_value(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}

/// Exact key lookup, then a folded one that ignores case and treats spaces
/// and dashes as `_`.
struct KeyIndex<'r> {
    record: &'r Record,
    folded: HashMap<String, &'r str>,
}

impl<'r> KeyIndex<'r> {
    fn new(record: &'r Record) -> Self {
        let mut keys: Vec<&str> = record.columns().collect();
        // 折疊後同名時取字典序最前者，確保結果穩定
        keys.sort_unstable();
        let mut folded = HashMap::with_capacity(keys.len());
        for key in keys {
            folded.entry(normalize_column(key)).or_insert(key);
        }
        Self { record, folded }
    }

    fn find(&self, name: &str) -> Option<(&'r str, &'r Value)> {
        if let Some((key, value)) = self.record.data.get_key_value(name) {
            if has_value(value) {
                return Some((key.as_str(), value));
            }
        }
        let key = *self.folded.get(&normalize_column(name))?;
        let value = self.record.data.get(key)?;
        has_value(value).then_some((key, value))
    }
}

impl FieldMapper {
    pub fn new(aliases: AliasTable) -> Self {
        Self { aliases }
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    /// Maps every record into `target_schema`. User-mapped targets that are
    /// not in the schema are carried through as well.
    ///
    /// Input records are left untouched; the output holds copies.
    pub fn map_fields(
        &self,
        records: &[Record],
        user_mapping: &UserMapping,
        system: CadSystem,
        target_schema: &[String],
    ) -> Vec<Record> {
        let targets = Self::target_fields(user_mapping, target_schema);

        let mapped: Vec<Record> = records
            .iter()
            .map(|record| self.map_record(record, user_mapping, system, &targets))
            .collect();

        let resolved: usize = mapped.iter().map(|r| r.data.len()).sum();
        tracing::debug!(
            "🔄 Mapped {} records as '{}': {} of {} target fields resolved",
            mapped.len(),
            system,
            resolved,
            targets.len() * mapped.len()
        );

        mapped
    }

    fn target_fields<'a>(user_mapping: &'a UserMapping, target_schema: &'a [String]) -> Vec<&'a str> {
        let mut targets: Vec<&str> = target_schema.iter().map(String::as_str).collect();
        let mut extra: Vec<&str> = user_mapping
            .keys()
            .map(String::as_str)
            .filter(|k| !targets.contains(k))
            .collect();
        extra.sort_unstable();
        targets.extend(extra);
        targets
    }

    /// Maps a single record onto `targets`.
    pub fn map_record(
        &self,
        record: &Record,
        user_mapping: &UserMapping,
        system: CadSystem,
        targets: &[&str],
    ) -> Record {
        let index = KeyIndex::new(record);
        let mut out = Record::new();

        for target in targets {
            match self.resolve(&index, user_mapping, system, target) {
                Some((_, value)) => {
                    out.insert(*target, coerce(target, value));
                }
                None => tracing::trace!("Field '{}' unresolved", target),
            }
        }

        out
    }

    /// Reports which column would feed `target`, without building a record.
    pub fn resolve_source_key(
        &self,
        record: &Record,
        user_mapping: &UserMapping,
        system: CadSystem,
        target: &str,
    ) -> Option<FieldSource> {
        let index = KeyIndex::new(record);
        self.resolve(&index, user_mapping, system, target)
            .map(|(source, _)| source)
    }

    fn resolve(
        &self,
        index: &KeyIndex<'_>,
        user_mapping: &UserMapping,
        system: CadSystem,
        target: &str,
    ) -> Option<(FieldSource, Value)> {
        if let Some(source_key) = user_mapping.get(target) {
            if let Some((key, value)) = index.find(source_key) {
                return Some((FieldSource::UserMapping(key.to_string()), value.clone()));
            }
            tracing::debug!(
                "Mapped column '{}' for '{}' is missing or empty, falling back to aliases",
                source_key,
                target
            );
        }

        for candidate in self.aliases.candidates(system, target) {
            if let Some((key, value)) = index.find(candidate) {
                if !fits_target(target, value) {
                    tracing::trace!("Skipping '{}' for '{}', value is not an address", key, target);
                    continue;
                }
                return Some((FieldSource::Alias(key.to_string()), value.clone()));
            }
        }

        if system == CadSystem::CentralSquare {
            return reported_dt_component(index, target);
        }

        None
    }
}

fn reported_dt_component(index: &KeyIndex<'_>, target: &str) -> Option<(FieldSource, Value)> {
    let want_date = target == CanonicalField::IncidentDate.as_str();
    let want_time = target == CanonicalField::IncidentTime.as_str();
    if !want_date && !want_time {
        return None;
    }

    let (key, raw) = index.find("reported_dt")?;
    let normalized = normalize_value(raw)?;
    let part = if want_date {
        normalized.date
    } else {
        normalized.time
    };
    Some((FieldSource::ReportedDateTime(key.to_string()), Value::String(part)))
}

/// `location` columns often hold a point rather than a street address.
fn fits_target(target: &str, value: &Value) -> bool {
    if target != CanonicalField::Address.as_str() {
        return true;
    }
    matches!(value, Value::String(_)) && parse_combined(value).is_none()
}

/// Coordinates become numbers when they parse; otherwise the raw value stays
/// for the caller to re-validate.
fn coerce(target: &str, value: Value) -> Value {
    if !CanonicalField::from_str(target).is_ok_and(CanonicalField::is_coordinate) {
        return value;
    }
    if let Value::String(s) = &value {
        if let Some(n) = s.trim().parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
            return Value::Number(n);
        }
    }
    value
}
