//! Entry point that ties classification, field mapping and the per-tool
//! post-processing together.

use crate::core::classifier::classify_record;
use crate::core::field_mapper::{FieldMapper, FieldSource};
use crate::domain::model::{
    CadSystem, CanonicalField, IncompleteRecord, Record, ToolId, UserMapping,
};
use serde_json::Value;

/// Result of formatting one batch.
#[derive(Debug, Clone)]
pub struct FormatOutcome {
    pub cad_system: CadSystem,
    pub tool: ToolId,
    pub records: Vec<Record>,
    /// 缺少必要欄位的紀錄索引與缺少的欄位
    pub incomplete: Vec<(usize, Vec<CanonicalField>)>,
}

impl FormatOutcome {
    pub fn incomplete_records(&self) -> Vec<IncompleteRecord> {
        self.incomplete
            .iter()
            .filter_map(|(row, missing)| {
                Some(IncompleteRecord {
                    row: *row,
                    missing: missing.clone(),
                    record: self.records.get(*row)?.clone(),
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct DataFormatter {
    mapper: FieldMapper,
    cad_system: Option<CadSystem>,
}

impl DataFormatter {
    pub fn new(mapper: FieldMapper) -> Self {
        Self {
            mapper,
            cad_system: None,
        }
    }

    /// Skips detection and treats every batch as `system`.
    pub fn with_cad_system(mut self, system: CadSystem) -> Self {
        self.cad_system = Some(system);
        self
    }

    pub fn mapper(&self) -> &FieldMapper {
        &self.mapper
    }

    /// Classifies from the first record unless a system was forced.
    pub fn detect_system(&self, records: &[Record]) -> CadSystem {
        if let Some(system) = self.cad_system {
            return system;
        }
        records
            .first()
            .map_or(CadSystem::Generic, classify_record)
    }

    pub fn format(&self, records: &[Record], tool: ToolId, user_mapping: &UserMapping) -> FormatOutcome {
        let cad_system = self.detect_system(records);
        let schema = tool.target_schema();

        let mut formatted = self
            .mapper
            .map_fields(records, user_mapping, cad_system, &schema);

        let mut incomplete = Vec::new();
        for (index, (record, raw)) in formatted.iter_mut().zip(records).enumerate() {
            tool.post_process(record, raw);
            let missing = tool.missing_fields(record);
            if !missing.is_empty() {
                tracing::trace!("Record {} is missing {:?}", index, missing);
                incomplete.push((index, missing));
            }
        }

        if !incomplete.is_empty() {
            tracing::warn!(
                "⚠️ {} of {} records lack fields required by '{}'",
                incomplete.len(),
                formatted.len(),
                tool
            );
        }

        FormatOutcome {
            cad_system,
            tool,
            records: formatted,
            incomplete,
        }
    }

    /// JSON in, JSON out. Anything other than an array of objects is
    /// returned unchanged.
    pub fn format_value(&self, value: &Value, tool: ToolId, user_mapping: &UserMapping) -> Value {
        let Value::Array(items) = value else {
            tracing::debug!("Input is not an array, returning it unchanged");
            return value.clone();
        };

        let mut records = Vec::with_capacity(items.len());
        for item in items {
            let Value::Object(obj) = item else {
                tracing::debug!("Array holds non-object items, returning it unchanged");
                return value.clone();
            };
            records.push(Record::from(obj.clone()));
        }

        let outcome = self.format(&records, tool, user_mapping);
        Value::Array(
            outcome
                .records
                .into_iter()
                .map(|r| Value::Object(r.data.into_iter().collect()))
                .collect(),
        )
    }

    /// Which source column each target field would come from for `sample`.
    pub fn mapping_plan(
        &self,
        sample: &Record,
        tool: ToolId,
        user_mapping: &UserMapping,
    ) -> Vec<(String, Option<FieldSource>)> {
        let system = self.detect_system(std::slice::from_ref(sample));
        let mut targets = tool.target_schema();
        let mut extra: Vec<String> = user_mapping
            .keys()
            .filter(|k| !targets.contains(k))
            .cloned()
            .collect();
        extra.sort_unstable();
        targets.extend(extra);

        targets
            .into_iter()
            .map(|target| {
                let source = self
                    .mapper
                    .resolve_source_key(sample, user_mapping, system, &target);
                (target, source)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn motorola_rows() -> Vec<Record> {
        vec![
            Record::from_pairs([
                ("CALL_ID", json!("24-1")),
                ("CALL_RECEIVED_TIME", json!("04/15/2024 14:30:00")),
                ("CALL_TYPE", json!("MEDICAL")),
                ("DISPATCH_TIME", json!("14:31:00")),
                ("ARRIVAL_TIME", json!("14:37:30")),
            ]),
            Record::from_pairs([("CALL_ID", json!("24-2")), ("CALL_TYPE", json!("FIRE"))]),
        ]
    }

    #[test]
    fn test_format_response_time_batch() {
        let formatter = DataFormatter::default();
        let outcome = formatter.format(&motorola_rows(), ToolId::ResponseTime, &UserMapping::new());

        assert_eq!(outcome.cad_system, CadSystem::Motorola);
        let first = &outcome.records[0];
        assert_eq!(first.get_str("incident_id"), Some("24-1"));
        assert_eq!(first.get_str("incident_date"), Some("2024-04-15"));
        assert_eq!(first.get_str("incident_time"), Some("14:30:00"));
        assert_eq!(first.get("response_time_seconds"), Some(&json!(390)));

        assert_eq!(outcome.incomplete.len(), 1);
        assert_eq!(outcome.incomplete[0].0, 1);
        let incomplete = outcome.incomplete_records();
        assert_eq!(incomplete[0].record.get_str("incident_id"), Some("24-2"));
        assert!(incomplete[0].missing.contains(&CanonicalField::DispatchTime));
    }

    #[test]
    fn test_forced_system_skips_detection() {
        let formatter = DataFormatter::default().with_cad_system(CadSystem::Generic);
        let outcome = formatter.format(&motorola_rows(), ToolId::IncidentLogger, &UserMapping::new());

        assert_eq!(outcome.cad_system, CadSystem::Generic);
        // call_id is also a generic alias
        assert_eq!(outcome.records[0].get_str("incident_id"), Some("24-1"));
    }

    #[test]
    fn test_empty_batch() {
        let formatter = DataFormatter::default();
        let outcome = formatter.format(&[], ToolId::CallDensity, &UserMapping::new());
        assert_eq!(outcome.cad_system, CadSystem::Generic);
        assert!(outcome.records.is_empty());
        assert!(outcome.incomplete.is_empty());
    }

    #[test]
    fn test_format_value_passes_through_non_arrays() {
        let formatter = DataFormatter::default();
        let mapping = UserMapping::new();

        let object = json!({"CALL_ID": "1"});
        assert_eq!(formatter.format_value(&object, ToolId::CallDensity, &mapping), object);

        let mixed = json!([{"CALL_ID": "1"}, 2]);
        assert_eq!(formatter.format_value(&mixed, ToolId::CallDensity, &mapping), mixed);

        assert_eq!(formatter.format_value(&Value::Null, ToolId::CallDensity, &mapping), Value::Null);
    }

    #[test]
    fn test_format_value_array() {
        let formatter = DataFormatter::default();
        let input = json!([{"EVENT_NUMBER": "E7", "LATITUDE": "33.45", "LONGITUDE": "-112.07"}]);

        let out = formatter.format_value(&input, ToolId::CallDensity, &UserMapping::new());

        assert_eq!(out[0]["incident_id"], json!("E7"));
        assert_eq!(out[0]["latitude"], json!(33.45));
        assert_eq!(out[0]["longitude"], json!(-112.07));
    }

    #[test]
    fn test_mapping_plan() {
        let formatter = DataFormatter::default();
        let rows = motorola_rows();
        let mut mapping = UserMapping::new();
        mapping.insert("shift".to_string(), "SHIFT".to_string());

        let plan = formatter.mapping_plan(&rows[0], ToolId::ResponseTime, &mapping);

        let lookup = |name: &str| plan.iter().find(|(t, _)| t == name).and_then(|(_, s)| s.clone());
        assert_eq!(lookup("incident_time"), Some(FieldSource::Alias("CALL_RECEIVED_TIME".into())));
        assert_eq!(lookup("station"), None);
        assert_eq!(plan.last().map(|(t, _)| t.as_str()), Some("shift"));
    }
}
