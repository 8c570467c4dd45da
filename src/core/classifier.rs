//! CAD system detection.
//!
//! Looks at the column names of a batch and guesses which vendor export
//! produced it. Signature sets overlap between vendors, so the predicates are
//! tested in a fixed order and the first match wins.

use crate::domain::model::{CadSystem, Record};
use std::collections::HashSet;

struct Signature {
    system: CadSystem,
    matches: fn(&HashSet<String>) -> bool,
}

const SIGNATURES: &[Signature] = &[
    Signature {
        system: CadSystem::Motorola,
        matches: is_motorola,
    },
    Signature {
        system: CadSystem::Tyler,
        matches: is_tyler,
    },
    Signature {
        system: CadSystem::Hexagon,
        matches: is_hexagon,
    },
    Signature {
        system: CadSystem::CentralSquare,
        matches: is_centralsquare,
    },
];

fn has_any(columns: &HashSet<String>, names: &[&str]) -> bool {
    names.iter().any(|n| columns.contains(*n))
}

fn has_all(columns: &HashSet<String>, names: &[&str]) -> bool {
    names.iter().all(|n| columns.contains(*n))
}

fn is_motorola(columns: &HashSet<String>) -> bool {
    has_any(columns, &["callid", "call_id", "inc_no", "call_received_time"])
        || has_all(columns, &["dispatch_time", "en_route_time"])
}

fn is_tyler(columns: &HashSet<String>) -> bool {
    has_any(columns, &["incident_number", "num"]) && has_all(columns, &["call_type", "call_time"])
}

fn is_hexagon(columns: &HashSet<String>) -> bool {
    has_any(columns, &["event_number", "event_id", "event_time"])
}

fn is_centralsquare(columns: &HashSet<String>) -> bool {
    has_any(columns, &["nature", "cfs_number", "reported_dt", "call_number"])
}

/// Lower-cases a column name and folds spaces and dashes to `_`, so that
/// `Call Type`, `call-type` and `CALL_TYPE` compare equal.
pub(crate) fn normalize_column(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

/// Classifies a batch from its column names. Returns
/// [`CadSystem::Generic`] when nothing matches, including for no columns.
pub fn classify<I, S>(columns: I) -> CadSystem
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let columns: HashSet<String> = columns
        .into_iter()
        .map(|c| normalize_column(c.as_ref()))
        .collect();

    if columns.is_empty() {
        tracing::debug!("No columns to classify, using generic");
        return CadSystem::Generic;
    }

    let system = SIGNATURES
        .iter()
        .find(|sig| (sig.matches)(&columns))
        .map_or(CadSystem::Generic, |sig| sig.system);

    tracing::debug!("Detected CAD system '{}' from {} columns", system, columns.len());
    system
}

pub fn classify_record(record: &Record) -> CadSystem {
    classify(record.columns())
}

/// Accepts either a batch (array, first element is sampled) or a single
/// record object. Anything else is `Generic`.
pub fn classify_value(value: &serde_json::Value) -> CadSystem {
    match value {
        serde_json::Value::Array(items) => match items.first() {
            Some(serde_json::Value::Object(obj)) => classify(obj.keys()),
            Some(serde_json::Value::Array(columns)) => {
                classify(columns.iter().filter_map(|c| c.as_str()))
            }
            Some(serde_json::Value::String(_)) => {
                classify(items.iter().filter_map(|c| c.as_str()))
            }
            _ => CadSystem::Generic,
        },
        serde_json::Value::Object(obj) => classify(obj.keys()),
        _ => CadSystem::Generic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_motorola_signatures() {
        assert_eq!(classify(["CALL_ID", "ADDRESS"]), CadSystem::Motorola);
        assert_eq!(classify(["CallID"]), CadSystem::Motorola);
        assert_eq!(classify(["INC_NO"]), CadSystem::Motorola);
        assert_eq!(classify(["CALL_RECEIVED_TIME"]), CadSystem::Motorola);
        assert_eq!(
            classify(["dispatch_time", "en_route_time"]),
            CadSystem::Motorola
        );
    }

    #[test]
    fn test_tyler_needs_all_three_parts() {
        assert_eq!(
            classify(["Incident Number", "Call Type", "Call Time"]),
            CadSystem::Tyler
        );
        assert_eq!(classify(["Num", "call_type", "call_time"]), CadSystem::Tyler);
        assert_eq!(classify(["incident_number", "call_type"]), CadSystem::Generic);
    }

    #[test]
    fn test_hexagon_signatures() {
        assert_eq!(classify(["EVENT_NUMBER", "TYCOD"]), CadSystem::Hexagon);
        assert_eq!(classify(["event_time"]), CadSystem::Hexagon);
    }

    #[test]
    fn test_centralsquare_signatures() {
        assert_eq!(classify(["CFS_NUMBER", "NATURE"]), CadSystem::CentralSquare);
        assert_eq!(classify(["REPORTED_DT"]), CadSystem::CentralSquare);
    }

    #[test]
    fn test_table_order_breaks_ties() {
        // nature is a CentralSquare signature, but event_number matches Hexagon first
        assert_eq!(classify(["event_number", "nature"]), CadSystem::Hexagon);
        assert_eq!(classify(["call_id", "event_id"]), CadSystem::Motorola);
    }

    #[test]
    fn test_unknown_columns_are_generic() {
        assert_eq!(classify(["date", "lat", "lng"]), CadSystem::Generic);
        assert_eq!(classify(Vec::<String>::new()), CadSystem::Generic);
    }

    #[test]
    fn test_classify_value_shapes() {
        assert_eq!(
            classify_value(&json!([{"EVENT_ID": 1}, {"CALL_ID": 2}])),
            CadSystem::Hexagon
        );
        assert_eq!(classify_value(&json!({"cfs_number": "1"})), CadSystem::CentralSquare);
        assert_eq!(classify_value(&json!(["CALL_ID", "LAT"])), CadSystem::Motorola);
        assert_eq!(classify_value(&json!([])), CadSystem::Generic);
        assert_eq!(classify_value(&json!("CALL_ID")), CadSystem::Generic);
        assert_eq!(classify_value(&serde_json::Value::Null), CadSystem::Generic);
    }
}
