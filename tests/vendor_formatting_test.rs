use incident_formatter::core::timestamp::normalize_timestamp;
use incident_formatter::core::{classify, classify_value, FieldMapper};
use incident_formatter::{CadSystem, DataFormatter, Record, ToolId, UserMapping};
use serde_json::{json, Value};

fn records(value: Value) -> Vec<Record> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(obj) => Record::from(obj),
                other => panic!("fixture rows must be objects, got {other}"),
            })
            .collect(),
        other => panic!("fixture must be an array, got {other}"),
    }
}

fn motorola_fixture() -> Vec<Record> {
    records(json!([{
        "CALL_ID": "P1-2024-0001",
        "CALL_RECEIVED_TIME": "2024-04-15T14:30:00",
        "CALL_TYPE": "CARDIAC ARREST",
        "DISPATCH_TIME": "2024-04-15T14:31:00",
        "EN_ROUTE_TIME": "2024-04-15T14:32:00",
        "ARRIVAL_TIME": "2024-04-15T14:38:00",
        "PRIMARY_UNIT": "M12",
        "LATITUDE": "41.8781",
        "LONGITUDE": "-87.6298"
    }]))
}

fn tyler_fixture() -> Vec<Record> {
    records(json!([{
        "Incident Number": "NW24-77",
        "Call Type": "VEHICLE FIRE",
        "Call Date": "4/15/24",
        "Call Time": "2:30 PM",
        "Dispatched": "2:31 PM",
        "Arrived": "2:39 PM",
        "Unit": "E7"
    }]))
}

fn hexagon_fixture() -> Vec<Record> {
    records(json!([{
        "EVENT_NUMBER": "HX-5501",
        "TYCOD": "ALARM",
        "AD_TS": 1713191400000_i64,
        "DS_TS": "04/15/2024 14:31:00",
        "AR_TS": "04/15/2024 14:35:00",
        "Y_CORD": "29.7604",
        "X_CORD": "-95.3698"
    }]))
}

fn centralsquare_fixture() -> Vec<Record> {
    records(json!([{
        "CFS_NUMBER": "CS-31",
        "NATURE": "SMOKE INVESTIGATION",
        "REPORTED_DT": "04/15/2024 14:30:00",
        "DISPATCHED_DT": "04/15/2024 14:32:00",
        "ARRIVED_DT": "04/15/2024 14:40:00",
        "UNIT_NUMBER": "L3"
    }]))
}

#[test]
fn test_each_vendor_fixture_is_classified() {
    let cases = [
        (motorola_fixture(), CadSystem::Motorola),
        (tyler_fixture(), CadSystem::Tyler),
        (hexagon_fixture(), CadSystem::Hexagon),
        (centralsquare_fixture(), CadSystem::CentralSquare),
    ];
    let formatter = DataFormatter::default();
    for (rows, expected) in cases {
        assert_eq!(formatter.detect_system(&rows), expected);
    }
}

#[test]
fn test_unmatched_columns_are_generic() {
    assert_eq!(classify(["when", "what", "where"]), CadSystem::Generic);
    assert_eq!(classify_value(&json!([])), CadSystem::Generic);
}

#[test]
fn test_each_vendor_yields_response_times() {
    let formatter = DataFormatter::default();
    let mapping = UserMapping::new();
    let cases = [
        (motorola_fixture(), "2024-04-15", "14:30:00", 420),
        (tyler_fixture(), "2024-04-15", "14:30:00", 480),
        (centralsquare_fixture(), "2024-04-15", "14:30:00", 480),
    ];

    for (rows, date, time, seconds) in cases {
        let outcome = formatter.format(&rows, ToolId::ResponseTime, &mapping);
        let record = &outcome.records[0];
        assert_eq!(record.get_str("incident_date"), Some(date), "{}", outcome.cad_system);
        assert_eq!(record.get_str("incident_time"), Some(time), "{}", outcome.cad_system);
        assert_eq!(
            record.get("response_time_seconds"),
            Some(&json!(seconds)),
            "{}",
            outcome.cad_system
        );
        assert!(outcome.incomplete.is_empty(), "{}", outcome.cad_system);
    }
}

#[test]
fn test_hexagon_epoch_and_coordinates() {
    let formatter = DataFormatter::default();
    let outcome = formatter.format(&hexagon_fixture(), ToolId::IsochroneStations, &UserMapping::new());
    let record = &outcome.records[0];

    // 1713191400000 ms = 2024-04-15 14:30:00 UTC
    assert_eq!(record.get_str("incident_date"), Some("2024-04-15"));
    assert_eq!(record.get_str("incident_time"), Some("14:30:00"));
    assert_eq!(record.get("latitude"), Some(&json!(29.7604)));
    assert_eq!(record.get("longitude"), Some(&json!(-95.3698)));
    assert_eq!(record.get_str("arrival_time"), Some("04/15/2024 14:35:00"));
}

#[test]
fn test_user_mapping_overrides_vendor_alias() {
    let formatter = DataFormatter::default();
    let mut mapping = UserMapping::new();
    mapping.insert("unit".to_string(), "PRIMARY_UNIT".to_string());
    mapping.insert("incident_type".to_string(), "NOT_IN_EXPORT".to_string());

    let outcome = formatter.format(&motorola_fixture(), ToolId::IncidentLogger, &mapping);

    assert_eq!(outcome.records[0].get_str("unit"), Some("M12"));
    // missing mapped column falls back to the CALL_TYPE alias
    assert_eq!(outcome.records[0].get_str("incident_type"), Some("CARDIAC ARREST"));
}

#[test]
fn test_mapping_is_idempotent_on_canonical_output() {
    let mapper = FieldMapper::default();
    let schema = ToolId::ResponseTime.target_schema();
    let rows = motorola_fixture();

    let once = mapper.map_fields(&rows, &UserMapping::new(), CadSystem::Motorola, &schema);
    let twice = mapper.map_fields(&once, &UserMapping::new(), CadSystem::Generic, &schema);

    assert_eq!(once, twice);
    assert!(twice[0].columns().all(|c| schema.iter().any(|s| s == c)));
}

#[test]
fn test_timestamp_properties() {
    for raw in ["2024-04-15T14:30:00", "2024-04-15 14:30:00"] {
        let normalized = normalize_timestamp(raw).unwrap();
        assert_eq!(normalized.date, "2024-04-15");
        assert_eq!(normalized.time, "14:30:00");
    }
    assert!(normalize_timestamp("not-a-date").is_none());
    assert!(normalize_timestamp("").is_none());
}
