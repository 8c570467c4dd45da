//! Per-tool target schemas and the post-processing each tool needs after
//! field mapping.

use crate::core::coordinates::{discard_invalid_coordinates, recover_coordinates};
use crate::core::timestamp::{normalize_value, parse_time_of_day};
use crate::domain::model::{CanonicalField, Record, ToolId};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde_json::Value;

use CanonicalField::*;

const BASE_FIELDS: &[CanonicalField] = &[IncidentId, IncidentDate, IncidentTime, IncidentType];

/// Derived field added by the response-time tool.
pub const RESPONSE_TIME_FIELD: &str = "response_time_seconds";

impl ToolId {
    /// Tool-specific fields on top of the shared incident fields.
    fn extra_fields(self) -> &'static [CanonicalField] {
        match self {
            Self::ResponseTime => &[
                DispatchTime,
                EnRouteTime,
                ArrivalTime,
                ClearTime,
                Priority,
                Unit,
                Station,
                Address,
            ],
            Self::CallDensity => &[Latitude, Longitude, Address, Priority],
            Self::IsochroneStations => &[Latitude, Longitude, Station, Unit, ArrivalTime],
            Self::FireMapPro => &[Latitude, Longitude, Address, City, State, ZipCode],
            Self::IncidentLogger => &[
                Address,
                City,
                State,
                ZipCode,
                Priority,
                Unit,
                Station,
                DispatchTime,
                ArrivalTime,
                ClearTime,
            ],
            Self::CoverageGap => &[Latitude, Longitude, Station, DispatchTime, ArrivalTime],
        }
    }

    /// Fields the tool's output is built from, in column order.
    pub fn target_fields(self) -> Vec<CanonicalField> {
        BASE_FIELDS
            .iter()
            .chain(self.extra_fields())
            .copied()
            .collect()
    }

    pub fn target_schema(self) -> Vec<String> {
        self.target_fields()
            .into_iter()
            .map(|f| f.as_str().to_string())
            .collect()
    }

    /// A formatted record missing any of these is reported as incomplete.
    pub fn required_fields(self) -> &'static [CanonicalField] {
        match self {
            Self::ResponseTime => &[IncidentDate, DispatchTime, ArrivalTime],
            Self::CallDensity | Self::IsochroneStations | Self::FireMapPro | Self::CoverageGap => {
                &[Latitude, Longitude]
            }
            Self::IncidentLogger => &[IncidentId, IncidentDate],
        }
    }

    pub fn uses_coordinates(self) -> bool {
        self.target_fields().contains(&Latitude)
    }

    /// Runs the tool's finishing steps on a mapped record. `raw` is the
    /// source row the record was mapped from.
    pub fn post_process(self, record: &mut Record, raw: &Record) {
        backfill_timestamps(record);

        if self.uses_coordinates() {
            // 先丟掉 0 或非數值的座標，合併欄位才有機會補上
            discard_invalid_coordinates(record);
            if recover_coordinates(record, raw) {
                discard_invalid_coordinates(record);
            }
        }

        if self == Self::ResponseTime {
            if let Some(seconds) = response_time_seconds(record) {
                record.insert(RESPONSE_TIME_FIELD, Value::from(seconds));
            }
        }
    }

    pub fn missing_fields(self, record: &Record) -> Vec<CanonicalField> {
        self.required_fields()
            .iter()
            .filter(|f| !record.contains_key(f.as_str()))
            .copied()
            .collect()
    }
}

/// Splits combined date-time values so `incident_date` holds `YYYY-MM-DD`
/// and `incident_time` holds `HH:MM:SS`.
pub fn backfill_timestamps(record: &mut Record) {
    let date_key = IncidentDate.as_str();
    let time_key = IncidentTime.as_str();

    if let Some(value) = record.get(time_key).cloned() {
        if let Some(time) = value.as_str().and_then(parse_time_of_day) {
            record.insert(time_key, Value::String(time.format("%H:%M:%S").to_string()));
        } else if let Some(n) = normalize_value(&value) {
            if !record.contains_key(date_key) {
                record.insert(date_key, Value::String(n.date));
            }
            if has_time_component(&value) {
                record.insert(time_key, Value::String(n.time));
            } else {
                // 只有日期時時間視為未知
                record.data.remove(time_key);
            }
        }
    }

    if let Some(value) = record.get(date_key).cloned() {
        if let Some(n) = normalize_value(&value) {
            record.insert(date_key, Value::String(n.date));
            if has_time_component(&value) && !record.contains_key(time_key) {
                record.insert(time_key, Value::String(n.time));
            }
        }
    }
}

fn has_time_component(value: &Value) -> bool {
    match value {
        Value::String(s) => s.contains(':') || s.bytes().all(|b| b.is_ascii_digit()),
        Value::Number(_) => true,
        _ => false,
    }
}

/// Resolves a time value to an instant. Bare times of day are anchored on
/// `date`; the flag reports whether that happened.
fn resolve_instant(value: &Value, date: Option<NaiveDate>) -> Option<(NaiveDateTime, bool)> {
    if let Some(time) = value.as_str().and_then(parse_time_of_day) {
        return Some((date?.and_time(time), true));
    }
    normalize_value(value).map(|n| (n.timestamp, false))
}

/// Seconds from dispatch to arrival. A time-only arrival earlier than the
/// dispatch is taken to be after midnight.
pub fn response_time_seconds(record: &Record) -> Option<i64> {
    let date = record
        .get(IncidentDate.as_str())
        .and_then(normalize_value)
        .map(|n| n.timestamp.date());

    let (dispatched, _) = resolve_instant(record.get(DispatchTime.as_str())?, date)?;
    let (mut arrived, arrival_time_only) = resolve_instant(record.get(ArrivalTime.as_str())?, date)?;

    if arrived < dispatched && arrival_time_only {
        arrived += Duration::days(1);
    }

    let seconds = (arrived - dispatched).num_seconds();
    if seconds < 0 {
        tracing::debug!("Arrival before dispatch ({} s), skipping response time", seconds);
        return None;
    }
    Some(seconds)
}
