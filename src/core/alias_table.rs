//! Column alias tables, one per CAD vendor.
//!
//! For a given system and canonical field the candidate source columns are,
//! in order: the canonical name itself, any configured extra aliases, the
//! vendor's built-in aliases, then the generic built-in aliases. Including
//! the canonical name first keeps formatting idempotent on its own output.

use crate::domain::model::{CadSystem, CanonicalField};
use std::collections::HashMap;
use std::str::FromStr;

#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    extra: HashMap<(CadSystem, CanonicalField), Vec<String>>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers site-specific column names ahead of the built-in ones.
    pub fn add_aliases<I, S>(&mut self, system: CadSystem, field: CanonicalField, aliases: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra
            .entry((system, field))
            .or_default()
            .extend(aliases.into_iter().map(Into::into));
    }

    pub fn with_aliases<I, S>(mut self, system: CadSystem, field: CanonicalField, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_aliases(system, field, aliases);
        self
    }

    /// Ordered, de-duplicated source column candidates for `target`.
    ///
    /// Targets that are not a [`CanonicalField`] only match their own name.
    pub fn candidates<'a>(&'a self, system: CadSystem, target: &'a str) -> Vec<&'a str> {
        let mut out: Vec<&'a str> = vec![target];
        let Ok(field) = CanonicalField::from_str(target) else {
            return out;
        };

        let mut push = |alias: &'a str| {
            if !out.contains(&alias) {
                out.push(alias);
            }
        };

        let mut systems = vec![system];
        if system != CadSystem::Generic {
            systems.push(CadSystem::Generic);
        }

        for sys in systems {
            if let Some(extra) = self.extra.get(&(sys, field)) {
                for alias in extra {
                    push(alias.as_str());
                }
            }
            for alias in builtin_aliases(sys, field) {
                push(*alias);
            }
        }

        out
    }
}

/// Built-in aliases for one vendor. Does not include the canonical name.
pub fn builtin_aliases(system: CadSystem, field: CanonicalField) -> &'static [&'static str] {
    match system {
        CadSystem::Motorola => motorola_aliases(field),
        CadSystem::Tyler => tyler_aliases(field),
        CadSystem::Hexagon => hexagon_aliases(field),
        CadSystem::CentralSquare => centralsquare_aliases(field),
        CadSystem::Generic => generic_aliases(field),
    }
}

fn motorola_aliases(field: CanonicalField) -> &'static [&'static str] {
    use CanonicalField::*;
    match field {
        IncidentId => &["CALL_ID", "CallID", "INC_NO", "INCIDENT_NO", "MASTER_INCIDENT_NUMBER"],
        IncidentDate => &["CALL_DATE", "INCIDENT_DATE", "RESPONSE_DATE"],
        IncidentTime => &["Reported", "CALL_RECEIVED_TIME", "CALL_TIME", "TIME_PHONEPICKUP"],
        DispatchTime => &["DISPATCH_TIME", "TIME_FIRST_UNIT_ASSIGNED", "TIME_DISPATCHED"],
        EnRouteTime => &["EN_ROUTE_TIME", "TIME_FIRST_UNIT_ENROUTE", "TIME_ENROUTE"],
        ArrivalTime => &["ARRIVAL_TIME", "TIME_FIRST_UNIT_ARRIVED", "ON_SCENE_TIME"],
        ClearTime => &["CLEAR_TIME", "TIME_CALLCLOSED", "CLOSED_TIME"],
        Latitude => &["LATITUDE", "LAT", "Y_COORD"],
        Longitude => &["LONGITUDE", "LON", "LONG", "X_COORD"],
        IncidentType => &["CALL_TYPE", "PROBLEM", "INCIDENT_TYPE", "NATURE_CODE"],
        Priority => &["PRIORITY", "PRIORITY_NUMBER", "CALL_PRIORITY"],
        Address => &["ADDRESS", "LOCATION", "INCIDENT_ADDRESS"],
        City => &["CITY", "MUNICIPALITY"],
        State => &["STATE"],
        ZipCode => &["ZIP", "POSTAL_CODE"],
        Unit => &["UNIT_ID", "PRIMARY_UNIT", "RADIO_NAME"],
        Station => &["STATION", "STATION_ID", "FIRST_DUE"],
    }
}

fn tyler_aliases(field: CanonicalField) -> &'static [&'static str] {
    use CanonicalField::*;
    match field {
        IncidentId => &["Incident Number", "IncidentNumber", "incident_number", "Num", "CFS Number"],
        IncidentDate => &["Call Date", "call_date", "Create Date"],
        IncidentTime => &["Call Time", "call_time", "CallReceivedDateTime", "Create Time"],
        DispatchTime => &["Dispatched", "Dispatch Time", "dispatched_time", "DispatchDateTime"],
        EnRouteTime => &["Enroute", "En Route", "Responding", "EnrouteDateTime"],
        ArrivalTime => &["Arrived", "On Scene", "Onscene", "ArrivedDateTime"],
        ClearTime => &["Cleared", "Closed", "Call Closed", "ClosedDateTime"],
        Latitude => &["Latitude", "Lat", "YCoordinate"],
        Longitude => &["Longitude", "Long", "Lng", "XCoordinate"],
        IncidentType => &["Call Type", "call_type", "CallType", "Nature"],
        Priority => &["Priority", "Call Priority"],
        Address => &["Address", "Location", "Full Address"],
        City => &["City"],
        State => &["State"],
        ZipCode => &["Zip", "Zip Code"],
        Unit => &["Unit", "Primary Unit", "Units"],
        Station => &["Station", "Response Area"],
    }
}

fn hexagon_aliases(field: CanonicalField) -> &'static [&'static str] {
    use CanonicalField::*;
    match field {
        IncidentId => &["EVENT_NUMBER", "EVENT_ID", "EID", "NUM_1"],
        IncidentDate => &["EVENT_DATE", "AD_DATE"],
        IncidentTime => &["EVENT_TIME", "AD_TS", "CREATE_TIME"],
        DispatchTime => &["DS_TS", "DISPATCH_TS", "FIRST_DISPATCH"],
        EnRouteTime => &["EN_TS", "ENROUTE_TS"],
        ArrivalTime => &["AR_TS", "ARRIVE_TS", "ONSCENE_TS"],
        ClearTime => &["XDTS", "CLOSE_TS", "CLEAR_TS"],
        Latitude => &["LATITUDE", "Y_CORD", "YCOOR"],
        Longitude => &["LONGITUDE", "X_CORD", "XCOOR"],
        IncidentType => &["EVENT_TYPE", "TYCOD", "SUB_TYCOD", "TYPE_DESCRIPTION"],
        Priority => &["PRIORITY", "PRI"],
        Address => &["LOCATION", "ADDRESS", "ESTNUM_EDIRPRE_EFEANME"],
        City => &["CITY", "MUN"],
        State => &["STATE"],
        ZipCode => &["ZIP", "ZIP_CODE"],
        Unit => &["UNIT_ID", "UNID", "PRIMARY_UNIT"],
        Station => &["STATION", "DISTRICT", "BEAT"],
    }
}

fn centralsquare_aliases(field: CanonicalField) -> &'static [&'static str] {
    use CanonicalField::*;
    match field {
        IncidentId => &["CFS_NUMBER", "CALL_NUMBER", "CFSNumber", "IncidentNumber"],
        IncidentDate => &["REPORTED_DATE", "DATE_REPORTED"],
        IncidentTime => &["REPORTED_TIME", "TIME_REPORTED"],
        DispatchTime => &["DISPATCHED_DT", "DISPATCH_DT", "DISPATCHED"],
        EnRouteTime => &["ENROUTE_DT", "ENROUTE"],
        ArrivalTime => &["ARRIVED_DT", "ONSCENE_DT", "ARRIVED"],
        ClearTime => &["CLEARED_DT", "CLOSED_DT", "CLEARED"],
        Latitude => &["LATITUDE", "LAT"],
        Longitude => &["LONGITUDE", "LONG", "LON"],
        IncidentType => &["NATURE", "NatureOfCall", "CALL_NATURE", "NATURE_CODE"],
        Priority => &["PRIORITY", "CALL_PRIORITY"],
        Address => &["ADDRESS", "LOCATION", "STREET_ADDRESS"],
        City => &["CITY"],
        State => &["STATE"],
        ZipCode => &["ZIP", "ZIPCODE"],
        Unit => &["UNIT", "UNIT_NUMBER", "PRIMARY_UNIT"],
        Station => &["STATION", "ZONE", "RESPONSE_ZONE"],
    }
}

fn generic_aliases(field: CanonicalField) -> &'static [&'static str] {
    use CanonicalField::*;
    match field {
        IncidentId => &["Incident ID", "IncidentID", "incident_number", "Incident Number", "call_id", "event_number", "id"],
        IncidentDate => &["Incident Date", "date", "Date", "call_date"],
        IncidentTime => &["Incident Time", "time", "Time", "call_time", "Reported", "timestamp"],
        DispatchTime => &["Dispatch Time", "dispatched", "Dispatched"],
        EnRouteTime => &["En Route Time", "enroute", "Enroute", "en_route"],
        ArrivalTime => &["Arrival Time", "arrived", "On Scene", "on_scene_time", "onscene"],
        ClearTime => &["Clear Time", "cleared", "Cleared", "closed"],
        Latitude => &["lat", "Latitude", "y"],
        Longitude => &["lng", "lon", "long", "Longitude", "x"],
        IncidentType => &["Incident Type", "type", "Type", "call_type", "nature", "category"],
        Priority => &["Priority", "pri"],
        Address => &["Address", "location_address", "street", "location"],
        City => &["City", "town"],
        State => &["State"],
        ZipCode => &["zip", "Zip Code", "postal_code", "zipcode"],
        Unit => &["Unit", "unit_id", "units", "apparatus"],
        Station => &["Station", "station_id", "Station ID", "first_due"],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_canonical_name_is_always_first() {
        let table = AliasTable::new();
        for system in CadSystem::iter() {
            for field in CanonicalField::iter() {
                let candidates = table.candidates(system, field.as_str());
                assert_eq!(candidates[0], field.as_str(), "{system}/{field}");
            }
        }
    }

    #[test]
    fn test_vendor_aliases_precede_generic() {
        let table = AliasTable::new();
        let candidates = table.candidates(CadSystem::Motorola, "incident_time");
        let received = candidates.iter().position(|c| *c == "CALL_RECEIVED_TIME").unwrap();
        let generic_time = candidates.iter().position(|c| *c == "time").unwrap();
        assert!(received < generic_time);
    }

    #[test]
    fn test_candidates_are_deduplicated() {
        let table = AliasTable::new();
        let candidates = table.candidates(CadSystem::Tyler, "incident_type");
        let count = candidates.iter().filter(|c| **c == "call_type").count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_unknown_target_only_matches_itself() {
        let table = AliasTable::new();
        assert_eq!(table.candidates(CadSystem::Hexagon, "shift"), vec!["shift"]);
    }

    #[test]
    fn test_extra_aliases_come_after_canonical_name() {
        let table = AliasTable::new().with_aliases(
            CadSystem::Hexagon,
            CanonicalField::Station,
            ["FIRE_STA"],
        );
        let candidates = table.candidates(CadSystem::Hexagon, "station");
        assert_eq!(&candidates[..2], &["station", "FIRE_STA"]);
    }

    #[test]
    fn test_generic_extra_aliases_apply_to_vendors() {
        let table =
            AliasTable::new().with_aliases(CadSystem::Generic, CanonicalField::Unit, ["RIG"]);
        assert!(table.candidates(CadSystem::Tyler, "unit").contains(&"RIG"));
    }
}
