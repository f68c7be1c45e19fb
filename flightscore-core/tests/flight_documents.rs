use flightscore_core::{
    FlightSchedule, FlightSession, GroupSelection, ManoeuvreRecord, MissingPolicy, ScheduleRef,
    ScoreGroup, ScoreProperties, ScoringError, VersionSelector,
};
use serde_json::{Value, json};

fn man_doc(name: &str, k: f64, schedule: &str, history: Value) -> Value {
    json!({
        "name": name,
        "id": name.to_lowercase(),
        "k": k,
        "info": {
            "name": name,
            "short_name": name.to_lowercase(),
            "k": k,
            "position": "CENTRE",
            "start": {"orientation": "UPRIGHT", "direction": "UPWIND", "height": "BTM"},
            "end": {"orientation": "UPRIGHT", "direction": "UPWIND", "height": "BTM"},
            "centre_points": [1],
            "centred_els": [[0, 0.5]]
        },
        "schedule": {"category": "F3A", "name": schedule},
        "flown": [{"t": 0.0, "x": 1.0}, {"t": 0.1, "x": 1.2}],
        "template": {"elements": ["line", "loop"]},
        "history": history
    })
}

fn total_only(total: f64) -> Value {
    json!({"results": [{"properties": {"difficulty": 3, "truncate": false}, "score": {"total": total}}]})
}

fn flight_doc() -> Value {
    json!({
        "origin": {"lat": 51.46, "lng": -2.79, "alt": 31.0, "heading": 152.0},
        "isComp": true,
        "sourceBin": "00000129.BIN",
        "sourceFCJ": "00000129.json",
        "bootTime": "2024-05-18T10:02:11Z",
        "mans": [
            man_doc("M1", 2.0, "P25", json!({"1.0": total_only(8.5)})),
            man_doc("M2", 3.0, "P25", json!({"1.0": total_only(7.0), "2.0": total_only(7.5)})),
        ]
    })
}

#[test]
fn two_manoeuvre_scenario_reads_versions_independently() {
    let flight = FlightSession::from_value(flight_doc()).unwrap();
    let group = GroupSelection::Single(ScoreGroup::Total);

    let v1 = flight
        .get_scores("1.0", None, group, MissingPolicy::Zero)
        .unwrap();
    assert_eq!(v1.get("M1", "total"), Some(8.5));
    assert_eq!(v1.get("M2", "total"), Some(7.0));

    let v2 = flight
        .get_scores("2.0", None, group, MissingPolicy::Zero)
        .unwrap();
    assert_eq!(v2.get("M1", "total"), Some(0.0));
    assert_eq!(v2.get("M2", "total"), Some(7.5));

    assert!(flight.check_version("v1.0"));
    assert!(!flight.check_version("2.0"));

    let totals = flight.total_score(None, &VersionSelector::AllValid);
    assert_eq!(totals.len(), 2);
    assert!((totals[0].total - (2.0 * 8.5 + 3.0 * 7.0)).abs() < 1e-9);
    assert!((totals[1].total - 3.0 * 7.5).abs() < 1e-9);
}

#[test]
fn other_scoring_properties_count_as_missing() {
    let flight = FlightSession::from_value(flight_doc()).unwrap();
    let props = ScoreProperties::new(2, true);
    let err = flight
        .get_scores("1.0", Some(&props), GroupSelection::default(), MissingPolicy::Raise)
        .unwrap_err();
    assert_eq!(err.to_string(), "version 1.0 not found in manoeuvre M1");
}

#[test]
fn shared_schedule_converts_and_mixed_is_flagged() {
    let flight = FlightSession::from_value(flight_doc()).unwrap();
    match flight.schedule() {
        FlightSchedule::Single(info) => {
            assert_eq!(info.category, "f3a");
            assert_eq!(info.name, "p25");
        }
        FlightSchedule::Mixed => panic!("expected a single schedule"),
    }

    let mut doc = flight_doc();
    doc["mans"][1]["schedule"]["name"] = json!("F25");
    let mixed = FlightSession::from_value(doc).unwrap();
    assert_eq!(mixed.schedule(), FlightSchedule::Mixed);
}

#[test]
fn structurally_equal_schedules_are_the_same_schedule() {
    let a = ManoeuvreRecord::new("A", "a", 1.0, ScheduleRef::new("F3A", "P25"));
    let b = ManoeuvreRecord::new("B", "b", 1.0, ScheduleRef::new("F3A", "P25"));
    let flight = FlightSession::new(false, vec![a, b]);
    assert!(!flight.schedule().is_mixed());
}

#[test]
fn basic_keeps_metadata_and_is_idempotent() {
    let flight = FlightSession::from_value(flight_doc()).unwrap();
    let basic = flight.basic();

    assert_eq!(basic.origin, flight.origin);
    assert_eq!(basic.is_comp, flight.is_comp);
    assert_eq!(basic.source_bin, flight.source_bin);
    assert_eq!(basic.source_fcj, flight.source_fcj);
    assert_eq!(basic.boot_time, flight.boot_time);
    assert_eq!(basic.mans.len(), flight.mans.len());
    for (reduced, full) in basic.mans.iter().zip(&flight.mans) {
        assert_eq!(reduced, &full.basic());
        assert!(reduced.flown.is_none());
        assert!(reduced.template.is_none());
        assert_eq!(reduced.history, full.history);
    }
    assert_eq!(basic.basic(), basic);

    let json = basic.to_json_pretty().unwrap();
    assert!(!json.contains("\"flown\""));
    assert_eq!(FlightSession::from_json(&json).unwrap(), basic);
}

#[test]
fn missing_and_null_history_are_empty() {
    let mut doc = flight_doc();
    doc["mans"][0]["history"] = Value::Null;
    doc["mans"][1]
        .as_object_mut()
        .unwrap()
        .remove("history");
    let flight = FlightSession::from_value(doc).unwrap();
    assert!(flight.all_versions().is_empty());
    assert!(!flight.check_version("1.0"));

    let table = flight
        .get_scores("1.0", None, GroupSelection::All, MissingPolicy::Zero)
        .unwrap();
    assert_eq!(table.rows(), ["M1", "M2"]);
    assert!(table.values().iter().flatten().all(|v| *v == 0.0));
}

#[test]
fn malformed_documents_fail_at_ingestion() {
    let mut doc = flight_doc();
    doc["mans"][0]["k"] = json!("heavy");
    assert!(matches!(
        FlightSession::from_value(doc),
        Err(ScoringError::Parse(_))
    ));
    assert!(matches!(
        FlightSession::from_json("not json"),
        Err(ScoringError::Parse(_))
    ));
}

#[test]
fn boot_time_accepts_naive_and_offset_timestamps() {
    let flight = FlightSession::from_json(
        r#"{"isComp": true, "bootTime": "2024-05-18T10:02:11.123000", "mans": []}"#,
    )
    .unwrap();
    assert_eq!(
        flight.boot_time.map(|t| t.to_rfc3339()),
        Some("2024-05-18T10:02:11.123+00:00".to_string())
    );

    let shifted = FlightSession::from_json(
        r#"{"isComp": true, "bootTime": "2024-05-18T12:02:11.123+02:00", "mans": []}"#,
    )
    .unwrap();
    assert_eq!(shifted.boot_time, flight.boot_time);

    let absent = FlightSession::from_json(r#"{"isComp": true, "bootTime": null, "mans": []}"#)
        .unwrap();
    assert!(absent.boot_time.is_none());

    assert!(matches!(
        FlightSession::from_json(r#"{"isComp": true, "bootTime": "yesterday", "mans": []}"#),
        Err(ScoringError::Parse(_))
    ));
}

#[test]
fn malformed_history_keys_remain_addressable() {
    let mut doc = flight_doc();
    doc["mans"][0]["history"]["nightly-x"] = total_only(6.0);
    let flight = FlightSession::from_value(doc).unwrap();
    assert!(flight.all_versions().contains("nightly-x"));
    assert!(!flight.all_valid_versions().iter().any(|v| v == "nightly-x"));

    let table = flight
        .create_score_df(None, GroupSelection::default(), &VersionSelector::explicit("nightly-x"))
        .unwrap();
    assert_eq!(table.get("M1", "total"), Some(6.0));
    assert_eq!(table.get("M2", "total"), Some(0.0));
}
