#![cfg(feature = "serde")]

use bayesopt::prelude::*;

#[test]
fn test_domain_round_trips_and_still_normalizes() {
    let domain = Domain::builder()
        .continuous("x", -1.0, 3.0)
        .integer("n", 0, 9)
        .build()
        .unwrap();

    let json = serde_json::to_string(&domain).unwrap();
    let back: Domain = serde_json::from_str(&json).unwrap();

    assert_eq!(back.len(), 2);
    let pars: Pars = [
        ("x".to_string(), ParamValue::Float(1.0)),
        ("n".to_string(), ParamValue::Int(4)),
    ]
    .into();
    // the name index is rebuilt on deserialization, not serialized
    let unit = back.normalize(&pars).unwrap();
    assert_eq!(unit.len(), 2);
    assert!(back.contains(&pars));
}

#[test]
fn test_tampered_domain_payloads_are_rejected() {
    let inverted = r#"{"specs":[{"name":"x","kind":"Continuous","low":5.0,"high":1.0}]}"#;
    assert!(
        serde_json::from_str::<Domain>(inverted).is_err(),
        "inverted bounds must not deserialize"
    );

    let duplicated = r#"{"specs":[
        {"name":"x","kind":"Continuous","low":0.0,"high":1.0},
        {"name":"x","kind":"Integer","low":0.0,"high":5.0}
    ]}"#;
    assert!(
        serde_json::from_str::<Domain>(duplicated).is_err(),
        "duplicate names must not deserialize"
    );
}

#[test]
fn test_observations_and_warnings_serialize() {
    let domain = Domain::builder().continuous("x", 0.0, 1.0).build().unwrap();
    let mut opt = BayesOpt::builder(domain)
        .init_points(3)
        .iterations(2)
        .seed(6)
        .build()
        .unwrap();
    opt.run(|pars: &Pars| {
        let x = pars["x"].as_f64();
        Ok::<_, Error>(Evaluation::new(-x).with_aux("trial", "smoke"))
    })
    .unwrap();

    let json = serde_json::to_string(opt.score_summary()).unwrap();
    let rows: Vec<serde_json::Value> = serde_json::from_str(&json).unwrap();
    assert_eq!(rows.len(), opt.n_observations());
    assert!(rows[0].get("score").is_some());
    assert!(rows[0].get("pars").is_some());
    assert_eq!(rows[0]["aux"]["trial"], serde_json::json!({"Text": "smoke"}));
    assert!(
        rows[0].get("unit").is_none(),
        "internal unit coordinates are not part of the export"
    );

    let warnings = serde_json::to_string(opt.warnings()).unwrap();
    let _: Vec<serde_json::Value> = serde_json::from_str(&warnings).unwrap();
}

#[test]
fn test_config_enums_round_trip() {
    let acq = Acquisition::upper_confidence_bound(1.96);
    let json = serde_json::to_string(&acq).unwrap();
    let back: Acquisition = serde_json::from_str(&json).unwrap();
    assert_eq!(back, acq);

    let reason = StopReason::Stalled { iterations: 4 };
    let json = serde_json::to_string(&reason).unwrap();
    let back: StopReason = serde_json::from_str(&json).unwrap();
    assert_eq!(back, reason);

    let search = SearchConfig::default();
    let json = serde_json::to_string(&search).unwrap();
    let back: SearchConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back.pool_size, search.pool_size);
    assert!((back.dup_tolerance - search.dup_tolerance).abs() < f64::EPSILON);
}
