use std::sync::Arc;

use qsomerge::{
    config::{MergeConfig, Policy},
    error::NormalizeError,
    normalize::{Normalized, Normalizer},
    qso::{FieldValue, RawRecord},
    types::FieldKind,
};

fn normalizer() -> Normalizer {
    Normalizer::new(Arc::new(Policy::compile(MergeConfig::default()).expect("policy")))
}

fn qso(extra: &[(&str, &str)]) -> RawRecord {
    let mut rec: RawRecord = [
        ("CALL", "K1ABC"),
        ("QSO_DATE", "20200412"),
        ("TIME_ON", "123000"),
        ("BAND", "20m"),
        ("MODE", "FT8"),
    ]
    .into_iter()
    .collect();
    for (k, v) in extra {
        rec.insert(k, *v);
    }
    rec
}

fn norm(extra: &[(&str, &str)]) -> Normalized {
    normalizer().normalize(qso(extra), "test.adi", 0).expect("normalize")
}

fn text(s: &str) -> FieldValue {
    FieldValue::Text(s.to_string())
}

#[test]
fn trims_and_drops_empty_fields() {
    let out = norm(&[("CALL", "  k1abc "), ("NAME", "   "), ("QTH", " Boston ")]);
    assert_eq!(out.record.get("CALL"), Some(&text("K1ABC")));
    assert_eq!(out.record.get("QTH"), Some(&text("Boston")));
    assert!(out.record.get("NAME").is_none());
    assert_eq!(out.record.source, "test.adi");
}

#[test]
fn missing_band_rejects_the_record() {
    let mut raw = qso(&[]);
    raw.insert("BAND", "  ");
    let err = normalizer().normalize(raw.clone(), "a.adi", 3).expect_err("must fail");
    let NormalizeError::Malformed(bad) = err;
    assert_eq!(bad.missing, vec!["BAND".to_string()]);
    assert_eq!(bad.source, "a.adi");
    assert_eq!(bad.record, raw);
}

#[test]
fn missing_fields_are_listed_in_mandatory_order() {
    let raw: RawRecord = [("QSO_DATE", "20200412"), ("TIME_ON", "1230"), ("BAND", "20M")]
        .into_iter()
        .collect();
    let NormalizeError::Malformed(bad) = normalizer().normalize(raw, "a.adi", 0).expect_err("must fail");
    assert_eq!(bad.missing, vec!["CALL".to_string(), "MODE".to_string()]);
}

#[test]
fn unusable_date_or_time_rejects_the_record() {
    let NormalizeError::Malformed(bad) = normalizer()
        .normalize(qso(&[("QSO_DATE", "2020-04-12")]), "a.adi", 0)
        .expect_err("must fail");
    assert!(bad.missing.is_empty());
    assert_eq!(bad.invalid, vec!["QSO_DATE".to_string()]);

    let NormalizeError::Malformed(bad) = normalizer()
        .normalize(qso(&[("TIME_ON", "12:30")]), "a.adi", 0)
        .expect_err("must fail");
    assert_eq!(bad.invalid, vec!["TIME_ON".to_string()]);
}

#[test]
fn sub_mode_logged_as_mode_is_split() {
    let out = norm(&[("MODE", "FT4")]);
    assert_eq!(out.record.get("MODE"), Some(&text("MFSK")));
    assert_eq!(out.record.get("SUBMODE"), Some(&text("FT4")));

    let out = norm(&[("MODE", "FT8")]);
    assert_eq!(out.record.get("MODE"), Some(&text("FT8")));
    assert!(out.record.get("SUBMODE").is_none());
}

#[test]
fn power_units_sentinels_and_scaling() {
    assert_eq!(norm(&[("TX_PWR", "100W")]).record.get("TX_PWR"), Some(&FieldValue::Int(100)));
    assert_eq!(norm(&[("TX_PWR", "5 w")]).record.get("TX_PWR"), Some(&FieldValue::Int(5)));
    assert_eq!(norm(&[("RX_PWR", "0.5W")]).record.get("RX_PWR"), Some(&FieldValue::Number(0.5)));
    assert!(norm(&[("TX_PWR", "NaN")]).record.get("TX_PWR").is_none());
    assert_eq!(
        norm(&[("TX_PWR", "1000000")]).record.get("TX_PWR"),
        Some(&FieldValue::Int(100))
    );
    assert_eq!(norm(&[("TX_PWR", "1500")]).record.get("TX_PWR"), Some(&FieldValue::Int(1500)));
    assert_eq!(norm(&[("TX_PWR", "100W PEP")]).record.get("TX_PWR"), Some(&FieldValue::Int(100)));
}

#[test]
fn implausible_power_is_dropped_not_rescaled_twice() {
    let out = norm(&[("TX_PWR", "200000000")]);
    assert!(out.record.get("TX_PWR").is_none());
    assert_eq!(out.coercion_errors.len(), 1);
    assert_eq!(out.coercion_errors[0].field, "TX_PWR");

    let again = normalizer()
        .normalize(out.record.to_raw(), "test.adi", 0)
        .expect("normalize");
    assert_eq!(again.record, out.record);

    // Exactly at the limit still rescales once and stays put.
    let edge = norm(&[("TX_PWR", "100000000")]).record;
    assert_eq!(edge.get("TX_PWR"), Some(&FieldValue::Int(10000)));
    let again = normalizer().normalize(edge.to_raw(), "test.adi", 0).expect("normalize").record;
    assert_eq!(again, edge);
}

#[test]
fn numbers_round_or_collapse() {
    let out = norm(&[("FREQ", "14.0741234"), ("DISTANCE", "100.0"), ("ANT_AZ", "12.5")]);
    assert_eq!(out.record.get("FREQ"), Some(&FieldValue::Number(14.074)));
    assert_eq!(out.record.get("DISTANCE"), Some(&FieldValue::Int(100)));
    assert_eq!(out.record.get("ANT_AZ"), Some(&FieldValue::Number(12.5)));
}

#[test]
fn zones_are_two_digit_codes() {
    let out = norm(&[("CQZ", "5"), ("ITUZ", "08")]);
    assert_eq!(out.record.get("CQZ"), Some(&FieldValue::Zone(5)));
    assert_eq!(out.record.get("CQZ").map(|v| v.to_string()).as_deref(), Some("05"));
    assert_eq!(out.record.get("ITUZ"), Some(&FieldValue::Zone(8)));
}

#[test]
fn case_canonicalization() {
    let out = norm(&[
        ("CALL", "ve3/k1abc_p"),
        ("STATION_CALLSIGN", "w1aw"),
        ("BAND", "70cm"),
        ("MY_GRIDSQUARE", "fn31PR"),
    ]);
    assert_eq!(out.record.get("CALL"), Some(&text("VE3/K1ABC/P")));
    assert_eq!(out.record.get("STATION_CALLSIGN"), Some(&text("W1AW")));
    assert_eq!(out.record.get("BAND"), Some(&text("70CM")));
    assert_eq!(out.record.get("MY_GRIDSQUARE"), Some(&text("FN31pr")));
}

#[test]
fn unset_coordinates_are_dropped() {
    let out = norm(&[("LAT", "N000 00.000"), ("LON", "W071 03.500"), ("MY_LON", "E000 00.000")]);
    assert!(out.record.get("LAT").is_none());
    assert!(out.record.get("MY_LON").is_none());
    assert_eq!(out.record.get("LON"), Some(&text("W071 03.500")));
}

#[test]
fn zero_values_dropped_except_dxcc() {
    let out = norm(&[("CQZ", "0"), ("TX_PWR", "0"), ("DISTANCE", "0.0"), ("DXCC", "0"), ("ANT_EL", "0")]);
    assert!(out.record.get("CQZ").is_none());
    assert!(out.record.get("TX_PWR").is_none());
    assert!(out.record.get("DISTANCE").is_none());
    assert_eq!(out.record.get("DXCC"), Some(&FieldValue::UInt(0)));
    assert_eq!(out.record.get("ANT_EL"), Some(&FieldValue::Int(0)));
}

#[test]
fn comment_restating_reports_is_dropped() {
    let out = norm(&[
        ("COMMENT", "FT8  Sent: -10  Rcvd: -12"),
        ("RST_SENT", "-10"),
        ("RST_RCVD", "-12"),
    ]);
    assert!(out.record.get("COMMENT").is_none());

    let out = norm(&[
        ("COMMENT", "ft8 sent: -10 rcvd: -11"),
        ("RST_SENT", "-10"),
        ("RST_RCVD", "-12"),
    ]);
    assert!(out.record.get("COMMENT").is_some());

    let out = norm(&[("COMMENT", "Sent: -10 Rcvd: -12"), ("RST_SENT", "-10")]);
    assert!(out.record.get("COMMENT").is_some());
}

#[test]
fn contest_id_without_a_contest_is_dropped() {
    assert!(norm(&[("CONTEST_ID", "Non-Contest")]).record.get("CONTEST_ID").is_none());
    assert!(norm(&[("CONTEST_ID", "n/a")]).record.get("CONTEST_ID").is_none());
    assert_eq!(
        norm(&[("CONTEST_ID", "CQ-WW-CW")]).record.get("CONTEST_ID"),
        Some(&text("CQ-WW-CW"))
    );
}

#[test]
fn coercion_failure_drops_only_that_field() {
    let out = norm(&[("SRX", "abc"), ("NAME", "John")]);
    assert!(out.record.get("SRX").is_none());
    assert_eq!(out.record.get("NAME"), Some(&text("John")));
    assert_eq!(out.coercion_errors.len(), 1);
    let err = &out.coercion_errors[0];
    assert_eq!(err.field, "SRX");
    assert_eq!(err.value, "abc");
    assert_eq!(err.kind, FieldKind::Integer);
    assert_eq!(err.source_id, "test.adi");
}

#[test]
fn renormalizing_output_is_a_no_op() {
    let first = norm(&[
        ("MODE", "ft4"),
        ("TX_PWR", "50000"),
        ("CALL", "k1abc_m"),
        ("GRIDSQUARE", "fn20xr"),
        ("FREQ", "14.0805"),
        ("CQZ", "5"),
        ("COMMENT", "tnx qso"),
    ])
    .record;
    let second = normalizer()
        .normalize(first.to_raw(), "test.adi", 0)
        .expect("normalize")
        .record;
    assert_eq!(first, second);
}

#[test]
fn custom_mandatory_fields() {
    let cfg = MergeConfig {
        mandatory_fields: vec!["CALL".into(), "QSO_DATE".into(), "TIME_ON".into(), "GRIDSQUARE".into()],
        ..MergeConfig::default()
    };
    let n = Normalizer::new(Arc::new(Policy::compile(cfg).expect("policy")));
    let NormalizeError::Malformed(bad) = n.normalize(qso(&[]), "a.adi", 0).expect_err("must fail");
    assert_eq!(bad.missing, vec!["GRIDSQUARE".to_string()]);
}
