use std::fs;

use qsomerge::{
    adif,
    config::MergeConfig,
    export::{adif::AdifWriter, wsjtx::WsjtxCsvWriter, RecordWriter},
    pipeline::{MergeOutcome, QsoMerger},
    qso::RawRecord,
    report::SELECTED_KEY,
};

fn qso(call: &str, time_on: &str, extra: &[(&str, &str)]) -> RawRecord {
    let mut rec: RawRecord = [
        ("CALL", call),
        ("QSO_DATE", "20200412"),
        ("TIME_ON", time_on),
        ("BAND", "20M"),
        ("MODE", "FT8"),
    ]
    .into_iter()
    .collect();
    for (k, v) in extra {
        rec.insert(k, *v);
    }
    rec
}

fn sample() -> MergeOutcome {
    let mut merger = QsoMerger::new(MergeConfig::default()).expect("config");
    merger.add_source(
        "a.adi",
        [
            qso("K1ABC", "120000", &[("NAME", "John"), ("FREQ", "14.074"), ("MY_STATE", "MA")]),
            qso("W1AW", "1305", &[("MODE", "FT4"), ("COMMENT", "tnx, 73")]),
        ],
    );
    merger.add_source("b.adi", [qso("K1ABC", "120020", &[("NAME", "Paul")])]);
    merger.finish()
}

fn adif_text(outcome: &MergeOutcome, minimal: bool) -> String {
    let mut writer = AdifWriter::new(Vec::new()).minimal(minimal);
    writer.write_records(&outcome.records).expect("write");
    writer.flush().expect("flush");
    String::from_utf8(writer.into_inner()).expect("utf8")
}

#[test]
fn adif_output_has_header_and_ordered_fields() {
    let text = adif_text(&sample(), false);
    let (header, body) = text.split_once("<eoh>\n").expect("header");
    assert!(header.starts_with("<adif_ver:5>3.1.0 "));
    assert!(header.contains("<programid:8>qsomerge "));

    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("<call:5>K1ABC <mode:3>FT8 <qso_date:8>20200412 <time_on:6>120000 "));
    assert!(lines[0].ends_with("<eor>"));
    // Remaining fields follow the fixed order by name.
    let freq = lines[0].find("<freq:").expect("freq");
    let name = lines[0].find("<name:").expect("name");
    let state = lines[0].find("<my_state:").expect("my_state");
    assert!(freq < name && name < state);
    assert!(!lines[0].contains("_UNMERGED") && !lines[0].contains("Paul"));

    assert!(lines[1].contains("<mode:4>MFSK <submode:3>FT4 "));
    assert!(lines[1].contains("<comment:7>tnx, 73 "));
}

#[test]
fn minimal_adif_keeps_only_the_fixed_fields() {
    let text = adif_text(&sample(), true);
    assert!(text.contains("<name:4>John "));
    assert!(!text.contains("<my_state:"));
}

#[test]
fn adif_output_reads_back() {
    let outcome = sample();
    let doc = adif::parse(&adif_text(&outcome, false)).expect("parse");
    assert_eq!(doc.header.get("ADIF_VER"), Some("3.1.0"));
    assert_eq!(doc.records.len(), outcome.records.len());
    for (raw, merged) in doc.records.iter().zip(&outcome.records) {
        assert_eq!(raw, &merged.record.to_raw());
    }
}

#[test]
fn field_length_counts_characters() {
    let mut out = Vec::new();
    qsomerge::export::adif::write_field(&mut out, "NAME", "José").expect("write");
    assert_eq!(String::from_utf8(out).expect("utf8"), "<name:4>José ");
}

#[test]
fn wsjtx_csv_rows() {
    let mut buf = Vec::new();
    {
        let mut w = WsjtxCsvWriter::new(&mut buf);
        w.write_records(&sample().records).expect("write");
        w.flush().expect("flush");
    }
    let text = String::from_utf8(buf).expect("utf8");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        vec![
            "2020-04-12,12:00:00,,,K1ABC,,14.074,FT8,,,,,John",
            "2020-04-12,13:05:00,,,W1AW,,,FT4,,,,\"tnx, 73\",",
        ]
    );
}

#[test]
fn wsjtx_time_formats() {
    use qsomerge::export::wsjtx::{format_date, format_time};
    assert_eq!(format_date("20200412"), "2020-04-12");
    assert_eq!(format_date(""), "");
    assert_eq!(format_time("123456"), "12:34:56");
    assert_eq!(format_time("1234"), "12:34:00");
    assert_eq!(format_time(""), "");
    assert_eq!(format_time("12345"), "ERROR");
}

#[test]
fn problem_report_json() {
    let outcome = sample();
    let mut bad = qso("N0CALL", "120000", &[]);
    bad.insert("MODE", "");
    let mut merger = QsoMerger::new(MergeConfig::default()).expect("config");
    merger.add_source("c.adi", [bad]);
    let rejected = merger.finish();

    let report = qsomerge::report::ProblemReport::build(&outcome.records, &rejected.malformed);
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("problems.json");
    report.write_json_file(&path).expect("write report");

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).expect("read")).expect("json");
    let name = &json["problems_by_field"]["NAME"];
    assert_eq!(name["count"], 1);
    assert_eq!(name["qsos"]["K1ABC_20200412_120000_20M"][SELECTED_KEY], "John");
    assert_eq!(name["qsos"]["K1ABC_20200412_120000_20M"]["b.adi"], "Paul");

    let problem = &json["problems_by_qso"][0];
    assert_eq!(problem["CALL"], "K1ABC");
    assert_eq!(problem["FREQ"], 14.074);
    assert_eq!(problem["_UNMERGED"]["b.adi"]["NAME"], "Paul");

    let malformed = &json["malformed_qsos"][0];
    assert_eq!(malformed["source"], "c.adi");
    assert_eq!(malformed["missing"][0], "MODE");
    assert_eq!(malformed["record"]["CALL"], "N0CALL");
    assert!(malformed.get("invalid").is_none());
}
