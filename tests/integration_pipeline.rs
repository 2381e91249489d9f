//! End-to-end tests: W2 text files in, CSV files out
//!
//! Converted files are read back with the csv crate and checked against
//! dates computed independently with chrono.

use chrono::NaiveDate;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use w2_export::config::{ExportConfig, RecordDefaults, TimeWindow};
use w2_export::ingest::discover_input_files;
use w2_export::processor::convert_text_files;
use w2_export::{PathKey, julian_to_date};

const TOLERANCE: f64 = 1e-5;

/// Spreadsheet serial of a date after February 1900
fn serial(year: i32, month: u32, day: u32) -> f64 {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 31).unwrap();
    let date = NaiveDate::from_ymd_opt(year, month, day).unwrap();
    (date - epoch).num_days() as f64 + 1.0
}

fn read_csv(path: &Path) -> (Vec<String>, Vec<(f64, f64)>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let header = reader
        .headers()
        .unwrap()
        .iter()
        .map(str::to_string)
        .collect();
    let rows = reader
        .records()
        .map(|row| {
            let row = row.unwrap();
            (row[0].parse().unwrap(), row[1].parse().unwrap())
        })
        .collect();
    (header, rows)
}

fn config(output_dir: &Path, year: i32) -> ExportConfig {
    ExportConfig::default()
        .with_reference_year(year)
        .with_output_dir(output_dir)
        .without_progress()
        .with_record_defaults(RecordDefaults {
            watershed: "DeGray Reservoir".to_string(),
            location: "Branch 1".to_string(),
            version: "Example".to_string(),
            ..Default::default()
        })
}

#[tokio::test]
async fn test_directory_of_inputs_to_csv() {
    let temp_dir = TempDir::new().unwrap();
    let input_dir = temp_dir.path().join("inputs");
    fs::create_dir_all(input_dir.join("branch2")).unwrap();

    fs::write(
        input_dir.join("qin_br1.npt"),
        "$Inflow\n\nJDAY QIN\n1.0 21.5\n1.5 22.75\n32.0, 23.0\n",
    )
    .unwrap();
    fs::write(
        input_dir.join("branch2").join("tin_br2.npt"),
        "$Temperature\n\nJDAY TIN\n60.25 8.125\n366.0 9.5\n",
    )
    .unwrap();
    fs::write(input_dir.join("notes.md"), "not an input").unwrap();

    let files = discover_input_files(&[input_dir.display().to_string()]).unwrap();
    assert_eq!(files.len(), 2);

    let output_dir = temp_dir.path().join("csv");
    let stats = convert_text_files(&files, &config(&output_dir, 2014))
        .await
        .unwrap();
    assert_eq!(stats.records_succeeded, 2);
    assert_eq!(stats.records_failed, 0);

    let (header, rows) = read_csv(&output_dir.join("DeGray^Reservoir%qin_br1%Example.csv"));
    assert_eq!(header, vec!["Excel Date #", "qin_br1"]);
    let expected = [
        (serial(2014, 1, 1), 21.5),
        (serial(2014, 1, 1) + 0.5, 22.75),
        (serial(2014, 2, 1), 23.0),
    ];
    assert_eq!(rows.len(), expected.len());
    for ((date, value), (expected_date, expected_value)) in rows.iter().zip(expected) {
        assert!((date - expected_date).abs() < TOLERANCE);
        assert!((value - expected_value).abs() < 1e-3);
    }

    let (_, rows) = read_csv(&output_dir.join("DeGray^Reservoir%tin_br2%Example.csv"));
    // Day 366 of 2014 is 01 Jan 2015
    assert!((rows[0].0 - (serial(2014, 3, 1) + 0.25)).abs() < TOLERANCE);
    assert!((rows[1].0 - serial(2015, 1, 1)).abs() < TOLERANCE);
}

#[tokio::test]
async fn test_time_window_limits_output() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("elws.opt");
    let rows: String = (0..90).map(|i| format!("{}.0 {}\n", i + 1, i)).collect();
    fs::write(&input, format!("h\nh\nh\n{}", rows)).unwrap();

    let output_dir = temp_dir.path().join("csv");
    let config = config(&output_dir, 2016)
        .with_time_window(TimeWindow::new("01Feb2016 0000", "29Feb2016 2359"));

    convert_text_files(&[input], &config).await.unwrap();

    let (_, rows) = read_csv(&output_dir.join("DeGray^Reservoir%elws%Example.csv"));
    assert_eq!(rows.len(), 29);
    assert!((rows[0].0 - serial(2016, 2, 1)).abs() < TOLERANCE);
    assert!((rows[28].0 - serial(2016, 2, 29)).abs() < TOLERANCE);
    assert_eq!(rows[0].1, 31.0);
}

#[test]
fn test_julian_days_agree_with_chrono() {
    for year in 2010..2022 {
        let start = NaiveDate::from_ymd_opt(year, 1, 1).unwrap();
        for day in [1.0, 59.0, 60.0, 200.5, 365.0, 366.0, 730.25] {
            let date = julian_to_date(day, year).unwrap();
            let expected = start + chrono::Duration::days(day as i64 - 1);

            assert_eq!(
                date.to_minutes().unwrap() / 1440,
                (expected - NaiveDate::from_ymd_opt(1899, 12, 31).unwrap()).num_days(),
                "day {day} of {year}"
            );
        }
    }
}

#[test]
fn test_path_key_round_trip() {
    let raw = "/DeGray Reservoir/Branch 1/Flow:Out/01JAN2014/IR-MONTH/Example/";
    let key: PathKey = raw.parse().unwrap();

    assert_eq!(key.to_string(), raw);
    assert_eq!(
        key.reduced().to_string(),
        "/DeGray Reservoir/Branch 1/Flow:Out//IR-MONTH/Example/"
    );
    assert_eq!(key.to_filename(), "DeGray^Reservoir%Flow@Out%Example.csv");
    assert!(PathKey::parse("/A/B/C/D/E/").is_err());
}
