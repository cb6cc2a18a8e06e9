//! Synthetic survey data shared by the integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use herhealth::{Dataset, SURVEY_FIELDS, SurveyRecord, TrainingConfig};

pub const BLEEDING_COLUMN: usize = 6;
pub const ROWS: usize = 60;

/// Numeric cells for row `i`: five groups ten units apart, small jitter.
pub fn row_values(i: usize) -> [f64; 13] {
    let group = (i % 5) as f64;
    let mut row = [0.0; 13];
    for (j, cell) in row.iter_mut().enumerate() {
        let jitter = ((i * 7 + j * 3) % 5) as f64 * 0.1;
        *cell = group * 10.0 + j as f64 + jitter;
    }
    row[BLEEDING_COLUMN] = (i % 5 % 2) as f64;
    row
}

/// True when `survey_csv` leaves a cell of row `i` empty.
pub fn has_missing_cell(i: usize) -> bool {
    i % 11 == 10
}

/// Survey CSV with a 0/1 bleeding column and a few empty cells.
pub fn survey_csv(rows: usize) -> String {
    let mut out = SURVEY_FIELDS.join(",");
    out.push('\n');
    for i in 0..rows {
        let values = row_values(i);
        let cells: Vec<String> = values
            .iter()
            .enumerate()
            .map(|(j, value)| {
                if j == 2 && has_missing_cell(i) {
                    String::new()
                } else {
                    value.to_string()
                }
            })
            .collect();
        out.push_str(&cells.join(","));
        out.push('\n');
    }
    out
}

pub fn survey_dataset() -> Dataset {
    Dataset::from_reader(survey_csv(ROWS).as_bytes()).expect("synthetic csv parses")
}

/// The serving form of row `i`.
pub fn survey_record(i: usize) -> SurveyRecord {
    let mut object = serde_json::Map::new();
    for (name, value) in SURVEY_FIELDS.iter().zip(row_values(i)) {
        object.insert(name.to_string(), serde_json::json!(value));
    }
    serde_json::from_value(serde_json::Value::Object(object)).expect("valid survey record")
}

pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write fixture");
    path
}

/// Training config rooted in `dir`, reading `input`.
pub fn config_in(dir: &Path, input: PathBuf) -> TrainingConfig {
    let mut config = TrainingConfig::default();
    config.data.input = input;
    config.data.processed_output = dir.join("out").join("processed_data.csv");
    config.data.clustered_output = dir.join("out").join("clustered_data.csv");
    config.store.model_dir = dir.join("models");
    config
}
