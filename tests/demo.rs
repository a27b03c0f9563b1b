//! Common code for integration tests which use the demo model.
use empire::cli::example::extract_example;
use std::fs;
use std::path::{Path, PathBuf};

// These functions give spurious warnings about being unused because of the multiple `mod demo`
// declarations in different test files, so we suppress the warnings manually

/// The name of the demo model used by the integration tests
#[allow(dead_code)]
pub const DEMO_NAME: &str = "two_node";

/// The path to the demo model in the source tree
#[allow(dead_code)]
pub fn get_demo_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("demos")
        .join(DEMO_NAME)
}

/// Extract a copy of the demo model below `parent`, so that runs cannot modify the source tree
#[allow(dead_code)]
pub fn extract_demo(parent: &Path, name: &str) -> PathBuf {
    let model_dir = parent.join(name);
    extract_example(DEMO_NAME, &model_dir).unwrap();
    model_dir
}

/// Prepend options to the demo's configuration file
#[allow(dead_code)]
pub fn add_config_options(model_dir: &Path, options: &str) {
    let file_path = model_dir.join("config.toml");
    let config = fs::read_to_string(&file_path).unwrap();
    fs::write(&file_path, format!("{options}\n{config}")).unwrap();
}

/// Read a CSV file into its header and rows of fields
#[allow(dead_code)]
pub fn read_csv(file_path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(file_path).unwrap();
    let header = reader.headers().unwrap().iter().map(String::from).collect();
    let rows = reader
        .records()
        .map(|record| record.unwrap().iter().map(String::from).collect())
        .collect();
    (header, rows)
}
