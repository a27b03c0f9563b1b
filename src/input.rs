//! Common routines for handling input data.
//!
//! Model data is stored as tab-separated files named `<workbook>_<sheet>.tab` in the
//! `Input/Tab` folder of a model. Each file has a header row and values are whitespace-trimmed.
use crate::id::{GeneratorID, IDCollection, LineTypeID, NodeID, SeasonID, StorageID, TechnologyID};
use crate::model::sets::{Link, Sets};
use crate::time_index::TimeIndex;
use anyhow::{Context, Result, bail, ensure};
use csv::{ReaderBuilder, Trim, WriterBuilder};
use serde::Serialize;
use serde::de::{Deserialize, DeserializeOwned, Deserializer};
use indexmap::IndexMap;
use std::fs;
use std::path::{Path, PathBuf};

pub mod general;
pub mod generator;
pub mod node;
pub mod sets;
pub mod stochastic;
pub mod storage;
pub mod transmission;

use general::GeneralData;
use generator::GeneratorData;
use node::NodeData;
use stochastic::StochasticData;
use storage::StorageData;
use transmission::TransmissionData;

/// The folder, relative to the model directory, containing tab files
pub const TAB_DIR: &str = "Input/Tab";

/// The folder, relative to the model directory, containing scenario time series
pub const SCENARIO_DATA_DIR: &str = "ScenarioData";

/// The path to the tab file folder for a model
pub fn tab_dir(model_dir: &Path) -> PathBuf {
    model_dir.join(TAB_DIR)
}

/// The file name of the tab file for the given workbook and sheet
pub fn tab_file_name(workbook: &str, sheet: &str) -> String {
    format!("{workbook}_{sheet}.tab")
}

/// Format an error message to include the file path.
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().display())
}

/// Parse a TOML file at the specified path.
///
/// # Returns
///
/// * The deserialised TOML data or an error if the file could not be read or parsed.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let toml_data = toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))?;
    Ok(toml_data)
}

/// Read an f64, checking that it is between 0 and 1
pub fn deserialise_proportion<'de, D>(deserialiser: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Deserialize::deserialize(deserialiser)?;
    if !(0.0..=1.0).contains(&value) {
        Err(serde::de::Error::custom("Value is not between 0 and 1"))?;
    }

    Ok(value)
}

/// Check that the header of a tab file matches the expected column names.
///
/// Each expected column may list alternative names separated by `|`, to accommodate datasets
/// where a column was renamed. Names are compared case-insensitively.
fn check_header(header: &csv::StringRecord, columns: &[&str]) -> Result<()> {
    let actual: Vec<_> = header.iter().collect();
    ensure!(
        actual.len() == columns.len(),
        "Expected columns {columns:?} but found {actual:?}"
    );

    for (found, expected) in actual.iter().zip(columns) {
        ensure!(
            expected
                .split('|')
                .any(|alternative| alternative.eq_ignore_ascii_case(found)),
            "Expected column {expected} but found {found}"
        );
    }

    Ok(())
}

/// Read the rows of a tab-separated file into a `Vec`.
///
/// # Arguments
///
/// * `file_path` - Path to the tab file
/// * `columns` - Expected column names (alternatives separated by `|`)
pub fn read_tab<T: DeserializeOwned>(file_path: &Path, columns: &[&str]) -> Result<Vec<T>> {
    read_tab_inner(file_path, columns).with_context(|| input_err_msg(file_path))
}

fn read_tab_inner<T: DeserializeOwned>(file_path: &Path, columns: &[&str]) -> Result<Vec<T>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .trim(Trim::All)
        .from_path(file_path)?;
    check_header(reader.headers()?, columns)?;

    let mut rows = Vec::new();
    for (line, result) in reader.deserialize().enumerate() {
        // Line numbers are 1-based and the header is on line 1
        let row = result.with_context(|| format!("Invalid data on line {}", line + 2))?;
        rows.push(row);
    }

    Ok(rows)
}

/// Read a tab file which may be absent, returning `None` if it is
pub fn read_tab_optional<T: DeserializeOwned>(
    file_path: &Path,
    columns: &[&str],
) -> Result<Option<Vec<T>>> {
    if !file_path.is_file() {
        return Ok(None);
    }

    read_tab(file_path, columns).map(Some)
}

/// Write rows to a tab-separated file with the given header.
///
/// Where a column has alternative names, the first is used.
pub fn write_tab<T, I>(file_path: &Path, columns: &[&str], rows: I) -> Result<()>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_path(file_path)
        .with_context(|| format!("Could not create {}", file_path.display()))?;
    writer.write_record(columns.iter().map(|col| col.split('|').next().unwrap_or(col)))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}

/// The label used for a scenario in tab files
pub fn scenario_label(scenario: u32) -> String {
    format!("scenario{scenario}")
}

/// Parse a scenario label such as `scenario3` (a bare number is also accepted)
pub fn parse_scenario_label(label: &str) -> Result<u32> {
    let number = label
        .get(..8)
        .filter(|prefix| prefix.eq_ignore_ascii_case("scenario"))
        .map_or(label, |_| &label[8..]);
    number
        .parse()
        .with_context(|| format!("Invalid scenario label: {label}"))
}

/// Look-up helpers for converting raw row values into validated model indices
pub struct InputContext<'a> {
    /// The model's sets
    pub sets: &'a Sets,
    /// The operational time structure
    pub time_index: &'a TimeIndex,
    /// The number of investment periods
    pub num_periods: u32,
    /// The number of operational scenarios
    pub num_scenarios: u32,
}

impl InputContext<'_> {
    /// Check that a period number is valid
    pub fn period(&self, period: u32) -> Result<u32> {
        ensure!(
            (1..=self.num_periods).contains(&period),
            "Period {period} is outside the model horizon (1 to {})",
            self.num_periods
        );
        Ok(period)
    }

    /// Check that an operational hour is valid
    pub fn hour(&self, hour: u32) -> Result<u32> {
        ensure!(
            self.time_index.hours().contains(&hour),
            "Operational hour {hour} is outside 1 to {}",
            self.time_index.num_hours()
        );
        Ok(hour)
    }

    /// Parse and check a scenario label
    pub fn scenario(&self, label: &str) -> Result<u32> {
        let scenario = parse_scenario_label(label)?;
        ensure!(
            (1..=self.num_scenarios).contains(&scenario),
            "Scenario {label} is outside 1 to {}",
            self.num_scenarios
        );
        Ok(scenario)
    }

    /// Look up a season
    pub fn season(&self, id: &str) -> Result<SeasonID> {
        match self.time_index.get_season(id) {
            Some(season) => Ok(season.id.clone()),
            None => bail!("Unknown season {id}"),
        }
    }

    /// Look up a node
    pub fn node(&self, id: &str) -> Result<NodeID> {
        self.sets.nodes.get_id_by_str(id)
    }

    /// Look up a generator
    pub fn generator(&self, id: &str) -> Result<GeneratorID> {
        self.sets.generators.get_id_by_str(id)
    }

    /// Look up a technology
    pub fn technology(&self, id: &str) -> Result<TechnologyID> {
        self.sets.technologies.get_id_by_str(id)
    }

    /// Look up a storage type
    pub fn storage(&self, id: &str) -> Result<StorageID> {
        self.sets.storages.get_id_by_str(id)
    }

    /// Look up a transmission line type
    pub fn line_type(&self, id: &str) -> Result<LineTypeID> {
        self.sets.line_types.get_id_by_str(id)
    }

    /// Look up a node, returning `None` for offshore nodes which are excluded from the model
    pub fn node_opt(&self, id: &str) -> Result<Option<NodeID>> {
        if self.sets.excluded_nodes.contains(id) {
            return Ok(None);
        }
        self.node(id).map(Some)
    }

    /// Look up the arc joining two nodes, in either orientation.
    ///
    /// The arc is returned in its canonical orientation. Returns `None` if either node is an
    /// excluded offshore node.
    pub fn arc(&self, from: &str, to: &str) -> Result<Option<Link>> {
        let (Some(a), Some(b)) = (self.node_opt(from)?, self.node_opt(to)?) else {
            return Ok(None);
        };
        let arc = self
            .sets
            .arc_index(&a, &b)
            .with_context(|| format!("No transmission link between {from} and {to}"))?;
        Ok(Some(self.sets.arcs[arc].clone()))
    }
}

/// Check that a value is finite and not negative
pub fn check_non_negative(name: &str, value: f64) -> Result<f64> {
    ensure!(
        value.is_finite() && value >= 0.0,
        "{name} must be a non-negative number (found {value})"
    );
    Ok(value)
}

/// Check that a capacity limit is not negative. Infinite limits are allowed.
pub fn check_capacity_limit(name: &str, value: f64) -> Result<f64> {
    ensure!(value >= 0.0, "{name} cannot be negative (found {value})");
    Ok(value)
}

/// Check that a lifetime is a positive number of years
pub fn check_lifetime(name: &str, value: f64) -> Result<f64> {
    ensure!(
        value.is_finite() && value > 0.0,
        "{name} must be a positive number of years (found {value})"
    );
    Ok(value)
}

/// Check that a value lies in `[0, 1]`
pub fn check_proportion(name: &str, value: f64) -> Result<f64> {
    ensure!(
        (0.0..=1.0).contains(&value),
        "{name} must be between 0 and 1 (found {value})"
    );
    Ok(value)
}

/// Check that an efficiency is positive and at most one
pub fn check_efficiency(name: &str, value: f64) -> Result<f64> {
    ensure!(
        value > 0.0 && value <= 1.0,
        "{name} must be greater than 0 and at most 1 (found {value})"
    );
    Ok(value)
}

/// Insert a value into a map, returning an error if the key is already present
pub fn try_insert<K, V>(map: &mut IndexMap<K, V>, key: K, value: V) -> Result<()>
where
    K: Eq + std::hash::Hash + std::fmt::Debug,
{
    match map.entry(key) {
        indexmap::map::Entry::Vacant(entry) => {
            entry.insert(value);
            Ok(())
        }
        indexmap::map::Entry::Occupied(entry) => {
            bail!("Duplicate entry for {:?}", entry.key())
        }
    }
}

/// The path of a tab file in the tab folder
pub fn tab_path(tab_dir: &Path, workbook: &str, sheet: &str) -> PathBuf {
    tab_dir.join(tab_file_name(workbook, sheet))
}

/// A table of parameter values keyed on index tuples
pub type ParamMap<K> = IndexMap<K, f64>;

fn collect_params<R, K, F>(rows: Vec<R>, mut parse: F) -> Result<ParamMap<K>>
where
    K: Eq + std::hash::Hash + std::fmt::Debug,
    F: FnMut(R) -> Result<Option<(K, f64)>>,
{
    let mut map = IndexMap::new();
    for (line, row) in rows.into_iter().enumerate() {
        let context = || format!("Invalid data on line {}", line + 2);
        let Some((key, value)) = parse(row).with_context(context)? else {
            continue;
        };
        ensure!(!value.is_nan(), "Value for {key:?} is not a number");
        try_insert(&mut map, key, value).with_context(context)?;
    }

    Ok(map)
}

/// Read a parameter table: one or more index columns followed by a value column.
///
/// # Arguments
///
/// * `tab_dir` - Folder containing the tab files
/// * `workbook` - The workbook the sheet came from (file name prefix)
/// * `sheet` - Sheet name
/// * `columns` - Expected header
/// * `parse` - Converts a raw row into a validated key and value. Returning `None` skips the row.
pub fn read_param_table<R, K, F>(
    tab_dir: &Path,
    workbook: &str,
    sheet: &str,
    columns: &[&str],
    parse: F,
) -> Result<ParamMap<K>>
where
    R: DeserializeOwned,
    K: Eq + std::hash::Hash + std::fmt::Debug,
    F: FnMut(R) -> Result<Option<(K, f64)>>,
{
    let file_path = tab_path(tab_dir, workbook, sheet);
    let rows = read_tab(&file_path, columns)?;
    collect_params(rows, parse).with_context(|| input_err_msg(&file_path))
}

/// Read a parameter table from a file which may be absent
pub fn read_param_table_optional<R, K, F>(
    tab_dir: &Path,
    workbook: &str,
    sheet: &str,
    columns: &[&str],
    parse: F,
) -> Result<Option<ParamMap<K>>>
where
    R: DeserializeOwned,
    K: Eq + std::hash::Hash + std::fmt::Debug,
    F: FnMut(R) -> Result<Option<(K, f64)>>,
{
    let file_path = tab_path(tab_dir, workbook, sheet);
    let Some(rows) = read_tab_optional(&file_path, columns)? else {
        return Ok(None);
    };
    collect_params(rows, parse)
        .with_context(|| input_err_msg(&file_path))
        .map(Some)
}

/// Read a sheet holding a single value
pub fn read_single_value(tab_dir: &Path, workbook: &str, sheet: &str, column: &str) -> Result<f64> {
    let file_path = tab_path(tab_dir, workbook, sheet);
    let rows: Vec<(f64,)> = read_tab(&file_path, &[column])?;
    match rows.as_slice() {
        [(value,)] if value.is_finite() => Ok(*value),
        _ => bail!("{}: expected a single finite value", input_err_msg(&file_path)),
    }
}

/// All tabular input for a model besides the sets
#[derive(Debug, PartialEq, Default)]
pub struct InputData {
    /// Generator parameters
    pub generator: GeneratorData,
    /// Transmission parameters
    pub transmission: TransmissionData,
    /// Storage parameters
    pub storage: StorageData,
    /// Node parameters
    pub node: NodeData,
    /// System-wide parameters
    pub general: GeneralData,
    /// Scenario-dependent parameters
    pub stochastic: StochasticData,
}

/// Read all parameter tables from the tab folder.
///
/// # Arguments
///
/// * `tab_dir` - Folder containing the tab files
/// * `ctx` - Sets and index ranges used to validate the data
pub fn read_input_data(tab_dir: &Path, ctx: &InputContext) -> Result<InputData> {
    Ok(InputData {
        generator: generator::read_generator_data(tab_dir, ctx)?,
        transmission: transmission::read_transmission_data(tab_dir, ctx)?,
        storage: storage::read_storage_data(tab_dir, ctx)?,
        node: node::read_node_data(tab_dir, ctx)?,
        general: general::read_general_data(tab_dir, ctx)?,
        stochastic: stochastic::read_stochastic_data(tab_dir, ctx)?,
    })
}

/// Write all parameter tables to the given folder in the same format they are read in
pub fn write_input_data(tab_dir: &Path, data: &InputData) -> Result<()> {
    generator::write_generator_data(tab_dir, &data.generator)?;
    transmission::write_transmission_data(tab_dir, &data.transmission)?;
    storage::write_storage_data(tab_dir, &data.storage)?;
    node::write_node_data(tab_dir, &data.node)?;
    general::write_general_data(tab_dir, &data.general)?;
    stochastic::write_stochastic_data(tab_dir, &data.stochastic)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use rstest::rstest;
    use serde::Deserialize;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[derive(Debug, Deserialize, Serialize, PartialEq)]
    struct Row {
        node: String,
        value: f64,
    }

    fn write_file(dir: &Path, contents: &str) -> PathBuf {
        let file_path = dir.join("Test_Sheet.tab");
        let mut file = File::create(&file_path).unwrap();
        write!(file, "{contents}").unwrap();
        file_path
    }

    #[test]
    fn test_read_tab_trims_whitespace() {
        let dir = tempdir().unwrap();
        let file_path = write_file(dir.path(), "Node\tvalue\n Norway \t 1.5\nGermany\t2\n");
        let rows: Vec<Row> = read_tab(&file_path, &["Node", "value"]).unwrap();
        assert_eq!(
            rows,
            [
                Row {
                    node: "Norway".into(),
                    value: 1.5
                },
                Row {
                    node: "Germany".into(),
                    value: 2.0
                }
            ]
        );
    }

    #[test]
    fn test_read_tab_alternative_header() {
        let dir = tempdir().unwrap();
        let file_path = write_file(dir.path(), "Node\tgeneratorCapitalCost\nNorway\t1\n");
        let rows: Vec<(String, f64)> =
            read_tab(&file_path, &["Node", "generatorFixedOMCost|generatorCapitalCost"]).unwrap();
        assert_eq!(rows, [("Norway".to_string(), 1.0)]);
    }

    #[test]
    fn test_read_tab_bad_header() {
        let dir = tempdir().unwrap();
        let file_path = write_file(dir.path(), "Region\tvalue\nNorway\t1\n");
        let result: Result<Vec<Row>> = read_tab(&file_path, &["Node", "value"]);
        assert_error!(result, input_err_msg(&file_path));
    }

    #[test]
    fn test_read_tab_missing_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("Missing_Sheet.tab");
        assert!(read_tab::<Row>(&file_path, &["Node", "value"]).is_err());
        assert!(
            read_tab_optional::<Row>(&file_path, &["Node", "value"])
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_write_then_read_tab() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("Test_Sheet.tab");
        let rows = vec![("Norway".to_string(), 0.1 + 0.2), ("Spain".to_string(), 1e-7)];
        write_tab(&file_path, &["Node", "value|alias"], rows.iter()).unwrap();
        let read: Vec<(String, f64)> = read_tab(&file_path, &["Node", "value"]).unwrap();
        assert_eq!(read, rows);
    }

    #[rstest]
    #[case("scenario1", Some(1))]
    #[case("Scenario12", Some(12))]
    #[case("3", Some(3))]
    #[case("scenario", None)]
    #[case("branch1", None)]
    fn test_parse_scenario_label(#[case] label: &str, #[case] expected: Option<u32>) {
        assert_eq!(parse_scenario_label(label).ok(), expected);
    }

    #[test]
    fn test_try_insert() {
        let mut map = IndexMap::new();
        try_insert(&mut map, "a", 1).unwrap();
        assert!(try_insert(&mut map, "a", 2).is_err());
        assert_eq!(map["a"], 1);
    }
}
