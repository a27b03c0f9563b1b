//! Reading the multi-year hourly time series from which scenarios are sampled.
use super::naming::NodeNames;
use crate::id::NodeID;
use crate::input::input_err_msg;
use anyhow::{Context, Result, ensure};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use indexmap::{IndexMap, IndexSet};
use std::ops::{Range, RangeInclusive};
use std::path::Path;
use strum::{EnumIter, IntoEnumIterator};

/// The name of the leading timestamp column of every time series file
const TIME_COLUMN: &str = "time";

/// A quantity with an hourly time series per node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum Profile {
    /// Solar capacity factor
    Solar,
    /// Onshore wind capacity factor
    WindOnshore,
    /// Offshore wind capacity factor
    WindOffshore,
    /// Run-of-river hydro capacity factor
    HydroRor,
    /// Reservoir hydro inflow (MWh)
    HydroSeasonal,
    /// Electric load (MW)
    ElectricLoad,
}

impl Profile {
    /// The name of the profile, which is also the stem of its file name
    pub fn name(self) -> &'static str {
        match self {
            Profile::Solar => "solar",
            Profile::WindOnshore => "windonshore",
            Profile::WindOffshore => "windoffshore",
            Profile::HydroRor => "hydroror",
            Profile::HydroSeasonal => "hydroseasonal",
            Profile::ElectricLoad => "electricload",
        }
    }

    /// Whether the profile gives the availability of generators
    pub fn is_availability(self) -> bool {
        !matches!(self, Profile::HydroSeasonal | Profile::ElectricLoad)
    }
}

/// An hourly time series with one column per node
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    /// Timestamps, in ascending order
    pub times: Vec<NaiveDateTime>,
    /// Values for each node
    pub columns: IndexMap<String, Vec<f64>>,
}

fn parse_time(value: &str, time_format: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, time_format)
        .or_else(|_| {
            NaiveDate::parse_from_str(value, time_format).map(|date| date.and_time(NaiveTime::MIN))
        })
        .with_context(|| format!("Could not parse time '{value}' with format '{time_format}'"))
}

impl TimeSeries {
    /// Read a time series from a CSV file, renaming node columns to their long names
    pub fn read(file_path: &Path, time_format: &str, names: &NodeNames) -> Result<Self> {
        let read = || -> Result<Self> {
            let mut reader = csv::Reader::from_path(file_path)?;
            let headers = reader.headers()?.clone();
            ensure!(
                headers.get(0).map(str::trim) == Some(TIME_COLUMN),
                "The first column must be '{TIME_COLUMN}'"
            );
            let mut columns: IndexMap<String, Vec<f64>> = headers
                .iter()
                .skip(1)
                .map(|code| (names.long_name(code.trim()).to_string(), Vec::new()))
                .collect();
            ensure!(
                columns.len() == headers.len() - 1,
                "Duplicate node columns"
            );

            let mut times = Vec::new();
            for (row, record) in reader.records().enumerate() {
                let record = record?;
                let time = parse_time(record[0].trim(), time_format)?;
                if let Some(last) = times.last() {
                    ensure!(time > *last, "Times must be in ascending order (row {})", row + 1);
                }
                times.push(time);

                for (field, values) in record.iter().skip(1).zip(columns.values_mut()) {
                    let value = field
                        .trim()
                        .parse()
                        .with_context(|| format!("Invalid value '{field}' in row {}", row + 1))?;
                    values.push(value);
                }
            }

            Ok(Self { times, columns })
        };

        read().with_context(|| input_err_msg(file_path))
    }

    /// The values of a node's column
    pub fn column(&self, node: &str) -> Option<&[f64]> {
        self.columns.get(node).map(Vec::as_slice)
    }
}

/// The time series of every profile, sharing a common time axis
#[derive(Debug)]
pub struct ScenarioData {
    series: IndexMap<Profile, TimeSeries>,
    /// The rows belonging to each calendar year
    years: IndexMap<i32, Range<usize>>,
    /// The load columns of nodes in the model
    load_nodes: Vec<String>,
}

impl ScenarioData {
    /// Combine the time series of each profile.
    ///
    /// Every profile must be present and share the timestamps of the electric load. Only load
    /// columns for nodes in `nodes` are used when looking for peaks and features.
    pub fn new(
        series: IndexMap<Profile, TimeSeries>,
        nodes: &IndexSet<NodeID>,
    ) -> Result<Self> {
        let load = series
            .get(&Profile::ElectricLoad)
            .context("Missing electric load time series")?;
        for profile in Profile::iter() {
            let data = series
                .get(&profile)
                .with_context(|| format!("Missing {} time series", profile.name()))?;
            ensure!(
                data.times == load.times,
                "The times of the {} series do not match those of the electric load",
                profile.name()
            );
        }

        let mut years: IndexMap<i32, Range<usize>> = IndexMap::new();
        for (row, time) in load.times.iter().enumerate() {
            years
                .entry(time.year())
                .and_modify(|rows| rows.end = row + 1)
                .or_insert(row..row + 1);
        }
        ensure!(!years.is_empty(), "The time series contain no data");

        let load_nodes: Vec<String> = load
            .columns
            .keys()
            .filter(|node| nodes.contains(node.as_str()))
            .cloned()
            .collect();
        ensure!(
            !load_nodes.is_empty(),
            "The electric load series has no column for any node of the model"
        );

        Ok(Self {
            series,
            years,
            load_nodes,
        })
    }

    /// Read every profile from the scenario data folder
    pub fn read(
        scenario_dir: &Path,
        time_format: &str,
        names: &NodeNames,
        nodes: &IndexSet<NodeID>,
    ) -> Result<Self> {
        let series = Profile::iter()
            .map(|profile| {
                let file_path = scenario_dir.join(format!("{}.csv", profile.name()));
                Ok((profile, TimeSeries::read(&file_path, time_format, names)?))
            })
            .collect::<Result<_>>()?;

        Self::new(series, nodes)
    }

    /// The time series of a profile
    pub fn series(&self, profile: Profile) -> &TimeSeries {
        &self.series[&profile]
    }

    /// The calendar years covered by the data
    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.years.keys().copied()
    }

    /// The rows of a calendar year
    pub fn year_rows(&self, year: i32) -> Option<Range<usize>> {
        self.years.get(&year).cloned()
    }

    /// The rows of a year falling in the given months, as offsets from the start of the year
    pub fn month_offsets(&self, year: i32, months: &RangeInclusive<u32>) -> Range<usize> {
        let Some(rows) = self.year_rows(year) else {
            return 0..0;
        };
        let times = &self.series(Profile::ElectricLoad).times[rows];
        let start = times
            .iter()
            .position(|time| months.contains(&time.month()))
            .unwrap_or(times.len());
        let len = times[start..]
            .iter()
            .take_while(|time| months.contains(&time.month()))
            .count();

        start..start + len
    }

    /// The load columns of the model's nodes
    pub fn iter_load(&self) -> impl Iterator<Item = (&str, &[f64])> {
        let load = self.series(Profile::ElectricLoad);
        self.load_nodes
            .iter()
            .map(move |node| (node.as_str(), load.columns[node].as_slice()))
    }

    /// The total load over the model's nodes in a row
    pub fn load_total(&self, row: usize) -> f64 {
        self.iter_load().map(|(_, values)| values[row]).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{scenario_data, sets};
    use crate::model::sets::Sets;
    use rstest::rstest;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_read_time_series() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("electricload.csv");
        fs::write(
            &file_path,
            "time,AT,NO\n01/01/2018 00:00,1.5,2\n01/01/2018 01:00,2.5,3\n",
        )
        .unwrap();

        let series = TimeSeries::read(&file_path, "%d/%m/%Y %H:%M", &NodeNames::default()).unwrap();
        assert_eq!(series.times.len(), 2);
        assert_eq!(series.column("Austria"), Some([1.5, 2.5].as_slice()));
        // No long name for the undivided Norwegian profile
        assert_eq!(series.column("NO"), Some([2.0, 3.0].as_slice()));
    }

    #[test]
    fn test_read_time_series_unsorted() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("solar.csv");
        fs::write(
            &file_path,
            "time,AT\n01/01/2018 01:00,0.5\n01/01/2018 00:00,0.5\n",
        )
        .unwrap();
        assert!(TimeSeries::read(&file_path, "%d/%m/%Y %H:%M", &NodeNames::default()).is_err());
    }

    #[rstest]
    fn test_scenario_data_years(scenario_data: ScenarioData) {
        assert_eq!(scenario_data.years().collect::<Vec<_>>(), [2018, 2019]);
        assert_eq!(scenario_data.year_rows(2019), Some(8760..17520));

        // January to March 2018 has 90 days
        assert_eq!(scenario_data.month_offsets(2018, &(1..=3)), 0..90 * 24);
        let summer = scenario_data.month_offsets(2019, &(7..=9));
        assert_eq!(summer.len(), 92 * 24);
    }

    #[rstest]
    fn test_scenario_data_missing_profile(sets: Sets, scenario_data: ScenarioData) {
        let mut series = scenario_data.series;
        series.shift_remove(&Profile::HydroRor);
        assert!(ScenarioData::new(series, &sets.nodes).is_err());
    }
}
