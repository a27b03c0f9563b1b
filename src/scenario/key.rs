//! The sampling key: the historical window chosen for each period, scenario and season.
use super::window::Window;
use crate::id::SeasonID;
use crate::input::{input_err_msg, parse_scenario_label, scenario_label};
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The file name of a sampling key
pub const SAMPLING_KEY_FILE_NAME: &str = "sampling_key.csv";

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
struct KeyRow {
    period: u32,
    scenario: String,
    season: String,
    year: i32,
    hour: u32,
}

/// Maps `(period, scenario, season)` to a window of historical data
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SamplingKey(IndexMap<(u32, u32, SeasonID), Window>);

impl SamplingKey {
    /// Add the window for a period, scenario and season
    pub fn insert(&mut self, period: u32, scenario: u32, season: SeasonID, window: Window) {
        self.0.insert((period, scenario, season), window);
    }

    /// The window for a period, scenario and season, or an error if there is no entry
    pub fn get(&self, period: u32, scenario: u32, season: &SeasonID) -> Result<Window> {
        self.0
            .get(&(period, scenario, season.clone()))
            .copied()
            .with_context(|| {
                format!(
                    "No entry in sampling key for period {period}, {} and season {season}",
                    scenario_label(scenario)
                )
            })
    }

    /// Iterate over the entries of the key
    pub fn iter(&self) -> impl Iterator<Item = (&(u32, u32, SeasonID), &Window)> {
        self.0.iter()
    }

    /// The number of entries in the key
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the key is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Read a key from a CSV file
    pub fn read(file_path: &Path) -> Result<Self> {
        let read = || -> Result<Self> {
            let mut key = Self::default();
            for row in csv::Reader::from_path(file_path)?.into_deserialize() {
                let row: KeyRow = row?;
                let scenario = parse_scenario_label(&row.scenario)?;
                let season: SeasonID = row.season.trim().into();
                ensure!(
                    !key.0.contains_key(&(row.period, scenario, season.clone())),
                    "Duplicate entry for period {}, {} and season {season}",
                    row.period,
                    row.scenario
                );
                key.insert(
                    row.period,
                    scenario,
                    season,
                    Window {
                        year: row.year,
                        hour: row.hour,
                    },
                );
            }
            Ok(key)
        };

        read().with_context(|| input_err_msg(file_path))
    }

    /// Write the key to a CSV file
    pub fn write(&self, file_path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(file_path)?;
        for ((period, scenario, season), window) in &self.0 {
            writer.serialize(KeyRow {
                period: *period,
                scenario: scenario_label(*scenario),
                season: season.to_string(),
                year: window.year,
                hour: window.hour,
            })?;
        }
        writer.flush()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_read_key() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(SAMPLING_KEY_FILE_NAME);
        fs::write(
            &file_path,
            "Period,Scenario,Season,Year,Hour\n1,scenario1,winter,2018,48\n1,scenario2,peak1,2019,222\n",
        )
        .unwrap();

        let key = SamplingKey::read(&file_path).unwrap();
        assert_eq!(key.len(), 2);
        assert_eq!(
            key.get(1, 2, &"peak1".into()).unwrap(),
            Window {
                year: 2019,
                hour: 222
            }
        );
        assert!(key.get(2, 1, &"winter".into()).is_err());
    }

    #[test]
    fn test_read_key_duplicate() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(SAMPLING_KEY_FILE_NAME);
        fs::write(
            &file_path,
            "Period,Scenario,Season,Year,Hour\n1,scenario1,winter,2018,48\n1,scenario1,winter,2019,0\n",
        )
        .unwrap();
        assert!(SamplingKey::read(&file_path).is_err());
    }

    #[test]
    fn test_write_then_read_key() {
        let mut key = SamplingKey::default();
        key.insert(1, 1, "winter".into(), Window { year: 2018, hour: 0 });
        key.insert(2, 3, "peak2".into(), Window { year: 2019, hour: 4000 });

        let dir = tempdir().unwrap();
        let file_path = dir.path().join(SAMPLING_KEY_FILE_NAME);
        key.write(&file_path).unwrap();
        assert_eq!(SamplingKey::read(&file_path).unwrap(), key);
    }
}
