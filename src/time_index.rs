//! The operational time structure: seasons and the hours belonging to each.
//!
//! A representative year consists of `N_R` regular seasons of `L_R` hours followed by `N_P` peak
//! seasons of `L_P` hours. Operational hours are numbered from 1 and each season is a contiguous
//! block of hours.
use crate::id::SeasonID;
use anyhow::{Result, ensure};
use indexmap::IndexMap;
use std::ops::RangeInclusive;

/// The number of hours in a (non-leap) year
pub const HOURS_PER_YEAR: f64 = 8760.0;

/// Whether a season represents a regular part of the year or a peak-load window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeasonKind {
    /// A block of hours sampled from a fixed part of the calendar year
    Regular,
    /// A short window centred on a load peak
    Peak,
}

/// A season in the operational time structure
#[derive(Debug, Clone, PartialEq)]
pub struct Season {
    /// Name of the season, e.g. `winter` or `peak1`
    pub id: SeasonID,
    /// Regular or peak season
    pub kind: SeasonKind,
    /// The first operational hour of the season (1-based)
    pub first_hour: u32,
    /// The number of hours in the season
    pub length: u32,
}

impl Season {
    /// The last operational hour of the season
    pub fn last_hour(&self) -> u32 {
        self.first_hour + self.length - 1
    }

    /// The operational hours of the season
    pub fn hours(&self) -> RangeInclusive<u32> {
        self.first_hour..=self.last_hour()
    }

    /// Whether this is a peak season
    pub fn is_peak(&self) -> bool {
        self.kind == SeasonKind::Peak
    }
}

/// The operational hours of a representative year and their partition into seasons
#[derive(Debug, Clone, PartialEq)]
pub struct TimeIndex {
    seasons: IndexMap<SeasonID, Season>,
    /// Season index for each hour (position `h - 1`)
    season_of_hour: Vec<usize>,
}

/// The name given to the `k`th peak season (1-based)
pub fn peak_season_name(k: u32) -> String {
    format!("peak{k}")
}

impl TimeIndex {
    /// Build the time index.
    ///
    /// # Arguments
    ///
    /// * `regular_seasons` - Names of the regular seasons, in order
    /// * `len_regular` - Hours per regular season (`L_R`)
    /// * `n_peak` - Number of peak seasons (`N_P`)
    /// * `len_peak` - Hours per peak season (`L_P`)
    pub fn new(
        regular_seasons: &[String],
        len_regular: u32,
        n_peak: u32,
        len_peak: u32,
    ) -> Result<Self> {
        ensure!(!regular_seasons.is_empty(), "At least one regular season is required");
        ensure!(len_regular > 0, "Regular seasons must contain at least one hour");
        ensure!(
            n_peak == 0 || len_peak > 0,
            "Peak seasons must contain at least one hour"
        );

        let mut seasons = IndexMap::new();
        let mut next_hour = 1;
        let mut add_season = |id: SeasonID, kind, length| -> Result<()> {
            let season = Season {
                id: id.clone(),
                kind,
                first_hour: next_hour,
                length,
            };
            next_hour += length;
            ensure!(
                seasons.insert(id.clone(), season).is_none(),
                "Duplicate season name: {id}"
            );
            Ok(())
        };

        for name in regular_seasons {
            add_season(name.as_str().into(), SeasonKind::Regular, len_regular)?;
        }
        for k in 1..=n_peak {
            add_season(peak_season_name(k).into(), SeasonKind::Peak, len_peak)?;
        }

        let season_of_hour = seasons
            .values()
            .enumerate()
            .flat_map(|(idx, season)| std::iter::repeat_n(idx, season.length as usize))
            .collect();

        Ok(Self {
            seasons,
            season_of_hour,
        })
    }

    /// The total number of operational hours, `H = N_R·L_R + N_P·L_P`
    pub fn num_hours(&self) -> u32 {
        self.season_of_hour.len() as u32
    }

    /// All operational hours, `1..=H`
    pub fn hours(&self) -> RangeInclusive<u32> {
        1..=self.num_hours()
    }

    /// Iterate over the seasons in order
    pub fn iter_seasons(&self) -> impl Iterator<Item = &Season> + Clone {
        self.seasons.values()
    }

    /// The number of seasons
    pub fn num_seasons(&self) -> usize {
        self.seasons.len()
    }

    /// Get a season by name
    pub fn get_season(&self, id: &str) -> Option<&Season> {
        self.seasons.get(id)
    }

    /// The position of the season in the ordering of seasons
    pub fn season_index(&self, id: &str) -> Option<usize> {
        self.seasons.get_index_of(id)
    }

    /// Iterate over regular seasons
    pub fn iter_regular_seasons(&self) -> impl Iterator<Item = &Season> {
        self.seasons.values().filter(|season| !season.is_peak())
    }

    /// Iterate over peak seasons
    pub fn iter_peak_seasons(&self) -> impl Iterator<Item = &Season> {
        self.seasons.values().filter(|season| season.is_peak())
    }

    /// The season to which the given hour belongs
    pub fn season_of_hour(&self, hour: u32) -> &Season {
        &self.seasons[self.season_index_of_hour(hour)]
    }

    /// Index of the season to which the given hour belongs
    pub fn season_index_of_hour(&self, hour: u32) -> usize {
        self.season_of_hour[(hour - 1) as usize]
    }

    /// Whether the hour is the first hour of any season.
    ///
    /// Constraints linking an hour to its predecessor must not be applied to these hours.
    pub fn is_first_hour(&self, hour: u32) -> bool {
        self.season_of_hour(hour).first_hour == hour
    }

    /// Whether the hour is the last hour of its season
    pub fn is_last_hour(&self, hour: u32) -> bool {
        self.season_of_hour(hour).last_hour() == hour
    }

    /// The first hours of regular seasons
    pub fn first_hours_of_regular_seasons(&self) -> Vec<u32> {
        self.iter_regular_seasons().map(|s| s.first_hour).collect()
    }

    /// The first hours of peak seasons
    pub fn first_hours_of_peak_seasons(&self) -> Vec<u32> {
        self.iter_peak_seasons().map(|s| s.first_hour).collect()
    }

    /// Iterate over every `(season, hour)` pair
    pub fn iter_hours_of_season(&self) -> impl Iterator<Item = (&Season, u32)> {
        self.seasons
            .values()
            .flat_map(|season| season.hours().map(move |hour| (season, hour)))
    }

    /// The default scaling of each season to a full year.
    ///
    /// Peak seasons represent themselves only (scale 1) and regular seasons share the remaining
    /// hours of the year.
    pub fn default_season_scale(&self) -> IndexMap<SeasonID, f64> {
        let peak_hours: u32 = self.iter_peak_seasons().map(|s| s.length).sum();
        let regular_hours: u32 = self.iter_regular_seasons().map(|s| s.length).sum();
        let regular_scale = (HOURS_PER_YEAR - f64::from(peak_hours)) / f64::from(regular_hours);

        self.seasons
            .values()
            .map(|season| {
                let scale = if season.is_peak() { 1.0 } else { regular_scale };
                (season.id.clone(), scale)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use rstest::{fixture, rstest};

    fn four_seasons() -> Vec<String> {
        ["winter", "spring", "summer", "fall"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    #[fixture]
    fn time_index() -> TimeIndex {
        TimeIndex::new(&four_seasons(), 168, 2, 24).unwrap()
    }

    #[rstest]
    fn test_num_hours(time_index: TimeIndex) {
        assert_eq!(time_index.num_hours(), 4 * 168 + 2 * 24);
        assert_eq!(time_index.num_seasons(), 6);
    }

    #[rstest]
    fn test_first_hours(time_index: TimeIndex) {
        assert_eq!(
            time_index.first_hours_of_regular_seasons(),
            [1, 169, 337, 505]
        );
        assert_eq!(time_index.first_hours_of_peak_seasons(), [673, 697]);
    }

    #[rstest]
    fn test_seasons_partition_hours(time_index: TimeIndex) {
        let hours: Vec<_> = time_index.iter_hours_of_season().map(|(_, h)| h).collect();
        let expected: Vec<_> = time_index.hours().collect();
        assert_eq!(hours, expected);

        // Consecutive hours within a season differ by one and never straddle a season start
        for (season, hour) in time_index.iter_hours_of_season() {
            if hour != season.first_hour {
                assert_eq!(time_index.season_of_hour(hour - 1).id, season.id);
            }
        }
    }

    #[rstest]
    fn test_first_and_last_hours(time_index: TimeIndex) {
        assert!(time_index.is_first_hour(169));
        assert!(!time_index.is_first_hour(170));
        assert!(time_index.is_last_hour(168));
        assert!(time_index.is_last_hour(720));
        assert_eq!(time_index.season_of_hour(700).id, "peak2".into());
    }

    #[rstest]
    fn test_default_season_scale(time_index: TimeIndex) {
        let scale = time_index.default_season_scale();
        assert_approx_eq!(f64, scale["winter"], (8760.0 - 48.0) / 672.0);
        assert_approx_eq!(f64, scale["peak1"], 1.0);

        // Scaled hours add up to a full year
        let total: f64 = time_index
            .iter_seasons()
            .map(|s| scale[&s.id] * f64::from(s.length))
            .sum();
        assert_approx_eq!(f64, total, 8760.0, epsilon = 1e-9);
    }

    #[test]
    fn test_no_peak_seasons() {
        let time_index = TimeIndex::new(&["winter".into()], 24, 0, 24).unwrap();
        assert_eq!(time_index.num_hours(), 24);
        assert!(time_index.first_hours_of_peak_seasons().is_empty());
    }

    #[test]
    fn test_duplicate_season_name() {
        assert!(TimeIndex::new(&["winter".into(), "winter".into()], 24, 0, 24).is_err());
    }
}
