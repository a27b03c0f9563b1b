//! Windows of the historical time series which make up a season of a scenario.
use super::time_series::ScenarioData;
use crate::id::SeasonID;
use crate::time_index::{Season, TimeIndex};
use anyhow::{Context, Result, bail};
use indexmap::IndexMap;
use log::warn;
use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::ops::{Range, RangeInclusive};

/// A contiguous window of historical data.
///
/// `hour` is the offset of the first row of the window from the first row of `year`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// The sampled calendar year
    pub year: i32,
    /// The offset of the window within the year
    pub hour: u32,
}

/// The calendar months sampled for a regular season
pub fn season_months(id: &SeasonID) -> Result<RangeInclusive<u32>> {
    Ok(match id.as_str() {
        "winter" => 1..=3,
        "spring" => 4..=6,
        "summer" => 7..=9,
        "fall" | "autumn" => 10..=12,
        _ => bail!("No calendar months are defined for season {id}"),
    })
}

/// The start of a window of length `len` centred on `peak`, kept within a year of `year_len` rows
fn centred_start(peak: usize, len: usize, year_len: usize) -> usize {
    peak.saturating_sub(len / 2)
        .min(year_len.saturating_sub(len))
}

/// Where windows may be placed in one year of data
#[derive(Debug, Clone, PartialEq)]
struct YearWindows {
    /// The rows of each regular season, as offsets within the year
    blocks: IndexMap<SeasonID, Range<usize>>,
    /// The starts of the windows around the overall and the single-node load peaks
    peak_starts: [usize; 2],
}

/// The feasible window positions in every year of the data
#[derive(Debug, Clone, PartialEq)]
pub struct WindowCatalogue {
    years: IndexMap<i32, YearWindows>,
}

impl WindowCatalogue {
    /// Locate the season blocks and load peaks of each year
    pub fn new(data: &ScenarioData, time_index: &TimeIndex) -> Result<Self> {
        let len_peak = time_index
            .iter_peak_seasons()
            .next()
            .map_or(0, |season| season.length as usize);

        let mut years = IndexMap::new();
        for year in data.years() {
            let rows = data.year_rows(year).context("Missing year")?;

            let mut blocks = IndexMap::new();
            for season in time_index.iter_regular_seasons() {
                let months = season_months(&season.id)?;
                blocks.insert(season.id.clone(), data.month_offsets(year, &months));
            }

            // Overall peak: the hour with the highest total load
            let overall_peak = rows
                .clone()
                .map(|row| data.load_total(row))
                .enumerate()
                .max_by(|(_, a), (_, b)| a.total_cmp(b))
                .map_or(0, |(offset, _)| offset);

            // Single-node peak: the hour of the highest load of the node with the highest maximum
            let country_peak = data
                .iter_load()
                .map(|(_, values)| {
                    values[rows.clone()]
                        .iter()
                        .enumerate()
                        .max_by(|(_, a), (_, b)| a.total_cmp(b))
                        .map_or((0, f64::NEG_INFINITY), |(offset, value)| (offset, *value))
                })
                .max_by(|(_, a), (_, b)| a.total_cmp(b))
                .map_or(0, |(offset, _)| offset);

            let peak_starts = [overall_peak, country_peak]
                .map(|peak| centred_start(peak, len_peak, rows.len()));
            years.insert(
                year,
                YearWindows {
                    blocks,
                    peak_starts,
                },
            );
        }

        Ok(Self { years })
    }

    /// The calendar years in the catalogue
    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.years.keys().copied()
    }

    /// Sample a year uniformly
    pub fn random_year(&self, rng: &mut StdRng) -> i32 {
        let years: Vec<_> = self.years().collect();
        *years.choose(rng).unwrap_or(&0)
    }

    /// The window for a peak season in the given year.
    ///
    /// The first peak season is centred on the system-wide load peak and the second on the
    /// single-node peak.
    pub fn peak_window(&self, year: i32, time_index: &TimeIndex, season: &Season) -> Result<Window> {
        let k = time_index
            .iter_peak_seasons()
            .position(|peak| peak.id == season.id)
            .with_context(|| format!("{} is not a peak season", season.id))?;
        let windows = self.years.get(&year).with_context(|| format!("No data for year {year}"))?;
        let start = windows
            .peak_starts
            .get(k)
            .with_context(|| format!("No peak is defined for season {}", season.id))?;

        Ok(Window {
            year,
            hour: *start as u32,
        })
    }

    /// The rows of a regular season in a year, as offsets within the year
    pub fn season_block(&self, year: i32, season: &Season) -> Result<Range<usize>> {
        self.years
            .get(&year)
            .and_then(|windows| windows.blocks.get(&season.id))
            .cloned()
            .with_context(|| format!("No data for season {} in year {year}", season.id))
    }

    /// Sample a uniform window start within a regular season of a year.
    ///
    /// If the season is too short to hold a full window, the window starts at the beginning of
    /// the season.
    pub fn sample_regular(&self, rng: &mut StdRng, year: i32, season: &Season) -> Result<Window> {
        let block = self.season_block(year, season)?;
        let len = season.length as usize;
        let offset = if block.len() < len {
            warn!(
                "Season {} of {year} has only {} hours, fewer than the {len} required",
                season.id,
                block.len()
            );
            0
        } else {
            rng.gen_range(0..=block.len() - len)
        };

        Ok(Window {
            year,
            hour: (block.start + offset) as u32,
        })
    }

    /// Draw a window for any season, sampling the year uniformly
    pub fn sample_uniform(
        &self,
        rng: &mut StdRng,
        time_index: &TimeIndex,
        season: &Season,
    ) -> Result<Window> {
        let year = self.random_year(rng);
        if season.is_peak() {
            self.peak_window(year, time_index, season)
        } else {
            self.sample_regular(rng, year, season)
        }
    }

    /// Every window of a regular season starting `stride` hours apart, in every year.
    ///
    /// Years in which the season is too short to hold a full window are skipped.
    pub fn candidate_windows(&self, season: &Season, stride: u32) -> Vec<Window> {
        let len = season.length as usize;
        let mut candidates = Vec::new();
        for (year, windows) in &self.years {
            let Some(block) = windows.blocks.get(&season.id) else {
                continue;
            };
            if block.len() < len {
                warn!(
                    "Skipping {year} as a candidate for season {}: only {} hours available",
                    season.id,
                    block.len()
                );
                continue;
            }

            candidates.extend(
                (block.start..=block.end - len)
                    .step_by(stride.max(1) as usize)
                    .map(|start| Window {
                        year: *year,
                        hour: start as u32,
                    }),
            );
        }

        candidates
    }
}
