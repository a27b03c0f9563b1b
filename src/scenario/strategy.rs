//! Strategies for choosing the historical window of each season.
use super::key::SamplingKey;
use super::stratified::kmeans_labels;
use super::time_series::ScenarioData;
use super::voronoi::voronoi_labels;
use super::window::{Window, WindowCatalogue};
use crate::id::SeasonID;
use crate::model::config::{FilterMethod, RunConfig};
use crate::time_index::{Season, TimeIndex};
use anyhow::{Context, Result};
use indexmap::IndexMap;
use itertools::iproduct;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Chooses a window for a season of a scenario
pub trait WindowSampler {
    /// Draw the window for the given period, scenario and season
    fn draw_window(
        &mut self,
        rng: &mut StdRng,
        period: u32,
        scenario: u32,
        season: &Season,
    ) -> Result<Window>;
}

/// Draw a window for every period, scenario and season, giving a sampling key
pub fn draw_windows(
    sampler: &mut dyn WindowSampler,
    rng: &mut StdRng,
    config: &RunConfig,
    time_index: &TimeIndex,
) -> Result<SamplingKey> {
    let mut key = SamplingKey::default();
    for (period, scenario) in iproduct!(config.periods(), config.scenarios()) {
        for season in time_index.iter_seasons() {
            let window = sampler.draw_window(rng, period, scenario, season)?;
            key.insert(period, scenario, season.id.clone(), window);
        }
    }

    Ok(key)
}

/// Samples the year and the window start uniformly
pub struct UniformSampler<'a> {
    catalogue: &'a WindowCatalogue,
    time_index: &'a TimeIndex,
}

impl<'a> UniformSampler<'a> {
    /// Create a sampler over the windows of a catalogue
    pub fn new(catalogue: &'a WindowCatalogue, time_index: &'a TimeIndex) -> Self {
        Self {
            catalogue,
            time_index,
        }
    }
}

impl WindowSampler for UniformSampler<'_> {
    fn draw_window(&mut self, rng: &mut StdRng, _: u32, _: u32, season: &Season) -> Result<Window> {
        self.catalogue.sample_uniform(rng, self.time_index, season)
    }
}

/// Reproduces the windows of an existing key
pub struct FixedSampler<'a> {
    key: &'a SamplingKey,
}

impl<'a> FixedSampler<'a> {
    /// Create a sampler which looks windows up in a key
    pub fn new(key: &'a SamplingKey) -> Self {
        Self { key }
    }
}

impl WindowSampler for FixedSampler<'_> {
    fn draw_window(
        &mut self,
        _: &mut StdRng,
        period: u32,
        scenario: u32,
        season: &Season,
    ) -> Result<Window> {
        self.key.get(period, scenario, &season.id)
    }
}

/// The candidate windows of a regular season, grouped into strata
#[derive(Debug)]
struct SeasonStrata {
    strata: Vec<Vec<Window>>,
    /// The number of draws made so far
    draws: usize,
}

/// Draws regular-season windows round-robin over clusters of similar candidate windows.
///
/// Peak seasons are sampled uniformly.
pub struct StratifiedSampler<'a> {
    catalogue: &'a WindowCatalogue,
    time_index: &'a TimeIndex,
    seasons: IndexMap<SeasonID, SeasonStrata>,
}

impl<'a> StratifiedSampler<'a> {
    /// Cluster the candidate windows of each regular season with the configured filter
    pub fn new(
        rng: &mut StdRng,
        data: &ScenarioData,
        catalogue: &'a WindowCatalogue,
        time_index: &'a TimeIndex,
        config: &RunConfig,
    ) -> Result<Self> {
        let options = &config.scenario_generation;
        let n_cluster = options.n_cluster.max(1) as usize;

        let mut seasons = IndexMap::new();
        for season in time_index.iter_regular_seasons() {
            let candidates = catalogue.candidate_windows(season, options.window_stride);
            let labels = match options.filter {
                FilterMethod::Voronoi => voronoi_labels(
                    rng,
                    data,
                    &candidates,
                    season.length,
                    n_cluster,
                    options.voronoi_percentile,
                ),
                _ => kmeans_labels(rng, data, &candidates, season.length, n_cluster),
            };

            let mut strata: IndexMap<i32, Vec<Window>> = IndexMap::new();
            for (window, label) in candidates.into_iter().zip(labels) {
                strata.entry(label).or_default().push(window);
            }
            strata.sort_keys();
            debug!(
                "Season {}: {} strata of sizes {:?}",
                season.id,
                strata.len(),
                strata.values().map(Vec::len).collect::<Vec<_>>()
            );

            seasons.insert(
                season.id.clone(),
                SeasonStrata {
                    strata: strata.into_values().collect(),
                    draws: 0,
                },
            );
        }
        info!("Built strata for {} regular seasons", seasons.len());

        Ok(Self {
            catalogue,
            time_index,
            seasons,
        })
    }
}

impl WindowSampler for StratifiedSampler<'_> {
    fn draw_window(&mut self, rng: &mut StdRng, _: u32, _: u32, season: &Season) -> Result<Window> {
        if season.is_peak() {
            return self.catalogue.sample_uniform(rng, self.time_index, season);
        }

        let strata = self
            .seasons
            .get_mut(&season.id)
            .with_context(|| format!("No candidate windows for season {}", season.id))?;
        if strata.strata.is_empty() {
            // No year can hold a full window, so fall back to a (truncated) uniform draw
            return self.catalogue.sample_uniform(rng, self.time_index, season);
        }

        let stratum = &strata.strata[strata.draws % strata.strata.len()];
        strata.draws += 1;
        stratum
            .choose(rng)
            .copied()
            .context("Empty stratum")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{config, scenario_data, time_index};
    use rand::SeedableRng;
    use rstest::rstest;

    #[rstest]
    fn test_uniform_draw_is_reproducible(
        scenario_data: ScenarioData,
        time_index: TimeIndex,
        config: RunConfig,
    ) {
        let catalogue = WindowCatalogue::new(&scenario_data, &time_index).unwrap();
        let draw = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut sampler = UniformSampler::new(&catalogue, &time_index);
            draw_windows(&mut sampler, &mut rng, &config, &time_index).unwrap()
        };

        let key = draw(42);
        // Two periods, two scenarios and three seasons
        assert_eq!(key.len(), 12);
        assert_eq!(draw(42), key);
    }

    #[rstest]
    fn test_fixed_sampler(scenario_data: ScenarioData, time_index: TimeIndex, config: RunConfig) {
        let catalogue = WindowCatalogue::new(&scenario_data, &time_index).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let key = draw_windows(
            &mut UniformSampler::new(&catalogue, &time_index),
            &mut rng,
            &config,
            &time_index,
        )
        .unwrap();

        let copy = draw_windows(&mut FixedSampler::new(&key), &mut rng, &config, &time_index)
            .unwrap();
        assert_eq!(copy, key);

        // A key lacking entries cannot be reproduced
        let empty = SamplingKey::default();
        assert!(
            draw_windows(&mut FixedSampler::new(&empty), &mut rng, &config, &time_index).is_err()
        );
    }

    #[rstest]
    fn test_stratified_round_robin(
        scenario_data: ScenarioData,
        time_index: TimeIndex,
        mut config: RunConfig,
    ) {
        config.scenario_generation.filter = FilterMethod::KMeans;
        config.scenario_generation.n_cluster = 2;
        let catalogue = WindowCatalogue::new(&scenario_data, &time_index).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let mut sampler =
            StratifiedSampler::new(&mut rng, &scenario_data, &catalogue, &time_index, &config)
                .unwrap();

        let winter = time_index.get_season("winter").unwrap();
        let strata = &sampler.seasons[&winter.id].strata;
        assert_eq!(strata.len(), 2);
        let first: Vec<_> = strata[0].clone();
        let second: Vec<_> = strata[1].clone();

        // Consecutive draws alternate between the strata
        let a = sampler.draw_window(&mut rng, 1, 1, winter).unwrap();
        let b = sampler.draw_window(&mut rng, 1, 2, winter).unwrap();
        assert!(first.contains(&a));
        assert!(second.contains(&b));
    }
}
