//! Selection of the scenario tree whose sampled load best matches the historical load moments.
use super::key::SamplingKey;
use super::time_series::ScenarioData;
use super::window::season_months;
use crate::time_index::TimeIndex;
use anyhow::Result;
use log::{debug, info};

/// The first four moments of a sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Moments {
    /// Mean
    pub mean: f64,
    /// Standard deviation
    pub std: f64,
    /// Skewness
    pub skewness: f64,
    /// Kurtosis (not excess)
    pub kurtosis: f64,
}

impl Moments {
    /// Compute the moments of a sample
    pub fn of(values: &[f64]) -> Self {
        let n = values.len().max(1) as f64;
        let mean = values.iter().sum::<f64>() / n;
        let central = |power| values.iter().map(|v| (v - mean).powi(power)).sum::<f64>() / n;
        let var = central(2);
        let std = var.sqrt();
        let (skewness, kurtosis) = if var > 0.0 {
            (central(3) / std.powi(3), central(4) / var.powi(2))
        } else {
            (0.0, 0.0)
        };

        Self {
            mean,
            std,
            skewness,
            kurtosis,
        }
    }

    /// Deviation from the true moments: relative for mean and standard deviation, absolute for
    /// skewness and kurtosis
    pub fn deviation_from(&self, truth: &Moments) -> f64 {
        let relative = |sample: f64, truth: f64| {
            if truth == 0.0 {
                sample.abs()
            } else {
                ((sample - truth) / truth).abs()
            }
        };

        relative(self.mean, truth.mean)
            + relative(self.std, truth.std)
            + (self.skewness - truth.skewness).abs()
            + (self.kurtosis - truth.kurtosis).abs()
    }
}

/// The historical load moments of each regular season and node, with the node's share of the
/// season's mean load
struct TrueMoments(Vec<(usize, Vec<(Moments, f64)>)>);

impl TrueMoments {
    fn new(data: &ScenarioData, time_index: &TimeIndex) -> Result<Self> {
        let mut seasons = Vec::new();
        for (s, season) in time_index.iter_seasons().enumerate() {
            if season.is_peak() {
                continue;
            }
            let months = season_months(&season.id)?;

            let mut nodes = Vec::new();
            for (_, values) in data.iter_load() {
                let sample: Vec<f64> = data
                    .years()
                    .flat_map(|year| {
                        let start = data.year_rows(year).map_or(0, |rows| rows.start);
                        let offsets = data.month_offsets(year, &months);
                        values[start + offsets.start..start + offsets.end].iter().copied()
                    })
                    .collect();
                nodes.push(Moments::of(&sample));
            }

            let total_mean: f64 = nodes.iter().map(|moments| moments.mean).sum();
            let weighted = nodes
                .into_iter()
                .map(|moments| {
                    let share = if total_mean > 0.0 {
                        moments.mean / total_mean
                    } else {
                        0.0
                    };
                    (moments, share)
                })
                .collect();
            seasons.push((s, weighted));
        }

        Ok(Self(seasons))
    }
}

/// The weighted deviation of a tree's sampled load from the historical moments
fn tree_deviation(key: &SamplingKey, data: &ScenarioData, time_index: &TimeIndex, truth: &TrueMoments) -> f64 {
    let mut deviation = 0.0;
    for (s, nodes) in &truth.0 {
        let season = time_index.iter_seasons().nth(*s);
        let Some(season) = season else {
            continue;
        };

        for ((_, values), (true_moments, share)) in data.iter_load().zip(nodes) {
            let sample: Vec<f64> = key
                .iter()
                .filter(|((_, _, id), _)| *id == season.id)
                .flat_map(|(_, window)| {
                    let start = data.year_rows(window.year).map_or(0, |rows| rows.start)
                        + window.hour as usize;
                    let end = (start + season.length as usize).min(values.len());
                    values[start.min(end)..end].iter().copied()
                })
                .collect();
            deviation += share * Moments::of(&sample).deviation_from(true_moments);
        }
    }

    deviation
}

/// Choose the tree whose sampled load best matches the historical load.
///
/// Trees are compared over the regular seasons only.
pub fn choose_tree(
    trees: Vec<SamplingKey>,
    data: &ScenarioData,
    time_index: &TimeIndex,
) -> Result<SamplingKey> {
    let truth = TrueMoments::new(data, time_index)?;

    let mut best: Option<(f64, SamplingKey)> = None;
    for (idx, tree) in trees.into_iter().enumerate() {
        let deviation = tree_deviation(&tree, data, time_index, &truth);
        debug!("Candidate tree {idx}: moment deviation {deviation}");
        if best.as_ref().is_none_or(|(lowest, _)| deviation < *lowest) {
            best = Some((deviation, tree));
        }
    }

    let (deviation, tree) = best.unwrap_or_default();
    info!("Chose scenario tree with moment deviation {deviation}");

    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{scenario_data, time_index};
    use crate::scenario::window::{Window, WindowCatalogue};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[test]
    fn test_moments() {
        let moments = Moments::of(&[1.0, 2.0, 3.0, 4.0]);
        assert_approx_eq!(f64, moments.mean, 2.5);
        assert_approx_eq!(f64, moments.std, 1.25f64.sqrt());
        assert_approx_eq!(f64, moments.skewness, 0.0);
        assert_approx_eq!(f64, moments.kurtosis, 1.64);

        let constant = Moments::of(&[3.0; 5]);
        assert_eq!(constant.std, 0.0);
        assert_eq!(constant.kurtosis, 0.0);
    }

    #[test]
    fn test_deviation() {
        let truth = Moments {
            mean: 100.0,
            std: 10.0,
            skewness: 0.5,
            kurtosis: 3.0,
        };
        let sample = Moments {
            mean: 110.0,
            std: 5.0,
            skewness: 0.0,
            kurtosis: 3.5,
        };
        assert_approx_eq!(f64, sample.deviation_from(&truth), 0.1 + 0.5 + 0.5 + 0.5);
        assert_approx_eq!(f64, truth.deviation_from(&truth), 0.0);
    }

    #[rstest]
    fn test_choose_tree(scenario_data: ScenarioData, time_index: TimeIndex) {
        let catalogue = WindowCatalogue::new(&scenario_data, &time_index).unwrap();
        let winter = time_index.get_season("winter").unwrap();
        let summer = time_index.get_season("summer").unwrap();

        // A tree which samples the peak hour of the year for winter matches badly
        let mut extreme = SamplingKey::default();
        extreme.insert(1, 1, winter.id.clone(), Window { year: 2018, hour: 222 });
        let summer_start = catalogue.season_block(2018, summer).unwrap().start as u32;
        extreme.insert(1, 1, summer.id.clone(), Window { year: 2018, hour: summer_start });

        let mut typical = SamplingKey::default();
        typical.insert(1, 1, winter.id.clone(), Window { year: 2018, hour: 24 * 40 });
        typical.insert(1, 1, summer.id.clone(), Window { year: 2018, hour: summer_start });

        let chosen =
            choose_tree(vec![extreme, typical.clone()], &scenario_data, &time_index).unwrap();
        assert_eq!(chosen, typical);
    }
}
