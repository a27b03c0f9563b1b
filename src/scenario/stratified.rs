//! Stratification of candidate windows by K-means clustering of summary features.
//!
//! Each window is described by the Wasserstein distance between its hourly total load and the
//! hourly total load of its whole year, and by the mean of its total load.
use super::time_series::ScenarioData;
use super::window::Window;
use indexmap::IndexMap;
use rand::Rng;
use rand::rngs::StdRng;

/// The maximum number of Lloyd iterations
const MAX_ITERATIONS: usize = 100;

/// The total load over the model's nodes for each hour of a window
pub fn window_totals(data: &ScenarioData, window: &Window, len: u32) -> Vec<f64> {
    let Some(rows) = data.year_rows(window.year) else {
        return Vec::new();
    };
    let start = rows.start + window.hour as usize;
    (start..start + len as usize)
        .map(|row| data.load_total(row))
        .collect()
}

/// The Wasserstein-1 distance between two empirical distributions.
///
/// Computed as the area between the two quantile functions.
pub fn wasserstein_distance(a: &[f64], b: &[f64]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let mut a = a.to_vec();
    let mut b = b.to_vec();
    a.sort_by(f64::total_cmp);
    b.sort_by(f64::total_cmp);

    let (n, m) = (a.len(), b.len());
    let (mut i, mut j) = (0, 0);
    let mut level = 0.0;
    let mut distance = 0.0;
    while i < n && j < m {
        let next_a = (i + 1) as f64 / n as f64;
        let next_b = (j + 1) as f64 / m as f64;
        let next = next_a.min(next_b);
        distance += (next - level) * (a[i] - b[j]).abs();
        level = next;
        if next_a <= next {
            i += 1;
        }
        if next_b <= next {
            j += 1;
        }
    }

    distance
}

/// Scale each feature to zero mean and unit variance.
///
/// Constant features are only centred.
pub fn standardise(points: &mut [Vec<f64>]) {
    let Some(dim) = points.first().map(Vec::len) else {
        return;
    };
    let n = points.len() as f64;
    for d in 0..dim {
        let mean = points.iter().map(|p| p[d]).sum::<f64>() / n;
        let var = points.iter().map(|p| (p[d] - mean).powi(2)).sum::<f64>() / n;
        let std = if var > 0.0 { var.sqrt() } else { 1.0 };
        for point in points.iter_mut() {
            point[d] = (point[d] - mean) / std;
        }
    }
}

/// The two standardised features of each candidate window
pub fn kmeans_features(data: &ScenarioData, candidates: &[Window], len: u32) -> Vec<Vec<f64>> {
    let mut year_totals: IndexMap<i32, Vec<f64>> = IndexMap::new();
    let mut features: Vec<Vec<f64>> = candidates
        .iter()
        .map(|window| {
            let annual = year_totals.entry(window.year).or_insert_with(|| {
                data.year_rows(window.year)
                    .map(|rows| rows.map(|row| data.load_total(row)).collect())
                    .unwrap_or_default()
            });
            let totals = window_totals(data, window, len);
            let mean = totals.iter().sum::<f64>() / totals.len().max(1) as f64;
            vec![wasserstein_distance(&totals, annual), mean]
        })
        .collect();
    standardise(&mut features);

    features
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

/// The index of the nearest centre and the squared distance to it
fn nearest(point: &[f64], centres: &[Vec<f64>]) -> (usize, f64) {
    centres
        .iter()
        .map(|centre| squared_distance(point, centre))
        .enumerate()
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .unwrap_or((0, 0.0))
}

/// Choose initial centres by k-means++ seeding
fn initial_centres(rng: &mut StdRng, points: &[Vec<f64>], k: usize) -> Vec<Vec<f64>> {
    let mut centres = vec![points[rng.gen_range(0..points.len())].clone()];
    while centres.len() < k {
        let weights: Vec<f64> = points.iter().map(|p| nearest(p, &centres).1).collect();
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            // All remaining points coincide with a centre
            break;
        }

        let mut target = rng.r#gen::<f64>() * total;
        let mut chosen = points.len() - 1;
        for (idx, weight) in weights.iter().enumerate() {
            if target < *weight {
                chosen = idx;
                break;
            }
            target -= weight;
        }
        centres.push(points[chosen].clone());
    }

    centres
}

/// Cluster points with Lloyd's algorithm, returning the cluster of each point
pub fn kmeans(rng: &mut StdRng, points: &[Vec<f64>], k: usize) -> Vec<usize> {
    if points.is_empty() {
        return Vec::new();
    }

    let mut centres = initial_centres(rng, points, k.min(points.len()));
    let mut labels = vec![0; points.len()];
    for iteration in 0..MAX_ITERATIONS {
        let mut changed = false;
        for (label, point) in labels.iter_mut().zip(points) {
            let (nearest_centre, _) = nearest(point, &centres);
            if *label != nearest_centre {
                *label = nearest_centre;
                changed = true;
            }
        }
        if !changed && iteration > 0 {
            break;
        }

        for (c, centre) in centres.iter_mut().enumerate() {
            let members: Vec<_> = points
                .iter()
                .zip(&labels)
                .filter(|(_, label)| **label == c)
                .map(|(point, _)| point)
                .collect();
            if members.is_empty() {
                continue;
            }
            for (d, value) in centre.iter_mut().enumerate() {
                *value = members.iter().map(|p| p[d]).sum::<f64>() / members.len() as f64;
            }
        }
    }

    labels
}

/// Assign each candidate window to one of `k` clusters of windows with similar features
pub fn kmeans_labels(
    rng: &mut StdRng,
    data: &ScenarioData,
    candidates: &[Window],
    len: u32,
    k: usize,
) -> Vec<i32> {
    let features = kmeans_features(data, candidates, len);
    kmeans(rng, &features, k)
        .into_iter()
        .map(|label| label as i32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use rand::SeedableRng;
    use rstest::rstest;

    #[rstest]
    #[case(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0], 0.0)]
    #[case(&[0.0], &[5.0], 5.0)]
    #[case(&[0.0, 1.0], &[2.0, 3.0], 2.0)]
    #[case(&[0.0, 10.0], &[0.0], 5.0)]
    fn test_wasserstein_distance(#[case] a: &[f64], #[case] b: &[f64], #[case] expected: f64) {
        assert_approx_eq!(f64, wasserstein_distance(a, b), expected);
    }

    #[test]
    fn test_standardise() {
        let mut points = vec![vec![1.0, 5.0], vec![3.0, 5.0]];
        standardise(&mut points);
        assert_eq!(points, [[-1.0, 0.0], [1.0, 0.0]]);
    }

    #[test]
    fn test_kmeans_separates_groups() {
        let points: Vec<Vec<f64>> = [0.0, 0.1, 0.2, 10.0, 10.1, 10.2]
            .iter()
            .map(|x| vec![*x, -x])
            .collect();
        let mut rng = StdRng::seed_from_u64(0);
        let labels = kmeans(&mut rng, &points, 2);
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[1], labels[2]);
        assert_eq!(labels[3], labels[4]);
        assert_eq!(labels[4], labels[5]);
        assert_ne!(labels[0], labels[3]);
    }

    #[test]
    fn test_kmeans_identical_points() {
        let points = vec![vec![1.0]; 4];
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(kmeans(&mut rng, &points, 3), [0, 0, 0, 0]);
    }
}
