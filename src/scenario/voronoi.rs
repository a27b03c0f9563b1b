//! Stratification of candidate windows by Voronoi prototypes in principal-component space.
//!
//! The flattened load windows are projected onto their leading principal components. Vertices of
//! the Voronoi diagram of the projected windows are the centres of empty circumspheres of
//! Delaunay simplices; those with the smallest clearance radius lie in the densest regions and
//! serve as prototypes. Windows far from every prototype form a stratum of their own.
use super::stratified::kmeans_labels;
use super::time_series::ScenarioData;
use super::window::Window;
use itertools::Itertools;
use log::{info, warn};
use nalgebra::{DMatrix, DVector, SymmetricEigen};
use rand::rngs::StdRng;
use std::collections::HashSet;

/// The number of principal components kept
const NUM_COMPONENTS: usize = 4;

/// Relative tolerance for points lying on a circumsphere
const SPHERE_TOLERANCE: f64 = 1e-9;

/// Vertices closer than this are treated as the same vertex
const VERTEX_TOLERANCE: f64 = 1e-6;

/// The label of windows which are far from every prototype
pub const SINGLETON: i32 = -1;

/// The load of every model node over the window, concatenated
fn flattened_window(data: &ScenarioData, window: &Window, len: u32) -> Vec<f64> {
    let Some(rows) = data.year_rows(window.year) else {
        return Vec::new();
    };
    let start = rows.start + window.hour as usize;
    data.iter_load()
        .flat_map(|(_, values)| values[start..start + len as usize].iter().copied())
        .collect()
}

/// Project the rows of `x` onto their leading principal components.
///
/// The scores are found from the eigendecomposition of the Gram matrix of the centred data,
/// which is small when there are fewer windows than features.
pub fn principal_components(x: &DMatrix<f64>, num_components: usize) -> DMatrix<f64> {
    let (n, _) = x.shape();
    let mut centred = x.clone();
    for mut column in centred.column_iter_mut() {
        let mean = column.mean();
        column.add_scalar_mut(-mean);
    }

    let gram = &centred * centred.transpose();
    let eigen = SymmetricEigen::new(gram);
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|a, b| eigen.eigenvalues[*b].total_cmp(&eigen.eigenvalues[*a]));

    let num_components = num_components.min(n);
    let mut scores = DMatrix::zeros(n, num_components);
    for (k, idx) in order.into_iter().take(num_components).enumerate() {
        let scale = eigen.eigenvalues[idx].max(0.0).sqrt();
        scores.set_column(k, &(eigen.eigenvectors.column(idx) * scale));
    }

    scores
}

/// The centre and squared radius of the sphere through `points`, if they are affinely independent
fn circumsphere(points: &[DVector<f64>]) -> Option<(DVector<f64>, f64)> {
    let origin = &points[0];
    let dim = origin.len();
    let mut a = DMatrix::zeros(dim, dim);
    let mut b = DVector::zeros(dim);
    for (row, point) in points[1..].iter().enumerate() {
        a.set_row(row, &(2.0 * (point - origin)).transpose());
        b[row] = point.norm_squared() - origin.norm_squared();
    }

    let centre = a.lu().solve(&b)?;
    if !centre.iter().all(|value| value.is_finite()) {
        return None;
    }
    let radius_sq = (&centre - origin).norm_squared();

    Some((centre, radius_sq))
}

/// Vertices of the Voronoi diagram of `points`, with their clearance radius.
///
/// Simplices are enumerated among each point's nearest neighbours, so vertices of large,
/// sparse cells may be missed.
pub fn voronoi_vertices(points: &[DVector<f64>]) -> Vec<(DVector<f64>, f64)> {
    let Some(dim) = points.first().map(DVector::len) else {
        return Vec::new();
    };
    let num_neighbours = (2 * (dim + 1)).min(points.len().saturating_sub(1));
    if num_neighbours < dim {
        return Vec::new();
    }

    let mut seen = HashSet::new();
    let mut vertices: Vec<(DVector<f64>, f64)> = Vec::new();
    for (p, point) in points.iter().enumerate() {
        let neighbours: Vec<usize> = (0..points.len())
            .filter(|q| *q != p)
            .sorted_by(|a, b| {
                (&points[*a] - point)
                    .norm_squared()
                    .total_cmp(&(&points[*b] - point).norm_squared())
            })
            .take(num_neighbours)
            .collect();

        for combination in neighbours.into_iter().combinations(dim) {
            let mut simplex: Vec<usize> = combination;
            simplex.push(p);
            simplex.sort_unstable();
            if !seen.insert(simplex.clone()) {
                continue;
            }

            let corners: Vec<DVector<f64>> = simplex.iter().map(|idx| points[*idx].clone()).collect();
            let Some((centre, radius_sq)) = circumsphere(&corners) else {
                continue;
            };
            let tolerance = SPHERE_TOLERANCE * radius_sq.max(1.0);
            let is_empty = points
                .iter()
                .all(|q| (q - &centre).norm_squared() >= radius_sq - tolerance);
            let is_new = vertices
                .iter()
                .all(|(vertex, _)| (vertex - &centre).norm() > VERTEX_TOLERANCE);
            if is_empty && is_new {
                vertices.push((centre, radius_sq.sqrt()));
            }
        }
    }

    vertices
}

/// The `q`-quantile of a set of values, by linear interpolation
fn quantile(values: &[f64], q: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let Some(last) = sorted.len().checked_sub(1) else {
        return 0.0;
    };

    let position = q.clamp(0.0, 1.0) * last as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (position - lower as f64)
}

/// Assign each candidate window to its nearest Voronoi prototype, or to [`SINGLETON`].
///
/// Falls back to K-means clustering if no Voronoi vertex can be found.
pub fn voronoi_labels(
    rng: &mut StdRng,
    data: &ScenarioData,
    candidates: &[Window],
    len: u32,
    n_cluster: usize,
    percentile: f64,
) -> Vec<i32> {
    let flattened: Vec<Vec<f64>> = candidates
        .iter()
        .map(|window| flattened_window(data, window, len))
        .collect();
    let num_features = flattened.first().map_or(0, Vec::len);
    if num_features == 0 {
        return vec![0; candidates.len()];
    }

    let x = DMatrix::from_row_iterator(
        candidates.len(),
        num_features,
        flattened.into_iter().flatten(),
    );
    let scores = principal_components(&x, NUM_COMPONENTS);
    let points: Vec<DVector<f64>> = scores
        .row_iter()
        .map(|row| row.transpose().into_owned())
        .collect();

    let mut vertices = voronoi_vertices(&points);
    if vertices.is_empty() {
        warn!("No Voronoi vertices found; falling back to K-means stratification");
        return kmeans_labels(rng, data, candidates, len, n_cluster);
    }
    vertices.sort_by(|(_, a), (_, b)| a.total_cmp(b));
    vertices.truncate(n_cluster);
    info!("Using {} Voronoi prototypes", vertices.len());

    let nearest: Vec<(usize, f64)> = points
        .iter()
        .map(|point| {
            vertices
                .iter()
                .map(|(vertex, _)| (point - vertex).norm())
                .enumerate()
                .min_by(|(_, a), (_, b)| a.total_cmp(b))
                .unwrap_or((0, 0.0))
        })
        .collect();
    let distances: Vec<f64> = nearest.iter().map(|(_, distance)| *distance).collect();
    let threshold = quantile(&distances, percentile);

    nearest
        .into_iter()
        .map(|(prototype, distance)| {
            if distance > threshold {
                SINGLETON
            } else {
                prototype as i32
            }
        })
        .collect()
}
