//! Integration tests for loading the demo model.
use empire::model::Model;
use float_cmp::assert_approx_eq;

mod demo;
use demo::get_demo_dir;

/// An integration test which loads the demo model with its shipped stochastic tables
#[test]
fn test_model_from_path() {
    let model = Model::from_path(get_demo_dir()).unwrap();

    assert_eq!(model.config.num_periods(), 3);
    assert_eq!(model.sets.nodes.len(), 2);
    assert_eq!(model.sets.arcs.len(), 1);
    assert_eq!(model.sets.directional_links.len(), 2);

    // Four regular days and two twelve-hour peaks
    assert_eq!(model.time_index.num_seasons(), 6);
    assert_eq!(model.time_index.num_hours(), 4 * 24 + 2 * 12);

    // Every hour of every scenario and period has a load for both nodes
    assert_eq!(model.data.stochastic.load_raw.len(), 2 * 120 * 2 * 3);
    assert!(model.data.stochastic.hydro_seasonal_raw.is_empty());

    let scale = model.time_index.default_season_scale();
    let hours_in_year: f64 = model
        .time_index
        .iter_seasons()
        .map(|season| scale[&season.id] * season.length as f64)
        .sum();
    assert_approx_eq!(f64, hours_in_year, 8760.0, epsilon = 1e-6);
    assert_approx_eq!(
        f64,
        model
            .time_index
            .iter_regular_seasons()
            .map(|season| scale[&season.id] * season.length as f64)
            .sum(),
        8760.0 - 2.0 * 12.0,
        epsilon = 1e-6
    );
}
