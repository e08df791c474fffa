//! Integration tests for region connectivity, modularity and silhouette scores.

use std::collections::BTreeMap;

use ndarray::{array, Array2};
use spagat_grouping::graph::connecting_components;
use spagat_grouping::stats::silhouette_score;
use spagat_grouping::{
    check_connectivity, connectivity, connectivity_with_keyword, modularity, modularity_series,
    silhouette_series, AggregationHierarchy, Dataset, GroupingError, LabeledArray,
};

fn regions(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("r{}", i)).collect()
}

fn pairwise(components: Vec<&str>, n: usize, values: Vec<f64>) -> Dataset {
    let n_components = components.len();
    Dataset::new(regions(n), components)
        .with_variable(
            "flow",
            LabeledArray::from_shape_vec(
                vec!["component", "space", "space_2"],
                &[n_components, n, n],
                values,
            )
            .unwrap(),
        )
        .unwrap()
}

// ---------------------------------------------------------------------------
// Connectivity
// ---------------------------------------------------------------------------

#[test]
fn fully_connected_without_pipeline_component() {
    let ds = pairwise(
        vec!["cable"],
        3,
        vec![0.0, 2.0, 3.0, 2.0, 0.0, 1.0, 3.0, 1.0, 0.0],
    );
    let adjacency = connectivity(&ds).unwrap();
    assert_eq!(adjacency, Array2::from_elem((3, 3), 1.0));
}

#[test]
fn pipeline_components_restrict_connections() {
    // component 0 "Pipeline_H2" links r1-r2, component 1 "cable" links r0-r1
    let values = vec![
        0.0, 0.0, 0.0, 0.0, 0.0, 5.0, 0.0, 5.0, 0.0, //
        0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0,
    ];
    let ds = pairwise(vec!["Pipeline_H2", "cable"], 3, values);

    let adjacency = connectivity(&ds).unwrap();
    assert_eq!(adjacency, array![[1.0, 0.0, 0.0], [0.0, 1.0, 1.0], [0.0, 1.0, 1.0]]);

    let by_cable = connectivity_with_keyword(&ds, "CABLE").unwrap();
    assert_eq!(by_cable, array![[1.0, 1.0, 0.0], [1.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);
}

#[test]
fn connecting_components_fall_back_to_all() {
    let names = vec!["wind".to_string(), "gas".to_string()];
    assert_eq!(connecting_components(&names, "pipeline"), vec![0, 1]);
    let names = vec!["wind".to_string(), "gas_pipeline".to_string()];
    assert_eq!(connecting_components(&names, "pipeline"), vec![1]);
}

#[test]
fn no_pairwise_variables_leaves_only_self_loops() {
    let ds = Dataset::new(regions(3), vec!["wind"]);
    assert_eq!(connectivity(&ds).unwrap(), Array2::<f64>::eye(3));
}

#[test]
fn check_connectivity_short_circuits_on_first_match() {
    let mut per_component = BTreeMap::new();
    per_component.insert(0, array![[0.0, 0.0], [0.0, 0.0]]);
    per_component.insert(2, array![[0.0, 0.7], [0.7, 0.0]]);
    let mut affinities = BTreeMap::new();
    affinities.insert("flow".to_string(), per_component);

    assert!(check_connectivity(0, 1, &affinities, &[0, 2]));
    assert!(!check_connectivity(0, 1, &affinities, &[0, 1]));
    assert!(!check_connectivity(0, 1, &BTreeMap::new(), &[0, 1, 2]));
}

// ---------------------------------------------------------------------------
// Modularity
// ---------------------------------------------------------------------------

fn two_pairs() -> Array2<f64> {
    array![
        [1.0, 1.0, 0.0, 0.0],
        [1.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 1.0],
        [0.0, 0.0, 1.0, 1.0],
    ]
}

#[test]
fn modularity_of_singletons_is_zero() {
    let adjacency = Array2::from_elem((4, 4), 1.0);
    assert_eq!(modularity(&adjacency, &[0, 1, 2, 3]).unwrap(), 0.0);
}

#[test]
fn modularity_of_separated_pairs() {
    let q = modularity(&two_pairs(), &[0, 0, 1, 1]).unwrap();
    // total weight 4, unit degrees: 2 * (1 - 1/8) / 8
    assert!((q - 0.21875).abs() < 1e-12, "q = {}", q);
    assert!((-0.5..1.0).contains(&q));
}

#[test]
fn modularity_rewards_the_natural_split() {
    let good = modularity(&two_pairs(), &["a", "a", "b", "b"]).unwrap();
    let bad = modularity(&two_pairs(), &["a", "b", "a", "b"]).unwrap();
    assert!(good > bad);
    assert!(bad >= -0.5);
}

#[test]
fn modularity_does_not_touch_the_input() {
    let adjacency = two_pairs();
    modularity(&adjacency, &[0, 0, 1, 1]).unwrap();
    assert_eq!(adjacency[[0, 0]], 1.0);
}

#[test]
fn modularity_without_edges_is_a_domain_error() {
    let adjacency = Array2::eye(3);
    assert!(matches!(
        modularity(&adjacency, &[0, 0, 1]),
        Err(GroupingError::ZeroEdgeWeight)
    ));
}

#[test]
fn modularity_rejects_missing_edge_weights() {
    let adjacency = array![[0.0, f64::NAN], [f64::NAN, 0.0]];
    assert!(matches!(
        modularity(&adjacency, &[0, 0]),
        Err(GroupingError::ZeroEdgeWeight)
    ));

    let mut adjacency = two_pairs();
    adjacency[[2, 3]] = f64::INFINITY;
    assert!(matches!(
        modularity(&adjacency, &[0, 0, 1, 1]),
        Err(GroupingError::ZeroEdgeWeight)
    ));
}

#[test]
fn modularity_label_count_must_match() {
    assert!(matches!(
        modularity(&two_pairs(), &[0, 1]),
        Err(GroupingError::ShapeMismatch { .. })
    ));
}

// ---------------------------------------------------------------------------
// Silhouette
// ---------------------------------------------------------------------------

/// Regions at positions 0, 1, 10 and 11 on a line.
fn line_distances() -> Array2<f64> {
    let pos = [0.0f64, 1.0, 10.0, 11.0];
    Array2::from_shape_fn((4, 4), |(i, j)| (pos[i] - pos[j]).abs())
}

fn line_hierarchy() -> AggregationHierarchy {
    AggregationHierarchy::new()
        .with_level(4, vec![("r0", vec!["r0"]), ("r1", vec!["r1"]), ("r2", vec!["r2"]), ("r3", vec!["r3"])])
        .with_level(3, vec![("r0_r1", vec!["r0", "r1"]), ("r2", vec!["r2"]), ("r3", vec!["r3"])])
        .with_level(2, vec![("r0_r1", vec!["r0", "r1"]), ("r2_r3", vec!["r2", "r3"])])
        .with_level(1, vec![("all", vec!["r0", "r1", "r2", "r3"])])
}

#[test]
fn silhouette_series_scores_intermediate_levels() {
    let scores = silhouette_series(&regions(4), &line_distances(), &line_hierarchy()).unwrap();
    assert_eq!(scores.len(), 2);

    let level2 = (9.5 / 10.5 + 8.5 / 9.5) / 2.0;
    let level3 = (0.9 + 8.0 / 9.0) / 4.0;
    assert!((scores[0] - level2).abs() < 1e-12, "k=2: {}", scores[0]);
    assert!((scores[1] - level3).abs() < 1e-12, "k=3: {}", scores[1]);
    assert!(scores.iter().all(|s| (-1.0..=1.0).contains(s)));
}

#[test]
fn silhouette_series_leaves_absent_levels_at_zero() {
    let hierarchy = AggregationHierarchy::new()
        .with_level(2, vec![("a", vec!["r0", "r1"]), ("b", vec!["r2", "r3"])])
        .with_level(1, vec![("all", vec!["r0", "r1", "r2", "r3"])]);
    let scores = silhouette_series(&regions(4), &line_distances(), &hierarchy).unwrap();
    assert_eq!(scores.len(), 2);
    assert!(scores[0] > 0.0);
    assert_eq!(scores[1], 0.0);
}

#[test]
fn silhouette_series_rejects_overlapping_groups() {
    let hierarchy = AggregationHierarchy::new()
        .with_level(2, vec![("a", vec!["r0", "r1"]), ("b", vec!["r1", "r2", "r3"])]);
    assert!(matches!(
        silhouette_series(&regions(4), &line_distances(), &hierarchy),
        Err(GroupingError::InvalidHierarchy(_))
    ));
}

#[test]
fn silhouette_series_rejects_unknown_region() {
    let hierarchy = AggregationHierarchy::new()
        .with_level(2, vec![("a", vec!["r0", "r1"]), ("b", vec!["r2", "x"])]);
    assert!(matches!(
        silhouette_series(&regions(4), &line_distances(), &hierarchy),
        Err(GroupingError::UnknownRegion(_))
    ));
}

#[test]
fn silhouette_needs_two_to_n_minus_one_labels() {
    let d = line_distances();
    assert!(matches!(silhouette_score(&d, &[0, 0, 0, 0]), Err(GroupingError::InvalidLabels(_))));
    assert!(matches!(silhouette_score(&d, &[0, 1, 2, 3]), Err(GroupingError::InvalidLabels(_))));
    assert!(silhouette_score(&d, &[7, 7, 3, 3]).is_ok());
}

#[test]
fn hierarchy_validation() {
    let hierarchy = line_hierarchy();
    assert!(hierarchy.validate(&regions(4)).is_ok());

    let wrong_count = AggregationHierarchy::new()
        .with_level(3, vec![("a", vec!["r0", "r1"]), ("b", vec!["r2", "r3"])]);
    assert!(wrong_count.validate(&regions(4)).is_err());
}

#[test]
fn hierarchy_deserializes_from_json() {
    let json = r#"{"2": [{"label": "a", "regions": ["r0", "r1"]}, {"label": "b", "regions": ["r2", "r3"]}]}"#;
    let hierarchy: AggregationHierarchy = serde_json::from_str(json).unwrap();
    assert_eq!(hierarchy.len(), 1);
    assert_eq!(hierarchy.labels_for_level(2, &regions(4)).unwrap(), vec![0, 0, 1, 1]);
}

#[test]
fn hierarchy_deserializes_from_label_keyed_json() {
    let json = r#"{
        "4": {"r0": ["r0"], "r1": ["r1"], "r2": ["r2"], "r3": ["r3"]},
        "3": {"r0_r1": ["r0", "r1"], "r2": ["r2"], "r3": ["r3"]},
        "2": {"r2_r3": ["r2", "r3"], "r0_r1": ["r0", "r1"]},
        "1": {"all": ["r0", "r1", "r2", "r3"]}
    }"#;
    let hierarchy: AggregationHierarchy = serde_json::from_str(json).unwrap();
    assert_eq!(hierarchy.len(), 4);
    assert!(hierarchy.validate(&regions(4)).is_ok());
    assert_eq!(hierarchy.level(2).unwrap()[0].label, "r0_r1");

    let from_map = silhouette_series(&regions(4), &line_distances(), &hierarchy).unwrap();
    let from_lists =
        silhouette_series(&regions(4), &line_distances(), &line_hierarchy()).unwrap();
    for (a, b) in from_map.iter().zip(from_lists.iter()) {
        assert!((a - b).abs() < 1e-12);
    }
}

#[test]
fn hierarchy_serializes_as_group_lists() {
    let json = serde_json::to_string(&line_hierarchy()).unwrap();
    let back: AggregationHierarchy = serde_json::from_str(&json).unwrap();
    assert_eq!(back, line_hierarchy());
}

#[test]
fn modularity_series_scores_every_level() {
    let scores = modularity_series(&regions(4), &two_pairs(), &line_hierarchy()).unwrap();
    assert_eq!(scores.len(), 4);
    assert!((scores[1] - 0.21875).abs() < 1e-12);
    assert_eq!(scores[3], 0.0);
}
