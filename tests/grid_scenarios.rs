//! End-to-end scenarios for both storage backends.
//!
//! Every test here goes through the public API only: build a grid, populate
//! it, query it, and where the backend allows, erase from it.

#![forbid(unsafe_code)]

use approx::assert_relative_eq;
use cellgrid::prelude::*;
use std::collections::BTreeSet;

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

fn unit_cube_10() -> CellGeometry<f64, 3> {
    CellGeometry::try_new(
        Aabb::new(Point::new([0.0; 3]), Point::new([1.0; 3])),
        [10, 10, 10],
    )
    .unwrap()
}

fn scenario_points() -> Vec<Point<f64, 3>> {
    vec![
        Point::new([0.05, 0.15, 0.25]),
        Point::new([0.05, 0.15, 0.25]),
        Point::new([0.02, 0.12, 0.29]),
        Point::new([0.12, 0.09, 0.32]),
        Point::new([0.24, 0.52, 0.29]),
    ]
}

fn scenario_sphere() -> Sphere<f64, 3> {
    Sphere::new(Point::new([0.05, 0.15, 0.25]), 0.2)
}

// =============================================================================
// BACKEND COMPARISON
// =============================================================================

#[test]
fn static_backend_keeps_duplicates() {
    init_tracing();
    let mut grid: StaticGrid<f64, 3> = GridIndex::new(unit_cube_10());
    assert_eq!(grid.insert_all(scenario_points()), 5);
    grid.build();

    assert_eq!(grid.len(), 5);
    assert_eq!(grid.iter().count(), 5);

    let hits: Vec<Point<f64, 3>> = grid
        .values_in_sphere(&scenario_sphere())
        .map(|e| *e.value())
        .collect();
    // Both copies of the center point are stored and reported.
    assert_eq!(hits.len(), 4);
    let distinct: BTreeSet<[u64; 3]> = hits
        .iter()
        .map(|p| p.to_array().map(f64::to_bits))
        .collect();
    assert_eq!(distinct.len(), 3);
    assert!(!hits.contains(&Point::new([0.24, 0.52, 0.29])));
}

#[test]
fn hash_backend_rejects_duplicates() {
    init_tracing();
    let mut grid: HashTableGrid<f64, 3> = GridIndex::new(unit_cube_10());
    let inserted: Vec<bool> = scenario_points().into_iter().map(|p| grid.insert(p)).collect();
    assert_eq!(inserted, vec![true, false, true, true, true]);
    assert_eq!(grid.len(), 4);

    let hits: Vec<Point<f64, 3>> = grid
        .values_in_sphere(&scenario_sphere())
        .map(|e| *e.value())
        .collect();
    assert_eq!(hits.len(), 3);
    assert!(!hits.contains(&Point::new([0.24, 0.52, 0.29])));
}

#[test]
fn both_backends_agree_on_occupied_cells() {
    let mut fixed: StaticGrid<f64, 3> = GridIndex::new(unit_cube_10());
    fixed.insert_all(scenario_points());
    fixed.build();
    let mut dynamic: HashTableGrid<f64, 3> = GridIndex::new(unit_cube_10());
    dynamic.insert_all(scenario_points());

    let expected: BTreeSet<CellCoord<3>> = [[0, 1, 2], [1, 0, 3], [2, 5, 2]].into_iter().collect();
    assert_eq!(fixed.non_empty_cells(), expected);
    assert_eq!(dynamic.non_empty_cells(), expected);
    for cell in &expected {
        assert!(!fixed.cell_empty(cell));
        assert!(!dynamic.cell_empty(cell));
    }
    assert!(fixed.cell_empty(&[9, 9, 9]));
    assert!(dynamic.cell_empty(&[9, 9, 9]));
}

// =============================================================================
// STATIC LIFECYCLE
// =============================================================================

#[test]
fn static_inserts_after_build_wait_for_rebuild() {
    init_tracing();
    let mut grid: StaticGrid<f64, 3> = GridIndex::new(unit_cube_10());
    grid.insert(Point::new([0.5, 0.5, 0.5]));
    grid.build();
    assert!(grid.is_built());

    grid.insert(Point::new([0.91, 0.91, 0.91]));
    assert!(!grid.is_built());
    assert_eq!(grid.pending(), 1);
    assert_eq!(grid.len(), 1);
    let before = grid.closest_value(&Point::new([0.9; 3])).unwrap();
    assert_eq!(before.value(), &Point::new([0.5, 0.5, 0.5]));

    grid.build();
    assert_eq!(grid.len(), 2);
    let after = grid.closest_value(&Point::new([0.9; 3])).unwrap();
    assert_eq!(after.value(), &Point::new([0.91, 0.91, 0.91]));
}

#[test]
fn static_offsets_cover_every_cell() {
    let mut grid: StaticGrid<f64, 3> = GridIndex::new(unit_cube_10());
    grid.insert_all(scenario_points());
    grid.build();
    let offsets = grid.storage().offsets();
    assert_eq!(offsets.len(), 1001);
    assert_eq!(offsets[1000], 5);
    assert!(offsets.windows(2).all(|w| w[0] <= w[1]));
}

// =============================================================================
// MUTATION
// =============================================================================

#[test]
fn hash_erase_then_reinsert() {
    let mut grid: HashTableGrid<f64, 3> = GridIndex::new(unit_cube_10());
    grid.insert_all(scenario_points());

    let p = Point::new([0.12, 0.09, 0.32]);
    assert!(grid.erase(&p));
    assert!(!grid.erase(&p));
    assert!(grid.cell_empty(&[1, 0, 3]));
    assert_eq!(grid.count_in_sphere(&scenario_sphere()), 2);

    assert!(grid.insert(p));
    assert_eq!(grid.count_in_sphere(&scenario_sphere()), 3);

    grid.compact();
    assert_eq!(grid.storage().dead_slots(), 0);
    assert_eq!(grid.len(), 4);
}

#[test]
fn multi_grid_erase_removes_every_copy() {
    let mut grid: HashMultiGrid<f64, 3> = GridIndex::new(unit_cube_10());
    grid.insert_all(scenario_points());
    assert_eq!(grid.len(), 5);
    assert!(grid.erase(&Point::new([0.05, 0.15, 0.25])));
    assert_eq!(grid.len(), 3);
    assert_eq!(grid.count_in_cell(&[0, 1, 2]), 1);
}

#[test]
fn erase_in_sphere_leaves_outside_points() {
    let mut grid: HashTableGrid<f64, 3> = GridIndex::new(unit_cube_10());
    grid.insert_all(scenario_points());
    assert_eq!(grid.erase_in_sphere(&scenario_sphere()), 3);
    let left: Vec<_> = grid.iter().map(|e| *e.value()).collect();
    assert_eq!(left, vec![Point::new([0.24, 0.52, 0.29])]);
}

// =============================================================================
// EXTENDED VALUES
// =============================================================================

#[test]
fn boxes_span_cells_and_report_once() {
    init_tracing();
    let geometry: CellGeometry<f64, 2> =
        CellGeometry::try_new(Aabb::new(Point::new([0.0, 0.0]), Point::new([10.0, 10.0])), [10, 10])
            .unwrap();
    let mut grid: HashTableGrid<f64, 2, Aabb<f64, 2>> = GridIndex::new(geometry);

    let a = Aabb::new(Point::new([1.5, 1.5]), Point::new([3.5, 2.5]));
    let b = Aabb::new(Point::new([7.2, 7.2]), Point::new([7.8, 7.8]));
    assert!(grid.insert(a));
    assert!(grid.insert(b));
    assert_eq!(grid.len(), 3 * 2 + 1);

    let probe = Sphere::new(Point::new([2.5, 2.0]), 1.0);
    let hits: Vec<_> = grid.values_in_sphere(&probe).map(|e| *e.value()).collect();
    assert_eq!(hits, vec![a]);

    let nearest = grid.closest_value(&Point::new([9.0, 9.0])).unwrap();
    assert_eq!(nearest.value(), &b);
    assert_relative_eq!(nearest.distance, 1.2f64.hypot(1.2), epsilon = 1e-12);

    let both = grid.k_closest_values(&Point::new([5.0, 5.0]), 4);
    assert_eq!(both.len(), 2);
    assert_eq!(both[0].value(), &a);
    assert_eq!(both[1].value(), &b);
    assert!(both[0].distance < both[1].distance);
}

#[test]
fn closest_box_to_a_box_on_both_backends() {
    init_tracing();
    let a = Aabb::new(Point::new([1.0, 1.0]), Point::new([2.0, 2.0]));
    let b = Aabb::new(Point::new([6.0, 6.0]), Point::new([8.0, 7.0]));
    let c = Aabb::new(Point::new([4.0, 0.0]), Point::new([5.0, 1.0]));
    let boxes = vec![a, b, c, a];
    let query = Aabb::new(Point::new([5.5, 2.0]), Point::new([6.5, 3.0]));

    let fixed: StaticGrid<f64, 2, Aabb<f64, 2>> =
        GridIndex::try_from_values(boxes.clone(), &GridSizingOptions::default()).unwrap();
    let set: HashTableGrid<f64, 2, Aabb<f64, 2>> =
        GridIndex::try_from_values(boxes, &GridSizingOptions::default()).unwrap();

    for nearest in [fixed.closest_value(&query), set.closest_value(&query)] {
        let nearest = nearest.unwrap();
        assert_eq!(nearest.value(), &c);
        assert_relative_eq!(nearest.distance, 0.5f64.hypot(1.0), epsilon = 1e-12);
    }

    // The static backend keeps both copies of `a`.
    let ranked: Vec<Aabb<f64, 2>> =
        fixed.k_closest_values(&query, 10).iter().map(|n| *n.value()).collect();
    assert_eq!(ranked, vec![c, b, a, a]);
    let ranked: Vec<Aabb<f64, 2>> =
        set.k_closest_values(&query, 10).iter().map(|n| *n.value()).collect();
    assert_eq!(ranked, vec![c, b, a]);
    assert_relative_eq!(distance_between(&query, &a), 3.5);
}

#[test]
fn spheres_with_exact_cell_test() {
    let geometry: CellGeometry<f64, 2> =
        CellGeometry::try_new(Aabb::new(Point::new([0.0, 0.0]), Point::new([4.0, 4.0])), [4, 4])
            .unwrap();
    let mut grid: HashTableGrid<f64, 2, Sphere<f64, 2>> = GridIndex::new(geometry)
        .with_intersects(|cell_box, s: &Sphere<f64, 2>| s.intersects_box(cell_box));

    assert!(grid.insert(Sphere::new(Point::new([2.0, 2.0]), 1.2)));
    // The bounding box spans cells 0..=3 on both axes; the disc misses the corners.
    assert_eq!(grid.non_empty_cells().len(), 12);
    for corner in [[0, 0], [0, 3], [3, 0], [3, 3]] {
        assert!(grid.cell_empty(&corner));
    }
    assert!(grid.erase(&Sphere::new(Point::new([2.0, 2.0]), 1.2)));
    assert!(grid.is_empty());
}

// =============================================================================
// AUTO-SIZING
// =============================================================================

#[test]
fn auto_sized_grid_matches_brute_force() {
    init_tracing();
    let points: Vec<Point<f64, 3>> = generate_random_points_seeded(500, (-3.0, 3.0), 11).unwrap();
    let grid: StaticGrid<f64, 3> =
        GridIndex::try_from_values(points.clone(), &GridSizingOptions::default()).unwrap();
    assert_eq!(grid.len(), 500);
    assert!(grid.geometry().total_cells() <= 500);

    for q in generate_random_points_seeded::<f64, 3>(20, (-4.0, 4.0), 12).unwrap() {
        let mut distances: Vec<f64> = points.iter().map(|p| p.distance(&q)).collect();
        distances.sort_by(f64::total_cmp);

        let nearest = grid.closest_value(&q).unwrap();
        assert_relative_eq!(nearest.distance, distances[0], epsilon = 1e-9);

        let seven = grid.k_closest_values(&q, 7);
        assert_eq!(seven.len(), 7);
        for (found, expected) in seven.iter().zip(&distances) {
            assert_relative_eq!(found.distance, *expected, epsilon = 1e-9);
        }
    }
}

#[test]
fn auto_sizing_respects_cell_cap() {
    let options = GridSizingOptionsBuilder::default()
        .cells_per_element(100.0)
        .max_total_cells(64_usize)
        .build()
        .unwrap();
    let points: Vec<Point<f64, 2>> = generate_random_points_seeded(1000, (0.0, 1.0), 3).unwrap();
    let grid: HashTableGrid<f64, 2> = GridIndex::try_from_values(points, &options).unwrap();
    assert!(grid.geometry().total_cells() <= 64);
    assert_eq!(grid.len(), 1000);
}

#[test]
fn auto_sizing_handles_coplanar_input() {
    let points: Vec<Point<f64, 3>> = (0..50)
        .map(|i| {
            let t = f64::from(i) / 50.0;
            Point::new([t, 1.0 - t, 0.5])
        })
        .collect();
    let grid: StaticGrid<f64, 3> =
        GridIndex::try_from_values(points, &GridSizingOptions::default()).unwrap();
    assert_eq!(grid.len(), 50);
    assert!(grid.geometry().bbox().length(2) > 0.0);
    let hit = grid.closest_value(&Point::new([0.0, 1.0, 0.5])).unwrap();
    assert_relative_eq!(hit.distance, 0.0);
}

#[test]
fn auto_sizing_rejects_empty_and_non_finite_input() {
    let empty: Result<HashTableGrid<f64, 3>, GridError> =
        GridIndex::try_from_values(Vec::new(), &GridSizingOptions::default());
    assert!(matches!(empty, Err(GridError::EmptyInput)));

    let bad: Result<HashTableGrid<f64, 3>, GridError> = GridIndex::try_from_values(
        [Point::new([0.0, f64::NAN, 0.0])],
        &GridSizingOptions::default(),
    );
    assert!(matches!(bad, Err(GridError::InvalidCoordinate(_))));
}

// =============================================================================
// QUERIES OUTSIDE THE GRID
// =============================================================================

#[test]
fn queries_outside_the_box_clamp_to_boundary_cells() {
    let mut grid: HashTableGrid<f64, 3> = GridIndex::new(unit_cube_10());
    grid.insert_all(scenario_points());

    let far = Point::new([50.0, -20.0, 7.0]);
    let nearest = grid.closest_value(&far).unwrap();
    let best = scenario_points()
        .iter()
        .map(|p| p.distance(&far))
        .fold(f64::INFINITY, f64::min);
    assert_relative_eq!(nearest.distance, best, epsilon = 1e-9);

    assert!(grid.closest_value_within(&far, 1.0).is_none());
    assert_eq!(grid.count_in_sphere(&Sphere::new(far, 1.0)), 0);
}
