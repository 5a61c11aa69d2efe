//! Integration tests for the random-walk dispersion.

use ichthyop_rs::dataset::synthetic::FlatCurrent;
use ichthyop_rs::dispersion::{reflect, DispersionDraw, HorizontalDispersion};
use ichthyop_rs::types::GridPoint;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

#[test]
fn test_reflection_at_bottom_matches_formula() {
    for (z, dz) in [(0.0, -0.4), (0.0, -1.7), (0.2, -0.9)] {
        let reflected = reflect(z, dz, 5);
        assert!((reflected - -(2.0 * z + dz)).abs() < 1e-12);
        assert!((0.0..=4.0).contains(&(z + reflected)));
    }
}

#[test]
fn test_reflection_keeps_levels() {
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    for _ in 0..1000 {
        let z: f64 = rng.gen_range(0.0..=4.0);
        let dz: f64 = rng.gen_range(-3.9..3.9);
        let moved = z + reflect(z, dz, 5);
        assert!((-1e-12..=4.0 + 1e-12).contains(&moved), "z={} dz={}", z, dz);
    }
}

#[test]
fn test_vertical_walk_stays_in_column() {
    let scenario = FlatCurrent::new(10, 10, 5).with_kv(1e-2);
    let mut dataset = scenario.dataset().unwrap();
    dataset.init(0.0).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(5);

    let mut p = GridPoint::new(5.0, 5.0, 2.0);
    let mut visited = (p.z, p.z);
    for _ in 0..300 {
        let d = dataset.vertical_dispersion(p, 0.0, 600.0, &mut rng);
        assert_eq!((d.dx, d.dy), (0.0, 0.0));
        p.z += d.dz;
        assert!((0.0..=4.0).contains(&p.z), "left the column at z={}", p.z);
        visited = (visited.0.min(p.z), visited.1.max(p.z));
    }
    assert!(visited.1 - visited.0 > 1.0);
}

#[test]
fn test_horizontal_walk_avoids_land() {
    let scenario = FlatCurrent::new(12, 10, 3).with_land_column(5);
    let mut dataset = scenario.dataset().unwrap();
    dataset.init(0.0).unwrap();
    let p = GridPoint::new(4.4, 5.0, 1.0);

    for draw in [DispersionDraw::Shared, DispersionDraw::Independent] {
        let dispersion = HorizontalDispersion::new(1e-6).with_draw(draw);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut moved = 0;
        for _ in 0..500 {
            let d = dataset.horizontal_dispersion(&dispersion, p, 600.0, &mut rng);
            assert_eq!(d.dz, 0.0);
            assert!(dataset.is_in_water(p + d));
            if d.dx != 0.0 {
                moved += 1;
            }
        }
        assert!(moved > 0);
    }
}

#[test]
fn test_shared_draw_moves_along_diagonal() {
    let scenario = FlatCurrent::new(12, 12, 2).with_spacing(1000.0, 1000.0);
    let mut dataset = scenario.dataset().unwrap();
    dataset.init(0.0).unwrap();
    let dispersion = HorizontalDispersion::default();
    let mut rng = ChaCha8Rng::seed_from_u64(8);
    for _ in 0..50 {
        let d = dataset.horizontal_dispersion(&dispersion, GridPoint::new(6.0, 6.0, 0.5), 900.0, &mut rng);
        assert!((d.dx - d.dy).abs() < 1e-12);
    }
}
