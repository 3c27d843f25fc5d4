//! Pointer hit testing against the pitch circle.

use crate::tuning::Position;

/// Hit radius in circle units for one pitch class when `subdivisions`
/// share the ring, before display scaling.
const HIT_SPAN: f64 = 20.0;

/// Hit radius for a ring of `subdivisions` points drawn at `scale_factor`.
/// Denser rings get proportionally smaller targets.
pub fn click_tolerance(subdivisions: usize, scale_factor: f64) -> f64 {
    if subdivisions == 0 {
        return 0.0;
    }
    HIT_SPAN / subdivisions as f64 * scale_factor
}

/// Index of the position nearest to `(x, y)`, if it lies strictly within
/// `tolerance`. Equidistant candidates resolve to the lower index.
pub fn nearest(x: f64, y: f64, positions: &[Position], tolerance: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, pos) in positions.iter().enumerate() {
        let distance = (x - pos.x).hypot(y - pos.y);
        match best {
            Some((_, d)) if distance >= d => {}
            _ => best = Some((index, distance)),
        }
    }
    best.filter(|&(_, d)| d < tolerance).map(|(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::positions;

    fn at(x: f64, y: f64) -> Position {
        Position { x, y, angle: 0.0 }
    }

    #[test]
    fn finds_exact_point() {
        let ring = positions(12, 50.0, 0.0);
        for (i, p) in ring.iter().enumerate() {
            assert_eq!(nearest(p.x, p.y, &ring, 1.0), Some(i));
        }
    }

    #[test]
    fn rejects_points_outside_tolerance() {
        let ring = positions(12, 50.0, 0.0);
        assert_eq!(nearest(0.0, 0.0, &ring, 10.0), None);
        assert_eq!(nearest(200.0, 200.0, &ring, 10.0), None);
    }

    #[test]
    fn tolerance_is_strict() {
        let points = [at(0.0, 0.0)];
        assert_eq!(nearest(3.0, 4.0, &points, 5.0), None);
        assert_eq!(nearest(3.0, 4.0, &points, 5.0001), Some(0));
    }

    #[test]
    fn ties_go_to_lower_index() {
        let points = [at(10.0, 0.0), at(-10.0, 0.0), at(0.0, 10.0)];
        assert_eq!(nearest(0.0, 0.0, &points, 20.0), Some(0));
        let reversed = [at(0.0, 10.0), at(-10.0, 0.0), at(10.0, 0.0)];
        assert_eq!(nearest(0.0, 0.0, &reversed, 20.0), Some(0));
    }

    #[test]
    fn picks_unique_nearest() {
        let points = [at(0.0, 0.0), at(5.0, 0.0), at(10.0, 0.0)];
        assert_eq!(nearest(6.0, 0.5, &points, 3.0), Some(1));
        assert_eq!(nearest(9.0, 0.0, &points, 3.0), Some(2));
    }

    #[test]
    fn empty_ring_never_hits() {
        assert_eq!(nearest(0.0, 0.0, &[], f64::INFINITY), None);
    }

    #[test]
    fn tolerance_shrinks_with_density() {
        assert!((click_tolerance(31, 4.0) - 80.0 / 31.0).abs() < 1e-12);
        assert!(click_tolerance(53, 4.0) < click_tolerance(12, 4.0));
        assert_eq!(click_tolerance(0, 4.0), 0.0);
    }
}
