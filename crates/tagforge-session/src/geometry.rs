//! Arena geometry: pure functions over [`Point`]s.
//!
//! The arena is a circle of radius `r` centered on the origin. Math is
//! done in `glam::DVec2` and converted back at the `Point` boundary, so
//! callers never depend on glam directly.

use std::f64::consts::TAU;

use glam::DVec2;
use rand::Rng;
use tagforge_protocol::Point;

fn to_vec(p: Point) -> DVec2 {
    DVec2::new(p.x, p.y)
}

fn to_point(v: DVec2) -> Point {
    Point::new(v.x, v.y)
}

/// Projects `p` radially onto the boundary if it lies outside the circle.
///
/// Points inside (or on) the circle are returned unchanged. A point at
/// the origin is never out of bounds for a positive radius, but the zero
/// length case is guarded anyway so a zero or negative radius cannot
/// divide by zero.
pub fn clamp_to_circle(p: Point, radius: f64) -> Point {
    let v = to_vec(p);
    let len = v.length();
    if len == 0.0 || len <= radius {
        return p;
    }
    to_point(v * (radius / len))
}

/// The boundary point at `angle` radians (counter-clockwise from +x).
pub fn edge_point(radius: f64, angle: f64) -> Point {
    to_point(DVec2::from_angle(angle) * radius)
}

/// A boundary point at an angle drawn uniformly from `[0, 2π)`.
///
/// Uniform in angle only. Good enough for choosing where the chaser
/// spawns, not a general-purpose sampler.
pub fn random_edge_point<R: Rng + ?Sized>(radius: f64, rng: &mut R) -> Point {
    edge_point(radius, rng.random_range(0.0..TAU))
}

/// Euclidean distance between two points.
pub fn distance(a: Point, b: Point) -> f64 {
    to_vec(a).distance(to_vec(b))
}

/// Moves from `from` toward `to`, covering at most `max_step` units.
///
/// This is the server-side speed clamp. Returns `to` itself when it is
/// already within reach.
pub fn step_toward(from: Point, to: Point, max_step: f64) -> Point {
    let origin = to_vec(from);
    let delta = to_vec(to) - origin;
    let len = delta.length();
    if len == 0.0 || len <= max_step {
        return to;
    }
    to_point(origin + delta * (max_step / len))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_clamp_to_circle_outside_projects_onto_boundary() {
        let clamped = clamp_to_circle(Point::new(260.0, 0.0), 250.0);
        assert!((clamped.x - 250.0).abs() < EPS);
        assert!(clamped.y.abs() < EPS);
    }

    #[test]
    fn test_clamp_to_circle_keeps_direction() {
        let clamped = clamp_to_circle(Point::new(300.0, 400.0), 250.0);
        assert!((clamped.x - 150.0).abs() < EPS);
        assert!((clamped.y - 200.0).abs() < EPS);
    }

    #[test]
    fn test_clamp_to_circle_inside_is_unchanged() {
        let p = Point::new(-10.0, 42.5);
        assert_eq!(clamp_to_circle(p, 250.0), p);
    }

    #[test]
    fn test_clamp_to_circle_on_boundary_is_unchanged() {
        let p = Point::new(0.0, -250.0);
        assert_eq!(clamp_to_circle(p, 250.0), p);
    }

    #[test]
    fn test_clamp_to_circle_origin_with_degenerate_radius() {
        assert_eq!(clamp_to_circle(Point::ORIGIN, 0.0), Point::ORIGIN);
        assert_eq!(clamp_to_circle(Point::ORIGIN, -5.0), Point::ORIGIN);
    }

    #[test]
    fn test_edge_point_axes() {
        let east = edge_point(250.0, 0.0);
        assert!((east.x - 250.0).abs() < EPS && east.y.abs() < EPS);
        let north = edge_point(250.0, std::f64::consts::FRAC_PI_2);
        assert!(north.x.abs() < EPS && (north.y - 250.0).abs() < EPS);
    }

    #[test]
    fn test_random_edge_point_lies_on_circle() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let p = random_edge_point(250.0, &mut rng);
            assert!((p.length() - 250.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_random_edge_point_is_seed_deterministic() {
        let a = random_edge_point(100.0, &mut StdRng::seed_from_u64(3));
        let b = random_edge_point(100.0, &mut StdRng::seed_from_u64(3));
        assert_eq!(a, b);
    }

    #[test]
    fn test_distance() {
        assert_eq!(distance(Point::new(5.0, 0.0), Point::ORIGIN), 5.0);
        assert_eq!(distance(Point::new(1.0, 1.0), Point::new(4.0, 5.0)), 5.0);
    }

    #[test]
    fn test_step_toward_within_reach_returns_target() {
        let to = Point::new(2.0, 0.0);
        assert_eq!(step_toward(Point::ORIGIN, to, 3.0), to);
    }

    #[test]
    fn test_step_toward_limits_displacement() {
        let stepped = step_toward(Point::ORIGIN, Point::new(0.0, 10.0), 3.0);
        assert!(stepped.x.abs() < EPS);
        assert!((stepped.y - 3.0).abs() < EPS);
    }

    proptest! {
        #[test]
        fn prop_clamp_to_circle_never_leaves_arena(
            x in -1.0e6f64..1.0e6,
            y in -1.0e6f64..1.0e6,
            radius in 1.0f64..1.0e4,
        ) {
            let clamped = clamp_to_circle(Point::new(x, y), radius);
            prop_assert!(clamped.length() <= radius * (1.0 + 1e-12));
        }

        #[test]
        fn prop_step_toward_never_exceeds_max_step(
            fx in -500.0f64..500.0, fy in -500.0f64..500.0,
            tx in -500.0f64..500.0, ty in -500.0f64..500.0,
            max_step in 0.1f64..50.0,
        ) {
            let from = Point::new(fx, fy);
            let stepped = step_toward(from, Point::new(tx, ty), max_step);
            prop_assert!(distance(from, stepped) <= max_step + 1e-9);
        }
    }
}
