//! Planar geometry on normalized keypoints.

use formcheck_pose_model::frame::Point2D;

/// Angle at vertex `b` formed by the rays `b→a` and `b→c`, in degrees.
///
/// Always in `[0, 180]` and symmetric in `a` and `c`.
pub fn angle(a: Point2D, b: Point2D, c: Point2D) -> f64 {
    let radians = (c.y - b.y).atan2(c.x - b.x) - (a.y - b.y).atan2(a.x - b.x);
    let degrees = radians.to_degrees().abs();
    if degrees > 180.0 {
        360.0 - degrees
    } else {
        degrees
    }
}

/// Euclidean distance between two points.
pub fn distance(p: Point2D, q: Point2D) -> f64 {
    (p.x - q.x).hypot(p.y - q.y)
}

/// Projection of `p` onto the bottom edge of the frame, straight below it.
///
/// Used as the third point when measuring a segment against the vertical.
pub fn vertical_projection(p: Point2D) -> Point2D {
    Point2D::new(p.x, 1.0)
}

/// Round to `decimals` places from the exact decimal value of `value`, so
/// `1.15` (stored as 1.1499...) rounds down to `1.1`.
pub fn round_to(value: f64, decimals: usize) -> f64 {
    format!("{value:.decimals$}").parse().unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_round_to_uses_exact_decimal_value() {
        assert_eq!(round_to(1.15, 1), 1.1);
        assert_eq!(round_to(1.26, 1), 1.3);
        assert_eq!(round_to(0.8333, 1), 0.8);
        assert_eq!(round_to(0.666_666, 2), 0.67);
        assert_eq!(round_to(0.7, 2), 0.7);
    }

    #[test]
    fn test_right_angle() {
        let a = Point2D::new(0.0, 0.0);
        let b = Point2D::new(0.5, 0.0);
        let c = Point2D::new(0.5, 0.5);
        assert!((angle(a, b, c) - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_straight_line() {
        let a = Point2D::new(0.0, 0.5);
        let b = Point2D::new(0.5, 0.5);
        let c = Point2D::new(1.0, 0.5);
        assert!((angle(a, b, c) - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_reflex_is_folded() {
        // Raw atan2 difference here is 270 degrees.
        let a = Point2D::new(-1.0, -1.0);
        let b = Point2D::new(0.0, 0.0);
        let c = Point2D::new(-1.0, 1.0);
        assert!((angle(a, b, c) - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_upper_arm_hanging_straight_is_zero() {
        let shoulder = Point2D::new(0.4, 0.3);
        let elbow = Point2D::new(0.4, 0.5);
        assert!(angle(elbow, shoulder, vertical_projection(shoulder)).abs() < 1e-9);
    }

    #[test]
    fn test_distance() {
        let p = Point2D::new(0.0, 0.0);
        let q = Point2D::new(0.3, 0.4);
        assert!((distance(p, q) - 0.5).abs() < 1e-12);
    }

    fn point() -> impl Strategy<Value = Point2D> {
        (-2.0f64..2.0, -2.0f64..2.0).prop_map(|(x, y)| Point2D::new(x, y))
    }

    proptest! {
        #[test]
        fn angle_is_symmetric_and_bounded(a in point(), b in point(), c in point()) {
            let forward = angle(a, b, c);
            let backward = angle(c, b, a);
            prop_assert_eq!(forward, backward);
            prop_assert!((0.0..=180.0).contains(&forward));
        }

        #[test]
        fn distance_is_non_negative_and_symmetric(p in point(), q in point()) {
            let d = distance(p, q);
            prop_assert!(d >= 0.0);
            prop_assert_eq!(d, distance(q, p));
        }
    }
}
