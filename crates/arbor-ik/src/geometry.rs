//! Small vector helpers shared by the solvers. None of them produce NaN.

use nalgebra::{Unit, UnitQuaternion, Vector3};

/// Vectors shorter than this are treated as zero.
pub(crate) const MIN_LENGTH: f32 = 1e-6;

/// `v / |v|`, or `None` when `v` is (nearly) zero.
pub(crate) fn safe_normalize(v: &Vector3<f32>) -> Option<Vector3<f32>> {
    v.try_normalize(MIN_LENGTH)
}

/// `acos` with the argument clamped to `[-1, 1]`.
pub(crate) fn clamped_acos(cosine: f32) -> f32 {
    cosine.clamp(-1.0, 1.0).acos()
}

/// Angle between two vectors, zero if either is degenerate.
pub(crate) fn angle_between(a: &Vector3<f32>, b: &Vector3<f32>) -> f32 {
    match (safe_normalize(a), safe_normalize(b)) {
        (Some(a), Some(b)) => clamped_acos(a.dot(&b)),
        _ => 0.0,
    }
}

/// Some unit vector perpendicular to `v`. Returns +X for a zero vector.
pub(crate) fn any_perpendicular(v: &Vector3<f32>) -> Vector3<f32> {
    let a = v.abs();
    let helper = if a.x <= a.y && a.x <= a.z {
        Vector3::x()
    } else if a.y <= a.z {
        Vector3::y()
    } else {
        Vector3::z()
    };
    safe_normalize(&v.cross(&helper)).unwrap_or_else(Vector3::x)
}

/// Rotation of `angle` radians about a (not necessarily unit) axis.
pub(crate) fn axis_angle(axis: &Vector3<f32>, angle: f32) -> UnitQuaternion<f32> {
    match safe_normalize(axis) {
        Some(axis) => UnitQuaternion::from_axis_angle(&Unit::new_unchecked(axis), angle),
        None => UnitQuaternion::identity(),
    }
}

/// Smallest rotation taking the direction of `from` onto the direction of
/// `to`. Antiparallel inputs turn half a revolution about a perpendicular;
/// degenerate inputs give the identity.
pub(crate) fn shortest_arc(from: &Vector3<f32>, to: &Vector3<f32>) -> UnitQuaternion<f32> {
    let (Some(from), Some(to)) = (safe_normalize(from), safe_normalize(to)) else {
        return UnitQuaternion::identity();
    };
    if from.dot(&to) < -1.0 + 1e-6 {
        return axis_angle(&any_perpendicular(&from), std::f32::consts::PI);
    }
    UnitQuaternion::rotation_between(&from, &to).unwrap_or_else(UnitQuaternion::identity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn safe_normalize_rejects_zero() {
        assert!(safe_normalize(&Vector3::zeros()).is_none());
        let n = safe_normalize(&Vector3::new(3.0, 4.0, 0.0)).unwrap();
        assert_relative_eq!(n.norm(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn clamped_acos_tolerates_rounding() {
        assert_relative_eq!(clamped_acos(1.000_001), 0.0);
        assert_relative_eq!(clamped_acos(-1.5), std::f32::consts::PI);
    }

    #[test]
    fn perpendicular_is_unit_and_orthogonal() {
        for v in [
            Vector3::x(),
            Vector3::new(0.0, -2.0, 0.0),
            Vector3::new(1.0, 1.0, 1.0),
            Vector3::new(0.0, 0.0, 5.0),
        ] {
            let p = any_perpendicular(&v);
            assert_relative_eq!(p.norm(), 1.0, epsilon = 1e-6);
            assert_relative_eq!(p.dot(&v), 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn shortest_arc_maps_direction() {
        let from = Vector3::new(1.0, 0.0, 0.0);
        let to = Vector3::new(0.0, 2.0, 2.0);
        let r = shortest_arc(&from, &to);
        let mapped = r * from;
        let expected = to.normalize();
        assert_relative_eq!(mapped.x, expected.x, epsilon = 1e-5);
        assert_relative_eq!(mapped.y, expected.y, epsilon = 1e-5);
        assert_relative_eq!(mapped.z, expected.z, epsilon = 1e-5);
    }

    #[test]
    fn shortest_arc_handles_antiparallel_and_zero() {
        let v = Vector3::new(0.0, 1.0, 0.0);
        let flipped = shortest_arc(&v, &-v) * v;
        assert_relative_eq!(flipped.y, -1.0, epsilon = 1e-5);
        assert_eq!(shortest_arc(&Vector3::zeros(), &v), UnitQuaternion::identity());
    }

    #[test]
    fn angle_between_degenerate_is_zero() {
        assert_relative_eq!(angle_between(&Vector3::zeros(), &Vector3::x()), 0.0);
        assert_relative_eq!(
            angle_between(&Vector3::x(), &Vector3::y()),
            std::f32::consts::FRAC_PI_2,
            epsilon = 1e-6
        );
    }
}
