//! Small fixed-size vector helpers for 3D positions and velocities.

use cellfield_data::Vec3;

#[inline]
#[must_use]
pub fn sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
#[must_use]
pub fn add(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

#[inline]
#[must_use]
pub fn scale(a: Vec3, s: f64) -> Vec3 {
    [a[0] * s, a[1] * s, a[2] * s]
}

/// `a += s * b`
#[inline]
pub fn axpy(a: &mut Vec3, s: f64, b: Vec3) {
    a[0] += s * b[0];
    a[1] += s * b[1];
    a[2] += s * b[2];
}

#[inline]
#[must_use]
pub fn norm_squared(a: Vec3) -> f64 {
    a[0] * a[0] + a[1] * a[1] + a[2] * a[2]
}

#[inline]
#[must_use]
pub fn norm(a: Vec3) -> f64 {
    norm_squared(a).sqrt()
}

#[inline]
#[must_use]
pub fn distance(a: Vec3, b: Vec3) -> f64 {
    norm(sub(a, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axpy_and_norm() {
        let mut a = [1.0, 0.0, 0.0];
        axpy(&mut a, 2.0, [0.0, 1.5, 2.0]);
        assert_eq!(a, [1.0, 3.0, 4.0]);
        assert!((norm([0.0, 3.0, 4.0]) - 5.0).abs() < 1e-12);
        assert!((distance(a, [1.0, 0.0, 0.0]) - 5.0).abs() < 1e-12);
    }
}
