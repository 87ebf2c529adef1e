//! Quaternion and matrix helpers matching the game's math library
//!
//! Quaternions are stored as `glam::Vec4` (x, y, z, w) rather than `glam::Quat`
//! because key data is not guaranteed to be normalized, and the TCB rotation
//! data stores non-quaternion values in the same slots. All arithmetic here is
//! written out component by component so the rounding matches the game's
//! operation order exactly, instead of relying on SIMD reductions.

use glam::{Mat4, Vec3, Vec4};

/// Identity quaternion, also used as the fallback vector for missing keys.
pub const IDENTITY: Vec4 = Vec4::new(0.0, 0.0, 0.0, 1.0);

/// Squared length accumulated in double precision.
pub fn length_squared(v: Vec4) -> f64 {
    let (x, y, z, w) = (v.x as f64, v.y as f64, v.z as f64, v.w as f64);
    x * x + y * y + z * z + w * w
}

/// Four component dot product, evaluated left to right in single precision.
pub fn dot(a: Vec4, b: Vec4) -> f32 {
    (a.x * b.x) + (a.y * b.y) + (a.z * b.z) + (a.w * b.w)
}

/// Normalize a quaternion.
///
/// The squared magnitude is summed in single precision and the inverse
/// square root taken in double precision. A vector whose magnitude is not
/// finite cannot be normalized and becomes the identity quaternion.
pub fn normalize(v: Vec4) -> Vec4 {
    let magnitude_sq = ((v.x * v.x) + (v.y * v.y) + (v.z * v.z) + (v.w * v.w)) as f64;
    if !magnitude_sq.is_finite() {
        log::warn!("{v} cannot be normalized, its squared magnitude was {magnitude_sq}");
        return IDENTITY;
    }

    let inverse_magnitude = 1.0 / magnitude_sq.sqrt();
    Vec4::new(
        (v.x as f64 * inverse_magnitude) as f32,
        (v.y as f64 * inverse_magnitude) as f32,
        (v.z as f64 * inverse_magnitude) as f32,
        (v.w as f64 * inverse_magnitude) as f32,
    )
}

/// Spherical linear interpolation between two quaternions.
///
/// Zero-length inputs yield the other input. Inputs which are already equal
/// (or exactly opposite) return `q1` untouched. Close quaternions fall back to
/// linear weights, and the result is always renormalized.
pub fn slerp(q1: Vec4, q2: Vec4, t: f32) -> Vec4 {
    if length_squared(q1) == 0.0 {
        return if length_squared(q2) == 0.0 {
            Vec4::ZERO
        } else {
            q2
        };
    } else if length_squared(q2) == 0.0 {
        return q1;
    }

    let mut cos_half_angle = dot(q1, q2) as f64;
    if cos_half_angle >= 1.0 || cos_half_angle <= -1.0 {
        return q1;
    }

    let negate = cos_half_angle < 0.0;
    if negate {
        cos_half_angle = -cos_half_angle;
    }

    let (blend_a, mut blend_b) = if cos_half_angle < 0.99 {
        let half_angle = cos_half_angle.acos() as f32;
        let sin_half_angle = (half_angle as f64).sin() as f32;
        let one_over_sin = 1.0 / sin_half_angle;
        (
            ((half_angle * (1.0 - t)) as f64).sin() as f32 * one_over_sin,
            ((half_angle * t) as f64).sin() as f32 * one_over_sin,
        )
    } else {
        (1.0 - t, t)
    };

    if negate {
        blend_b = -blend_b;
    }

    let result = Vec4::new(
        blend_a * q1.x + blend_b * q2.x,
        blend_a * q1.y + blend_b * q2.y,
        blend_a * q1.z + blend_b * q2.z,
        blend_a * q1.w + blend_b * q2.w,
    );

    if result.w.is_nan() || length_squared(result) <= 0.0 {
        return IDENTITY;
    }

    normalize(result)
}

/// Quaternion product in the game's operand order.
pub fn quat_mul(q1: Vec4, q2: Vec4) -> Vec4 {
    let (x1, y1, z1, w1) = (q1.x, q1.y, q1.z, q1.w);
    let (x2, y2, z2, w2) = (q2.x, q2.y, q2.z, q2.w);

    Vec4::new(
        (y2 * z1 + x2 * w1 + w2 * x1) - z2 * y1,
        (z2 * x1 + y2 * w1 + w2 * y1) - x2 * z1,
        (x2 * y1 + z2 * w1 + w2 * z1) - y2 * x1,
        ((w2 * w1 - x2 * x1) - y2 * y1) - z2 * z1,
    )
}

/// Build a rotation matrix from a (possibly unnormalized) quaternion.
///
/// The basis is scaled by `2 / |q|^2`, a zero quaternion produces the identity.
pub fn rotation_matrix(q: Vec4) -> Mat4 {
    let sqx = q.x * q.x;
    let sqy = q.y * q.y;
    let sqz = q.z * q.z;
    let sqw = q.w * q.w;
    let dot = sqx + sqy + sqz + sqw;

    let xy = q.x * q.y;
    let xz = q.x * q.z;
    let xw = q.x * q.w;
    let yz = q.y * q.z;
    let yw = q.y * q.w;
    let zw = q.z * q.w;

    let s2 = if dot > 0.0 { 2.0 / dot } else { 0.0 };

    Mat4::from_cols(
        Vec4::new(
            1.0 - (s2 * (sqy + sqz)),
            s2 * (xy + zw),
            s2 * (xz - yw),
            0.0,
        ),
        Vec4::new(
            s2 * (xy - zw),
            1.0 - (s2 * (sqx + sqz)),
            s2 * (yz + xw),
            0.0,
        ),
        Vec4::new(
            s2 * (xz + yw),
            s2 * (yz - xw),
            1.0 - (s2 * (sqx + sqy)),
            0.0,
        ),
        Vec4::W,
    )
}

/// Compose a local offset matrix from a pose.
///
/// Rotation first, then the translation column, then scale (skipped for unit scale).
/// The scale multiplies the translation as well, as it does in the game.
pub fn offset_matrix(position: Vec3, rotation: Vec4, scale: Vec3) -> Mat4 {
    let mut matrix = rotation_matrix(rotation);
    matrix.w_axis = position.extend(1.0);

    if scale != Vec3::ONE {
        matrix = Mat4::from_scale(scale) * matrix;
    }

    matrix
}

/// Componentwise linear interpolation.
pub fn lerp_vec3(from: Vec3, to: Vec3, t: f32) -> Vec3 {
    Vec3::new(
        from.x + (to.x - from.x) * t,
        from.y + (to.y - from.y) * t,
        from.z + (to.z - from.z) * t,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_1_SQRT_2;

    fn assert_vec4_close(a: Vec4, b: Vec4) {
        assert!((a - b).abs().max_element() < 1e-5, "{a} != {b}");
    }

    #[test]
    fn test_slerp_endpoints() {
        let q0 = IDENTITY;
        let q1 = Vec4::new(0.0, FRAC_1_SQRT_2, 0.0, FRAC_1_SQRT_2);

        assert_vec4_close(slerp(q0, q1, 0.0), q0);
        assert_vec4_close(slerp(q0, q1, 1.0), q1);
    }

    #[test]
    fn test_slerp_midpoint_is_unit() {
        let q0 = IDENTITY;
        let q1 = Vec4::new(1.0, 0.0, 0.0, 0.0);

        let mid = slerp(q0, q1, 0.5);
        assert!((length_squared(mid).sqrt() - 1.0).abs() < 1e-5);
        assert_vec4_close(mid, Vec4::new(FRAC_1_SQRT_2, 0.0, 0.0, FRAC_1_SQRT_2));
    }

    #[test]
    fn test_slerp_zero_inputs() {
        let q = Vec4::new(0.0, 1.0, 0.0, 0.0);
        assert_eq!(slerp(Vec4::ZERO, q, 0.5), q);
        assert_eq!(slerp(q, Vec4::ZERO, 0.5), q);
        assert_eq!(slerp(Vec4::ZERO, Vec4::ZERO, 0.5), Vec4::ZERO);
    }

    #[test]
    fn test_slerp_identical_returns_first() {
        let q = IDENTITY;
        assert_eq!(slerp(q, q, 0.3), q);
        assert_eq!(slerp(q, -q, 0.3), q);
    }

    #[test]
    fn test_slerp_takes_short_path() {
        let q0 = IDENTITY;
        let q1 = -Vec4::new(0.0, 0.0, FRAC_1_SQRT_2, FRAC_1_SQRT_2);

        // Negated target is the same rotation, so the midpoint stays on the short arc.
        let mid = slerp(q0, q1, 0.5);
        assert!(mid.w > 0.9);
    }

    #[test]
    fn test_quat_mul_identity() {
        let q = Vec4::new(0.1, 0.2, 0.3, 0.9);
        assert_eq!(quat_mul(q, IDENTITY), q);
        assert_eq!(quat_mul(IDENTITY, q), q);
    }

    #[test]
    fn test_quat_mul_operand_order() {
        let x = Vec4::new(1.0, 0.0, 0.0, 0.0);
        let y = Vec4::new(0.0, 1.0, 0.0, 0.0);

        // The game multiplies with the operands swapped relative to Hamilton order.
        assert_eq!(quat_mul(x, y), Vec4::new(0.0, 0.0, -1.0, 0.0));
        assert_eq!(quat_mul(y, x), Vec4::new(0.0, 0.0, 1.0, 0.0));
    }

    #[test]
    fn test_rotation_matrix_identity() {
        assert_eq!(rotation_matrix(IDENTITY), Mat4::IDENTITY);
        assert_eq!(rotation_matrix(Vec4::ZERO), Mat4::IDENTITY);
    }

    #[test]
    fn test_rotation_matrix_unnormalized() {
        let unit = Vec4::new(0.0, 0.0, FRAC_1_SQRT_2, FRAC_1_SQRT_2);
        let scaled = unit * 3.0;

        let a = rotation_matrix(unit);
        let b = rotation_matrix(scaled);
        assert!(a.abs_diff_eq(b, 1e-5));

        // 90 degrees around Z maps X onto Y.
        let rotated = a.transform_vector3(Vec3::X);
        assert!(rotated.abs_diff_eq(Vec3::Y, 1e-5));
    }

    #[test]
    fn test_offset_matrix_translation_and_scale() {
        let matrix = offset_matrix(Vec3::new(1.0, 2.0, 3.0), IDENTITY, Vec3::ONE);
        assert_eq!(matrix.w_axis, Vec4::new(1.0, 2.0, 3.0, 1.0));

        let scaled = offset_matrix(Vec3::new(1.0, 2.0, 3.0), IDENTITY, Vec3::splat(2.0));
        assert_eq!(scaled.x_axis, Vec4::new(2.0, 0.0, 0.0, 0.0));
        assert_eq!(scaled.w_axis, Vec4::new(2.0, 4.0, 6.0, 1.0));
    }

    #[test]
    fn test_lerp_vec3() {
        let a = Vec3::new(0.0, 2.0, -4.0);
        let b = Vec3::new(10.0, 4.0, 4.0);

        assert_eq!(lerp_vec3(a, b, 0.0), a);
        assert_eq!(lerp_vec3(a, b, 1.0), b);
        assert_eq!(lerp_vec3(a, b, 0.5), Vec3::new(5.0, 3.0, 0.0));
    }
}
