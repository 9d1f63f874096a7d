use glam::{DMat3, DQuat, DVec3};

/// Components with a magnitude below this are treated as zero.
pub const EPSILON: f64 = 1e-6;

/// Floor near-zero and non-finite scalars to `0.0`.
pub fn effective_scalar(v: f64) -> f64 {
    if !v.is_finite() || v.abs() < EPSILON {
        0.0
    } else {
        v
    }
}

/// Component-wise [`effective_scalar`].
pub fn effective(v: DVec3) -> DVec3 {
    DVec3::new(
        effective_scalar(v.x),
        effective_scalar(v.y),
        effective_scalar(v.z),
    )
}

/// Replace zero (or non-finite) components with `1.0`, for use as a ratio.
pub fn one(v: DVec3) -> DVec3 {
    fn fix(c: f64) -> f64 {
        if effective_scalar(c) == 0.0 { 1.0 } else { c }
    }
    DVec3::new(fix(v.x), fix(v.y), fix(v.z))
}

/// `num / den`, or `1.0` when the division is not meaningful.
pub fn ratio(num: f64, den: f64) -> f64 {
    if effective_scalar(den) == 0.0 {
        return 1.0;
    }
    let r = num / den;
    if r.is_finite() { r } else { 1.0 }
}

/// Component-wise [`ratio`].
pub fn ratio3(num: DVec3, den: DVec3) -> DVec3 {
    DVec3::new(ratio(num.x, den.x), ratio(num.y, den.y), ratio(num.z, den.z))
}

/// Orientation whose local +Z points along `direction`, with `up` fixing the roll.
///
/// Degenerate inputs (zero direction, or `up` parallel to `direction`) fall back to
/// the shortest arc from +Z.
pub fn from_direction(direction: DVec3, up: DVec3) -> DQuat {
    let z = direction.normalize_or_zero();
    if z == DVec3::ZERO {
        return DQuat::IDENTITY;
    }
    let x = up.normalize_or_zero().cross(z).normalize_or_zero();
    if x == DVec3::ZERO {
        return DQuat::from_rotation_arc(DVec3::Z, z);
    }
    let y = z.cross(x).normalize();
    DQuat::from_mat3(&DMat3::from_cols(x, y, z)).normalize()
}

/// Shortest rotation taking `from` onto `to`; identity for zero-length input.
pub fn rotation_arc(from: DVec3, to: DVec3) -> DQuat {
    let a = from.normalize_or_zero();
    let b = to.normalize_or_zero();
    if a == DVec3::ZERO || b == DVec3::ZERO {
        return DQuat::IDENTITY;
    }
    DQuat::from_rotation_arc(a, b)
}

/// Rotation about `axis` by the angle of `q`, signed by which way `q`'s own axis leans.
pub fn from_axis_and_quaternion(axis: DVec3, q: DQuat) -> DQuat {
    let axis = axis.normalize_or_zero();
    if axis == DVec3::ZERO {
        return DQuat::IDENTITY;
    }
    let q = q.normalize();
    let angle = 2.0 * q.w.clamp(-1.0, 1.0).acos();
    let sign = if axis.dot(q.xyz()) < 0.0 { -1.0 } else { 1.0 };
    DQuat::from_axis_angle(axis, angle * sign)
}

/// Absolute quaternion dot product, which ignores the double-cover sign.
pub fn abs_dot(a: DQuat, b: DQuat) -> f64 {
    a.normalize().dot(b.normalize()).abs()
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
