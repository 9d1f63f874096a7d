use glam::{DQuat, DVec3};

use crate::foundation::math;

/// Rotation split into twist about a bone's local X axis and swing about its local Y and Z.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AxisComponents {
    pub x: DQuat,
    pub y: DQuat,
    pub z: DQuat,
}

impl AxisComponents {
    /// `z * y * x`, which reconstructs the decomposed rotation.
    pub fn compose(self) -> DQuat {
        (self.z * self.y * self.x).normalize()
    }
}

fn keep_axis(q: DQuat, axis: DVec3) -> DQuat {
    let v = q.xyz();
    let p = axis * v.dot(axis);
    let t = DQuat::from_xyzw(p.x, p.y, p.z, q.w);
    if t.length_squared() < 1e-24 {
        DQuat::IDENTITY
    } else {
        t.normalize()
    }
}

/// Swing/twist decomposition of `rotation` in the frame whose X axis is `local_x_axis`.
pub fn decompose_rotation_by_local_axis(rotation: DQuat, local_x_axis: DVec3) -> AxisComponents {
    let to_local = math::rotation_arc(local_x_axis, DVec3::X);
    let to_global = to_local.inverse();
    let local = (to_local * rotation.normalize() * to_global).normalize();

    let x = keep_axis(local, DVec3::X);
    let swing = (local * x.inverse()).normalize();
    let y = keep_axis(swing, DVec3::Y);
    let z = (swing * y.inverse()).normalize();

    let back = |q: DQuat| (to_global * q * to_local).normalize();
    AxisComponents {
        x: back(x),
        y: back(y),
        z: back(z),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/kinematics/axis.rs"]
mod tests;
