use glam::{DMat4, DQuat, DVec3};

use crate::foundation::core::{CancelToken, FrameIndex, Side};
use crate::foundation::error::SizingResult;
use crate::kinematics::fk::{FkOpts, calc_global_pose};
use crate::kinematics::ik::CcdSolver;
use crate::model::motion::Motion;
use crate::model::names;
use crate::model::skeleton::{RigidBody, RigidShape, Skeleton};
use crate::services::stance::frame_milestone;
use crate::sizing::data_set::DataSet;

/// A rigid body placed in world space at one frame.
#[derive(Clone, Copy, Debug)]
pub struct PlacedBody {
    pub shape: RigidShape,
    pub size: DVec3,
    pub center: DVec3,
    pub rotation: DQuat,
}

impl PlacedBody {
    /// Follow `body`'s bone through the motion at `frame`.
    pub fn place(
        skeleton: &Skeleton,
        motion: &Motion,
        body: &RigidBody,
        frame: FrameIndex,
    ) -> Option<PlacedBody> {
        let bone = skeleton.bone_at(body.bone);
        let chain = skeleton.chain_to(&bone.name)?;
        let pose = calc_global_pose(skeleton, &chain, motion, frame, FkOpts::default());
        let m: DMat4 = pose.matrix(body.bone)?;
        let (_, bone_rot, _) = m.to_scale_rotation_translation();
        Some(PlacedBody {
            shape: body.shape,
            size: body.size,
            center: m.transform_point3(body.position - bone.position),
            rotation: (bone_rot * body.rotation).normalize(),
        })
    }

    /// The nearest surface point when `point` lies inside the volume.
    pub fn push_out(&self, point: DVec3) -> Option<DVec3> {
        let local = self.rotation.inverse() * (point - self.center);
        let surface = match self.shape {
            RigidShape::Sphere => push_out_of_sphere(local, DVec3::ZERO, self.size.x)?,
            RigidShape::Box => push_out_of_box(local, self.size)?,
            RigidShape::Capsule => {
                let half = self.size.y / 2.0;
                let axis = DVec3::new(0.0, local.y.clamp(-half, half), 0.0);
                push_out_of_sphere(local, axis, self.size.x)?
            }
        };
        Some(self.center + self.rotation * surface)
    }
}

fn push_out_of_sphere(local: DVec3, center: DVec3, radius: f64) -> Option<DVec3> {
    let d = local - center;
    if d.length() >= radius {
        return None;
    }
    // Dead center has no exit normal; leave towards the front.
    let normal = d.try_normalize().unwrap_or(DVec3::NEG_Z);
    Some(center + normal * radius)
}

fn push_out_of_box(local: DVec3, half: DVec3) -> Option<DVec3> {
    let depth = half - local.abs();
    if depth.min_element() <= 0.0 {
        return None;
    }
    let mut out = local;
    let sign = |v: f64| if v < 0.0 { -1.0 } else { 1.0 };
    if depth.x <= depth.y && depth.x <= depth.z {
        out.x = sign(local.x) * half.x;
    } else if depth.y <= depth.z {
        out.y = sign(local.y) * half.y;
    } else {
        out.z = sign(local.z) * half.z;
    }
    Some(out)
}

/// Push the rep wrists out of the data set's selected rigid bodies.
///
/// Every frame keyed on the arm chain is checked against each body in turn; a wrist inside a
/// body is moved to the nearest surface point and the arm and elbow are re-solved to reach
/// it. Returns how many corrections were written.
#[tracing::instrument(skip_all, fields(data_set = idx + 1))]
pub fn avoid_arm_collisions(
    ds: &mut DataSet,
    idx: usize,
    cancel: &CancelToken,
) -> SizingResult<usize> {
    if ds.avoidance_bodies.is_empty() {
        return Ok(0);
    }
    let mut bodies = Vec::with_capacity(ds.avoidance_bodies.len());
    for name in &ds.avoidance_bodies {
        match ds.rep_model.rigid_body(name) {
            Some(body) => bodies.push(body.clone()),
            None => tracing::warn!(body = %name, "avoidance rigid body not found on target model"),
        }
    }

    let solver = CcdSolver::default();
    let mut corrected = 0;
    for side in Side::BOTH {
        let arm = side.bone(names::ARM);
        let elbow = side.bone(names::ELBOW);
        let wrist = side.bone(names::WRIST);
        let rep = &ds.rep_model;
        let (Some(arm_idx), Some(elbow_idx), Some(wrist_idx), Some(chain)) = (
            rep.index_of(&arm),
            rep.index_of(&elbow),
            rep.index_of(&wrist),
            rep.chain_to(&wrist),
        ) else {
            tracing::info!(side = side.prefix(), "avoidance skipped: arm bones missing");
            continue;
        };

        let mut milestone = 0;
        for frame in ds.motion.bone_fnos(&[&arm, &elbow, &wrist]) {
            cancel.check()?;
            for body in &bodies {
                let Some(placed) = PlacedBody::place(rep, &ds.motion, body, frame) else {
                    continue;
                };
                let pose = calc_global_pose(rep, &chain, &ds.motion, frame, FkOpts::default());
                let Some(target) = placed.push_out(pose.target_position()) else {
                    continue;
                };
                let reached = solver.solve_into(
                    rep,
                    &mut ds.motion,
                    &[arm_idx, elbow_idx],
                    wrist_idx,
                    target,
                    frame,
                );
                if let Some(reached) = reached {
                    tracing::debug!(
                        frame = frame.0,
                        body = %body.name,
                        miss = (reached - target).length(),
                        "wrist pushed out of rigid body"
                    );
                    corrected += 1;
                }
            }
            frame_milestone(&mut milestone, frame, &wrist);
        }
    }

    tracing::info!(corrected, bodies = bodies.len(), "arm avoidance done");
    Ok(corrected)
}

#[cfg(test)]
#[path = "../../tests/unit/services/arm_avoidance.rs"]
mod tests;
