use glam::DVec3;

use crate::foundation::core::{CancelToken, Side};
use crate::foundation::error::SizingResult;
use crate::foundation::math::from_axis_and_quaternion;
use crate::kinematics::axis::decompose_rotation_by_local_axis;
use crate::model::names;
use crate::sizing::data_set::DataSet;

/// Move the roll of arm, elbow and wrist onto the twist bones.
///
/// Arm and wrist keep their swing (`z · y`); the arm's roll goes to the arm twist, the elbow's
/// swing becomes a pure bend about its local Y, and the elbow and wrist rolls both go to the
/// wrist twist. Every frame keyed on any of the five bones is registered on all five.
pub fn spread_twist(ds: &mut DataSet, cancel: &CancelToken) -> SizingResult<bool> {
    let mut ran = false;
    for side in Side::BOTH {
        ran |= spread_side(ds, side, cancel)?;
    }
    Ok(ran)
}

fn spread_side(ds: &mut DataSet, side: Side, cancel: &CancelToken) -> SizingResult<bool> {
    let arm = side.bone(names::ARM);
    let arm_twist = side.bone(names::ARM_TWIST);
    let elbow = side.bone(names::ELBOW);
    let wrist_twist = side.bone(names::WRIST_TWIST);
    let wrist = side.bone(names::WRIST);
    let bones = [&arm, &arm_twist, &elbow, &wrist_twist, &wrist];
    if !ds.rep_model.has_all(&bones) {
        tracing::info!(side = side.prefix(), "twist spread skipped: twist bones missing");
        return Ok(false);
    }

    let rep = &ds.rep_model;
    let arm_axis = rep.local_x_axis(&arm);
    let arm_twist_axis = rep.local_x_axis(&arm_twist);
    let elbow_axis = rep.local_x_axis(&elbow);
    let elbow_y_axis = elbow_axis.cross(DVec3::NEG_Z).normalize_or_zero();
    let wrist_twist_axis = rep.local_x_axis(&wrist_twist);
    let wrist_axis = rep.local_x_axis(&wrist);

    let mut milestone = 0;
    for frame in ds.motion.bone_fnos(&bones) {
        cancel.check()?;
        let mut arm_bf = ds.motion.calc_bf(&arm, frame);
        let mut arm_twist_bf = ds.motion.calc_bf(&arm_twist, frame);
        let mut elbow_bf = ds.motion.calc_bf(&elbow, frame);
        let mut wrist_twist_bf = ds.motion.calc_bf(&wrist_twist, frame);
        let mut wrist_bf = ds.motion.calc_bf(&wrist, frame);

        let a = decompose_rotation_by_local_axis(arm_bf.rotation, arm_axis);
        let e = decompose_rotation_by_local_axis(elbow_bf.rotation, elbow_axis);
        let w = decompose_rotation_by_local_axis(wrist_bf.rotation, wrist_axis);

        arm_bf.rotation = (a.z * a.y).normalize();
        arm_twist_bf.rotation = from_axis_and_quaternion(arm_twist_axis, a.x);
        elbow_bf.rotation = from_axis_and_quaternion(elbow_y_axis, e.z * e.y);
        wrist_bf.rotation = (w.z * w.y).normalize();
        wrist_twist_bf.rotation = (from_axis_and_quaternion(wrist_twist_axis, e.x)
            * from_axis_and_quaternion(wrist_twist_axis, w.x))
        .normalize();

        ds.motion.regist_bf(arm_bf, &arm, frame);
        ds.motion.regist_bf(arm_twist_bf, &arm_twist, frame);
        ds.motion.regist_bf(elbow_bf, &elbow, frame);
        ds.motion.regist_bf(wrist_twist_bf, &wrist_twist, frame);
        ds.motion.regist_bf(wrist_bf, &wrist, frame);
        super::frame_milestone(&mut milestone, frame, &arm);
    }
    tracing::info!(side = side.prefix(), "twist spread done");
    Ok(true)
}

#[cfg(test)]
#[path = "../../../tests/unit/services/stance/twist.rs"]
mod tests;
