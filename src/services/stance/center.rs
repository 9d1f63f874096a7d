use glam::DVec3;

use crate::foundation::core::{CancelToken, FrameIndex, Side};
use crate::foundation::error::SizingResult;
use crate::foundation::math;
use crate::kinematics::fk::{FkOpts, FrontPose, calc_front_global_pose};
use crate::model::motion::Motion;
use crate::model::names;
use crate::model::skeleton::Skeleton;
use crate::sizing::data_set::DataSet;

use super::chain::chain;
use super::split::prepare_split_stance;

/// Shift each center key horizontally so the center keeps its place relative to the feet and
/// to the trunk's pivots, as measured on the org motion at the original leg ratio.
pub fn adjust_center_stance(ds: &mut DataSet, cancel: &CancelToken) -> SizingResult<bool> {
    let needed = [
        names::CENTER,
        names::UPPER,
        names::LOWER,
        "左足ＩＫ",
        "右足ＩＫ",
        "左足",
        "右足",
    ];
    if !ds.org_model.has_all(&needed)
        || !ds.rep_model.has_all(&needed)
        || !ds.motion.has_bone(names::CENTER)
    {
        tracing::info!("center stance skipped: bones or keys missing");
        return Ok(false);
    }
    let original_xz = ds.original_ratios()?.xz;

    prepare_split_stance(&mut ds.motion, names::CENTER);

    let mut offsets = Vec::new();
    let mut milestone = 0;
    for frame in ds.motion.bone_fnos(&[names::CENTER]) {
        cancel.check()?;
        let leg = offset_by_leg_ik(ds, frame, original_xz)?;
        let trunk = offset_by_trunk(ds, frame, original_xz)?;
        tracing::debug!(frame = frame.0, ?leg, ?trunk, "center stance offsets");
        offsets.push((frame, leg + trunk));
        super::frame_milestone(&mut milestone, frame, names::CENTER);
    }

    if let Some(track) = ds.motion.bones.get_mut(names::CENTER) {
        for (frame, offset) in offsets {
            if let Some(bf) = track.get_mut(&frame) {
                bf.position += offset;
                bf.registered = true;
            }
        }
    }
    tracing::info!("center stance done");
    Ok(true)
}

fn front_of(
    s: &Skeleton,
    motion: &Motion,
    name: &str,
    frame: FrameIndex,
) -> SizingResult<(DVec3, FrontPose)> {
    let c = chain(s, name)?;
    let pose = calc_front_global_pose(s, &c, motion, frame, FkOpts::default());
    let front = pose.front_position(c.target()).unwrap_or_default();
    Ok((front, pose))
}

fn leg_ik_offset(
    s: &Skeleton,
    motion: &Motion,
    frame: FrameIndex,
) -> SizingResult<(DVec3, FrontPose)> {
    let (center, pose) = front_of(s, motion, s.facing_bone(), frame)?;
    let (left, _) = front_of(s, motion, &Side::Left.bone(names::LEG_IK), frame)?;
    let (right, _) = front_of(s, motion, &Side::Right.bone(names::LEG_IK), frame)?;
    let mut offset = math::effective((left + right) / 2.0 - center);
    offset.y = 0.0;
    Ok((offset, pose))
}

fn offset_by_leg_ik(ds: &DataSet, frame: FrameIndex, original_xz: f64) -> SizingResult<DVec3> {
    let (org, _) = leg_ik_offset(&ds.org_model, &ds.org_motion, frame)?;
    let (rep, rep_pose) = leg_ik_offset(&ds.rep_model, &ds.motion, frame)?;
    Ok(rep_pose.restore(rep - org * original_xz))
}

// Center position relative to the same body turned about `pivot` instead of the center.
fn pivot_diff(
    s: &Skeleton,
    motion: &Motion,
    pivot: &str,
    frame: FrameIndex,
) -> SizingResult<(DVec3, FrontPose)> {
    let (center, _) = front_of(s, motion, s.facing_bone(), frame)?;
    let c = chain(s, pivot)?;
    let bones: Vec<&str> = c
        .indices()
        .iter()
        .map(|&i| s.bone_at(i).name.as_str())
        .collect();
    let mut pivoted = motion.snapshot(&bones, frame);

    let mut shift = s.require(pivot)? - s.require(names::CENTER)?;
    shift.y = 0.0;
    let root = s.bone_at(c.root()).name.as_str();
    if let Some(bf) = pivoted.bones.get_mut(root).and_then(|t| t.get_mut(&frame)) {
        bf.position += shift;
    }

    let facing = s.index_of(s.facing_bone()).unwrap_or(c.target());
    let pose = calc_front_global_pose(s, &c, &pivoted, frame, FkOpts::default());
    let pivoted_center = pose.front_position(facing).unwrap_or_default();
    Ok((center - pivoted_center, pose))
}

fn offset_by_trunk(ds: &DataSet, frame: FrameIndex, original_xz: f64) -> SizingResult<DVec3> {
    let mut sum = DVec3::ZERO;
    for pivot in [names::UPPER, names::LOWER] {
        let (org, _) = pivot_diff(&ds.org_model, &ds.org_motion, pivot, frame)?;
        let (rep, rep_pose) = pivot_diff(&ds.rep_model, &ds.motion, pivot, frame)?;
        sum += rep_pose.restore(rep - org * original_xz);
    }
    let mut offset = math::effective(sum / 2.0);
    offset.y = 0.0;
    Ok(offset)
}

#[cfg(test)]
#[path = "../../../tests/unit/services/stance/center.rs"]
mod tests;
