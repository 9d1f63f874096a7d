use crate::foundation::core::{CancelToken, Side};
use crate::foundation::error::SizingResult;
use crate::model::names;
use crate::sizing::data_set::DataSet;

use super::chain::{
    ChainSpec, SHOULDER_DOT_THRESHOLD, StancePair, UpLandmark, adjust_rotation_by_parent,
    adjust_rotation_by_parents, calc_rotation_stance, calibrate,
};
use super::split::prepare_split_stance;

/// Re-aim each shoulder so the arm root lands where the org pose puts it.
///
/// Shoulder-P keys are folded into the shoulder first and the shoulder-P track is dropped, so
/// the corrected shoulder carries the whole rotation. The arm is counter-rotated afterwards.
/// A shoulder whose bind stance differs too much is still folded but keeps its rotations.
pub fn adjust_shoulder_stance(ds: &mut DataSet, cancel: &CancelToken) -> SizingResult<bool> {
    let mut ran = false;
    for side in [Side::Right, Side::Left] {
        ran |= adjust_side(ds, side, cancel)?;
    }
    Ok(ran)
}

fn adjust_side(ds: &mut DataSet, side: Side, cancel: &CancelToken) -> SizingResult<bool> {
    let shoulder_p = side.bone(names::SHOULDER_P);
    let shoulder = side.bone(names::SHOULDER);
    let arm = side.bone(names::ARM);
    let arm_under = side.bone(names::ARM_UNDER);
    let needed = [
        names::HEAD,
        names::NECK,
        names::NECK_BASE,
        names::UPPER,
        shoulder.as_str(),
        arm.as_str(),
        arm_under.as_str(),
    ];
    if !ds.org_model.has_all(&needed)
        || !ds.rep_model.has_all(&needed)
        || !ds.motion.has_bone(&shoulder)
    {
        tracing::info!(side = side.prefix(), "shoulder stance skipped: bones or keys missing");
        return Ok(false);
    }

    prepare_split_stance(&mut ds.motion, &shoulder);
    let fold_p = ds.motion.has_bone(&shoulder_p)
        && ds.org_model.has_bone(&shoulder_p)
        && ds.rep_model.has_bone(&shoulder_p);
    if fold_p {
        prepare_split_stance(&mut ds.motion, &shoulder_p);
    }
    let fnos = ds.motion.bone_fnos(&[shoulder.as_str(), shoulder_p.as_str()]);

    if fold_p {
        for &frame in &fnos {
            let bf = ds.motion.calc_bf(&shoulder, frame);
            if !bf.key {
                ds.motion.regist_bf(bf, &shoulder, frame);
            }
        }
        ds.motion.remove_bone(&shoulder_p);
        adjust_rotation_by_parent(
            &ds.org_model,
            &ds.org_motion,
            &ds.rep_model,
            &mut ds.motion,
            &shoulder,
            &shoulder_p,
        );
        tracing::info!(bone = %shoulder_p, "shoulder P folded into shoulder");
    }

    let spec = ChainSpec::new(&shoulder, &shoulder, &arm, UpLandmark::ArmUnder(side));
    let Some(calib) = calibrate(
        &ds.org_model,
        &ds.rep_model,
        &spec,
        Some(names::NECK_BASE),
        SHOULDER_DOT_THRESHOLD,
    )?
    else {
        tracing::info!(bone = %shoulder, "shoulder correction skipped; rotations kept");
        return Ok(true);
    };

    let mut milestone = 0;
    for frame in fnos {
        cancel.check()?;
        let mut bf = ds.motion.calc_bf(&shoulder, frame);
        let pair = StancePair {
            org: &ds.org_model,
            org_motion: &ds.org_motion,
            rep: &ds.rep_model,
            motion: &ds.motion,
        };
        if let Some(rotation) = calc_rotation_stance(pair, &spec, &calib, frame)? {
            bf.rotation = rotation;
        }
        ds.motion.regist_bf(bf, &shoulder, frame);
        super::frame_milestone(&mut milestone, frame, &shoulder);
    }

    // The folded shoulder stands for shoulder-P and shoulder together on the org side.
    let mut parents = vec![shoulder.as_str()];
    if fold_p {
        parents.insert(0, shoulder_p.as_str());
    }
    adjust_rotation_by_parents(
        &ds.org_model,
        &ds.org_motion,
        &ds.rep_model,
        &mut ds.motion,
        &arm,
        &parents,
    );
    tracing::info!(bone = %shoulder, "shoulder stance done");
    Ok(true)
}

#[cfg(test)]
#[path = "../../../tests/unit/services/stance/shoulder.rs"]
mod tests;
