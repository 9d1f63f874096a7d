use crate::foundation::core::{CancelToken, Side};
use crate::foundation::error::SizingResult;
use crate::model::names;
use crate::sizing::data_set::DataSet;

use super::chain::{
    ChainSpec, TRUNK_DOT_THRESHOLD, UpLandmark, adjust_rotation_by_parent, calibrate,
    correct_chain,
};
use super::split::prepare_split_stance;

/// Re-aim the upper body (and upper body 2 when both models have it) so the head sits where the
/// org pose puts it relative to the rep's shoulder width. Neck and arms are counter-rotated so
/// their world orientation is preserved.
pub fn adjust_upper_stance(ds: &mut DataSet, cancel: &CancelToken) -> SizingResult<bool> {
    let left_arm = Side::Left.bone(names::ARM);
    let right_arm = Side::Right.bone(names::ARM);
    let needed = [
        names::UPPER,
        names::HEAD,
        names::NECK,
        left_arm.as_str(),
        right_arm.as_str(),
    ];
    if !ds.org_model.has_all(&needed)
        || !ds.rep_model.has_all(&needed)
        || !ds.motion.has_bone(names::UPPER)
    {
        tracing::info!("upper body stance skipped: bones or keys missing");
        return Ok(false);
    }

    let children = [names::NECK, left_arm.as_str(), right_arm.as_str()];
    correct_trunk(ds, names::UPPER, &children, cancel)?;

    let upper2 = ds.org_model.has_bone(names::UPPER2)
        && ds.rep_model.has_bone(names::UPPER2)
        && ds.motion.key_count(names::UPPER2) > 1;
    if upper2 {
        correct_trunk(ds, names::UPPER2, &children, cancel)?;
    } else {
        tracing::info!("upper body 2 stance skipped");
    }
    Ok(true)
}

fn correct_trunk(
    ds: &mut DataSet,
    bone: &str,
    children: &[&str],
    cancel: &CancelToken,
) -> SizingResult<()> {
    let spec = ChainSpec::new(bone, bone, names::HEAD, UpLandmark::ArmSpan);
    let Some(calib) = calibrate(&ds.org_model, &ds.rep_model, &spec, None, TRUNK_DOT_THRESHOLD)?
    else {
        return Ok(());
    };

    prepare_split_stance(&mut ds.motion, bone);
    let changed = correct_chain(
        &ds.org_model,
        &ds.org_motion,
        &ds.rep_model,
        &mut ds.motion,
        &spec,
        &calib,
        cancel,
    )?;
    for child in children {
        adjust_rotation_by_parent(
            &ds.org_model,
            &ds.org_motion,
            &ds.rep_model,
            &mut ds.motion,
            child,
            bone,
        );
    }
    tracing::info!(bone, changed, "trunk stance done");
    Ok(())
}
