use glam::DVec3;
use rayon::prelude::*;

use crate::foundation::core::{CancelToken, FrameIndex, Side};
use crate::foundation::error::SizingResult;
use crate::foundation::math;
use crate::kinematics::fk::calc_direction_qq;
use crate::model::motion::Motion;
use crate::model::names;
use crate::model::skeleton::Skeleton;
use crate::sizing::data_set::{DataSet, SizingRatios};

/// Scale the translation-only bones of one data set and apply the leg and center offsets.
///
/// The three offset computations only write the rep skeleton's scratch offsets; a missing bone
/// skips that computation. The per-bone rescale runs on `pool` against a snapshot of the motion
/// and is applied only after every bone succeeded.
#[tracing::instrument(skip_all, fields(data_set = idx + 1))]
pub fn adjust_move(
    ds: &mut DataSet,
    idx: usize,
    pool: &rayon::ThreadPool,
    cancel: &CancelToken,
) -> SizingResult<Vec<String>> {
    let ratios = ds.ratios()?;
    let original = ds.original_ratios()?;

    set_center_y_offset(ds);
    set_center_z_offset(ds);
    set_leg_ik_offset(ds, original.xz);

    let targets: Vec<&str> = names::MOVE_BONES
        .iter()
        .copied()
        .filter(|n| ds.motion.key_count(n) > 0 && ds.rep_model.has_bone(n))
        .collect();

    let rep = &ds.rep_model;
    let motion = &ds.motion;
    let results = pool.install(|| {
        targets
            .par_iter()
            .map(|name| scale_track(rep, motion, name, ratios, cancel).map(|v| (*name, v)))
            .collect::<Vec<_>>()
    });

    let mut scaled = Vec::with_capacity(results.len());
    for r in results {
        scaled.push(r?);
    }

    let mut adjusted = Vec::with_capacity(scaled.len());
    for (name, positions) in scaled {
        if let Some(track) = ds.motion.bones.get_mut(name) {
            for (frame, pos) in positions {
                if let Some(bf) = track.get_mut(&frame) {
                    bf.position = pos;
                }
            }
        }
        tracing::info!(bone = name, "move correction done");
        adjusted.push(name.to_string());
    }
    Ok(adjusted)
}

/// New local translations for every key of `name`: the key scaled by the leg ratios plus the
/// bone's scratch offset carried into world orientation.
pub fn scale_track(
    rep: &Skeleton,
    motion: &Motion,
    name: &str,
    ratios: SizingRatios,
    cancel: &CancelToken,
) -> SizingResult<Vec<(FrameIndex, DVec3)>> {
    let Some(track) = motion.track(name) else {
        return Ok(Vec::new());
    };
    let chain = rep.chain_to(name);
    let offset = rep.local_offset(name);
    let scale = DVec3::new(ratios.xz, ratios.y, ratios.xz);

    let mut out = Vec::with_capacity(track.len());
    for (&frame, bf) in track {
        cancel.check()?;
        let world_rot = match (&chain, offset == DVec3::ZERO) {
            (Some(chain), false) => calc_direction_qq(rep, chain, motion, frame),
            _ => glam::DQuat::IDENTITY,
        };
        out.push((frame, bf.position * scale + world_rot * offset));
    }
    Ok(out)
}

/// Horizontal foot-IK offset per leg so the stance width follows the rep skeleton.
pub fn set_leg_ik_offset(ds: &mut DataSet, original_xz: f64) -> bool {
    let leg_offset = ds.leg_offset;
    let mut offsets = Vec::with_capacity(2);

    for side in Side::BOTH {
        let leg = side.bone(names::LEG);
        let ik = side.bone(names::LEG_IK);
        let needed = [leg.as_str(), ik.as_str()];
        if !ds.org_model.has_all(&needed) || !ds.rep_model.has_all(&needed) {
            tracing::info!(side = side.prefix(), "no foot IK offset: leg bones missing");
            return false;
        }
        let org_ik = ds.org_model.position(&ik).unwrap_or_default();
        let org_leg = ds.org_model.position(&leg).unwrap_or_default();
        let rep_ik = ds.rep_model.position(&ik).unwrap_or_default();
        let rep_leg = ds.rep_model.position(&leg).unwrap_or_default();

        let mut offset = math::effective((org_ik - org_leg) * original_xz - (rep_ik - rep_leg));
        offset.y = 0.0;
        offset.z = 0.0;

        // Never push the foot past the body's midline.
        let limit = rep_ik.x.abs();
        if offset.x.abs() > limit {
            offset.x = limit * offset.x.signum();
        }
        offset.x += leg_offset * rep_ik.x.signum();

        let parent = side.bone(names::LEG_IK_PARENT);
        let holder = if ds.rep_model.has_bone(&parent) && ds.motion.has_bone(&parent) {
            parent
        } else {
            ik
        };
        tracing::info!(bone = %holder, x = offset.x, "foot IK offset");
        offsets.push((holder, offset));
    }

    for (holder, offset) in offsets {
        ds.rep_model.set_local_offset(&holder, offset);
    }
    true
}

/// Lower the center when the rep legs are straighter than the org legs' proportions imply.
pub fn set_center_y_offset(ds: &mut DataSet) -> bool {
    let leg = Side::Left.bone(names::LEG);
    let knee = Side::Left.bone(names::KNEE);
    let ankle = Side::Left.bone(names::ANKLE);
    let needed = [leg.as_str(), knee.as_str(), ankle.as_str(), names::CENTER];
    if !ds.org_model.has_all(&needed) || !ds.rep_model.has_all(&needed) {
        tracing::info!("no center Y offset: leg bones missing");
        return false;
    }

    let (org, rep) = (&ds.org_model, &ds.rep_model);
    let p = |s: &Skeleton, n: &str| s.position(n).unwrap_or_default();

    let org_ankle = p(org, &ankle) - DVec3::new(ds.leg_offset, 0.0, 0.0);
    let org_upper = p(org, &knee).distance(p(org, &leg));
    let org_lower = p(org, &knee).distance(org_ankle);
    let org_ik = (p(org, &leg) - org_ankle).y;
    let org_ratio = math::ratio(org_ik, org_upper + org_lower);

    let rep_upper = p(rep, &knee).distance(p(rep, &leg));
    let rep_lower = p(rep, &knee).distance(p(rep, &ankle));
    let rep_ik = (p(rep, &leg) - p(rep, &ankle)).y;
    let recalc = org_ratio * (rep_upper + rep_lower);

    if recalc < rep_ik - math::EPSILON {
        let offset_y = recalc - rep_ik;
        if let Some(o) = ds.rep_model.local_offset_mut(names::CENTER) {
            o.y = offset_y;
        }
        tracing::info!(offset_y, "center Y offset");
        return true;
    }
    tracing::info!("no center Y offset");
    false
}

/// Shift the center forward or back so the weight sits at the same fraction of the foot.
pub fn set_center_z_offset(ds: &mut DataSet) -> bool {
    let toe_ik = Side::Left.bone(names::TOE_IK);
    let leg = Side::Left.bone(names::LEG);
    let ankle = Side::Left.bone(names::ANKLE);
    let toe = Side::Left.bone(names::TOE_ENTITY);
    let needed = [
        toe_ik.as_str(),
        leg.as_str(),
        ankle.as_str(),
        toe.as_str(),
        names::CENTER,
    ];
    if !ds.org_model.has_all(&needed) || !ds.rep_model.has_all(&needed) {
        tracing::info!("no center Z offset: foot bones missing");
        return false;
    }

    let gravity = |s: &Skeleton| {
        let z = |n: &str| s.position(n).map_or(0.0, |v| v.z);
        let foot = z(&ankle) - z(&toe);
        (math::ratio(z(&ankle) - z(&leg), foot), foot)
    };
    let (org_gravity, org_len) = gravity(&ds.org_model);
    let (rep_gravity, rep_len) = gravity(&ds.rep_model);

    let offset_z = math::effective_scalar((rep_gravity - org_gravity) * math::ratio(rep_len, org_len));
    if let Some(o) = ds.rep_model.local_offset_mut(names::CENTER) {
        o.z = offset_z;
    }
    tracing::info!(offset_z, "center Z offset");
    true
}

#[cfg(test)]
#[path = "../../tests/unit/services/move_scale.rs"]
mod tests;
