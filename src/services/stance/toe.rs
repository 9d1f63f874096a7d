use glam::DVec3;

use crate::foundation::core::{CancelToken, FrameIndex, Side};
use crate::foundation::error::SizingResult;
use crate::foundation::math;
use crate::kinematics::fk::{FkOpts, calc_global_pose};
use crate::model::motion::Motion;
use crate::model::names;
use crate::model::skeleton::Skeleton;
use crate::sizing::data_set::DataSet;

use super::chain::chain;

const FLOOR_TOLERANCE: f64 = 1e-6;

struct FootBones {
    ik: String,
    ik_parent: String,
    toe_ik: String,
    ankle: String,
    toe: String,
    sole: String,
}

impl FootBones {
    fn new(side: Side) -> Self {
        Self {
            ik: side.bone(names::LEG_IK),
            ik_parent: side.bone(names::LEG_IK_PARENT),
            toe_ik: side.bone(names::TOE_IK),
            ankle: side.bone(names::ANKLE),
            toe: side.bone(names::TOE_ENTITY),
            sole: side.bone(names::SOLE_ENTITY),
        }
    }

    fn required(&self) -> [&str; 5] {
        [&self.ik, &self.toe_ik, &self.ankle, &self.toe, &self.sole]
    }
}

/// Re-seat each foot IK vertically so the toe (or sole, whichever is lower) keeps its height
/// above the floor, then lift any contact point that ends up below the floor.
pub fn adjust_toe_stance(ds: &mut DataSet, cancel: &CancelToken) -> SizingResult<bool> {
    let mut ran = false;
    for side in Side::BOTH {
        ran |= adjust_side(ds, side, cancel)?;
    }
    Ok(ran)
}

fn entity(s: &Skeleton, motion: &Motion, name: &str, frame: FrameIndex) -> SizingResult<DVec3> {
    let c = chain(s, name)?;
    Ok(calc_global_pose(s, &c, motion, frame, FkOpts::default()).target_position())
}

fn adjust_side(ds: &mut DataSet, side: Side, cancel: &CancelToken) -> SizingResult<bool> {
    let foot = FootBones::new(side);
    if !ds.org_model.has_all(&foot.required()) || !ds.rep_model.has_all(&foot.required()) {
        tracing::info!(side = side.prefix(), "toe stance skipped: foot bones missing");
        return Ok(false);
    }

    let limit = |s: &Skeleton| -> SizingResult<f64> {
        Ok(s.require(&foot.ankle)?.distance(s.require(&foot.toe)?))
    };
    let org_limit = limit(&ds.org_model)?;
    let ratio = math::ratio(limit(&ds.rep_model)?, org_limit);

    let mut sample_bones: Vec<String> = Vec::new();
    for name in [&foot.toe, &foot.sole] {
        for &i in chain(&ds.rep_model, name)?.indices() {
            let bone = &ds.rep_model.bone_at(i).name;
            if !sample_bones.contains(bone) {
                sample_bones.push(bone.clone());
            }
        }
    }
    let bind_toe = ds.rep_model.require(&foot.toe)?.y;
    let bind_sole = ds.rep_model.require(&foot.sole)?.y;

    let mut registered = 0;
    let mut milestone = 0;
    for frame in ds.motion.bone_fnos(&[foot.ik.as_str(), foot.ik_parent.as_str()]) {
        cancel.check()?;
        let mut ik_bf = ds.motion.calc_bf(&foot.ik, frame);
        let (org_y, diff) = toe_diff(ds, &foot, ratio, frame)?;

        // Feet raised above the instep's length are left alone.
        if org_y > -org_limit {
            let mut changed = false;
            if org_y < org_limit && diff.abs() > math::EPSILON && ik_bf.position.y != 0.0 {
                ik_bf.position.y -= diff;
                changed = true;
            }

            let mut sample = ds.motion.snapshot(&sample_bones, frame);
            sample.regist_bf(ik_bf.clone(), &foot.ik, frame);
            let rep_toe = entity(&ds.rep_model, &sample, &foot.toe, frame)?.y;
            let rep_sole = entity(&ds.rep_model, &sample, &foot.sole, frame)?.y;

            if rep_sole < rep_toe
                && rep_sole < bind_sole - FLOOR_TOLERANCE
                && ik_bf.position.y != 0.0
            {
                ik_bf.position.y -= rep_sole;
                changed = true;
            } else if rep_toe < bind_toe - FLOOR_TOLERANCE {
                ik_bf.position.y -= rep_toe;
                changed = true;
            }

            if changed {
                tracing::debug!(frame = frame.0, bone = %foot.ik, y = ik_bf.position.y, "toe stance");
                ds.motion.regist_bf(ik_bf, &foot.ik, frame);
                registered += 1;
            }
        }
        super::frame_milestone(&mut milestone, frame, &foot.ik);
    }
    tracing::info!(side = side.prefix(), registered, "toe stance done");
    Ok(true)
}

// Org contact height and how far the rep contact sits above where the org one, scaled by foot
// length, says it should. Uses the toe when the rep toe is lower than the sole, else the sole.
fn toe_diff(
    ds: &DataSet,
    foot: &FootBones,
    ratio: f64,
    frame: FrameIndex,
) -> SizingResult<(f64, f64)> {
    let org_toe = entity(&ds.org_model, &ds.org_motion, &foot.toe, frame)?.y;
    let org_sole = entity(&ds.org_model, &ds.org_motion, &foot.sole, frame)?.y;
    let rep_toe = entity(&ds.rep_model, &ds.motion, &foot.toe, frame)?.y;
    let rep_sole = entity(&ds.rep_model, &ds.motion, &foot.sole, frame)?.y;

    let diff = |name: &str, rep_y: f64, org_y: f64| -> SizingResult<f64> {
        let rep_bind = ds.rep_model.require(name)?.y;
        let org_bind = ds.org_model.require(name)?.y;
        Ok((rep_y - rep_bind) - (org_y - org_bind) * ratio + (rep_bind - org_bind))
    };

    if rep_toe < rep_sole {
        Ok((org_toe, diff(&foot.toe, rep_toe, org_toe)?))
    } else {
        Ok((org_sole, diff(&foot.sole, rep_sole, org_sole)?))
    }
}

#[cfg(test)]
#[path = "../../../tests/unit/services/stance/toe.rs"]
mod tests;
