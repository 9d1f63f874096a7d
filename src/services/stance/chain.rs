use glam::{DQuat, DVec3};

use crate::foundation::core::{CancelToken, FrameIndex, Side};
use crate::foundation::error::{SizingError, SizingResult};
use crate::foundation::math;
use crate::kinematics::fk::{
    FkOpts, FrontPose, calc_direction_qq, calc_front_global_pose, calc_global_pose,
    deform_rotation,
};
use crate::model::motion::Motion;
use crate::model::names;
use crate::model::skeleton::{BoneChain, Skeleton};

/// Bind slopes of the trunk must agree at least this much for the calibration to hold.
pub const TRUNK_DOT_THRESHOLD: f64 = 0.8;
/// Same for the shoulders, which vary more between models.
pub const SHOULDER_DOT_THRESHOLD: f64 = 0.7;
/// Per-frame corrections may stray this much further from the original than the bind slopes do.
pub const DOT_MARGIN: f64 = 0.1;

/// Landmark pair that fixes the roll of a corrected chain, measured on the org motion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpLandmark {
    /// Right arm minus left arm.
    ArmSpan,
    /// Arm-under helper minus arm.
    ArmUnder(Side),
}

impl UpLandmark {
    /// Direction the landmark vector has at bind pose on a standard humanoid.
    pub fn rest_up(self) -> DVec3 {
        match self {
            UpLandmark::ArmSpan => DVec3::NEG_X,
            UpLandmark::ArmUnder(_) => DVec3::NEG_Y,
        }
    }

    fn bones(self) -> (String, String) {
        match self {
            UpLandmark::ArmSpan => (Side::Right.bone(names::ARM), Side::Left.bone(names::ARM)),
            UpLandmark::ArmUnder(side) => (side.bone(names::ARM_UNDER), side.bone(names::ARM)),
        }
    }
}

/// Bones one chain correction works on: `from` is rotated so `to` lands where the org pose puts
/// it, measured from `base`.
#[derive(Clone, Debug, PartialEq)]
pub struct ChainSpec {
    pub base: String,
    pub from: String,
    pub to: String,
    pub up: UpLandmark,
}

impl ChainSpec {
    pub fn new(base: &str, from: &str, to: &str, up: UpLandmark) -> Self {
        Self {
            base: base.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            up,
        }
    }
}

/// Bind-pose calibration held constant over every frame of one chain.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Calibration {
    /// Rest orientation of the rep `from → to` slope.
    pub slope: DQuat,
    /// Correction the bind pose itself needs; undone on every frame.
    pub cancel: DQuat,
    /// Corrections whose absolute dot with the original rotation fall below this are rejected.
    pub dot_limit: f64,
}

/// Read-only view over both sides of a data set.
#[derive(Clone, Copy, Debug)]
pub struct StancePair<'a> {
    pub org: &'a Skeleton,
    pub org_motion: &'a Motion,
    pub rep: &'a Skeleton,
    pub motion: &'a Motion,
}

pub(crate) fn chain(s: &Skeleton, name: &str) -> SizingResult<BoneChain> {
    s.chain_to(name).ok_or_else(|| {
        SizingError::unprocessable(format!("model '{}' has no bone '{}'", s.name, name))
    })
}

fn front(pose: &FrontPose, s: &Skeleton, name: &str) -> SizingResult<DVec3> {
    s.index_of(name)
        .and_then(|i| pose.front_position(i))
        .ok_or_else(|| {
            SizingError::unprocessable(format!("bone '{name}' is not on the evaluated chain"))
        })
}

/// Calibrate `spec` on both bind poses.
///
/// `calibration_base` replaces `spec.base` for the bind-pose measurement. Returns `None` when the bind
/// slopes disagree by more than `threshold` allows; such chains keep their original rotations.
pub fn calibrate(
    org: &Skeleton,
    rep: &Skeleton,
    spec: &ChainSpec,
    calibration_base: Option<&str>,
    threshold: f64,
) -> SizingResult<Option<Calibration>> {
    let slope_of = |s: &Skeleton| -> SizingResult<DVec3> {
        Ok((s.require(&spec.to)? - s.require(&spec.from)?).normalize_or_zero())
    };
    let org_slope = slope_of(org)?;
    let rep_slope = slope_of(rep)?;
    let slope = math::from_direction(rep_slope, rep_slope.cross(spec.up.rest_up()));

    let mut bind_spec = spec.clone();
    if let Some(base) = calibration_base {
        bind_spec.base = base.to_string();
    }
    let empty = Motion::new();
    let pair = StancePair {
        org,
        org_motion: &empty,
        rep,
        motion: &empty,
    };
    let trial = Calibration {
        slope,
        cancel: DQuat::IDENTITY,
        dot_limit: 0.0,
    };
    let cancel = calc_rotation_stance(pair, &bind_spec, &trial, FrameIndex(0))?
        .unwrap_or(DQuat::IDENTITY);

    let dot = org_slope.dot(rep_slope);
    tracing::debug!(bone = %spec.from, dot, "bind slope agreement");
    if dot >= threshold {
        Ok(Some(Calibration {
            slope,
            cancel,
            dot_limit: dot - DOT_MARGIN,
        }))
    } else {
        tracing::warn!(
            bone = %spec.from,
            dot,
            threshold,
            "bind stances differ too much; keeping original rotations"
        );
        Ok(None)
    }
}

struct ToTarget {
    new_to: DVec3,
    rep_from: DVec3,
}

// Where `to` should sit on the rep skeleton: the org base→to offset in facing-front space,
// scaled by shoulder width (X/Z) and by the base→to span (Y), turned back to the current facing.
fn recalc_to_pos(
    pair: StancePair<'_>,
    spec: &ChainSpec,
    org_from: &BoneChain,
    rep_from: &BoneChain,
    frame: FrameIndex,
) -> SizingResult<ToTarget> {
    let StancePair {
        org,
        org_motion,
        rep,
        motion,
    } = pair;

    let org_base = calc_front_global_pose(
        org,
        &chain(org, &spec.base)?,
        org_motion,
        frame,
        FkOpts::limited(org_from),
    );
    let rep_base = calc_front_global_pose(
        rep,
        &chain(rep, &spec.base)?,
        motion,
        frame,
        FkOpts::limited(rep_from),
    );
    let org_to = calc_front_global_pose(
        org,
        &chain(org, &spec.to)?,
        org_motion,
        frame,
        FkOpts::limited(org_from),
    );
    let rep_to = calc_front_global_pose(
        rep,
        &chain(rep, &spec.to)?,
        motion,
        frame,
        FkOpts::limited(rep_from),
    );

    let org_front_base = front(&org_base, org, &spec.base)?;
    let rep_front_base = front(&rep_base, rep, &spec.base)?;
    let org_front_to = front(&org_to, org, &spec.to)?;

    let arm = arm_span_ratio(org, rep);
    let span = |s: &Skeleton| -> SizingResult<DVec3> {
        Ok((s.require(&spec.to)? - s.require(&spec.base)?).abs())
    };
    let to_ratio = math::ratio3(span(rep)?, span(org)?);
    let scale = DVec3::new(arm.x, to_ratio.y, arm.x);

    let new_front = rep_front_base + (org_front_to - org_front_base) * scale;
    let rep_from_pos = rep
        .index_of(&spec.from)
        .and_then(|i| rep_to.position(i))
        .ok_or_else(|| {
            SizingError::unprocessable(format!(
                "bone '{}' is not an ancestor of '{}'",
                spec.from, spec.to
            ))
        })?;

    Ok(ToTarget {
        new_to: rep_to.restore(new_front),
        rep_from: rep_from_pos,
    })
}

/// Shoulder width ratio (left arm minus right arm), with unmeasurable components set to `1`.
pub fn arm_span_ratio(org: &Skeleton, rep: &Skeleton) -> DVec3 {
    let span = |s: &Skeleton| {
        let l = s.position(&Side::Left.bone(names::ARM)).unwrap_or_default();
        let r = s.position(&Side::Right.bone(names::ARM)).unwrap_or_default();
        l - r
    };
    math::one(math::ratio3(span(rep), span(org)))
}

fn up_vector(
    org: &Skeleton,
    org_motion: &Motion,
    up: UpLandmark,
    limit: &BoneChain,
    frame: FrameIndex,
) -> SizingResult<DVec3> {
    let (end, start) = up.bones();
    let at = |name: &str| -> SizingResult<DVec3> {
        let c = chain(org, name)?;
        Ok(calc_global_pose(org, &c, org_motion, frame, FkOpts::limited(limit)).target_position())
    };
    Ok(at(&end)? - at(&start)?)
}

/// Corrected local rotation of `spec.from` at `frame`, or `None` when the correction strays
/// too far from the original key. Frames the org motion only interpolates are never rejected.
pub fn calc_rotation_stance(
    pair: StancePair<'_>,
    spec: &ChainSpec,
    calib: &Calibration,
    frame: FrameIndex,
) -> SizingResult<Option<DQuat>> {
    let org_from = chain(pair.org, &spec.from)?;
    let rep_from = chain(pair.rep, &spec.from)?;

    let parent_qq = match rep_from.parent_chain() {
        Some(parent) => calc_direction_qq(pair.rep, &parent, pair.motion, frame),
        None => DQuat::IDENTITY,
    };

    let target = recalc_to_pos(pair, spec, &org_from, &rep_from, frame)?;
    let up_pos = up_vector(pair.org, pair.org_motion, spec.up, &org_from, frame)?;

    let direction = target.new_to - target.rep_from;
    let up = direction.cross(up_pos);
    let orientation = math::from_direction(direction, up);
    let rotation =
        (parent_qq.inverse() * calib.cancel.inverse() * orientation * calib.slope.inverse())
            .normalize();

    if let Some(original) = pair
        .org_motion
        .track(&spec.from)
        .and_then(|t| t.get(&frame))
        .map(|bf| bf.rotation)
    {
        let dot = math::abs_dot(rotation, original);
        if dot < calib.dot_limit {
            tracing::warn!(
                frame = frame.0,
                bone = %spec.from,
                dot,
                limit = calib.dot_limit,
                "stance correction rejected; keeping original rotation"
            );
            return Ok(None);
        }
    }
    Ok(Some(rotation))
}

/// Correct every authored key of `spec.from`. Returns how many keys changed.
pub fn correct_chain(
    org: &Skeleton,
    org_motion: &Motion,
    rep: &Skeleton,
    motion: &mut Motion,
    spec: &ChainSpec,
    calib: &Calibration,
    cancel: &CancelToken,
) -> SizingResult<usize> {
    let mut changed = 0;
    let mut milestone = 0;
    for frame in motion.bone_fnos(&[spec.from.as_str()]) {
        cancel.check()?;
        let pair = StancePair {
            org,
            org_motion,
            rep,
            motion: &*motion,
        };
        if let Some(rotation) = calc_rotation_stance(pair, spec, calib, frame)?
            && let Some(bf) = motion
                .bones
                .get_mut(&spec.from)
                .and_then(|t| t.get_mut(&frame))
        {
            bf.rotation = rotation;
            bf.registered = true;
            changed += 1;
        }
        super::frame_milestone(&mut milestone, frame, &spec.from);
    }
    Ok(changed)
}

/// Keyframe rotation of `name` including grants; plain key rotation for bones the skeleton lacks.
pub fn deformed(s: &Skeleton, motion: &Motion, name: &str, frame: FrameIndex) -> DQuat {
    match s.index_of(name) {
        Some(idx) => deform_rotation(s, motion, idx, frame),
        None => motion.calc_bf(name, frame).rotation,
    }
}

/// Undo a parent's correction on each key of `child`: `rep_parent⁻¹ · org_parent · child`.
pub fn adjust_rotation_by_parent(
    org: &Skeleton,
    org_motion: &Motion,
    rep: &Skeleton,
    motion: &mut Motion,
    child: &str,
    parent: &str,
) {
    adjust_rotation_by_parents(org, org_motion, rep, motion, child, &[parent]);
}

/// [`adjust_rotation_by_parent`] over several parents, outermost first. Used when org parents
/// were merged into one rep bone, so the org side multiplies all of them.
pub fn adjust_rotation_by_parents(
    org: &Skeleton,
    org_motion: &Motion,
    rep: &Skeleton,
    motion: &mut Motion,
    child: &str,
    parents: &[&str],
) {
    for frame in motion.bone_fnos(&[child]) {
        let product = |s: &Skeleton, m: &Motion| {
            parents
                .iter()
                .fold(DQuat::IDENTITY, |acc, p| acc * deformed(s, m, p, frame))
        };
        let org_q = product(org, org_motion);
        let rep_q = product(rep, motion);
        if let Some(bf) = motion.bones.get_mut(child).and_then(|t| t.get_mut(&frame)) {
            bf.rotation = (rep_q.inverse() * org_q * bf.rotation).normalize();
        }
    }
}

#[cfg(test)]
#[path = "../../../tests/unit/services/stance/chain.rs"]
mod tests;
