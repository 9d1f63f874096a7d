use glam::DVec3;

use crate::foundation::core::{CancelToken, FrameIndex, Side};
use crate::foundation::error::SizingResult;
use crate::foundation::math;
use crate::kinematics::fk::{FkOpts, calc_global_pose};
use crate::kinematics::ik::CcdSolver;
use crate::model::motion::Motion;
use crate::model::names;
use crate::model::skeleton::Skeleton;
use crate::services::stance::frame_milestone;
use crate::sizing::data_set::DataSet;
use crate::sizing::options::ArmOptions;

/// Blend weight towards the snapped position: `1` at distance zero, `0` at the threshold.
pub fn blend(distance: f64, threshold: f64) -> f64 {
    if threshold <= 0.0 || distance >= threshold {
        0.0
    } else {
        (1.0 - distance / threshold).clamp(0.0, 1.0)
    }
}

/// Wrist to middle-finger length of `skeleton`, the unit alignment thresholds are given in.
pub fn hand_size(skeleton: &Skeleton) -> Option<f64> {
    let wrist = skeleton.position(&Side::Left.bone(names::WRIST))?;
    let finger = skeleton.position(&Side::Left.bone(names::MIDDLE_FINGER))?;
    let len = math::effective_scalar((finger - wrist).length());
    (len > 0.0).then_some(len)
}

fn world(s: &Skeleton, motion: &Motion, name: &str, frame: FrameIndex) -> Option<DVec3> {
    let chain = s.chain_to(name)?;
    Some(calc_global_pose(s, &chain, motion, frame, FkOpts::default()).target_position())
}

/// Bone indices of one side's arm, resolved on the rep skeleton.
#[derive(Clone, Copy, Debug)]
struct ArmLinks {
    arm: usize,
    elbow: usize,
    wrist: usize,
    finger: Option<usize>,
}

impl ArmLinks {
    fn resolve(s: &Skeleton, side: Side) -> Option<ArmLinks> {
        Some(ArmLinks {
            arm: s.index_of(&side.bone(names::ARM))?,
            elbow: s.index_of(&side.bone(names::ELBOW))?,
            wrist: s.index_of(&side.bone(names::WRIST))?,
            finger: s.index_of(&side.bone(names::INDEX_TIP)),
        })
    }
}

struct Aligner<'a> {
    org: &'a Skeleton,
    org_motion: &'a Motion,
    rep: &'a Skeleton,
    hand: f64,
    solver: CcdSolver,
}

impl Aligner<'_> {
    /// Pull the pair of `base` bones towards their shared midpoint when the org pair is close.
    fn pair(
        &self,
        motion: &mut Motion,
        base: &str,
        effectors: [usize; 2],
        links: [&[usize]; 2],
        threshold: f64,
        frame: FrameIndex,
    ) -> usize {
        let left = Side::Left.bone(base);
        let right = Side::Right.bone(base);
        let (Some(ol), Some(or)) = (
            world(self.org, self.org_motion, &left, frame),
            world(self.org, self.org_motion, &right, frame),
        ) else {
            return 0;
        };
        let b = blend((ol - or).length() / self.hand, threshold);
        if b == 0.0 {
            return 0;
        }
        let (Some(rl), Some(rr)) = (
            world(self.rep, motion, &left, frame),
            world(self.rep, motion, &right, frame),
        ) else {
            return 0;
        };
        let mid = (rl + rr) / 2.0;
        let mut count = 0;
        for (i, current) in [rl, rr].into_iter().enumerate() {
            let target = current.lerp(mid, b);
            if self
                .solver
                .solve_into(self.rep, motion, links[i], effectors[i], target, frame)
                .is_some()
            {
                count += 1;
            }
        }
        tracing::debug!(frame = frame.0, bone = base, blend = b, "pair aligned");
        count
    }

    /// Lower a wrist towards the floor when the org wrist is near it.
    fn floor(
        &self,
        motion: &mut Motion,
        side: Side,
        links: ArmLinks,
        threshold: f64,
        frame: FrameIndex,
    ) -> usize {
        let wrist = side.bone(names::WRIST);
        let Some(org_pos) = world(self.org, self.org_motion, &wrist, frame) else {
            return 0;
        };
        let b = blend(org_pos.y.max(0.0) / self.hand, threshold);
        if b == 0.0 {
            return 0;
        }
        let Some(current) = world(self.rep, motion, &wrist, frame) else {
            return 0;
        };
        let target = DVec3::new(current.x, current.y * (1.0 - b), current.z);
        let solved = self
            .solver
            .solve_into(
                self.rep,
                motion,
                &[links.arm, links.elbow],
                links.wrist,
                target,
                frame,
            )
            .is_some();
        tracing::debug!(frame = frame.0, side = side.prefix(), blend = b, "wrist floored");
        usize::from(solved)
    }
}

/// Snap rep wrists together, index-finger tips together, and wrists to the floor wherever
/// the org motion has them close, blending the snap by `1 − d / threshold`.
///
/// Distances are measured on the org motion in org hand-size units. Returns how many IK
/// corrections were written.
#[tracing::instrument(skip_all, fields(data_set = idx + 1))]
pub fn align_arms(
    ds: &mut DataSet,
    idx: usize,
    opts: &ArmOptions,
    cancel: &CancelToken,
) -> SizingResult<usize> {
    if !opts.alignment {
        return Ok(0);
    }
    let (Some(left), Some(right)) = (
        ArmLinks::resolve(&ds.rep_model, Side::Left),
        ArmLinks::resolve(&ds.rep_model, Side::Right),
    ) else {
        tracing::info!("alignment skipped: arm bones missing on target model");
        return Ok(0);
    };
    let Some(hand) = hand_size(&ds.org_model) else {
        tracing::warn!("alignment skipped: source model has no measurable hand");
        return Ok(0);
    };
    let fingers = match (left.finger, right.finger) {
        (Some(l), Some(r)) if opts.alignment_finger => {
            let tip = [Side::Left, Side::Right].map(|s| s.bone(names::INDEX_TIP));
            ds.org_model.has_all(&tip).then_some([l, r])
        }
        _ => None,
    };
    if opts.alignment_finger && fingers.is_none() {
        tracing::info!("finger alignment skipped: index finger tips missing");
    }

    let aligner = Aligner {
        org: &ds.org_model,
        org_motion: &ds.org_motion,
        rep: &ds.rep_model,
        hand,
        solver: CcdSolver::default(),
    };
    let bones: Vec<String> = Side::BOTH
        .iter()
        .flat_map(|s| [names::ARM, names::ELBOW, names::WRIST].map(|b| s.bone(b)))
        .collect();

    let mut count = 0;
    let mut milestone = 0;
    let wrist_links = [
        &[left.arm, left.elbow][..],
        &[right.arm, right.elbow][..],
    ];
    let finger_links = [
        &[left.arm, left.elbow, left.wrist][..],
        &[right.arm, right.elbow, right.wrist][..],
    ];
    for frame in ds.motion.bone_fnos(&bones) {
        cancel.check()?;
        count += aligner.pair(
            &mut ds.motion,
            names::WRIST,
            [left.wrist, right.wrist],
            wrist_links,
            opts.wrist_threshold,
            frame,
        );
        if let Some(tips) = fingers {
            count += aligner.pair(
                &mut ds.motion,
                names::INDEX_TIP,
                tips,
                finger_links,
                opts.finger_threshold,
                frame,
            );
        }
        if opts.alignment_floor {
            for (side, links) in [(Side::Left, left), (Side::Right, right)] {
                count += aligner.floor(&mut ds.motion, side, links, opts.floor_threshold, frame);
            }
        }
        frame_milestone(&mut milestone, frame, names::WRIST);
    }

    tracing::info!(corrected = count, hand_size = hand, "arm alignment done");
    Ok(count)
}

#[cfg(test)]
#[path = "../../tests/unit/services/arm_alignment.rs"]
mod tests;
