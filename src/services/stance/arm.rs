use std::collections::BTreeMap;

use glam::DQuat;

use crate::foundation::core::Side;
use crate::model::names;
use crate::model::skeleton::Skeleton;
use crate::sizing::data_set::DataSet;

/// Bind-pose slope differences for one arm bone.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ArmStanceDiff {
    /// Difference of the incoming segment; `None` for the arm root.
    pub from: Option<DQuat>,
    /// Difference of the outgoing segment.
    pub to: DQuat,
}

const ARM_SEGMENTS: [(Option<&str>, &str, &str); 3] = [
    (None, names::ARM, names::ELBOW),
    (Some(names::ARM), names::ELBOW, names::WRIST),
    (Some(names::ELBOW), names::WRIST, names::MIDDLE_FINGER),
];

fn stance_diff(org: &Skeleton, rep: &Skeleton, from: &str, to: &str) -> Option<DQuat> {
    let org_q = org.arm_stance(from, to)?;
    let rep_q = rep.arm_stance(from, to)?;
    Some(rep_q.inverse() * org_q)
}

/// Per-bone slope differences between the two bind poses, keyed by bone name.
pub fn calc_arm_stance(org: &Skeleton, rep: &Skeleton) -> BTreeMap<String, ArmStanceDiff> {
    let mut out = BTreeMap::new();
    for side in Side::BOTH {
        for (from, target, to) in ARM_SEGMENTS {
            let from = from.map(|b| side.bone(b));
            let target = side.bone(target);
            let to = side.bone(to);
            let mut bones = vec![target.as_str(), to.as_str()];
            if let Some(f) = &from {
                bones.push(f);
            }
            if !org.has_all(&bones) || !rep.has_all(&bones) {
                continue;
            }

            let from_diff = match &from {
                Some(f) => stance_diff(org, rep, f, &target),
                None => None,
            };
            if let Some(to_diff) = stance_diff(org, rep, &target, &to) {
                out.insert(
                    target,
                    ArmStanceDiff {
                        from: from_diff,
                        to: to_diff,
                    },
                );
            }
        }
    }
    out
}

/// Rotate every arm, elbow and wrist key by the bind-pose slope difference, so an A-stance
/// motion keeps its look on a T-stance model and vice versa.
pub fn adjust_arm_stance(ds: &mut DataSet) -> bool {
    let diffs = calc_arm_stance(&ds.org_model, &ds.rep_model);
    let mut ran = false;
    for (bone, diff) in &diffs {
        let Some(track) = ds.motion.bones.get_mut(bone) else {
            continue;
        };
        for bf in track.values_mut().filter(|bf| bf.key) {
            bf.rotation = match diff.from {
                Some(from) => from.inverse() * bf.rotation * diff.to,
                None => bf.rotation * diff.to,
            }
            .normalize();
        }
        tracing::info!(bone = %bone, "arm stance done");
        ran = true;
    }
    ran
}

#[cfg(test)]
#[path = "../../../tests/unit/services/stance/arm.rs"]
mod tests;
