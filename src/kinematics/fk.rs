use glam::{DMat4, DQuat, DVec3};

use crate::foundation::core::FrameIndex;
use crate::model::motion::Motion;
use crate::model::skeleton::{BoneChain, Skeleton};

const MAX_GRANT_DEPTH: usize = 8;

/// Evaluation knobs for [`calc_global_pose`].
#[derive(Clone, Copy, Debug, Default)]
pub struct FkOpts<'a> {
    /// Only bones on this chain read the motion; the rest stay at bind pose.
    pub limit: Option<&'a BoneChain>,
    /// Evaluate the chain's terminal bone at this frame instead.
    pub target_frame: Option<FrameIndex>,
}

impl<'a> FkOpts<'a> {
    pub fn limited(limit: &'a BoneChain) -> Self {
        Self {
            limit: Some(limit),
            target_frame: None,
        }
    }
}

/// World matrices for each bone of a chain, root first.
#[derive(Clone, Debug)]
pub struct ChainPose {
    indices: Vec<usize>,
    matrices: Vec<DMat4>,
}

impl ChainPose {
    pub fn matrix(&self, idx: usize) -> Option<DMat4> {
        let i = self.indices.iter().position(|&b| b == idx)?;
        Some(self.matrices[i])
    }

    pub fn position(&self, idx: usize) -> Option<DVec3> {
        self.matrix(idx).map(|m| m.w_axis.truncate())
    }

    pub fn target_position(&self) -> DVec3 {
        self.matrices
            .last()
            .map(|m| m.w_axis.truncate())
            .unwrap_or(DVec3::ZERO)
    }

    pub fn positions(&self) -> impl Iterator<Item = (usize, DVec3)> + '_ {
        self.indices
            .iter()
            .copied()
            .zip(self.matrices.iter().map(|m| m.w_axis.truncate()))
    }
}

/// Chain pose plus the same positions with the body's facing undone.
#[derive(Clone, Debug)]
pub struct FrontPose {
    pub pose: ChainPose,
    front: Vec<DVec3>,
    /// Facing rotation that was undone; apply it to bring front-space points back.
    pub direction: DQuat,
}

impl FrontPose {
    pub fn front_position(&self, idx: usize) -> Option<DVec3> {
        let i = self.pose.indices.iter().position(|&b| b == idx)?;
        Some(self.front[i])
    }

    pub fn position(&self, idx: usize) -> Option<DVec3> {
        self.pose.position(idx)
    }

    /// Rotate a front-space point back into the current facing.
    pub fn restore(&self, front: DVec3) -> DVec3 {
        self.direction * front
    }
}

/// Keyframe rotation of a bone including inherited (grant) rotation.
pub fn deform_rotation(skeleton: &Skeleton, motion: &Motion, idx: usize, frame: FrameIndex) -> DQuat {
    deform_rotation_at_depth(skeleton, motion, idx, frame, 0)
}

fn deform_rotation_at_depth(
    skeleton: &Skeleton,
    motion: &Motion,
    idx: usize,
    frame: FrameIndex,
    depth: usize,
) -> DQuat {
    let bone = skeleton.bone_at(idx);
    let mut rot = motion.calc_bf(&bone.name, frame).rotation;
    if let Some(g) = bone.grant
        && g.rotate
        && depth < MAX_GRANT_DEPTH
    {
        let granted = deform_rotation_at_depth(skeleton, motion, g.parent, frame, depth + 1);
        let partial = if g.ratio >= 0.0 {
            DQuat::IDENTITY.slerp(granted, g.ratio)
        } else {
            DQuat::IDENTITY.slerp(granted.inverse(), -g.ratio)
        };
        rot = rot * partial;
    }
    rot.normalize()
}

fn deform_position(skeleton: &Skeleton, motion: &Motion, idx: usize, frame: FrameIndex) -> DVec3 {
    let bone = skeleton.bone_at(idx);
    let mut pos = motion.calc_bf(&bone.name, frame).position;
    if let Some(g) = bone.grant
        && g.translate
    {
        let parent = skeleton.bone_at(g.parent);
        pos += motion.calc_bf(&parent.name, frame).position * g.ratio;
    }
    pos
}

/// Walk `chain` accumulating `parent × T(bind offset + key translation) × R(key rotation)`.
pub fn calc_global_pose(
    skeleton: &Skeleton,
    chain: &BoneChain,
    motion: &Motion,
    frame: FrameIndex,
    opts: FkOpts<'_>,
) -> ChainPose {
    let mut matrices = Vec::with_capacity(chain.len());
    let mut parent = DMat4::IDENTITY;
    let target = chain.target();

    for &idx in chain.indices() {
        let bone = skeleton.bone_at(idx);
        let rel = match bone.parent {
            Some(p) => bone.position - skeleton.bone_at(p).position,
            None => bone.position,
        };
        let animated = opts.limit.is_none_or(|l| l.contains(idx));
        let local = if animated {
            let f = match opts.target_frame {
                Some(tf) if idx == target => tf,
                _ => frame,
            };
            let pos = deform_position(skeleton, motion, idx, f);
            let rot = deform_rotation(skeleton, motion, idx, f);
            DMat4::from_rotation_translation(rot, rel + pos)
        } else {
            DMat4::from_translation(rel)
        };
        parent *= local;
        matrices.push(parent);
    }

    ChainPose {
        indices: chain.indices().to_vec(),
        matrices,
    }
}

/// Product of deformed rotations along `chain`, root first.
pub fn calc_direction_qq(
    skeleton: &Skeleton,
    chain: &BoneChain,
    motion: &Motion,
    frame: FrameIndex,
) -> DQuat {
    chain
        .indices()
        .iter()
        .fold(DQuat::IDENTITY, |acc, &idx| {
            acc * deform_rotation(skeleton, motion, idx, frame)
        })
        .normalize()
}

/// Accumulated rotation from the root down to the skeleton's facing bone.
pub fn facing_rotation(skeleton: &Skeleton, motion: &Motion, frame: FrameIndex) -> DQuat {
    match skeleton.chain_to(skeleton.facing_bone()) {
        Some(chain) => calc_direction_qq(skeleton, &chain, motion, frame),
        None => DQuat::IDENTITY,
    }
}

/// [`calc_global_pose`] plus positions expressed as if the body faced forward.
pub fn calc_front_global_pose(
    skeleton: &Skeleton,
    chain: &BoneChain,
    motion: &Motion,
    frame: FrameIndex,
    opts: FkOpts<'_>,
) -> FrontPose {
    let pose = calc_global_pose(skeleton, chain, motion, frame, opts);
    let direction = facing_rotation(skeleton, motion, frame);
    let undo = direction.inverse();
    let front = pose.positions().map(|(_, p)| undo * p).collect();
    FrontPose {
        pose,
        front,
        direction,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/kinematics/fk.rs"]
mod tests;
