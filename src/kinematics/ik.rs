use glam::{DQuat, DVec3};

use crate::foundation::core::FrameIndex;
use crate::foundation::math;
use crate::kinematics::fk::{FkOpts, calc_global_pose};
use crate::model::motion::Motion;
use crate::model::skeleton::Skeleton;

/// Cyclic-coordinate-descent solver for short limb chains.
#[derive(Clone, Copy, Debug)]
pub struct CcdSolver {
    pub iterations: usize,
    /// Stop once the effector is this close to the target.
    pub tolerance: f64,
}

impl Default for CcdSolver {
    fn default() -> Self {
        Self {
            iterations: 20,
            tolerance: 1e-4,
        }
    }
}

/// Result of one solve: new local rotations for each link, root first.
#[derive(Clone, Debug)]
pub struct IkSolution {
    pub rotations: Vec<(usize, DQuat)>,
    pub reached: DVec3,
}

impl CcdSolver {
    /// Rotate `links` (root first) so that `effector` approaches `target` at `frame`.
    ///
    /// Bones between the links keep their keyed rotations.
    pub fn solve(
        &self,
        skeleton: &Skeleton,
        motion: &Motion,
        links: &[usize],
        effector: usize,
        target: DVec3,
        frame: FrameIndex,
    ) -> Option<IkSolution> {
        let chain = skeleton.chain_to(&skeleton.bone_at(effector).name)?;
        if links.iter().any(|l| !chain.contains(*l)) {
            return None;
        }
        let names: Vec<&str> = chain
            .indices()
            .iter()
            .map(|&i| skeleton.bone_at(i).name.as_str())
            .collect();
        let mut work = motion.snapshot(&names, frame);

        let mut reached = DVec3::ZERO;
        for _ in 0..self.iterations {
            for &link in links.iter().rev() {
                let pose = calc_global_pose(skeleton, &chain, &work, frame, FkOpts::default());
                let (Some(link_pos), Some(link_mat)) = (pose.position(link), pose.matrix(link))
                else {
                    return None;
                };
                let effector_pos = pose.target_position();
                let delta = math::rotation_arc(effector_pos - link_pos, target - link_pos);
                let (_, world_rot, _) = link_mat.to_scale_rotation_translation();

                let name = &skeleton.bone_at(link).name;
                let mut bf = work.calc_bf(name, frame);
                bf.rotation = (bf.rotation * world_rot.inverse() * delta * world_rot).normalize();
                work.regist_bf(bf, name, frame);
            }
            let pose = calc_global_pose(skeleton, &chain, &work, frame, FkOpts::default());
            reached = pose.target_position();
            if (reached - target).length() < self.tolerance {
                break;
            }
        }

        let rotations = links
            .iter()
            .map(|&l| (l, work.calc_bf(&skeleton.bone_at(l).name, frame).rotation))
            .collect();
        Some(IkSolution { rotations, reached })
    }

    /// [`solve`](Self::solve) and store the link rotations as keys of `motion` at `frame`.
    pub fn solve_into(
        &self,
        skeleton: &Skeleton,
        motion: &mut Motion,
        links: &[usize],
        effector: usize,
        target: DVec3,
        frame: FrameIndex,
    ) -> Option<DVec3> {
        let solution = self.solve(skeleton, motion, links, effector, target, frame)?;
        for (idx, rotation) in solution.rotations {
            let name = &skeleton.bone_at(idx).name;
            let mut bf = motion.calc_bf(name, frame);
            bf.rotation = rotation;
            motion.regist_bf(bf, name, frame);
        }
        Some(solution.reached)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/kinematics/ik.rs"]
mod tests;
