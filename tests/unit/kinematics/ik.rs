use super::*;
use crate::model::motion::BoneFrame;
use crate::model::skeleton::SkeletonData;

fn humanoid() -> Skeleton {
    let data: SkeletonData =
        serde_json::from_str(include_str!("../../data/humanoid.json")).unwrap();
    Skeleton::try_from(data).unwrap()
}

#[test]
fn reaches_a_nearby_target() {
    let s = humanoid();
    let arm = s.index_of("左腕").unwrap();
    let elbow = s.index_of("左ひじ").unwrap();
    let wrist = s.index_of("左手首").unwrap();
    let target = s.position("左手首").unwrap() + DVec3::new(-0.8, 0.5, -0.6);

    let solution = CcdSolver::default()
        .solve(&s, &Motion::new(), &[arm, elbow], wrist, target, FrameIndex(0))
        .unwrap();
    assert!((solution.reached - target).length() < 1e-3);
    assert_eq!(solution.rotations.len(), 2);

    // Applying the rotations reproduces the reached point.
    let mut m = Motion::new();
    for (idx, rot) in &solution.rotations {
        m.regist_bf(
            BoneFrame::new(FrameIndex(0)).with_rotation(*rot),
            &s.bone_at(*idx).name,
            FrameIndex(0),
        );
    }
    let chain = s.chain_to("左手首").unwrap();
    let pose = calc_global_pose(&s, &chain, &m, FrameIndex(0), FkOpts::default());
    assert!((pose.target_position() - solution.reached).length() < 1e-9);
}

#[test]
fn links_off_the_chain_are_rejected() {
    let s = humanoid();
    let knee = s.index_of("左ひざ").unwrap();
    let wrist = s.index_of("左手首").unwrap();
    assert!(
        CcdSolver::default()
            .solve(&s, &Motion::new(), &[knee], wrist, DVec3::ZERO, FrameIndex(0))
            .is_none()
    );
}
