use super::*;
use crate::model::motion::BoneFrame;
use crate::model::skeleton::SkeletonData;

fn humanoid() -> Skeleton {
    let data: SkeletonData =
        serde_json::from_str(include_str!("../../data/humanoid.json")).unwrap();
    Skeleton::try_from(data).unwrap()
}

fn close(a: DVec3, b: DVec3) -> bool {
    (a - b).length() < 1e-9
}

#[test]
fn empty_motion_reproduces_bind_pose() {
    let s = humanoid();
    let chain = s.chain_to("左手首").unwrap();
    let pose = calc_global_pose(&s, &chain, &Motion::new(), FrameIndex(0), FkOpts::default());
    for (idx, p) in pose.positions() {
        assert!(close(p, s.bone_at(idx).position), "{}", s.bone_at(idx).name);
    }
}

#[test]
fn translation_keys_move_descendants() {
    let s = humanoid();
    let mut m = Motion::new();
    m.regist_bf(
        BoneFrame::new(FrameIndex(0)).with_position(DVec3::new(1.0, 2.0, 3.0)),
        "センター",
        FrameIndex(0),
    );
    let chain = s.chain_to("頭").unwrap();
    let pose = calc_global_pose(&s, &chain, &m, FrameIndex(0), FkOpts::default());
    assert!(close(
        pose.target_position(),
        s.position("頭").unwrap() + DVec3::new(1.0, 2.0, 3.0)
    ));
}

#[test]
fn parent_rotation_swings_child() {
    let s = humanoid();
    let mut m = Motion::new();
    let q = DQuat::from_rotation_z(std::f64::consts::FRAC_PI_2);
    m.regist_bf(BoneFrame::new(FrameIndex(0)).with_rotation(q), "左腕", FrameIndex(0));
    let chain = s.chain_to("左ひじ").unwrap();
    let pose = calc_global_pose(&s, &chain, &m, FrameIndex(0), FkOpts::default());
    let arm = s.position("左腕").unwrap();
    let elbow = s.position("左ひじ").unwrap();
    assert!(close(pose.target_position(), arm + q * (elbow - arm)));
}

#[test]
fn limit_chain_freezes_bones_outside_it() {
    let s = humanoid();
    let mut m = Motion::new();
    let q = DQuat::from_rotation_z(0.7);
    m.regist_bf(BoneFrame::new(FrameIndex(0)).with_rotation(q), "左腕", FrameIndex(0));
    let chain = s.chain_to("左ひじ").unwrap();
    let limit = s.chain_to("左肩").unwrap();
    let pose = calc_global_pose(&s, &chain, &m, FrameIndex(0), FkOpts::limited(&limit));
    assert!(close(pose.target_position(), s.position("左ひじ").unwrap()));
}

#[test]
fn target_frame_override_reads_other_frame_for_terminal_bone() {
    let s = humanoid();
    let mut m = Motion::new();
    m.regist_bf(BoneFrame::new(FrameIndex(0)), "左ひじ", FrameIndex(0));
    m.regist_bf(
        BoneFrame::new(FrameIndex(20)).with_position(DVec3::new(0.0, 1.0, 0.0)),
        "左ひじ",
        FrameIndex(20),
    );
    let chain = s.chain_to("左ひじ").unwrap();
    let opts = FkOpts {
        limit: None,
        target_frame: Some(FrameIndex(20)),
    };
    let pose = calc_global_pose(&s, &chain, &m, FrameIndex(0), opts);
    assert!(close(
        pose.target_position(),
        s.position("左ひじ").unwrap() + DVec3::Y
    ));
}

#[test]
fn front_pose_undoes_facing_rotation() {
    let s = humanoid();
    let mut m = Motion::new();
    let turn = DQuat::from_rotation_y(std::f64::consts::FRAC_PI_2);
    m.regist_bf(BoneFrame::new(FrameIndex(0)).with_rotation(turn), "センター", FrameIndex(0));
    let chain = s.chain_to("左腕").unwrap();
    let front = calc_front_global_pose(&s, &chain, &m, FrameIndex(0), FkOpts::default());
    let arm = s.index_of("左腕").unwrap();
    let center = s.position("センター").unwrap();

    // Facing is undone around the world origin; offsets from center match bind pose.
    let front_arm = front.front_position(arm).unwrap();
    let front_center = turn.inverse() * center;
    assert!(close(front_arm - front_center, s.position("左腕").unwrap() - center));
    assert!(close(front.restore(front_arm), front.position(arm).unwrap()));
    assert!(front.direction.dot(turn).abs() > 1.0 - 1e-12);
}

#[test]
fn direction_qq_multiplies_down_the_chain() {
    let s = humanoid();
    let mut m = Motion::new();
    let a = DQuat::from_rotation_y(0.3);
    let b = DQuat::from_rotation_x(0.2);
    m.regist_bf(BoneFrame::new(FrameIndex(0)).with_rotation(a), "グルーブ", FrameIndex(0));
    m.regist_bf(BoneFrame::new(FrameIndex(0)).with_rotation(b), "上半身", FrameIndex(0));
    let chain = s.chain_to("上半身").unwrap();
    let q = calc_direction_qq(&s, &chain, &m, FrameIndex(0));
    assert!(q.dot(a * b).abs() > 1.0 - 1e-12);
    assert!(facing_rotation(&s, &m, FrameIndex(0)).dot(a).abs() > 1.0 - 1e-12);
}

#[test]
fn grant_rotation_is_inherited_by_ratio() {
    let mut data: SkeletonData =
        serde_json::from_str(include_str!("../../data/humanoid.json")).unwrap();
    for b in &mut data.bones {
        if b.name == "左腕捩" {
            b.grant = Some(crate::model::skeleton::GrantData {
                parent: "左腕".to_string(),
                ratio: 0.5,
                rotate: true,
                translate: false,
            });
        }
    }
    let s = Skeleton::try_from(data).unwrap();
    let mut m = Motion::new();
    let q = DQuat::from_rotation_x(1.0);
    m.regist_bf(BoneFrame::new(FrameIndex(0)).with_rotation(q), "左腕", FrameIndex(0));
    let idx = s.index_of("左腕捩").unwrap();
    let r = deform_rotation(&s, &m, idx, FrameIndex(0));
    assert!(r.dot(DQuat::from_rotation_x(0.5)).abs() > 1.0 - 1e-12);
}
