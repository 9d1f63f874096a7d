//! Standard MMD bone names the pipeline looks for.
//!
//! Side-specific bones are stored as bases and qualified with [`Side::bone`](crate::Side::bone).

pub const ROOT: &str = "全ての親";
pub const CENTER: &str = "センター";
pub const GROOVE: &str = "グルーブ";
pub const UPPER: &str = "上半身";
pub const UPPER2: &str = "上半身2";
pub const LOWER: &str = "下半身";
pub const NECK: &str = "首";
pub const HEAD: &str = "頭";
pub const NECK_BASE: &str = "首根元";

pub const LEG: &str = "足";
pub const KNEE: &str = "ひざ";
pub const ANKLE: &str = "足首";
pub const LEG_IK: &str = "足ＩＫ";
pub const LEG_IK_PARENT: &str = "足IK親";
pub const TOE_IK: &str = "つま先ＩＫ";
pub const TOE_ENTITY: &str = "つま先実体";
pub const SOLE_ENTITY: &str = "足底実体";

pub const SHOULDER_P: &str = "肩P";
pub const SHOULDER: &str = "肩";
pub const ARM: &str = "腕";
pub const ARM_TWIST: &str = "腕捩";
pub const ELBOW: &str = "ひじ";
pub const WRIST_TWIST: &str = "手捩";
pub const WRIST: &str = "手首";
pub const ARM_UNDER: &str = "腕下延長";
pub const MIDDLE_FINGER: &str = "中指１";
pub const INDEX_TIP: &str = "人指３";

/// Bones whose translation keys are rescaled by the move stage, in processing order.
pub const MOVE_BONES: [&str; 9] = [
    ROOT,
    CENTER,
    GROOVE,
    "右足IK親",
    "左足IK親",
    "右足ＩＫ",
    "左足ＩＫ",
    "右つま先ＩＫ",
    "左つま先ＩＫ",
];

/// Side-qualified bases that must exist on both skeletons for arm processing.
pub const ARM_SIZING_BASES: [&str; 4] = [SHOULDER, ARM, ELBOW, WRIST];
