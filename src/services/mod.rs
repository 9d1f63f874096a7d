//! Per-data-set correction stages, in the order the orchestrator runs them.

pub mod arm_alignment;
pub mod arm_avoidance;
pub mod camera;
pub mod morph;
pub mod move_scale;
pub mod stance;
