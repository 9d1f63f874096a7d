//! Skeleton and motion data model.

pub mod bezier;
pub mod motion;
pub mod names;
pub mod skeleton;
