//! Forward kinematics, local-axis rotation decomposition, and a small CCD solver.

pub mod axis;
pub mod fk;
pub mod ik;
