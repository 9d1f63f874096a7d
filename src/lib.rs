//! Retarget skeletal keyframe motion between character skeletons of different proportions.
//!
//! A batch is a list of [`DataSet`]s, each pairing a motion with the skeleton it was made for
//! and the skeleton it should play on. [`SizingService`] runs move scaling, stance correction,
//! arm avoidance and alignment, morph replacement and camera sizing over the batch.
#![forbid(unsafe_code)]

pub mod foundation;
pub mod io;
pub mod kinematics;
pub mod model;
pub mod services;
pub mod sizing;

pub use foundation::core::{CancelToken, FrameIndex, Progress, Side};
pub use foundation::error::{SizingError, SizingResult};
pub use io::config::{CameraConfig, DataSetConfig, SizingConfig};
pub use io::json::{JsonIo, ModelReader, MotionReader, MotionWriter};
pub use model::motion::{BoneFrame, CameraFrame, MorphFrame, Motion};
pub use model::skeleton::{Bone, BoneChain, RigidBody, RigidShape, Skeleton, SkeletonData};
pub use sizing::data_set::{DataSet, MorphMapping, SizingRatios};
pub use sizing::options::{ArmOptions, DistanceLimit, SizingOptions, StanceDetail, WorkerMode};
pub use sizing::report::{DataSetReport, Outcome, SizingReport};
pub use sizing::service::{CameraJob, SizingJob, SizingService};
