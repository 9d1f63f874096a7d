use std::fs::File;
use std::io::{BufReader, BufWriter, Write as _};
use std::path::Path;

use crate::foundation::error::{SizingError, SizingResult};
use crate::model::motion::Motion;
use crate::model::skeleton::{Skeleton, SkeletonData};

/// Loads a character skeleton from a model file.
pub trait ModelReader: Send + Sync {
    fn read_model(&self, path: &Path) -> SizingResult<Skeleton>;
}

/// Loads a keyframe motion.
pub trait MotionReader: Send + Sync {
    fn read_motion(&self, path: &Path) -> SizingResult<Motion>;
}

/// Persists a keyframe motion.
pub trait MotionWriter: Send + Sync {
    fn write_motion(&self, motion: &Motion, path: &Path) -> SizingResult<()>;
}

/// Reader/writer over the JSON forms of [`SkeletonData`] and [`Motion`].
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonIo {
    /// Pretty-print written motions.
    pub pretty: bool,
}

fn open(path: &Path, what: &str) -> SizingResult<BufReader<File>> {
    let f = File::open(path).map_err(|e| {
        SizingError::unprocessable(format!("open {what} '{}': {e}", path.display()))
    })?;
    Ok(BufReader::new(f))
}

impl ModelReader for JsonIo {
    fn read_model(&self, path: &Path) -> SizingResult<Skeleton> {
        let data: SkeletonData = serde_json::from_reader(open(path, "model JSON")?)
            .map_err(|e| {
                SizingError::unprocessable(format!("parse model JSON '{}': {e}", path.display()))
            })?;
        let skeleton = Skeleton::try_from(data)?;
        tracing::debug!(
            path = %path.display(),
            model = %skeleton.name,
            bones = skeleton.bones().len(),
            "loaded model"
        );
        Ok(skeleton)
    }
}

impl MotionReader for JsonIo {
    fn read_motion(&self, path: &Path) -> SizingResult<Motion> {
        let motion: Motion = serde_json::from_reader(open(path, "motion JSON")?)
            .map_err(|e| {
                SizingError::unprocessable(format!("parse motion JSON '{}': {e}", path.display()))
            })?;
        tracing::debug!(
            path = %path.display(),
            bone_frames = motion.bone_frame_count(),
            morph_frames = motion.morph_frame_count(),
            "loaded motion"
        );
        Ok(motion)
    }
}

impl MotionWriter for JsonIo {
    fn write_motion(&self, motion: &Motion, path: &Path) -> SizingResult<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let mut w = BufWriter::new(File::create(path)?);
        if self.pretty {
            serde_json::to_writer_pretty(&mut w, motion)?;
        } else {
            serde_json::to_writer(&mut w, motion)?;
        }
        w.flush()?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/io/json.rs"]
mod tests;
