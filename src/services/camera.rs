use crate::foundation::core::CancelToken;
use crate::foundation::error::SizingResult;
use crate::foundation::math;
use crate::model::motion::Motion;
use crate::sizing::data_set::DataSet;
use crate::sizing::options::DistanceLimit;

/// Batch-wide camera rescale, averaged over every data set the camera frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraScale {
    /// Horizontal scale of the look-at target.
    pub xz: f64,
    /// Silhouette height ratio (rep head top over camera-source head top).
    pub silhouette: f64,
    /// Added to the look-at target's height after scaling.
    pub offset_y: f64,
    /// Multiplier applied to the camera distance, already clamped.
    pub distance: f64,
    /// Share of the wanted zoom the distance clamp held back; perspective cameras widen their
    /// field of view by it so the subject keeps its size on screen.
    pub angle: f64,
}

/// Widest field of view a sized camera may end up with, in degrees.
pub const MAX_CAMERA_ANGLE: f64 = 125.0;

impl CameraScale {
    /// Average the per-data-set ratios. The camera-source skeleton defaults to the org model.
    pub fn measure(data_sets: &[DataSet], limit: DistanceLimit) -> SizingResult<CameraScale> {
        if data_sets.is_empty() {
            return Ok(CameraScale {
                xz: 1.0,
                silhouette: 1.0,
                offset_y: 0.0,
                distance: 1.0,
                angle: 1.0,
            });
        }
        let n = data_sets.len() as f64;
        let mut xz = 0.0;
        let mut silhouette = 0.0;
        let mut offset_y = 0.0;
        let mut heads_tall = 0.0;
        for ds in data_sets {
            let r = ds.ratios()?;
            let source = ds.camera_org_model.as_ref().unwrap_or(&ds.org_model);
            xz += r.xz;
            silhouette += math::ratio(ds.rep_model.head_top().y, source.head_top().y);
            offset_y += ds.camera_offset_y;
            heads_tall += r.heads_tall;
        }
        let silhouette = silhouette / n;
        let wanted = silhouette * heads_tall / n;
        let distance = if limit.is_unlimited() {
            wanted
        } else {
            let ceiling = limit.ceiling();
            wanted.clamp(1.0 / ceiling, ceiling)
        };
        Ok(CameraScale {
            xz: xz / n,
            silhouette,
            offset_y: offset_y / n,
            distance,
            angle: math::ratio(wanted, distance),
        })
    }

    pub fn apply(&self, camera: &mut Motion, cancel: &CancelToken) -> SizingResult<usize> {
        let mut count = 0;
        for cf in camera.cameras.values_mut() {
            cancel.check()?;
            cf.position.x *= self.xz;
            cf.position.z *= self.xz;
            cf.position.y = cf.position.y * self.silhouette + self.offset_y;
            cf.distance *= self.distance;
            if cf.perspective && self.angle != 1.0 {
                let half = (cf.angle.to_radians() / 2.0).tan() * self.angle;
                cf.angle = (2.0 * half.atan().to_degrees()).clamp(1.0, MAX_CAMERA_ANGLE);
            }
            count += 1;
        }
        Ok(count)
    }
}

/// Rescale the camera track so it frames the rep skeletons the way it framed the originals.
#[tracing::instrument(skip_all)]
pub fn adjust_camera(
    camera: &mut Motion,
    data_sets: &[DataSet],
    limit: DistanceLimit,
    cancel: &CancelToken,
) -> SizingResult<CameraScale> {
    let scale = CameraScale::measure(data_sets, limit)?;
    let frames = scale.apply(camera, cancel)?;
    tracing::info!(
        frames,
        xz = scale.xz,
        silhouette = scale.silhouette,
        distance = scale.distance,
        angle = scale.angle,
        "camera sizing done"
    );
    Ok(scale)
}

#[cfg(test)]
#[path = "../../tests/unit/services/camera.rs"]
mod tests;
