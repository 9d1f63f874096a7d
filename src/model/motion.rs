use std::collections::{BTreeMap, BTreeSet};

use glam::{DQuat, DVec3};

use crate::foundation::core::FrameIndex;
use crate::model::bezier::{Curve, Interpolation};

fn identity() -> DQuat {
    DQuat::IDENTITY
}

/// One bone keyframe.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BoneFrame {
    pub frame: FrameIndex,
    /// Translation relative to the bind pose, in parent space.
    #[serde(default)]
    pub position: DVec3,
    #[serde(default = "identity")]
    pub rotation: DQuat,
    /// Curve governing the segment that ends at this key.
    #[serde(default)]
    pub interpolation: Interpolation,
    /// Set when the pipeline wrote this key.
    #[serde(default)]
    pub registered: bool,
    /// `true` for authored keys, `false` for values interpolated on demand.
    #[serde(default = "key_default")]
    pub key: bool,
}

fn key_default() -> bool {
    true
}

impl BoneFrame {
    pub fn new(frame: FrameIndex) -> Self {
        Self {
            frame,
            position: DVec3::ZERO,
            rotation: DQuat::IDENTITY,
            interpolation: Interpolation::default(),
            registered: false,
            key: true,
        }
    }

    pub fn with_position(mut self, position: DVec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_rotation(mut self, rotation: DQuat) -> Self {
        self.rotation = rotation;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MorphFrame {
    pub frame: FrameIndex,
    pub ratio: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CameraInterpolation {
    pub x: Curve,
    pub y: Curve,
    pub z: Curve,
    pub rotation: Curve,
    pub distance: Curve,
    pub angle: Curve,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CameraFrame {
    pub frame: FrameIndex,
    /// Look-at target.
    pub position: DVec3,
    /// Euler rotation in radians.
    #[serde(default)]
    pub euler: DVec3,
    /// Signed distance from the target; MMD stores it negative in front of the model.
    pub distance: f64,
    /// Vertical field of view in degrees.
    pub angle: f64,
    #[serde(default = "key_default")]
    pub perspective: bool,
    #[serde(default)]
    pub interpolation: CameraInterpolation,
}

pub type BoneTrack = BTreeMap<FrameIndex, BoneFrame>;
pub type MorphTrack = BTreeMap<FrameIndex, MorphFrame>;

/// Per-bone, per-morph and camera keyframe store.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Motion {
    /// Model name recorded in the motion header.
    pub model_name: String,
    pub bones: BTreeMap<String, BoneTrack>,
    pub morphs: BTreeMap<String, MorphTrack>,
    pub cameras: BTreeMap<FrameIndex, CameraFrame>,
}

impl Motion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_bone(&self, name: &str) -> bool {
        self.bones.contains_key(name)
    }

    pub fn track(&self, name: &str) -> Option<&BoneTrack> {
        self.bones.get(name)
    }

    pub fn key_count(&self, name: &str) -> usize {
        self.bones.get(name).map_or(0, |t| t.len())
    }

    /// Number of bone keyframes across all tracks.
    pub fn bone_frame_count(&self) -> usize {
        self.bones.values().map(|t| t.len()).sum()
    }

    pub fn morph_frame_count(&self) -> usize {
        self.morphs.values().map(|t| t.len()).sum()
    }

    pub fn last_frame(&self) -> FrameIndex {
        let bone = self
            .bones
            .values()
            .filter_map(|t| t.keys().next_back().copied());
        let morph = self
            .morphs
            .values()
            .filter_map(|t| t.keys().next_back().copied());
        let camera = self.cameras.keys().next_back().copied();
        bone.chain(morph)
            .chain(camera)
            .max()
            .unwrap_or_default()
    }

    /// Sorted union of keyed frames over the named tracks. Missing tracks contribute nothing.
    pub fn bone_fnos<S: AsRef<str>>(&self, names: &[S]) -> Vec<FrameIndex> {
        let mut out = BTreeSet::new();
        for name in names {
            if let Some(track) = self.bones.get(name.as_ref()) {
                out.extend(track.values().filter(|bf| bf.key).map(|bf| bf.frame));
            }
        }
        out.into_iter().collect()
    }

    /// Value of `bone` at `frame`.
    ///
    /// Exact keys are returned as stored. Between keys the position follows each axis curve and
    /// the rotation is slerped along the rotation curve. Outside the keyed range the nearest key
    /// is held. A missing track yields the identity pose.
    pub fn calc_bf(&self, bone: &str, frame: FrameIndex) -> BoneFrame {
        let Some(track) = self.bones.get(bone) else {
            let mut bf = BoneFrame::new(frame);
            bf.key = false;
            return bf;
        };
        if let Some(bf) = track.get(&frame) {
            return bf.clone();
        }

        let prev = track.range(..frame).next_back().map(|(_, bf)| bf);
        let next = track.range(frame..).next().map(|(_, bf)| bf);
        let mut out = match (prev, next) {
            (Some(a), Some(b)) => {
                let span = f64::from(b.frame.0 - a.frame.0);
                let t = f64::from(frame.0 - a.frame.0) / span;
                let c = &b.interpolation;
                let lerp = |x: f64, y: f64, curve: Curve| x + (y - x) * curve.evaluate(t);
                let mut bf = BoneFrame::new(frame);
                bf.position = DVec3::new(
                    lerp(a.position.x, b.position.x, c.x),
                    lerp(a.position.y, b.position.y, c.y),
                    lerp(a.position.z, b.position.z, c.z),
                );
                bf.rotation = a
                    .rotation
                    .slerp(b.rotation, c.rotation.evaluate(t))
                    .normalize();
                bf.interpolation = b.interpolation;
                bf
            }
            (Some(a), None) => a.clone(),
            (None, Some(b)) => b.clone(),
            (None, None) => BoneFrame::new(frame),
        };
        out.frame = frame;
        out.key = false;
        out.registered = false;
        out
    }

    /// Store `bf` as a key of `bone` at `frame`.
    ///
    /// A key inserted inside an existing segment splits the segment's curve so the motion keeps
    /// its timing on both sides.
    pub fn regist_bf(&mut self, mut bf: BoneFrame, bone: &str, frame: FrameIndex) {
        let track = self.bones.entry(bone.to_string()).or_default();
        bf.frame = frame;
        bf.key = true;
        bf.registered = true;

        if !track.contains_key(&frame) {
            let prev = track.range(..frame).next_back().map(|(f, _)| *f);
            let next = track.range(frame..).next().map(|(f, _)| *f);
            if let (Some(p), Some(n)) = (prev, next)
                && let Some(next_bf) = track.get_mut(&n)
            {
                let t = f64::from(frame.0 - p.0) / f64::from(n.0 - p.0);
                let (first, second) = next_bf.interpolation.split(t);
                bf.interpolation = first;
                next_bf.interpolation = second;
            }
        }
        track.insert(frame, bf);
    }

    /// Insert an interpolated key at `mid`, strictly between `prev` and `next`.
    pub fn split_bf_by_fno(
        &mut self,
        bone: &str,
        prev: FrameIndex,
        next: FrameIndex,
        mid: FrameIndex,
    ) -> bool {
        if !(prev < mid && mid < next) {
            return false;
        }
        let bf = self.calc_bf(bone, mid);
        self.regist_bf(bf, bone, mid);
        true
    }

    pub fn remove_bone(&mut self, name: &str) -> Option<BoneTrack> {
        self.bones.remove(name)
    }

    /// Single-frame copy of the named tracks, evaluated at `frame`.
    pub fn snapshot<S: AsRef<str>>(&self, names: &[S], frame: FrameIndex) -> Motion {
        let mut out = Motion::new();
        for name in names {
            let name = name.as_ref();
            let mut bf = self.calc_bf(name, frame);
            bf.key = true;
            out.bones
                .entry(name.to_string())
                .or_default()
                .insert(frame, bf);
        }
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/motion.rs"]
mod tests;
