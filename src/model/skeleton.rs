use std::collections::HashMap;

use glam::{DQuat, DVec3};

use crate::foundation::core::Side;
use crate::foundation::error::{SizingError, SizingResult};
use crate::foundation::math;
use crate::model::names;

/// Bone capability flags as authored in the model file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BoneFlags {
    pub rotatable: bool,
    pub translatable: bool,
    pub has_ik: bool,
    pub visible: bool,
    pub manipulable: bool,
}

impl Default for BoneFlags {
    fn default() -> Self {
        Self {
            rotatable: true,
            translatable: false,
            has_ik: false,
            visible: true,
            manipulable: true,
        }
    }
}

/// External rotation/translation inheritance ("grant") from another bone.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Grant {
    pub parent: usize,
    pub ratio: f64,
    pub rotate: bool,
    pub translate: bool,
}

/// IK metadata. Kept for round-tripping; forward kinematics does not solve it.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct IkLink {
    pub target: String,
    pub links: Vec<String>,
    #[serde(default)]
    pub loops: u32,
    #[serde(default)]
    pub limit_angle: f64,
}

#[derive(Clone, Debug)]
pub struct Bone {
    pub index: usize,
    pub name: String,
    /// Bind-pose position in model space.
    pub position: DVec3,
    pub parent: Option<usize>,
    /// Explicit tail point in model space, used for the local X axis.
    pub tail: Option<DVec3>,
    pub grant: Option<Grant>,
    pub flags: BoneFlags,
    pub layer: i32,
    pub display_group: Option<String>,
    pub ik: Option<IkLink>,
    /// Per-run scratch offset written by the move stage and consumed later in the same run.
    pub local_offset: DVec3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RigidShape {
    Sphere,
    Box,
    Capsule,
}

/// Collision volume attached to a bone. `size` follows the PMX convention:
/// sphere `(r, _, _)`, box half extents `(x, y, z)`, capsule `(r, height, _)`.
#[derive(Clone, Debug)]
pub struct RigidBody {
    pub name: String,
    pub bone: usize,
    pub shape: RigidShape,
    pub size: DVec3,
    pub position: DVec3,
    pub rotation: DQuat,
}

/// Ordered bone indices from a root down to a target bone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoneChain {
    indices: Vec<usize>,
}

impl BoneChain {
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn root(&self) -> usize {
        self.indices[0]
    }

    pub fn target(&self) -> usize {
        self.indices[self.indices.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn contains(&self, idx: usize) -> bool {
        self.indices.contains(&idx)
    }

    /// The prefix of this chain ending at `idx`, if `idx` is on it.
    pub fn until(&self, idx: usize) -> Option<BoneChain> {
        let pos = self.indices.iter().position(|&i| i == idx)?;
        Some(BoneChain {
            indices: self.indices[..=pos].to_vec(),
        })
    }

    /// The prefix without the target bone, or `None` for a single-bone chain.
    pub fn parent_chain(&self) -> Option<BoneChain> {
        if self.indices.len() < 2 {
            return None;
        }
        Some(BoneChain {
            indices: self.indices[..self.indices.len() - 1].to_vec(),
        })
    }
}

#[derive(Clone, Debug)]
pub struct Skeleton {
    pub name: String,
    pub content_hash: String,
    bones: Vec<Bone>,
    by_name: HashMap<String, usize>,
    pub rigid_bodies: Vec<RigidBody>,
    head_top: Option<DVec3>,
}

impl Skeleton {
    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn bone(&self, name: &str) -> Option<&Bone> {
        self.by_name.get(name).map(|&i| &self.bones[i])
    }

    pub fn bone_at(&self, idx: usize) -> &Bone {
        &self.bones[idx]
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn has_bone(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn has_all<S: AsRef<str>>(&self, names: &[S]) -> bool {
        names.iter().all(|n| self.has_bone(n.as_ref()))
    }

    /// Bind position of `name`.
    pub fn position(&self, name: &str) -> Option<DVec3> {
        self.bone(name).map(|b| b.position)
    }

    /// Bind position of `name`, or an unprocessable-data error naming the bone.
    pub fn require(&self, name: &str) -> SizingResult<DVec3> {
        self.position(name).ok_or_else(|| {
            SizingError::unprocessable(format!("model '{}' has no bone '{}'", self.name, name))
        })
    }

    pub fn parent_of(&self, name: &str) -> Option<&Bone> {
        self.bone(name)?.parent.map(|p| &self.bones[p])
    }

    pub fn children_of(&self, idx: usize) -> impl Iterator<Item = &Bone> {
        self.bones.iter().filter(move |b| b.parent == Some(idx))
    }

    /// Chain from the hierarchy root down to `name`.
    pub fn chain_to(&self, name: &str) -> Option<BoneChain> {
        let mut idx = self.index_of(name)?;
        let mut indices = vec![idx];
        while let Some(p) = self.bones[idx].parent {
            indices.push(p);
            idx = p;
        }
        indices.reverse();
        Some(BoneChain { indices })
    }

    /// Chain from `from` down to `to`, if `from` is an ancestor of (or equal to) `to`.
    pub fn chain(&self, from: &str, to: &str) -> Option<BoneChain> {
        let full = self.chain_to(to)?;
        let start = self.index_of(from)?;
        let pos = full.indices.iter().position(|&i| i == start)?;
        Some(BoneChain {
            indices: full.indices[pos..].to_vec(),
        })
    }

    pub fn local_offset(&self, name: &str) -> DVec3 {
        self.bone(name).map(|b| b.local_offset).unwrap_or(DVec3::ZERO)
    }

    pub fn set_local_offset(&mut self, name: &str, offset: DVec3) -> bool {
        match self.by_name.get(name) {
            Some(&i) => {
                self.bones[i].local_offset = offset;
                true
            }
            None => false,
        }
    }

    pub fn local_offset_mut(&mut self, name: &str) -> Option<&mut DVec3> {
        let i = *self.by_name.get(name)?;
        Some(&mut self.bones[i].local_offset)
    }

    /// Clear every per-run scratch offset.
    pub fn reset_local_offsets(&mut self) {
        for b in &mut self.bones {
            b.local_offset = DVec3::ZERO;
        }
    }

    /// Bone that carries the body's facing: groove when present, else center.
    pub fn facing_bone(&self) -> &'static str {
        if self.has_bone(names::GROOVE) {
            names::GROOVE
        } else {
            names::CENTER
        }
    }

    /// Whether the arm chains are complete on both sides.
    pub fn can_arm_sizing(&self) -> bool {
        self.has_bone(names::UPPER)
            && Side::BOTH.iter().all(|side| {
                names::ARM_SIZING_BASES
                    .iter()
                    .all(|base| self.has_bone(&side.bone(base)))
            })
    }

    /// Top of the head silhouette.
    pub fn head_top(&self) -> DVec3 {
        if let Some(p) = self.head_top {
            return p;
        }
        if let Some(head) = self.bone(names::HEAD) {
            if let Some(tail) = head.tail {
                return tail;
            }
            return match self.position(names::NECK) {
                Some(neck) => head.position + (head.position - neck),
                None => head.position,
            };
        }
        self.bones
            .iter()
            .map(|b| b.position)
            .fold(DVec3::ZERO, |acc, p| if p.y > acc.y { p } else { acc })
    }

    /// Unit local X axis: toward the tail, else toward the first child, else away from the parent.
    pub fn local_x_axis(&self, name: &str) -> DVec3 {
        let Some(bone) = self.bone(name) else {
            return DVec3::X;
        };
        let toward = bone
            .tail
            .or_else(|| self.children_of(bone.index).next().map(|c| c.position))
            .map(|t| t - bone.position)
            .or_else(|| bone.parent.map(|p| bone.position - self.bones[p].position));
        toward
            .and_then(|v| v.try_normalize())
            .unwrap_or(DVec3::X)
    }

    /// Rotation from the side's outward axis to the `from → to` bind direction.
    pub fn arm_stance(&self, from: &str, to: &str) -> Option<DQuat> {
        let a = self.position(from)?;
        let b = self.position(to)?;
        let side_axis = if from.starts_with(Side::Right.prefix()) {
            DVec3::NEG_X
        } else {
            DVec3::X
        };
        Some(math::rotation_arc(side_axis, b - a))
    }

    pub fn rigid_body(&self, name: &str) -> Option<&RigidBody> {
        self.rigid_bodies.iter().find(|r| r.name == name)
    }
}

/// Serde form of a bone; parents and grants reference bones by name.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct BoneData {
    pub name: String,
    pub position: DVec3,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tail: Option<DVec3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grant: Option<GrantData>,
    #[serde(default)]
    pub flags: BoneFlags,
    #[serde(default)]
    pub layer: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ik: Option<IkLink>,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct GrantData {
    pub parent: String,
    pub ratio: f64,
    #[serde(default = "default_true")]
    pub rotate: bool,
    #[serde(default)]
    pub translate: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct RigidBodyData {
    pub name: String,
    pub bone: String,
    pub shape: RigidShape,
    pub size: DVec3,
    pub position: DVec3,
    #[serde(default = "identity_quat")]
    pub rotation: DQuat,
}

fn identity_quat() -> DQuat {
    DQuat::IDENTITY
}

/// Per-foot ground landmarks measured from the mesh by the model reader.
#[derive(Clone, Copy, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct FootLandmarks {
    pub toe_tip: Option<DVec3>,
    pub sole: Option<DVec3>,
}

/// Serde form of a [`Skeleton`].
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct SkeletonData {
    pub name: String,
    #[serde(default)]
    pub content_hash: String,
    pub bones: Vec<BoneData>,
    #[serde(default)]
    pub rigid_bodies: Vec<RigidBodyData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_top: Option<DVec3>,
    #[serde(default)]
    pub left_foot: FootLandmarks,
    #[serde(default)]
    pub right_foot: FootLandmarks,
}

impl SkeletonData {
    /// Uniformly scale every position.
    pub fn scaled(mut self, factor: f64) -> Self {
        for b in &mut self.bones {
            b.position *= factor;
            b.tail = b.tail.map(|t| t * factor);
        }
        for r in &mut self.rigid_bodies {
            r.position *= factor;
            r.size *= factor;
        }
        self.head_top = self.head_top.map(|p| p * factor);
        for foot in [&mut self.left_foot, &mut self.right_foot] {
            foot.toe_tip = foot.toe_tip.map(|p| p * factor);
            foot.sole = foot.sole.map(|p| p * factor);
        }
        self
    }
}

impl TryFrom<SkeletonData> for Skeleton {
    type Error = SizingError;

    fn try_from(data: SkeletonData) -> SizingResult<Self> {
        let mut by_name = HashMap::with_capacity(data.bones.len() + 8);
        for (i, b) in data.bones.iter().enumerate() {
            if by_name.insert(b.name.clone(), i).is_some() {
                return Err(SizingError::validation(format!(
                    "model '{}' has duplicate bone '{}'",
                    data.name, b.name
                )));
            }
        }

        let lookup = |name: &str, what: &str, owner: &str| -> SizingResult<usize> {
            by_name.get(name).copied().ok_or_else(|| {
                SizingError::validation(format!(
                    "model '{}': {what} '{name}' of bone '{owner}' does not exist",
                    data.name
                ))
            })
        };

        let mut bones = Vec::with_capacity(data.bones.len() + 8);
        for (i, b) in data.bones.iter().enumerate() {
            let parent = b
                .parent
                .as_deref()
                .map(|p| lookup(p, "parent", &b.name))
                .transpose()?;
            let grant = match &b.grant {
                Some(g) => Some(Grant {
                    parent: lookup(&g.parent, "grant parent", &b.name)?,
                    ratio: g.ratio,
                    rotate: g.rotate,
                    translate: g.translate,
                }),
                None => None,
            };
            bones.push(Bone {
                index: i,
                name: b.name.clone(),
                position: b.position,
                parent,
                tail: b.tail,
                grant,
                flags: b.flags,
                layer: b.layer,
                display_group: b.display_group.clone(),
                ik: b.ik.clone(),
                local_offset: DVec3::ZERO,
            });
        }

        let mut rigid_bodies = Vec::with_capacity(data.rigid_bodies.len());
        for r in &data.rigid_bodies {
            rigid_bodies.push(RigidBody {
                name: r.name.clone(),
                bone: lookup(&r.bone, "bone", &r.name)?,
                shape: r.shape,
                size: r.size,
                position: r.position,
                rotation: r.rotation,
            });
        }

        let mut skeleton = Skeleton {
            name: data.name.clone(),
            content_hash: data.content_hash.clone(),
            bones,
            by_name,
            rigid_bodies,
            head_top: data.head_top,
        };
        skeleton.check_forest()?;
        skeleton.derive_virtual_bones(&data);
        Ok(skeleton)
    }
}

impl From<&Skeleton> for SkeletonData {
    fn from(s: &Skeleton) -> Self {
        let name_of = |i: usize| s.bones[i].name.clone();
        let foot = |side: Side| FootLandmarks {
            toe_tip: s.position(&side.bone(names::TOE_ENTITY)),
            sole: s.position(&side.bone(names::SOLE_ENTITY)),
        };
        SkeletonData {
            name: s.name.clone(),
            content_hash: s.content_hash.clone(),
            bones: s
                .bones
                .iter()
                .filter(|b| !is_virtual(&b.name))
                .map(|b| BoneData {
                    name: b.name.clone(),
                    position: b.position,
                    parent: b.parent.map(name_of),
                    tail: b.tail,
                    grant: b.grant.map(|g| GrantData {
                        parent: name_of(g.parent),
                        ratio: g.ratio,
                        rotate: g.rotate,
                        translate: g.translate,
                    }),
                    flags: b.flags,
                    layer: b.layer,
                    display_group: b.display_group.clone(),
                    ik: b.ik.clone(),
                })
                .collect(),
            rigid_bodies: s
                .rigid_bodies
                .iter()
                .map(|r| RigidBodyData {
                    name: r.name.clone(),
                    bone: name_of(r.bone),
                    shape: r.shape,
                    size: r.size,
                    position: r.position,
                    rotation: r.rotation,
                })
                .collect(),
            head_top: s.head_top,
            left_foot: foot(Side::Left),
            right_foot: foot(Side::Right),
        }
    }
}

fn is_virtual(name: &str) -> bool {
    name == names::NECK_BASE
        || name.ends_with(names::ARM_UNDER)
        || name.ends_with(names::TOE_ENTITY)
        || name.ends_with(names::SOLE_ENTITY)
}

impl Skeleton {
    fn check_forest(&self) -> SizingResult<()> {
        for start in 0..self.bones.len() {
            let mut idx = start;
            let mut steps = 0usize;
            while let Some(p) = self.bones[idx].parent {
                steps += 1;
                if steps > self.bones.len() {
                    return Err(SizingError::validation(format!(
                        "model '{}': bone '{}' is part of a parent cycle",
                        self.name, self.bones[start].name
                    )));
                }
                idx = p;
            }
        }
        Ok(())
    }

    fn push_virtual(&mut self, name: String, position: DVec3, parent: Option<usize>) {
        if self.by_name.contains_key(&name) {
            return;
        }
        let index = self.bones.len();
        self.by_name.insert(name.clone(), index);
        self.bones.push(Bone {
            index,
            name,
            position,
            parent,
            tail: None,
            grant: None,
            flags: BoneFlags {
                visible: false,
                manipulable: false,
                ..BoneFlags::default()
            },
            layer: 0,
            display_group: None,
            ik: None,
            local_offset: DVec3::ZERO,
        });
    }

    // Landmarks the stance stages measure against but that models rarely author.
    fn derive_virtual_bones(&mut self, data: &SkeletonData) {
        if let Some(neck) = self.bone(names::NECK) {
            let (pos, parent) = (neck.position, neck.parent);
            self.push_virtual(names::NECK_BASE.to_string(), pos, parent);
        }

        for side in Side::BOTH {
            if let Some(arm) = self.bone(&side.bone(names::ARM)) {
                let (pos, idx) = (arm.position, arm.index);
                self.push_virtual(
                    side.bone(names::ARM_UNDER),
                    pos - DVec3::new(0.0, 1.0, 0.0),
                    Some(idx),
                );
            }

            let landmarks = match side {
                Side::Left => data.left_foot,
                Side::Right => data.right_foot,
            };
            let anchor = self
                .index_of(&side.bone(names::LEG_IK))
                .or_else(|| self.index_of(&side.bone(names::ANKLE)));
            let Some(anchor) = anchor else {
                continue;
            };

            let toe_tip = landmarks
                .toe_tip
                .or_else(|| self.position(&side.bone(names::TOE_IK)));
            let sole = landmarks.sole.or_else(|| {
                self.position(&side.bone(names::ANKLE))
                    .map(|a| DVec3::new(a.x, 0.0, a.z))
            });
            if let Some(p) = toe_tip {
                self.push_virtual(side.bone(names::TOE_ENTITY), p, Some(anchor));
            }
            if let Some(p) = sole {
                self.push_virtual(side.bone(names::SOLE_ENTITY), p, Some(anchor));
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/skeleton.rs"]
mod tests;
