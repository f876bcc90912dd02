//! Per-vertex attribute storage, parallel to `Trimesh::vertices`.
//!
//! Every field is optional and, when present, has one record per vertex.
//! The simplification engine keeps its own working copy of this store for
//! the duration of a collapse run, where entries may briefly diverge from
//! position-vertex indexing at a seam (see `simplify::engine`); the copy
//! attached to a `Trimesh` at rest is always one-record-per-vertex.

use image::DynamicImage;
use nalgebra::{Vector2, Vector3, Vector4};

use crate::error::{Error, Result};
use crate::exchange::MeshFormat;

/// Default vertex color used to backfill vertices that didn't carry one
/// explicitly (e.g. an OBJ file where only a few `v` lines had trailing
/// color data).
pub const DEFAULT_COLOR: Vector4<f64> = Vector4::new(1.0, 1.0, 1.0, 1.0);

/// Four-bone skinning weights. Not required to be sorted or normalized on
/// ingest; `merge` restores both properties.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoneWeight {
    pub bone_ids: [u32; 4],
    pub weights: [f64; 4],
}

impl BoneWeight {
    pub fn renormalized(mut self) -> Self {
        let sum: f64 = self.weights.iter().sum();
        if sum > f64::EPSILON {
            for w in self.weights.iter_mut() {
                *w /= sum;
            }
        }
        self
    }

    /// Merge two bone-weight records by summing weight contributions per
    /// bone id, keeping the four highest, and renormalizing so they sum
    /// to one.
    pub fn merge(a: BoneWeight, b: BoneWeight) -> BoneWeight {
        let mut pairs: Vec<(u32, f64)> = Vec::with_capacity(8);
        for i in 0..4 {
            if a.weights[i] > 0.0 {
                pairs.push((a.bone_ids[i], a.weights[i]));
            }
        }
        for i in 0..4 {
            if b.weights[i] <= 0.0 {
                continue;
            }
            if let Some(existing) = pairs.iter_mut().find(|(id, _)| *id == b.bone_ids[i]) {
                existing.1 += b.weights[i];
            } else {
                pairs.push((b.bone_ids[i], b.weights[i]));
            }
        }
        pairs.sort_by(|x, y| y.1.partial_cmp(&x.1).unwrap_or(std::cmp::Ordering::Equal));
        pairs.truncate(4);

        let mut result = BoneWeight::default();
        for (i, (id, w)) in pairs.into_iter().enumerate() {
            result.bone_ids[i] = id;
            result.weights[i] = w;
        }
        result.renormalized()
    }
}

/// One UV channel, carrying 2, 3, or 4 components per vertex depending on
/// how the source data defined it.
#[derive(Debug, Clone, PartialEq)]
pub enum UvChannel {
    Uv2(Vec<Vector2<f64>>),
    Uv3(Vec<Vector3<f64>>),
    Uv4(Vec<Vector4<f64>>),
}

impl UvChannel {
    pub fn len(&self) -> usize {
        match self {
            UvChannel::Uv2(v) => v.len(),
            UvChannel::Uv3(v) => v.len(),
            UvChannel::Uv4(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn apply_collapse(&mut self, dst: usize, src: usize, mode: CollapseMode) {
        match self {
            UvChannel::Uv2(v) => apply_collapse(v, dst, src, mode),
            UvChannel::Uv3(v) => apply_collapse(v, dst, src, mode),
            UvChannel::Uv4(v) => apply_collapse(v, dst, src, mode),
        }
    }

    fn select(&self, indices: &[usize]) -> UvChannel {
        match self {
            UvChannel::Uv2(v) => UvChannel::Uv2(indices.iter().map(|&i| v[i]).collect()),
            UvChannel::Uv3(v) => UvChannel::Uv3(indices.iter().map(|&i| v[i]).collect()),
            UvChannel::Uv4(v) => UvChannel::Uv4(indices.iter().map(|&i| v[i]).collect()),
        }
    }
}

/// How a pair of attribute records combine when an edge collapses.
///
/// `Move` is used when the optimal collapse point coincides with the
/// removed endpoint, so its attributes should win outright; `Merge`
/// averages (or, for bone weights, re-sums) the two records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollapseMode {
    Move,
    Merge,
}

trait Lerp: Copy {
    fn average(self, other: Self) -> Self;
}

impl Lerp for Vector2<f64> {
    fn average(self, other: Self) -> Self {
        (self + other) * 0.5
    }
}
impl Lerp for Vector3<f64> {
    fn average(self, other: Self) -> Self {
        (self + other) * 0.5
    }
}
impl Lerp for Vector4<f64> {
    fn average(self, other: Self) -> Self {
        (self + other) * 0.5
    }
}

fn apply_collapse<T: Lerp>(v: &mut [T], dst: usize, src: usize, mode: CollapseMode) {
    v[dst] = match mode {
        CollapseMode::Move => v[src],
        CollapseMode::Merge => v[dst].average(v[src]),
    };
}

/// The parallel per-vertex attribute arrays carried alongside
/// `Trimesh::vertices`. Every present array's length must equal the
/// vertex count it's attached to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    pub normals: Option<Vec<Vector3<f64>>>,
    pub tangents: Option<Vec<Vector4<f64>>>,
    pub colors: Option<Vec<Vector4<f64>>>,
    pub bone_weights: Option<Vec<BoneWeight>>,
    pub uv: [Option<UvChannel>; 4],
}

impl Attributes {
    pub fn is_empty(&self) -> bool {
        self.normals.is_none()
            && self.tangents.is_none()
            && self.colors.is_none()
            && self.bone_weights.is_none()
            && self.uv.iter().all(Option::is_none)
    }

    /// A convenience accessor for the first UV channel when it happens to
    /// be 2-component, the common case for texture coordinates loaded
    /// from an OBJ file.
    pub fn uv0(&self) -> Option<&Vec<Vector2<f64>>> {
        match self.uv[0].as_ref()? {
            UvChannel::Uv2(v) => Some(v),
            _ => None,
        }
    }

    /// Validate every present array against an expected vertex count.
    pub fn validate_len(&self, vertex_count: usize) -> Result<()> {
        check_len("normals", self.normals.as_ref(), vertex_count)?;
        check_len("tangents", self.tangents.as_ref(), vertex_count)?;
        check_len("colors", self.colors.as_ref(), vertex_count)?;
        check_len("bone_weights", self.bone_weights.as_ref(), vertex_count)?;
        for (i, channel) in self.uv.iter().enumerate() {
            if let Some(channel) = channel {
                if channel.len() != vertex_count {
                    return Err(Error::AttributeLengthMismatch {
                        attribute: uv_name(i),
                        expected: vertex_count,
                        actual: channel.len(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Drop any present array whose length doesn't match `vertex_count`,
    /// logging a warning for each one dropped. Used by ingest, which
    /// tolerates partial auxiliary data rather than aborting the run.
    pub fn drop_mismatched(&mut self, vertex_count: usize) {
        drop_if_mismatched("normals", &mut self.normals, vertex_count);
        drop_if_mismatched("tangents", &mut self.tangents, vertex_count);
        drop_if_mismatched("colors", &mut self.colors, vertex_count);
        drop_if_mismatched("bone_weights", &mut self.bone_weights, vertex_count);
        for (i, channel) in self.uv.iter_mut().enumerate() {
            let mismatched = matches!(channel, Some(c) if c.len() != vertex_count);
            if mismatched {
                let actual = channel.as_ref().unwrap().len();
                crate::simplify::progress_log::log(
                    crate::simplify::progress_log::Severity::Warning,
                    format!("dropping {} (length {actual} != vertex count {vertex_count})", uv_name(i)),
                );
                *channel = None;
            }
        }
    }

    /// Apply a collapse between attribute-vertex `src` and `dst`,
    /// writing the combined record into `dst` for every present
    /// attribute kind.
    pub fn apply_collapse(&mut self, dst: usize, src: usize, mode: CollapseMode) {
        if let Some(a) = self.normals.as_mut() {
            apply_collapse(a, dst, src, mode);
        }
        if let Some(a) = self.tangents.as_mut() {
            apply_collapse(a, dst, src, mode);
        }
        if let Some(a) = self.colors.as_mut() {
            apply_collapse(a, dst, src, mode);
        }
        if let Some(a) = self.bone_weights.as_mut() {
            a[dst] = match mode {
                CollapseMode::Move => a[src],
                CollapseMode::Merge => BoneWeight::merge(a[dst], a[src]),
            };
        }
        for channel in self.uv.iter_mut().flatten() {
            channel.apply_collapse(dst, src, mode);
        }
    }

    /// Build a fresh, densely-packed `Attributes` by gathering the given
    /// (old-index) records in order. Used by compaction.
    pub fn select(&self, indices: &[usize]) -> Attributes {
        Attributes {
            normals: self
                .normals
                .as_ref()
                .map(|v| indices.iter().map(|&i| v[i]).collect()),
            tangents: self
                .tangents
                .as_ref()
                .map(|v| indices.iter().map(|&i| v[i]).collect()),
            colors: self
                .colors
                .as_ref()
                .map(|v| indices.iter().map(|&i| v[i]).collect()),
            bone_weights: self
                .bone_weights
                .as_ref()
                .map(|v| indices.iter().map(|&i| v[i]).collect()),
            uv: std::array::from_fn(|i| self.uv[i].as_ref().map(|c| c.select(indices))),
        }
    }
}

fn uv_name(i: usize) -> &'static str {
    match i {
        0 => "uv0",
        1 => "uv1",
        2 => "uv2",
        _ => "uv3",
    }
}

fn check_len<T>(name: &'static str, value: Option<&Vec<T>>, expected: usize) -> Result<()> {
    if let Some(v) = value {
        if v.len() != expected {
            return Err(Error::AttributeLengthMismatch {
                attribute: name,
                expected,
                actual: v.len(),
            });
        }
    }
    Ok(())
}

fn drop_if_mismatched<T>(name: &'static str, value: &mut Option<Vec<T>>, expected: usize) {
    let mismatched = matches!(value, Some(v) if v.len() != expected);
    if mismatched {
        let actual = value.as_ref().unwrap().len();
        crate::simplify::progress_log::log(
            crate::simplify::progress_log::Severity::Warning,
            format!("dropping attribute `{name}` (length {actual} != vertex count {expected})"),
        );
        *value = None;
    }
}

/// Where a `Trimesh` was loaded from, if it came from a file rather than
/// being constructed in memory.
#[derive(Debug, Clone, Default)]
pub struct LoadSource {
    // what format was this mesh loaded from?
    pub format: Option<MeshFormat>,

    // many formats have a header which would otherwise be discarded
    pub header: Option<String>,
}

pub struct Grouping {
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct SimpleMaterial {
    pub name: String,
    pub diffuse: Option<Vector3<f64>>,
    pub specular: Option<Vector3<f64>>,
    pub shininess: Option<f64>,
    pub alpha: Option<f64>,
    pub image: Option<DynamicImage>,
}

#[derive(Debug, Clone)]
pub struct PBRMaterial {}

#[derive(Debug, Clone)]
pub struct EmptyMaterial {}

#[derive(Debug, Clone)]
pub enum Material {
    Empty(EmptyMaterial),
    Simple(SimpleMaterial),
    PBR(PBRMaterial),
}
