use std::sync::RwLock;

use ahash::AHashMap;

use anyhow::Result;

use crate::{
    attributes::{Attributes, LoadSource},
    error::Error,
    simplify::{Simplifier, SimplifierConfig},
};
use nalgebra::{Point3, Vector2, Vector3};
use rayon::prelude::*;
use rmesh_macro::cache_access;

// The inner cache for the Trimesh struct. Any field that uses
// the `#[cache_access]` macro will be stored here.
#[derive(Default, Debug, Clone)]
pub struct InnerCache {
    pub face_adjacency: Option<Vec<(usize, usize)>>,
    pub face_normals: Option<Vec<Vector3<f64>>>, // cache for face normals

    pub edges: Option<Vec<[usize; 2]>>,

    pub face_adjacency_angles: Option<Vec<f64>>,
    pub faces_cross: Option<Vec<Vector3<f64>>>,
    pub faces_area: Option<Vec<f64>>,
    pub area: Option<f64>,
}

#[derive(Default, Debug)]
pub struct Trimesh {
    pub vertices: Vec<Point3<f64>>,
    pub faces: Vec<(usize, usize, usize)>,

    // Which sub-mesh each face in `faces` belongs to. Empty means every
    // face belongs to sub-mesh 0 (the common case for a mesh that was
    // never split). Always either empty or exactly `faces.len()` long.
    pub submesh: Vec<u32>,

    // A flat list of attributes so we can define things like
    // multiple colors, normals, uv coordinates, etc and can pick
    // which ones we want to use at runtime or at the application level
    pub attributes_vertex: Attributes,
    pub attributes_face: Attributes,

    // information about where the mesh came from
    pub source: LoadSource,

    // the cached values computed for the mesh
    pub _cache: RwLock<InnerCache>,
}

impl Clone for Trimesh {
    fn clone(&self) -> Self {
        let cache = self._cache.read().unwrap();
        Self {
            vertices: self.vertices.clone(),
            faces: self.faces.clone(),
            submesh: self.submesh.clone(),
            attributes_vertex: self.attributes_vertex.clone(),
            attributes_face: self.attributes_face.clone(),
            source: self.source.clone(),
            _cache: RwLock::new(cache.clone()),
        }
    }
}

impl Trimesh {
    /// Create a new trimesh from a vec of tuple values.
    pub fn new(
        vertices: Vec<Point3<f64>>,
        faces: Vec<(usize, usize, usize)>,
        attributes_vertex: Option<Attributes>,
        attributes_face: Option<Attributes>,
    ) -> Result<Self> {
        Ok(Self {
            vertices,
            faces,
            attributes_vertex: attributes_vertex.unwrap_or_default(),
            attributes_face: attributes_face.unwrap_or_default(),
            _cache: RwLock::new(InnerCache::default()),
            ..Default::default()
        })
    }

    /// Create a Trimesh from flat slices of vertices and faces, with one
    /// or more flat per-sub-mesh index streams. Fails with
    /// `Error::InvalidArgument` if any stream's length isn't a multiple of
    /// 3, and `Error::IndexOutOfRange` if an index doesn't name a vertex.
    pub fn from_submeshes(vertices: &[f64], index_streams: &[Vec<u32>]) -> std::result::Result<Self, Error> {
        let vertices: Vec<Point3<f64>> = vertices
            .chunks_exact(3)
            .map(|chunk| Point3::new(chunk[0], chunk[1], chunk[2]))
            .collect();

        let mut faces = Vec::new();
        let mut submesh = Vec::new();
        for (tag, stream) in index_streams.iter().enumerate() {
            if stream.len() % 3 != 0 {
                return Err(Error::InvalidArgument(format!(
                    "sub-mesh {tag} index count {} is not a multiple of 3",
                    stream.len()
                )));
            }
            for chunk in stream.chunks_exact(3) {
                for &idx in chunk {
                    if idx as usize >= vertices.len() {
                        return Err(Error::IndexOutOfRange {
                            index: idx as usize,
                            bound: vertices.len(),
                        });
                    }
                }
                faces.push((chunk[0] as usize, chunk[1] as usize, chunk[2] as usize));
                submesh.push(tag as u32);
            }
        }

        Ok(Self {
            vertices,
            faces,
            submesh,
            _cache: RwLock::new(InnerCache::default()),
            ..Default::default()
        })
    }

    /// Create a Trimesh from flat slices of vertices and faces (a single
    /// implicit sub-mesh).
    pub fn from_slice(vertices: &[f64], faces: &[usize]) -> Result<Self> {
        let vertices: Vec<Point3<f64>> = vertices
            .chunks_exact(3)
            .map(|chunk| Point3::new(chunk[0], chunk[1], chunk[2]))
            .collect();

        let faces: Vec<(usize, usize, usize)> = faces
            .chunks_exact(3)
            .map(|chunk| (chunk[0], chunk[1], chunk[2]))
            .collect();

        Ok(Self {
            vertices,
            faces,
            _cache: RwLock::new(InnerCache::default()),
            ..Default::default()
        })
    }

    /// How many distinct sub-meshes this mesh's faces are tagged with.
    pub fn submesh_count(&self) -> usize {
        if self.submesh.is_empty() {
            if self.faces.is_empty() {
                0
            } else {
                1
            }
        } else {
            self.submesh.iter().max().map(|&m| m as usize + 1).unwrap_or(0)
        }
    }

    /// The flat index stream for sub-mesh `k`.
    pub fn get_sub_mesh(&self, k: usize) -> std::result::Result<Vec<u32>, Error> {
        let count = self.submesh_count();
        if k >= count {
            return Err(Error::IndexOutOfRange { index: k, bound: count });
        }
        let mut out = Vec::new();
        for (i, &(v0, v1, v2)) in self.faces.iter().enumerate() {
            let tag = self.submesh.get(i).copied().unwrap_or(0) as usize;
            if tag == k {
                out.extend([v0 as u32, v1 as u32, v2 as u32]);
            }
        }
        Ok(out)
    }

    /// Simplify to (at most) `target_triangles` triangles using the
    /// quadric-error-metric edge-collapse engine.
    pub fn simplify(&self, target_triangles: usize, config: &SimplifierConfig) -> std::result::Result<Self, Error> {
        let mut engine = Simplifier::with_config(config.clone());
        engine.initialize(self)?;
        engine.decimate_to_triangles(target_triangles)?;
        Ok(engine.result())
    }

    /// Run lossless decimation: collapse only edges whose error stays
    /// under a small fixed threshold, repeated to a fixpoint.
    pub fn simplify_lossless(&self, config: &SimplifierConfig) -> std::result::Result<Self, Error> {
        let mut engine = Simplifier::with_config(config.clone());
        engine.initialize(self)?;
        engine.decimate_lossless()?;
        Ok(engine.result())
    }

    /// Calculate the normals for each face of the mesh.
    #[cache_access]
    pub fn face_normals(&self) -> Vec<Vector3<f64>> {
        self.faces_cross()
            .par_iter()
            .map(|cross| cross.normalize())
            .collect()
    }

    // Get the edges calculated from the faces
    #[cache_access]
    pub fn edges(&self) -> Vec<[usize; 2]> {
        self.faces
            .par_iter()
            .flat_map(|face| vec![[face.0, face.1], [face.1, face.2], [face.2, face.0]])
            .collect()
    }

    /// The non-normalized cross product of every face.
    #[cache_access]
    pub fn faces_cross(&self) -> Vec<Vector3<f64>> {
        self.faces
            .par_iter()
            .map(|face| {
                let v0 = self.vertices[face.0];
                let v1 = self.vertices[face.1];
                let v2 = self.vertices[face.2];
                (v1 - v0).cross(&(v2 - v0))
            })
            .collect()
    }

    /// The area for each triangle in the mesh.
    #[cache_access]
    pub fn faces_area(&self) -> Vec<f64> {
        self.faces_cross()
            .par_iter()
            .map(|cross| cross.norm() / 2.0)
            .collect()
    }

    /// The summed area of every triangle in the mesh.
    #[cache_access]
    pub fn area(&self) -> f64 {
        self.faces_area().iter().sum()
    }

    /// A helper method to get the first (2-component) UV channel stored in
    /// `mesh.attributes_vertex`.
    pub fn uv(&self) -> Option<&Vec<Vector2<f64>>> {
        self.attributes_vertex.uv0()
    }

    // What are the pairs of face indices that share an edge?
    #[cache_access]
    pub fn face_adjacency(&self) -> Vec<(usize, usize)> {
        let mut edge_map = AHashMap::new();
        let mut adjacency = Vec::new();

        for (i, edge) in self.edges().iter().enumerate() {
            // there are 3 edges per triangle
            let face_index = i / 3;
            // sorted edge for querying
            let edge = [edge[0].min(edge[1]), edge[0].max(edge[1])];
            if let Some(other) = edge_map.get(&edge) {
                // add the face index to the adjacency list
                adjacency.push((*other, face_index));
            } else {
                // add the edge to the map for checking later
                edge_map.insert(edge, face_index);
            }
        }

        adjacency
    }

    // Calculate the angles between adjacent faces.
    pub fn face_adjacency_angles(&self) -> Vec<f64> {
        let adjacency = self.face_adjacency();
        let normals = self.face_normals();
        adjacency
            .par_iter()
            .map(|adj| normals[adj.0].angle(&normals[adj.1]))
            .collect()
    }

    /// Calculate an axis-aligned bounding box (AABB) for the mesh,
    /// or an error if the mesh is empty.
    ///
    /// Returns
    /// ------------
    /// bounds
    ///   The axis-aligned bounding box of the mesh.
    pub fn bounds(&self) -> Result<(Point3<f64>, Point3<f64>)> {
        if self.vertices.is_empty() {
            return Err(anyhow::anyhow!("Mesh has no vertices"));
        }

        let (mut lower, mut upper) = (self.vertices[0], self.vertices[0]);
        for vertex in self.vertices.iter().skip(1) {
            // use componentwise min/max
            lower = lower.inf(vertex);
            upper = upper.sup(vertex);
        }

        if lower == upper {
            return Err(anyhow::anyhow!("All vertices are the same"));
        }

        Ok((lower, upper))
    }
}
