//! The quadric-error-metric edge-collapse engine itself.
//!
//! Ported and generalized from a flat-array Fast-Quadric-Mesh-Simplification
//! implementation: vertices and triangles live in parallel `Vec`s, a
//! triangle never moves once created (it is tombstoned via `deleted`
//! instead), and per-vertex adjacency is a `(tstart, tcount)` window into a
//! single flat `refs` array rather than a per-vertex `Vec`.

use std::sync::RwLock;

use ahash::AHashMap;
use nalgebra::{Point3, Vector3};

use crate::attributes::{Attributes, CollapseMode};
use crate::error::{Error, Result};
use crate::mesh::{InnerCache, Trimesh};

use super::config::{Algorithm, ProgressCallback, ProgressEvent, SimplifierConfig};
use super::progress_log::{self, Severity};
use super::quadric::SymmetricMatrix;

const DET_EPSILON: f64 = 1e-15;
const COLLINEAR_COSINE: f64 = 0.999;
const FLIP_COSINE: f64 = 0.2;
const TARGET_PASS_CAP: usize = 100;
const LOSSLESS_PASS_CAP: usize = 9999;
const TARGET_UPDATE_EVERY: usize = 5;
const LOSSLESS_THRESHOLD: f64 = 1e-3;

#[derive(Debug, Clone, Copy)]
struct Ref {
    tid: usize,
    tvertex: usize,
}

#[derive(Debug, Clone)]
struct Vertex {
    p: Point3<f64>,
    tstart: usize,
    tcount: usize,
    q: SymmetricMatrix,
    border: bool,
    /// Legacy coincident-vertex marker, populated only when smart-link is
    /// disabled and `keep_linked_vertices` is set.
    linked: bool,
}

#[derive(Debug, Clone)]
struct Triangle {
    /// Position-vertex indices for each corner.
    v: [usize; 3],
    /// Attribute-vertex indices for each corner. Seeded equal to `v` (one
    /// attribute record per position vertex at ingest), but diverges from
    /// `v` once a collapse re-points a corner: the position always
    /// follows the surviving vertex, while the attribute id only follows
    /// along when that corner's attributes were actually merged into the
    /// survivor, preserving seams elsewhere on the same position.
    va: [usize; 3],
    submesh: u32,
    n: Vector3<f64>,
    /// Edge errors for (v0,v1), (v1,v2), (v2,v0), then their minimum.
    err: [f64; 4],
    deleted: bool,
    dirty: bool,
}

/// Which point a collapse's error calculation settled on, used to decide
/// whether the attribute merge is a `Move` (one side's data wins outright)
/// or a `Merge` (blend both sides).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PointSource {
    Solved,
    Endpoint0,
    Endpoint1,
    Midpoint,
}

enum Mode {
    Target(usize),
    Lossless,
}

/// A single run of the Garland & Heckbert / Forstmann quadric-error edge
/// collapse algorithm.
///
/// Usage is strictly sequential: construct, `initialize` with a source
/// mesh, run exactly one of `decimate_to_triangles`/`decimate_lossless`,
/// then read back `result`. There is no support for resuming a
/// partially-run engine with a different target.
pub struct Simplifier {
    config: SimplifierConfig,
    vertices: Vec<Vertex>,
    triangles: Vec<Triangle>,
    refs: Vec<Ref>,
    attributes: Attributes,
    original_triangle_count: usize,
    remaining_vertices: usize,
    callbacks: Vec<ProgressCallback>,
    initialized: bool,
}

impl std::fmt::Debug for Simplifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simplifier")
            .field("config", &self.config)
            .field("vertices", &self.vertices)
            .field("triangles", &self.triangles)
            .field("refs", &self.refs)
            .field("attributes", &self.attributes)
            .field("original_triangle_count", &self.original_triangle_count)
            .field("remaining_vertices", &self.remaining_vertices)
            .field("callbacks", &format_args!("[{} callback(s)]", self.callbacks.len()))
            .field("initialized", &self.initialized)
            .finish()
    }
}

impl Default for Simplifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Simplifier {
    pub fn new() -> Self {
        Self::with_config(SimplifierConfig::default())
    }

    pub fn with_config(config: SimplifierConfig) -> Self {
        Simplifier {
            config,
            vertices: Vec::new(),
            triangles: Vec::new(),
            refs: Vec::new(),
            attributes: Attributes::default(),
            original_triangle_count: 0,
            remaining_vertices: 0,
            callbacks: Vec::new(),
            initialized: false,
        }
    }

    /// Construct a simplifier for a named algorithm selector, failing with
    /// `Error::UnsupportedAlgorithm` if `algorithm` doesn't name a known
    /// strategy. Only `"fast_quadric"` exists today; this is the factory
    /// the public interface reserves for future alternative decimation
    /// strategies.
    pub fn with_algorithm(algorithm: &str, config: SimplifierConfig) -> Result<Self> {
        match Algorithm::parse(algorithm)? {
            Algorithm::FastQuadric => Ok(Self::with_config(config)),
        }
    }

    pub fn configure(&mut self, config: SimplifierConfig) {
        self.config = config;
    }

    /// Register a progress callback. Unlike `configure`, repeated calls
    /// accumulate rather than replace — every registered callback fires on
    /// every pass.
    pub fn on_progress(&mut self, callback: impl Fn(&ProgressEvent) + Send + 'static) {
        self.callbacks.push(Box::new(callback));
    }

    pub fn clear_progress_callbacks(&mut self) {
        self.callbacks.clear();
    }

    /// Load a mesh into the engine's working arrays, classify borders,
    /// apply smart-link if enabled, and accumulate initial quadrics.
    ///
    /// `mesh` is assumed already index-valid in shape (triangles, not flat
    /// streams); this still re-checks every index against the vertex
    /// count, since a `Trimesh` can be built by hand.
    pub fn initialize(&mut self, mesh: &Trimesh) -> Result<()> {
        let bound = mesh.vertices.len();
        for &(v0, v1, v2) in &mesh.faces {
            for idx in [v0, v1, v2] {
                if idx >= bound {
                    return Err(Error::IndexOutOfRange { index: idx, bound });
                }
            }
        }

        let mut attributes = mesh.attributes_vertex.clone();
        attributes.drop_mismatched(bound);

        self.vertices = mesh
            .vertices
            .iter()
            .map(|&p| Vertex {
                p,
                tstart: 0,
                tcount: 0,
                q: SymmetricMatrix::ZERO,
                border: false,
                linked: false,
            })
            .collect();

        self.triangles = mesh
            .faces
            .iter()
            .enumerate()
            .map(|(i, &(v0, v1, v2))| Triangle {
                v: [v0, v1, v2],
                va: [v0, v1, v2],
                submesh: mesh.submesh.get(i).copied().unwrap_or(0),
                n: Vector3::zeros(),
                err: [0.0; 4],
                deleted: false,
                dirty: false,
            })
            .collect();

        self.refs.clear();
        self.attributes = attributes;
        self.original_triangle_count = self.triangles.len();
        self.initialized = true;

        self.analyze(0);
        self.remaining_vertices = self.vertices.iter().filter(|v| v.tcount > 0).count();
        Ok(())
    }

    pub fn decimate_to_triangles(&mut self, target_triangles: usize) -> Result<()> {
        self.run(Mode::Target(target_triangles))
    }

    pub fn decimate_lossless(&mut self) -> Result<()> {
        self.run(Mode::Lossless)
    }

    /// Compact the working arrays into a fresh `Trimesh`. Pure: calling
    /// this more than once (or before decimating) just re-derives the
    /// same answer from current state. A corner is deduped by its `(v,
    /// va)` pair rather than by position alone: two corners sharing a
    /// position but carrying different attribute records (a seam that
    /// survived the collapse) are emitted as two distinct output
    /// vertices at the same position, each with its own attribute data.
    pub fn result(&self) -> Trimesh {
        let mut order: Vec<usize> = (0..self.triangles.len())
            .filter(|&i| !self.triangles[i].deleted)
            .collect();
        order.sort_by_key(|&i| self.triangles[i].submesh);

        let mut slot_of: AHashMap<(usize, usize), usize> = AHashMap::new();
        let mut position_of_slot: Vec<Point3<f64>> = Vec::new();
        let mut attr_of_slot: Vec<usize> = Vec::new();

        let mut faces = Vec::with_capacity(order.len());
        for &ti in &order {
            let t = &self.triangles[ti];
            let mut corner = |v: usize, va: usize| {
                *slot_of.entry((v, va)).or_insert_with(|| {
                    let slot = position_of_slot.len();
                    position_of_slot.push(self.vertices[v].p);
                    attr_of_slot.push(va);
                    slot
                })
            };
            faces.push((corner(t.v[0], t.va[0]), corner(t.v[1], t.va[1]), corner(t.v[2], t.va[2])));
        }
        let submesh: Vec<u32> = order.iter().map(|&ti| self.triangles[ti].submesh).collect();
        let attributes_vertex = self.attributes.select(&attr_of_slot);

        Trimesh {
            vertices: position_of_slot,
            faces,
            submesh,
            attributes_vertex,
            attributes_face: Attributes::default(),
            source: Default::default(),
            _cache: RwLock::new(InnerCache::default()),
        }
    }

    fn run(&mut self, mode: Mode) -> Result<()> {
        if !self.initialized {
            return Err(Error::Internal("decimate called before initialize".into()));
        }

        let max_passes = match mode {
            Mode::Target(_) => TARGET_PASS_CAP,
            Mode::Lossless => LOSSLESS_PASS_CAP,
        };
        let update_every = match mode {
            Mode::Target(_) => TARGET_UPDATE_EVERY,
            Mode::Lossless => 1,
        };

        let mut deleted_triangles = 0usize;
        let mut deleted0: Vec<bool> = Vec::new();
        let mut deleted1: Vec<bool> = Vec::new();

        for iteration in 0..max_passes {
            let current_triangle_count = self.original_triangle_count - deleted_triangles;

            let event = ProgressEvent {
                iteration,
                original_triangles: self.original_triangle_count,
                current_triangles: current_triangle_count,
                target_triangles: match mode {
                    Mode::Target(t) => t as i64,
                    Mode::Lossless => -1,
                },
            };
            for callback in &self.callbacks {
                callback(&event);
            }

            if let Mode::Target(target) = mode {
                if current_triangle_count <= target {
                    break;
                }
            }
            if self.config.max_vertex_count > 0 && self.remaining_vertices <= self.config.max_vertex_count {
                break;
            }

            if iteration == 0 || iteration % update_every == 0 {
                self.analyze(iteration);
                let max_tcount = self.vertices.iter().map(|v| v.tcount).max().unwrap_or(0);
                if deleted0.len() < max_tcount {
                    deleted0.resize(max_tcount, false);
                    deleted1.resize(max_tcount, false);
                }
            }

            for t in self.triangles.iter_mut() {
                t.dirty = false;
            }

            let threshold = match mode {
                Mode::Target(_) => 1e-9 * (iteration as f64 + 3.0).powf(self.config.aggressiveness),
                Mode::Lossless => LOSSLESS_THRESHOLD,
            };

            if self.config.verbose && iteration % update_every == 0 {
                progress_log::log(
                    Severity::Verbose,
                    format!("pass {iteration}: {current_triangle_count} triangles, threshold {threshold:.3e}"),
                );
            }

            let mut collapses_this_pass = 0usize;

            for tid in 0..self.triangles.len() {
                if self.triangles[tid].err[3] > threshold || self.triangles[tid].deleted || self.triangles[tid].dirty {
                    continue;
                }

                for j in 0..3 {
                    if self.triangles[tid].err[j] >= threshold {
                        continue;
                    }

                    let i0 = self.triangles[tid].v[j];
                    let i1 = self.triangles[tid].v[(j + 1) % 3];

                    if self.vertices[i0].border != self.vertices[i1].border {
                        continue;
                    }
                    if self.config.preserve_borders && (self.vertices[i0].border || self.vertices[i1].border) {
                        continue;
                    }
                    if !self.config.enable_smart_link
                        && self.config.keep_linked_vertices
                        && (self.vertices[i0].linked || self.vertices[i1].linked)
                    {
                        continue;
                    }

                    let (_, p_result, source) = self.calculate_error(i0, i1);

                    let tcount0 = self.vertices[i0].tcount;
                    let tcount1 = self.vertices[i1].tcount;
                    if tcount0 > deleted0.len() || tcount1 > deleted1.len() {
                        let needed = tcount0.max(tcount1);
                        deleted0.resize(needed, false);
                        deleted1.resize(needed, false);
                    }
                    deleted0.iter_mut().take(tcount0).for_each(|b| *b = false);
                    deleted1.iter_mut().take(tcount1).for_each(|b| *b = false);

                    if self.flipped(p_result, i0, i1, &mut deleted0[..tcount0]) {
                        continue;
                    }
                    if self.flipped(p_result, i1, i0, &mut deleted1[..tcount1]) {
                        continue;
                    }

                    let va0 = self.triangles[tid].va[j];
                    let va1 = self.triangles[tid].va[(j + 1) % 3];
                    match source {
                        PointSource::Endpoint1 => self.attributes.apply_collapse(va0, va1, CollapseMode::Move),
                        PointSource::Endpoint0 | PointSource::Solved | PointSource::Midpoint => {
                            self.attributes.apply_collapse(va0, va1, CollapseMode::Merge)
                        }
                    }

                    self.vertices[i0].p = p_result;
                    let (v0q, v1q) = (self.vertices[i0].q, self.vertices[i1].q);
                    self.vertices[i0].q = v0q + v1q;

                    let refs_append_start = self.refs.len();
                    let mut new_refs_count = 0;
                    new_refs_count += self.update_triangles(i0, i0, None, &deleted0[..tcount0], &mut deleted_triangles);
                    new_refs_count +=
                        self.update_triangles(i0, i1, Some(va0), &deleted1[..tcount1], &mut deleted_triangles);

                    self.vertices[i0].tstart = refs_append_start;
                    self.vertices[i0].tcount = new_refs_count;
                    self.remaining_vertices -= 1;
                    collapses_this_pass += 1;

                    break;
                }

                if let Mode::Target(target) = mode {
                    if self.original_triangle_count - deleted_triangles <= target {
                        break;
                    }
                }
            }

            if matches!(mode, Mode::Lossless) && collapses_this_pass == 0 {
                break;
            }
        }

        Ok(())
    }

    fn calculate_error(&self, i0: usize, i1: usize) -> (f64, Point3<f64>, PointSource) {
        let q = self.vertices[i0].q + self.vertices[i1].q;
        let border = self.vertices[i0].border && self.vertices[i1].border;
        let det = q.det_upper_left();

        if det.abs() > DET_EPSILON && !border {
            let p = q.optimal_point(det);
            (q.error_at(p), p, PointSource::Solved)
        } else {
            let p0 = self.vertices[i0].p;
            let p1 = self.vertices[i1].p;
            let mid = Point3::from((p0.coords + p1.coords) * 0.5);

            let e0 = q.error_at(p0);
            let e1 = q.error_at(p1);
            let em = q.error_at(mid);
            let min_e = e0.min(e1).min(em);

            if min_e == e0 {
                (e0, p0, PointSource::Endpoint0)
            } else if min_e == e1 {
                (e1, p1, PointSource::Endpoint1)
            } else {
                (em, mid, PointSource::Midpoint)
            }
        }
    }

    /// Would collapsing `i0` (and everything that currently references it)
    /// to `p` flip or degenerate a triangle incident to `i0` but not
    /// containing edge `(i0, i1)`? Also marks, in `deleted_flags`, which of
    /// `i0`'s incident triangles contain that edge (and so will be
    /// tombstoned rather than updated).
    fn flipped(&self, p: Point3<f64>, i0: usize, i1: usize, deleted_flags: &mut [bool]) -> bool {
        let v0 = &self.vertices[i0];
        for k in 0..v0.tcount {
            let r = self.refs[v0.tstart + k];
            let t = &self.triangles[r.tid];
            if t.deleted {
                continue;
            }

            let s = r.tvertex;
            let id1 = t.v[(s + 1) % 3];
            let id2 = t.v[(s + 2) % 3];

            if id1 == i1 || id2 == i1 {
                deleted_flags[k] = true;
                continue;
            }

            let p1 = self.vertices[id1].p;
            let p2 = self.vertices[id2].p;
            let d1 = (p1 - p).normalize();
            let d2 = (p2 - p).normalize();
            if d1.dot(&d2).abs() > COLLINEAR_COSINE {
                return true;
            }

            let n = d1.cross(&d2).normalize();
            deleted_flags[k] = false;
            if n.dot(&t.n) < FLIP_COSINE {
                return true;
            }
        }
        false
    }

    /// Re-point triangles that used to reference `v_idx` at `i0`, or
    /// tombstone them if they contained the collapsed edge. Appends
    /// surviving refs to the end of `self.refs` and returns how many were
    /// appended.
    ///
    /// `new_attr` is the attribute-vertex id to repoint affected corners'
    /// `va` to, or `None` to leave `va` untouched. Only corners genuinely
    /// being pulled off the deleted vertex (`v_idx == i1`) carry their
    /// attribute record along with them; `v_idx == i0`'s own corners keep
    /// whatever `va` they already had, preserving unrelated seams at that
    /// position.
    fn update_triangles(
        &mut self,
        i0: usize,
        v_idx: usize,
        new_attr: Option<usize>,
        deleted_flags: &[bool],
        deleted_triangles: &mut usize,
    ) -> usize {
        let mut new_refs_count = 0;
        let (tstart, tcount) = (self.vertices[v_idx].tstart, self.vertices[v_idx].tcount);

        for k in 0..tcount {
            let r = self.refs[tstart + k];
            let tid = r.tid;

            if self.triangles[tid].deleted {
                continue;
            }

            if deleted_flags[k] {
                self.triangles[tid].deleted = true;
                *deleted_triangles += 1;
                continue;
            }

            self.triangles[tid].v[r.tvertex] = i0;
            if let Some(attr) = new_attr {
                self.triangles[tid].va[r.tvertex] = attr;
            }
            self.triangles[tid].dirty = true;

            let (err0, _, _) = self.calculate_error(self.triangles[tid].v[0], self.triangles[tid].v[1]);
            let (err1, _, _) = self.calculate_error(self.triangles[tid].v[1], self.triangles[tid].v[2]);
            let (err2, _, _) = self.calculate_error(self.triangles[tid].v[2], self.triangles[tid].v[0]);
            self.triangles[tid].err = [err0, err1, err2, err0.min(err1.min(err2))];

            self.refs.push(r);
            new_refs_count += 1;
        }
        new_refs_count
    }

    /// Rebuild the `(tstart, tcount)` adjacency windows and flat `refs`
    /// array from the current triangle list. On the first pass (and after
    /// smart-link rewrites corner indices), also reclassifies borders and
    /// accumulates quadrics/edge errors from scratch.
    fn analyze(&mut self, iteration: usize) {
        if iteration > 0 {
            self.triangles.retain(|t| !t.deleted);
        }
        self.rebuild_references();

        if iteration == 0 {
            self.classify_borders();
            if self.config.enable_smart_link {
                self.apply_smart_link();
                self.rebuild_references();
                for v in self.vertices.iter_mut() {
                    v.border = false;
                }
                self.classify_borders();
            } else if self.config.keep_linked_vertices {
                self.classify_legacy_linked();
            }
            self.init_quadrics();
            self.init_triangle_errors();
        }
    }

    fn rebuild_references(&mut self) {
        for v in self.vertices.iter_mut() {
            v.tstart = 0;
            v.tcount = 0;
        }
        for t in &self.triangles {
            if t.deleted {
                continue;
            }
            for &vi in &t.v {
                self.vertices[vi].tcount += 1;
            }
        }

        let mut start = 0;
        for v in self.vertices.iter_mut() {
            v.tstart = start;
            start += v.tcount;
            v.tcount = 0;
        }

        self.refs.clear();
        self.refs.resize(start, Ref { tid: 0, tvertex: 0 });
        for (tid, t) in self.triangles.iter().enumerate() {
            if t.deleted {
                continue;
            }
            for (tvertex, &vi) in t.v.iter().enumerate() {
                let v = &mut self.vertices[vi];
                let idx = v.tstart + v.tcount;
                self.refs[idx] = Ref { tid, tvertex };
                v.tcount += 1;
            }
        }
    }

    /// A vertex is a border vertex if it has a neighbor reachable by
    /// exactly one incident (non-deleted) triangle.
    fn classify_borders(&mut self) {
        for v_idx in 0..self.vertices.len() {
            let v = &self.vertices[v_idx];
            let mut neighbor_counts: AHashMap<usize, usize> = AHashMap::new();

            for k in 0..v.tcount {
                let r = self.refs[v.tstart + k];
                let t = &self.triangles[r.tid];
                if t.deleted {
                    continue;
                }
                for j in 0..3 {
                    let a = t.v[j];
                    let b = t.v[(j + 1) % 3];
                    if a == v_idx || b == v_idx {
                        let neighbor = if a == v_idx { b } else { a };
                        if neighbor != v_idx {
                            *neighbor_counts.entry(neighbor).or_insert(0) += 1;
                        }
                    }
                }
            }

            for (&neighbor, &count) in neighbor_counts.iter() {
                if count == 1 {
                    self.vertices[v_idx].border = true;
                    self.vertices[neighbor].border = true;
                }
            }
        }
    }

    /// Unify border vertices within `vertex_link_distance_sqr` of each
    /// other by rewriting every triangle corner that referenced the
    /// absorbed vertex to reference the surviving one. Leaves the absorbed
    /// vertex unreferenced, so it's dropped the next time the mesh is
    /// compacted.
    fn apply_smart_link(&mut self) {
        let border_indices: Vec<usize> = (0..self.vertices.len()).filter(|&i| self.vertices[i].border).collect();
        let threshold = self.config.vertex_link_distance_sqr;
        let mut absorbed = vec![false; self.vertices.len()];

        for (pos, &a) in border_indices.iter().enumerate() {
            if absorbed[a] {
                continue;
            }
            for &b in &border_indices[pos + 1..] {
                if absorbed[b] {
                    continue;
                }
                if (self.vertices[a].p - self.vertices[b].p).norm_squared() <= threshold {
                    for t in self.triangles.iter_mut() {
                        if t.deleted {
                            continue;
                        }
                        for k in 0..3 {
                            if t.v[k] == b {
                                t.v[k] = a;
                            }
                        }
                    }
                    absorbed[b] = true;
                }
            }
        }
    }

    /// Legacy coincident-vertex detection used only when smart-link is
    /// disabled: any group of vertices sharing an exact position is
    /// marked `linked`, and the main loop refuses to collapse through a
    /// linked vertex.
    fn classify_legacy_linked(&mut self) {
        let mut groups: AHashMap<[u64; 3], Vec<usize>> = AHashMap::new();
        for (i, v) in self.vertices.iter().enumerate() {
            let key = [v.p.x.to_bits(), v.p.y.to_bits(), v.p.z.to_bits()];
            groups.entry(key).or_default().push(i);
        }
        for indices in groups.values() {
            if indices.len() > 1 {
                for &i in indices {
                    self.vertices[i].linked = true;
                }
            }
        }
    }

    fn init_quadrics(&mut self) {
        for v in self.vertices.iter_mut() {
            v.q = SymmetricMatrix::ZERO;
        }
        for t in self.triangles.iter_mut() {
            if t.deleted {
                continue;
            }
            let p0 = self.vertices[t.v[0]].p;
            let p1 = self.vertices[t.v[1]].p;
            let p2 = self.vertices[t.v[2]].p;
            let normal = (p1 - p0).cross(&(p2 - p0)).normalize();
            t.n = normal;
            let dist = -normal.dot(&p0.coords);
            let plane_q = SymmetricMatrix::from_plane(normal.x, normal.y, normal.z, dist);
            for &vi in &t.v {
                self.vertices[vi].q += plane_q;
            }
        }
    }

    fn init_triangle_errors(&mut self) {
        for tid in 0..self.triangles.len() {
            if self.triangles[tid].deleted {
                continue;
            }
            let mut err = [0.0; 4];
            for j in 0..3 {
                let v0 = self.triangles[tid].v[j];
                let v1 = self.triangles[tid].v[(j + 1) % 3];
                let (e, _, _) = self.calculate_error(v0, v1);
                err[j] = e;
            }
            err[3] = err[0].min(err[1].min(err[2]));
            self.triangles[tid].err = err;
        }
    }

    #[cfg(test)]
    fn live_triangle_count(&self) -> usize {
        self.triangles.iter().filter(|t| !t.deleted).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::LoadSource;
    use nalgebra::Point3;

    fn cube() -> Trimesh {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(1.0, 0.0, 1.0),
            Point3::new(1.0, 1.0, 1.0),
            Point3::new(0.0, 1.0, 1.0),
        ];
        let faces = vec![
            (0, 1, 2),
            (0, 2, 3),
            (4, 5, 6),
            (4, 6, 7),
            (0, 1, 5),
            (0, 5, 4),
            (1, 2, 6),
            (1, 6, 5),
            (2, 3, 7),
            (2, 7, 6),
            (3, 0, 4),
            (3, 4, 7),
        ];
        Trimesh {
            vertices,
            faces,
            submesh: Vec::new(),
            attributes_vertex: Default::default(),
            attributes_face: Default::default(),
            source: LoadSource::default(),
            _cache: RwLock::new(InnerCache::default()),
        }
    }

    fn tetrahedron() -> Trimesh {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        ];
        let faces = vec![(0, 1, 2), (0, 1, 3), (1, 2, 3), (0, 2, 3)];
        Trimesh {
            vertices,
            faces,
            submesh: Vec::new(),
            attributes_vertex: Default::default(),
            attributes_face: Default::default(),
            source: LoadSource::default(),
            _cache: RwLock::new(InnerCache::default()),
        }
    }

    #[test]
    fn decimate_never_increases_triangle_count() {
        let mesh = cube();
        let original = mesh.faces.len();
        let mut engine = Simplifier::new();
        engine.initialize(&mesh).unwrap();
        engine.decimate_to_triangles(6).unwrap();
        let result = engine.result();
        assert!(result.faces.len() <= original);
        assert!(result.faces.len() <= 6 || result.faces.len() == original);
    }

    #[test]
    fn decimate_to_triangles_hits_target_on_a_dense_mesh() {
        let mesh = cube();
        let mut engine = Simplifier::new();
        engine.initialize(&mesh).unwrap();
        engine.decimate_to_triangles(2).unwrap();
        let result = engine.result();
        assert!(result.faces.len() >= 2);
        assert!(result.faces.len() < mesh.faces.len());
    }

    #[test]
    fn no_triangle_has_a_repeated_vertex_after_decimate() {
        let mesh = cube();
        let mut engine = Simplifier::new();
        engine.initialize(&mesh).unwrap();
        engine.decimate_to_triangles(4).unwrap();
        let result = engine.result();
        for &(a, b, c) in &result.faces {
            assert_ne!(a, b);
            assert_ne!(b, c);
            assert_ne!(a, c);
        }
    }

    #[test]
    fn refs_adjacency_matches_triangle_incidence_after_initialize() {
        let mesh = tetrahedron();
        let mut engine = Simplifier::new();
        engine.initialize(&mesh).unwrap();

        for (vi, v) in engine.vertices.iter().enumerate() {
            let mut incident_from_triangles = 0;
            for t in &engine.triangles {
                if t.v.contains(&vi) {
                    incident_from_triangles += 1;
                }
            }
            assert_eq!(v.tcount, incident_from_triangles, "vertex {vi} adjacency window mismatch");
        }
    }

    #[test]
    fn vertex_quadric_is_sum_of_incident_plane_quadrics_at_pass_zero() {
        let mesh = tetrahedron();
        let mut engine = Simplifier::new();
        engine.initialize(&mesh).unwrap();

        let mut expected = vec![SymmetricMatrix::ZERO; engine.vertices.len()];
        for t in &engine.triangles {
            let p0 = engine.vertices[t.v[0]].p;
            let p1 = engine.vertices[t.v[1]].p;
            let p2 = engine.vertices[t.v[2]].p;
            let normal = (p1 - p0).cross(&(p2 - p0)).normalize();
            let dist = -normal.dot(&p0.coords);
            let q = SymmetricMatrix::from_plane(normal.x, normal.y, normal.z, dist);
            for &vi in &t.v {
                expected[vi] += q;
            }
        }

        for (vi, v) in engine.vertices.iter().enumerate() {
            assert_eq!(v.q, expected[vi], "vertex {vi} quadric diverges from independently summed planes");
        }
    }

    #[test]
    fn tombstoned_triangles_are_never_resurrected_across_passes() {
        let mesh = cube();
        let mut engine = Simplifier::new();
        engine.initialize(&mesh).unwrap();
        let mut last_live = engine.live_triangle_count();
        for _ in 0..20 {
            engine.decimate_to_triangles(1).unwrap();
            let live = engine.live_triangle_count();
            assert!(live <= last_live);
            last_live = live;
        }
    }

    #[test]
    fn progress_callback_fires_before_each_pass() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let mesh = cube();
        let mut engine = Simplifier::new();
        engine.initialize(&mesh).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();
        engine.on_progress(move |_event| {
            counted.fetch_add(1, Ordering::SeqCst);
        });
        engine.decimate_to_triangles(2).unwrap();
        assert!(calls.load(Ordering::SeqCst) > 0);
    }

    #[test]
    fn decimate_before_initialize_is_an_internal_error() {
        let mut engine = Simplifier::new();
        let err = engine.decimate_to_triangles(1).unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let mesh = Trimesh {
            vertices: vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)],
            faces: vec![(0, 1, 5)],
            submesh: Vec::new(),
            attributes_vertex: Default::default(),
            attributes_face: Default::default(),
            source: LoadSource::default(),
            _cache: RwLock::new(InnerCache::default()),
        };
        let mut engine = Simplifier::new();
        let err = engine.initialize(&mesh).unwrap_err();
        assert_eq!(err, Error::IndexOutOfRange { index: 5, bound: 2 });
    }

    #[test]
    fn lossless_decimation_terminates_and_never_increases_triangles() {
        let mesh = cube();
        let original = mesh.faces.len();
        let mut engine = Simplifier::new();
        engine.initialize(&mesh).unwrap();
        engine.decimate_lossless().unwrap();
        let result = engine.result();
        assert!(result.faces.len() <= original);
    }

    #[test]
    fn with_algorithm_rejects_unknown_selector() {
        let err = Simplifier::with_algorithm("slow_quadric", SimplifierConfig::default()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedAlgorithm(_)));
    }

    #[test]
    fn with_algorithm_accepts_the_known_selector() {
        assert!(Simplifier::with_algorithm("fast_quadric", SimplifierConfig::default()).is_ok());
    }

    #[test]
    fn result_splits_a_position_shared_by_two_different_attribute_vertices() {
        // Two corners can end up sharing a position (`v`) while still
        // carrying distinct attribute records (`va`) once a collapse only
        // repoints the `i1`-side corners. `result()` must dedupe on the
        // `(v, va)` pair, not `v` alone, so the seam survives compaction
        // as two output vertices at the same position.
        let mesh = tetrahedron();
        let mut engine = Simplifier::new();
        engine.initialize(&mesh).unwrap();
        engine.attributes.normals = Some(vec![
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::new(0.0, 0.0, -1.0),
        ]);
        // Every corner referencing position 3 is seeded with attribute-vertex
        // 3 at ingest; repoint just one of them to attribute-vertex 0 to
        // simulate a collapse that repointed that corner's attributes but
        // left the others' seam untouched.
        let other_triangle = engine
            .triangles
            .iter()
            .position(|t| t.v.contains(&3) && t.v != [0, 1, 3])
            .unwrap();
        let corner = engine.triangles[other_triangle].v.iter().position(|&v| v == 3).unwrap();
        engine.triangles[other_triangle].va[corner] = 0;

        let result = engine.result();
        assert_eq!(result.vertices.len(), 5);
        let normals = result.attributes_vertex.normals.unwrap();
        assert!(normals.contains(&Vector3::new(0.0, 0.0, -1.0)));
        assert!(normals.contains(&Vector3::new(1.0, 0.0, 0.0)));
    }
}
