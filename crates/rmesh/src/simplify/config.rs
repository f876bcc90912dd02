//! Configuration surface and progress-reporting types for [`super::Simplifier`].

use crate::error::{Error, Result};

/// Enumerates the decimation strategies the public constructor accepts.
/// Only one exists today; the selector exists so an unrecognized value can
/// surface `Error::UnsupportedAlgorithm` instead of silently picking a
/// default. See [`Algorithm::parse`] and
/// [`super::Simplifier::with_algorithm`] for the reachable path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Algorithm {
    /// Garland & Heckbert quadric-error-metric edge collapse
    /// (Forstmann's "Fast Quadric Mesh Simplification").
    #[default]
    FastQuadric,
}

impl Algorithm {
    /// Parse a selector name into a known algorithm, or
    /// `Error::UnsupportedAlgorithm` if it doesn't name one.
    pub fn parse(selector: &str) -> Result<Self> {
        match selector.trim().to_ascii_lowercase().as_str() {
            "fast_quadric" | "fast-quadric" | "fastquadric" => Ok(Algorithm::FastQuadric),
            other => Err(Error::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

/// Tunables for a [`super::Simplifier`] run. See spec §4.1 for the effect
/// of each field.
#[derive(Debug, Clone, PartialEq)]
pub struct SimplifierConfig {
    /// Exponent in the per-pass threshold schedule. Higher values open the
    /// error window more slowly, yielding higher quality but more passes.
    pub aggressiveness: f64,

    /// If set, any edge with at least one border endpoint is never
    /// collapsed.
    pub preserve_borders: bool,

    /// If set (the default), border vertices whose positions are within
    /// `vertex_link_distance_sqr` of each other are unified at analysis
    /// time, closing cracks between topologically-split but geometrically
    /// coincident regions. Supersedes the legacy `keep_linked_vertices`
    /// flag, which has no effect while this is enabled.
    pub enable_smart_link: bool,

    /// Squared distance threshold used by smart-link pairing.
    pub vertex_link_distance_sqr: f64,

    /// Legacy coincident-vertex handling, retained only for backward
    /// compatibility. Ignored whenever `enable_smart_link` is set.
    pub keep_linked_vertices: bool,

    /// Early-termination target on vertex count; 0 means unlimited.
    pub max_vertex_count: usize,

    /// Emit periodic progress log lines through the process-wide sink.
    pub verbose: bool,
}

impl Default for SimplifierConfig {
    fn default() -> Self {
        SimplifierConfig {
            aggressiveness: 7.0,
            preserve_borders: false,
            enable_smart_link: true,
            vertex_link_distance_sqr: f64::EPSILON,
            keep_linked_vertices: false,
            max_vertex_count: 0,
            verbose: false,
        }
    }
}

/// A single pre-pass progress report.
///
/// `target_triangles` is `-1` in lossless mode (there is no fixed
/// triangle-count target, only a fixpoint condition).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    pub iteration: usize,
    pub original_triangles: usize,
    pub current_triangles: usize,
    pub target_triangles: i64,
}

pub type ProgressCallback = Box<dyn Fn(&ProgressEvent) + Send>;
