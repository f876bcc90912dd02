//! Quadric-error-metric mesh simplification.
//!
//! `Simplifier` is the engine itself; most callers should reach it through
//! `Trimesh::simplify`/`Trimesh::simplify_lossless` instead of driving it
//! directly.

pub mod config;
pub mod engine;
pub mod progress_log;
mod quadric;

pub use config::{Algorithm, ProgressCallback, ProgressEvent, SimplifierConfig};
pub use engine::Simplifier;
pub use progress_log::{ProgressSink, Severity};
