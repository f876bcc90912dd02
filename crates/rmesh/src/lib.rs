//! Quadric-error-metric triangle mesh simplification, plus the minimal
//! mesh container, attribute storage, and file-format plumbing it sits on.

pub mod attributes;
pub mod creation;
pub mod error;
pub mod exchange;
pub mod mesh;
pub mod simplify;

pub use error::{Error, Result};
pub use mesh::Trimesh;
