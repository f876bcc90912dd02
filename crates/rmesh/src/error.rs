use thiserror::Error;

/// Errors produced by the `rmesh` mesh container and simplification engine.
///
/// Validation errors never leave the engine or mesh in a partially mutated
/// state: a call either completes fully or the prior state is untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A caller-supplied argument was malformed, e.g. an index stream whose
    /// length isn't a multiple of 3, or a negative target triangle count.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An index referenced a vertex (or sub-mesh) that doesn't exist.
    #[error("index {index} out of range (bound {bound})")]
    IndexOutOfRange { index: usize, bound: usize },

    /// A supplied attribute array's length didn't match the vertex count.
    #[error("attribute `{attribute}` has length {actual}, expected {expected}")]
    AttributeLengthMismatch {
        attribute: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The requested decimation algorithm selector isn't recognized.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// An internal invariant was violated. Not expected on any supported
    /// input; indicates a bug in the engine rather than bad caller data.
    #[error("internal invariant violated: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
