//! Error types for CMAC operations.

use thiserror::Error;

/// Errors surfaced by CMAC construction and use.
///
/// All of these are programmer-usage errors reported synchronously; nothing
/// is retried internally and no partial results are returned alongside them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CmacError {
    /// The requested cipher name does not map to a supported 128-bit-block family.
    #[error("unsupported cipher algorithm ({name})")]
    UnsupportedCipher {
        /// The name as requested by the caller.
        name: String,
    },

    /// `update` or `digest` was called before any key was established.
    #[error("no key is set")]
    NoKeySet,

    /// The requested digest length falls outside `1..=16`.
    #[error("invalid digest length: {actual} (must be between 1 and 16)")]
    InvalidLength {
        /// The length as requested by the caller.
        actual: usize,
    },
}

/// Result type alias for CMAC operations.
pub type Result<T> = std::result::Result<T, CmacError>;
