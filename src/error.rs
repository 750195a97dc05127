use thiserror::Error;

/// Result alias for the narrow, non-hot-path fallible operations this crate exposes.
///
/// `record_method_call` itself never returns a `Result` — every hot-path
/// anomaly (resource saturation, a malformed signature, a full queue)
/// degrades gracefully instead. This type only appears at construction and
/// configuration boundaries.
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Errors surfaced outside the hot path: configuration validation and
/// singleton initialization.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The global singleton was already constructed by a prior `init_global` call.
    #[error("tracker already initialized")]
    AlreadyInitialized,
    /// A `TrackerConfig` failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
