//! Error types for the simulation engine.

/// Errors surfaced by engine operations.
///
/// Per-tick failures never appear here -- they are absorbed inside the
/// tick handler and translated into stop causes. This enum covers the
/// operations a caller invokes directly.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The subject could not be resolved by id or name.
    #[error("worker not found: {identity}")]
    WorkerNotFound {
        /// The id or name that failed to resolve.
        identity: String,
    },
}
