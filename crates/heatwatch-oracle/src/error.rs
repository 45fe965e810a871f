//! Error types for risk oracle calls.
//!
//! The simulation loop treats every variant identically -- one failed
//! tick counted against the error budgets -- so the taxonomy here exists
//! for logs and operator diagnosis, not for control flow.

/// A failed risk oracle call.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    /// The HTTP client could not be constructed.
    #[error("oracle client init failed: {message}")]
    Init {
        /// Description of the initialization failure.
        message: String,
    },

    /// The request did not complete (connection refused, DNS, etc.).
    #[error("oracle request failed: {message}")]
    Request {
        /// Description of the transport failure.
        message: String,
    },

    /// The request exceeded the configured timeout budget.
    #[error("oracle call timed out after {timeout_ms}ms")]
    Timeout {
        /// The configured timeout in milliseconds.
        timeout_ms: u64,
    },

    /// The service answered with a non-success status.
    #[error("oracle returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, as far as it could be read.
        body: String,
    },

    /// The response body was not a valid assessment payload.
    #[error("oracle response parse failed: {message}")]
    Parse {
        /// Description of the parse failure.
        message: String,
    },

    /// The response parsed but carried out-of-range values.
    #[error("oracle response invalid: {message}")]
    InvalidResponse {
        /// Which contract constraint was violated.
        message: String,
    },

    /// A scripted backend was told to fail, or ran out of script.
    #[error("scripted oracle failure: {message}")]
    Scripted {
        /// The scripted failure message.
        message: String,
    },
}
