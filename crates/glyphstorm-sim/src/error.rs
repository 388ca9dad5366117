use thiserror::Error;

/// Errors reported by the particle core.
///
/// Every failure is returned to the caller; nothing is retried internally.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// Invalid grid side, atlas dimensions, charset or force parameters.
    ///
    /// Raised before any state is allocated.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A required compute or render capability is missing on this host.
    #[error("runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    /// `step`, `render` or `reset` was called before `initialize`.
    #[error("particle core is not initialized")]
    NotInitialized,

    /// Tick input could not be applied (non-finite cursor or time).
    #[error("invalid tick input: {0}")]
    InvalidInput(String),
}

impl SimError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, SimError>;
