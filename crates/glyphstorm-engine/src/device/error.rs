use glyphstorm_sim::SimError;

/// High-level response after a surface error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was reconfigured; rendering may resume next frame.
    Reconfigured,
    /// Transient error; skip the current frame.
    SkipFrame,
    /// Fatal error (commonly OOM); terminate gracefully.
    Fatal,
}

/// Returns true when `err` (or anything in its chain) reports a missing GPU capability.
pub fn is_runtime_unavailable(err: &anyhow::Error) -> bool {
    err.chain().any(|e| {
        matches!(e.downcast_ref::<SimError>(), Some(SimError::RuntimeUnavailable(_)))
    })
}
