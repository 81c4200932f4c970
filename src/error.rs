use thiserror::Error;

/// Engine-level failures. Per-item rejections and ordinary exhaustion are
/// classified outcomes (`RejectReason`, `LoadOutcome::Exhausted`), not
/// errors; only page-level conditions land here.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("source {source} timed out after {timeout_ms}ms")]
    SourceTimeout { source: String, timeout_ms: u64 },

    #[error("source {source} failed: {message}")]
    SourceError { source: String, message: String },

    /// Every attempted source failed this cycle. Retryable.
    #[error("no source produced a page; retry available")]
    PageUnavailable,

    /// The stuck-load watchdog fired and reset the controller. Recoverable.
    #[error("load exceeded the watchdog ceiling after {elapsed_ms}ms and was reset")]
    LoadStuck { elapsed_ms: u64 },
}
