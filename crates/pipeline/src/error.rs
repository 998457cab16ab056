use thiserror::Error;

/// Why a frame produced no objects.
///
/// The first two variants are recoverable: the caller keeps the pipeline
/// alive and feeds it the next frame. `Persist` means an emitted object
/// could not be written to disk and usually warrants shutting down.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("table plane rejected: {found} inliers, need more than {required}")]
    InsufficientTableInliers { found: usize, required: usize },

    #[error("found {found} clusters on the table, need {required}")]
    InsufficientClusters { found: usize, required: usize },

    #[error("failed to persist object cloud")]
    Persist(#[from] std::io::Error),
}

impl FrameError {
    /// Whether the caller can retry with the next frame.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, FrameError::Persist(_))
    }
}
