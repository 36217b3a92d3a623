use lumen_common::RenderTargetHandle;
use thiserror::Error;

/// Device-level failures. The pipeline absorbs these per light or record.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to allocate {width}x{height} depth target: {reason}")]
    TargetAllocation {
        width: u32,
        height: u32,
        reason: String,
    },
    #[error("unknown render target {0:?}")]
    UnknownTarget(RenderTargetHandle),
    #[error("invalid render target size {width}x{height}")]
    InvalidTargetSize { width: u32, height: u32 },
    #[error("invalid renderer config: {0}")]
    Config(#[from] serde_json::Error),
}
