use thiserror::Error;

use crate::types::CopyStatus;

/// Why a capture request ended in a `failed` report.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Invalid geometry {width}×{height}")]
    InvalidGeometry { width: i32, height: i32 },

    #[error("Readback failed: {status}")]
    ReadbackFailed { status: CopyStatus },

    #[error("Readback timed out after {ms}ms")]
    ReadbackTimeout { ms: u64 },

    #[error("Rendering surface detached before readback")]
    SurfaceLost,

    #[error("Buffer of {bytes} bytes exceeds limit of {limit} bytes")]
    BufferTooLarge { bytes: u64, limit: u64 },

    #[error("Failed to allocate {bytes} bytes")]
    AllocationFailed { bytes: usize },

    #[error("Copy primitive rejected request: {reason}")]
    IssueRejected { reason: String },

    #[error("Copy primitive panicked: {reason}")]
    PrimitivePanicked { reason: String },

    #[error("Copy primitive dropped the completion callback without calling it")]
    CallbackDropped,

    #[error("Capture cancelled while readback was outstanding")]
    Cancelled,

    #[error("Stride normalization failed: {0}")]
    Stride(#[from] StrideError),
}

/// Failure taxonomy as seen across the native boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    InvalidGeometry,
    ReadbackFailure,
    UnexpectedException,
}

impl CaptureError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::InvalidGeometry { .. } => FailureKind::InvalidGeometry,
            Self::ReadbackFailed { .. } | Self::ReadbackTimeout { .. } | Self::SurfaceLost => {
                FailureKind::ReadbackFailure
            }
            Self::BufferTooLarge { .. }
            | Self::AllocationFailed { .. }
            | Self::IssueRejected { .. }
            | Self::PrimitivePanicked { .. }
            | Self::CallbackDropped
            | Self::Cancelled
            | Self::Stride(_) => FailureKind::UnexpectedException,
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum StrideError {
    #[error("Stride must be non-zero (src={src_stride}, dst={dst_stride})")]
    ZeroStride { src_stride: usize, dst_stride: usize },

    #[error("Source holds {actual} bytes, {required} needed for {height} rows")]
    SourceTooShort { actual: usize, required: usize, height: usize },

    #[error("Buffer size overflows usize ({stride} × {height})")]
    Overflow { stride: usize, height: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_map_onto_boundary_taxonomy() {
        assert_eq!(
            CaptureError::InvalidGeometry { width: 0, height: 50 }.kind(),
            FailureKind::InvalidGeometry
        );
        assert_eq!(
            CaptureError::ReadbackFailed { status: CopyStatus::SourceNoData }.kind(),
            FailureKind::ReadbackFailure
        );
        assert_eq!(
            CaptureError::PrimitivePanicked { reason: "boom".into() }.kind(),
            FailureKind::UnexpectedException
        );
        let stride: CaptureError = StrideError::Overflow { stride: 1, height: 1 }.into();
        assert_eq!(stride.kind(), FailureKind::UnexpectedException);
    }
}
