use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use wawona_capture_core::{normalize_owned, CaptureError, PixelFormat, StrideError};

// ── BufferTracker ─────────────────────────────────────────────────────────────

/// Counts pixel buffers that are currently alive.
///
/// Every [`PixelBuffer`] holds a lease on its tracker; the lease is returned
/// when the buffer is dropped or consumed by normalization.
#[derive(Debug, Clone, Default)]
pub struct BufferTracker {
    live:      Arc<AtomicUsize>,
    allocated: Arc<AtomicU64>,
}

impl BufferTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffers allocated and not yet released.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    /// Total buffers ever allocated through this tracker.
    pub fn allocated(&self) -> u64 {
        self.allocated.load(Ordering::Relaxed)
    }

    fn lease(&self) -> BufferLease {
        self.live.fetch_add(1, Ordering::AcqRel);
        self.allocated.fetch_add(1, Ordering::Relaxed);
        BufferLease { live: Arc::clone(&self.live) }
    }
}

#[derive(Debug)]
struct BufferLease {
    live: Arc<AtomicUsize>,
}

impl Drop for BufferLease {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::AcqRel);
    }
}

// ── PixelBuffer ───────────────────────────────────────────────────────────────

/// Readback target: `width × height` RGBA8888 pixels, tightly packed rows.
///
/// Owned by exactly one readback attempt.
#[derive(Debug)]
pub struct PixelBuffer {
    data:   Vec<u8>,
    width:  u32,
    height: u32,
    stride: usize,
    _lease: BufferLease,
}

impl PixelBuffer {
    /// Allocate a zeroed buffer. Allocation failure is reported, never aborted on.
    pub fn allocate(width: u32, height: u32, tracker: &BufferTracker) -> Result<Self, CaptureError> {
        let stride = PixelFormat::Rgba8888.row_bytes(width);
        let len = stride
            .checked_mul(height as usize)
            .ok_or(CaptureError::AllocationFailed { bytes: usize::MAX })?;

        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| CaptureError::AllocationFailed { bytes: len })?;
        data.resize(len, 0);

        Ok(Self { data, width, height, stride, _lease: tracker.lease() })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per row as produced by the readback.
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn format(&self) -> PixelFormat {
        PixelFormat::Rgba8888
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Mutable pixel storage for the copy primitive to write into.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Consume the buffer, re-laying its rows at `dst_stride`.
    ///
    /// The buffer's lease is released when this returns, on success or error.
    pub fn into_normalized(self, dst_stride: usize) -> Result<Bytes, StrideError> {
        let Self { data, height, stride, .. } = self;
        normalize_owned(data, stride, dst_stride, height as usize)
    }
}
