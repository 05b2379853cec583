use std::sync::Arc;

use bytes::Bytes;
use wawona_capture_core::{CaptureError, CaptureId, CopyStatus, PendingQuery};

use crate::buffer::PixelBuffer;

// MARK: - CompositorBoundary

/// Native compositor side of the capture protocol.
///
/// Every method is a synchronous call across the boundary. The two channels
/// have separate query and report entry points and separate id-namespaces.
pub trait CompositorBoundary {
    /// Pending full-output capture, or [`PendingQuery::IDLE`].
    fn pending_screencopy(&self) -> PendingQuery;

    /// Pending per-surface capture, or [`PendingQuery::IDLE`].
    fn pending_image_copy_capture(&self) -> PendingQuery;

    fn screencopy_complete(&self, id: CaptureId, pixels: Bytes);

    fn screencopy_failed(&self, id: CaptureId);

    fn image_copy_capture_complete(&self, id: CaptureId, pixels: Bytes);

    fn image_copy_capture_failed(&self, id: CaptureId);
}

impl<T: CompositorBoundary + ?Sized> CompositorBoundary for Arc<T> {
    fn pending_screencopy(&self) -> PendingQuery {
        (**self).pending_screencopy()
    }
    fn pending_image_copy_capture(&self) -> PendingQuery {
        (**self).pending_image_copy_capture()
    }
    fn screencopy_complete(&self, id: CaptureId, pixels: Bytes) {
        (**self).screencopy_complete(id, pixels)
    }
    fn screencopy_failed(&self, id: CaptureId) {
        (**self).screencopy_failed(id)
    }
    fn image_copy_capture_complete(&self, id: CaptureId, pixels: Bytes) {
        (**self).image_copy_capture_complete(id, pixels)
    }
    fn image_copy_capture_failed(&self, id: CaptureId) {
        (**self).image_copy_capture_failed(id)
    }
}

// MARK: - RenderSurface

/// Live rendering surface a readback is taken from.
pub trait RenderSurface {
    /// Whether the surface still backs a live framebuffer.
    fn is_attached(&self) -> bool {
        true
    }
}

// MARK: - PixelCopy

/// Completion slot handed to [`PixelCopy::issue`]. Called at most once, from
/// any thread, with the copy status and the target buffer.
pub type CopyCallback = Box<dyn FnOnce(CopyStatus, PixelBuffer) + Send + 'static>;

/// Asynchronous pixel-copy primitive.
///
/// `issue` must return promptly; the copy itself completes later through
/// `on_complete`. Returning `Err` (or panicking) means `on_complete` will
/// never be called.
pub trait PixelCopy {
    type Surface: RenderSurface;

    fn issue(
        &self,
        surface: &Self::Surface,
        target: PixelBuffer,
        on_complete: CopyCallback,
    ) -> Result<(), CaptureError>;
}

impl<T: PixelCopy + ?Sized> PixelCopy for Arc<T> {
    type Surface = T::Surface;

    fn issue(
        &self,
        surface: &Self::Surface,
        target: PixelBuffer,
        on_complete: CopyCallback,
    ) -> Result<(), CaptureError> {
        (**self).issue(surface, target, on_complete)
    }
}
