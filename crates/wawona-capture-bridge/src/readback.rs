//! Pixel readback: turns the callback-driven copy primitive into one awaited
//! result.
//!
//! # Suspension model
//!
//! ```text
//! allocate PixelBuffer ──► PixelCopy::issue(surface, buffer, on_complete)
//!                                   │
//!                     (copy runs on the primitive's side)
//!                                   │
//!            on_complete(status, buffer) ──► oneshot::Sender
//!                                                 │
//!                       read_pixels().await ◄─────┘
//! ```
//!
//! The awaiting task yields instead of blocking, so the thread that owns the
//! framebuffer keeps rendering while the copy is in flight. If the awaiting
//! future is dropped (cancellation or timeout) the receiver goes with it, and
//! a late `on_complete` finds the slot closed: it drops the buffer and returns.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::debug;
use wawona_capture_core::{CaptureError, CopyStatus, Geometry};

use crate::boundary::{CopyCallback, PixelCopy};
use crate::buffer::{BufferTracker, PixelBuffer};

/// Read back `geometry` from `surface` and return the filled buffer.
///
/// A non-success status, a rejected or panicking `issue`, a dropped callback
/// and an elapsed `timeout` all come back as `Err`. The buffer never outlives
/// this call except inside a still-pending primitive after cancellation.
pub async fn read_pixels<C>(
    copy: &C,
    surface: &C::Surface,
    geometry: Geometry,
    tracker: &BufferTracker,
    timeout: Option<Duration>,
) -> Result<PixelBuffer, CaptureError>
where
    C: PixelCopy + ?Sized,
{
    let target = PixelBuffer::allocate(geometry.width, geometry.height, tracker)?;
    let (slot_tx, slot_rx) = oneshot::channel::<(CopyStatus, PixelBuffer)>();

    let on_complete: CopyCallback = Box::new(move |status, buffer| {
        if let Err((status, _buffer)) = slot_tx.send((status, buffer)) {
            debug!("Late readback completion ({}) ignored, waiter is gone", status);
        }
    });

    match panic::catch_unwind(AssertUnwindSafe(|| copy.issue(surface, target, on_complete))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(e),
        Err(payload) => {
            return Err(CaptureError::PrimitivePanicked { reason: panic_message(payload.as_ref()) })
        }
    }

    let completion = match timeout {
        Some(limit) => tokio::time::timeout(limit, slot_rx)
            .await
            .map_err(|_| CaptureError::ReadbackTimeout { ms: limit.as_millis() as u64 })?,
        None => slot_rx.await,
    };
    let (status, buffer) = completion.map_err(|_| CaptureError::CallbackDropped)?;

    if !status.is_success() {
        return Err(CaptureError::ReadbackFailed { status });
    }
    Ok(buffer)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{CopyBehavior, SimSurface, SoftwareCopy};

    fn geometry(width: u32, height: u32) -> Geometry {
        Geometry { width, height, dst_stride: width as usize * 4 }
    }

    #[tokio::test]
    async fn successful_copy_returns_filled_buffer() {
        let copy = SoftwareCopy::new();
        let surface = SimSurface::new();
        let tracker = BufferTracker::new();

        let buffer = read_pixels(&copy, &surface, geometry(4, 3), &tracker, None).await.unwrap();
        assert_eq!(buffer.width(), 4);
        assert_eq!(buffer.as_slice().len(), 48);
        assert_eq!(&buffer.as_slice()[..4], &SoftwareCopy::pixel(0, 0));
        assert_eq!(tracker.live(), 1);
        drop(buffer);
        assert_eq!(tracker.live(), 0);
    }

    #[tokio::test]
    async fn failure_status_releases_buffer() {
        let copy = SoftwareCopy::new();
        copy.push_behavior(CopyBehavior::Complete(CopyStatus::SourceNoData));
        let tracker = BufferTracker::new();

        let err = read_pixels(&copy, &SimSurface::new(), geometry(2, 2), &tracker, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::ReadbackFailed { status: CopyStatus::SourceNoData }));
        assert_eq!(tracker.live(), 0);
    }

    #[tokio::test]
    async fn panicking_primitive_becomes_error() {
        let copy = SoftwareCopy::new();
        copy.push_behavior(CopyBehavior::Panic);
        let tracker = BufferTracker::new();

        let err = read_pixels(&copy, &SimSurface::new(), geometry(2, 2), &tracker, None)
            .await
            .unwrap_err();
        match err {
            CaptureError::PrimitivePanicked { reason } => assert!(reason.contains("scripted")),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(tracker.live(), 0);
    }

    #[tokio::test]
    async fn dropped_callback_is_reported() {
        let copy = SoftwareCopy::new();
        copy.push_behavior(CopyBehavior::DropCallback);
        let tracker = BufferTracker::new();

        let err = read_pixels(&copy, &SimSurface::new(), geometry(2, 2), &tracker, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::CallbackDropped));
        assert_eq!(tracker.live(), 0);
    }

    #[tokio::test]
    async fn timeout_leaves_late_callback_harmless() {
        let copy = SoftwareCopy::new();
        copy.push_behavior(CopyBehavior::Stall);
        let tracker = BufferTracker::new();

        let err = read_pixels(
            &copy,
            &SimSurface::new(),
            geometry(2, 2),
            &tracker,
            Some(Duration::from_millis(10)),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CaptureError::ReadbackTimeout { ms: 10 }));

        // The stalled copy still owns its target until it fires.
        assert_eq!(tracker.live(), 1);
        assert_eq!(copy.fire_stalled(CopyStatus::Success), 1);
        assert_eq!(tracker.live(), 0);
    }
}
