//! In-memory compositor and software copy primitive.
//!
//! Stand-ins for the native side: the driver binary runs the bridge against
//! them, and the tests script failures through them.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use bytes::Bytes;
use wawona_capture_core::{CaptureChannel, CaptureError, CaptureId, CopyStatus, PendingQuery};

use crate::boundary::{CompositorBoundary, CopyCallback, PixelCopy, RenderSurface};
use crate::buffer::PixelBuffer;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ── InMemoryCompositor ────────────────────────────────────────────────────────

/// A terminal report received from the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    Complete { id: CaptureId, pixels: Bytes },
    Failed { id: CaptureId },
}

impl Report {
    pub fn id(&self) -> CaptureId {
        match self {
            Self::Complete { id, .. } | Self::Failed { id } => *id,
        }
    }
}

/// Every call the bridge made across the boundary, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeCall {
    Pending(CaptureChannel),
    Complete(CaptureChannel, CaptureId),
    Failed(CaptureChannel, CaptureId),
}

#[derive(Debug, Default)]
struct ChannelQueue {
    pending: VecDeque<PendingQuery>,
    reports: Vec<Report>,
    next_id: u64,
}

#[derive(Debug, Default)]
struct CompositorInner {
    screencopy:         ChannelQueue,
    image_copy_capture: ChannelQueue,
    calls:              Vec<NativeCall>,
}

impl CompositorInner {
    fn queue(&mut self, channel: CaptureChannel) -> &mut ChannelQueue {
        match channel {
            CaptureChannel::Screencopy => &mut self.screencopy,
            CaptureChannel::ImageCopyCapture => &mut self.image_copy_capture,
        }
    }
}

/// Native side backed by one FIFO of pending requests per channel.
///
/// The front of a channel's queue is what the next query returns. A report
/// removes the matching request, unless `retain_reported` is set, in which
/// case the request stays queued and is delivered again.
#[derive(Debug, Default)]
pub struct InMemoryCompositor {
    inner:           Mutex<CompositorInner>,
    retain_reported: AtomicBool,
}

impl InMemoryCompositor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep reported requests queued, so the same id is delivered again.
    pub fn retain_reported(&self, retain: bool) {
        self.retain_reported.store(retain, Ordering::Relaxed);
    }

    /// Queue a request with the next id of `channel`'s namespace.
    pub fn request(&self, channel: CaptureChannel, width: i32, height: i32, stride: i32) -> CaptureId {
        let mut inner = lock(&self.inner);
        let queue = inner.queue(channel);
        queue.next_id += 1;
        let id = queue.next_id;
        queue.pending.push_back(PendingQuery::new(id, width, height, stride));
        CaptureId(id)
    }

    /// Queue a raw query verbatim, id included.
    pub fn push_raw(&self, channel: CaptureChannel, query: PendingQuery) {
        lock(&self.inner).queue(channel).pending.push_back(query);
    }

    pub fn pending_len(&self, channel: CaptureChannel) -> usize {
        lock(&self.inner).queue(channel).pending.len()
    }

    pub fn reports(&self, channel: CaptureChannel) -> Vec<Report> {
        lock(&self.inner).queue(channel).reports.clone()
    }

    pub fn calls(&self) -> Vec<NativeCall> {
        lock(&self.inner).calls.clone()
    }

    pub fn clear_calls(&self) {
        lock(&self.inner).calls.clear();
    }

    fn pending(&self, channel: CaptureChannel) -> PendingQuery {
        let mut inner = lock(&self.inner);
        inner.calls.push(NativeCall::Pending(channel));
        inner.queue(channel).pending.front().copied().unwrap_or(PendingQuery::IDLE)
    }

    fn report(&self, channel: CaptureChannel, report: Report) {
        let retain = self.retain_reported.load(Ordering::Relaxed);
        let mut inner = lock(&self.inner);
        let id = report.id();
        inner.calls.push(match report {
            Report::Complete { .. } => NativeCall::Complete(channel, id),
            Report::Failed { .. } => NativeCall::Failed(channel, id),
        });
        let queue = inner.queue(channel);
        if !retain {
            queue.pending.retain(|query| query.capture_id != id.0);
        }
        queue.reports.push(report);
    }
}

impl CompositorBoundary for InMemoryCompositor {
    fn pending_screencopy(&self) -> PendingQuery {
        self.pending(CaptureChannel::Screencopy)
    }

    fn pending_image_copy_capture(&self) -> PendingQuery {
        self.pending(CaptureChannel::ImageCopyCapture)
    }

    fn screencopy_complete(&self, id: CaptureId, pixels: Bytes) {
        self.report(CaptureChannel::Screencopy, Report::Complete { id, pixels });
    }

    fn screencopy_failed(&self, id: CaptureId) {
        self.report(CaptureChannel::Screencopy, Report::Failed { id });
    }

    fn image_copy_capture_complete(&self, id: CaptureId, pixels: Bytes) {
        self.report(CaptureChannel::ImageCopyCapture, Report::Complete { id, pixels });
    }

    fn image_copy_capture_failed(&self, id: CaptureId) {
        self.report(CaptureChannel::ImageCopyCapture, Report::Failed { id });
    }
}

// ── SimSurface ────────────────────────────────────────────────────────────────

/// Rendering surface that can be detached at any time.
#[derive(Debug)]
pub struct SimSurface {
    attached: AtomicBool,
}

impl SimSurface {
    pub fn new() -> Self {
        Self { attached: AtomicBool::new(true) }
    }

    pub fn detach(&self) {
        self.attached.store(false, Ordering::Release);
    }
}

impl Default for SimSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderSurface for SimSurface {
    fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }
}

// ── SoftwareCopy ──────────────────────────────────────────────────────────────

/// What [`SoftwareCopy`] does with the next issued copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyBehavior {
    /// Fill the target and complete with this status.
    Complete(CopyStatus),
    /// Return an error from `issue`.
    Reject,
    /// Panic inside `issue`.
    Panic,
    /// Accept the copy, then drop the callback without calling it.
    DropCallback,
    /// Hold the copy until [`SoftwareCopy::fire_stalled`].
    Stall,
}

/// Copy primitive that paints a deterministic pattern.
///
/// Completions are delivered from a spawned tokio task, never inline, so
/// callers see the same asynchrony as a real compositor readback. Scripted
/// behaviors are consumed one per `issue`; with an empty script every copy
/// succeeds.
#[derive(Default)]
pub struct SoftwareCopy {
    delay:   Option<Duration>,
    script:  Mutex<VecDeque<CopyBehavior>>,
    stalled: Mutex<Vec<(CopyCallback, PixelBuffer)>>,
    issued:  AtomicUsize,
}

impl SoftwareCopy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every completion by `delay`.
    pub fn with_delay(delay: Duration) -> Self {
        Self { delay: Some(delay), ..Self::default() }
    }

    pub fn push_behavior(&self, behavior: CopyBehavior) {
        lock(&self.script).push_back(behavior);
    }

    /// Copies issued so far, whatever their outcome.
    pub fn issued(&self) -> usize {
        self.issued.load(Ordering::Relaxed)
    }

    /// Complete every stalled copy with `status`. Returns how many fired.
    pub fn fire_stalled(&self, status: CopyStatus) -> usize {
        let stalled = std::mem::take(&mut *lock(&self.stalled));
        let fired = stalled.len();
        for (on_complete, buffer) in stalled {
            on_complete(status, buffer);
        }
        fired
    }

    /// Pattern value of pixel `(x, y)`, RGBA.
    pub fn pixel(x: u32, y: u32) -> [u8; 4] {
        [x as u8, y as u8, (x ^ y) as u8, 0xFF]
    }

    fn paint(target: &mut PixelBuffer) {
        let width = target.width();
        let stride = target.stride();
        for (y, row) in target.as_mut_slice().chunks_exact_mut(stride).enumerate() {
            for (x, px) in row.chunks_exact_mut(4).take(width as usize).enumerate() {
                px.copy_from_slice(&Self::pixel(x as u32, y as u32));
            }
        }
    }
}

impl PixelCopy for SoftwareCopy {
    type Surface = SimSurface;

    fn issue(
        &self,
        _surface: &SimSurface,
        mut target: PixelBuffer,
        on_complete: CopyCallback,
    ) -> Result<(), CaptureError> {
        self.issued.fetch_add(1, Ordering::Relaxed);
        let behavior = lock(&self.script)
            .pop_front()
            .unwrap_or(CopyBehavior::Complete(CopyStatus::Success));

        match behavior {
            CopyBehavior::Complete(status) => {
                if status.is_success() {
                    Self::paint(&mut target);
                }
                let delay = self.delay;
                tokio::spawn(async move {
                    match delay {
                        Some(delay) => tokio::time::sleep(delay).await,
                        None => tokio::task::yield_now().await,
                    }
                    on_complete(status, target);
                });
                Ok(())
            }
            CopyBehavior::Reject => Err(CaptureError::IssueRejected {
                reason: "scripted rejection".into(),
            }),
            CopyBehavior::Panic => panic!("scripted copy panic"),
            CopyBehavior::DropCallback => {
                tokio::spawn(async move {
                    tokio::task::yield_now().await;
                    drop(target);
                    drop(on_complete);
                });
                Ok(())
            }
            CopyBehavior::Stall => {
                lock(&self.stalled).push((on_complete, target));
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queries_return_front_until_reported() {
        let native = InMemoryCompositor::new();
        let first = native.request(CaptureChannel::Screencopy, 10, 10, 0);
        let second = native.request(CaptureChannel::Screencopy, 20, 20, 0);
        assert_eq!((first, second), (CaptureId(1), CaptureId(2)));

        assert_eq!(native.pending_screencopy().capture_id, 1);
        assert_eq!(native.pending_screencopy().capture_id, 1);
        native.screencopy_failed(first);
        assert_eq!(native.pending_screencopy().capture_id, 2);
        assert_eq!(native.pending_image_copy_capture(), PendingQuery::IDLE);
    }

    #[test]
    fn channels_have_separate_id_namespaces() {
        let native = InMemoryCompositor::new();
        let a = native.request(CaptureChannel::Screencopy, 1, 1, 0);
        let b = native.request(CaptureChannel::ImageCopyCapture, 1, 1, 0);
        assert_eq!(a, b);
        native.image_copy_capture_failed(b);
        assert_eq!(native.pending_len(CaptureChannel::Screencopy), 1);
        assert_eq!(native.pending_len(CaptureChannel::ImageCopyCapture), 0);
    }

    #[test]
    fn retained_requests_are_redelivered() {
        let native = InMemoryCompositor::new();
        native.retain_reported(true);
        let id = native.request(CaptureChannel::ImageCopyCapture, 4, 4, 0);
        native.image_copy_capture_failed(id);
        assert_eq!(native.pending_image_copy_capture().capture_id, id.0);
    }

    #[test]
    fn detached_surface_reports_it() {
        let surface = SimSurface::new();
        assert!(surface.is_attached());
        surface.detach();
        assert!(!surface.is_attached());
    }
}
