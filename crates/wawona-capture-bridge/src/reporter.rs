//! Terminal reporting: exactly one `complete` or `failed` per capture id.

use std::collections::{HashSet, VecDeque};

use bytes::Bytes;
use tracing::{error, info, warn};
use wawona_capture_core::{CaptureChannel, CaptureError, CaptureId, FailureKind, PendingQuery};

use crate::boundary::CompositorBoundary;
use crate::stats::BridgeStats;

// ── ChannelEndpoint ───────────────────────────────────────────────────────────

/// The native entry points belonging to one channel.
///
/// Routing happens only here, so a channel can never reach the other
/// channel's query or report calls.
pub(crate) struct ChannelEndpoint<'a, N: ?Sized> {
    channel: CaptureChannel,
    native:  &'a N,
}

impl<'a, N: CompositorBoundary + ?Sized> ChannelEndpoint<'a, N> {
    pub(crate) fn new(channel: CaptureChannel, native: &'a N) -> Self {
        Self { channel, native }
    }

    pub(crate) fn query(&self) -> PendingQuery {
        match self.channel {
            CaptureChannel::Screencopy => self.native.pending_screencopy(),
            CaptureChannel::ImageCopyCapture => self.native.pending_image_copy_capture(),
        }
    }

    fn complete(&self, id: CaptureId, pixels: Bytes) {
        match self.channel {
            CaptureChannel::Screencopy => self.native.screencopy_complete(id, pixels),
            CaptureChannel::ImageCopyCapture => self.native.image_copy_capture_complete(id, pixels),
        }
    }

    fn failed(&self, id: CaptureId) {
        match self.channel {
            CaptureChannel::Screencopy => self.native.screencopy_failed(id),
            CaptureChannel::ImageCopyCapture => self.native.image_copy_capture_failed(id),
        }
    }
}

// ── ReportLedger ──────────────────────────────────────────────────────────────

/// Bounded memory of ids a channel has already reported.
#[derive(Debug)]
pub struct ReportLedger {
    window: usize,
    order:  VecDeque<CaptureId>,
    seen:   HashSet<CaptureId>,
}

impl ReportLedger {
    /// A window of 0 is raised to 1: the most recent report is always remembered.
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            order: VecDeque::with_capacity(window),
            seen:  HashSet::with_capacity(window),
        }
    }

    pub fn contains(&self, id: CaptureId) -> bool {
        self.seen.contains(&id)
    }

    pub fn record(&mut self, id: CaptureId) {
        if !self.seen.insert(id) {
            return;
        }
        self.order.push_back(id);
        while self.order.len() > self.window {
            if let Some(evicted) = self.order.pop_front() {
                self.seen.remove(&evicted);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

// ── ChannelOutcome ────────────────────────────────────────────────────────────

/// What one channel did during one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOutcome {
    /// Nothing pending, or the poll never reached this channel.
    Idle,
    /// The id was already reported; nothing was sent.
    Duplicate { id: CaptureId },
    Completed { id: CaptureId, bytes: usize },
    Failed { id: CaptureId, kind: FailureKind },
}

impl ChannelOutcome {
    pub fn capture_id(&self) -> Option<CaptureId> {
        match self {
            Self::Idle => None,
            Self::Duplicate { id } | Self::Completed { id, .. } | Self::Failed { id, .. } => Some(*id),
        }
    }
}

// ── ReportGuard ───────────────────────────────────────────────────────────────

/// Owns the single terminal report for one recognized request.
///
/// Resolving consumes the guard. A guard dropped unresolved (the poll future
/// was cancelled mid-readback) sends `failed` from its destructor.
pub(crate) struct ReportGuard<'a, N: CompositorBoundary + ?Sized> {
    endpoint: ChannelEndpoint<'a, N>,
    ledger:   &'a mut ReportLedger,
    stats:    &'a BridgeStats,
    id:       CaptureId,
    resolved: bool,
}

impl<'a, N: CompositorBoundary + ?Sized> ReportGuard<'a, N> {
    pub(crate) fn new(
        endpoint: ChannelEndpoint<'a, N>,
        ledger: &'a mut ReportLedger,
        stats: &'a BridgeStats,
        id: CaptureId,
    ) -> Self {
        Self { endpoint, ledger, stats, id, resolved: false }
    }

    pub(crate) fn complete(mut self, pixels: Bytes) -> ChannelOutcome {
        self.resolved = true;
        let bytes = pixels.len();
        self.ledger.record(self.id);
        self.endpoint.complete(self.id, pixels);
        self.stats.record_completed();
        info!("{}[{}] capture complete ({} bytes)", self.endpoint.channel, self.id, bytes);
        ChannelOutcome::Completed { id: self.id, bytes }
    }

    pub(crate) fn fail(mut self, err: CaptureError) -> ChannelOutcome {
        let kind = err.kind();
        match kind {
            FailureKind::UnexpectedException => {
                error!("{}[{}] capture failed unexpectedly: {}", self.endpoint.channel, self.id, err)
            }
            _ => warn!("{}[{}] capture failed: {}", self.endpoint.channel, self.id, err),
        }
        self.send_failed();
        ChannelOutcome::Failed { id: self.id, kind }
    }

    fn send_failed(&mut self) {
        self.resolved = true;
        self.ledger.record(self.id);
        self.endpoint.failed(self.id);
        self.stats.record_failed();
    }
}

impl<N: CompositorBoundary + ?Sized> Drop for ReportGuard<'_, N> {
    fn drop(&mut self) {
        if self.resolved {
            return;
        }
        warn!(
            "{}[{}] capture abandoned mid-readback: {}",
            self.endpoint.channel,
            self.id,
            CaptureError::Cancelled
        );
        self.send_failed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{InMemoryCompositor, NativeCall, Report};

    #[test]
    fn ledger_evicts_oldest_ids() {
        let mut ledger = ReportLedger::new(2);
        ledger.record(CaptureId(1));
        ledger.record(CaptureId(2));
        ledger.record(CaptureId(2));
        assert_eq!(ledger.len(), 2);

        ledger.record(CaptureId(3));
        assert!(!ledger.contains(CaptureId(1)));
        assert!(ledger.contains(CaptureId(2)));
        assert!(ledger.contains(CaptureId(3)));
    }

    #[test]
    fn zero_window_still_remembers_last_report() {
        let mut ledger = ReportLedger::new(0);
        assert!(ledger.is_empty());
        ledger.record(CaptureId(9));
        assert!(ledger.contains(CaptureId(9)));
    }

    #[test]
    fn endpoints_route_to_their_own_channel() {
        let native = InMemoryCompositor::new();
        ChannelEndpoint::new(CaptureChannel::ImageCopyCapture, &native).failed(CaptureId(4));
        ChannelEndpoint::new(CaptureChannel::Screencopy, &native)
            .complete(CaptureId(4), Bytes::from_static(b"abcd"));

        assert_eq!(
            native.calls(),
            vec![
                NativeCall::Failed(CaptureChannel::ImageCopyCapture, CaptureId(4)),
                NativeCall::Complete(CaptureChannel::Screencopy, CaptureId(4)),
            ]
        );
    }

    #[test]
    fn dropped_guard_reports_failure_once() {
        let native = InMemoryCompositor::new();
        let stats = BridgeStats::default();
        let mut ledger = ReportLedger::new(4);

        {
            let endpoint = ChannelEndpoint::new(CaptureChannel::Screencopy, &native);
            let _guard = ReportGuard::new(endpoint, &mut ledger, &stats, CaptureId(11));
        }

        assert!(ledger.contains(CaptureId(11)));
        assert_eq!(native.reports(CaptureChannel::Screencopy), vec![Report::Failed { id: CaptureId(11) }]);
        assert_eq!(stats.snapshot().failed, 1);
    }

    #[test]
    fn resolved_guard_does_not_report_again_on_drop() {
        let native = InMemoryCompositor::new();
        let stats = BridgeStats::default();
        let mut ledger = ReportLedger::new(4);

        let endpoint = ChannelEndpoint::new(CaptureChannel::ImageCopyCapture, &native);
        let outcome = ReportGuard::new(endpoint, &mut ledger, &stats, CaptureId(5))
            .complete(Bytes::from_static(&[1, 2, 3, 4]));

        assert_eq!(outcome, ChannelOutcome::Completed { id: CaptureId(5), bytes: 4 });
        assert_eq!(native.reports(CaptureChannel::ImageCopyCapture).len(), 1);
        let snapshot = stats.snapshot();
        assert_eq!((snapshot.completed, snapshot.failed), (1, 0));
    }
}
