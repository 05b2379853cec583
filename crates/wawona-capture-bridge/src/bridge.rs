use std::sync::Arc;

use tracing::debug;
use wawona_capture_core::{BridgeConfig, CaptureChannel};

use crate::boundary::{CompositorBoundary, PixelCopy};
use crate::channel::ChannelPoller;
use crate::reporter::ChannelOutcome;
use crate::stats::BridgeStats;

// MARK: - PollSummary

/// Result of one [`CaptureBridge::poll_and_capture`] invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollSummary {
    /// No rendering surface: nothing was queried or reported.
    NoSurface,
    Polled {
        screencopy:         ChannelOutcome,
        image_copy_capture: ChannelOutcome,
    },
}

impl PollSummary {
    pub fn outcome(&self, channel: CaptureChannel) -> ChannelOutcome {
        match (self, channel) {
            (Self::NoSurface, _) => ChannelOutcome::Idle,
            (Self::Polled { screencopy, .. }, CaptureChannel::Screencopy) => *screencopy,
            (Self::Polled { image_copy_capture, .. }, CaptureChannel::ImageCopyCapture) => {
                *image_copy_capture
            }
        }
    }

    /// True when either channel produced a terminal report.
    pub fn reported(&self) -> bool {
        CaptureChannel::POLL_ORDER.iter().any(|&channel| {
            matches!(
                self.outcome(channel),
                ChannelOutcome::Completed { .. } | ChannelOutcome::Failed { .. }
            )
        })
    }
}

// MARK: - CaptureBridge

/// Services the screencopy and image-copy-capture channels.
///
/// The driver calls [`poll_and_capture`](Self::poll_and_capture) once per
/// opportunity (typically once per rendered frame) from the context that owns
/// the framebuffer. The call never fails: every error becomes a `failed`
/// report on the channel it happened on.
pub struct CaptureBridge<N, C> {
    native:             N,
    copy:               C,
    config:             BridgeConfig,
    screencopy:         ChannelPoller,
    image_copy_capture: ChannelPoller,
    stats:              Arc<BridgeStats>,
}

impl<N, C> CaptureBridge<N, C>
where
    N: CompositorBoundary,
    C: PixelCopy,
{
    pub fn new(native: N, copy: C, config: BridgeConfig) -> Self {
        let window = config.dedup_window;
        Self {
            native,
            copy,
            screencopy: ChannelPoller::new(CaptureChannel::Screencopy, window),
            image_copy_capture: ChannelPoller::new(CaptureChannel::ImageCopyCapture, window),
            config,
            stats: Arc::new(BridgeStats::default()),
        }
    }

    /// Poll screencopy, then image-copy-capture, resolving each pending
    /// request before moving on.
    ///
    /// `surface == None` makes the whole call a no-op with zero native calls.
    pub async fn poll_and_capture(&mut self, surface: Option<&C::Surface>) -> PollSummary {
        let Some(surface) = surface else {
            return PollSummary::NoSurface;
        };
        self.stats.record_poll();

        let Self { native, copy, config, screencopy, image_copy_capture, stats } = self;

        let mut outcomes = [ChannelOutcome::Idle; 2];
        for (slot, poller) in outcomes.iter_mut().zip([screencopy, image_copy_capture]) {
            *slot = poller.poll_once(&*native, &*copy, surface, &*config, &**stats).await;
            if *slot != ChannelOutcome::Idle {
                debug!("{} poll outcome: {:?}", poller.channel(), slot);
            }
        }

        let [screencopy, image_copy_capture] = outcomes;
        PollSummary::Polled { screencopy, image_copy_capture }
    }

    pub fn native(&self) -> &N {
        &self.native
    }

    pub fn copy(&self) -> &C {
        &self.copy
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Shared handle to the bridge counters.
    pub fn stats(&self) -> Arc<BridgeStats> {
        Arc::clone(&self.stats)
    }
}
