use bytes::Bytes;
use tracing::{debug, warn};
use wawona_capture_core::{BridgeConfig, CaptureChannel, CaptureError, CaptureRequest, Geometry};

use crate::boundary::{CompositorBoundary, PixelCopy, RenderSurface};
use crate::readback::read_pixels;
use crate::reporter::{ChannelEndpoint, ChannelOutcome, ReportGuard, ReportLedger};
use crate::stats::BridgeStats;

/// Per-channel request state machine.
///
/// ```text
/// Pending ─► Validating ─┬─ invalid ──────────────────────────► Failed
///                        └─ valid ─► Capturing ─┬─ ok ─► Normalizing ─► Completed
///                                               └─ err ───────────────► Failed
/// ```
///
/// Both channels run this same machine; each instance keeps its own ledger
/// so the id-namespaces never mix.
pub(crate) struct ChannelPoller {
    channel: CaptureChannel,
    ledger:  ReportLedger,
}

impl ChannelPoller {
    pub(crate) fn new(channel: CaptureChannel, dedup_window: usize) -> Self {
        Self { channel, ledger: ReportLedger::new(dedup_window) }
    }

    pub(crate) fn channel(&self) -> CaptureChannel {
        self.channel
    }

    /// Query this channel once and drive any pending request to its terminal report.
    pub(crate) async fn poll_once<N, C>(
        &mut self,
        native: &N,
        copy: &C,
        surface: &C::Surface,
        config: &BridgeConfig,
        stats: &BridgeStats,
    ) -> ChannelOutcome
    where
        N: CompositorBoundary + ?Sized,
        C: PixelCopy + ?Sized,
    {
        let endpoint = ChannelEndpoint::new(self.channel, native);
        let Some(request) = endpoint.query().into_request(self.channel) else {
            return ChannelOutcome::Idle;
        };

        if self.ledger.contains(request.id) {
            warn!(
                "{}[{}] already reported; ignoring duplicate delivery",
                self.channel, request.id
            );
            stats.record_duplicate();
            return ChannelOutcome::Duplicate { id: request.id };
        }

        debug!(
            "{}[{}] pending {}×{} stride={}",
            self.channel, request.id, request.width, request.height, request.requested_stride
        );

        let guard = ReportGuard::new(endpoint, &mut self.ledger, stats, request.id);

        let geometry = match request.validate(config.max_buffer_bytes) {
            Ok(geometry) => geometry,
            Err(e) => return guard.fail(e),
        };

        match capture(&request, geometry, copy, surface, config, stats).await {
            Ok(pixels) => guard.complete(pixels),
            Err(e) => guard.fail(e),
        }
    }
}

/// Capturing + Normalizing for one validated request.
async fn capture<C>(
    request: &CaptureRequest,
    geometry: Geometry,
    copy: &C,
    surface: &C::Surface,
    config: &BridgeConfig,
    stats: &BridgeStats,
) -> Result<Bytes, CaptureError>
where
    C: PixelCopy + ?Sized,
{
    if !surface.is_attached() {
        return Err(CaptureError::SurfaceLost);
    }

    let buffer = read_pixels(copy, surface, geometry, stats.buffers(), config.readback_timeout()).await?;
    let src_stride = buffer.stride();
    let pixels = buffer.into_normalized(geometry.dst_stride)?;

    if src_stride != geometry.dst_stride {
        debug!(
            "{}[{}] normalized stride {} → {} ({} bytes)",
            request.channel,
            request.id,
            src_stride,
            geometry.dst_stride,
            pixels.len()
        );
    }
    Ok(pixels)
}
