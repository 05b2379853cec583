//! wawona-capture-bridge: services remote capture requests from the compositor.
//!
//! # Channels
//!
//! | Channel | Protocol | Id-namespace |
//! |---------|----------|--------------|
//! | Screencopy | `zwlr_screencopy_manager_v1` (full output) | own |
//! | ImageCopyCapture | `ext_image_copy_capture_manager_v1` (per surface) | own |
//!
//! # Usage
//!
//! ```rust,no_run
//! # async fn example() {
//! use std::sync::Arc;
//! use wawona_capture_bridge::sim::{InMemoryCompositor, SimSurface, SoftwareCopy};
//! use wawona_capture_bridge::CaptureBridge;
//! use wawona_capture_core::BridgeConfig;
//!
//! let native = Arc::new(InMemoryCompositor::new());
//! let mut bridge = CaptureBridge::new(native, SoftwareCopy::new(), BridgeConfig::default());
//! let surface = SimSurface::new();
//! // Once per rendered frame:
//! let summary = bridge.poll_and_capture(Some(&surface)).await;
//! # let _ = summary;
//! # }
//! ```
//!
//! # Architecture
//!
//! ```text
//! driver tick ──► CaptureBridge::poll_and_capture(surface)
//!                      │
//!        ┌─────────────┴──────────────┐   (sequential, fixed order)
//!        ▼                            ▼
//!   ChannelPoller(Screencopy)   ChannelPoller(ImageCopyCapture)
//!        │ query → validate → read_pixels → normalize
//!        ▼
//!   ReportGuard ──► complete(id, bytes) | failed(id)   (exactly once)
//! ```

pub mod boundary;
pub mod bridge;
pub mod buffer;
mod channel;
pub mod readback;
pub mod reporter;
pub mod sim;
pub mod stats;

pub use boundary::{CompositorBoundary, CopyCallback, PixelCopy, RenderSurface};
pub use bridge::{CaptureBridge, PollSummary};
pub use buffer::{BufferTracker, PixelBuffer};
pub use reporter::{ChannelOutcome, ReportLedger};
pub use stats::{BridgeStats, StatsSnapshot};
