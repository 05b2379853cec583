use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};
use wawona_capture_bridge::sim::{InMemoryCompositor, SimSurface, SoftwareCopy};
use wawona_capture_bridge::CaptureBridge;
use wawona_capture_core::{BridgeConfig, CaptureChannel};

/// Driver settings read from the environment.
///
/// - `WAWONA_CAPTURE_FPS`: ticks per second (default 60, clamped to 1..=240)
/// - `WAWONA_CAPTURE_FRAMES`: stop after this many ticks (default 0 = until Ctrl-C)
/// - `WAWONA_CAPTURE_CONFIG`: path to a JSON [`BridgeConfig`]
#[derive(Debug, Clone, PartialEq)]
struct DriverSettings {
    fps:         u32,
    frames:      u64,
    config_path: Option<String>,
}

impl DriverSettings {
    fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let fps = lookup("WAWONA_CAPTURE_FPS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(60u32)
            .clamp(1, 240);
        let frames = lookup("WAWONA_CAPTURE_FRAMES")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let config_path = lookup("WAWONA_CAPTURE_CONFIG").filter(|p| !p.is_empty());
        Self { fps, frames, config_path }
    }

    fn frame_interval(&self) -> Duration {
        Duration::from_micros(1_000_000 / self.fps as u64)
    }

    fn load_config(&self) -> Result<BridgeConfig> {
        let Some(path) = &self.config_path else {
            return Ok(BridgeConfig::default());
        };
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Reading bridge config {path}"))?;
        BridgeConfig::from_json(&json).with_context(|| format!("Parsing bridge config {path}"))
    }
}

/// Per-frame driver loop against the in-memory compositor.
///
/// # Flow (per tick)
/// 1. Enqueue synthetic capture requests on a fixed cadence
/// 2. Call `poll_and_capture` once
/// 3. Every 300 ticks, log the bridge counters
pub async fn run() -> Result<()> {
    let settings = DriverSettings::from_env();
    let config = settings.load_config()?;
    info!(
        "Driving capture bridge at {} fps (frames={}, config={:?})",
        settings.fps, settings.frames, config
    );

    let native = Arc::new(InMemoryCompositor::new());
    let copy = SoftwareCopy::with_delay(Duration::from_millis(2));
    let mut bridge = CaptureBridge::new(Arc::clone(&native), copy, config);
    let stats = bridge.stats();
    let surface = SimSurface::new();

    let mut ticker = tokio::time::interval(settings.frame_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut frame: u64 = 0;
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut shutdown => {
                info!("Ctrl-C received, stopping after {} frames", frame);
                break;
            }
        }
        frame += 1;

        enqueue_synthetic(&native, frame);
        let summary = bridge.poll_and_capture(Some(&surface)).await;
        if summary.reported() {
            debug!("Frame {}: {:?}", frame, summary);
        }

        if frame % 300 == 0 {
            info!("Frame {}: {}", frame, stats.snapshot());
        }
        if settings.frames != 0 && frame >= settings.frames {
            break;
        }
    }

    info!("Final: {}", stats.snapshot());
    Ok(())
}

/// Request cadence: a full-output capture every 30 frames, a padded
/// per-surface capture every 45, and a malformed request every 100.
fn enqueue_synthetic(native: &InMemoryCompositor, frame: u64) {
    if frame % 30 == 0 {
        native.request(CaptureChannel::Screencopy, 1920, 1080, 0);
    }
    if frame % 45 == 0 {
        native.request(CaptureChannel::ImageCopyCapture, 640, 480, 2816);
    }
    if frame % 100 == 0 {
        native.request(CaptureChannel::ImageCopyCapture, 0, 480, 0);
    }
}
