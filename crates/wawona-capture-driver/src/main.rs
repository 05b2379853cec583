use anyhow::Result;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod driver;

fn main() -> Result<()> {
    // RUST_LOG=debug shows per-request geometry and stride normalization
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_thread_ids(false)
        .init();

    info!("Wawona capture driver v{}", env!("CARGO_PKG_VERSION"));

    // The bridge must stay on the thread that owns the framebuffer.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    match runtime.block_on(driver::run()) {
        Ok(()) => {
            info!("Capture driver exited cleanly.");
            Ok(())
        }
        Err(e) => {
            error!("Fatal error: {:#}", e);
            Err(e)
        }
    }
}
