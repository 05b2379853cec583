pub mod config;
pub mod errors;
pub mod stride;
pub mod types;

pub use config::BridgeConfig;
pub use errors::{CaptureError, FailureKind, StrideError};
pub use stride::{normalize_owned, normalize_rows};
pub use types::*;
