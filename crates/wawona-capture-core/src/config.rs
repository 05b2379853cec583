use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables for the capture bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Upper bound on the suspended readback wait. `None` waits for the
    /// completion callback indefinitely.
    #[serde(alias = "readbackTimeoutMs")]
    pub readback_timeout_ms: Option<u64>,
    /// Recently reported ids remembered per channel to reject duplicate delivery.
    #[serde(alias = "dedupWindow")]
    pub dedup_window: usize,
    /// Largest pixel or normalized buffer a single request may allocate.
    #[serde(alias = "maxBufferBytes")]
    pub max_buffer_bytes: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            readback_timeout_ms: Some(1_000),
            dedup_window: 64,
            max_buffer_bytes: 256 * 1024 * 1024,
        }
    }
}

impl BridgeConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn readback_timeout(&self) -> Option<Duration> {
        self.readback_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::BridgeConfig;

    #[test]
    fn deserializes_camel_case_fields() {
        let json = r#"{
            "readbackTimeoutMs": 250,
            "dedupWindow": 8,
            "maxBufferBytes": 1048576
        }"#;

        let cfg = BridgeConfig::from_json(json).expect("valid camelCase config");
        assert_eq!(cfg.readback_timeout_ms, Some(250));
        assert_eq!(cfg.dedup_window, 8);
        assert_eq!(cfg.max_buffer_bytes, 1_048_576);
    }

    #[test]
    fn deserializes_snake_case_fields() {
        let json = r#"{
            "readback_timeout_ms": null,
            "dedup_window": 16
        }"#;

        let cfg = BridgeConfig::from_json(json).expect("valid snake_case config");
        assert_eq!(cfg.readback_timeout(), None);
        assert_eq!(cfg.dedup_window, 16);
        assert_eq!(cfg.max_buffer_bytes, BridgeConfig::default().max_buffer_bytes);
    }

    #[test]
    fn empty_document_uses_defaults() {
        let cfg = BridgeConfig::from_json("{}").unwrap();
        assert_eq!(cfg, BridgeConfig::default());
        assert_eq!(cfg.readback_timeout(), Some(std::time::Duration::from_millis(1_000)));
    }
}
