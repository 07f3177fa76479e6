//! Pipeline configuration, deserialized from TOML at binary startup (mirroring the teacher's
//! `toml_edit`-based config parsing). Every field that has a spec-mandated value ships a
//! `default_*` function so a config file only needs to override what differs.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DocflowConfig {
    /// §4.7: visibility lease handed to a scan worker on `receive`.
    #[serde(with = "humantime_serde", default = "default_scan_lease")]
    pub scan_lease: Duration,

    /// §4.7 step 3: abort the scan and nack with minimum backoff when less than this much of
    /// the lease remains, so a slow scan doesn't race a second worker's redelivery.
    #[serde(with = "humantime_serde", default = "default_lease_safety_margin")]
    pub lease_safety_margin: Duration,

    /// §6.1/§3: maximum accepted upload size.
    #[serde(default = "default_max_object_size_bytes")]
    pub max_object_size_bytes: u64,

    /// §4.6 precondition: only these content types may be uploaded.
    #[serde(default = "default_permitted_content_types")]
    pub permitted_content_types: Vec<String>,

    /// §4.1: allowed `presign_get` TTL range, inclusive.
    #[serde(with = "humantime_serde", default = "default_min_presign_ttl")]
    pub min_presign_ttl: Duration,
    #[serde(with = "humantime_serde", default = "default_max_presign_ttl")]
    pub max_presign_ttl: Duration,

    /// §4.8: maximum number of documents in one `batch_download`.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Number of concurrent scan workers in the pool (§4.7/§5 "fixed-size worker pool").
    #[serde(default = "default_scan_worker_count")]
    pub scan_worker_count: usize,

    /// §5 back-pressure: queue depth above which uploads are accepted but flagged degraded.
    #[serde(default = "default_backpressure_queue_depth")]
    pub backpressure_queue_depth: u64,
}

impl Default for DocflowConfig {
    fn default() -> Self {
        Self {
            scan_lease: default_scan_lease(),
            lease_safety_margin: default_lease_safety_margin(),
            max_object_size_bytes: default_max_object_size_bytes(),
            permitted_content_types: default_permitted_content_types(),
            min_presign_ttl: default_min_presign_ttl(),
            max_presign_ttl: default_max_presign_ttl(),
            max_batch_size: default_max_batch_size(),
            scan_worker_count: default_scan_worker_count(),
            backpressure_queue_depth: default_backpressure_queue_depth(),
        }
    }
}

impl DocflowConfig {
    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml_edit::de::from_str(text)?)
    }
}

fn default_scan_lease() -> Duration {
    Duration::from_secs(15 * 60)
}

fn default_lease_safety_margin() -> Duration {
    Duration::from_secs(30)
}

fn default_max_object_size_bytes() -> u64 {
    docflow_object_store::MAX_OBJECT_SIZE_BYTES
}

fn default_permitted_content_types() -> Vec<String> {
    vec![
        "application/pdf".to_string(),
        "text/plain".to_string(),
        "image/png".to_string(),
        "image/jpeg".to_string(),
        "application/msword".to_string(),
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document".to_string(),
    ]
}

fn default_min_presign_ttl() -> Duration {
    docflow_object_store::MIN_PRESIGN_TTL
}

fn default_max_presign_ttl() -> Duration {
    docflow_object_store::MAX_PRESIGN_TTL
}

fn default_max_batch_size() -> usize {
    100
}

fn default_scan_worker_count() -> usize {
    4
}

fn default_backpressure_queue_depth() -> u64 {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_falls_back_to_spec_defaults() {
        let config = DocflowConfig::parse("").unwrap();
        assert_eq!(config.scan_lease, Duration::from_secs(900));
        assert_eq!(config.max_batch_size, 100);
        assert_eq!(config.max_object_size_bytes, 100 * 1024 * 1024);
    }

    #[test]
    fn overrides_individual_fields() {
        let config = DocflowConfig::parse("scan_worker_count = 8\nmax_batch_size = 25\n").unwrap();
        assert_eq!(config.scan_worker_count, 8);
        assert_eq!(config.max_batch_size, 25);
        assert_eq!(config.scan_lease, Duration::from_secs(900));
    }
}
