//! Prometheus metrics for a harvest run.
//!
//! This module provides metrics for:
//! - Page walking (pages scanned)
//! - Item processing (results, duration)
//! - Asset downloads (results, bytes)

use std::path::Path;

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Registry holding every harvester metric.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    for metric in all_metrics() {
        registry.register(metric).unwrap();
    }
    registry
});

// =============================================================================
// Walker Metrics
// =============================================================================

/// Listing pages fetched successfully.
pub static PAGES_SCANNED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "harvester_pages_scanned_total",
        "Total listing pages fetched",
    )
    .unwrap()
});

// =============================================================================
// Item Metrics
// =============================================================================

/// Items by result.
pub static ITEMS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("harvester_items_total", "Total items seen by result"),
        &["result"], // "committed", "failed", "skipped", "withheld", "cancelled"
    )
    .unwrap()
});

/// Item processing duration in seconds.
pub static ITEM_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "harvester_item_duration_seconds",
            "Duration of item processing (detail, summary and assets)",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 300.0]),
        &["result"],
    )
    .unwrap()
});

// =============================================================================
// Asset Metrics
// =============================================================================

/// Assets by result.
pub static ASSETS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("harvester_assets_total", "Total assets by result"),
        &["result"], // "downloaded", "present", "failed"
    )
    .unwrap()
});

/// Bytes written by completed downloads.
pub static ASSET_BYTES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "harvester_asset_bytes_total",
        "Total bytes downloaded for assets",
    )
    .unwrap()
});

/// Get all metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(PAGES_SCANNED.clone()),
        Box::new(ITEMS_TOTAL.clone()),
        Box::new(ITEM_DURATION.clone()),
        Box::new(ASSETS_TOTAL.clone()),
        Box::new(ASSET_BYTES.clone()),
    ]
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

/// Write the current metrics to `path` for a node-exporter textfile collector.
///
/// The file is written next to its destination and renamed over it, so a
/// scraper never reads a half-written file.
pub async fn write_textfile(path: &Path) -> std::io::Result<()> {
    let body = encode_metrics().map_err(std::io::Error::other)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&tmp, body).await?;
    tokio::fs::rename(&tmp, path).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        PAGES_SCANNED.inc();
        ITEMS_TOTAL.with_label_values(&["committed"]).inc();

        let output = encode_metrics().unwrap();
        assert!(output.contains("harvester_pages_scanned_total"));
        assert!(output.contains("harvester_items_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_registry_contains_all_metrics() {
        // Vec metrics only show up once a label set has been touched
        ITEM_DURATION.with_label_values(&["committed"]).observe(0.2);
        ASSETS_TOTAL.with_label_values(&["present"]).inc();
        ASSET_BYTES.inc_by(0);

        let output = encode_metrics().unwrap();
        assert!(output.contains("harvester_item_duration_seconds"));
        assert!(output.contains("harvester_assets_total"));
        assert!(output.contains("harvester_asset_bytes_total"));
    }

    #[tokio::test]
    async fn test_write_textfile() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("harvester.prom");
        PAGES_SCANNED.inc();

        write_textfile(&path).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("harvester_pages_scanned_total"));
        assert!(!temp_dir.path().join("nested").join("harvester.prom.tmp").exists());
    }
}
