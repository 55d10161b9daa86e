//! Result persistence: per-image JSON matrices and a run-level CSV summary.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::metrics::MetricMap;
use crate::tool;

/// Nested result mapping for one swept derivative:
/// codec name -> measured-bpp string -> metric map.
///
/// The bpp key is the *measured* rate. Two requested targets whose outputs
/// happen to be byte-identical in size collide and overwrite; that matches
/// the persisted JSON schema and is accepted behavior.
pub type ResultMatrix = BTreeMap<String, BTreeMap<String, MetricMap>>;

/// One completed (image, pixel format, codec, target) tuple.
#[derive(Debug, Clone, Serialize)]
pub struct SweepRecord {
    /// Swept derivative path (the result JSON key).
    pub image: String,
    /// Pixel format label of the derivative.
    pub pix_fmt: String,
    /// Codec name.
    pub codec: String,
    /// Requested bit-rate target.
    pub bpp_target: f64,
    /// Measured bit-rate derived from the encoded artifact size.
    pub measured_bpp: f64,
    /// Normalized metric map.
    pub metrics: MetricMap,
}

/// Serialize one derivative's matrix to a pretty-printed JSON file,
/// creating the metrics directory on demand.
pub fn write_matrix(path: &Path, image_key: &str, matrix: &ResultMatrix) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let document = BTreeMap::from([(image_key, matrix)]);
    std::fs::write(path, serde_json::to_string_pretty(&document)?)?;
    tool::progress("JSON", path.display());
    Ok(())
}

/// Write the run-level summary: one CSV row per (record, metric).
pub fn write_csv_summary(
    path: &Path,
    generated_at: DateTime<Utc>,
    records: &[SweepRecord],
) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record([
        "generated_at",
        "image",
        "pix_fmt",
        "codec",
        "bpp_target",
        "measured_bpp",
        "metric",
        "value",
    ])?;

    let stamp = generated_at.to_rfc3339();
    for record in records {
        for (metric, value) in &record.metrics {
            wtr.write_record([
                stamp.as_str(),
                record.image.as_str(),
                record.pix_fmt.as_str(),
                record.codec.as_str(),
                &record.bpp_target.to_string(),
                &format!("{:.6}", record.measured_bpp),
                metric.as_str(),
                &value.to_string(),
            ])?;
        }
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> SweepRecord {
        SweepRecord {
            image: "derivative_images/yuv420p/img.yuv".to_string(),
            pix_fmt: "yuv420p".to_string(),
            codec: "hevc".to_string(),
            bpp_target: 0.25,
            measured_bpp: 0.261,
            metrics: MetricMap::from([
                ("psnr_y".to_string(), 41.2),
                ("ssim".to_string(), 0.98),
            ]),
        }
    }

    #[test]
    fn matrix_json_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics").join("img.yuv420p.json");

        let mut matrix = ResultMatrix::new();
        matrix
            .entry("hevc".to_string())
            .or_default()
            .insert("0.261".to_string(), record().metrics);
        write_matrix(&path, "derivative_images/yuv420p/img.yuv", &matrix).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        let psnr = &value["derivative_images/yuv420p/img.yuv"]["hevc"]["0.261"]["psnr_y"];
        assert_eq!(psnr.as_f64(), Some(41.2));
    }

    #[test]
    fn csv_summary_one_row_per_metric() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.csv");
        write_csv_summary(&path, Utc::now(), &[record()]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        // header + two metrics
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("generated_at,image,pix_fmt"));
        assert!(lines[1].contains("psnr_y"));
        assert!(lines[2].contains("ssim"));
    }
}
