//! ffmpeg filter-graph metrics: libvmaf and the psnr filter.

use std::path::Path;

use serde_json::Value;

use crate::config::ToolPaths;
use crate::error::{Error, Result};
use crate::metrics::MetricMap;
use crate::tool;

/// Full legacy metric set: vmaf, vif, ssim, ms_ssim plus the psnr filter
/// channels, merged.
pub fn full_set(
    tools: &ToolPaths,
    reference: &Path,
    distorted: &Path,
    width: u32,
    height: u32,
) -> Result<MetricMap> {
    let mut map = libvmaf(tools, reference, distorted, width, height, true)?;
    map.extend(psnr(tools, reference, distorted, width, height)?);
    Ok(map)
}

/// Reduced set used as the 8-bit supplement of the SDR and HDR strategies:
/// vmaf and vif only.
pub fn core_set(
    tools: &ToolPaths,
    reference: &Path,
    distorted: &Path,
    width: u32,
    height: u32,
) -> Result<MetricMap> {
    libvmaf(tools, reference, distorted, width, height, false)
}

fn libvmaf(
    tools: &ToolPaths,
    reference: &Path,
    distorted: &Path,
    width: u32,
    height: u32,
    extended: bool,
) -> Result<MetricMap> {
    let log = tempfile::Builder::new()
        .prefix("vmaf-")
        .suffix(".json")
        .tempfile()?;
    let filter = if extended {
        format!(
            "libvmaf=ssim=true:ms_ssim=true:log_fmt=json:log_path={}",
            log.path().display()
        )
    } else {
        format!("libvmaf=log_fmt=json:log_path={}", log.path().display())
    };

    tool::progress("VMAF", distorted.display());
    tool::run(
        &tools.ffmpeg,
        &filter_args(reference, distorted, width, height, &filter),
    )?;

    let text = std::fs::read_to_string(log.path())?;
    parse_vmaf_json(&text, extended)
}

/// Per-channel PSNR via the ffmpeg psnr filter.
pub fn psnr(
    tools: &ToolPaths,
    reference: &Path,
    distorted: &Path,
    width: u32,
    height: u32,
) -> Result<MetricMap> {
    let log = tempfile::Builder::new()
        .prefix("psnr-")
        .suffix(".log")
        .tempfile()?;
    let filter = format!("psnr=stats_file={}", log.path().display());

    tool::progress("PSNR", distorted.display());
    tool::run(
        &tools.ffmpeg,
        &filter_args(reference, distorted, width, height, &filter),
    )?;

    let text = std::fs::read_to_string(log.path())?;
    Ok(parse_psnr_log(&text))
}

/// Both inputs get explicit dimensions; the distorted image is input 0.
fn filter_args(
    reference: &Path,
    distorted: &Path,
    width: u32,
    height: u32,
    filter: &str,
) -> Vec<String> {
    let size = format!("{width}x{height}");
    vec![
        "-s:v".to_string(),
        size.clone(),
        "-i".to_string(),
        distorted.display().to_string(),
        "-s:v".to_string(),
        size,
        "-i".to_string(),
        reference.display().to_string(),
        "-lavfi".to_string(),
        filter.to_string(),
        "-f".to_string(),
        "null".to_string(),
        "-".to_string(),
    ]
}

/// Parse the libvmaf JSON log: `frames[0].metrics`.
pub(crate) fn parse_vmaf_json(text: &str, extended: bool) -> Result<MetricMap> {
    let log: Value = serde_json::from_str(text)?;
    let metrics = log
        .get("frames")
        .and_then(|f| f.get(0))
        .and_then(|f| f.get("metrics"))
        .ok_or_else(|| Error::MetricParse {
            tool: "libvmaf".to_string(),
            reason: "log has no frames[0].metrics".to_string(),
        })?;

    let fetch = |key: &str| -> Result<f64> {
        metrics
            .get(key)
            .and_then(Value::as_f64)
            .ok_or_else(|| Error::MetricParse {
                tool: "libvmaf".to_string(),
                reason: format!("missing metric `{key}`"),
            })
    };

    let mut map = MetricMap::new();
    map.insert("vmaf".to_string(), fetch("vmaf")?);
    map.insert("vif".to_string(), fetch("vif_scale0")?);
    if extended {
        map.insert("ssim".to_string(), fetch("ssim")?);
        map.insert("ms_ssim".to_string(), fetch("ms_ssim")?);
    }
    Ok(map)
}

/// Parse the psnr filter stats log: space-delimited `key:value` pairs,
/// skipping the sample counter and the per-channel MSE fields.
pub(crate) fn parse_psnr_log(text: &str) -> MetricMap {
    let mut map = MetricMap::new();
    for stat in text.split_whitespace() {
        let Some((key, value)) = stat.split_once(':') else {
            continue;
        };
        if key == "n" || key.contains("mse") {
            continue;
        }
        if let Ok(value) = value.parse::<f64>() {
            map.insert(key.to_string(), value);
        }
    }
    map
}
