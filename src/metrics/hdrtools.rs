//! HDRMetrics-based strategies: SDR (4:4:4) and HDR (EXR, tone-aware).
//!
//! HDRMetrics writes a fixed-column text log; the frame rows carry a
//! six-zero timestamp marker and the metric columns are positional.

use std::path::{Path, PathBuf};

use crate::cache::PathLocks;
use crate::config::{ObjectiveKind, SweepConfig, ToolPaths};
use crate::convert::{self, Conversion, ConvertProfile};
use crate::error::{Error, Result};
use crate::metrics::{MetricMap, vmaf};
use crate::tool;

/// Marker of a per-frame row in the HDRMetrics log.
const FRAME_MARKER: &str = "000000";

/// HDRMetrics profile config name, resolved under `convert_configs`.
const METRICS_CONFIG: &str = "HDRMetrics.cfg";

/// SDR strategy: HDRMetrics over a 4:4:4 pair, plus VMAF/VIF at 8 bit.
///
/// The chroma-weighted average PSNR `(6*Y + Cb + Cr) / 8` is appended to
/// the per-channel values.
pub fn sdr_set(
    config: &SweepConfig,
    reference: &Path,
    distorted: &Path,
    width: u32,
    height: u32,
    depth: u8,
) -> Result<MetricMap> {
    let log = tempfile::Builder::new()
        .prefix("hdrmetrics-")
        .suffix(".log")
        .tempfile()?;

    let extra = [
        ("TFPSNRDistortion", "0"),
        ("EnablePSNR", "1"),
        ("EnableSSIM", "1"),
        ("EnableMSSSIM", "1"),
        ("Input0ColorPrimaries", "4"),
        ("Input1ColorPrimaries", "4"),
        ("Input0ColorSpace", "0"),
        ("Input1ColorSpace", "0"),
    ];
    let args = hdrmetrics_args(
        &config.tools,
        reference,
        distorted,
        width,
        height,
        depth,
        log.path(),
        &extra,
    );

    tool::progress("METRICS", distorted.display());
    tool::run(&config.tools.hdrmetrics, &args)?;

    let text = std::fs::read_to_string(log.path())?;
    let mut map = parse_sdr_log(&text)?;

    if depth == 8 {
        map.extend(vmaf::core_set(
            &config.tools,
            reference,
            distorted,
            width,
            height,
        )?);
    }
    Ok(map)
}

/// HDR strategy: bridge both sides to EXR, then tone-aware PSNR and
/// MS-SSIM, plus VMAF/VIF at 8 bit.
pub fn hdr_set(
    config: &SweepConfig,
    locks: &PathLocks,
    reference: &Path,
    distorted: &Path,
    width: u32,
    height: u32,
    depth: u8,
) -> Result<MetricMap> {
    let reference_exr = to_exr(config, locks, reference, width, height, depth)?;
    let distorted_exr = to_exr(config, locks, distorted, width, height, depth)?;

    let log = tempfile::Builder::new()
        .prefix("hdrmetrics-")
        .suffix(".log")
        .tempfile()?;

    let extra = [
        ("Input0ColorSpace", "1"),
        ("Input1ColorSpace", "1"),
        ("Input0ColorPrimaries", "1"),
        ("Input1ColorPrimaries", "1"),
        ("TFPSNRDistortion", "1"),
        ("EnableTFPSNR", "1"),
        ("EnableTFMSSSIM", "1"),
    ];
    let args = hdrmetrics_args(
        &config.tools,
        &reference_exr,
        &distorted_exr,
        width,
        height,
        depth,
        log.path(),
        &extra,
    );

    tool::progress("METRICS", distorted_exr.display());
    tool::run(&config.tools.hdrmetrics, &args)?;

    let text = std::fs::read_to_string(log.path())?;
    let mut map = parse_hdr_log(&text)?;

    if depth == 8 {
        map.extend(vmaf::core_set(
            &config.tools,
            reference,
            distorted,
            width,
            height,
        )?);
    }
    Ok(map)
}

/// Bridge a PPM or raw planar image to EXR, cached by destination.
fn to_exr(
    config: &SweepConfig,
    locks: &PathLocks,
    image: &Path,
    width: u32,
    height: u32,
    depth: u8,
) -> Result<PathBuf> {
    let extension = image
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let (kind, profile) = match extension.as_str() {
        "exr" => return Ok(image.to_path_buf()),
        "ppm" => (ObjectiveKind::PpmExr, ConvertProfile::PpmToExr),
        "yuv" => (ObjectiveKind::YuvExr, ConvertProfile::YuvToBt2020Exr),
        other => return Err(Error::UnsupportedFormat(other.to_string())),
    };

    let file_name = image
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let dest = config
        .layout
        .objective_dir(kind)
        .join(format!("{file_name}.exr"));

    let conversion = Conversion {
        source: image.to_path_buf(),
        dest: dest.clone(),
        width,
        height,
        bit_depth: depth,
        primaries: "1",
    };
    convert::convert_cached(&config.tools, locks, profile, &conversion, "EXR")?;
    Ok(dest)
}

/// Common HDRMetrics parameter list. Input 0 is the reference, input 1 the
/// distorted image; both are declared 4:4:4.
fn hdrmetrics_args(
    tools: &ToolPaths,
    reference: &Path,
    distorted: &Path,
    width: u32,
    height: u32,
    depth: u8,
    log: &Path,
    extra: &[(&str, &str)],
) -> Vec<String> {
    let depth = depth.to_string();
    let mut args = vec![
        "-f".to_string(),
        tools.convert_configs.join(METRICS_CONFIG).display().to_string(),
    ];
    let mut param = |key: &str, value: String| {
        args.push("-p".to_string());
        args.push(format!("{key}={value}"));
    };
    param("Input0File", reference.display().to_string());
    param("Input0Width", width.to_string());
    param("Input0Height", height.to_string());
    param("Input0ChromaFormat", "3".to_string());
    param("Input0BitDepthCmp0", depth.clone());
    param("Input0BitDepthCmp1", depth.clone());
    param("Input0BitDepthCmp2", depth.clone());
    param("Input1File", distorted.display().to_string());
    param("Input1Width", width.to_string());
    param("Input1Height", height.to_string());
    param("Input1ChromaFormat", "3".to_string());
    param("Input1BitDepthCmp0", depth.clone());
    param("Input1BitDepthCmp1", depth.clone());
    param("Input1BitDepthCmp2", depth);
    param("LogFile", log.display().to_string());
    for (key, value) in extra {
        param(key, (*value).to_string());
    }
    args
}

/// The marker row of the log, split into positional columns.
fn frame_columns(text: &str) -> Result<Vec<&str>> {
    text.lines()
        .find(|line| line.contains(FRAME_MARKER))
        .map(|line| line.split_whitespace().collect())
        .ok_or_else(|| Error::MetricParse {
            tool: "HDRMetrics".to_string(),
            reason: "log has no frame row".to_string(),
        })
}

fn column(columns: &[&str], index: usize) -> Result<f64> {
    columns
        .get(index)
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| Error::MetricParse {
            tool: "HDRMetrics".to_string(),
            reason: format!("frame row has no numeric column {index}"),
        })
}

/// SDR log: col 1 luma PSNR, cols 2-3 chroma PSNR, col 4 MS-SSIM,
/// col 7 SSIM.
pub(crate) fn parse_sdr_log(text: &str) -> Result<MetricMap> {
    let columns = frame_columns(text)?;
    let psnr_y = column(&columns, 1)?;
    let psnr_cb = column(&columns, 2)?;
    let psnr_cr = column(&columns, 3)?;

    let mut map = MetricMap::new();
    map.insert("psnr_y".to_string(), psnr_y);
    map.insert("psnr_cb".to_string(), psnr_cb);
    map.insert("psnr_cr".to_string(), psnr_cr);
    map.insert(
        "psnr_avg".to_string(),
        (6.0 * psnr_y + psnr_cb + psnr_cr) / 8.0,
    );
    map.insert("ms_ssim".to_string(), column(&columns, 4)?);
    map.insert("ssim".to_string(), column(&columns, 7)?);
    Ok(map)
}

/// HDR log: col 5 tone-aware luma PSNR, col 9 tone-aware MS-SSIM.
pub(crate) fn parse_hdr_log(text: &str) -> Result<MetricMap> {
    let columns = frame_columns(text)?;
    let mut map = MetricMap::new();
    map.insert("psnr-y".to_string(), column(&columns, 5)?);
    map.insert("ms_ssim".to_string(), column(&columns, 9)?);
    Ok(map)
}
