//! HDRConvert conversion profiles and memoized invocation.
//!
//! Every color/format conversion in the pipeline goes through the same
//! external tool, parameterized by a `.cfg` profile plus source/output
//! dimensions, bit depths and a color-primaries flag.

use std::path::{Path, PathBuf};

use crate::cache::{CacheOutcome, PathLocks};
use crate::config::ToolPaths;
use crate::error::Result;
use crate::tool;

/// The fixed set of conversion profiles the pipeline uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertProfile {
    /// PPM-like source to planar 4:2:0 (derivative generation).
    PpmToYuv420,
    /// PPM-like source to planar 4:4:4 (format bridging).
    PpmToYuv444,
    /// Planar 4:2:0 upsampled to 4:4:4 (format bridging).
    Yuv420ToYuv444,
    /// PPM to EXR (HDR metrics input).
    PpmToExr,
    /// Planar YCbCr to BT.2020 EXR (HDR metrics input).
    YuvToBt2020Exr,
}

impl ConvertProfile {
    /// Profile config file name, resolved under `ToolPaths::convert_configs`.
    #[must_use]
    pub fn config_file(self) -> &'static str {
        match self {
            Self::PpmToYuv420 => "HDRConvertPPMToYCbCr420fr.cfg",
            Self::PpmToYuv444 => "HDRConvertPPMToYCbCr444fr.cfg",
            Self::Yuv420ToYuv444 => "HDRConvertYCbCr420ToYCbCr444.cfg",
            Self::PpmToExr => "HDRConvertPPMToEXR.cfg",
            Self::YuvToBt2020Exr => "HDRConvertYCbCrToBT2020EXR.cfg",
        }
    }
}

/// One conversion request.
#[derive(Debug, Clone)]
pub struct Conversion {
    /// Input image.
    pub source: PathBuf,
    /// Deterministic destination path (the cache key).
    pub dest: PathBuf,
    /// Pixel width of both sides.
    pub width: u32,
    /// Pixel height of both sides.
    pub height: u32,
    /// Bit depth applied to all three components on both sides.
    pub bit_depth: u8,
    /// Color-primaries flag ("0" SDR, "1" HDR).
    pub primaries: &'static str,
}

/// Build the HDRConvert parameter list for a conversion.
pub(crate) fn hdrconvert_args(config: &Path, conversion: &Conversion) -> Vec<String> {
    let depth = conversion.bit_depth.to_string();
    let mut args = vec!["-f".to_string(), config.display().to_string()];
    let mut param = |key: &str, value: String| {
        args.push("-p".to_string());
        args.push(format!("{key}={value}"));
    };
    param("SourceFile", conversion.source.display().to_string());
    param("SourceWidth", conversion.width.to_string());
    param("SourceHeight", conversion.height.to_string());
    param("SourceBitDepthCmp0", depth.clone());
    param("SourceBitDepthCmp1", depth.clone());
    param("SourceBitDepthCmp2", depth.clone());
    param("SourceColorPrimaries", conversion.primaries.to_string());
    param("OutputFile", conversion.dest.display().to_string());
    param("OutputWidth", conversion.width.to_string());
    param("OutputHeight", conversion.height.to_string());
    param("OutputBitDepthCmp0", depth.clone());
    param("OutputBitDepthCmp1", depth.clone());
    param("OutputBitDepthCmp2", depth);
    param("OutputColorPrimaries", conversion.primaries.to_string());
    args
}

/// Run a conversion unless its destination already exists.
///
/// Failures propagate: a missing conversion output poisons everything
/// downstream of it.
pub fn convert_cached(
    tools: &ToolPaths,
    locks: &PathLocks,
    profile: ConvertProfile,
    conversion: &Conversion,
    tag: &str,
) -> Result<CacheOutcome> {
    let config = tools.convert_configs.join(profile.config_file());
    let outcome = locks.ensure(&conversion.dest, || {
        tool::progress(tag, conversion.dest.display());
        tool::run(&tools.hdrconvert, &hdrconvert_args(&config, conversion)).map(|_| ())
    })?;
    if outcome == CacheOutcome::Hit {
        tool::progress(&format!("{tag} OK"), conversion.dest.display());
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_carry_both_sides() {
        let conversion = Conversion {
            source: PathBuf::from("in.ppm"),
            dest: PathBuf::from("out.yuv"),
            width: 512,
            height: 288,
            bit_depth: 10,
            primaries: "1",
        };
        let args = hdrconvert_args(Path::new("cfg/a.cfg"), &conversion);
        assert_eq!(args[0], "-f");
        assert_eq!(args[1], "cfg/a.cfg");
        assert!(args.contains(&"SourceFile=in.ppm".to_string()));
        assert!(args.contains(&"OutputFile=out.yuv".to_string()));
        assert!(args.contains(&"SourceWidth=512".to_string()));
        assert!(args.contains(&"OutputHeight=288".to_string()));
        assert!(args.contains(&"SourceBitDepthCmp2=10".to_string()));
        assert!(args.contains(&"OutputBitDepthCmp2=10".to_string()));
        assert!(args.contains(&"OutputColorPrimaries=1".to_string()));
    }

    #[test]
    fn profile_config_names() {
        assert_eq!(
            ConvertProfile::PpmToYuv420.config_file(),
            "HDRConvertPPMToYCbCr420fr.cfg"
        );
        assert_eq!(
            ConvertProfile::YuvToBt2020Exr.config_file(),
            "HDRConvertYCbCrToBT2020EXR.cfg"
        );
    }
}
