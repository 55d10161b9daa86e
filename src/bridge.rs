//! Format bridging: decoded and reference images to a common 4:4:4
//! comparison format.
//!
//! Only plain SDR content is bridged; classB and the HDR classes compare in
//! their native formats. Bridging failures are fatal: a silently missing
//! comparison input would corrupt the metrics without any visible sign.

use std::path::{Path, PathBuf};

use crate::cache::PathLocks;
use crate::config::{ObjectiveKind, SweepConfig};
use crate::convert::{self, Conversion, ConvertProfile};
use crate::error::Result;

/// Convert an image to planar 4:4:4 for metric comparison.
///
/// `from_yuv420` selects the upsampling profile used for codecs whose
/// decoders natively emit 4:2:0; everything else goes through the PPM
/// profile.
pub fn bridge_to_yuv444(
    config: &SweepConfig,
    locks: &PathLocks,
    source: &Path,
    width: u32,
    height: u32,
    depth: u8,
    from_yuv420: bool,
) -> Result<PathBuf> {
    let (kind, profile) = if from_yuv420 {
        (ObjectiveKind::Yuv420Yuv444, ConvertProfile::Yuv420ToYuv444)
    } else {
        (ObjectiveKind::Ppm444Yuv444, ConvertProfile::PpmToYuv444)
    };

    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let dest = config.layout.objective_dir(kind).join(format!("{stem}.yuv"));

    let conversion = Conversion {
        source: source.to_path_buf(),
        dest: dest.clone(),
        width,
        height,
        bit_depth: depth,
        primaries: "0",
    };
    convert::convert_cached(&config.tools, locks, profile, &conversion, "YUV444")?;
    Ok(dest)
}
