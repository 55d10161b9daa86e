//! Canonical derivative generation.
//!
//! Encoders never see the raw corpus files directly (except for the classB
//! bypass codecs); they see canonical intermediates created here once and
//! reused across runs.

use std::path::PathBuf;

use crate::cache::{CacheOutcome, PathLocks};
use crate::classify::SourceImage;
use crate::config::{PixelFormat, SweepConfig};
use crate::convert::{self, Conversion, ConvertProfile};
use crate::error::Result;
use crate::tool;

/// A canonical intermediate the sweep encodes from.
#[derive(Debug, Clone)]
pub struct DerivativeImage {
    /// Path of the intermediate (or of the source itself, for the
    /// native-format entry).
    pub path: PathBuf,
    /// Pixel format of the intermediate.
    pub format: PixelFormat,
}

/// Ensure the canonical intermediates for an image exist and return the
/// list the sweep iterates.
///
/// classB produces only a PPM derivative. All other classes produce a
/// planar 4:2:0 derivative plus a PPM copy, and are additionally swept in
/// their native format.
pub fn create_derivatives(
    config: &SweepConfig,
    locks: &PathLocks,
    image: &SourceImage,
) -> Result<Vec<DerivativeImage>> {
    let stem = image.stem();
    let yuv_dest = config
        .layout
        .derivative_dir(PixelFormat::Yuv420p)
        .join(format!("{stem}.yuv"));
    let ppm_dest = config
        .layout
        .derivative_dir(PixelFormat::Ppm)
        .join(format!("{stem}.ppm"));

    if image.class.is_class_b() {
        let outcome = locks.ensure(&ppm_dest, || {
            tool::progress("PPM", ppm_dest.display());
            let args = vec![
                "--convert".to_string(),
                ppm_dest.display().to_string(),
                image.path.display().to_string(),
                "-".to_string(),
            ];
            tool::run(&config.tools.difftest_ng, &args).map(|_| ())
        })?;
        if outcome == CacheOutcome::Hit {
            tool::progress("PPM OK", ppm_dest.display());
        }
        return Ok(vec![DerivativeImage {
            path: ppm_dest,
            format: PixelFormat::Ppm,
        }]);
    }

    let conversion = Conversion {
        source: image.path.clone(),
        dest: yuv_dest.clone(),
        width: image.width,
        height: image.height,
        bit_depth: image.bit_depth,
        primaries: image.class.color_primaries(),
    };
    convert::convert_cached(
        &config.tools,
        locks,
        ConvertProfile::PpmToYuv420,
        &conversion,
        "YUV420",
    )?;

    // PPM derivative is a plain copy of the source.
    locks.ensure(&ppm_dest, || {
        std::fs::copy(&image.path, &ppm_dest)?;
        Ok(())
    })?;

    Ok(vec![
        DerivativeImage {
            path: yuv_dest,
            format: PixelFormat::Yuv420p,
        },
        DerivativeImage {
            path: image.path.clone(),
            format: image.native_format,
        },
    ])
}
