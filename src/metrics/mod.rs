//! Objective quality metrics.
//!
//! Three mutually exclusive strategies, selected by image class:
//!
//! - **legacy** (classB): ffmpeg filter graphs, libvmaf for the
//!   VMAF-family metrics plus the psnr filter, merged ([`vmaf`]).
//! - **SDR** (default): HDRMetrics configured for 4:4:4 input, plus
//!   libvmaf VMAF/VIF when the source is 8-bit ([`hdrtools`]).
//! - **HDR** (classE): inputs bridged to EXR, then HDRMetrics with
//!   tone-function-aware PSNR and MS-SSIM ([`hdrtools`]).
//!
//! Metric tool failures are hard failures for the tuple, unlike the soft
//! encode/decode policy: a silently omitted metric would skew the
//! comparison with no visible indication.

pub mod hdrtools;
pub mod vmaf;

use std::collections::BTreeMap;
use std::path::Path;

use crate::cache::PathLocks;
use crate::classify::ImageClass;
use crate::config::SweepConfig;
use crate::error::{Error, Result};

/// Normalized metric-name to value map for one comparison.
pub type MetricMap = BTreeMap<String, f64>;

/// Compute the metric map for a (reference, distorted) pair using the
/// class-appropriate strategy.
///
/// Returns [`Error::MissingArtifact`] if either input is absent; callers
/// treat that as a soft skip of the tuple.
pub fn compute(
    config: &SweepConfig,
    locks: &PathLocks,
    class: ImageClass,
    reference: &Path,
    distorted: &Path,
    width: u32,
    height: u32,
    depth: u8,
) -> Result<MetricMap> {
    for path in [reference, distorted] {
        if !path.is_file() {
            return Err(Error::MissingArtifact {
                path: path.to_path_buf(),
            });
        }
    }

    match class {
        ImageClass::ClassB => vmaf::full_set(&config.tools, reference, distorted, width, height),
        ImageClass::ClassE | ImageClass::ClassEExr => {
            hdrtools::hdr_set(config, locks, reference, distorted, width, height, depth)
        }
        ImageClass::Sdr => {
            hdrtools::sdr_set(config, reference, distorted, width, height, depth)
        }
    }
}
