//! Encode orchestration.
//!
//! Invokes the codec's external encode adapter with the fixed positional
//! contract `(input, output, bppTarget, width, height, pixFmt, depth)`.
//! Adapter failures are soft: the tuple is abandoned and the sweep moves on.

use std::fs;
use std::path::{Path, PathBuf};

use crate::cache::{self, PathLocks};
use crate::config::{CodecSpec, PixelFormat, SweepConfig, bpp_label};
use crate::error::Result;
use crate::tool;

/// A non-empty encoded output on disk.
#[derive(Debug, Clone)]
pub struct EncodedArtifact {
    /// Codec that produced it.
    pub codec: String,
    /// The requested bit-rate target.
    pub bpp_target: f64,
    /// Deterministic artifact path.
    pub path: PathBuf,
    /// Byte size at creation/cache-hit time.
    pub size_bytes: u64,
}

impl EncodedArtifact {
    /// Measured bit-rate in bits per pixel, derived from the byte size.
    #[must_use]
    pub fn measured_bpp(&self, width: u32, height: u32) -> f64 {
        self.size_bytes as f64 * 1.024 * 8.0 / (f64::from(width) * f64::from(height))
    }
}

/// Encode `input` at one bit-rate target.
///
/// Returns `Ok(None)` when the adapter fails or emits an empty file; both
/// cases leave no partial output behind.
pub fn encode(
    config: &SweepConfig,
    locks: &PathLocks,
    codec: &CodecSpec,
    bpp_target: f64,
    input: &Path,
    width: u32,
    height: u32,
    format: PixelFormat,
    depth: u8,
) -> Result<Option<EncodedArtifact>> {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let name = format!(
        "{stem}_{}_{}.{}",
        bpp_label(bpp_target),
        format.label(),
        codec.name
    );
    let dest = config.layout.encoded_dir(&codec.name).join(name);

    let lock = locks.lock_for(&dest);
    let _guard = cache::acquire(&lock);

    if dest.is_file() {
        tool::progress("ENCODE OK", dest.display());
        let size_bytes = fs::metadata(&dest)?.len();
        return Ok(Some(EncodedArtifact {
            codec: codec.name.clone(),
            bpp_target,
            path: dest,
            size_bytes,
        }));
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    let script = config.layout.encode_adapter(&codec.name);
    let args = vec![
        input.display().to_string(),
        dest.display().to_string(),
        bpp_label(bpp_target),
        width.to_string(),
        height.to_string(),
        format.label().to_string(),
        depth.to_string(),
    ];
    tool::progress("ENCODING", tool::command_line(&script, &args));

    if let Err(e) = tool::run(&script, &args) {
        tool::failure(&e);
        if dest.is_file() {
            fs::remove_file(&dest)?;
        }
        return Ok(None);
    }

    let Ok(metadata) = fs::metadata(&dest) else {
        tool::failure(format!("no output produced at `{}`", dest.display()));
        return Ok(None);
    };
    if metadata.len() == 0 {
        tool::failure(format!("empty image: `{}`, removing.", dest.display()));
        fs::remove_file(&dest)?;
        return Ok(None);
    }

    Ok(Some(EncodedArtifact {
        codec: codec.name.clone(),
        bpp_target,
        path: dest,
        size_bytes: metadata.len(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measured_bpp_formula() {
        let artifact = EncodedArtifact {
            codec: "hevc".to_string(),
            bpp_target: 1.0,
            path: PathBuf::from("x.hevc"),
            size_bytes: 32768,
        };
        let expected = 32768.0 * 1.024 * 8.0 / (512.0 * 512.0);
        assert_eq!(artifact.measured_bpp(512, 512), expected);
    }

    #[test]
    fn measured_bpp_zero_size() {
        let artifact = EncodedArtifact {
            codec: "hevc".to_string(),
            bpp_target: 0.25,
            path: PathBuf::from("x.hevc"),
            size_bytes: 0,
        };
        assert_eq!(artifact.measured_bpp(100, 100), 0.0);
    }
}
