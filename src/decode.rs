//! Decode orchestration.
//!
//! Mirrors the encode side: deterministic destination, cache-by-existence,
//! soft failure, empty-output deletion. The destination extension comes
//! from the pixel-format table unless the codec's capability entry forces a
//! raw planar container.

use std::fs;
use std::path::PathBuf;

use crate::cache::{self, PathLocks};
use crate::config::{CodecSpec, PixelFormat, SweepConfig};
use crate::encode::EncodedArtifact;
use crate::error::Result;
use crate::tool;

/// A decoded artifact on disk.
#[derive(Debug, Clone)]
pub struct DecodedArtifact {
    /// Codec that produced it.
    pub codec: String,
    /// Deterministic artifact path.
    pub path: PathBuf,
    /// Format actually on disk (after any container override).
    pub format: PixelFormat,
}

/// Decode an encoded artifact back to a raw image.
///
/// The adapter contract is `(input, output, width, height, pixFmt, depth)`.
/// Returns `Ok(None)` on adapter failure or empty output.
pub fn decode(
    config: &SweepConfig,
    locks: &PathLocks,
    codec: &CodecSpec,
    encoded: &EncodedArtifact,
    width: u32,
    height: u32,
    format: PixelFormat,
    depth: u8,
) -> Result<Option<DecodedArtifact>> {
    let out_format = codec.decode_ext_override.unwrap_or(format);
    let file_name = format!(
        "{}{}",
        encoded
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or_default(),
        out_format.container_extension()
    );
    let dest = config.layout.decoded_dir(&codec.name).join(file_name);

    let lock = locks.lock_for(&dest);
    let _guard = cache::acquire(&lock);

    if dest.is_file() {
        tool::progress("DECODE OK", dest.display());
        return Ok(Some(DecodedArtifact {
            codec: codec.name.clone(),
            path: dest,
            format: out_format,
        }));
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    let script = config.layout.decode_adapter(&codec.name);
    let args = vec![
        encoded.path.display().to_string(),
        dest.display().to_string(),
        width.to_string(),
        height.to_string(),
        format.label().to_string(),
        depth.to_string(),
    ];
    tool::progress("DECODING", tool::command_line(&script, &args));

    if let Err(e) = tool::run(&script, &args) {
        tool::failure(&e);
        if dest.is_file() {
            fs::remove_file(&dest)?;
        }
        return Ok(None);
    }

    match fs::metadata(&dest) {
        Ok(metadata) if metadata.len() == 0 => {
            tool::failure(format!("empty image: `{}`, removing.", dest.display()));
            fs::remove_file(&dest)?;
            Ok(None)
        }
        Ok(_) => Ok(Some(DecodedArtifact {
            codec: codec.name.clone(),
            path: dest,
            format: out_format,
        })),
        Err(_) => {
            tool::failure(format!("no output produced at `{}`", dest.display()));
            Ok(None)
        }
    }
}
