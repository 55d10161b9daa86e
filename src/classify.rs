//! Image class tags and source-image probing.
//!
//! A source image carries a class tag derived from the corpus directory it
//! came from, plus dimensions and bit depth obtained either from the raw
//! planar filename convention (`..._WxH_..._<depth>bit...`) or from the
//! external `identify` tool.

use std::path::{Path, PathBuf};

use crate::config::{PixelFormat, ToolPaths};
use crate::error::{Error, Result};
use crate::tool;

/// Corpus sub-class of a source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageClass {
    /// Standard-dynamic-range content (the default).
    Sdr,
    /// Legacy/broadcast-reference content.
    ClassB,
    /// HDR content.
    ClassE,
    /// HDR content stored as EXR, probed with an explicit size hint.
    ClassEExr,
}

impl ImageClass {
    /// Derive the class from a corpus class-directory name.
    #[must_use]
    pub fn from_dir_name(name: &str) -> Self {
        if name == "classE_exr" {
            Self::ClassEExr
        } else if name.starts_with("classE") {
            Self::ClassE
        } else if name.starts_with("classB") {
            Self::ClassB
        } else {
            Self::Sdr
        }
    }

    /// Legacy/broadcast class.
    #[must_use]
    pub fn is_class_b(self) -> bool {
        self == Self::ClassB
    }

    /// Any HDR class.
    #[must_use]
    pub fn is_hdr(self) -> bool {
        matches!(self, Self::ClassE | Self::ClassEExr)
    }

    /// Color-primaries flag passed to the conversion tool.
    #[must_use]
    pub fn color_primaries(self) -> &'static str {
        if self.is_hdr() { "1" } else { "0" }
    }
}

/// An immutable reference image.
#[derive(Debug, Clone)]
pub struct SourceImage {
    /// Path to the reference file.
    pub path: PathBuf,
    /// Corpus class tag.
    pub class: ImageClass,
    /// Pixel width.
    pub width: u32,
    /// Pixel height.
    pub height: u32,
    /// Bit depth per component.
    pub bit_depth: u8,
    /// Format implied by the file extension.
    pub native_format: PixelFormat,
}

impl SourceImage {
    /// File stem used to derive every artifact name.
    #[must_use]
    pub fn stem(&self) -> &str {
        self.path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
    }
}

/// Probe a source image's dimensions, bit depth and format.
pub fn probe_source(tools: &ToolPaths, path: &Path, class: ImageClass) -> Result<SourceImage> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_string();
    let native_format = PixelFormat::from_extension(&extension)
        .ok_or_else(|| Error::UnsupportedFormat(extension.clone()))?;

    let (width, height, bit_depth) = if native_format == PixelFormat::Yuv420p {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        parse_raw_stem(stem).ok_or_else(|| Error::Classify {
            path: path.to_path_buf(),
            reason: format!("raw planar filename `{stem}` does not encode _WxH_ and <depth>bit"),
        })?
    } else {
        identify(tools, path, class)?
    };

    Ok(SourceImage {
        path: path.to_path_buf(),
        class,
        width,
        height,
        bit_depth,
        native_format,
    })
}

/// Parse `..._WxH_..._<depth>bit...` from a raw planar file stem.
///
/// The depth may be one or two digits immediately preceding the literal
/// `bit` marker.
pub(crate) fn parse_raw_stem(stem: &str) -> Option<(u32, u32, u8)> {
    let before = stem.split('x').next()?;
    let width: u32 = before.rsplit('_').next()?.parse().ok()?;

    // Everything after the last 'x' carries the height and the depth marker.
    let tail = stem.rsplit('x').next()?;
    let height: u32 = tail.split('_').next()?.parse().ok()?;

    let marker = tail.find("bit")?;
    let digits: Vec<char> = tail[..marker]
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .take(2)
        .collect();
    if digits.is_empty() {
        return None;
    }
    let depth: u8 = digits.iter().rev().collect::<String>().parse().ok()?;

    Some((width, height, depth))
}

/// Probe via the external image-metadata tool.
fn identify(tools: &ToolPaths, path: &Path, class: ImageClass) -> Result<(u32, u32, u8)> {
    let mut args = Vec::new();
    if class == ImageClass::ClassEExr {
        // EXR metadata alone is not enough; the filename carries a size hint.
        let hint = size_hint(path).ok_or_else(|| Error::Classify {
            path: path.to_path_buf(),
            reason: "classE_exr filename carries no size hint".to_string(),
        })?;
        args.push("-size".to_string());
        args.push(hint);
    }
    args.push("-format".to_string());
    args.push("%w,%h,%z".to_string());
    args.push(path.display().to_string());

    let output = tool::run(&tools.identify, &args)?;
    parse_identify_output(&output).ok_or_else(|| Error::Classify {
        path: path.to_path_buf(),
        reason: format!("unexpected identify output `{}`", output.trim()),
    })
}

/// Size hint for the EXR sub-class: the third `_`-separated token of the
/// basename.
fn size_hint(path: &Path) -> Option<String> {
    path.file_name()?
        .to_str()?
        .split('_')
        .nth(2)
        .map(str::to_string)
}

/// Parse the fixed `width,height,depth` output of the metadata tool.
pub(crate) fn parse_identify_output(output: &str) -> Option<(u32, u32, u8)> {
    let mut fields = output.trim().split(',');
    let width = fields.next()?.trim().parse().ok()?;
    let height = fields.next()?.trim().parse().ok()?;
    let depth = fields.next()?.trim().parse().ok()?;
    Some((width, height, depth))
}
