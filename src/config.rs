//! Sweep configuration.
//!
//! Everything the pipeline used to treat as ambient state lives here as
//! explicit structures passed into each component: the working-directory
//! layout, external tool locations, the bit-rate target set, and the codec
//! capability table that replaces name-based branching.

use std::path::{Path, PathBuf};

use crate::classify::ImageClass;

/// Bit-rate targets (bits per pixel) swept for every codec.
pub const STANDARD_BPP_TARGETS: &[f64] = &[0.06, 0.12, 0.25, 0.50, 0.75, 1.00, 1.50, 2.00];

/// Canonical pixel/container formats handled by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Packed RGB, PPM container.
    Ppm,
    /// Planar YCbCr 4:2:0, raw `.yuv` container.
    Yuv420p,
    /// Portable float map.
    Pfm,
    /// Portable gray map.
    Pgm,
    /// TIFF container.
    Tif,
    /// OpenEXR HDR container.
    Exr,
}

impl PixelFormat {
    /// Label used in artifact file names and result JSON names.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Ppm => "ppm",
            Self::Yuv420p => "yuv420p",
            Self::Pfm => "pfm",
            Self::Pgm => "pgm",
            Self::Tif => "tif",
            Self::Exr => "exr",
        }
    }

    /// Container extension (with dot) a decoder is expected to emit for
    /// this format.
    #[must_use]
    pub fn container_extension(self) -> &'static str {
        match self {
            Self::Ppm => ".ppm",
            Self::Yuv420p => ".yuv",
            Self::Pfm => ".pfm",
            Self::Pgm => ".pgm",
            Self::Tif => ".tif",
            Self::Exr => ".exr",
        }
    }

    /// Map a file extension (without dot) to a format.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "ppm" => Some(Self::Ppm),
            "yuv" => Some(Self::Yuv420p),
            "pfm" => Some(Self::Pfm),
            "pgm" => Some(Self::Pgm),
            "tif" | "tiff" => Some(Self::Tif),
            "exr" => Some(Self::Exr),
            _ => None,
        }
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Sub-directories of `objective_images/` holding bridged comparison formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveKind {
    /// PPM sources converted to EXR for HDR metrics.
    PpmExr,
    /// Raw planar sources converted to BT.2020 EXR for HDR metrics.
    YuvExr,
    /// 4:2:0 decodes upsampled to 4:4:4.
    Yuv420Yuv444,
    /// PPM-like decodes converted to 4:4:4.
    Ppm444Yuv444,
}

impl ObjectiveKind {
    fn dir_name(self) -> &'static str {
        match self {
            Self::PpmExr => "PPM_EXR",
            Self::YuvExr => "YUV_EXR",
            Self::Yuv420Yuv444 => "YUV420_YUV444",
            Self::Ppm444Yuv444 => "PPM444_YUV444",
        }
    }
}

/// On-disk layout of cache and output directories, relative to a working
/// directory. Output paths are deterministic: the same inputs always map to
/// the same path, which is what makes cache-by-existence work.
#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    /// Create a layout rooted at the given working directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The working directory itself.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of encode adapter scripts.
    #[must_use]
    pub fn encode_adapter_dir(&self) -> PathBuf {
        self.root.join("encode")
    }

    /// Directory of decode adapter scripts.
    #[must_use]
    pub fn decode_adapter_dir(&self) -> PathBuf {
        self.root.join("decode")
    }

    /// Encode adapter script for a codec.
    #[must_use]
    pub fn encode_adapter(&self, codec: &str) -> PathBuf {
        self.encode_adapter_dir().join(codec)
    }

    /// Decode adapter script for a codec.
    #[must_use]
    pub fn decode_adapter(&self, codec: &str) -> PathBuf {
        self.decode_adapter_dir().join(codec)
    }

    /// Cache directory for canonical derivatives of one format.
    #[must_use]
    pub fn derivative_dir(&self, format: PixelFormat) -> PathBuf {
        self.root.join("derivative_images").join(format.label())
    }

    /// Directory of encoded artifacts for a codec.
    #[must_use]
    pub fn encoded_dir(&self, codec: &str) -> PathBuf {
        self.root.join("outputs").join(codec)
    }

    /// Directory of decoded artifacts for a codec.
    #[must_use]
    pub fn decoded_dir(&self, codec: &str) -> PathBuf {
        self.encoded_dir(codec).join("decoded")
    }

    /// Directory for one kind of bridged comparison image.
    #[must_use]
    pub fn objective_dir(&self, kind: ObjectiveKind) -> PathBuf {
        self.root.join("objective_images").join(kind.dir_name())
    }

    /// Directory holding per-image result JSON files.
    #[must_use]
    pub fn metrics_dir(&self) -> PathBuf {
        self.root.join("metrics")
    }
}

/// Locations of the external programs the pipeline shells out to.
#[derive(Debug, Clone)]
pub struct ToolPaths {
    /// ImageMagick `identify`, for dimension/depth probing.
    pub identify: PathBuf,
    /// `ffmpeg`, for the libvmaf and psnr filter graphs.
    pub ffmpeg: PathBuf,
    /// HDRTools `HDRConvert`, for all color/format conversions.
    pub hdrconvert: PathBuf,
    /// HDRTools `HDRMetrics`, for the SDR and HDR metric strategies.
    pub hdrmetrics: PathBuf,
    /// `difftest_ng`, for the classB raw-to-PPM conversion.
    pub difftest_ng: PathBuf,
    /// Directory holding the HDRConvert/HDRMetrics `.cfg` profiles.
    pub convert_configs: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            identify: PathBuf::from("identify"),
            ffmpeg: PathBuf::from("ffmpeg"),
            hdrconvert: PathBuf::from("/tools/HDRTools-0.18-dev/bin/HDRConvert"),
            hdrmetrics: PathBuf::from("/tools/HDRTools-0.18-dev/bin/HDRMetrics"),
            difftest_ng: PathBuf::from("/tools/difftest_ng-master/difftest_ng"),
            convert_configs: PathBuf::from("convert_configs"),
        }
    }
}

/// Capabilities of one codec adapter.
///
/// The sweep consults this table instead of matching on codec-name
/// substrings. Combinations the table excludes are skipped silently; a skip
/// is not an error.
#[derive(Debug, Clone)]
pub struct CodecSpec {
    /// Adapter name; also the encoded-artifact extension and the
    /// `outputs/<codec>` directory name.
    pub name: String,
    /// Source bit depths the codec accepts. Empty means any depth.
    pub supported_depths: Vec<u8>,
    /// Only sweep this codec for 4:2:0 derivatives.
    pub requires_yuv420: bool,
    /// Whether the codec participates in HDR (classE) sweeps.
    pub hdr_capable: bool,
    /// classB sources are fed to the encoder directly in their native
    /// format, skipping the derivative.
    pub bypasses_conversion_for_classb: bool,
    /// Decoder always emits this container regardless of the requested
    /// format (raw-planar decoder families).
    pub decode_ext_override: Option<PixelFormat>,
    /// Decoder turns 4:2:0 input into PPM output.
    pub decodes_yuv_as_ppm: bool,
}

impl CodecSpec {
    /// A codec with no restrictions.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            supported_depths: Vec::new(),
            requires_yuv420: false,
            hdr_capable: true,
            bypasses_conversion_for_classb: false,
            decode_ext_override: None,
            decodes_yuv_as_ppm: false,
        }
    }

    /// Restrict the accepted source bit depths.
    #[must_use]
    pub fn with_depths(mut self, depths: &[u8]) -> Self {
        self.supported_depths = depths.to_vec();
        self
    }

    /// Exclude the codec from HDR sweeps.
    #[must_use]
    pub fn sdr_only(mut self) -> Self {
        self.hdr_capable = false;
        self
    }

    /// Whether the codec accepts a source of this bit depth.
    #[must_use]
    pub fn supports_depth(&self, depth: u8) -> bool {
        self.supported_depths.is_empty() || self.supported_depths.contains(&depth)
    }

    /// Whether the (class, depth, format) combination is swept at all.
    #[must_use]
    pub fn supports(&self, class: ImageClass, depth: u8, format: PixelFormat) -> bool {
        if !self.supports_depth(depth) {
            return false;
        }
        if self.requires_yuv420 && format != PixelFormat::Yuv420p {
            return false;
        }
        if class.is_hdr() && !self.hdr_capable {
            return false;
        }
        true
    }
}

/// The default adapter roster with its capability entries.
#[must_use]
pub fn default_codecs() -> Vec<CodecSpec> {
    vec![
        CodecSpec::new("aom"),
        CodecSpec::new("deepcoder").with_depths(&[8]).sdr_only(),
        CodecSpec::new("deepcoder-lite").with_depths(&[8]).sdr_only(),
        CodecSpec::new("fuif"),
        CodecSpec::new("fvdo"),
        CodecSpec::new("hevc"),
        CodecSpec {
            decodes_yuv_as_ppm: true,
            ..CodecSpec::new("jpeg")
        },
        CodecSpec {
            bypasses_conversion_for_classb: true,
            ..CodecSpec::new("kakadu")
        },
        CodecSpec::new("pik"),
        CodecSpec::new("tat").with_depths(&[8]).sdr_only(),
        CodecSpec {
            requires_yuv420: true,
            decode_ext_override: Some(PixelFormat::Yuv420p),
            ..CodecSpec::new("webp").with_depths(&[8]).sdr_only()
        },
        CodecSpec::new("xavs").with_depths(&[8, 10]).sdr_only(),
        CodecSpec::new("xavs-fast").with_depths(&[8, 10]).sdr_only(),
        CodecSpec::new("xavs-median").with_depths(&[8, 10]).sdr_only(),
    ]
}

/// Full configuration for one sweep run.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Directory layout, rooted at the working directory.
    pub layout: Layout,
    /// External tool locations.
    pub tools: ToolPaths,
    /// Bit-rate targets to sweep per codec.
    pub bpp_targets: Vec<f64>,
    /// Codec capability table.
    pub codecs: Vec<CodecSpec>,
}

impl SweepConfig {
    /// Configuration with the default roster, targets and tool paths.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            layout: Layout::new(root),
            tools: ToolPaths::default(),
            bpp_targets: STANDARD_BPP_TARGETS.to_vec(),
            codecs: default_codecs(),
        }
    }

    /// Replace the codec roster.
    #[must_use]
    pub fn with_codecs(mut self, codecs: Vec<CodecSpec>) -> Self {
        self.codecs = codecs;
        self
    }

    /// Replace the bit-rate target set.
    #[must_use]
    pub fn with_bpp_targets(mut self, targets: Vec<f64>) -> Self {
        self.bpp_targets = targets;
        self
    }

    /// Replace the tool locations.
    #[must_use]
    pub fn with_tools(mut self, tools: ToolPaths) -> Self {
        self.tools = tools;
        self
    }

    /// Drop roster entries without a matching adapter name.
    pub fn retain_codecs(&mut self, available: &[String]) {
        self.codecs.retain(|c| available.iter().any(|a| a == &c.name));
    }
}

/// Render a bit-rate target the way it is embedded in artifact file names.
///
/// Path determinism only requires that the same target always renders the
/// same string.
#[must_use]
pub fn bpp_label(target: f64) -> String {
    format!("{target}")
}
