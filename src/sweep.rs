//! The sweep orchestrator.
//!
//! Per image: classify, create derivatives, then fan the independent
//! (codec, bit-rate target) tuples out over a worker pool. Each tuple walks
//! encode -> decode -> bridge -> metrics; any missing artifact drops the
//! tuple without touching the rest of the sweep. Results are joined into
//! the per-derivative matrix only after all tuples complete, then persisted
//! as one JSON file per (image, pixel format).

use std::path::Path;

use rayon::prelude::*;

use crate::bridge;
use crate::cache::PathLocks;
use crate::classify::{self, ImageClass, SourceImage};
use crate::config::{CodecSpec, PixelFormat, SweepConfig};
use crate::decode;
use crate::derivative::{self, DerivativeImage};
use crate::encode;
use crate::error::{Error, Result};
use crate::metrics;
use crate::report::{self, ResultMatrix, SweepRecord};
use crate::tool;

/// A configured sweep over one corpus class directory.
pub struct Sweep {
    config: SweepConfig,
    locks: PathLocks,
}

impl Sweep {
    /// Create a sweep with the given configuration.
    #[must_use]
    pub fn new(config: SweepConfig) -> Self {
        Self {
            config,
            locks: PathLocks::new(),
        }
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Sweep every image in a class-labeled corpus directory.
    ///
    /// The directory name carries the class tag. Returns the records of all
    /// newly computed tuples; derivatives whose result JSON already exists
    /// are skipped wholesale.
    pub fn run_corpus(&self, class_dir: &Path) -> Result<Vec<SweepRecord>> {
        let class_name = class_dir
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        let class = ImageClass::from_dir_name(class_name);

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(class_dir)? {
            let path = entry?.path();
            if path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();
        if paths.is_empty() {
            return Err(Error::Preflight(format!(
                "no source files in `{}`",
                class_dir.display()
            )));
        }

        let mut records = Vec::new();
        for path in &paths {
            // A fully swept source is recognized from its result JSONs
            // alone, before any probing shells out.
            if let Some(jsons) = self.result_json_paths(class, path) {
                if jsons.iter().all(|p| p.is_file()) {
                    for json in &jsons {
                        tool::progress("JSON OK", json.display());
                    }
                    continue;
                }
            }
            let image = classify::probe_source(&self.config.tools, path, class)?;
            records.extend(self.run_image(&image)?);
        }
        Ok(records)
    }

    /// Result JSON paths a fully swept source would leave behind, derived
    /// from the filename and class only. `None` when the extension is not
    /// one the pipeline handles; probing reports that case properly.
    fn result_json_paths(&self, class: ImageClass, path: &Path) -> Option<Vec<std::path::PathBuf>> {
        let stem = path.file_stem()?.to_str()?;
        let native = PixelFormat::from_extension(path.extension()?.to_str()?)?;

        let mut formats = if class.is_class_b() {
            vec![PixelFormat::Ppm]
        } else {
            vec![PixelFormat::Yuv420p, native]
        };
        formats.dedup();

        let metrics_dir = self.config.layout.metrics_dir();
        Some(
            formats
                .into_iter()
                .map(|format| metrics_dir.join(format!("{stem}.{}.json", format.label())))
                .collect(),
        )
    }

    /// Sweep one classified source image across all codecs and targets.
    pub fn run_image(&self, image: &SourceImage) -> Result<Vec<SweepRecord>> {
        let derivatives = derivative::create_derivatives(&self.config, &self.locks, image)?;
        let mut records = Vec::new();

        for derivative in &derivatives {
            let stem = derivative
                .path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default();
            let json_path = self
                .config
                .layout
                .metrics_dir()
                .join(format!("{stem}.{}.json", derivative.format.label()));
            if json_path.is_file() {
                tool::progress("JSON OK", json_path.display());
                continue;
            }

            let tuples: Vec<(&CodecSpec, f64)> = self
                .config
                .codecs
                .iter()
                .filter(|codec| codec.supports(image.class, image.bit_depth, derivative.format))
                .flat_map(|codec| {
                    self.config
                        .bpp_targets
                        .iter()
                        .map(move |&target| (codec, target))
                })
                .collect();

            let results: Vec<SweepRecord> = tuples
                .par_iter()
                .filter_map(
                    |&(codec, target)| match self.eval_tuple(image, derivative, codec, target) {
                        Ok(result) => result,
                        Err(e) => {
                            tool::failure(&e);
                            None
                        }
                    },
                )
                .collect();

            let mut matrix = ResultMatrix::new();
            for record in &results {
                matrix
                    .entry(record.codec.clone())
                    .or_default()
                    .insert(format!("{}", record.measured_bpp), record.metrics.clone());
            }
            report::write_matrix(&json_path, &derivative.path.display().to_string(), &matrix)?;
            records.extend(results);
        }
        Ok(records)
    }

    /// Walk one tuple through encode, decode, bridging and metrics.
    ///
    /// `Ok(None)` means the tuple was abandoned (soft encode/decode failure
    /// or a missing artifact at the metrics stage); `Err` is a hard metric
    /// failure for this tuple only.
    fn eval_tuple(
        &self,
        image: &SourceImage,
        derivative: &DerivativeImage,
        codec: &CodecSpec,
        target: f64,
    ) -> Result<Option<SweepRecord>> {
        // classB bypass codecs encode the source directly in its native format.
        let (input, format) = if codec.bypasses_conversion_for_classb && image.class.is_class_b() {
            (image.path.as_path(), image.native_format)
        } else {
            (derivative.path.as_path(), derivative.format)
        };

        let Some(encoded) = encode::encode(
            &self.config,
            &self.locks,
            codec,
            target,
            input,
            image.width,
            image.height,
            format,
            image.bit_depth,
        )?
        else {
            return Ok(None);
        };

        let decode_format = if codec.decodes_yuv_as_ppm && format == PixelFormat::Yuv420p {
            PixelFormat::Ppm
        } else {
            format
        };
        let Some(decoded) = decode::decode(
            &self.config,
            &self.locks,
            codec,
            &encoded,
            image.width,
            image.height,
            decode_format,
            image.bit_depth,
        )?
        else {
            return Ok(None);
        };

        // Only plain SDR content is bridged to a common 4:4:4 pair. The
        // bridge profile follows the container actually on disk.
        let (reference, distorted) = if image.class == ImageClass::Sdr {
            let distorted = bridge::bridge_to_yuv444(
                &self.config,
                &self.locks,
                &decoded.path,
                image.width,
                image.height,
                image.bit_depth,
                decoded.format == PixelFormat::Yuv420p,
            )?;
            let reference = bridge::bridge_to_yuv444(
                &self.config,
                &self.locks,
                input,
                image.width,
                image.height,
                image.bit_depth,
                format == PixelFormat::Yuv420p,
            )?;
            (reference, distorted)
        } else {
            (input.to_path_buf(), decoded.path.clone())
        };

        let metric_map = match metrics::compute(
            &self.config,
            &self.locks,
            image.class,
            &reference,
            &distorted,
            image.width,
            image.height,
            image.bit_depth,
        ) {
            Ok(map) => map,
            Err(Error::MissingArtifact { path }) => {
                tool::failure(format!("missing artifact: {}", path.display()));
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        Ok(Some(SweepRecord {
            image: derivative.path.display().to_string(),
            pix_fmt: derivative.format.label().to_string(),
            codec: codec.name.clone(),
            bpp_target: target,
            measured_bpp: encoded.measured_bpp(image.width, image.height),
            metrics: metric_map,
        }))
    }
}

#[cfg(test)]
#[cfg(unix)]
mod tests {
    use super::*;
    use crate::config::ToolPaths;
    use std::path::PathBuf;

    /// Write an executable stub that records each call in `<path>.calls`.
    fn write_stub(path: &Path, body: &str) {
        use std::os::unix::fs::PermissionsExt;
        std::fs::write(path, format!("#!/bin/sh\necho run >> \"$0.calls\"\n{body}\n")).unwrap();
        let mut perms = std::fs::metadata(path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(path, perms).unwrap();
    }

    fn call_count(path: &Path) -> usize {
        std::fs::read_to_string(PathBuf::from(format!("{}.calls", path.display())))
            .map(|s| s.lines().count())
            .unwrap_or(0)
    }

    /// A working directory with stub adapters and stub external tools.
    fn stub_config(root: &Path) -> SweepConfig {
        let tools_dir = root.join("tools");
        std::fs::create_dir_all(&tools_dir).unwrap();
        std::fs::create_dir_all(root.join("encode")).unwrap();
        std::fs::create_dir_all(root.join("decode")).unwrap();

        write_stub(
            &root.join("encode").join("copy"),
            "printf 'encdata' > \"$2\"",
        );
        write_stub(
            &root.join("decode").join("copy"),
            "printf 'decdata' > \"$2\"",
        );

        let hdrconvert = tools_dir.join("hdrconvert");
        write_stub(
            &hdrconvert,
            r#"for a in "$@"; do case "$a" in OutputFile=*) printf 'converted' > "${a#OutputFile=}";; esac; done"#,
        );
        let hdrmetrics = tools_dir.join("hdrmetrics");
        write_stub(
            &hdrmetrics,
            r#"for a in "$@"; do case "$a" in LogFile=*) printf '000000 42.0 38.0 36.0 0.991 0 0 0.985\n' > "${a#LogFile=}";; esac; done"#,
        );
        let difftest = tools_dir.join("difftest_ng");
        write_stub(&difftest, "printf 'ppmdata' > \"$2\"");

        let tools = ToolPaths {
            identify: tools_dir.join("identify"),
            ffmpeg: tools_dir.join("ffmpeg"),
            hdrconvert,
            hdrmetrics,
            difftest_ng: difftest,
            convert_configs: root.join("convert_configs"),
        };

        SweepConfig::new(root)
            .with_tools(tools)
            .with_codecs(vec![CodecSpec::new("copy")])
            .with_bpp_targets(vec![1.0])
    }

    fn sdr_source(root: &Path) -> SourceImage {
        let dir = root.join("images").join("classA");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("img.ppm");
        std::fs::write(&path, b"P6 fake ppm payload").unwrap();
        SourceImage {
            path,
            class: ImageClass::Sdr,
            width: 16,
            height: 16,
            bit_depth: 10,
            native_format: PixelFormat::Ppm,
        }
    }

    #[test]
    fn sdr_sweep_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let config = stub_config(root);
        let sweep = Sweep::new(config);
        let image = sdr_source(root);

        let records = sweep.run_image(&image).unwrap();
        // One record per swept derivative: 4:2:0 and native PPM.
        assert_eq!(records.len(), 2);

        for record in &records {
            assert_eq!(record.codec, "copy");
            assert_eq!(record.bpp_target, 1.0);
            // "encdata" is 7 bytes
            let expected = 7.0 * 1.024 * 8.0 / (16.0 * 16.0);
            assert_eq!(record.measured_bpp, expected);
            assert_eq!(record.metrics["psnr_y"], 42.0);
            assert_eq!(record.metrics["psnr_avg"], (6.0 * 42.0 + 38.0 + 36.0) / 8.0);
            assert_eq!(record.metrics["ms_ssim"], 0.991);
            assert_eq!(record.metrics["ssim"], 0.985);
            // 10-bit source: no VMAF supplement
            assert!(!record.metrics.contains_key("vmaf"));
        }

        assert!(root.join("metrics").join("img.yuv420p.json").is_file());
        assert!(root.join("metrics").join("img.ppm.json").is_file());
        assert!(
            root.join("outputs")
                .join("copy")
                .join("img_1_yuv420p.copy")
                .is_file()
        );
    }

    #[test]
    fn warm_cache_runs_no_tools() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let config = stub_config(root);
        let encode_stub = root.join("encode").join("copy");
        let hdrconvert = config.tools.hdrconvert.clone();
        let hdrmetrics = config.tools.hdrmetrics.clone();
        let sweep = Sweep::new(config);
        let image = sdr_source(root);

        sweep.run_image(&image).unwrap();
        let json_path = root.join("metrics").join("img.yuv420p.json");
        let first_json = std::fs::read(&json_path).unwrap();
        let counts = (
            call_count(&encode_stub),
            call_count(&hdrconvert),
            call_count(&hdrmetrics),
        );

        // Warm cache: every derivative's result JSON exists, so nothing runs.
        let records = sweep.run_image(&image).unwrap();
        assert!(records.is_empty());
        assert_eq!(
            (
                call_count(&encode_stub),
                call_count(&hdrconvert),
                call_count(&hdrmetrics),
            ),
            counts
        );
        assert_eq!(std::fs::read(&json_path).unwrap(), first_json);
    }

    #[test]
    fn warm_corpus_skips_source_probing() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let config = stub_config(root);
        write_stub(&config.tools.identify, "printf '16,16,10'");
        let identify = config.tools.identify.clone();
        let hdrconvert = config.tools.hdrconvert.clone();
        let sweep = Sweep::new(config);

        let corpus = root.join("images").join("classA");
        std::fs::create_dir_all(&corpus).unwrap();
        std::fs::write(corpus.join("img.ppm"), b"P6 fake ppm payload").unwrap();

        let records = sweep.run_corpus(&corpus).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(call_count(&identify), 1);
        let convert_calls = call_count(&hdrconvert);

        // Warm cache: the result JSONs alone satisfy the sweep, so not even
        // the probing tool runs.
        let records = sweep.run_corpus(&corpus).unwrap();
        assert!(records.is_empty());
        assert_eq!(call_count(&identify), 1);
        assert_eq!(call_count(&hdrconvert), convert_calls);
    }

    #[test]
    fn capability_skip_creates_no_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        // webp-like entry: 8-bit 4:2:0 only, against a 10-bit source.
        let config = stub_config(root).with_codecs(vec![
            CodecSpec::new("webp").with_depths(&[8]),
        ]);
        let sweep = Sweep::new(config);
        let image = sdr_source(root);

        let records = sweep.run_image(&image).unwrap();
        assert!(records.is_empty());
        assert!(!root.join("outputs").join("webp").exists());
    }

    #[test]
    fn empty_encode_output_is_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let config = stub_config(root);
        // Adapter that "succeeds" but emits a zero-byte file.
        write_stub(&root.join("encode").join("copy"), ": > \"$2\"");
        let locks = PathLocks::new();
        let image = sdr_source(root);

        let codec = CodecSpec::new("copy");
        let result = encode::encode(
            &config,
            &locks,
            &codec,
            1.0,
            &image.path,
            image.width,
            image.height,
            PixelFormat::Ppm,
            image.bit_depth,
        )
        .unwrap();
        assert!(result.is_none());
        assert!(!root.join("outputs").join("copy").join("img_1_ppm.copy").exists());
    }

    #[test]
    fn empty_decode_output_is_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let config = stub_config(root);
        write_stub(&root.join("decode").join("copy"), ": > \"$2\"");
        let locks = PathLocks::new();
        let image = sdr_source(root);

        let codec = CodecSpec::new("copy");
        let encoded = encode::encode(
            &config,
            &locks,
            &codec,
            1.0,
            &image.path,
            image.width,
            image.height,
            PixelFormat::Ppm,
            image.bit_depth,
        )
        .unwrap()
        .unwrap();
        let decoded = decode::decode(
            &config,
            &locks,
            &codec,
            &encoded,
            image.width,
            image.height,
            PixelFormat::Ppm,
            image.bit_depth,
        )
        .unwrap();
        assert!(decoded.is_none());
        assert!(
            !root
                .join("outputs")
                .join("copy")
                .join("decoded")
                .join("img_1_ppm.copy.ppm")
                .exists()
        );
    }

    #[test]
    fn missing_bridge_output_soft_skips_tuple() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let config = stub_config(root);
        // Conversion tool that reports success but writes nothing.
        write_stub(&config.tools.hdrconvert, ":");
        let sweep = Sweep::new(config);
        let image = sdr_source(root);

        let records = sweep.run_image(&image).unwrap();
        assert!(records.is_empty());
        // The sweep completes and persists empty matrices.
        assert!(root.join("metrics").join("img.yuv420p.json").is_file());
        assert!(root.join("metrics").join("img.ppm.json").is_file());
    }

    #[test]
    fn failing_encode_adapter_is_soft() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let config = stub_config(root);
        write_stub(&root.join("encode").join("copy"), "exit 3");
        let locks = PathLocks::new();
        let image = sdr_source(root);

        let codec = CodecSpec::new("copy");
        let result = encode::encode(
            &config,
            &locks,
            &codec,
            0.25,
            &image.path,
            image.width,
            image.height,
            PixelFormat::Ppm,
            image.bit_depth,
        )
        .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn sdr_8bit_merges_vmaf_supplement() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let config = stub_config(root).with_codecs(vec![CodecSpec {
            requires_yuv420: true,
            ..CodecSpec::new("copy")
        }]);
        write_stub(
            &config.tools.ffmpeg,
            r#"for a in "$@"; do case "$a" in *log_path=*) printf '{"frames":[{"metrics":{"vmaf":93.4,"vif_scale0":0.7}}]}' > "${a#*log_path=}";; esac; done"#,
        );
        let sweep = Sweep::new(config);
        let mut image = sdr_source(root);
        image.bit_depth = 8;

        let records = sweep.run_image(&image).unwrap();
        // Only the 4:2:0 derivative is eligible.
        assert_eq!(records.len(), 1);
        for key in ["vmaf", "vif", "ssim", "ms_ssim", "psnr_y", "psnr_cb", "psnr_cr"] {
            assert!(records[0].metrics.contains_key(key), "missing {key}");
        }
    }

    #[test]
    fn hdr_sweep_bridges_to_exr() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let config = stub_config(root);
        // Tone-aware log row: columns 5 and 9 carry the HDR metrics.
        write_stub(
            &config.tools.hdrmetrics,
            r#"for a in "$@"; do case "$a" in LogFile=*) printf '000000 0 0 0 0 51.3 0 0 0 0.973\n' > "${a#LogFile=}";; esac; done"#,
        );
        let sweep = Sweep::new(config);

        let src_dir = root.join("images").join("classE");
        std::fs::create_dir_all(&src_dir).unwrap();
        let path = src_dir.join("scene_8x8_10bit.yuv");
        std::fs::write(&path, b"raw planar payload").unwrap();
        let image = SourceImage {
            path,
            class: ImageClass::ClassE,
            width: 8,
            height: 8,
            bit_depth: 10,
            native_format: PixelFormat::Yuv420p,
        };

        let records = sweep.run_image(&image).unwrap();
        // Derivative and native source share stem and format, so the second
        // sweep is satisfied by the first one's result JSON.
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].metrics["psnr-y"], 51.3);
        assert_eq!(records[0].metrics["ms_ssim"], 0.973);
        assert!(records[0].metrics.len() == 2);
        assert!(root.join("objective_images").join("YUV_EXR").is_dir());
    }

    #[test]
    fn class_b_produces_only_ppm_derivative() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let config = stub_config(root);
        let locks = PathLocks::new();

        let src_dir = root.join("images").join("classB");
        std::fs::create_dir_all(&src_dir).unwrap();
        let path = src_dir.join("broadcast.tif");
        std::fs::write(&path, b"tif payload").unwrap();
        let image = SourceImage {
            path,
            class: ImageClass::ClassB,
            width: 16,
            height: 16,
            bit_depth: 8,
            native_format: PixelFormat::Tif,
        };

        let derivatives = derivative::create_derivatives(&config, &locks, &image).unwrap();
        assert_eq!(derivatives.len(), 1);
        assert_eq!(derivatives[0].format, PixelFormat::Ppm);
        assert!(derivatives[0].path.is_file());
        // No 4:2:0 derivative for the legacy class.
        assert!(!root.join("derivative_images").join("yuv420p").exists());
    }
}
