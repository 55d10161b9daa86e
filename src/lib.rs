//! # codec-sweep
//!
//! Batch image codec evaluation driven by external tools.
//!
//! The pipeline sweeps a corpus of reference images across a roster of codec
//! adapters and a fixed set of bit-rate targets. For every (image, pixel
//! format, codec, target) tuple it encodes, decodes, bridges the pair into a
//! common comparison format and computes objective quality metrics, then
//! persists a per-image JSON matrix plus a run-level CSV summary.
//!
//! Every intermediate artifact has a deterministic path and is cached by
//! existence, so interrupted runs resume where they left off.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use codec_sweep::{Sweep, SweepConfig};
//!
//! let sweep = Sweep::new(SweepConfig::new("./work"));
//! let records = sweep.run_corpus(Path::new("./images/classA"))?;
//! ```
//!
//! ## Modules
//!
//! - [`error`]: Error types for the library
//! - [`config`]: Layout, tool paths, and the codec capability table
//! - [`classify`]: Image class tags and source probing
//! - [`cache`]: Race-safe cache-by-existence
//! - [`derivative`]: Canonical intermediate generation
//! - [`encode`] / [`decode`]: Adapter orchestration
//! - [`bridge`] / [`convert`]: Format bridging via HDRConvert
//! - [`metrics`]: Objective metric strategies (ffmpeg, HDRMetrics)
//! - [`sweep`]: The tuple fan-out orchestrator
//! - [`report`]: JSON matrix and CSV summary persistence

pub mod bridge;
pub mod cache;
pub mod classify;
pub mod config;
pub mod convert;
pub mod decode;
pub mod derivative;
pub mod encode;
pub mod error;
pub mod metrics;
pub mod report;
pub mod sweep;
pub mod tool;

// Re-export commonly used types
pub use cache::{CacheOutcome, PathLocks};
pub use classify::{ImageClass, SourceImage};
pub use config::{
    CodecSpec, Layout, PixelFormat, STANDARD_BPP_TARGETS, SweepConfig, ToolPaths, default_codecs,
};
pub use decode::DecodedArtifact;
pub use derivative::DerivativeImage;
pub use encode::EncodedArtifact;
pub use error::{Error, Result};
pub use metrics::MetricMap;
pub use report::{ResultMatrix, SweepRecord};
pub use sweep::Sweep;
