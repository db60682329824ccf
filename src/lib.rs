//! # ArcWelder
//!
//! A G-code post-processor that detects runs of short linear moves (G0/G1)
//! approximating circular paths and replaces them with single G2/G3 arc
//! commands, within a configurable tolerance envelope.
//!
//! This library provides the complete conversion pipeline:
//! - Line-oriented G-code parsing that preserves raw text and terminators
//! - Printer state tracking (position, units, positioning/extrusion modes)
//! - Incremental arc fitting over a sliding window of motion segments
//! - G2/G3 emission with configurable per-axis precision
//! - A streaming driver with progress reporting and cancellation
//!
//! ## Example
//!
//! ```rust,ignore
//! use arcwelder::{ConverterConfig, GCodeConverter};
//!
//! let config = ConverterConfig::default().resolution_mm(0.05);
//! let mut converter = GCodeConverter::new(config);
//! let result = converter.convert_file("input.gcode", "output.gcode")?;
//! println!("arcs emitted: {}", result.progress.arcs_emitted);
//! ```

// Core modules
pub mod config;
pub mod convert;
pub mod gcode;
pub mod geometry;

// Re-export commonly used types
pub use config::{ConverterConfig, LogLevel};
pub use convert::{ConvertResult, GCodeConverter, Progress};
pub use gcode::{
    ArcDirection, ArcEmitter, ArcFitter, Command, CommandKind, ExtrusionPolarity, FittedArc,
    LineEnding, MotionSegment, PrinterState, SegmentWindow,
};
pub use geometry::{Circle, Point3F, PointF};

/// Floating-point coordinate type used throughout the converter.
pub type CoordF = f64;

/// Result type used throughout the converter.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for conversion operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Input error: {0}")]
    Input(String),

    #[error("Output error: {0}")]
    Output(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error at line {line}: {message}")]
    Internal { line: usize, message: String },
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
