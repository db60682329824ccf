//! G-code processing module.
//!
//! This module provides the command model, printer state tracking, the
//! incremental arc fitter and the G2/G3 emitter that together implement the
//! conversion of linear-move runs into arc commands.

pub mod arc_fitting;
mod command;
mod emitter;
mod segment;
mod state;

pub use arc_fitting::{ArcDirection, ArcFitter, Emission, FittedArc, SegmentWindow};
pub use command::{Command, CommandKind, LineEnding, Parameter};
pub use emitter::ArcEmitter;
pub use segment::{ExtrusionPolarity, MotionSegment};
pub use state::PrinterState;
