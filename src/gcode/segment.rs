//! Motion segments produced by the printer state tracker.

use crate::gcode::{Command, CommandKind};
use crate::geometry::Point3F;
use crate::CoordF;

/// Extrusion polarity of a segment. Windows never mix polarities, and
/// retractions are never fitted at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtrusionPolarity {
    /// Positive extrusion delta.
    Extrude,
    /// No extrusion (travel move).
    Travel,
    /// Negative extrusion delta (retraction).
    Retract,
}

impl ExtrusionPolarity {
    /// Classify an extrusion delta.
    pub fn from_delta(delta_e: CoordF) -> Self {
        if delta_e > 0.0 {
            ExtrusionPolarity::Extrude
        } else if delta_e < 0.0 {
            ExtrusionPolarity::Retract
        } else {
            ExtrusionPolarity::Travel
        }
    }
}

/// One linear motion: the position change produced by a single G0/G1.
///
/// Coordinates are millimeters in absolute machine space regardless of the
/// source file's units and positioning mode; the fields below carry enough
/// of the source context to format an equivalent arc back in the file's own
/// terms.
#[derive(Debug, Clone)]
pub struct MotionSegment {
    /// Position before the command.
    pub start: Point3F,
    /// Position after the command.
    pub end: Point3F,
    /// Extrusion delta (mm of filament).
    pub delta_e: CoordF,
    /// Absolute E position after the command (mm).
    pub e_end: CoordF,
    /// Whether the source command carried an E word.
    pub has_e_word: bool,
    /// Effective sticky feedrate, in file units.
    pub feedrate: Option<CoordF>,
    /// Whether the source command carried an F word.
    pub has_f_word: bool,
    /// G0 or G1.
    pub kind: CommandKind,
    /// The source command, kept verbatim for flush-as-lines.
    pub command: Command,
    /// Units scale of the source file (1.0 for mm, 25.4 for inches).
    pub unit_scale: CoordF,
    /// Positioning mode at the time of the move.
    pub absolute_xyz: bool,
    /// Extruder mode at the time of the move.
    pub absolute_e: bool,
    /// Selected tool.
    pub tool: i64,
}

impl MotionSegment {
    /// Full 3D length of the segment (mm).
    #[inline]
    pub fn length(&self) -> CoordF {
        self.start.distance_to(self.end)
    }

    /// Length of the XY projection (mm).
    #[inline]
    pub fn xy_length(&self) -> CoordF {
        self.start.xy().distance_to(self.end.xy())
    }

    /// Z change over the segment (mm).
    #[inline]
    pub fn delta_z(&self) -> CoordF {
        self.end.z - self.start.z
    }

    /// Extrusion polarity of the segment.
    #[inline]
    pub fn polarity(&self) -> ExtrusionPolarity {
        ExtrusionPolarity::from_delta(self.delta_e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcode::LineEnding;

    fn make_segment(start: Point3F, end: Point3F, delta_e: CoordF) -> MotionSegment {
        MotionSegment {
            start,
            end,
            delta_e,
            e_end: delta_e.max(0.0),
            has_e_word: delta_e != 0.0,
            feedrate: Some(1800.0),
            has_f_word: false,
            kind: CommandKind::LinearMove,
            command: Command::parse("G1 X1 Y1", 1, LineEnding::Lf),
            unit_scale: 1.0,
            absolute_xyz: true,
            absolute_e: true,
            tool: 0,
        }
    }

    #[test]
    fn test_polarity() {
        assert_eq!(ExtrusionPolarity::from_delta(0.1), ExtrusionPolarity::Extrude);
        assert_eq!(ExtrusionPolarity::from_delta(0.0), ExtrusionPolarity::Travel);
        assert_eq!(
            ExtrusionPolarity::from_delta(-0.5),
            ExtrusionPolarity::Retract
        );
    }

    #[test]
    fn test_lengths() {
        let seg = make_segment(
            Point3F::new(0.0, 0.0, 0.0),
            Point3F::new(3.0, 4.0, 12.0),
            0.2,
        );
        assert!((seg.length() - 13.0).abs() < 1e-12);
        assert!((seg.xy_length() - 5.0).abs() < 1e-12);
        assert!((seg.delta_z() - 12.0).abs() < 1e-12);
    }
}
