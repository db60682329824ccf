//! G2/G3 line formatting.
//!
//! The emitter turns a [`FittedArc`] and the segments it replaces into a
//! single arc command in the source file's own terms: file units, the
//! positioning and extruder modes active when the window was built, the
//! trailing comment of the last consumed line, and per-axis precision either
//! fixed or tracked from the source words.

use crate::config::ConverterConfig;
use crate::gcode::{FittedArc, MotionSegment};
use crate::CoordF;

/// Formats fitted arcs as G-code lines.
#[derive(Debug)]
pub struct ArcEmitter {
    config: ConverterConfig,
}

impl ArcEmitter {
    /// Create an emitter for the given configuration.
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    /// Format an arc as a G2/G3 line, without a terminator.
    pub fn format_arc(&self, arc: &FittedArc, segments: &[MotionSegment]) -> String {
        let last = segments.last().expect("arc with no segments");
        let first = segments.first().expect("arc with no segments");
        let scale = last.unit_scale;

        let (xyz_precision, e_precision) = self.precisions(segments);
        let ij_precision = xyz_precision;

        let mut line = String::from(arc.direction.gcode_command());

        // X/Y end point: absolute, or a delta when the file is in G91 mode.
        let (x, y) = if last.absolute_xyz {
            (arc.end.x, arc.end.y)
        } else {
            (arc.end.x - arc.start.x, arc.end.y - arc.start.y)
        };
        push_word(&mut line, 'X', x / scale, xyz_precision);
        push_word(&mut line, 'Y', y / scale, xyz_precision);

        // Z only when the arc actually climbs.
        if arc.end.z != arc.start.z {
            let z = if last.absolute_xyz {
                arc.end.z
            } else {
                arc.end.z - arc.start.z
            };
            push_word(&mut line, 'Z', z / scale, xyz_precision);
        }

        // I/J are offsets from the arc start in both positioning modes.
        push_word(&mut line, 'I', arc.i() / scale, ij_precision);
        push_word(&mut line, 'J', arc.j() / scale, ij_precision);

        if segments.iter().any(|s| s.has_e_word) {
            let e = if last.absolute_e {
                arc.e_end
            } else {
                arc.delta_e
            };
            push_word(&mut line, 'E', e / scale, e_precision);
        }

        // The window holds a single feedrate; it only needs restating when
        // one of the consumed lines stated it.
        if segments.iter().any(|s| s.has_f_word) {
            if let Some(feedrate) = first.feedrate {
                let formatted = format_value(feedrate, 0);
                line.push_str(&format!(" F{}", formatted));
            }
        }

        if let Some(comment) = &last.command.comment {
            line.push(' ');
            line.push_str(comment);
        }

        line
    }

    /// Resolve the (xyz, e) precisions for a run of segments.
    fn precisions(&self, segments: &[MotionSegment]) -> (u8, u8) {
        if !self.config.allow_dynamic_precision {
            return (
                self.config.default_xyz_precision,
                self.config.default_e_precision,
            );
        }
        let mut xyz = 0;
        let mut e = 0;
        for segment in segments {
            for letter in ['X', 'Y', 'Z'] {
                if let Some(param) = segment.command.param(letter) {
                    xyz = xyz.max(param.decimals);
                }
            }
            if let Some(param) = segment.command.param('E') {
                e = e.max(param.decimals);
            }
        }
        (xyz.clamp(3, 6), e.clamp(3, 6))
    }
}

fn push_word(line: &mut String, letter: char, value: CoordF, precision: u8) {
    line.push(' ');
    line.push(letter);
    line.push_str(&format_value(value, precision));
}

fn format_value(value: CoordF, precision: u8) -> String {
    // Flush negative zero so a rounded -0.0001 never prints as "-0.000".
    let mut formatted = format!("{:.*}", precision as usize, value);
    if formatted.starts_with('-') && formatted[1..].chars().all(|c| c == '0' || c == '.') {
        formatted.remove(0);
    }
    formatted
}
