//! Printer state tracking.
//!
//! [`PrinterState`] replays every command's effect on the machine: absolute
//! position of X/Y/Z/E, units, positioning and extruder modes, selected tool
//! and sticky feedrate. Motion commands additionally yield a
//! [`MotionSegment`] whose start is the pre-command position.
//!
//! Internally everything is millimeters and absolute; inch input (G20) is
//! scaled on the way in, and the emitter scales back on the way out.

use crate::gcode::{Command, CommandKind, MotionSegment};
use crate::geometry::Point3F;
use crate::CoordF;

/// Tracks the printer's modal state across the stream.
#[derive(Debug, Clone)]
pub struct PrinterState {
    x: CoordF,
    y: CoordF,
    z: CoordF,
    e: CoordF,
    absolute_xyz: bool,
    absolute_e: bool,
    unit_scale: CoordF,
    feedrate: Option<CoordF>,
    tool: i64,
    g90_influences_extruder: bool,
}

impl PrinterState {
    /// Create a tracker in the conventional power-on state: absolute
    /// positioning, absolute extrusion, millimeters, tool 0, origin.
    pub fn new(g90_influences_extruder: bool) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            e: 0.0,
            absolute_xyz: true,
            absolute_e: true,
            unit_scale: 1.0,
            feedrate: None,
            tool: 0,
            g90_influences_extruder,
        }
    }

    /// Current absolute position (mm).
    pub fn position(&self) -> Point3F {
        Point3F::new(self.x, self.y, self.z)
    }

    /// Current absolute extruder position (mm).
    pub fn e_position(&self) -> CoordF {
        self.e
    }

    /// Current unit scale (1.0 for mm, 25.4 for inches).
    pub fn unit_scale(&self) -> CoordF {
        self.unit_scale
    }

    /// Current sticky feedrate in file units, if one has been set.
    pub fn feedrate(&self) -> Option<CoordF> {
        self.feedrate
    }

    /// Currently selected tool.
    pub fn tool(&self) -> i64 {
        self.tool
    }

    /// Whether XYZ words are currently absolute.
    pub fn absolute_xyz(&self) -> bool {
        self.absolute_xyz
    }

    /// Whether E words are currently absolute.
    pub fn absolute_e(&self) -> bool {
        self.absolute_e
    }

    /// Apply a command's effect. Returns a [`MotionSegment`] for G0/G1;
    /// G2/G3 update position but yield no segment (existing arcs are never
    /// re-fitted).
    pub fn apply(&mut self, command: &Command) -> Option<MotionSegment> {
        match command.kind {
            CommandKind::RapidMove | CommandKind::LinearMove => Some(self.apply_motion(command)),
            CommandKind::ArcCW | CommandKind::ArcCCW => {
                self.apply_motion(command);
                None
            }
            CommandKind::AbsolutePositioning => {
                self.absolute_xyz = true;
                if self.g90_influences_extruder {
                    self.absolute_e = true;
                }
                None
            }
            CommandKind::RelativePositioning => {
                self.absolute_xyz = false;
                if self.g90_influences_extruder {
                    self.absolute_e = false;
                }
                None
            }
            CommandKind::AbsoluteExtrusion => {
                self.absolute_e = true;
                None
            }
            CommandKind::RelativeExtrusion => {
                self.absolute_e = false;
                None
            }
            CommandKind::SetUnitsInches => {
                self.unit_scale = 25.4;
                None
            }
            CommandKind::SetUnitsMm => {
                self.unit_scale = 1.0;
                None
            }
            CommandKind::SetPosition => {
                for axis in ['X', 'Y', 'Z', 'E'] {
                    if let Some(param) = command.param(axis) {
                        if param.raw.is_empty() {
                            continue;
                        }
                        let value = param.value * self.unit_scale;
                        match axis {
                            'X' => self.x = value,
                            'Y' => self.y = value,
                            'Z' => self.z = value,
                            'E' => self.e = value,
                            _ => unreachable!(),
                        }
                    }
                }
                None
            }
            CommandKind::Home => {
                // Home offsets are firmware state we cannot see; the origin
                // is the conventional approximation.
                let axes: Vec<char> = command
                    .params
                    .iter()
                    .filter(|p| matches!(p.letter, 'X' | 'Y' | 'Z'))
                    .map(|p| p.letter)
                    .collect();
                if axes.is_empty() {
                    self.x = 0.0;
                    self.y = 0.0;
                    self.z = 0.0;
                } else {
                    for axis in axes {
                        match axis {
                            'X' => self.x = 0.0,
                            'Y' => self.y = 0.0,
                            'Z' => self.z = 0.0,
                            _ => unreachable!(),
                        }
                    }
                }
                None
            }
            CommandKind::ToolChange => {
                if let Some(value) = command.param_value('T') {
                    self.tool = value as i64;
                }
                None
            }
            CommandKind::Other => None,
        }
    }

    /// Shared position update for G0/G1/G2/G3.
    fn apply_motion(&mut self, command: &Command) -> MotionSegment {
        let start = self.position();
        let e_start = self.e;

        for axis in ['X', 'Y', 'Z'] {
            if let Some(param) = command.param(axis) {
                if param.raw.is_empty() {
                    continue;
                }
                let value = param.value * self.unit_scale;
                let target = if self.absolute_xyz {
                    value
                } else {
                    self.axis(axis) + value
                };
                match axis {
                    'X' => self.x = target,
                    'Y' => self.y = target,
                    'Z' => self.z = target,
                    _ => unreachable!(),
                }
            }
        }

        let mut has_e_word = false;
        if let Some(param) = command.param('E') {
            if !param.raw.is_empty() {
                has_e_word = true;
                let value = param.value * self.unit_scale;
                self.e = if self.absolute_e { value } else { self.e + value };
            }
        }

        let mut has_f_word = false;
        if let Some(param) = command.param('F') {
            if !param.raw.is_empty() {
                has_f_word = true;
                self.feedrate = Some(param.value);
            }
        }

        MotionSegment {
            start,
            end: self.position(),
            delta_e: self.e - e_start,
            e_end: self.e,
            has_e_word,
            feedrate: self.feedrate,
            has_f_word,
            kind: command.kind,
            command: command.clone(),
            unit_scale: self.unit_scale,
            absolute_xyz: self.absolute_xyz,
            absolute_e: self.absolute_e,
            tool: self.tool,
        }
    }

    fn axis(&self, axis: char) -> CoordF {
        match axis {
            'X' => self.x,
            'Y' => self.y,
            'Z' => self.z,
            _ => unreachable!(),
        }
    }
}
