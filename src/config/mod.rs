//! Converter configuration types.
//!
//! [`ConverterConfig`] carries every knob of the arc fitter and emitter.
//! Out-of-range values never abort a conversion: [`ConverterConfig::validate`]
//! clamps them to safe bounds and logs a warning for each adjustment.

use log::warn;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::{CoordF, Error, Result};

/// Default maximum point-to-circle deviation (mm).
pub const DEFAULT_RESOLUTION_MM: CoordF = 0.05;
/// Default aggregate path-length tolerance (percent).
pub const DEFAULT_PATH_TOLERANCE_PERCENT: CoordF = 5.0;
/// Hard cap for the arc radius (mm). Radii beyond this are indistinguishable
/// from straight lines at printer scale.
pub const DEFAULT_MAX_RADIUS_MM: CoordF = 1_000_000.0;
/// Default decimals for X/Y/Z/I/J words.
pub const DEFAULT_XYZ_PRECISION: u8 = 3;
/// Default decimals for E words.
pub const DEFAULT_E_PRECISION: u8 = 5;
/// Default sweep cap (radians). A full circle emits as two half arcs.
pub const DEFAULT_MAX_ARC_ANGLE: CoordF = PI;

/// Logging verbosity of a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Noset,
    Verbose,
    Debug,
    #[default]
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    /// Map onto the `log` crate's filter levels.
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Noset | LogLevel::Verbose => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warning => log::LevelFilter::Warn,
            LogLevel::Error | LogLevel::Critical => log::LevelFilter::Error,
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "noset" => Ok(LogLevel::Noset),
            "verbose" => Ok(LogLevel::Verbose),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warning" | "warn" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            "critical" => Ok(LogLevel::Critical),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Noset => "noset",
            LogLevel::Verbose => "verbose",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::Critical => "critical",
        };
        f.write_str(name)
    }
}

/// Configuration for a conversion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Maximum deviation of any source endpoint from the fitted circle (mm).
    pub resolution_mm: CoordF,

    /// Maximum relative difference between the arc length and the original
    /// polyline length, in percent.
    pub path_tolerance_percent: CoordF,

    /// Hard radius cap (mm). Clamped to [`DEFAULT_MAX_RADIUS_MM`].
    pub max_radius_mm: CoordF,

    /// Firmware compensation: defer arcs whose implied segment count at
    /// `mm_per_arc_segment` resolution falls below this. 0 disables.
    pub min_arc_segments: u32,

    /// Segment length basis for `min_arc_segments` (mm). 0 disables.
    pub mm_per_arc_segment: CoordF,

    /// Whether G90/G91 also switch the extruder mode.
    pub g90_g91_influences_extruder: bool,

    /// Permit arcs with a monotone linear Z progression (helices).
    pub allow_3d_arcs: bool,

    /// Use the maximum precision observed in the consumed lines instead of
    /// the fixed defaults.
    pub allow_dynamic_precision: bool,

    /// Default decimals for X/Y/Z/I/J words. Clamped to [3, 6].
    pub default_xyz_precision: u8,

    /// Default decimals for E words. Clamped to [3, 6].
    pub default_e_precision: u8,

    /// Maximum sweep of a single arc (radians). Arcs that would exceed this
    /// split, so a closed circle emits as two half arcs.
    pub max_arc_angle: CoordF,

    /// Logging verbosity.
    pub log_level: LogLevel,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            resolution_mm: DEFAULT_RESOLUTION_MM,
            path_tolerance_percent: DEFAULT_PATH_TOLERANCE_PERCENT,
            max_radius_mm: DEFAULT_MAX_RADIUS_MM,
            min_arc_segments: 0,
            mm_per_arc_segment: 0.0,
            g90_g91_influences_extruder: false,
            allow_3d_arcs: false,
            allow_dynamic_precision: false,
            default_xyz_precision: DEFAULT_XYZ_PRECISION,
            default_e_precision: DEFAULT_E_PRECISION,
            max_arc_angle: DEFAULT_MAX_ARC_ANGLE,
            log_level: LogLevel::Info,
        }
    }
}

impl ConverterConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let mut config: ConverterConfig = serde_json::from_str(&text)
            .map_err(|e| Error::Config(format!("{}: {}", path.as_ref().display(), e)))?;
        config.validate();
        Ok(config)
    }

    /// Builder: set the resolution (mm).
    pub fn resolution_mm(mut self, resolution: CoordF) -> Self {
        self.resolution_mm = resolution;
        self
    }

    /// Builder: set the path tolerance (percent).
    pub fn path_tolerance_percent(mut self, tolerance: CoordF) -> Self {
        self.path_tolerance_percent = tolerance;
        self
    }

    /// Builder: set the radius cap (mm).
    pub fn max_radius_mm(mut self, radius: CoordF) -> Self {
        self.max_radius_mm = radius;
        self
    }

    /// Builder: enable or disable 3D arcs.
    pub fn allow_3d_arcs(mut self, allow: bool) -> Self {
        self.allow_3d_arcs = allow;
        self
    }

    /// Builder: enable or disable dynamic precision.
    pub fn allow_dynamic_precision(mut self, allow: bool) -> Self {
        self.allow_dynamic_precision = allow;
        self
    }

    /// Clamp every field into its legal range, logging a warning for each
    /// adjustment. Never fails: a configuration is always usable afterwards.
    pub fn validate(&mut self) {
        if self.resolution_mm <= 0.0 {
            warn!(
                "resolution_mm {} is not positive, using default {}",
                self.resolution_mm, DEFAULT_RESOLUTION_MM
            );
            self.resolution_mm = DEFAULT_RESOLUTION_MM;
        }
        if self.path_tolerance_percent < 0.0 {
            warn!(
                "path_tolerance_percent {} is negative, using default {}",
                self.path_tolerance_percent, DEFAULT_PATH_TOLERANCE_PERCENT
            );
            self.path_tolerance_percent = DEFAULT_PATH_TOLERANCE_PERCENT;
        }
        if self.max_radius_mm <= 0.0 || self.max_radius_mm > DEFAULT_MAX_RADIUS_MM {
            warn!(
                "max_radius_mm {} out of range, clamping to {}",
                self.max_radius_mm, DEFAULT_MAX_RADIUS_MM
            );
            self.max_radius_mm = DEFAULT_MAX_RADIUS_MM;
        }
        if self.mm_per_arc_segment < 0.0 {
            warn!("mm_per_arc_segment is negative, disabling the firmware minimum-segment rule");
            self.mm_per_arc_segment = 0.0;
        }
        let xyz = self.default_xyz_precision.clamp(3, 6);
        if xyz != self.default_xyz_precision {
            warn!(
                "default_xyz_precision {} clamped to {}",
                self.default_xyz_precision, xyz
            );
            self.default_xyz_precision = xyz;
        }
        let e = self.default_e_precision.clamp(3, 6);
        if e != self.default_e_precision {
            warn!(
                "default_e_precision {} clamped to {}",
                self.default_e_precision, e
            );
            self.default_e_precision = e;
        }
        if self.max_arc_angle <= 0.0 || self.max_arc_angle > 2.0 * PI {
            warn!(
                "max_arc_angle {} out of range, using default {}",
                self.max_arc_angle, DEFAULT_MAX_ARC_ANGLE
            );
            self.max_arc_angle = DEFAULT_MAX_ARC_ANGLE;
        }
    }
}
