//! Incremental arc fitting over a sliding window of motion segments.
//!
//! The fitter grows a window of consecutive G0/G1 segments while a single
//! circular arc can still replace all of them within tolerance. When growth
//! fails, the largest accepted arc is emitted and the rejecting segment seeds
//! the next window; windows that never qualify drain from the front as
//! verbatim lines.
//!
//! The circle hypothesis is always refit from three representative points:
//! the window's first endpoint, its last endpoint, and the interior endpoint
//! nearest the polyline-length midpoint, which keeps the fit stable when
//! short segments cluster at one end.

use log::debug;

use crate::config::ConverterConfig;
use crate::gcode::{ExtrusionPolarity, MotionSegment};
use crate::geometry::{cross2f, Circle, Point3F, PointF};
use crate::CoordF;

/// Angular slack when comparing sweeps against the configured cap, so that
/// an exact half-circle built from symmetric segments still fits.
const SWEEP_EPSILON: CoordF = 1e-9;

/// Direction of an arc (clockwise or counter-clockwise).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArcDirection {
    /// Clockwise arc (G2)
    Clockwise,
    /// Counter-clockwise arc (G3)
    CounterClockwise,
}

impl ArcDirection {
    /// Returns the G-code command word for this direction.
    pub fn gcode_command(&self) -> &'static str {
        match self {
            ArcDirection::Clockwise => "G2",
            ArcDirection::CounterClockwise => "G3",
        }
    }

    #[inline]
    pub fn is_clockwise(&self) -> bool {
        matches!(self, ArcDirection::Clockwise)
    }
}

/// An accepted arc, ready for emission.
#[derive(Debug, Clone)]
pub struct FittedArc {
    /// The fitted circle (XY plane, mm).
    pub circle: Circle,
    /// Start point (position before the first consumed segment).
    pub start: Point3F,
    /// End point (position after the last consumed segment).
    pub end: Point3F,
    /// Sweep direction.
    pub direction: ArcDirection,
    /// Sweep angle in radians, in (0, 2π).
    pub sweep: CoordF,
    /// Total extrusion across the consumed segments (mm of filament).
    pub delta_e: CoordF,
    /// Absolute E position after the last consumed segment (mm).
    pub e_end: CoordF,
    /// Number of source segments the arc replaces.
    pub segment_count: usize,
}

impl FittedArc {
    /// Center offset from the arc start, X component.
    #[inline]
    pub fn i(&self) -> CoordF {
        self.circle.center.x - self.start.x
    }

    /// Center offset from the arc start, Y component.
    #[inline]
    pub fn j(&self) -> CoordF {
        self.circle.center.y - self.start.y
    }

    /// Arc length in the XY plane (mm).
    #[inline]
    pub fn arc_length(&self) -> CoordF {
        self.circle.radius * self.sweep
    }
}

/// Output unit of the fitter: either an arc replacing a run of segments, or
/// segments to write back verbatim.
#[derive(Debug, Clone)]
pub enum Emission {
    /// An arc and the segments it replaces.
    Arc {
        arc: FittedArc,
        segments: Vec<MotionSegment>,
    },
    /// Segments to pass through as their original lines.
    Lines(Vec<MotionSegment>),
}

/// The current run of candidate segments under a single arc hypothesis.
#[derive(Debug)]
pub struct SegmentWindow {
    segments: Vec<MotionSegment>,
    /// Cumulative XY polyline length at each endpoint; `cumulative[0] == 0`.
    cumulative: Vec<CoordF>,
    /// Hypothesis covering the whole window, present only when the current
    /// contents were accepted under it.
    circle: Option<Circle>,
    clockwise: bool,
    sweep: CoordF,
}

impl SegmentWindow {
    fn new() -> Self {
        Self {
            segments: Vec::new(),
            cumulative: vec![0.0],
            circle: None,
            clockwise: false,
            sweep: 0.0,
        }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Total XY polyline length of the window (mm).
    pub fn polyline_length(&self) -> CoordF {
        *self.cumulative.last().unwrap_or(&0.0)
    }

    /// The window's endpoints: start of the first segment, then the end of
    /// every segment.
    fn endpoints(&self) -> Vec<PointF> {
        let mut points = Vec::with_capacity(self.segments.len() + 1);
        if let Some(first) = self.segments.first() {
            points.push(first.start.xy());
        }
        points.extend(self.segments.iter().map(|s| s.end.xy()));
        points
    }

    /// Hard invariants a new segment must share with the window. Violations
    /// flush the window rather than entering the reject/retry path.
    fn is_compatible(&self, segment: &MotionSegment) -> bool {
        let last = match self.segments.last() {
            Some(last) => last,
            None => return true,
        };
        // Bitwise continuity: both points came from the same tracker update.
        last.end == segment.start
            && last.polarity() == segment.polarity()
            && last.kind == segment.kind
            && last.feedrate == segment.feedrate
            && last.tool == segment.tool
            && last.unit_scale == segment.unit_scale
            && last.absolute_xyz == segment.absolute_xyz
            && last.absolute_e == segment.absolute_e
    }

    fn push_seed(&mut self, segment: MotionSegment) {
        let length = self.polyline_length() + segment.xy_length();
        self.cumulative.push(length);
        self.segments.push(segment);
        self.circle = None;
    }

    fn push_fitted(
        &mut self,
        segment: MotionSegment,
        circle: Circle,
        clockwise: bool,
        sweep: CoordF,
    ) {
        let length = self.polyline_length() + segment.xy_length();
        self.cumulative.push(length);
        self.segments.push(segment);
        self.circle = Some(circle);
        self.clockwise = clockwise;
        self.sweep = sweep;
    }

    fn pop_front(&mut self) -> MotionSegment {
        let segment = self.segments.remove(0);
        self.rebuild_cumulative();
        self.circle = None;
        segment
    }

    fn take_all(&mut self) -> Vec<MotionSegment> {
        let segments = std::mem::take(&mut self.segments);
        self.cumulative = vec![0.0];
        self.circle = None;
        segments
    }

    fn rebuild_cumulative(&mut self) {
        self.cumulative.clear();
        self.cumulative.push(0.0);
        let mut total = 0.0;
        for segment in &self.segments {
            total += segment.xy_length();
            self.cumulative.push(total);
        }
    }
}

/// Result of trying to cover a point set with one circle.
enum Hypothesis {
    Accepted {
        circle: Circle,
        clockwise: bool,
        sweep: CoordF,
    },
    Rejected(&'static str),
}

/// The incremental arc fitter.
#[derive(Debug)]
pub struct ArcFitter {
    config: ConverterConfig,
    window: SegmentWindow,
}

impl ArcFitter {
    /// Create a fitter for the given configuration.
    pub fn new(config: ConverterConfig) -> Self {
        Self {
            config,
            window: SegmentWindow::new(),
        }
    }

    /// Feed one motion segment. Returns everything that must be written
    /// before the segment is (possibly) absorbed into the window.
    pub fn push(&mut self, segment: MotionSegment) -> Vec<Emission> {
        let mut out = Vec::new();

        if !self.is_fittable(&segment) {
            out.extend(self.close_window());
            out.push(Emission::Lines(vec![segment]));
            return out;
        }

        if !self.window.is_empty() && !self.window.is_compatible(&segment) {
            out.extend(self.close_window());
        }

        loop {
            if self.window.is_empty() {
                self.window.push_seed(segment);
                return out;
            }

            match self.try_extend(&segment) {
                Hypothesis::Accepted {
                    circle,
                    clockwise,
                    sweep,
                } => {
                    self.window.push_fitted(segment, circle, clockwise, sweep);
                    return out;
                }
                Hypothesis::Rejected(reason) => {
                    debug!(
                        "line {}: extension rejected ({})",
                        segment.command.line_number, reason
                    );
                    if self.window_qualifies() {
                        out.push(self.emit_arc());
                        self.window.push_seed(segment);
                        return out;
                    }
                    // Not enough accepted geometry: drain the oldest segment
                    // as a plain line and retry with what remains.
                    out.push(Emission::Lines(vec![self.window.pop_front()]));
                }
            }
        }
    }

    /// Flush on a non-fittable event: emit the window as an arc when it
    /// qualifies, as verbatim lines otherwise.
    pub fn flush(&mut self) -> Vec<Emission> {
        self.close_window()
    }

    /// Flush the window strictly as lines. Used on cancellation, where no
    /// partial arc may be emitted.
    pub fn flush_as_lines(&mut self) -> Vec<Emission> {
        if self.window.is_empty() {
            Vec::new()
        } else {
            vec![Emission::Lines(self.window.take_all())]
        }
    }

    /// Number of segments currently buffered.
    pub fn pending_segments(&self) -> usize {
        self.window.len()
    }

    fn close_window(&mut self) -> Vec<Emission> {
        if self.window.is_empty() {
            return Vec::new();
        }
        if self.window_qualifies() {
            vec![self.emit_arc()]
        } else {
            vec![Emission::Lines(self.window.take_all())]
        }
    }

    /// Whether a segment may ever participate in an arc. Extrusion and
    /// travel runs both weld; retractions never do.
    fn is_fittable(&self, segment: &MotionSegment) -> bool {
        if segment.command.has_unknown_tokens {
            return false;
        }
        if segment.polarity() == ExtrusionPolarity::Retract {
            return false;
        }
        // A segment with no XY footprint (z hop, bare E move) has no chord.
        segment.xy_length() > 0.0
    }

    /// The window may be emitted as an arc: it was accepted under its
    /// current hypothesis, spans at least two segments, and satisfies the
    /// firmware minimum-segment policy.
    fn window_qualifies(&self) -> bool {
        let circle = match self.window.circle {
            Some(circle) => circle,
            None => return false,
        };
        if self.window.len() < 2 {
            return false;
        }
        self.passes_min_segments(&circle)
    }

    /// Firmware compensation: some firmwares subdivide arcs at a fixed
    /// length per segment and stutter when the result has too few segments.
    /// The rule is evaluated on the full circumference and only defers
    /// emission; it never stops the window from growing.
    fn passes_min_segments(&self, circle: &Circle) -> bool {
        if self.config.min_arc_segments == 0 || self.config.mm_per_arc_segment <= 0.0 {
            return true;
        }
        let implied = (circle.circumference() / self.config.mm_per_arc_segment).floor();
        implied >= self.config.min_arc_segments as CoordF
    }

    /// Test whether window ∪ {candidate} is still one arc.
    fn try_extend(&self, candidate: &MotionSegment) -> Hypothesis {
        let mut points = self.window.endpoints();
        points.push(candidate.end.xy());

        let mut cumulative = self.window.cumulative.clone();
        cumulative.push(self.window.polyline_length() + candidate.xy_length());
        let total_length = *cumulative.last().unwrap();
        if total_length <= 0.0 {
            return Hypothesis::Rejected("zero-length polyline");
        }

        // Three representative points: ends plus the interior endpoint
        // nearest the length midpoint.
        let mid_index = Self::midpoint_index(&cumulative);
        let circle =
            match Circle::from_three_points(points[0], points[mid_index], points[points.len() - 1])
            {
                Some(circle) => circle,
                None => return Hypothesis::Rejected("colinear representative points"),
            };

        if circle.radius > self.config.max_radius_mm {
            return Hypothesis::Rejected("radius above cap");
        }

        for point in &points {
            if !circle.contains_point(*point, self.config.resolution_mm) {
                return Hypothesis::Rejected("endpoint off circle");
            }
        }

        // Between its endpoints each source chord sits below the circle by
        // its sagitta; that bulge is path deviation just as much as an
        // off-circle endpoint is.
        for chord in points.windows(2) {
            if circle.chord_deviation(chord[0], chord[1]) > self.config.resolution_mm {
                return Hypothesis::Rejected("chord sagitta above resolution");
            }
        }

        let clockwise = match Self::direction_of(&points) {
            Some(clockwise) => clockwise,
            None => return Hypothesis::Rejected("direction inflection"),
        };

        let sweep = circle.sweep_angle(points[0], points[points.len() - 1], clockwise);
        if sweep <= 0.0 {
            return Hypothesis::Rejected("degenerate sweep");
        }
        if sweep > self.config.max_arc_angle + SWEEP_EPSILON {
            return Hypothesis::Rejected("sweep above cap");
        }

        let arc_length = circle.radius * sweep;
        let relative_error = (arc_length - total_length).abs() / total_length;
        if relative_error > self.config.path_tolerance_percent / 100.0 {
            return Hypothesis::Rejected("path length tolerance");
        }

        if let Err(reason) = self.check_z_progression(candidate, &cumulative) {
            return Hypothesis::Rejected(reason);
        }

        Hypothesis::Accepted {
            circle,
            clockwise,
            sweep,
        }
    }

    /// Index of the interior endpoint nearest the polyline-length midpoint.
    fn midpoint_index(cumulative: &[CoordF]) -> usize {
        let target = cumulative.last().unwrap() / 2.0;
        let interior = &cumulative[1..cumulative.len() - 1];
        let mut best = 1;
        let mut best_distance = CoordF::INFINITY;
        for (offset, length) in interior.iter().enumerate() {
            let distance = (length - target).abs();
            if distance < best_distance {
                best_distance = distance;
                best = offset + 1;
            }
        }
        best
    }

    /// Sweep direction from the chord cross products. `None` when the signs
    /// disagree (an inflection) or every cross product vanishes.
    fn direction_of(points: &[PointF]) -> Option<bool> {
        let mut sign = 0.0;
        for window in points.windows(3) {
            let cross = cross2f(
                window[0].vector_to(window[1]),
                window[1].vector_to(window[2]),
            );
            if cross == 0.0 {
                continue;
            }
            if sign != 0.0 && cross.signum() != sign {
                return None;
            }
            sign = cross.signum();
        }
        if sign == 0.0 {
            None
        } else {
            // Positive cross product means a counter-clockwise turn.
            Some(sign < 0.0)
        }
    }

    /// 3D rule: Z must be flat, or (when 3D arcs are allowed) a monotone,
    /// linearly consistent progression along the path.
    fn check_z_progression(
        &self,
        candidate: &MotionSegment,
        cumulative: &[CoordF],
    ) -> Result<(), &'static str> {
        let segments = self
            .window
            .segments
            .iter()
            .chain(std::iter::once(candidate));
        let mut any_z = false;
        let mut sign = 0.0;
        for segment in segments {
            let dz = segment.delta_z();
            if dz != 0.0 {
                any_z = true;
                if sign != 0.0 && dz.signum() != sign {
                    return Err("z direction change");
                }
                sign = dz.signum();
            }
        }
        if !any_z {
            return Ok(());
        }
        if !self.config.allow_3d_arcs {
            return Err("z motion without 3d arcs");
        }

        // Linear consistency: each endpoint's Z must match a straight-line
        // interpolation over path length within the resolution.
        let z_start = self.window.segments.first().unwrap_or(candidate).start.z;
        let z_end = candidate.end.z;
        let total = *cumulative.last().unwrap();
        let endpoints_z = self
            .window
            .segments
            .iter()
            .map(|s| s.end.z)
            .chain(std::iter::once(candidate.end.z));
        for (index, z) in endpoints_z.enumerate() {
            let fraction = cumulative[index + 1] / total;
            let interpolated = z_start + (z_end - z_start) * fraction;
            if (z - interpolated).abs() > self.config.resolution_mm {
                return Err("z not linear along path");
            }
        }
        Ok(())
    }

    fn emit_arc(&mut self) -> Emission {
        let circle = self.window.circle.expect("emitting an unfitted window");
        let clockwise = self.window.clockwise;
        let sweep = self.window.sweep;
        let segments = self.window.take_all();
        let first = segments.first().expect("emitting an empty window");
        let last = segments.last().expect("emitting an empty window");

        let arc = FittedArc {
            circle,
            start: first.start,
            end: last.end,
            direction: if clockwise {
                ArcDirection::Clockwise
            } else {
                ArcDirection::CounterClockwise
            },
            sweep,
            delta_e: segments.iter().map(|s| s.delta_e).sum(),
            e_end: last.e_end,
            segment_count: segments.len(),
        };
        Emission::Arc { arc, segments }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcode::{Command, LineEnding, PrinterState};
    use std::f64::consts::PI;

    /// Drive G-code text through a state tracker into the fitter.
    fn feed(fitter: &mut ArcFitter, lines: &[String]) -> Vec<Emission> {
        let mut state = PrinterState::new(false);
        let mut out = Vec::new();
        for (index, line) in lines.iter().enumerate() {
            let command = Command::parse(line, index + 1, LineEnding::Lf);
            if let Some(segment) = state.apply(&command) {
                out.extend(fitter.push(segment));
            }
        }
        out.extend(fitter.flush());
        out
    }

    fn make_arc_lines(
        center: (f64, f64),
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        num_points: usize,
    ) -> Vec<String> {
        (0..num_points)
            .map(|i| {
                let t = i as f64 / (num_points - 1) as f64;
                let angle = start_angle + t * (end_angle - start_angle);
                format!(
                    "G1 X{:.6} Y{:.6}",
                    center.0 + radius * angle.cos(),
                    center.1 + radius * angle.sin()
                )
            })
            .collect()
    }

    fn arcs(emissions: &[Emission]) -> Vec<&FittedArc> {
        emissions
            .iter()
            .filter_map(|e| match e {
                Emission::Arc { arc, .. } => Some(arc),
                Emission::Lines(_) => None,
            })
            .collect()
    }

    fn config() -> ConverterConfig {
        ConverterConfig::default()
    }

    #[test]
    fn test_quarter_circle_becomes_one_arc() {
        let mut fitter = ArcFitter::new(config());
        let lines = make_arc_lines((0.0, 0.0), 10.0, 0.0, PI / 2.0, 17);
        let emissions = feed(&mut fitter, &lines);

        let arcs = arcs(&emissions);
        assert_eq!(arcs.len(), 1);
        let arc = arcs[0];
        assert_eq!(arc.direction, ArcDirection::CounterClockwise);
        assert_eq!(arc.segment_count, 16);
        assert!((arc.circle.radius - 10.0).abs() < 0.01);
        assert!((arc.sweep - PI / 2.0).abs() < 0.01);
        assert!(arc.end.x.abs() < 1e-6);
        assert!((arc.end.y - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_clockwise_direction() {
        let mut fitter = ArcFitter::new(config());
        let lines = make_arc_lines((0.0, 0.0), 10.0, PI / 2.0, 0.0, 17);
        let emissions = feed(&mut fitter, &lines);

        let arcs = arcs(&emissions);
        assert_eq!(arcs.len(), 1);
        assert_eq!(arcs[0].direction, ArcDirection::Clockwise);
    }

    #[test]
    fn test_straight_line_never_fits() {
        let mut fitter = ArcFitter::new(config());
        let lines: Vec<String> = (0..10).map(|i| format!("G1 X{} Y0", i)).collect();
        let emissions = feed(&mut fitter, &lines);

        assert!(arcs(&emissions).is_empty());
        let line_count: usize = emissions
            .iter()
            .map(|e| match e {
                Emission::Lines(segments) => segments.len(),
                _ => 0,
            })
            .sum();
        // All ten commands, including the zero-length first move.
        assert_eq!(line_count, 10);
    }

    #[test]
    fn test_full_circle_splits_at_max_angle() {
        let mut fitter = ArcFitter::new(config());
        // Closed 32-gon approximating the unit circle: the default π sweep
        // cap forces two half arcs.
        let lines = make_arc_lines((0.0, 0.0), 1.0, 0.0, 2.0 * PI, 33);
        let emissions = feed(&mut fitter, &lines);

        let arcs = arcs(&emissions);
        assert_eq!(arcs.len(), 2);
        for arc in &arcs {
            assert!(arc.sweep <= PI + 1e-6);
        }
        assert!((arcs[0].sweep - PI).abs() < 0.01);
        assert!((arcs[1].sweep - PI).abs() < 0.01);
        // The second arc closes the loop where the first one started.
        assert!((arcs[1].end.x - 1.0).abs() < 1e-6);
        assert!(arcs[1].end.y.abs() < 1e-6);
    }

    #[test]
    fn test_radius_cap_rejects() {
        let mut config = config();
        config.max_radius_mm = 5.0;
        let mut fitter = ArcFitter::new(config);
        let lines = make_arc_lines((0.0, 0.0), 10.0, 0.0, PI / 2.0, 17);
        let emissions = feed(&mut fitter, &lines);
        assert!(arcs(&emissions).is_empty());
    }

    #[test]
    fn test_min_arc_segments_defers_small_arcs() {
        let mut config = config();
        config.min_arc_segments = 100;
        config.mm_per_arc_segment = 1.0;
        let mut fitter = ArcFitter::new(config);
        // Radius 10 circle has circumference ~62.8 -> 62 implied segments,
        // below the 100 minimum, so the window must flush as lines.
        let lines = make_arc_lines((0.0, 0.0), 10.0, 0.0, PI / 2.0, 17);
        let emissions = feed(&mut fitter, &lines);
        assert!(arcs(&emissions).is_empty());

        // A big enough radius passes.
        let mut config = self::config();
        config.min_arc_segments = 100;
        config.mm_per_arc_segment = 1.0;
        let mut fitter = ArcFitter::new(config);
        let lines = make_arc_lines((0.0, 0.0), 20.0, 0.0, PI / 2.0, 17);
        let emissions = feed(&mut fitter, &lines);
        assert_eq!(arcs(&emissions).len(), 1);
    }

    #[test]
    fn test_inflection_splits_arcs() {
        let mut fitter = ArcFitter::new(config());
        // An S-curve: CCW quarter followed by a CW quarter.
        let mut lines = make_arc_lines((0.0, 0.0), 10.0, -PI / 2.0, 0.0, 17);
        lines.extend(
            make_arc_lines((20.0, 0.0), 10.0, PI, PI / 2.0, 17)
                .into_iter()
                .skip(1),
        );
        let emissions = feed(&mut fitter, &lines);

        let arcs = arcs(&emissions);
        assert_eq!(arcs.len(), 2);
        assert_eq!(arcs[0].direction, ArcDirection::CounterClockwise);
        assert_eq!(arcs[1].direction, ArcDirection::Clockwise);
    }

    #[test]
    fn test_retraction_never_fits() {
        let mut fitter = ArcFitter::new(config());
        let mut state = PrinterState::new(false);
        state.apply(&Command::parse("M83", 1, LineEnding::Lf));
        let lines = make_arc_lines((0.0, 0.0), 10.0, 0.0, PI / 4.0, 5);
        let mut emissions = Vec::new();
        for (index, line) in lines.iter().enumerate() {
            let with_e = format!("{} E-0.1", line);
            let command = Command::parse(&with_e, index + 2, LineEnding::Lf);
            if let Some(segment) = state.apply(&command) {
                emissions.extend(fitter.push(segment));
            }
        }
        emissions.extend(fitter.flush());
        assert!(arcs(&emissions).is_empty());
    }

    #[test]
    fn test_helix_requires_allow_3d() {
        let make_helix = || -> Vec<String> {
            (0..17)
                .map(|i| {
                    let angle = PI / 2.0 * i as f64 / 16.0;
                    format!(
                        "G1 X{:.6} Y{:.6} Z{:.4}",
                        10.0 * angle.cos(),
                        10.0 * angle.sin(),
                        0.1 * i as f64
                    )
                })
                .collect()
        };

        let mut fitter = ArcFitter::new(config());
        let emissions = feed(&mut fitter, &make_helix());
        assert!(arcs(&emissions).is_empty());

        let mut config = config();
        config.allow_3d_arcs = true;
        let mut fitter = ArcFitter::new(config);
        let emissions = feed(&mut fitter, &make_helix());
        let arcs = arcs(&emissions);
        assert_eq!(arcs.len(), 1);
        assert!((arcs[0].end.z - 1.6).abs() < 1e-9);
    }

    #[test]
    fn test_feedrate_change_splits_window() {
        let mut fitter = ArcFitter::new(config());
        let mut state = PrinterState::new(false);
        let lines = make_arc_lines((0.0, 0.0), 10.0, 0.0, PI / 2.0, 17);
        let mut emissions = Vec::new();
        for (index, line) in lines.iter().enumerate() {
            let line = if index == 8 {
                format!("{} F900", line)
            } else {
                line.clone()
            };
            let command = Command::parse(&line, index + 1, LineEnding::Lf);
            if let Some(segment) = state.apply(&command) {
                emissions.extend(fitter.push(segment));
            }
        }
        emissions.extend(fitter.flush());

        let arcs = arcs(&emissions);
        assert_eq!(arcs.len(), 2);
    }

    #[test]
    fn test_coarse_chords_reject_on_sagitta() {
        // Two 45-degree chords of the unit circle: every endpoint is exactly
        // on the circle, but each chord bulges ~0.076mm away from it, past
        // the 0.05mm resolution. Both must stay lines.
        let mut fitter = ArcFitter::new(config());
        let lines = make_arc_lines((0.0, 0.0), 1.0, 0.0, PI / 2.0, 3);
        let emissions = feed(&mut fitter, &lines);
        assert!(arcs(&emissions).is_empty());

        // Chords half as wide (sagitta ~0.019mm) weld fine.
        let mut fitter = ArcFitter::new(config());
        let lines = make_arc_lines((0.0, 0.0), 1.0, 0.0, PI / 2.0, 5);
        let emissions = feed(&mut fitter, &lines);
        assert_eq!(arcs(&emissions).len(), 1);
    }

    #[test]
    fn test_off_circle_point_rejects() {
        let mut config = config();
        config.resolution_mm = 0.05;
        let mut fitter = ArcFitter::new(config);

        // Points on the unit circle, except one nudged 0.1mm outward:
        // well past the 0.05mm resolution, so no arc may span it.
        let lines = vec![
            "G1 X1.0 Y0.0".to_string(),
            "G1 X0.923880 Y0.382683".to_string(),
            "G1 X0.707107 Y0.707107".to_string(),
            "G1 X0.423 Y1.006".to_string(), // off-circle
            "G1 X0.0 Y1.0".to_string(),
        ];
        let emissions = feed(&mut fitter, &lines);
        for arc in arcs(&emissions) {
            assert!(arc.segment_count <= 3);
        }
    }
}
