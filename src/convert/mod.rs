//! Streaming conversion driver.
//!
//! [`GCodeConverter`] reads the source lazily line by line, replays each
//! command through the printer state tracker, feeds motion segments to the
//! arc fitter and writes everything else through verbatim. Progress is
//! sampled by input byte count, and the callback's boolean return value
//! drives cancellation: a cancelled run flushes its pending window as plain
//! lines so no partial arc is ever emitted.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use log::{debug, error, info};

use crate::config::ConverterConfig;
use crate::gcode::{ArcEmitter, ArcFitter, Command, Emission, LineEnding, PrinterState};
use crate::{Error, Result};

/// Minimum number of input bytes between progress callbacks. Sampling by
/// bytes rather than by segment count keeps the callback rate independent of
/// arc density.
const PROGRESS_BYTE_INTERVAL: u64 = 32 * 1024;

/// A snapshot of conversion progress, handed to the progress callback and
/// returned with the final result.
#[derive(Debug, Clone, Default)]
pub struct Progress {
    /// Bytes consumed from the source so far.
    pub bytes_read: u64,
    /// Total size of the source in bytes (0 when unknown).
    pub total_bytes: u64,
    /// Source lines consumed.
    pub lines_read: u64,
    /// Arcs written to the target.
    pub arcs_emitted: u64,
    /// Original toolpath points replaced by arcs.
    pub points_consumed: u64,
    /// Non-blank source commands consumed.
    pub source_commands: u64,
    /// Commands written to the target.
    pub target_commands: u64,
    /// Completion in percent (0 when the total size is unknown).
    pub percent_complete: f64,
    /// Wall-clock seconds since the conversion started.
    pub seconds_elapsed: f64,
}

impl Progress {
    /// Ratio of source commands to target commands, 1.0 when nothing was
    /// compressed yet.
    pub fn compression_ratio(&self) -> f64 {
        if self.target_commands > 0 {
            self.source_commands as f64 / self.target_commands as f64
        } else {
            1.0
        }
    }
}

/// Outcome of a conversion run.
#[derive(Debug, Clone)]
pub struct ConvertResult {
    /// The run finished without a fatal error.
    pub success: bool,
    /// The run was stopped by the progress callback.
    pub cancelled: bool,
    /// Human-readable summary.
    pub message: String,
    /// Final progress snapshot.
    pub progress: Progress,
}

/// Reads lines from a source, preserving content and terminator separately.
/// Tolerates LF, CRLF and lone-CR terminated input.
struct LineReader<R: BufRead> {
    inner: R,
}

impl<R: BufRead> LineReader<R> {
    fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Read the next line. Returns the content bytes (without terminator),
    /// the terminator style, and the total bytes consumed.
    fn read_line(&mut self) -> std::io::Result<Option<(Vec<u8>, LineEnding, u64)>> {
        let mut content = Vec::new();
        let mut consumed = 0u64;

        loop {
            let available = self.inner.fill_buf()?;
            if available.is_empty() {
                if consumed == 0 {
                    return Ok(None);
                }
                return Ok(Some((content, LineEnding::None, consumed)));
            }

            match available.iter().position(|&b| b == b'\n' || b == b'\r') {
                Some(pos) => {
                    content.extend_from_slice(&available[..pos]);
                    let delimiter = available[pos];
                    self.inner.consume(pos + 1);
                    consumed += (pos + 1) as u64;

                    if delimiter == b'\n' {
                        return Ok(Some((content, LineEnding::Lf, consumed)));
                    }
                    // Lone CR unless an LF follows immediately.
                    let next = self.inner.fill_buf()?;
                    if next.first() == Some(&b'\n') {
                        self.inner.consume(1);
                        consumed += 1;
                        return Ok(Some((content, LineEnding::CrLf, consumed)));
                    }
                    return Ok(Some((content, LineEnding::Cr, consumed)));
                }
                None => {
                    let len = available.len();
                    content.extend_from_slice(available);
                    self.inner.consume(len);
                    consumed += len as u64;
                }
            }
        }
    }
}

/// The conversion engine.
#[derive(Debug)]
pub struct GCodeConverter {
    config: ConverterConfig,
}

impl GCodeConverter {
    /// Create a converter. The configuration is validated (clamped) up
    /// front so every later stage sees legal values.
    pub fn new(mut config: ConverterConfig) -> Self {
        config.validate();
        Self { config }
    }

    /// The validated configuration in use.
    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Convert a file on disk, without progress reporting.
    pub fn convert_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &mut self,
        source: P,
        target: Q,
    ) -> Result<ConvertResult> {
        self.convert_file_with_callback(source, target, |_| true)
    }

    /// Convert a file on disk, reporting progress to `callback`. Returning
    /// `false` from the callback cancels the run.
    pub fn convert_file_with_callback<P, Q, F>(
        &mut self,
        source: P,
        target: Q,
        callback: F,
    ) -> Result<ConvertResult>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
        F: FnMut(&Progress) -> bool,
    {
        let source = source.as_ref();
        let target = target.as_ref();

        let file = File::open(source)
            .map_err(|e| Error::Input(format!("cannot open {}: {}", source.display(), e)))?;
        let total_bytes = file
            .metadata()
            .map(|m| m.len())
            .unwrap_or(0);
        let reader = BufReader::new(file);

        let out = File::create(target)
            .map_err(|e| Error::Output(format!("cannot create {}: {}", target.display(), e)))?;
        let mut writer = BufWriter::new(out);

        info!(
            "converting {} -> {} ({} bytes)",
            source.display(),
            target.display(),
            total_bytes
        );
        self.convert_stream(reader, &mut writer, total_bytes, callback)
    }

    /// Convert from any buffered reader into any writer. `total_bytes` may
    /// be 0 when the source size is unknown; percentages then stay at 0.
    pub fn convert_stream<R, W, F>(
        &mut self,
        reader: R,
        writer: &mut W,
        total_bytes: u64,
        mut callback: F,
    ) -> Result<ConvertResult>
    where
        R: BufRead,
        W: Write,
        F: FnMut(&Progress) -> bool,
    {
        let started = Instant::now();
        let mut state = PrinterState::new(self.config.g90_g91_influences_extruder);
        let mut fitter = ArcFitter::new(self.config.clone());
        let emitter = ArcEmitter::new(self.config.clone());
        let mut reader = LineReader::new(reader);

        let mut progress = Progress {
            total_bytes,
            ..Progress::default()
        };
        let mut next_report = PROGRESS_BYTE_INTERVAL;
        let mut cancelled = false;
        let mut line_number = 0usize;

        while let Some((content, ending, consumed)) = reader.read_line()? {
            line_number += 1;
            let text = String::from_utf8(content).map_err(|_| {
                Error::Input(format!("line {} is not valid UTF-8 text", line_number))
            })?;

            let command = Command::parse(&text, line_number, ending);
            progress.bytes_read += consumed;
            progress.lines_read += 1;
            if !command.is_empty() {
                progress.source_commands += 1;
            }

            match state.apply(&command) {
                Some(segment) => {
                    for emission in fitter.push(segment) {
                        Self::write_emission(writer, &emitter, &mut progress, emission)?;
                    }
                }
                None => {
                    // Non-fittable event: drain the window, then pass the
                    // line through untouched.
                    for emission in fitter.flush() {
                        Self::write_emission(writer, &emitter, &mut progress, emission)?;
                    }
                    write_target(writer, &command.raw, command.ending)?;
                    if !command.is_empty() {
                        progress.target_commands += 1;
                    }
                }
            }

            if progress.bytes_read >= next_report {
                next_report = progress.bytes_read + PROGRESS_BYTE_INTERVAL;
                Self::update_progress(&mut progress, &started);
                if !callback(&progress) {
                    cancelled = true;
                    debug!("cancellation requested at byte {}", progress.bytes_read);
                    break;
                }
            }
        }

        // A cancelled run must not emit a partial arc for the pending
        // window; a completed run closes it normally.
        let tail = if cancelled {
            fitter.flush_as_lines()
        } else {
            fitter.flush()
        };
        for emission in tail {
            Self::write_emission(writer, &emitter, &mut progress, emission)?;
        }
        writer
            .flush()
            .map_err(|e| Error::Output(format!("write failed: {}", e)))?;

        Self::update_progress(&mut progress, &started);
        if !cancelled && total_bytes > 0 {
            progress.percent_complete = 100.0;
        }
        callback(&progress);

        let message = if cancelled {
            format!(
                "Conversion cancelled at byte {} of {}",
                progress.bytes_read, total_bytes
            )
        } else {
            format!(
                "Converted {} commands into {} ({} arcs)",
                progress.source_commands, progress.target_commands, progress.arcs_emitted
            )
        };
        info!("{}", message);

        Ok(ConvertResult {
            success: true,
            cancelled,
            message,
            progress,
        })
    }

    fn update_progress(progress: &mut Progress, started: &Instant) {
        progress.seconds_elapsed = started.elapsed().as_secs_f64();
        if progress.total_bytes > 0 {
            progress.percent_complete =
                progress.bytes_read as f64 / progress.total_bytes as f64 * 100.0;
        }
    }

    fn write_emission<W: Write>(
        writer: &mut W,
        emitter: &ArcEmitter,
        progress: &mut Progress,
        emission: Emission,
    ) -> Result<()> {
        match emission {
            Emission::Arc { arc, segments } => {
                if segments.is_empty() {
                    error!("arc emission with no source segments");
                    return Err(Error::Internal {
                        line: progress.lines_read as usize,
                        message: "arc emission with no source segments".to_string(),
                    });
                }
                let line = emitter.format_arc(&arc, &segments);
                let ending = segments.last().map(|s| s.command.ending).unwrap_or_default();
                write_target(writer, &line, ending)?;
                progress.arcs_emitted += 1;
                progress.points_consumed += segments.len() as u64 + 1;
                progress.target_commands += 1;
            }
            Emission::Lines(segments) => {
                for segment in segments {
                    write_target(writer, &segment.command.raw, segment.command.ending)?;
                    progress.target_commands += 1;
                }
            }
        }
        Ok(())
    }
}

fn write_target<W: Write>(writer: &mut W, line: &str, ending: LineEnding) -> Result<()> {
    writer
        .write_all(line.as_bytes())
        .and_then(|_| writer.write_all(ending.as_str().as_bytes()))
        .map_err(|e| Error::Output(format!("write failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcode::CommandKind;
    use std::f64::consts::PI;
    use std::io::Cursor;

    fn convert(config: ConverterConfig, input: &str) -> (ConvertResult, String) {
        let mut converter = GCodeConverter::new(config);
        let mut output = Vec::new();
        let result = converter
            .convert_stream(
                Cursor::new(input.as_bytes().to_vec()),
                &mut output,
                input.len() as u64,
                |_| true,
            )
            .unwrap();
        (result, String::from_utf8(output).unwrap())
    }

    fn circle_gcode(segments: usize, z_step: f64) -> String {
        let mut lines = String::new();
        for i in 0..=segments {
            let angle = 2.0 * PI * i as f64 / segments as f64;
            lines.push_str(&format!("G1 X{:.6} Y{:.6}", angle.cos(), angle.sin()));
            if z_step > 0.0 {
                lines.push_str(&format!(" Z{:.4}", 0.2 + z_step * i as f64));
            }
            lines.push('\n');
        }
        lines
    }

    #[test]
    fn test_straight_lines_pass_through_unchanged() {
        // Colinear points: degenerate circle, no arc, bytes preserved.
        let input = "G1 X0 Y0\nG1 X1 Y0\nG1 X2 Y0\nG1 X3 Y0\n";
        let (result, output) = convert(ConverterConfig::default(), input);
        assert_eq!(output, input);
        assert_eq!(result.progress.arcs_emitted, 0);
        assert!(result.success);
        assert!(!result.cancelled);
    }

    #[test]
    fn test_unit_circle_welds_to_two_half_arcs() {
        let input = circle_gcode(32, 0.0);
        let (result, output) = convert(ConverterConfig::default(), &input);

        assert_eq!(result.progress.arcs_emitted, 2);
        let arc_lines: Vec<&str> = output
            .lines()
            .filter(|l| l.starts_with("G2") || l.starts_with("G3"))
            .collect();
        assert_eq!(arc_lines.len(), 2);
        // CCW circle: both halves are G3.
        assert!(arc_lines.iter().all(|l| l.starts_with("G3")));
        // The second half closes the loop at the start point.
        assert!(arc_lines[1].contains("X1.000"), "got: {}", arc_lines[1]);
        assert!(arc_lines[1].contains("Y0.000") || arc_lines[1].contains("Y-0.000"));
    }

    #[test]
    fn test_deviating_point_passes_through() {
        // The middle point deviates from any circle through its neighbors
        // by more than the resolution: everything stays linear.
        let input = "G1 X1.0 Y0.0\nG1 X0.7071 Y0.7071\nG1 X0.0 Y1.1\nG1 X-0.7071 Y0.7071\n";
        let (result, output) = convert(ConverterConfig::default(), input);
        assert_eq!(result.progress.arcs_emitted, 0);
        assert_eq!(output, input);
    }

    #[test]
    fn test_mixed_motion_with_temperature_command() {
        let input = "G1 X10 Y0 E1\nG1 X10 Y10 E2\nM104 S200\nG1 X0 Y10 E3\n";
        let (result, output) = convert(ConverterConfig::default(), input);
        // Two perpendicular segments can't satisfy the path tolerance, the
        // M104 flushes, and the trailing single segment stays a line.
        assert_eq!(output, input);
        assert_eq!(result.progress.arcs_emitted, 0);
        assert_eq!(result.progress.source_commands, 4);
    }

    #[test]
    fn test_helix_welds_only_with_3d_arcs() {
        let input = circle_gcode(32, 0.01);

        let (result, _) = convert(ConverterConfig::default(), &input);
        assert_eq!(result.progress.arcs_emitted, 0);

        let config = ConverterConfig::default().allow_3d_arcs(true);
        let (result, output) = convert(config, &input);
        assert!(result.progress.arcs_emitted >= 1);
        let arc_line = output
            .lines()
            .find(|l| l.starts_with("G3"))
            .expect("no arc emitted");
        assert!(arc_line.contains('Z'), "got: {}", arc_line);
    }

    #[test]
    fn test_non_motion_lines_and_comments_preserved() {
        let input = "; header comment\nM104 S200\nG28\nG1 X0 Y0 F1800\nG1 X5 Y0\n\nM107\n";
        let (_, output) = convert(ConverterConfig::default(), input);
        assert_eq!(output, input);
    }

    #[test]
    fn test_crlf_terminators_preserved() {
        let input = circle_gcode(32, 0.0).replace('\n', "\r\n");
        let (result, output) = convert(ConverterConfig::default(), &input);
        assert_eq!(result.progress.arcs_emitted, 2);
        for line in output.split_inclusive("\r\n") {
            assert!(line.ends_with("\r\n"), "line missing CRLF: {:?}", line);
        }
    }

    #[test]
    fn test_missing_final_terminator_preserved() {
        let input = "G1 X0 Y0\nG1 X1 Y0";
        let (_, output) = convert(ConverterConfig::default(), input);
        assert_eq!(output, input);
    }

    #[test]
    fn test_idempotent_on_welded_output() {
        let input = circle_gcode(32, 0.0);
        let (_, first) = convert(ConverterConfig::default(), &input);
        let (result, second) = convert(ConverterConfig::default(), &first);
        assert_eq!(first, second);
        // Existing arcs are never re-fitted.
        assert_eq!(result.progress.arcs_emitted, 0);
    }

    #[test]
    fn test_arc_length_matches_polyline_within_tolerance() {
        let segments = 64;
        let input = circle_gcode(segments, 0.0);
        let (result, output) = convert(ConverterConfig::default(), &input);
        assert!(result.progress.arcs_emitted >= 2);

        // Reconstruct emitted arc lengths from the output and compare with
        // the source polyline length.
        let chord = 2.0 * (PI / segments as f64).sin();
        let polyline_length = chord * segments as f64;
        let mut arc_total = 0.0;
        let mut position = (1.0f64, 0.0f64);
        for line in output.lines() {
            let command = Command::parse(line, 1, LineEnding::Lf);
            match command.kind {
                CommandKind::ArcCW | CommandKind::ArcCCW => {
                    let x = command.param_value('X').unwrap();
                    let y = command.param_value('Y').unwrap();
                    let i = command.param_value('I').unwrap();
                    let j = command.param_value('J').unwrap();
                    let center = (position.0 + i, position.1 + j);
                    let radius = (i * i + j * j).sqrt();
                    let a0 = (position.1 - center.1).atan2(position.0 - center.0);
                    let a1 = (y - center.1).atan2(x - center.0);
                    let mut sweep = if command.kind == CommandKind::ArcCCW {
                        a1 - a0
                    } else {
                        a0 - a1
                    };
                    if sweep <= 0.0 {
                        sweep += 2.0 * PI;
                    }
                    arc_total += radius * sweep;
                    position = (x, y);
                }
                CommandKind::LinearMove => {
                    let x = command.param_value('X').unwrap_or(position.0);
                    let y = command.param_value('Y').unwrap_or(position.1);
                    arc_total += ((x - position.0).powi(2) + (y - position.1).powi(2)).sqrt();
                    position = (x, y);
                }
                _ => {}
            }
        }
        let error = (arc_total - polyline_length).abs() / polyline_length;
        assert!(error < 0.05, "length error {} too large", error);
    }

    #[test]
    fn test_cancellation_flushes_pending_window_as_lines() {
        // Enough circular motion to cross several progress intervals.
        let mut input = String::new();
        for _ in 0..40 {
            input.push_str(&circle_gcode(256, 0.0));
        }

        let mut converter = GCodeConverter::new(ConverterConfig::default());
        let mut output = Vec::new();
        let mut calls = 0;
        let result = converter
            .convert_stream(
                Cursor::new(input.as_bytes().to_vec()),
                &mut output,
                input.len() as u64,
                |progress| {
                    calls += 1;
                    progress.percent_complete >= 100.0 || calls < 2
                },
            )
            .unwrap();

        assert!(result.cancelled);
        assert!(result.success);
        assert!(result.progress.bytes_read < input.len() as u64);

        // The tail of the output must be verbatim source lines, not a
        // half-window arc.
        let output = String::from_utf8(output).unwrap();
        let last = output.lines().last().unwrap();
        assert!(last.starts_with("G1"), "got: {}", last);
    }

    #[test]
    fn test_invalid_utf8_is_an_input_error() {
        let mut converter = GCodeConverter::new(ConverterConfig::default());
        let mut output = Vec::new();
        let input: Vec<u8> = b"G1 X0 Y0\nG1 X\xff Y1\n".to_vec();
        let err = converter
            .convert_stream(Cursor::new(input), &mut output, 0, |_| true)
            .unwrap_err();
        assert!(matches!(err, Error::Input(_)));
    }

    #[test]
    fn test_progress_record_totals() {
        let input = circle_gcode(32, 0.0);
        let (result, _) = convert(ConverterConfig::default(), &input);
        let progress = &result.progress;
        assert_eq!(progress.total_bytes, input.len() as u64);
        assert_eq!(progress.bytes_read, progress.total_bytes);
        assert_eq!(progress.lines_read, 33);
        assert_eq!(progress.percent_complete, 100.0);
        assert!(progress.compression_ratio() > 1.0);
        // 33 source commands collapse into a seed line plus two arcs.
        assert_eq!(progress.source_commands, 33);
        assert!(progress.target_commands < progress.source_commands);
    }
}
