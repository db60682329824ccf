//! ArcWelder CLI - Command-line interface for the arc welding converter
//!
//! Usage:
//!   arcwelder-cli convert <input.gcode> -o <output.gcode> [options]
//!   arcwelder-cli convert <input.gcode> --config my_config.json
//!   arcwelder-cli info <input.gcode>

use anyhow::{Context, Result};
use arcwelder::gcode::{Command, CommandKind, LineEnding};
use arcwelder::{ConverterConfig, GCodeConverter, LogLevel};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, LevelFilter};
use std::fs;
use std::path::PathBuf;

/// Compresses runs of short G0/G1 moves into G2/G3 arc commands
#[derive(Parser, Debug)]
#[command(name = "arcwelder-cli")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert linear-move runs in a G-code file to arcs
    Convert {
        /// Input G-code file
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output G-code file (default: <input>.aw.gcode)
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,

        /// Converter configuration file (JSON format) - CLI flags override it
        #[arg(short, long, value_name = "CONFIG")]
        config: Option<PathBuf>,

        /// Maximum deviation from the original path in mm
        #[arg(long, default_value = "0.05")]
        resolution: f64,

        /// Maximum arc-length vs path-length error in percent
        #[arg(long, default_value = "5.0")]
        path_tolerance: f64,

        /// Maximum arc radius in mm
        #[arg(long)]
        max_radius: Option<f64>,

        /// Defer arcs with fewer implied firmware segments (0 disables)
        #[arg(long, default_value = "0")]
        min_arc_segments: u32,

        /// Firmware segment length basis for --min-arc-segments, in mm
        #[arg(long, default_value = "0")]
        mm_per_arc_segment: f64,

        /// Treat G90/G91 as also switching the extruder mode
        #[arg(long)]
        g90_influences_extruder: bool,

        /// Permit helical arcs with a monotone Z progression
        #[arg(long)]
        allow_3d_arcs: bool,

        /// Use the maximum precision observed in the source words
        #[arg(long)]
        allow_dynamic_precision: bool,

        /// Default decimals for X/Y/Z/I/J words (clamped to 3-6)
        #[arg(long, default_value = "3")]
        xyz_precision: u8,

        /// Default decimals for E words (clamped to 3-6)
        #[arg(long, default_value = "5")]
        e_precision: u8,

        /// Log level (noset, verbose, debug, info, warning, error, critical)
        #[arg(long, default_value = "info")]
        log_level: String,
    },

    /// Display information about a G-code file
    Info {
        /// Input G-code file
        #[arg(value_name = "INPUT")]
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging: --debug/--verbose win, otherwise the convert
    // subcommand's --log-level applies.
    let mut filter = if cli.debug {
        LevelFilter::Debug
    } else if cli.verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };
    if !cli.debug && !cli.verbose {
        if let Commands::Convert { log_level, .. } = &cli.command {
            if let Ok(level) = log_level.parse::<LogLevel>() {
                filter = level.to_level_filter();
            }
        }
    }

    env_logger::Builder::new()
        .filter_level(filter)
        .format_timestamp(None)
        .init();

    match cli.command {
        Commands::Convert {
            input,
            output,
            config,
            resolution,
            path_tolerance,
            max_radius,
            min_arc_segments,
            mm_per_arc_segment,
            g90_influences_extruder,
            allow_3d_arcs,
            allow_dynamic_precision,
            xyz_precision,
            e_precision,
            log_level,
        } => cmd_convert(
            input,
            output,
            config,
            resolution,
            path_tolerance,
            max_radius,
            min_arc_segments,
            mm_per_arc_segment,
            g90_influences_extruder,
            allow_3d_arcs,
            allow_dynamic_precision,
            xyz_precision,
            e_precision,
            log_level,
        ),
        Commands::Info { input } => cmd_info(input),
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_convert(
    input: PathBuf,
    output: Option<PathBuf>,
    config_file: Option<PathBuf>,
    resolution: f64,
    path_tolerance: f64,
    max_radius: Option<f64>,
    min_arc_segments: u32,
    mm_per_arc_segment: f64,
    g90_influences_extruder: bool,
    allow_3d_arcs: bool,
    allow_dynamic_precision: bool,
    xyz_precision: u8,
    e_precision: u8,
    log_level: String,
) -> Result<()> {
    // Determine output path
    let output_path = output.unwrap_or_else(|| input.with_extension("aw.gcode"));

    // Build the configuration - file first, CLI flags on top
    let mut config = if let Some(config_path) = config_file {
        info!("Loading converter config from: {}", config_path.display());
        ConverterConfig::from_file(&config_path).context("Failed to load converter config file")?
    } else {
        ConverterConfig::default()
    };

    config.resolution_mm = resolution;
    config.path_tolerance_percent = path_tolerance;
    if let Some(radius) = max_radius {
        config.max_radius_mm = radius;
    }
    config.min_arc_segments = min_arc_segments;
    config.mm_per_arc_segment = mm_per_arc_segment;
    config.g90_g91_influences_extruder = g90_influences_extruder;
    config.allow_3d_arcs = allow_3d_arcs;
    config.allow_dynamic_precision = allow_dynamic_precision;
    config.default_xyz_precision = xyz_precision;
    config.default_e_precision = e_precision;
    config.log_level = log_level
        .parse::<LogLevel>()
        .map_err(|e| anyhow::anyhow!(e))?;

    info!("Configuration:");
    info!("  Resolution: {} mm", config.resolution_mm);
    info!("  Path tolerance: {}%", config.path_tolerance_percent);
    info!("  Max radius: {} mm", config.max_radius_mm);
    if config.min_arc_segments > 0 {
        info!(
            "  Firmware minimum: {} segments at {} mm",
            config.min_arc_segments, config.mm_per_arc_segment
        );
    }
    info!(
        "  3D arcs: {}",
        if config.allow_3d_arcs { "enabled" } else { "disabled" }
    );

    // Create progress bar
    let progress = ProgressBar::new(100);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );
    progress.set_message("Welding arcs...");

    let mut converter = GCodeConverter::new(config);
    let progress_clone = progress.clone();
    let result = converter
        .convert_file_with_callback(&input, &output_path, move |p| {
            progress_clone.set_position(p.percent_complete as u64);
            true
        })
        .context("Conversion failed")?;

    progress.finish_with_message("Done!");

    let stats = &result.progress;
    println!();
    println!("Conversion complete!");
    println!("  Output: {}", output_path.display());
    println!("  Lines read: {}", stats.lines_read);
    println!(
        "  Commands: {} in, {} out",
        stats.source_commands, stats.target_commands
    );
    println!(
        "  Arcs: {} (replacing {} points)",
        stats.arcs_emitted, stats.points_consumed
    );
    println!("  Compression ratio: {:.2}", stats.compression_ratio());
    println!("  Elapsed: {:.2} s", stats.seconds_elapsed);

    Ok(())
}

fn cmd_info(input: PathBuf) -> Result<()> {
    let text = fs::read_to_string(&input)
        .with_context(|| format!("Failed to read G-code file: {}", input.display()))?;

    let mut lines = 0u64;
    let mut moves = 0u64;
    let mut arcs = 0u64;
    let mut other = 0u64;
    for (index, raw) in text.lines().enumerate() {
        lines += 1;
        let command = Command::parse(raw, index + 1, LineEnding::Lf);
        match command.kind {
            CommandKind::RapidMove | CommandKind::LinearMove => moves += 1,
            CommandKind::ArcCW | CommandKind::ArcCCW => arcs += 1,
            _ => {
                if !command.is_empty() {
                    other += 1;
                }
            }
        }
    }

    println!("G-code Information:");
    println!("  File: {}", input.display());
    println!("  Size: {} bytes", text.len());
    println!("  Lines: {}", lines);
    println!("  Linear moves: {}", moves);
    println!("  Existing arcs: {}", arcs);
    println!("  Other commands: {}", other);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
