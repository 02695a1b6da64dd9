//! gerberpanel: tiles a PCB into a manufacturing panel with rails and
//! mouse-bite tabs.

mod error;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use gerberpanel::config::{self, ExportOptions};
use gerberpanel::export::{self, BoardSource};
use gerberpanel::geometry::Rotation;
use gerberpanel::params::PanelParameters;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use crate::error::CliError;

/// Panelize a board given as a directory of Gerber/Excellon files or a zip.
#[derive(Parser, Debug)]
#[command(name = "gerberpanel")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Board directory or zip archive
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output directory
    #[arg(short, long, value_name = "DIR", default_value = "panel")]
    output: PathBuf,

    /// Parameter preset (default, oshpark, jlcpcb, pcbway)
    #[arg(short, long)]
    preset: Option<String>,

    /// JSON parameter file, applied over the preset
    #[arg(long, value_name = "FILE")]
    params: Option<PathBuf>,

    /// Board rows
    #[arg(long, default_value_t = 1)]
    rows: usize,

    /// Board columns
    #[arg(long, default_value_t = 1)]
    columns: usize,

    /// Board rotation in degrees (0 or 90)
    #[arg(long, default_value_t = 0)]
    rotation: u16,

    /// Keep the directory a zip archive was unpacked into
    #[arg(long)]
    keep_temp: bool,

    /// Plan and report the layout without writing files
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,
}

const fn log_level(verbose: u8, quiet: bool) -> Level {
    if quiet {
        return Level::ERROR;
    }
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn parameters(args: &Args) -> Result<PanelParameters, CliError> {
    let params = match (&args.params, &args.preset) {
        (Some(path), preset) => config::load_parameters(path, preset.as_deref())?,
        (None, Some(name)) => config::preset(name)?,
        (None, None) => PanelParameters::default(),
    };
    Ok(params)
}

fn rotation(degrees: u16) -> Result<Rotation, CliError> {
    match degrees {
        0 => Ok(Rotation::R0),
        90 => Ok(Rotation::R90),
        other => Err(CliError::Usage(format!(
            "rotation must be 0 or 90 degrees, got {other}"
        ))),
    }
}

fn options(args: &Args) -> Result<ExportOptions, CliError> {
    if args.rows == 0 || args.columns == 0 {
        return Err(CliError::Usage("rows and columns must be at least 1".to_string()));
    }
    Ok(ExportOptions {
        keep_temp: args.keep_temp,
        output_dir: args.output.clone(),
        rows: args.rows,
        columns: args.columns,
        rotation: rotation(args.rotation)?,
    })
}

/// One-line layout summary printed by `--dry-run`.
fn layout_line(width: f64, height: f64, status: &str) -> String {
    format!("{width:.2} x {height:.2} mm: {status}")
}

fn run(args: &Args) -> Result<Vec<PathBuf>, CliError> {
    let params = parameters(args)?;
    let options = options(args)?;
    let source = BoardSource::load(&args.input, options.keep_temp)?;
    if let Some(dir) = source.unpacked_dir() {
        debug!(dir = %dir.display(), "archive unpacked");
    }
    let planner = export::plan(&source, params, &options)?;
    let (width, height) = planner.panel_size_mm();
    info!(width, height, status = %planner.status(), "layout");
    if args.dry_run {
        println!("{}", layout_line(width, height, &planner.status()));
        return Ok(Vec::new());
    }

    let panel = export::panelize(&source, &planner, &mut |label| {
        debug!(layer = label, "exporting");
        true
    })?;
    for message in panel.warnings() {
        warn!("{message}");
    }
    Ok(panel.write(&options.output_dir)?)
}

fn report(paths: &[PathBuf], output: &Path) {
    if paths.is_empty() {
        return;
    }
    println!("wrote {} files to {}", paths.len(), output.display());
    for path in paths {
        println!("  {}", path.display());
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(log_level(args.verbose, args.quiet));

    match run(&args) {
        Ok(paths) => {
            report(&paths, &args.output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "panelization failed");
            eprintln!("gerberpanel: {e}");
            e.exit_code()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;

    use super::*;

    #[test]
    fn ut_cli_002_verbosity_levels() {
        assert_eq!(log_level(0, false), Level::WARN);
        assert_eq!(log_level(1, false), Level::INFO);
        assert_eq!(log_level(2, false), Level::DEBUG);
        assert_eq!(log_level(7, false), Level::TRACE);
        assert_eq!(log_level(3, true), Level::ERROR);
    }

    #[test]
    fn ut_cli_003_args_parse() {
        let args = Args::parse_from([
            "gerberpanel",
            "board.zip",
            "-o",
            "out",
            "--preset",
            "jlcpcb",
            "--columns",
            "3",
            "--rotation",
            "90",
            "-vv",
        ]);
        assert_eq!(args.columns, 3);
        assert_eq!(args.verbose, 2);
        let Ok(options) = options(&args) else {
            unreachable!("valid options rejected");
        };
        assert_eq!(options.rotation, Rotation::R90);
        assert!(matches!(parameters(&args), Ok(p) if p.vendor_marker()));
    }

    #[test]
    fn ut_cli_004_run_writes_panel() {
        let Ok(dir) = tempfile::tempdir() else {
            unreachable!("tempdir");
        };
        let params = dir.path().join("params.json");
        if std::fs::write(&params, r#"{ "bites_per_gap": 1, "bite_mm": 4.0 }"#).is_err() {
            unreachable!("write params");
        }
        let input = Path::new(env!("CARGO_MANIFEST_DIR")).join("../gerberpanel/tests/fixtures/rect");
        let output = dir.path().join("out");
        let args = Args::parse_from([
            OsString::from("gerberpanel"),
            input.into_os_string(),
            OsString::from("-o"),
            output.clone().into_os_string(),
            OsString::from("--params"),
            params.into_os_string(),
            OsString::from("--columns"),
            OsString::from("2"),
        ]);
        let written = run(&args).map(|paths| paths.len());
        assert!(matches!(written, Ok(11)), "{written:?}");
        assert!(output.join("panel.gm1").is_file());
    }

    #[test]
    fn ut_cli_005_layout_line_rounds_to_hundredths() {
        assert_eq!(
            layout_line(70.8 + 1e-14, 33.0, "Valid"),
            "70.80 x 33.00 mm: Valid"
        );
        assert_eq!(
            layout_line(10.0 / 3.0, 0.1 + 0.2, "1 tab(s) disconnected"),
            "3.33 x 0.30 mm: 1 tab(s) disconnected"
        );
    }

    #[test]
    fn bc_cli_001_rejects_bad_rotation_and_grid() {
        assert!(matches!(rotation(45), Err(CliError::Usage(_))));
        let args = Args::parse_from(["gerberpanel", "board", "--rows", "0"]);
        assert!(matches!(options(&args), Err(CliError::Usage(_))));
        let args = Args::parse_from(["gerberpanel", "board", "--preset", "acme"]);
        assert_eq!(parameters(&args).map_err(|e| e.code()).err(), Some(2));
    }
}
