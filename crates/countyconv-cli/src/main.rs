//! Command-line interface for `countyconv`.
//!
//! Converts `tl_2019_us_county.zip` in the working directory into
//! `tl_2019_us_county.parquet`: geometries reprojected to EPSG:4326 and
//! stored as WKT text, no compression. The only options are the logging
//! flags.

mod display;

use anyhow::{Result, anyhow};
use clap::Parser;
use tracing::{Level, info};
use tracing_log::LogTracer;
use tracing_subscriber::FmtSubscriber;

use countyconv_core::{ConvertError, convert};

/// Archive read from the working directory.
const INPUT_PATH: &str = "tl_2019_us_county.zip";

/// Parquet file written to the working directory.
const OUTPUT_PATH: &str = "tl_2019_us_county.parquet";

#[derive(Parser)]
#[command(
    name = "countyconv",
    version,
    about = "Convert the TIGER/Line county shapefile to Parquet with WKT geometries",
    long_about = "Reads tl_2019_us_county.zip from the working directory, reprojects the county \
                  boundaries to EPSG:4326 and writes them as WKT to an uncompressed \
                  tl_2019_us_county.parquet."
)]
/// Command-line options: only logging verbosity.
struct Cli {
    /// Enable verbose (INFO level) logging output.
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug (DEBUG level) logging output with detailed diagnostics.
    #[arg(short, long)]
    debug: bool,
}

/// Entry point for the `countyconv` command-line interface.
///
/// # Errors
///
/// Returns an error if the conversion fails or the logging system cannot be initialized.
fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    // Bridge logs from the `log` crate to the `tracing` ecosystem.
    LogTracer::init()?;

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Converting {INPUT_PATH} to {OUTPUT_PATH}");
    let summary = convert(INPUT_PATH, OUTPUT_PATH).map_err(|err| anyhow!(describe_error(&err)))?;
    display::display_summary(&summary);

    Ok(())
}

/// User-facing message with the recovery hint, if any, on a separate line.
fn describe_error(err: &ConvertError) -> String {
    match err.recovery_suggestion() {
        Some(hint) => format!("{}\n\nHint: {hint}", err.user_message()),
        None => err.user_message(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use countyconv_core::error::{CrsError, IoError};
    use std::path::PathBuf;

    #[test]
    fn test_cli_flags() {
        let cli = Cli::try_parse_from(["countyconv", "-v"]).unwrap();
        assert!(cli.verbose);
        assert!(!cli.debug);

        let cli = Cli::try_parse_from(["countyconv", "--debug"]).unwrap();
        assert!(cli.debug);
    }

    #[test]
    fn test_cli_rejects_paths() {
        assert!(Cli::try_parse_from(["countyconv", "other.zip"]).is_err());
    }

    #[test]
    fn test_describe_error_with_hint() {
        let err: ConvertError = IoError::FileNotFound {
            path: PathBuf::from(INPUT_PATH),
        }
        .into();
        let text = describe_error(&err);
        assert!(text.starts_with("File not found: tl_2019_us_county.zip"));
        assert!(text.contains("\n\nHint: "));
    }

    #[test]
    fn test_describe_error_without_hint() {
        let err: ConvertError = CrsError::Transform {
            feature: 7,
            from: "EPSG:4269".to_string(),
            to: "EPSG:4326".to_string(),
            message: "latitude out of range".to_string(),
        }
        .into();
        let text = describe_error(&err);
        assert!(!text.contains("Hint"));
        assert!(text.contains("feature 7"));
    }
}
