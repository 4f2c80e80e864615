use clap::{ArgGroup, Parser};
use std::path::PathBuf;

use crate::errors::FirescanError;
use crate::modules::firebase::{FirebaseScanner, ReportSink, ScanOptions};

// logging
use tracing::info;
use tracing_subscriber::EnvFilter;

const BANNER: &str = r#"   __ _
  / _(_)_ __ ___  ___  ___ __ _ _ __
 | |_| | '__/ _ \/ __|/ __/ _` | '_ \
 |  _| | | |  __/\__ \ (_| (_| | | | |
 |_| |_|_|  \___||___/\___\__,_|_| |_|"#;

#[derive(Parser, Debug)]
#[command(
    name = "firescan",
    about = "Dig Firebase credentials out of Android packages",
    version
)]
#[command(group(ArgGroup::new("input").required(true).args(["apk", "directory"])))]
pub struct Cli {
    /// path to a single APK file
    #[arg(value_name = "APK")]
    pub apk: Option<PathBuf>,

    /// scan every APK in this directory
    #[arg(short = 'd', long)]
    pub directory: Option<PathBuf>,

    /// skip the database exposure probe
    #[arg(long)]
    pub no_probe: bool,

    /// write a duplicate of everything printed to this file
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// emit one JSON object per package instead of text
    #[arg(long)]
    pub json: bool,

    /// global log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,
}

pub async fn run_from_args<I, T>(args: I) -> Result<(), FirescanError>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    // initialize tracing according to log_level (ok if already initialized
    // in tests); diagnostics go to stderr so report output stays clean
    let env_filter = EnvFilter::new(cli.log_level.clone());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
    info!("Starting firescan, log_level={}", cli.log_level);

    let mut sink = match &cli.output {
        Some(path) => ReportSink::with_file(path)?,
        None => ReportSink::stdout_only(),
    };

    let scanner = FirebaseScanner::new(ScanOptions {
        probe: !cli.no_probe,
        json: cli.json,
    })?;

    if !cli.json {
        print_banner(&mut sink);
    }

    if let Some(dir) = &cli.directory {
        scanner.scan_directory(dir, &mut sink).await?;
    } else if let Some(apk) = &cli.apk {
        scanner.scan_package(apk, &mut sink).await?;
    }

    Ok(())
}

/// Run using environment args
pub async fn run() -> Result<(), FirescanError> {
    run_from_args(std::env::args()).await
}

fn print_banner(sink: &mut ReportSink) {
    for line in BANNER.lines() {
        sink.line(line);
    }
    sink.line("     === Dig the Firebase credentials out of APKs! ===");
    sink.blank();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn an_input_is_required() {
        assert!(Cli::try_parse_from(["firescan"]).is_err());
    }

    #[test]
    fn single_package_and_directory_are_mutually_exclusive() {
        assert!(Cli::try_parse_from(["firescan", "app.apk", "-d", "pkgs"]).is_err());
    }

    #[test]
    fn single_package_invocation_parses() {
        let cli =
            Cli::try_parse_from(["firescan", "app.apk", "--no-probe", "-o", "report.txt"]).unwrap();
        assert_eq!(cli.apk, Some(PathBuf::from("app.apk")));
        assert!(cli.no_probe);
        assert_eq!(cli.output, Some(PathBuf::from("report.txt")));
        assert!(!cli.json);
    }

    #[test]
    fn directory_invocation_parses() {
        let cli = Cli::try_parse_from(["firescan", "-d", "pkgs", "--json"]).unwrap();
        assert_eq!(cli.directory, Some(PathBuf::from("pkgs")));
        assert!(cli.json);
        assert_eq!(cli.log_level, "info");
    }
}
