use std::path::{Path, PathBuf};

use tracing::info;

use crate::errors::FirescanError;

use super::decompile::DecompileOrchestrator;
use super::model::ArchiveJob;
use super::probe::ExposureProber;
use super::report::ReportSink;

pub const PACKAGE_EXTENSION: &str = "apk";
pub const BUNDLE_EXTENSION: &str = "xapk";

pub const UNSUPPORTED_BUNDLE_NOTICE: &str =
    "[+] XAPK bundles are not supported. Extract the base APK out of the bundle and rerun against it.";

#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Probe the discovered database URL after extraction.
    pub probe: bool,
    /// Emit one JSON object per package instead of text.
    pub json: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            probe: true,
            json: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchTarget {
    Package(PathBuf),
    UnsupportedBundle(PathBuf),
}

/// Module-level API: runs the extraction pipeline over a single package or
/// a directory of packages, one job at a time.
///
/// Serial processing is a correctness requirement, not a convenience: the
/// decode directory is named only by package stem, so overlapping jobs
/// with the same stem would corrupt each other.
pub struct FirebaseScanner {
    orchestrator: DecompileOrchestrator,
    prober: Option<ExposureProber>,
    json: bool,
}

impl FirebaseScanner {
    pub fn new(options: ScanOptions) -> Result<Self, FirescanError> {
        let orchestrator = DecompileOrchestrator::detect();
        if !orchestrator.available() {
            return Err(FirescanError::ScanError(
                "apktool not found on PATH; install it before scanning".to_string(),
            ));
        }
        Self::with_orchestrator(orchestrator, options)
    }

    /// Assemble from an explicit orchestrator (lets tests inject a fake
    /// decompiler binary).
    pub fn with_orchestrator(
        orchestrator: DecompileOrchestrator,
        options: ScanOptions,
    ) -> Result<Self, FirescanError> {
        let prober = if options.probe {
            Some(ExposureProber::new()?)
        } else {
            None
        };
        Ok(Self {
            orchestrator,
            prober,
            json: options.json,
        })
    }

    pub async fn scan_package(
        &self,
        path: &Path,
        sink: &mut ReportSink,
    ) -> Result<(), FirescanError> {
        if has_extension(path, BUNDLE_EXTENSION) {
            sink.line(UNSUPPORTED_BUNDLE_NOTICE);
            return Ok(());
        }
        if !has_extension(path, PACKAGE_EXTENSION) {
            return Err(FirescanError::ScanError(format!(
                "unsupported input {} (expected a .{} file)",
                path.display(),
                PACKAGE_EXTENSION
            )));
        }
        let job = ArchiveJob::from_path(path);
        info!(package = %job.display_name, "processing package");
        self.orchestrator
            .run_job(&job, self.prober.as_ref(), self.json, sink)
            .await?;
        self.separator(sink);
        Ok(())
    }

    /// Process every package in the directory's immediate entries. Per-job
    /// failures become report lines and never stop the batch; only an
    /// unreadable directory is fatal.
    pub async fn scan_directory(
        &self,
        dir: &Path,
        sink: &mut ReportSink,
    ) -> Result<(), FirescanError> {
        for target in collect_targets(dir)? {
            match target {
                BatchTarget::Package(path) => {
                    let job = ArchiveJob::from_path(&path);
                    info!(package = %job.display_name, "processing package");
                    if let Err(e) = self
                        .orchestrator
                        .run_job(&job, self.prober.as_ref(), self.json, sink)
                        .await
                    {
                        sink.line(&format!("[!] {}: {}", job.display_name, e));
                    }
                    self.separator(sink);
                }
                BatchTarget::UnsupportedBundle(_) => {
                    sink.line(UNSUPPORTED_BUNDLE_NOTICE);
                    self.separator(sink);
                }
            }
        }
        Ok(())
    }

    fn separator(&self, sink: &mut ReportSink) {
        if !self.json {
            sink.blank();
        }
    }
}

/// Enumerate a directory's immediate entries, sorted by path so batch
/// output order is reproducible across platforms. Entries that are neither
/// packages nor bundles are skipped.
pub fn collect_targets(dir: &Path) -> Result<Vec<BatchTarget>, FirescanError> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        paths.push(entry.path());
    }
    paths.sort();
    Ok(paths
        .into_iter()
        .filter_map(|p| {
            if has_extension(&p, PACKAGE_EXTENSION) {
                Some(BatchTarget::Package(p))
            } else if has_extension(&p, BUNDLE_EXTENSION) {
                Some(BatchTarget::UnsupportedBundle(p))
            } else {
                None
            }
        })
        .collect())
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case(ext))
        .unwrap_or(false)
}
