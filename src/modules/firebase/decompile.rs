use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::errors::FirescanError;

use super::extract::{extract_from_dir, Extraction};
use super::model::{ArchiveJob, CredentialBundle, JobSummary};
use super::probe::ExposureProber;
use super::report::{render_json, render_text, ReportSink};
use super::tooling::{detect_apktool, BackendBinary};

/// Drives the external decompiler for one package at a time: spawn, watch
/// the streamed output for the resource-decode banner, extract, probe,
/// and always remove the transient output directory afterward.
pub struct DecompileOrchestrator {
    apktool: BackendBinary,
}

impl DecompileOrchestrator {
    pub fn detect() -> Self {
        Self {
            apktool: detect_apktool(),
        }
    }

    pub fn with_binary(apktool: BackendBinary) -> Self {
        Self { apktool }
    }

    pub fn available(&self) -> bool {
        self.apktool.available
    }

    fn program(&self) -> String {
        self.apktool
            .path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "apktool".to_string())
    }

    /// Process one package to completion and render its report. The decode
    /// directory is removed no matter how the job went.
    pub async fn run_job(
        &self,
        job: &ArchiveJob,
        prober: Option<&ExposureProber>,
        json: bool,
        sink: &mut ReportSink,
    ) -> Result<(), FirescanError> {
        let work_dir = decode_dir_for(&job.path);
        let outcome = self.decode_and_collect(job, &work_dir, prober).await;
        let result = match outcome {
            Ok(summary) => {
                if json {
                    render_json(sink, &job.display_name, &summary);
                } else {
                    render_text(sink, &job.display_name, &summary, prober.is_some());
                }
                Ok(())
            }
            Err(e) => Err(e),
        };
        cleanup(&work_dir, sink);
        result
    }

    async fn decode_and_collect(
        &self,
        job: &ArchiveJob,
        work_dir: &Path,
        prober: Option<&ExposureProber>,
    ) -> Result<JobSummary, FirescanError> {
        let program = self.program();
        debug!(package = %job.path.display(), %program, "launching decompiler");
        let mut child = Command::new(&program)
            .arg("d")
            .arg(&job.path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                FirescanError::ScanError(format!("failed to launch {}: {}", program, e))
            })?;

        // The reader stays open across wait() so the decompiler never sees
        // a closed pipe while it is still printing.
        let mut reader = child.stdout.take().map(|s| BufReader::new(s).lines());
        if let Some(lines) = reader.as_mut() {
            // A stream that ends before the banner is not an error; we go on
            // with whatever the decompiler managed to write.
            while let Some(line) = lines.next_line().await.unwrap_or(None) {
                if resources_decoded(&line) {
                    debug!("resource decode banner seen, stopping stream watch");
                    // The banner spans one more line; consume it, then stop
                    // reading early.
                    let _ = lines.next_line().await;
                    break;
                }
            }
        }

        // Resources are usable as soon as the banner shows, but the job only
        // completes once the decompiler has terminated.
        child.wait().await.map_err(|e| {
            FirescanError::ScanError(format!("wait failed for {}: {}", program, e))
        })?;
        drop(reader);

        let extraction = match extract_from_dir(work_dir) {
            Ok(extraction) => extraction,
            Err(e) => {
                warn!(dir = %work_dir.display(), "failed to read resource document: {}", e);
                Extraction::Missing
            }
        };
        let (document_found, credentials) = match extraction {
            Extraction::Missing => (false, CredentialBundle::default()),
            Extraction::Found(bundle) => (true, bundle),
        };

        let exposure = match (&credentials.database_url, prober) {
            (Some(url), Some(prober)) => Some(prober.probe(url).await),
            _ => None,
        };

        Ok(JobSummary {
            document_found,
            credentials,
            exposure,
        })
    }
}

/// True once the decompiler's progress banner reports that resource XMLs
/// have been decoded. Tied to apktool's banner text.
pub fn resources_decoded(line: &str) -> bool {
    line.contains("Decoding") && line.contains("XMLs")
}

/// The decompiler writes its output tree into the current directory, named
/// after the package's base file name.
pub fn decode_dir_for(package: &Path) -> PathBuf {
    package
        .file_stem()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("decoded"))
}

fn cleanup(work_dir: &Path, sink: &mut ReportSink) {
    if !work_dir.is_dir() {
        return;
    }
    if let Err(e) = std::fs::remove_dir_all(work_dir) {
        warn!(dir = %work_dir.display(), "cleanup failed: {}", e);
        sink.line(&format!(
            "Can't remove directory {}: {}",
            work_dir.display(),
            e
        ));
    }
}
