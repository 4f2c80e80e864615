use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;

use crate::errors::FirescanError;

use super::model::{CredentialBundle, Exposure, JobSummary};

const NOT_FOUND: &str = "not found.";

/// Append-only output sink: stdout always, plus an optional file that
/// receives a duplicate of everything printed.
#[derive(Debug)]
pub struct ReportSink {
    file: Option<File>,
}

impl ReportSink {
    pub fn stdout_only() -> Self {
        Self { file: None }
    }

    pub fn with_file(path: &Path) -> Result<Self, FirescanError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                FirescanError::ScanError(format!(
                    "failed to open output sink {}: {}",
                    path.display(),
                    e
                ))
            })?;
        Ok(Self { file: Some(file) })
    }

    pub fn line(&mut self, message: &str) {
        let _ = io::stdout().write_all(message.as_bytes());
        let _ = io::stdout().write_all(b"\n");
        let _ = io::stdout().flush();
        if let Some(file) = self.file.as_mut() {
            let _ = file.write_all(message.as_bytes());
            let _ = file.write_all(b"\n");
            let _ = file.flush();
        }
    }

    pub fn blank(&mut self) {
        self.line("");
    }
}

#[derive(Serialize)]
struct PackageReport<'a> {
    package: &'a str,
    #[serde(rename = "documentFound")]
    document_found: bool,
    #[serde(flatten)]
    credentials: &'a CredentialBundle,
    #[serde(skip_serializing_if = "Option::is_none")]
    exposure: Option<&'a Exposure>,
}

/// Render one package's result as text: header, the four credential
/// fields, then the exposure verdict when a probe ran.
pub fn render_text(
    sink: &mut ReportSink,
    display_name: &str,
    summary: &JobSummary,
    probe_enabled: bool,
) {
    sink.line(&format!("{}:", display_name));
    if !summary.document_found {
        sink.line("[+] strings.xml not found in the decoded package.");
    }

    let creds = &summary.credentials;
    sink.line(&format!(
        "apiKey: {}",
        creds.api_key.as_deref().unwrap_or(NOT_FOUND)
    ));
    sink.line(&format!(
        "databaseURL: {}",
        creds.database_url.as_deref().unwrap_or(NOT_FOUND)
    ));
    sink.line(&format!(
        "projectId: {}",
        creds.project_id.as_deref().unwrap_or(NOT_FOUND)
    ));
    sink.line(&format!(
        "authDomain: {}",
        creds.auth_domain.as_deref().unwrap_or(NOT_FOUND)
    ));

    if let Some(exposure) = &summary.exposure {
        sink.blank();
        sink.line(&exposure_message(exposure));
    } else if probe_enabled && summary.document_found {
        sink.blank();
        sink.line(
            "[+] Unable to probe the database: no database URL was found in the package.",
        );
    }
}

/// Render one package's result as a single JSON object line.
pub fn render_json(sink: &mut ReportSink, display_name: &str, summary: &JobSummary) {
    let report = PackageReport {
        package: display_name,
        document_found: summary.document_found,
        credentials: &summary.credentials,
        exposure: summary.exposure.as_ref(),
    };
    match serde_json::to_string(&report) {
        Ok(line) => sink.line(&line),
        Err(e) => sink.line(&format!("{{\"package\": {:?}, \"error\": {:?}}}", display_name, e.to_string())),
    }
}

fn exposure_message(exposure: &Exposure) -> String {
    match exposure {
        Exposure::PermissionDenied => {
            "[+] Permission denied. Unauthenticated reads are rejected by default; \
             account signup on the project may still be open."
                .to_string()
        }
        Exposure::Deactivated => {
            "[+] The Firebase database has been deactivated; the developers shut this instance down."
                .to_string()
        }
        Exposure::OpenRead => {
            "[+] Null response detected! The database may allow unauthenticated reads \
             (and possibly writes)."
                .to_string()
        }
        Exposure::Indeterminate => {
            "[+] The database answered with a JSON body. It may be exposing real data or \
             serving an error page; verify manually before drawing conclusions."
                .to_string()
        }
        Exposure::ProbeFailed { reason } => {
            format!("Failed to reach the Firebase database: {}", reason)
        }
    }
}
