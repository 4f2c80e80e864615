use serde::Serialize;
use std::path::{Path, PathBuf};

/// One input package queued for processing.
#[derive(Debug, Clone)]
pub struct ArchiveJob {
    pub path: PathBuf,
    pub display_name: String,
}

impl ArchiveJob {
    pub fn from_path(path: &Path) -> Self {
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            path: path.to_path_buf(),
            display_name,
        }
    }
}

/// Credential fields recovered from a decoded package. Each field may
/// independently be absent; `auth_domain` is present exactly when
/// `project_id` is, and equals `"{project_id}.firebaseapp.com"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CredentialBundle {
    #[serde(rename = "apiKey")]
    pub api_key: Option<String>,
    #[serde(rename = "databaseURL")]
    pub database_url: Option<String>,
    #[serde(rename = "projectId")]
    pub project_id: Option<String>,
    #[serde(rename = "authDomain")]
    pub auth_domain: Option<String>,
}

/// Outcome of the single exploratory request against a database URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Exposure {
    PermissionDenied,
    Deactivated,
    OpenRead,
    Indeterminate,
    ProbeFailed { reason: String },
}

/// Everything one job produced, handed to the report renderer.
#[derive(Debug, Clone)]
pub struct JobSummary {
    pub document_found: bool,
    pub credentials: CredentialBundle,
    pub exposure: Option<Exposure>,
}
