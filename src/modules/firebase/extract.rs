use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::errors::FirescanError;

use super::model::CredentialBundle;

/// Google API keys carry this literal prefix.
const API_KEY_PREFIX: &str = "AIza";

/// Relative location of the resource-string document inside a decoded
/// package.
const STRINGS_DOCUMENT: &[&str] = &["res", "values", "strings.xml"];

/// One named string entry from the resource document. Self-closing
/// entries carry no value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringEntry {
    pub name: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone)]
pub enum Extraction {
    /// The resource document was not present in the decoded tree.
    Missing,
    Found(CredentialBundle),
}

fn entry_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<string\b[^>]*?\bname\s*=\s*"([^"]*)"[^>]*?(?:/>|>(.*?)</string\s*>)"#)
            .unwrap()
    })
}

fn database_url_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)database.*url").unwrap())
}

fn api_key_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)api.*key").unwrap())
}

fn project_id_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)project.*id").unwrap())
}

/// Extract the credential bundle from a decoded package directory.
///
/// A missing document is an expected per-job condition, not an error; the
/// caller reports every field as not found and skips probing.
pub fn extract_from_dir(decoded_dir: &Path) -> Result<Extraction, FirescanError> {
    let mut doc = decoded_dir.to_path_buf();
    for part in STRINGS_DOCUMENT {
        doc.push(part);
    }
    if !doc.is_file() {
        return Ok(Extraction::Missing);
    }
    let text = std::fs::read_to_string(&doc)?;
    let entries = parse_entries(&text);
    Ok(Extraction::Found(credentials_from_entries(&entries)))
}

/// Parse the resource document into its named string entries, in document
/// order.
pub fn parse_entries(document: &str) -> Vec<StringEntry> {
    entry_pattern()
        .captures_iter(document)
        .map(|caps| StringEntry {
            name: caps[1].to_string(),
            value: caps.get(2).map(|m| m.as_str().to_string()),
        })
        .collect()
}

/// Derive the credential bundle from the parsed entries.
///
/// One classification pass over the entries, first-match-wins per entry:
/// an entry feeds at most one field, and for each field the last matching
/// entry wins. An api-key-shaped entry is only accepted when its value
/// starts with the key prefix; a later non-conforming entry clears the
/// candidate, and the fallback scan below picks up the slack.
pub fn credentials_from_entries(entries: &[StringEntry]) -> CredentialBundle {
    let mut api_key: Option<String> = None;
    let mut database_url: Option<String> = None;
    let mut project_id: Option<String> = None;

    for entry in entries {
        if database_url_pattern().is_match(&entry.name) {
            database_url = entry.value.clone();
        } else if api_key_pattern().is_match(&entry.name) {
            api_key = entry
                .value
                .clone()
                .filter(|v| v.starts_with(API_KEY_PREFIX));
        } else if project_id_pattern().is_match(&entry.name) {
            project_id = entry.value.clone();
        }
    }

    // Fallback: any value with the key prefix, first in document order.
    if api_key.is_none() {
        api_key = entries
            .iter()
            .filter_map(|e| e.value.as_deref())
            .find(|v| v.starts_with(API_KEY_PREFIX))
            .map(str::to_string);
    }

    // Blunt heuristic, kept as-is: second dot-separated segment of the raw
    // URL string, not a hostname-aware parse.
    if project_id.is_none() {
        if let Some(url) = &database_url {
            project_id = url.split('.').nth(1).map(str::to_string);
        }
    }

    let auth_domain = project_id
        .as_ref()
        .map(|id| format!("{}.firebaseapp.com", id));

    CredentialBundle {
        api_key,
        database_url,
        project_id,
        auth_domain,
    }
}
