//! Write keystore credentials back into an existing config source

use super::request::PersistedCredentialRecord;
use crate::env::source::split_assignment;
use crate::error::{Result, SetupError};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Where the backup of the original file went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistOutcome {
    pub target: PathBuf,
    pub backup: PathBuf,
}

/// Back up `target`, then rewrite the record's four entries in it.
///
/// Existing `KEY=` / `export KEY=` lines are replaced in place, missing
/// entries are appended, every other line is kept byte for byte. The file
/// must already exist; it is replaced atomically and left owner-only.
pub async fn persist_credentials(target: &Path, record: &PersistedCredentialRecord) -> Result<PersistOutcome> {
    let original = tokio::fs::read_to_string(target).await?;

    let backup = fresh_backup_path(target).await;
    tokio::fs::copy(target, &backup).await?;
    tracing::debug!(target = %target.display(), backup = %backup.display(), "backed up config source");

    let updated = rewrite_entries(&original, &record.entries());

    // Atomic write using temp file + rename
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp_file = NamedTempFile::new_in(dir)?;
    temp_file.write_all(updated.as_bytes())?;
    temp_file.flush()?;
    temp_file.persist(target).map_err(|e| SetupError::Io(e.error))?;

    // The target now holds passwords
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let file_perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(target, file_perms).await?;
    }

    Ok(PersistOutcome {
        target: target.to_path_buf(),
        backup,
    })
}

/// `<file>.backup`, or a timestamped name when that is already taken.
pub async fn fresh_backup_path(target: &Path) -> PathBuf {
    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "config".to_string());

    let plain = target.with_file_name(format!("{file_name}.backup"));
    if !tokio::fs::try_exists(&plain).await.unwrap_or(true) {
        return plain;
    }

    let stamp = chrono::Local::now().format("%Y%m%d%H%M%S");
    let mut candidate = target.with_file_name(format!("{file_name}.{stamp}.backup"));
    let mut n = 1;
    while tokio::fs::try_exists(&candidate).await.unwrap_or(true) {
        candidate = target.with_file_name(format!("{file_name}.{stamp}-{n}.backup"));
        n += 1;
    }
    candidate
}

/// Replace or append `entries` in the text of a config source.
pub fn rewrite_entries(content: &str, entries: &[(&str, &str)]) -> String {
    let mut seen = vec![false; entries.len()];
    let mut out = String::with_capacity(content.len() + 128);

    for line in content.split_inclusive('\n') {
        let body = line.trim_end_matches(['\r', '\n']);
        let ending = &line[body.len()..];
        let trimmed = body.trim_start();

        let position = if trimmed.starts_with('#') {
            None
        } else {
            split_assignment(trimmed)
                .and_then(|(key, _)| entries.iter().position(|(name, _)| *name == key))
        };

        match position {
            Some(idx) => {
                let indent = &body[..body.len() - trimmed.len()];
                let export = if trimmed.starts_with("export ") { "export " } else { "" };
                let (key, value) = entries[idx];
                out.push_str(&format!("{indent}{export}{key}={}{ending}", quote_value(value)));
                seen[idx] = true;
            }
            None => out.push_str(line),
        }
    }

    if seen.iter().any(|s| !s) && !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    for ((key, value), _) in entries.iter().zip(&seen).filter(|(_, seen)| !**seen) {
        out.push_str(&format!("{key}={}\n", quote_value(value)));
    }

    out
}

/// Quote a value so the config loader reads it back unchanged.
fn quote_value(value: &str) -> String {
    let plain = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./:@+,%".contains(c));
    if plain {
        return value.to_string();
    }

    if !value.contains('\'') {
        return format!("'{value}'");
    }

    let mut escaped = String::with_capacity(value.len() + 2);
    for c in value.chars() {
        if matches!(c, '\\' | '"' | '$' | '`') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    format!("\"{escaped}\"")
}
