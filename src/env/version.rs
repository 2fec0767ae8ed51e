//! Editor version detection from project metadata

use crate::config::{PROJECT_VERSION_FILE, VERSION_MARKER};
use std::path::Path;

/// Read the editor version recorded in the project.
///
/// Returns `None` when the metadata file is missing or unreadable, when no
/// line carries [`VERSION_MARKER`], or when nothing follows the marker. The
/// extracted token is not validated beyond being non-empty.
pub async fn detect(project: &Path) -> Option<String> {
    let path = project.join(PROJECT_VERSION_FILE);

    let content = match tokio::fs::read_to_string(&path).await {
        Ok(content) => content,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "project version file unavailable");
            return None;
        }
    };

    let version = extract_version(&content);
    tracing::debug!(path = %path.display(), version = ?version, "detected editor version");
    version
}

/// Take the first line containing the marker and return what follows it.
pub fn extract_version(content: &str) -> Option<String> {
    content
        .lines()
        .find_map(|line| {
            line.find(VERSION_MARKER)
                .map(|pos| line[pos + VERSION_MARKER.len()..].trim())
        })
        .filter(|version| !version.is_empty())
        .map(str::to_string)
}
