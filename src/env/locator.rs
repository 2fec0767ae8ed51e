//! Locate an installed editor under the Hub root

use crate::config::INSTALL_SUFFIX;
use crate::error::{Result, SetupError};
use serde::Serialize;
use std::path::{Path, PathBuf};

// ============================================================================
// HUB LAYOUT
// ============================================================================

/// Editor executable relative to a version directory
#[cfg(target_os = "macos")]
pub const EDITOR_BINARY: &str = "Unity.app/Contents/MacOS/Unity";
#[cfg(target_os = "windows")]
pub const EDITOR_BINARY: &str = "Editor/Unity.exe";
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
pub const EDITOR_BINARY: &str = "Editor/Unity";

/// Default Hub installation root for this platform
pub fn default_hub_root() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        Some(PathBuf::from("/Applications/Unity/Hub/Editor"))
    }

    #[cfg(target_os = "windows")]
    {
        Some(PathBuf::from(r"C:\Program Files\Unity\Hub\Editor"))
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        dirs::home_dir().map(|home| home.join("Unity/Hub/Editor"))
    }
}

/// An editor found on disk. Recomputed on every run, never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolchainInstallation {
    pub version: String,
    pub path: PathBuf,
}

/// Probes a single Hub root.
#[derive(Debug, Clone)]
pub struct Locator {
    hub_root: PathBuf,
}

impl Locator {
    pub fn new(hub_root: impl Into<PathBuf>) -> Self {
        Self {
            hub_root: hub_root.into(),
        }
    }

    #[must_use]
    pub fn hub_root(&self) -> &Path {
        &self.hub_root
    }

    /// Find the editor binary for `version`.
    ///
    /// Checks `<root>/<version>` first and only falls back to
    /// `<root>/<version>f1` when the exact directory does not exist. A
    /// candidate directory without the binary inside yields `Ok(None)`.
    ///
    /// # Errors
    /// * `SetupError::MissingVersion` - `version` is empty
    pub async fn locate(&self, version: &str) -> Result<Option<ToolchainInstallation>> {
        if version.is_empty() {
            return Err(SetupError::MissingVersion);
        }

        let exact = self.hub_root.join(version);
        let dir = if is_dir(&exact).await {
            exact
        } else {
            let suffixed = self.hub_root.join(format!("{version}{INSTALL_SUFFIX}"));
            if !is_dir(&suffixed).await {
                tracing::debug!(root = %self.hub_root.display(), version, "no installation directory");
                return Ok(None);
            }
            suffixed
        };

        let binary = dir.join(EDITOR_BINARY);
        if !tokio::fs::try_exists(&binary).await.unwrap_or(false) {
            tracing::debug!(path = %binary.display(), "installation directory has no editor binary");
            return Ok(None);
        }

        Ok(Some(ToolchainInstallation {
            version: version.to_string(),
            path: binary,
        }))
    }
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}
