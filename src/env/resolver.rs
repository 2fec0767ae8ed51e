//! Resolve the build environment for one run

use super::locator::{Locator, default_hub_root};
use super::source::{ConfigSource, Settings, load_all};
use super::version::detect;
use crate::config::{BuildMode, PROJECT_VERSION_FILE, ToolConfig, project_path};
use crate::error::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Setting that downstream build steps treat as an explicit editor path
pub const EXPLICIT_EDITOR_KEY: &str = "UNITY_PATH";

/// Everything a build or deploy step needs from this run.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    pub mode: BuildMode,
    pub toolchain_version: Option<String>,
    pub toolchain_path: Option<PathBuf>,
    pub settings: Settings,
    pub loaded_sources: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

/// Ordered config sources for `mode`: generic env file, mode env file, project script.
pub fn config_sources(project: &Path, config: &ToolConfig, mode: BuildMode) -> Result<Vec<ConfigSource>> {
    let env_file = project_path(project, &config.env_file)?;
    let mut sources = vec![ConfigSource::env_file("env file", &env_file)];

    if config.mode_env_files {
        let mode_file = PathBuf::from(format!("{}.{mode}", env_file.display()));
        sources.push(ConfigSource::env_file(format!("{mode} env file"), mode_file));
    }

    sources.push(ConfigSource::script(
        "project script",
        project_path(project, &config.project_script)?,
    ));
    Ok(sources)
}

/// Resolve mode, settings and editor installation for `project`.
///
/// Only the mode is validated strictly: an unrecognized value fails before
/// anything is read. Missing sources, an undetectable version or an
/// uninstalled editor are recorded in `warnings`.
pub async fn resolve(mode_arg: Option<&str>, project: &Path, config: &ToolConfig) -> Result<ResolvedConfig> {
    let mode = BuildMode::from_arg(mode_arg)?;
    tracing::debug!(%mode, project = %project.display(), "resolving build environment");

    let merged = load_all(&config_sources(project, config, mode)?).await;
    let mut warnings = merged.warnings;

    let toolchain_version = detect(project).await;
    let mut toolchain_path = None;

    match &toolchain_version {
        None => warnings.push(format!(
            "No editor version found in {}",
            project.join(PROJECT_VERSION_FILE).display()
        )),
        Some(version) => {
            let hub_root = config.hub_root.clone().or_else(default_hub_root);
            match hub_root {
                None => warnings.push(
                    "Could not determine the Unity Hub root (HOME not set)".to_string(),
                ),
                Some(root) => {
                    let locator = Locator::new(root);
                    match locator.locate(version).await? {
                        Some(installation) => toolchain_path = Some(installation.path),
                        None => {
                            let mut msg = format!(
                                "Unity {version} is not installed under {}",
                                locator.hub_root().display()
                            );
                            if merged.settings.contains_key(EXPLICIT_EDITOR_KEY) {
                                msg.push_str(&format!(
                                    " ({EXPLICIT_EDITOR_KEY} from settings will be used)"
                                ));
                            }
                            warnings.push(msg);
                        }
                    }
                }
            }
        }
    }

    Ok(ResolvedConfig {
        mode,
        toolchain_version,
        toolchain_path,
        settings: merged.settings,
        loaded_sources: merged.loaded,
        warnings,
    })
}
