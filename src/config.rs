//! Configuration structures for environment resolution and keystore provisioning.

use crate::error::{Result, SetupError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Project-relative file holding the editor version
pub const PROJECT_VERSION_FILE: &str = "ProjectSettings/ProjectVersion.txt";

/// Marker preceding the editor version inside [`PROJECT_VERSION_FILE`]
pub const VERSION_MARKER: &str = "m_EditorVersion:";

/// Suffix the Hub installer appends to release directories
pub const INSTALL_SUFFIX: &str = "f1";

/// Name of the optional tool configuration looked up in the project root
pub const PROJECT_CONFIG_FILE: &str = "kodegen-unity.toml";

pub const DEFAULT_ENV_FILE: &str = ".env";
pub const DEFAULT_PROJECT_SCRIPT: &str = "build.config.sh";
pub const DEFAULT_KEYSTORE_PATH: &str = "release.keystore";
pub const DEFAULT_KEY_ALIAS: &str = "release";
pub const DEFAULT_KEY_ALGORITHM: &str = "RSA";
pub const DEFAULT_KEY_SIZE: u32 = 2048;
pub const DEFAULT_VALIDITY_DAYS: u32 = 10_000;

/// Build target mode.
///
/// Parsed from free text at the CLI boundary; anything other than the two
/// known names is rejected rather than coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    #[default]
    Dev,
    Prod,
}

impl BuildMode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Prod => "prod",
        }
    }

    /// Parse an optional CLI argument, defaulting to [`BuildMode::Dev`] when absent.
    pub fn from_arg(arg: Option<&str>) -> Result<Self> {
        match arg {
            None => Ok(Self::default()),
            Some(raw) => raw.parse(),
        }
    }
}

impl FromStr for BuildMode {
    type Err = SetupError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "dev" => Ok(Self::Dev),
            "prod" => Ok(Self::Prod),
            other => Err(SetupError::InvalidMode(other.to_string())),
        }
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tool configuration, read from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Directory holding one sub-directory per installed editor version
    #[serde(default)]
    pub hub_root: Option<PathBuf>,

    /// Generic key/value source, loaded first
    #[serde(default = "default_env_file")]
    pub env_file: PathBuf,

    /// Project script, loaded last
    #[serde(default = "default_project_script")]
    pub project_script: PathBuf,

    /// Load `<env_file>.<mode>` between the generic source and the script
    #[serde(default = "default_true")]
    pub mode_env_files: bool,

    #[serde(default)]
    pub keystore: KeystoreConfig,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            hub_root: None,
            env_file: default_env_file(),
            project_script: default_project_script(),
            mode_env_files: true,
            keystore: KeystoreConfig::default(),
        }
    }
}

impl ToolConfig {
    /// Load the tool configuration for a project.
    ///
    /// An explicit path must exist. Without one, `kodegen-unity.toml` in the
    /// project root is used when present and defaults otherwise.
    pub async fn load(explicit: Option<&Path>, project: &Path) -> Result<Self> {
        let path = match explicit {
            Some(path) => {
                if !tokio::fs::try_exists(path).await.unwrap_or(false) {
                    return Err(SetupError::InvalidConfig(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                path.to_path_buf()
            }
            None => {
                let candidate = project.join(PROJECT_CONFIG_FILE);
                if !tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
                    tracing::debug!(path = %candidate.display(), "no tool config, using defaults");
                    return Ok(Self::default());
                }
                candidate
            }
        };

        let content = tokio::fs::read_to_string(&path).await?;
        let config: Self = toml::from_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded tool config");
        Ok(config)
    }
}

/// Keystore provisioning defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeystoreConfig {
    #[serde(default = "default_keystore_path")]
    pub default_path: PathBuf,

    #[serde(default = "default_alias")]
    pub default_alias: String,

    #[serde(default = "default_key_algorithm")]
    pub key_algorithm: String,

    #[serde(default = "default_key_size")]
    pub key_size: u32,

    #[serde(default = "default_validity_days")]
    pub validity_days: u32,

    /// Attempts allowed per password prompt; 0 means unlimited
    #[serde(default)]
    pub password_attempts: u32,

    /// Config source that receives the credentials after generation
    #[serde(default = "default_env_file")]
    pub persist_target: PathBuf,

    #[serde(default)]
    pub subject: SubjectDefaults,
}

impl Default for KeystoreConfig {
    fn default() -> Self {
        Self {
            default_path: default_keystore_path(),
            default_alias: default_alias(),
            key_algorithm: default_key_algorithm(),
            key_size: DEFAULT_KEY_SIZE,
            validity_days: DEFAULT_VALIDITY_DAYS,
            password_attempts: 0,
            persist_target: default_env_file(),
            subject: SubjectDefaults::default(),
        }
    }
}

/// Defaults offered for each certificate subject prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubjectDefaults {
    pub common_name: String,
    pub org_unit: String,
    pub org: String,
    pub locality: String,
    pub state: String,
    pub country_code: String,
}

impl Default for SubjectDefaults {
    fn default() -> Self {
        Self {
            common_name: "Android Release".to_string(),
            org_unit: "Mobile".to_string(),
            org: "Unknown".to_string(),
            locality: "Unknown".to_string(),
            state: "Unknown".to_string(),
            country_code: "US".to_string(),
        }
    }
}

/// Resolve a configured path against the project root, expanding `~`.
pub fn project_path(project: &Path, configured: &Path) -> Result<PathBuf> {
    let expanded = expand_tilde_path(&configured.to_string_lossy())?;
    let expanded = PathBuf::from(expanded);
    if expanded.is_absolute() {
        Ok(expanded)
    } else {
        Ok(project.join(expanded))
    }
}

/// Expand tilde in path, returning error if HOME is not set
///
/// When HOME is unset, `shellexpand` leaves `~` unchanged; that case is
/// reported instead of silently producing a relative `~/...` path.
pub fn expand_tilde_path(path: &str) -> Result<String> {
    let expanded = shellexpand::tilde(path).to_string();

    if path.starts_with('~') && expanded.starts_with('~') {
        return Err(SetupError::InvalidConfig(
            "Could not expand ~ in path (HOME environment variable not set).\n\
             Please use an absolute path instead."
                .to_string(),
        ));
    }

    Ok(expanded)
}

fn default_env_file() -> PathBuf {
    PathBuf::from(DEFAULT_ENV_FILE)
}

fn default_project_script() -> PathBuf {
    PathBuf::from(DEFAULT_PROJECT_SCRIPT)
}

fn default_keystore_path() -> PathBuf {
    PathBuf::from(DEFAULT_KEYSTORE_PATH)
}

fn default_alias() -> String {
    DEFAULT_KEY_ALIAS.to_string()
}

fn default_key_algorithm() -> String {
    DEFAULT_KEY_ALGORITHM.to_string()
}

fn default_key_size() -> u32 {
    DEFAULT_KEY_SIZE
}

fn default_validity_days() -> u32 {
    DEFAULT_VALIDITY_DAYS
}

fn default_true() -> bool {
    true
}
