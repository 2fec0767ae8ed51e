//! Key pair generation through the JDK `keytool`

use super::request::{CredentialRequest, KeyParameters, Secret};
use crate::error::{Result, SetupError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;

// ============================================================================
// KEYTOOL CONFIGURATION
// ============================================================================

/// keytool binary name
#[cfg(windows)]
const KEYTOOL_BINARY: &str = "keytool.exe";
#[cfg(not(windows))]
const KEYTOOL_BINARY: &str = "keytool";

/// Environment variables carrying passwords to keytool (`-storepass:env`)
const STOREPASS_ENV: &str = "KODEGEN_KEYTOOL_STOREPASS";
const KEYPASS_ENV: &str = "KODEGEN_KEYTOOL_KEYPASS";

/// Installation instructions for missing keytool
const KEYTOOL_INSTALL_INSTRUCTIONS: &str = "\
keytool not found. It ships with every JDK:

macOS:          brew install openjdk
Ubuntu/Debian:  sudo apt-get install default-jdk-headless
Windows:        install a JDK and add its bin directory to PATH

Alternatively set JAVA_HOME to a JDK installation.
Unity also bundles one under <Editor>/Data/PlaybackEngines/AndroidPlayer/OpenJDK.";

/// Capability that produces a keystore from a credential request.
#[async_trait]
pub trait KeyGenerator: Send + Sync {
    /// Create the keystore at `request.keystore_path`.
    async fn generate(&self, request: &CredentialRequest, params: &KeyParameters) -> Result<()>;

    /// Human-readable listing of a keystore's contents.
    async fn describe(&self, keystore: &Path, store_password: &Secret) -> Result<String>;
}

/// [`KeyGenerator`] backed by a keytool executable.
#[derive(Debug, Clone)]
pub struct Keytool {
    binary: PathBuf,
}

impl Keytool {
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    #[must_use]
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Find keytool on `PATH`, then under `$JAVA_HOME/bin`.
    ///
    /// # Errors
    /// * `SetupError::MissingDependency` - neither location has keytool
    pub fn discover() -> Result<Self> {
        if let Ok(path) = which::which(KEYTOOL_BINARY) {
            return Ok(Self::with_binary(path));
        }

        if let Some(java_home) = std::env::var_os("JAVA_HOME") {
            let candidate = Path::new(&java_home).join("bin").join(KEYTOOL_BINARY);
            if candidate.is_file() {
                return Ok(Self::with_binary(candidate));
            }
        }

        Err(SetupError::MissingDependency(
            KEYTOOL_INSTALL_INSTRUCTIONS.to_string(),
        ))
    }
}

/// keytool arguments for `-genkeypair`; passwords travel via environment.
pub fn generate_args(request: &CredentialRequest, params: &KeyParameters) -> Vec<String> {
    vec![
        "-genkeypair".to_string(),
        "-v".to_string(),
        "-noprompt".to_string(),
        "-keystore".to_string(),
        request.keystore_path.to_string_lossy().into_owned(),
        "-alias".to_string(),
        request.alias.clone(),
        "-keyalg".to_string(),
        params.algorithm.clone(),
        "-keysize".to_string(),
        params.size.to_string(),
        "-validity".to_string(),
        params.validity_days.to_string(),
        "-storepass:env".to_string(),
        STOREPASS_ENV.to_string(),
        "-keypass:env".to_string(),
        KEYPASS_ENV.to_string(),
        "-dname".to_string(),
        request.subject.distinguished_name(),
    ]
}

#[async_trait]
impl KeyGenerator for Keytool {
    async fn generate(&self, request: &CredentialRequest, params: &KeyParameters) -> Result<()> {
        let args = generate_args(request, params);
        tracing::debug!(binary = %self.binary.display(), ?args, "running keytool");

        let output = tokio::process::Command::new(&self.binary)
            .args(&args)
            .env(STOREPASS_ENV, request.keystore_password.expose())
            .env(KEYPASS_ENV, request.key_password.expose())
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| SetupError::CommandExecution(format!("Failed to execute keytool: {e}")))?;

        if !output.status.success() {
            return Err(SetupError::KeyGeneration(failure_message(&output)));
        }

        if !tokio::fs::try_exists(&request.keystore_path).await.unwrap_or(false) {
            return Err(SetupError::KeyGeneration(
                "keytool reported success but the keystore file was not created".to_string(),
            ));
        }

        Ok(())
    }

    async fn describe(&self, keystore: &Path, store_password: &Secret) -> Result<String> {
        let output = tokio::process::Command::new(&self.binary)
            .arg("-list")
            .arg("-v")
            .arg("-keystore")
            .arg(keystore)
            .args(["-storepass:env", STOREPASS_ENV])
            .env(STOREPASS_ENV, store_password.expose())
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| SetupError::CommandExecution(format!("Failed to execute keytool: {e}")))?;

        if !output.status.success() {
            return Err(SetupError::CommandExecution(format!(
                "keytool -list failed: {}",
                failure_message(&output)
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// keytool reports most errors on stdout; prefer stderr when it has content.
fn failure_message(output: &std::process::Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let detail = if stderr.trim().is_empty() {
        stdout.trim()
    } else {
        stderr.trim()
    };

    if detail.is_empty() {
        format!("keytool exited with {}", output.status)
    } else {
        format!("{detail} ({})", output.status)
    }
}
