#![allow(dead_code)]

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use async_trait::async_trait;
use kodegen_bundler_unity::env::locator::EDITOR_BINARY;
use kodegen_bundler_unity::error::{Result, SetupError};
use kodegen_bundler_unity::keystore::{CredentialRequest, KeyGenerator, KeyParameters, Secret};
use kodegen_bundler_unity::prompts::Prompter;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

/// A throwaway Unity project next to a throwaway Hub root.
pub struct TestProject {
    _tmp: TempDir,
    pub root: PathBuf,
    pub hub: PathBuf,
    pub java_home: PathBuf,
}

impl TestProject {
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let root = tmp.path().join("game");
        let hub = tmp.path().join("hub");
        let java_home = tmp.path().join("jdk");
        fs::create_dir_all(root.join("ProjectSettings")).expect("create project");
        fs::create_dir_all(&hub).expect("create hub root");

        let keytool = if cfg!(windows) { "keytool.exe" } else { "keytool" };
        fs::create_dir_all(java_home.join("bin")).expect("create fake jdk");
        fs::write(java_home.join("bin").join(keytool), b"").expect("create fake keytool");

        Self {
            _tmp: tmp,
            root,
            hub,
            java_home,
        }
    }

    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(&path, content).expect("write project file");
        path
    }

    pub fn with_version(self, version: &str) -> Self {
        self.write(
            "ProjectSettings/ProjectVersion.txt",
            &format!("m_EditorVersion: {version}\nm_EditorVersionWithRevision: {version}f1 (0123456789ab)\n"),
        );
        self
    }

    /// Create `<hub>/<dir>` with an editor binary inside.
    pub fn install_editor(&self, dir: &str) -> PathBuf {
        let binary = self.hub.join(dir).join(EDITOR_BINARY);
        fs::create_dir_all(binary.parent().expect("binary parent")).expect("create editor dir");
        fs::write(&binary, b"").expect("create editor binary");
        binary
    }

    pub fn entries(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(&self.root)
            .expect("list project")
            .map(|e| e.expect("dir entry").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("kodegen_unity");
        cmd.arg("--project")
            .arg(&self.root)
            .env_remove("KODEGEN_UNITY_HUB_ROOT")
            .env_remove("KODEGEN_LOG")
            .env("JAVA_HOME", &self.java_home);
        cmd
    }
}

/// Prompter fed from queues; records every prompt shown.
#[derive(Default)]
pub struct ScriptedPrompter {
    lines: VecDeque<String>,
    secrets: VecDeque<String>,
    pub prompts: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new(lines: &[&str], secrets: &[&str]) -> Self {
        Self {
            lines: lines.iter().map(|s| s.to_string()).collect(),
            secrets: secrets.iter().map(|s| s.to_string()).collect(),
            prompts: Vec::new(),
        }
    }

    pub fn secret_prompts(&self) -> Vec<&str> {
        self.prompts
            .iter()
            .filter(|p| p.contains("password"))
            .map(String::as_str)
            .collect()
    }
}

impl Prompter for ScriptedPrompter {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        self.prompts.push(prompt.to_string());
        Ok(self.lines.pop_front())
    }

    fn read_secret(&mut self, prompt: &str) -> Result<Option<String>> {
        self.prompts.push(prompt.to_string());
        Ok(self.secrets.pop_front())
    }
}

/// What the fake generator was asked to do.
#[derive(Debug, Clone)]
pub struct Generated {
    pub keystore_path: PathBuf,
    pub alias: String,
    pub keystore_password: String,
    pub key_password: String,
    pub dname: String,
    pub params: KeyParameters,
}

/// Key generator that writes a placeholder keystore, or fails on demand.
#[derive(Default)]
pub struct FakeGenerator {
    pub fail: bool,
    pub calls: Mutex<Vec<Generated>>,
}

impl FakeGenerator {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Generated> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl KeyGenerator for FakeGenerator {
    async fn generate(&self, request: &CredentialRequest, params: &KeyParameters) -> Result<()> {
        self.calls.lock().expect("calls lock").push(Generated {
            keystore_path: request.keystore_path.clone(),
            alias: request.alias.clone(),
            keystore_password: request.keystore_password.expose().to_string(),
            key_password: request.key_password.expose().to_string(),
            dname: request.subject.distinguished_name(),
            params: params.clone(),
        });

        if self.fail {
            return Err(SetupError::KeyGeneration("keytool error: simulated (exit status: 1)".to_string()));
        }
        tokio::fs::write(&request.keystore_path, b"fake keystore").await?;
        Ok(())
    }

    async fn describe(&self, keystore: &Path, _store_password: &Secret) -> Result<String> {
        Ok(format!("Keystore: {}\nYour keystore contains 1 entry", keystore.display()))
    }
}
