//! Interactive keystore provisioning workflow

use super::keytool::{KeyGenerator, Keytool};
use super::persist::{PersistOutcome, persist_credentials};
use super::request::{
    CredentialRequest, KeyParameters, PasswordIssue, RetryPolicy, Secret, Subject,
    check_password_length,
};
use crate::config::{KeystoreConfig, project_path};
use crate::error::{Result, SetupError};
use crate::prompts::{Prompter, TerminalPrompter, is_quit, prompt_with_default, prompt_yes_no};
use crate::error as error_msg;
use std::io::Write;
use std::path::{Path, PathBuf};
use termcolor::{BufferWriter, Color, ColorChoice, ColorSpec, WriteColor};
use zeroize::Zeroize;

/// What a completed run produced.
#[derive(Debug, Clone)]
pub struct ProvisionOutcome {
    pub keystore_path: PathBuf,
    pub alias: String,
    /// `None` when there was no target to update or the operator declined
    pub persisted: Option<PersistOutcome>,
}

/// Run the provisioning flow against the terminal and the system keytool.
pub async fn interactive_setup(project: &Path, config: &KeystoreConfig) -> Result<ProvisionOutcome> {
    // Fail before any prompt if the capability is missing
    let keytool = Keytool::discover()?;
    tracing::debug!(keytool = %keytool.binary().display(), "using keytool");

    let mut prompter = TerminalPrompter;
    ProvisioningFlow::new(&mut prompter, &keytool, project, config)
        .run()
        .await
}

/// Collects a credential request step by step, then generates and optionally saves it.
///
/// Steps run in a fixed order and are never revisited; only the password
/// prompts retry, under the configured [`RetryPolicy`].
pub struct ProvisioningFlow<'a, P: Prompter + ?Sized, G: KeyGenerator + ?Sized> {
    prompter: &'a mut P,
    generator: &'a G,
    project: &'a Path,
    config: &'a KeystoreConfig,
    retry: RetryPolicy,
}

impl<'a, P: Prompter + ?Sized, G: KeyGenerator + ?Sized> ProvisioningFlow<'a, P, G> {
    pub fn new(prompter: &'a mut P, generator: &'a G, project: &'a Path, config: &'a KeystoreConfig) -> Self {
        Self {
            prompter,
            generator,
            project,
            config,
            retry: RetryPolicy::from_attempts(config.password_attempts),
        }
    }

    pub async fn run(mut self) -> Result<ProvisionOutcome> {
        step_banner(1, "Keystore location");
        let keystore_path = self.collect_path().await?;

        step_banner(2, "Key alias");
        let alias = self.collect_alias()?;

        step_banner(3, "Passwords");
        let keystore_password = self.collect_password("Keystore password")?;
        let key_password = self.collect_password("Key password")?;

        step_banner(4, "Certificate subject");
        let subject = self.collect_subject()?;

        let request = CredentialRequest {
            keystore_path,
            alias,
            keystore_password,
            key_password,
            subject,
        };

        step_banner(5, "Generating keystore");
        self.generate(&request).await?;

        let persisted = self.offer_persistence(&request).await?;

        Ok(ProvisionOutcome {
            keystore_path: request.keystore_path,
            alias: request.alias,
            persisted,
        })
    }

    async fn collect_path(&mut self) -> Result<PathBuf> {
        let default = self.config.default_path.to_string_lossy().into_owned();
        let input = prompt_with_default(self.prompter, "Keystore path", &default)?;
        if is_quit(&input) {
            return Err(SetupError::Cancelled);
        }
        let path = project_path(self.project, Path::new(&input))?;

        if input != path.to_string_lossy() {
            println!("   → {}", path.display());
        }

        // Overwriting is never offered; the operator picks another path and reruns.
        if tokio::fs::try_exists(&path).await.unwrap_or(true) {
            return Err(SetupError::KeystoreExists(path));
        }

        Ok(path)
    }

    fn collect_alias(&mut self) -> Result<String> {
        prompt_with_default(self.prompter, "Key alias", &self.config.default_alias)
    }

    /// Ask for a password and its confirmation until both pass.
    ///
    /// A short entry re-prompts immediately; a mismatched confirmation
    /// discards both entries and starts over.
    fn collect_password(&mut self, label: &str) -> Result<Secret> {
        let mut failures = 0;

        loop {
            let Some(first) = self.prompter.read_secret(&format!("{label}: "))? else {
                return Err(SetupError::Cancelled);
            };
            let first = Secret::new(first);

            let issue = match check_password_length(first.expose()) {
                Err(issue) => Some(issue),
                Ok(()) => {
                    let Some(mut confirm) = self.prompter.read_secret(&format!("Confirm {label}: "))? else {
                        return Err(SetupError::Cancelled);
                    };
                    let matches = confirm == first.expose();
                    confirm.zeroize();
                    (!matches).then_some(PasswordIssue::Mismatch)
                }
            };

            let Some(issue) = issue else {
                return Ok(first);
            };

            failures += 1;
            error_msg!("{}", issue);
            if self.retry.exhausted(failures) {
                return Err(SetupError::RetriesExhausted(failures));
            }
            println!("   Please try again (Ctrl+D to cancel)\n");
        }
    }

    fn collect_subject(&mut self) -> Result<Subject> {
        let defaults = &self.config.subject;
        let subject = Subject {
            common_name: prompt_with_default(self.prompter, "Your name (CN)", &defaults.common_name)?,
            org_unit: prompt_with_default(self.prompter, "Organizational unit (OU)", &defaults.org_unit)?,
            org: prompt_with_default(self.prompter, "Organization (O)", &defaults.org)?,
            locality: prompt_with_default(self.prompter, "City or locality (L)", &defaults.locality)?,
            state: prompt_with_default(self.prompter, "State or province (ST)", &defaults.state)?,
            country_code: prompt_with_default(
                self.prompter,
                "Two-letter country code (C)",
                &defaults.country_code,
            )?,
        };

        if !subject.country_code_is_conventional() {
            warn!(
                "Country code '{}' is not two letters; keeping it as entered",
                subject.country_code
            );
        }

        Ok(subject)
    }

    async fn generate(&self, request: &CredentialRequest) -> Result<()> {
        if let Some(parent) = request.keystore_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let params = KeyParameters::from(self.config);
        success!(
            "Generating {} {}-bit key, valid {} days...",
            params.algorithm,
            params.size,
            params.validity_days
        );

        if let Err(e) = self.generator.generate(request, &params).await {
            error_msg!("Keystore generation failed");
            return Err(e);
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            tokio::fs::set_permissions(&request.keystore_path, perms).await?;
        }

        success!("Keystore created: {}", request.keystore_path.display());

        // The listing is informational; the keystore already exists at this point.
        match self
            .generator
            .describe(&request.keystore_path, &request.keystore_password)
            .await
        {
            Ok(listing) => {
                let bufwtr = BufferWriter::stdout(ColorChoice::Auto);
                let mut buffer = bufwtr.buffer();
                let _ = writeln!(&mut buffer, "\n{}", listing.trim_end());
                let _ = bufwtr.print(&buffer);
            }
            Err(e) => warn!("Could not list keystore contents: {e}"),
        }

        Ok(())
    }

    async fn offer_persistence(self, request: &CredentialRequest) -> Result<Option<PersistOutcome>> {
        let target = project_path(self.project, &self.config.persist_target)?;

        if !tokio::fs::try_exists(&target).await.unwrap_or(false) {
            let bufwtr = BufferWriter::stdout(ColorChoice::Auto);
            let mut buffer = bufwtr.buffer();
            let _ = writeln!(
                &mut buffer,
                "\nℹ️  {} not found; credentials were not saved.",
                target.display()
            );
            let _ = bufwtr.print(&buffer);
            return Ok(None);
        }

        let question = format!("\nSave keystore credentials to {}?", target.display());
        if !prompt_yes_no(self.prompter, &question)? {
            println!("Credentials not saved. Keystore is at {}", request.keystore_path.display());
            return Ok(None);
        }

        let outcome = persist_credentials(&target, &request.record()).await?;

        success!("Backup written: {}", outcome.backup.display());
        success!("Updated {}", outcome.target.display());

        let bufwtr = BufferWriter::stdout(ColorChoice::Auto);
        let mut buffer = bufwtr.buffer();
        let _ = buffer.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)));
        let _ = writeln!(
            &mut buffer,
            "   {} now contains passwords; keep it out of version control",
            outcome.target.display()
        );
        let _ = buffer.reset();
        let _ = bufwtr.print(&buffer);

        Ok(Some(outcome))
    }
}

fn step_banner(step: u8, title: &str) {
    let bufwtr = BufferWriter::stdout(ColorChoice::Auto);
    let mut buffer = bufwtr.buffer();
    let _ = writeln!(&mut buffer, "\n{}", "━".repeat(60));
    let _ = buffer.set_color(ColorSpec::new().set_bold(true));
    let _ = writeln!(&mut buffer, "Step {step}/5: {title}\n");
    let _ = buffer.reset();
    let _ = bufwtr.print(&buffer);
}
