//! Credential request types and their validation rules

use crate::config::KeystoreConfig;
use std::fmt;
use std::num::NonZeroU32;
use std::path::PathBuf;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Minimum length keytool accepts for store and key passwords
pub const MIN_PASSWORD_LEN: usize = 6;

/// Config entries written back after a confirmed save
pub const KEYSTORE_PATH_KEY: &str = "ANDROID_KEYSTORE_PATH";
pub const KEYSTORE_PASSWORD_KEY: &str = "ANDROID_KEYSTORE_PASSWORD";
pub const KEY_ALIAS_KEY: &str = "ANDROID_KEY_ALIAS";
pub const KEY_PASSWORD_KEY: &str = "ANDROID_KEY_PASSWORD";

/// A password that never shows up in `Debug` output and is wiped on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(********)")
    }
}

/// Why a password entry was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordIssue {
    TooShort,
    Mismatch,
}

impl fmt::Display for PasswordIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort => write!(f, "Password must be at least {MIN_PASSWORD_LEN} characters"),
            Self::Mismatch => f.write_str("Passwords do not match"),
        }
    }
}

/// Length check applied before asking for confirmation.
pub fn check_password_length(password: &str) -> Result<(), PasswordIssue> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        Err(PasswordIssue::TooShort)
    } else {
        Ok(())
    }
}

/// How many rejected entries a password prompt tolerates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryPolicy {
    max_attempts: Option<NonZeroU32>,
}

impl RetryPolicy {
    /// Unlimited retries; the operator cancels with Ctrl+D.
    #[must_use]
    pub fn unlimited() -> Self {
        Self { max_attempts: None }
    }

    /// `0` means unlimited.
    #[must_use]
    pub fn from_attempts(attempts: u32) -> Self {
        Self {
            max_attempts: NonZeroU32::new(attempts),
        }
    }

    #[must_use]
    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts.map(NonZeroU32::get)
    }

    #[must_use]
    pub fn exhausted(&self, failures: u32) -> bool {
        matches!(self.max_attempts, Some(max) if failures >= max.get())
    }
}

/// Certificate subject fields, in distinguished-name order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub common_name: String,
    pub org_unit: String,
    pub org: String,
    pub locality: String,
    pub state: String,
    pub country_code: String,
}

impl Subject {
    /// `CN=..., OU=..., O=..., L=..., ST=..., C=...` with RFC 4514 escaping.
    #[must_use]
    pub fn distinguished_name(&self) -> String {
        [
            ("CN", &self.common_name),
            ("OU", &self.org_unit),
            ("O", &self.org),
            ("L", &self.locality),
            ("ST", &self.state),
            ("C", &self.country_code),
        ]
        .iter()
        .map(|(attr, value)| format!("{attr}={}", escape_dn_value(value)))
        .collect::<Vec<_>>()
        .join(", ")
    }

    /// Country codes are asked for as two letters but not enforced.
    #[must_use]
    pub fn country_code_is_conventional(&self) -> bool {
        self.country_code.len() == 2 && self.country_code.chars().all(|c| c.is_ascii_alphabetic())
    }
}

/// RFC 4514 attribute value escaping.
///
/// A leading `#` would otherwise be read as a hex-encoded BER value, and
/// unescaped leading or trailing spaces are dropped by DN parsers.
fn escape_dn_value(value: &str) -> String {
    let last = value.len().saturating_sub(1);
    let mut out = String::with_capacity(value.len() + 2);
    for (i, c) in value.char_indices() {
        let special = matches!(c, ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=');
        let leading = i == 0 && matches!(c, '#' | ' ');
        let trailing = i == last && c == ' ';
        if special || leading || trailing {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Key pair parameters passed to the generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyParameters {
    pub algorithm: String,
    pub size: u32,
    pub validity_days: u32,
}

impl From<&KeystoreConfig> for KeyParameters {
    fn from(config: &KeystoreConfig) -> Self {
        Self {
            algorithm: config.key_algorithm.clone(),
            size: config.key_size,
            validity_days: config.validity_days,
        }
    }
}

/// Everything collected from the operator.
#[derive(Debug, Clone)]
pub struct CredentialRequest {
    pub keystore_path: PathBuf,
    pub alias: String,
    pub keystore_password: Secret,
    pub key_password: Secret,
    pub subject: Subject,
}

impl CredentialRequest {
    #[must_use]
    pub fn record(&self) -> PersistedCredentialRecord {
        PersistedCredentialRecord {
            keystore_path: self.keystore_path.to_string_lossy().into_owned(),
            keystore_password: self.keystore_password.clone(),
            alias: self.alias.clone(),
            key_password: self.key_password.clone(),
        }
    }
}

/// The subset of a request written back into a config source.
#[derive(Debug, Clone)]
pub struct PersistedCredentialRecord {
    pub keystore_path: String,
    pub keystore_password: Secret,
    pub alias: String,
    pub key_password: Secret,
}

impl PersistedCredentialRecord {
    /// Named entries in the order they are appended when absent.
    #[must_use]
    pub fn entries(&self) -> [(&'static str, &str); 4] {
        [
            (KEYSTORE_PATH_KEY, self.keystore_path.as_str()),
            (KEYSTORE_PASSWORD_KEY, self.keystore_password.expose()),
            (KEY_ALIAS_KEY, self.alias.as_str()),
            (KEY_PASSWORD_KEY, self.key_password.expose()),
        ]
    }
}
