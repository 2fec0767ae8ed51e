//! Key/value configuration sources and their merged view.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// How a source file is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    /// `KEY=value` / `export KEY=value` lines; anything else is reported
    EnvFile,
    /// Shell script; only its top-level assignments are read, other lines skipped
    Script,
}

/// A named, optional origin of settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSource {
    pub name: String,
    pub path: PathBuf,
    pub format: SourceFormat,
}

impl ConfigSource {
    pub fn env_file(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            format: SourceFormat::EnvFile,
        }
    }

    pub fn script(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            format: SourceFormat::Script,
        }
    }
}

/// Outcome of reading one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceStatus {
    Loaded,
    Missing,
    Unreadable(String),
}

#[derive(Debug, Clone)]
pub struct LoadedSource {
    pub values: BTreeMap<String, String>,
    pub status: SourceStatus,
}

impl LoadedSource {
    #[must_use]
    pub fn found(&self) -> bool {
        self.status == SourceStatus::Loaded
    }

    fn absent(status: SourceStatus) -> Self {
        Self {
            values: BTreeMap::new(),
            status,
        }
    }
}

/// Merged settings. Built once per run and never mutated in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Settings(BTreeMap<String, String>);

impl Settings {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Layer `later` on top of these settings; keys in `later` win.
    #[must_use]
    pub fn merged(mut self, later: BTreeMap<String, String>) -> Self {
        self.0.extend(later);
        self
    }
}

impl FromIterator<(String, String)> for Settings {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Result of loading an ordered list of sources.
#[derive(Debug, Clone, Default)]
pub struct MergedSources {
    pub settings: Settings,
    pub loaded: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

/// Load every source in order, later sources overriding earlier ones.
///
/// Missing or unreadable sources never fail the run; they are recorded in
/// `warnings` and contribute nothing.
pub async fn load_all(sources: &[ConfigSource]) -> MergedSources {
    let mut merged = MergedSources::default();

    for source in sources {
        let loaded = load(source, &merged.settings).await;
        match &loaded.status {
            SourceStatus::Loaded => {
                tracing::debug!(
                    source = %source.name,
                    path = %source.path.display(),
                    keys = loaded.values.len(),
                    "loaded config source"
                );
                merged.loaded.push(source.path.clone());
            }
            SourceStatus::Missing => merged.warnings.push(format!(
                "{} not found: {} (continuing without it)",
                source.name,
                source.path.display()
            )),
            SourceStatus::Unreadable(reason) => merged.warnings.push(format!(
                "{} could not be read: {} ({reason})",
                source.name,
                source.path.display()
            )),
        }
        merged.settings = std::mem::take(&mut merged.settings).merged(loaded.values);
    }

    merged
}

/// Load one source.
///
/// `inherited` holds the settings merged so far; `$VAR` references resolve
/// against it (and this file's earlier lines) before the process environment.
pub async fn load(source: &ConfigSource, inherited: &Settings) -> LoadedSource {
    let content = match tokio::fs::read_to_string(&source.path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return LoadedSource::absent(SourceStatus::Missing);
        }
        Err(e) => return LoadedSource::absent(SourceStatus::Unreadable(e.to_string())),
    };

    LoadedSource {
        values: parse_assignments(&content, source.format, &source.path, inherited),
        status: SourceStatus::Loaded,
    }
}

/// Parse assignments out of a source's text.
pub fn parse_assignments(
    content: &str,
    format: SourceFormat,
    origin: &Path,
    inherited: &Settings,
) -> BTreeMap<String, String> {
    let mut values = BTreeMap::new();

    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((key, raw)) = split_assignment(line) else {
            match format {
                SourceFormat::EnvFile => {
                    tracing::warn!(
                        path = %origin.display(),
                        line = idx + 1,
                        "ignoring line that is not a KEY=value assignment"
                    );
                }
                SourceFormat::Script => {
                    tracing::debug!(path = %origin.display(), line = idx + 1, "skipping script statement");
                }
            }
            continue;
        };

        let value = decode_value(raw, &mut |name: &str| {
            values
                .get(name)
                .cloned()
                .or_else(|| inherited.get(name).map(str::to_string))
                .or_else(|| std::env::var(name).ok())
        });
        values.insert(key.to_string(), value);
    }

    values
}

pub(crate) fn split_assignment(line: &str) -> Option<(&str, &str)> {
    let body = line
        .strip_prefix("export ")
        .map(str::trim_start)
        .unwrap_or(line);
    let (key, value) = body.split_once('=')?;
    is_identifier(key).then_some((key, value))
}

fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn decode_value<F>(raw: &str, lookup: &mut F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    let raw = raw.trim();

    if let Some(inner) = raw.strip_prefix('\'') {
        if let Some(end) = inner.find('\'') {
            return format!("{}{}", &inner[..end], decode_tail(&inner[end + 1..], lookup));
        }
    }

    if let Some(inner) = raw.strip_prefix('"') {
        if let Some(end) = closing_double_quote(inner) {
            // `\$` stays literal; everything between escapes is expanded.
            let value = inner[..end]
                .split("\\$")
                .map(|segment| {
                    expand(segment, lookup)
                        .replace("\\\"", "\"")
                        .replace("\\`", "`")
                        .replace("\\\\", "\\")
                })
                .collect::<Vec<_>>()
                .join("$");
            return value + &decode_tail(&inner[end + 1..], lookup);
        }
    }

    let unquoted = match raw.find(" #") {
        Some(pos) => raw[..pos].trim_end(),
        None => raw,
    };
    expand(unquoted, lookup)
}

/// Text right after a closing quote joins the value unless a blank ends the word.
fn decode_tail<F>(tail: &str, lookup: &mut F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    if tail.is_empty() || tail.starts_with(char::is_whitespace) {
        String::new()
    } else {
        decode_value(tail, lookup)
    }
}

/// Byte offset of the first `"` not preceded by a backslash escape.
fn closing_double_quote(inner: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in inner.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '"' {
            return Some(i);
        }
    }
    None
}

fn expand<F>(input: &str, lookup: &mut F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    // Unset variables expand to nothing, as they would when sourced.
    shellexpand::env_with_context_no_errors(input, |name: &str| {
        Some(lookup(name).unwrap_or_default())
    })
    .into_owned()
}
