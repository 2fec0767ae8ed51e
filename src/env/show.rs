//! Render a resolved configuration for operators and build scripts

use super::resolver::{EXPLICIT_EDITOR_KEY, ResolvedConfig};
use crate::error::Result;
use std::io::Write;
use termcolor::{BufferWriter, Color, ColorChoice, ColorSpec, WriteColor};

/// Output format for `env`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary
    #[default]
    Text,
    /// `export` lines suitable for `eval`
    Shell,
    /// JSON document
    Json,
}

/// Key under which the mode is exported
pub const MODE_KEY: &str = "KODEGEN_BUILD_MODE";

/// Key under which the detected version is exported
pub const VERSION_KEY: &str = "UNITY_VERSION";

/// Print `resolved` to stdout in `format`.
pub fn print_resolved(resolved: &ResolvedConfig, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print_text(resolved),
        OutputFormat::Shell => print!("{}", render_shell(resolved)),
        OutputFormat::Json => println!("{}", render_json(resolved)?),
    }
    Ok(())
}

/// `export KEY='value'` lines: merged settings first, then the resolved values.
///
/// An explicit `UNITY_PATH` from the settings is never replaced by the
/// detected editor path.
pub fn render_shell(resolved: &ResolvedConfig) -> String {
    let mut out = String::new();
    for (key, value) in resolved.settings.iter() {
        out.push_str(&export_line(key, value));
    }
    out.push_str(&export_line(MODE_KEY, resolved.mode.as_str()));
    if let Some(version) = &resolved.toolchain_version {
        out.push_str(&export_line(VERSION_KEY, version));
    }
    if let Some(path) = &resolved.toolchain_path {
        if !resolved.settings.contains_key(EXPLICIT_EDITOR_KEY) {
            out.push_str(&export_line(EXPLICIT_EDITOR_KEY, &path.to_string_lossy()));
        }
    }
    out
}

pub fn render_json(resolved: &ResolvedConfig) -> Result<String> {
    Ok(serde_json::to_string_pretty(resolved)?)
}

fn export_line(key: &str, value: &str) -> String {
    format!("export {key}='{}'\n", value.replace('\'', r"'\''"))
}

fn is_secret_key(key: &str) -> bool {
    let upper = key.to_ascii_uppercase();
    ["PASS", "SECRET", "TOKEN"].iter().any(|marker| upper.contains(marker))
}

fn print_text(resolved: &ResolvedConfig) {
    let bufwtr = BufferWriter::stdout(ColorChoice::Auto);
    let mut buffer = bufwtr.buffer();

    let _ = writeln!(&mut buffer, "📋 Resolved Build Environment\n");
    let _ = writeln!(&mut buffer, "Mode:           {}", resolved.mode);

    match &resolved.toolchain_version {
        Some(version) => {
            let _ = writeln!(&mut buffer, "Editor version: {version}");
        }
        None => {
            let _ = write!(&mut buffer, "Editor version: ");
            let _ = buffer.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)));
            let _ = writeln!(&mut buffer, "not detected");
            let _ = buffer.reset();
        }
    }

    match &resolved.toolchain_path {
        Some(path) => {
            let _ = write!(&mut buffer, "Editor path:    ");
            let _ = buffer.set_color(ColorSpec::new().set_fg(Some(Color::Green)));
            let _ = writeln!(&mut buffer, "{}", path.display());
            let _ = buffer.reset();
        }
        None => {
            let _ = write!(&mut buffer, "Editor path:    ");
            let _ = buffer.set_color(ColorSpec::new().set_fg(Some(Color::Red)));
            let _ = writeln!(&mut buffer, "not found");
            let _ = buffer.reset();
        }
    }

    let _ = writeln!(&mut buffer, "\nSources loaded: {}", resolved.loaded_sources.len());
    for path in &resolved.loaded_sources {
        let _ = writeln!(&mut buffer, "   {}", path.display());
    }

    let _ = writeln!(&mut buffer, "\nSettings: {}", resolved.settings.len());
    for (key, value) in resolved.settings.iter() {
        if is_secret_key(key) {
            let _ = writeln!(&mut buffer, "   {key}=********");
        } else {
            let _ = writeln!(&mut buffer, "   {key}={value}");
        }
    }

    let _ = bufwtr.print(&buffer);
}
