//! User interaction prompts and colored output macros
//!
//! All termcolor operations use `let _ =` to deliberately ignore errors.
//! Colored output is decorative; if stdout/stderr is unavailable the
//! program continues without it.

use crate::error::{Result, SetupError};
use std::io::{self, BufRead, Write};

/// Macro for printing warnings with yellow color
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {{
        let bufwtr = termcolor::BufferWriter::stderr(termcolor::ColorChoice::Auto);
        let mut buffer = bufwtr.buffer();
        let _ = buffer.set_color(termcolor::ColorSpec::new().set_fg(Some(termcolor::Color::Yellow)));
        let _ = write!(&mut buffer, "⚠️  ");
        let _ = buffer.reset();
        let _ = writeln!(&mut buffer, $($arg)*);
        let _ = bufwtr.print(&buffer);
    }};
}

/// Macro for printing errors with red color
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {{
        let bufwtr = termcolor::BufferWriter::stderr(termcolor::ColorChoice::Auto);
        let mut buffer = bufwtr.buffer();
        let _ = buffer.set_color(termcolor::ColorSpec::new().set_fg(Some(termcolor::Color::Red)));
        let _ = write!(&mut buffer, "❌ ");
        let _ = buffer.reset();
        let _ = writeln!(&mut buffer, $($arg)*);
        let _ = bufwtr.print(&buffer);
    }};
}

/// Macro for printing success messages with green color
#[macro_export]
macro_rules! success {
    ($($arg:tt)*) => {{
        let bufwtr = termcolor::BufferWriter::stdout(termcolor::ColorChoice::Auto);
        let mut buffer = bufwtr.buffer();
        let _ = buffer.set_color(termcolor::ColorSpec::new().set_fg(Some(termcolor::Color::Green)));
        let _ = write!(&mut buffer, "✓ ");
        let _ = buffer.reset();
        let _ = writeln!(&mut buffer, $($arg)*);
        let _ = bufwtr.print(&buffer);
    }};
}

/// Source of operator input.
///
/// Both methods return `Ok(None)` on end of input (Ctrl+D), which callers
/// treat as cancellation.
pub trait Prompter {
    /// Show `prompt` and read one line of text, without the trailing newline.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;

    /// Show `prompt` and read a line without echoing it.
    fn read_secret(&mut self, prompt: &str) -> Result<Option<String>>;
}

/// Prompter backed by the process terminal.
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        print!("{prompt}");
        io::stdout().flush()?;

        let mut input = String::new();
        let bytes_read = io::stdin().lock().read_line(&mut input)?;
        if bytes_read == 0 {
            println!();
            return Ok(None);
        }

        Ok(Some(input.trim_end_matches(['\r', '\n']).to_string()))
    }

    fn read_secret(&mut self, prompt: &str) -> Result<Option<String>> {
        match rpassword::prompt_password(prompt) {
            Ok(secret) => Ok(Some(secret)),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                println!();
                Ok(None)
            }
            Err(e) => Err(SetupError::Io(e)),
        }
    }
}

/// Whether a typed answer asks to leave the flow.
#[must_use]
pub fn is_quit(input: &str) -> bool {
    let input = input.trim();
    input.eq_ignore_ascii_case("q") || input.eq_ignore_ascii_case("quit")
}

/// Prompt for a value, falling back to `default` on empty input.
///
/// Any other text, `q` included, is taken as the answer. Closing input
/// cancels the whole flow.
pub fn prompt_with_default<P: Prompter + ?Sized>(
    prompter: &mut P,
    label: &str,
    default: &str,
) -> Result<String> {
    let Some(input) = prompter.read_line(&format!("{label} [{default}]: "))? else {
        return Err(SetupError::Cancelled);
    };

    let input = input.trim();
    if input.is_empty() {
        Ok(default.to_string())
    } else {
        Ok(input.to_string())
    }
}

/// Prompt user for yes/no answer, looping until valid input
///
/// Accepts "y", "yes", "n", "no" (case insensitive). End of input is
/// treated as "no".
pub fn prompt_yes_no<P: Prompter + ?Sized>(prompter: &mut P, question: &str) -> Result<bool> {
    loop {
        let Some(response) = prompter.read_line(&format!("{question} (y/n): "))? else {
            println!("EOF detected, treating as 'no'");
            return Ok(false);
        };

        let response = response.trim().to_lowercase();

        match response.as_str() {
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            "" => {
                eprintln!("⚠️  Empty input. Please enter 'y' for yes or 'n' for no.");
            }
            _ => {
                eprintln!("⚠️  Invalid input: '{response}'. Please enter 'y' or 'n'.");
            }
        }
    }
}
