//! How `bl` prints results and failures.
//!
//! The mode is picked from, in order: `--format`, `--json`, the
//! `BACKLOG_FORMAT` env var, then `pretty` for a terminal and `text` for a
//! pipe. Results go to stdout, failures to stderr.

use backlog_core::error::{ErrorCode, RankError};
use clap::ValueEnum;
use serde::Serialize;
use std::io::{self, IsTerminal, Write};

const RULE: &str = "------------------------------------------------------------";

/// Heading followed by a horizontal rule.
pub fn pretty_section(w: &mut dyn Write, heading: &str) -> io::Result<()> {
    writeln!(w, "{heading}\n{RULE}")
}

/// One aligned `key: value` line.
pub fn pretty_kv(w: &mut dyn Write, key: &str, value: impl AsRef<str>) -> io::Result<()> {
    let label = format!("{key}:");
    writeln!(w, "{label:<12} {}", value.as_ref())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Aligned output for humans.
    Pretty,
    /// Tab-separated rows for scripts.
    Text,
    /// Stable JSON.
    Json,
}

impl OutputMode {
    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }

    fn from_env_value(value: &str) -> Option<Self> {
        Self::from_str(value.trim(), true).ok()
    }

    fn pick(flag: Option<Self>, json: bool, env: Option<&str>, terminal: bool) -> Self {
        flag.or_else(|| json.then_some(Self::Json))
            .or_else(|| env.and_then(Self::from_env_value))
            .unwrap_or(if terminal { Self::Pretty } else { Self::Text })
    }
}

pub fn resolve_output_mode(format_flag: Option<OutputMode>, json_flag: bool) -> OutputMode {
    let env = std::env::var("BACKLOG_FORMAT").ok();
    OutputMode::pick(
        format_flag,
        json_flag,
        env.as_deref(),
        io::stdout().is_terminal(),
    )
}

/// Print `value` on stdout: serialized for JSON, otherwise through the text
/// or pretty writer.
pub fn render_mode<T: Serialize>(
    mode: OutputMode,
    value: &T,
    text: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
    pretty: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    match mode {
        OutputMode::Json => write_json(&mut out, value)?,
        OutputMode::Text => text(value, &mut out)?,
        OutputMode::Pretty => pretty(value, &mut out)?,
    }
    out.flush()?;
    Ok(())
}

/// [`render_mode`] with one writer for both human modes.
pub fn render<T: Serialize>(
    mode: OutputMode,
    value: &T,
    human: impl Fn(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    render_mode(mode, value, &human, &human)
}

fn write_json<T: Serialize + ?Sized>(out: &mut dyn Write, value: &T) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

/// Failure as shown to the user: message, error code and remediation.
#[derive(Debug, Serialize)]
pub struct CliError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl CliError {
    pub fn from_code(message: impl Into<String>, code: ErrorCode) -> Self {
        Self {
            message: message.into(),
            error_code: Some(code.code().to_string()),
            suggestion: code.hint().map(str::to_string),
        }
    }
}

impl From<&RankError> for CliError {
    fn from(err: &RankError) -> Self {
        Self::from_code(err.to_string(), err.code())
    }
}

/// Print `error` on stderr: `{"error": ...}` for JSON, otherwise
/// `error[CODE]: message` plus an indented suggestion.
pub fn render_error(mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    let mut out = io::stderr().lock();
    if mode.is_json() {
        return write_json(&mut out, &serde_json::json!({ "error": error }));
    }
    match &error.error_code {
        Some(code) => writeln!(out, "error[{code}]: {}", error.message)?,
        None => writeln!(out, "error: {}", error.message)?,
    }
    if let Some(suggestion) = &error.suggestion {
        writeln!(out, "  suggestion: {suggestion}")?;
    }
    Ok(())
}

/// Report an engine error and hand it back for the exit status.
pub fn fail(mode: OutputMode, err: RankError) -> anyhow::Error {
    if let Err(render_err) = render_error(mode, &CliError::from(&err)) {
        tracing::warn!(error = %render_err, "failed to render error");
    }
    anyhow::Error::new(err)
}
