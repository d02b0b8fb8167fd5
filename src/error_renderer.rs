//! Error rendering using ariadne
//!
//! Compilation errors are rendered against the script source with a label
//! under the offending position. Every other error is a single line.

use crate::{CompileDiagnostic, Error};
use ariadne::{ColorGenerator, Label, Report, ReportKind, Source};
use std::io::Write;
use std::ops::Range;

/// Character set for rendering error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CharSet {
    /// Use Unicode characters for rich visual output.
    #[default]
    Unicode,
    /// Use ASCII-only characters for compatibility.
    Ascii,
}

/// Configuration for error rendering.
#[derive(Debug, Clone)]
pub struct RenderConfig<'a> {
    /// Whether to use ANSI color codes in output.
    pub color: bool,
    /// The filename to display in error messages.
    /// Defaults to the diagnostic's unit, then to "<unknown>".
    pub filename: Option<&'a str>,
    /// The character set to use for rendering.
    pub charset: CharSet,
}

impl Default for RenderConfig<'_> {
    fn default() -> Self {
        RenderConfig::default()
    }
}

impl RenderConfig<'_> {
    const fn default() -> Self {
        Self {
            color: true,
            filename: None,
            charset: CharSet::Unicode,
        }
    }
}

/// Render an error to stderr using the default config.
pub fn render_error(error: &Error, source: &str) {
    render_error_to(error, source, &mut std::io::stderr(), &RenderConfig::default()).ok();
}

/// Render an error to a writer with the given configuration.
///
/// `source` is the script text the error refers to. It is only consulted for
/// compilation errors that carry a line number.
///
/// # Example
/// ```
/// use formulate::{CompileDiagnostic, Error, RenderConfig, render_error_to};
///
/// let error = Error::Compilation(CompileDiagnostic {
///     message: "Expecting ')'".to_string(),
///     line: Some(1),
///     column: Some(8),
///     source_line: Some("(1 + 2;".to_string()),
///     unit: None,
/// });
/// let mut buf = Vec::new();
/// let config = RenderConfig { color: false, ..Default::default() };
/// render_error_to(&error, "(1 + 2;", &mut buf, &config).unwrap();
/// assert!(String::from_utf8_lossy(&buf).contains("Expecting ')'"));
/// ```
pub fn render_error_to(
    error: &Error,
    source: &str,
    writer: &mut dyn Write,
    config: &RenderConfig,
) -> std::io::Result<()> {
    match error {
        Error::Compilation(diag) => match span_of(diag, source) {
            Some(span) => render_diagnostic(diag, span, source, writer, config),
            None => writeln!(writer, "{}: {}", error.kind(), diag),
        },
        Error::Resolution { message, available } => {
            writeln!(writer, "{}: {}", error.kind(), message)?;
            if !available.is_empty() {
                writeln!(writer, "  available: {}", available.join(", "))?;
            }
            Ok(())
        }
        other => writeln!(writer, "{}: {}", other.kind(), other),
    }
}

/// Character range of the diagnostic's position, one character wide.
fn span_of(diag: &CompileDiagnostic, source: &str) -> Option<Range<usize>> {
    let line = diag.line?.checked_sub(1)?;
    let mut offset = 0;
    for (index, text) in source.split('\n').enumerate() {
        let width = text.chars().count();
        if index == line {
            let column = diag.column.unwrap_or(1).saturating_sub(1).min(width);
            return Some(offset + column..offset + column + 1);
        }
        offset += width + 1;
    }
    None
}

fn render_diagnostic(
    diag: &CompileDiagnostic,
    span: Range<usize>,
    source: &str,
    writer: &mut dyn Write,
    config: &RenderConfig,
) -> std::io::Result<()> {
    let filename = config
        .filename
        .or(diag.unit.as_deref())
        .unwrap_or("<unknown>");

    let mut colors = ColorGenerator::new();
    colors.next(); // Skip the first color.

    let ariadne_charset = match config.charset {
        CharSet::Unicode => ariadne::CharSet::Unicode,
        CharSet::Ascii => ariadne::CharSet::Ascii,
    };
    let ariadne_config = ariadne::Config::default()
        .with_color(config.color)
        .with_char_set(ariadne_charset);

    Report::build(ReportKind::Error, (filename, span.clone()))
        .with_code("compile")
        .with_message(&diag.message)
        .with_config(ariadne_config)
        .with_label(
            Label::new((filename, span))
                .with_message(&diag.message)
                .with_color(colors.next()),
        )
        .finish()
        .write((filename, Source::from(source)), &mut *writer)
}
