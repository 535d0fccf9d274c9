//! Error types and reporting

use crate::util::format_suggestion_hint;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, BooseError>;

/// Interpreter error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BooseError {
    /// Malformed or unresolvable expression. Wraps whatever went wrong inside
    /// the evaluator together with the text that was being evaluated.
    #[error("cannot evaluate `{expression}`: {cause}")]
    Expression { expression: String, cause: String },

    /// `hint` is empty or a "did you mean" suffix
    #[error("unknown command: {keyword}{hint}")]
    UnknownCommand { keyword: String, hint: String },

    /// Wrong arity or unparsable argument. The message names the expected shape.
    #[error("{message}")]
    Argument { message: String },

    #[error("method {method} expects {expected} argument(s), got {got}")]
    ArgumentCount {
        method: String,
        expected: usize,
        got: usize,
    },

    #[error("method '{name}' is not defined")]
    UndefinedMethod { name: String },

    #[error("undefined variable: {name}")]
    UndefinedVariable { name: String },

    /// Missing closer, or a closer/`else` with no opener
    #[error("line {line}: {message}")]
    UnmatchedBlock { line: usize, message: String },

    #[error("index {index} out of bounds for '{name}' (length {len})")]
    ArrayBounds { name: String, index: i64, len: usize },

    #[error("type mismatch: expected {expected}, got {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("method call depth exceeded {limit}")]
    RecursionLimit { limit: usize },

    #[error("IO error: {message}")]
    Io { message: String },

    #[error("config error: {message}")]
    Config { message: String },
}

impl BooseError {
    pub fn expression(expression: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::Expression {
            expression: expression.into(),
            cause: cause.to_string(),
        }
    }

    pub fn unknown_command(keyword: impl Into<String>, suggestion: Option<&str>) -> Self {
        Self::UnknownCommand {
            keyword: keyword.into(),
            hint: format_suggestion_hint(suggestion),
        }
    }

    pub fn argument(message: impl Into<String>) -> Self {
        Self::Argument {
            message: message.into(),
        }
    }

    pub fn argument_count(method: impl Into<String>, expected: usize, got: usize) -> Self {
        Self::ArgumentCount {
            method: method.into(),
            expected,
            got,
        }
    }

    pub fn undefined_method(name: impl Into<String>) -> Self {
        Self::UndefinedMethod { name: name.into() }
    }

    pub fn undefined_variable(name: impl Into<String>) -> Self {
        Self::UndefinedVariable { name: name.into() }
    }

    pub fn unmatched_block(line: usize, message: impl Into<String>) -> Self {
        Self::UnmatchedBlock {
            line,
            message: message.into(),
        }
    }

    pub fn array_bounds(name: impl Into<String>, index: i64, len: usize) -> Self {
        Self::ArrayBounds {
            name: name.into(),
            index,
            len,
        }
    }

    pub fn type_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn io_error(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Short label used as the report headline
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Expression { .. } => "Expression",
            Self::UnknownCommand { .. } => "Unknown command",
            Self::Argument { .. } => "Argument",
            Self::ArgumentCount { .. } => "Argument count",
            Self::UndefinedMethod { .. } => "Undefined method",
            Self::UndefinedVariable { .. } => "Undefined variable",
            Self::UnmatchedBlock { .. } => "Unmatched block",
            Self::ArrayBounds { .. } => "Array bounds",
            Self::TypeMismatch { .. } => "Type mismatch",
            Self::RecursionLimit { .. } => "Recursion",
            Self::Io { .. } => "IO",
            Self::Config { .. } => "Config",
        }
    }

    /// 1-based program line the error is tied to, when it carries one
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::UnmatchedBlock { line, .. } => Some(*line),
            _ => None,
        }
    }

    /// Structural errors stop the whole run; everything else is per-line.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::UnmatchedBlock { .. })
    }
}

impl From<std::io::Error> for BooseError {
    fn from(err: std::io::Error) -> Self {
        Self::io_error(err.to_string())
    }
}

/// An error recorded while executing one line. Execution carried on past it.
#[derive(Debug, Clone, PartialEq)]
pub struct LineError {
    /// 1-based program line
    pub line: usize,
    /// Trimmed source text of the line
    pub text: String,
    pub error: BooseError,
}

impl std::fmt::Display for LineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {} ('{}'): {}", self.line, self.text, self.error)
    }
}

/// Byte range of a 1-based line within `source`
fn line_range(source: &str, line: usize) -> std::ops::Range<usize> {
    let mut start = 0;
    for (index, text) in source.split_inclusive('\n').enumerate() {
        if index + 1 == line {
            let trimmed = text.trim_end_matches(['\n', '\r']);
            return start..start + trimmed.len();
        }
        start += text.len();
    }
    source.len()..source.len()
}

/// Report error with ariadne
pub fn report_error(filename: &str, source: &str, error: &BooseError, line: Option<usize>) {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    let kind = error.kind();
    let result = match line.or_else(|| error.line()) {
        Some(line) => {
            let range = line_range(source, line);
            Report::build(ReportKind::Error, (filename, range.clone()))
                .with_message(format!("{kind} error"))
                .with_label(
                    Label::new((filename, range))
                        .with_message(error.to_string())
                        .with_color(Color::Red),
                )
                .finish()
                .eprint((filename, Source::from(source)))
        }
        None => Report::build(ReportKind::Error, (filename, 0..0))
            .with_message(format!("{kind} error: {error}"))
            .finish()
            .eprint((filename, Source::from(source))),
    };

    if result.is_err() {
        eprintln!("{kind} error: {error}");
    }
}

/// Report a recorded per-line error
pub fn report_line_error(filename: &str, source: &str, error: &LineError) {
    report_error(filename, source, &error.error, Some(error.line));
}
