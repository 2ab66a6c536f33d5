//! Diagnostics stream
//!
//! Recoverable issues found during analysis. Each one is logged the moment it
//! is pushed (and optionally echoed to stderr), then retained in source order
//! for the final report.

use std::fmt;

use log::{error, warn};
use serde::{Deserialize, Serialize};

use crate::types::{DataType, TypeIssue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => f.write_str("error"),
            Self::Warning => f.write_str("warning"),
        }
    }
}

/// What went wrong
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticKind {
    Redefinition { name: String },
    UndeclaredIdentifier { name: String },
    ImplicitNarrowing { from: DataType, to: DataType },
    ImplicitWidening { from: DataType, to: DataType },
    InvalidOperandType { op: String, ty: DataType },
    DivisionByZero,
    MissingTypeSpecifier { name: String },
}

impl DiagnosticKind {
    pub fn severity(&self) -> Severity {
        match self {
            Self::Redefinition { .. }
            | Self::UndeclaredIdentifier { .. }
            | Self::InvalidOperandType { .. } => Severity::Error,
            Self::ImplicitNarrowing { .. }
            | Self::ImplicitWidening { .. }
            | Self::DivisionByZero
            | Self::MissingTypeSpecifier { .. } => Severity::Warning,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Redefinition { name } => format!("redefinition of '{}'", name),
            Self::UndeclaredIdentifier { name } => format!("use of undeclared identifier '{}'", name),
            Self::ImplicitNarrowing { from, to } | Self::ImplicitWidening { from, to } => {
                format!("implicit conversion from '{}' to '{}'", from, to)
            }
            Self::InvalidOperandType { op, ty } => {
                format!("invalid operand of type '{}' to '{}'", ty, op)
            }
            Self::DivisionByZero => "division by zero is undefined".to_string(),
            Self::MissingTypeSpecifier { name } => {
                format!("type specifier missing for '{}', defaults to 'int'", name)
            }
        }
    }
}

impl From<TypeIssue> for DiagnosticKind {
    fn from(issue: TypeIssue) -> Self {
        match issue {
            TypeIssue::Narrowing { from, to } => Self::ImplicitNarrowing { from, to },
            TypeIssue::Widening { from, to } => Self::ImplicitWidening { from, to },
            TypeIssue::InvalidOperand { op, ty } => Self::InvalidOperandType { op: op.to_string(), ty },
            TypeIssue::DivisionByZero => Self::DivisionByZero,
        }
    }
}

/// One reported issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub line: u32,
    pub message: String,
    #[serde(flatten)]
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, line: u32) -> Self {
        Self {
            severity: kind.severity(),
            line,
            message: kind.message(),
            kind,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Line:{}: {}: {}", self.line, self.severity, self.message)
    }
}

/// Ordered diagnostic sink
#[derive(Debug, Default)]
pub struct Diagnostics {
    records: Vec<Diagnostic>,
    echo: bool,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Print every diagnostic to stderr as soon as it is reported
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn report(&mut self, kind: DiagnosticKind, line: u32) {
        let diagnostic = Diagnostic::new(kind, line);
        match diagnostic.severity {
            Severity::Error => error!("line {}: {}", line, diagnostic.message),
            Severity::Warning => warn!("line {}: {}", line, diagnostic.message),
        }
        if self.echo {
            eprintln!("{}", diagnostic);
        }
        self.records.push(diagnostic);
    }

    pub fn records(&self) -> &[Diagnostic] {
        &self.records
    }

    pub fn error_count(&self) -> usize {
        self.records.iter().filter(|d| d.severity == Severity::Error).count()
    }

    pub fn warning_count(&self) -> usize {
        self.records.len() - self.error_count()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<Diagnostic> {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_messages_and_severity() {
        let d = Diagnostic::new(
            DiagnosticKind::ImplicitNarrowing { from: DataType::Float, to: DataType::Int },
            4,
        );
        assert_eq!(d.severity, Severity::Warning);
        assert_eq!(d.to_string(), "Line:4: warning: implicit conversion from 'float' to 'int'");

        let d = Diagnostic::new(DiagnosticKind::Redefinition { name: "y".into() }, 2);
        assert_eq!(d.to_string(), "Line:2: error: redefinition of 'y'");
    }

    #[test]
    fn test_sink_keeps_order_and_counts() {
        let mut sink = Diagnostics::new();
        sink.report(DiagnosticKind::DivisionByZero, 3);
        sink.report(DiagnosticKind::UndeclaredIdentifier { name: "q".into() }, 5);
        assert_eq!(sink.records().len(), 2);
        assert_eq!(sink.records()[0].line, 3);
        assert_eq!(sink.error_count(), 1);
        assert_eq!(sink.warning_count(), 1);
    }

    #[test]
    fn test_type_issue_conversion() {
        let kind: DiagnosticKind = TypeIssue::InvalidOperand { op: "%", ty: DataType::Float }.into();
        assert_eq!(kind.message(), "invalid operand of type 'float' to '%'");
        assert_eq!(kind.severity(), Severity::Error);
    }
}
