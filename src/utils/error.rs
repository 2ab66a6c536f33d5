//! Error handling for cfront
//!
//! Only fatal conditions live here. Recoverable semantic issues are
//! reported as `Diagnostic`s and never abort the pass.

use crate::utils::Span;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal front-end error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // ==================== Driver Errors ====================

    #[error("line {}: unexpected token: expected {expected}, got {got}", span.line)]
    UnexpectedToken {
        expected: String,
        got: String,
        span: Span,
    },

    #[error("line {}: expected identifier", span.line)]
    ExpectedIdent { span: Span },

    #[error("line {}: expected expression", span.line)]
    ExpectedExpr { span: Span },

    #[error("line {}: expression is not assignable", span.line)]
    InvalidAssignmentTarget { span: Span },

    #[error("line {}: variable '{name}' declared void", span.line)]
    VoidVariable { name: String, span: Span },

    #[error("line {}: invalid character '{ch}'", span.line)]
    InvalidCharacter { ch: char, span: Span },

    #[error("line {}: invalid numeric literal '{text}'", span.line)]
    InvalidNumber { text: String, span: Span },

    #[error("line {}: character literal '{ch}' does not fit in a char", span.line)]
    InvalidCharLiteral { ch: char, span: Span },

    // ==================== Internal Consistency ====================

    #[error("line {line}: assembly stack underflow in '{rule}': needed {needed}, had {available}")]
    StackUnderflow {
        rule: String,
        needed: usize,
        available: usize,
        line: u32,
    },

    #[error("line {line}: scope depth would become negative")]
    NegativeScopeDepth { line: u32 },

    #[error("line {line}: '{rule}' reduced out of order")]
    OutOfOrder { rule: String, line: u32 },

    #[error("expected exactly one program root on the assembly stack, found {found}")]
    RootNotUnique { found: usize },

    #[error("analysis already finished")]
    AlreadyFinished,
}

impl Error {
    /// Get the span associated with this error
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::UnexpectedToken { span, .. } => Some(*span),
            Self::ExpectedIdent { span } => Some(*span),
            Self::ExpectedExpr { span } => Some(*span),
            Self::InvalidAssignmentTarget { span } => Some(*span),
            Self::VoidVariable { span, .. } => Some(*span),
            Self::InvalidCharacter { span, .. } => Some(*span),
            Self::InvalidNumber { span, .. } => Some(*span),
            Self::InvalidCharLiteral { span, .. } => Some(*span),
            Self::StackUnderflow { .. }
            | Self::NegativeScopeDepth { .. }
            | Self::OutOfOrder { .. }
            | Self::RootNotUnique { .. }
            | Self::AlreadyFinished => None,
        }
    }

    /// Whether the error signals a desynchronised driver/dispatcher pair
    /// rather than bad input.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::StackUnderflow { .. }
                | Self::NegativeScopeDepth { .. }
                | Self::OutOfOrder { .. }
                | Self::RootNotUnique { .. }
                | Self::AlreadyFinished
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_underflow_message() {
        let err = Error::StackUnderflow {
            rule: "for".to_string(),
            needed: 4,
            available: 1,
            line: 7,
        };
        assert_eq!(
            err.to_string(),
            "line 7: assembly stack underflow in 'for': needed 4, had 1"
        );
        assert!(err.is_internal());
        assert!(err.span().is_none());
    }

    #[test]
    fn test_driver_errors_are_not_internal() {
        let err = Error::ExpectedExpr { span: Span::new(0, 1, 3) };
        assert!(!err.is_internal());
        assert_eq!(err.span().map(|s| s.line), Some(3));
    }

    #[test]
    fn test_invalid_number_message() {
        let err = Error::InvalidNumber { text: "1e".to_string(), span: Span::new(8, 10, 2) };
        assert_eq!(err.to_string(), "line 2: invalid numeric literal '1e'");
        assert!(!err.is_internal());
        assert_eq!(err.span(), Some(Span::new(8, 10, 2)));
    }
}
