use std::fmt;

/// Source location span for error reporting
/// Represents a range of characters in the input string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Start position (0-indexed byte offset)
    pub start: usize,
    /// End position (exclusive, 0-indexed byte offset)
    pub end: usize,
}

impl Span {
    /// Create a new span
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    /// Create a span for a single position
    pub fn at(pos: usize) -> Self {
        Span {
            start: pos,
            end: pos + 1,
        }
    }

    /// Check if this span has valid location info
    pub fn is_valid(&self) -> bool {
        self.end > self.start
    }

    /// Format the span for display (1-indexed for users)
    pub fn display(&self) -> String {
        if !self.is_valid() {
            String::new()
        } else if self.end - self.start == 1 {
            format!(" at position {}", self.start + 1)
        } else {
            format!(" at positions {}-{}", self.start + 1, self.end)
        }
    }
}

/// Errors that can occur during binding, evaluation, and compilation
#[derive(Debug, Clone, PartialEq)]
pub enum MathError {
    // Input validation errors
    EmptyExpression,
    NotEvaluated {
        span: Option<Span>,
    },
    UnknownToken {
        token: String,
        span: Option<Span>,
    },
    InvalidNumber {
        value: String,
        span: Option<Span>,
    },

    // Structural errors
    UnclosedBracket {
        expected: char,
        span: Option<Span>,
    },
    InvalidOperand {
        span: Option<Span>,
    },

    // Wrapped native arithmetic failures (decimal overflow, division by
    // zero, lossy conversions)
    Arithmetic {
        message: String,
        span: Option<Span>,
    },

    // Raised by bound functions validating their own arguments
    Domain {
        message: String,
        span: Option<Span>,
    },

    // Compile-time errors
    UnboundVariable {
        name: String,
        span: Option<Span>,
    },
    UnsupportedCompilation {
        key: String,
        span: Option<Span>,
    },

    // Configuration-time errors
    InvalidKey {
        key: String,
    },

    // Safety limits
    MaxDepthExceeded,
}

impl MathError {
    // Convenience constructors

    /// Create an Arithmetic error without a span
    pub fn arithmetic(message: impl Into<String>) -> Self {
        MathError::Arithmetic {
            message: message.into(),
            span: None,
        }
    }

    /// Create a Domain error without a span
    pub fn domain(message: impl Into<String>) -> Self {
        MathError::Domain {
            message: message.into(),
            span: None,
        }
    }

    /// Create an UnknownToken error at a span
    pub fn unknown_token(token: impl Into<String>, span: Span) -> Self {
        MathError::UnknownToken {
            token: token.into(),
            span: Some(span),
        }
    }

    /// Create an InvalidNumber error at a span
    pub fn invalid_number(value: impl Into<String>, span: Span) -> Self {
        MathError::InvalidNumber {
            value: value.into(),
            span: Some(span),
        }
    }

    /// Attach a span if the error does not already carry one.
    ///
    /// Errors raised inside bound closures and numeric operations have no
    /// location info; the scanner stamps them with the span of the
    /// sub-expression it was resolving when they surfaced.
    pub fn at(self, span: Span) -> Self {
        match self {
            MathError::NotEvaluated { span: None } => MathError::NotEvaluated { span: Some(span) },
            MathError::UnknownToken { token, span: None } => MathError::UnknownToken {
                token,
                span: Some(span),
            },
            MathError::InvalidNumber { value, span: None } => MathError::InvalidNumber {
                value,
                span: Some(span),
            },
            MathError::UnclosedBracket {
                expected,
                span: None,
            } => MathError::UnclosedBracket {
                expected,
                span: Some(span),
            },
            MathError::InvalidOperand { span: None } => {
                MathError::InvalidOperand { span: Some(span) }
            }
            MathError::Arithmetic {
                message,
                span: None,
            } => MathError::Arithmetic {
                message,
                span: Some(span),
            },
            MathError::Domain {
                message,
                span: None,
            } => MathError::Domain {
                message,
                span: Some(span),
            },
            MathError::UnboundVariable { name, span: None } => MathError::UnboundVariable {
                name,
                span: Some(span),
            },
            MathError::UnsupportedCompilation { key, span: None } => {
                MathError::UnsupportedCompilation {
                    key,
                    span: Some(span),
                }
            }
            other => other,
        }
    }

    /// The source span the error points at, if it carries one
    pub fn span(&self) -> Option<Span> {
        match self {
            MathError::NotEvaluated { span }
            | MathError::UnknownToken { span, .. }
            | MathError::InvalidNumber { span, .. }
            | MathError::UnclosedBracket { span, .. }
            | MathError::InvalidOperand { span }
            | MathError::Arithmetic { span, .. }
            | MathError::Domain { span, .. }
            | MathError::UnboundVariable { span, .. }
            | MathError::UnsupportedCompilation { span, .. } => *span,
            _ => None,
        }
    }
}

impl fmt::Display for MathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MathError::EmptyExpression => write!(f, "Expression cannot be empty"),
            MathError::NotEvaluated { span } => {
                write!(
                    f,
                    "Expression was not recognized as a value{}",
                    span.map_or(String::new(), |s| s.display())
                )
            }
            MathError::UnknownToken { token, span } => {
                write!(
                    f,
                    "Unknown token '{}'{}. Check that the active context binds it",
                    token,
                    span.map_or(String::new(), |s| s.display())
                )
            }
            MathError::InvalidNumber { value, span } => {
                write!(
                    f,
                    "Invalid number format: '{}'{}",
                    value,
                    span.map_or(String::new(), |s| s.display())
                )
            }
            MathError::UnclosedBracket { expected, span } => {
                write!(
                    f,
                    "Opening symbol{} is never closed, expected '{}'",
                    span.map_or(String::new(), |s| s.display()),
                    expected
                )
            }
            MathError::InvalidOperand { span } => {
                write!(
                    f,
                    "Expected an operand{}",
                    span.map_or(String::new(), |s| s.display())
                )
            }
            MathError::Arithmetic { message, span } | MathError::Domain { message, span } => {
                write!(
                    f,
                    "Error of evaluating the expression. {}{}",
                    message,
                    span.map_or(String::new(), |s| s.display())
                )
            }
            MathError::UnboundVariable { name, span } => {
                write!(
                    f,
                    "Variable '{}' is neither a declared parameter nor a context binding{}",
                    name,
                    span.map_or(String::new(), |s| s.display())
                )
            }
            MathError::UnsupportedCompilation { key, span } => {
                write!(
                    f,
                    "Entity '{}' cannot be compiled in this numeric kind{}",
                    key,
                    span.map_or(String::new(), |s| s.display())
                )
            }
            MathError::InvalidKey { key } => {
                write!(
                    f,
                    "Binding key '{}' is invalid: keys must be non-empty and must not start with a digit or decimal point",
                    key
                )
            }
            MathError::MaxDepthExceeded => {
                write!(f, "Expression nesting depth exceeds maximum limit")
            }
        }
    }
}

impl std::error::Error for MathError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_display_is_one_indexed() {
        assert_eq!(Span::at(9).display(), " at position 10");
        assert_eq!(Span::new(2, 5).display(), " at positions 3-5");
        assert_eq!(Span::new(0, 0).display(), "");
    }

    #[test]
    fn at_does_not_overwrite_existing_span() {
        let err = MathError::unknown_token("@", Span::at(3)).at(Span::at(7));
        assert_eq!(err.span(), Some(Span::at(3)));
    }

    #[test]
    fn arithmetic_message_carries_banner() {
        let err = MathError::arithmetic("Division by zero");
        assert!(
            err.to_string()
                .starts_with("Error of evaluating the expression.")
        );
    }
}
