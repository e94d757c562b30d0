//! Compiler-wide error taxonomy and diagnostic rendering (§7).
//!
//! One top-level `thiserror`-derived enum at the crate boundary that
//! wraps smaller, component-local error types via `#[from]`.

use std::path::PathBuf;

use crate::entity::EntityError;
use crate::lexer::LexError;
use crate::token::Span;
use crate::variant::VariantError;

/// A parse-time syntax error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{span}: {message}")]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

/// A name failed to resolve to a known entity.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{span}: unresolved identifier '{name}'")]
pub struct ResolutionError {
    pub name: String,
    pub span: Span,
}

/// A type mismatch or illegal type usage.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{span}: {message}")]
pub struct TypeError {
    pub message: String,
    pub span: Span,
}

/// A semantic rule violation beyond typing (e.g. unsupported member kind,
/// switch-variable ancestry mismatch, duplicate member name).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{span}: {message}")]
pub struct SemanticError {
    pub message: String,
    pub span: Span,
}

/// The crate-wide error type. Every fallible public function returns
/// `Result<T, CompileError>`.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error(transparent)]
    Semantic(#[from] SemanticError),

    #[error(transparent)]
    Variant(#[from] VariantError),

    #[error(transparent)]
    Entity(#[from] EntityError),

    #[error("{path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("internal compiler error: {0}")]
    Internal(String),
}

impl CompileError {
    /// The span this error should be reported at, if it carries one.
    pub fn span(&self) -> Option<&Span> {
        match self {
            CompileError::Lex(e) => Some(&e.span),
            CompileError::Parse(e) => Some(&e.span),
            CompileError::Resolution(e) => Some(&e.span),
            CompileError::Type(e) => Some(&e.span),
            CompileError::Semantic(e) => Some(&e.span),
            _ => None,
        }
    }

    /// Renders as `path(line,col): error: message`, the format every
    /// external consumer (build tool, editor integration) expects.
    pub fn render(&self) -> String {
        match self.span() {
            Some(span) => format!("{span}: error: {self}"),
            None => format!("error: {self}"),
        }
    }
}

/// A collected set of errors from one compilation unit, used where the
/// driver keeps scanning after a recoverable error (lexing, parsing)
/// instead of aborting on the first one.
#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: Vec<CompileError>,
}

impl Diagnostics {
    /// An empty diagnostic set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an error.
    pub fn push(&mut self, err: impl Into<CompileError>) {
        self.errors.push(err.into());
    }

    /// True if any errors were recorded.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Number of recorded errors.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// True if no errors were recorded.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Iterates recorded errors in the order they were pushed.
    pub fn iter(&self) -> impl Iterator<Item = &CompileError> {
        self.errors.iter()
    }

    /// Consumes this set, returning the underlying vector.
    pub fn into_vec(self) -> Vec<CompileError> {
        self.errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_includes_span_when_present() {
        let err = CompileError::Parse(ParseError {
            message: "unexpected token".into(),
            span: Span::synthetic(),
        });
        let rendered = err.render();
        assert!(rendered.contains("unexpected token"));
    }

    #[test]
    fn diagnostics_tracks_pushed_errors() {
        let mut diags = Diagnostics::new();
        assert!(!diags.has_errors());
        diags.push(CompileError::Internal("boom".into()));
        assert!(diags.has_errors());
        assert_eq!(diags.len(), 1);
    }
}
