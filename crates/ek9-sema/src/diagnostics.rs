// diagnostics.rs
//
// Collection point for errors and warnings produced while analysing one unit.

use ek9_identity::Span;
use rustc_hash::FxHashSet;

use crate::errors::{ErrorKind, SemanticError, SemanticWarning};

/// A type error wrapping a miette-enabled SemanticError
#[derive(Debug, Clone)]
pub struct TypeError {
    pub error: SemanticError,
    pub span: Span,
}

impl TypeError {
    pub fn new(error: SemanticError, span: Span) -> Self {
        Self { error, span }
    }

    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    /// Rendered message without the span decoration.
    pub fn message(&self) -> String {
        self.error.to_string()
    }
}

/// A type warning wrapping a miette-enabled SemanticWarning
#[derive(Debug, Clone)]
pub struct TypeWarning {
    pub warning: SemanticWarning,
    pub span: Span,
}

impl TypeWarning {
    pub fn new(warning: SemanticWarning, span: Span) -> Self {
        Self { warning, span }
    }
}

/// Diagnostic sink for one compilation unit.
///
/// An error is dropped only when one with the same location, classification
/// and message already exists, so a construct revisited by several checks
/// yields a single diagnostic while distinct problems at one location all
/// survive.
#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: Vec<TypeError>,
    warnings: Vec<TypeWarning>,
    reported: FxHashSet<(Span, ErrorKind, String)>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error; returns false if an identical report already exists.
    pub fn error(&mut self, error: SemanticError, span: Span) -> bool {
        if !self.reported.insert((span, error.kind(), error.to_string())) {
            tracing::trace!(?span, kind = ?error.kind(), "duplicate diagnostic suppressed");
            return false;
        }
        tracing::debug!(line = span.line, %error, "semantic error");
        self.errors.push(TypeError::new(error, span));
        true
    }

    pub fn warning(&mut self, warning: SemanticWarning, span: Span) {
        self.warnings.push(TypeWarning::new(warning, span));
    }

    pub fn errors(&self) -> &[TypeError] {
        &self.errors
    }

    pub fn warnings(&self) -> &[TypeWarning] {
        &self.warnings
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn into_parts(self) -> (Vec<TypeError>, Vec<TypeWarning>) {
        (self.errors, self.warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn not_resolved(span: Span) -> SemanticError {
        SemanticError::NotResolved {
            name: "x".to_string(),
            span: span.into(),
        }
    }

    #[test]
    fn same_construct_and_kind_reported_once() {
        let mut diags = Diagnostics::new();
        let span = Span::new(1, 2, 1, 1);
        assert!(diags.error(not_resolved(span), span));
        assert!(!diags.error(not_resolved(span), span));
        assert_eq!(diags.error_count(), 1);
    }

    #[test]
    fn different_kinds_on_same_span_both_reported() {
        let mut diags = Diagnostics::new();
        let span = Span::new(1, 2, 1, 1);
        diags.error(not_resolved(span), span);
        diags.error(
            SemanticError::NonBooleanControl {
                found: "Integer".to_string(),
                span: span.into(),
            },
            span,
        );
        assert_eq!(diags.error_count(), 2);
        assert_eq!(diags.errors()[1].kind(), ErrorKind::NonBooleanControl);
    }

    #[test]
    fn distinct_problems_of_one_kind_on_same_span_all_reported() {
        let mut diags = Diagnostics::new();
        let span = Span::new(1, 2, 1, 1);
        let missing = |method: &str| SemanticError::AbstractNotImplemented {
            method: method.to_string(),
            on_type: "Square".to_string(),
            declared_in: "Shape".to_string(),
            span: span.into(),
        };
        assert!(diags.error(missing("first"), span));
        assert!(diags.error(missing("second"), span));
        assert!(!diags.error(missing("first"), span));
        assert_eq!(diags.error_count(), 2);
    }
}
