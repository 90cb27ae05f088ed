// errors/mod.rs
//! Semantic analysis errors (E2xxx), warnings (W2xxx) and internal failures (E9xxx).

#![allow(unused_assignments)] // False positives from thiserror derive

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

/// Closed classification of semantic problems, attached to every reported error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotResolved,
    Ambiguous,
    NotAccessible,
    IncompatibleTypes,
    ParameterCountMismatch,
    NotATemplate,
    TypeNotConstrained,
    InstantiationTooDeep,
    MissingOperator,
    DelegateOperator,
    DuplicateFieldName,
    MethodConflict,
    CircularHierarchy,
    DuplicateTraitReference,
    DuplicateProperty,
    DuplicateSymbol,
    NotExtendable,
    OverrideMismatch,
    AbstractNotImplemented,
    OperatorContract,
    NonBooleanControl,
    ImmutableAssignment,
    UsedBeforeInitialised,
    InvalidThisOrSuper,
    PureViolation,
    CannotInstantiate,
    NotCallable,
    PipelineStageMismatch,
    NoPipeForType,
    VoidPipeline,
    NotIterable,
}

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum SemanticError {
    #[error("'{name}' is not resolved")]
    #[diagnostic(code(E2001))]
    NotResolved {
        name: String,
        #[label("not found in scope")]
        span: SourceSpan,
    },

    #[error("method '{method}' with arguments ({args}) is not resolved on '{on_type}'")]
    #[diagnostic(code(E2002))]
    MethodNotResolved {
        method: String,
        on_type: String,
        args: String,
        #[label("no matching method")]
        span: SourceSpan,
    },

    #[error("call to '{method}' is ambiguous, candidates: {candidates}")]
    #[diagnostic(
        code(E2003),
        help("make the argument types distinct or call with an explicitly typed argument")
    )]
    AmbiguousCall {
        method: String,
        candidates: String,
        #[label("equally good matches")]
        span: SourceSpan,
    },

    #[error("{visibility} '{name}' is not accessible from '{from}'")]
    #[diagnostic(code(E2004))]
    NotAccessible {
        name: String,
        visibility: String,
        from: String,
        #[label("not accessible here")]
        span: SourceSpan,
    },

    #[error("incompatible types: expected {expected}, found {found}")]
    #[diagnostic(code(E2005))]
    IncompatibleTypes {
        expected: String,
        found: String,
        #[label("type mismatch")]
        span: SourceSpan,
    },

    #[error("arguments ({found}) are not compatible with '{callee}' expecting ({expected})")]
    #[diagnostic(code(E2006))]
    IncompatibleArguments {
        callee: String,
        expected: String,
        found: String,
        #[label("incompatible arguments")]
        span: SourceSpan,
    },

    #[error("'{name}' is not a generic type or function")]
    #[diagnostic(code(E2007))]
    NotATemplate {
        name: String,
        #[label("cannot be parameterized")]
        span: SourceSpan,
    },

    #[error("'{name}' expects {expected} type parameters, found {found}")]
    #[diagnostic(code(E2008))]
    ParameterCountMismatch {
        name: String,
        expected: usize,
        found: usize,
        #[label("wrong number of type parameters")]
        span: SourceSpan,
    },

    #[error("type '{argument}' cannot be constrained to '{constraint}' for '{parameter}'")]
    #[diagnostic(code(E2009))]
    TypeNotConstrained {
        argument: String,
        parameter: String,
        constraint: String,
        #[label("constraint not satisfied")]
        span: SourceSpan,
    },

    #[error("parameterization of '{name}' exceeds nesting depth {limit}")]
    #[diagnostic(code(E2010))]
    InstantiationTooDeep {
        name: String,
        limit: usize,
        #[label("too deeply nested")]
        span: SourceSpan,
    },

    #[error("operator '{operator}' is missing on '{on_type}', needed by default '{required_by}'")]
    #[diagnostic(
        code(E2011),
        help("declare '{operator}' on '{on_type}' or implement '{required_by}' explicitly")
    )]
    MissingOperator {
        operator: String,
        on_type: String,
        required_by: String,
        #[label("cannot be defaulted")]
        span: SourceSpan,
    },

    #[error("property '{property}' is a delegate and cannot take part in default '{operator}'")]
    #[diagnostic(code(E2012))]
    DelegateOperator {
        property: String,
        operator: String,
        #[label("function typed property")]
        span: SourceSpan,
    },

    #[error("field '{field}' appears more than once in '{on_type}', default '$$' is ambiguous")]
    #[diagnostic(code(E2013))]
    DuplicateFieldName {
        field: String,
        on_type: String,
        #[label("duplicated output field")]
        span: SourceSpan,
    },

    #[error("'{on_type}' inherits conflicting implementations of '{method}' from {sources}")]
    #[diagnostic(code(E2014), help("override '{method}' explicitly in '{on_type}'"))]
    MethodConflict {
        method: String,
        on_type: String,
        sources: String,
        #[label("conflicting methods")]
        span: SourceSpan,
    },

    #[error("circular hierarchy: {path}")]
    #[diagnostic(code(E2015))]
    CircularHierarchy {
        path: String,
        #[label("refers back to itself")]
        span: SourceSpan,
    },

    #[error("trait '{trait_name}' is referenced more than once by '{on_type}'")]
    #[diagnostic(code(E2016))]
    DuplicateTraitReference {
        trait_name: String,
        on_type: String,
        #[label("duplicate trait")]
        span: SourceSpan,
    },

    #[error("property '{name}' on '{on_type}' duplicates a property of '{inherited_from}'")]
    #[diagnostic(code(E2017))]
    DuplicateProperty {
        name: String,
        on_type: String,
        inherited_from: String,
        #[label("duplicate property")]
        span: SourceSpan,
    },

    #[error("'{name}' is already defined in this scope")]
    #[diagnostic(code(E2018))]
    DuplicateSymbol {
        name: String,
        #[label("duplicate definition")]
        span: SourceSpan,
    },

    #[error("'{name}' cannot extend '{base}': {reason}")]
    #[diagnostic(code(E2019))]
    NotExtendable {
        name: String,
        base: String,
        reason: String,
        #[label("invalid supertype")]
        span: SourceSpan,
    },

    #[error("method '{method}' {reason}")]
    #[diagnostic(code(E2020))]
    OverrideMismatch {
        method: String,
        reason: String,
        #[label("override mismatch")]
        span: SourceSpan,
    },

    #[error("'{on_type}' does not implement abstract method '{method}' from '{declared_in}'")]
    #[diagnostic(code(E2021))]
    AbstractNotImplemented {
        method: String,
        on_type: String,
        declared_in: String,
        #[label("missing implementation")]
        span: SourceSpan,
    },

    #[error("operator '{operator}' {detail}")]
    #[diagnostic(code(E2022))]
    OperatorContract {
        operator: String,
        detail: String,
        #[label("operator contract violated")]
        span: SourceSpan,
    },

    #[error("control expression must be Boolean, found {found}")]
    #[diagnostic(code(E2023))]
    NonBooleanControl {
        found: String,
        #[label("expected Boolean")]
        span: SourceSpan,
    },

    #[error("'{name}' cannot be reassigned")]
    #[diagnostic(code(E2024))]
    ImmutableAssignment {
        name: String,
        #[label("constant or immutable")]
        span: SourceSpan,
    },

    #[error("'{name}' is used before it is initialised")]
    #[diagnostic(code(E2025))]
    UsedBeforeInitialised {
        name: String,
        #[label("no value assigned yet")]
        span: SourceSpan,
    },

    #[error("'{keyword}' {reason}")]
    #[diagnostic(code(E2026))]
    InvalidThisOrSuper {
        keyword: String,
        reason: String,
        #[label("invalid use")]
        span: SourceSpan,
    },

    #[error("pure scope cannot {action} '{name}'")]
    #[diagnostic(code(E2027))]
    PureViolation {
        action: String,
        name: String,
        #[label("not pure")]
        span: SourceSpan,
    },

    #[error("'{name}' cannot be instantiated: {reason}")]
    #[diagnostic(code(E2028))]
    CannotInstantiate {
        name: String,
        reason: String,
        #[label("not constructable")]
        span: SourceSpan,
    },

    #[error("'{name}' of type {ty} is not callable")]
    #[diagnostic(code(E2029))]
    NotCallable {
        name: String,
        ty: String,
        #[label("not a function")]
        span: SourceSpan,
    },

    #[error("'{stage}' {detail}")]
    #[diagnostic(code(E2030))]
    PipelineStageMismatch {
        stage: String,
        detail: String,
        #[label("stage not applicable")]
        span: SourceSpan,
    },

    #[error("no pipe found for type {flowing} on {sink}")]
    #[diagnostic(code(E2031), help("the terminal needs a '|' operator accepting {flowing}"))]
    NoPipeForType {
        flowing: String,
        sink: String,
        #[label("cannot receive")]
        span: SourceSpan,
    },

    #[error("pipeline cannot carry Void at '{stage}'")]
    #[diagnostic(code(E2032))]
    VoidPipeline {
        stage: String,
        #[label("produces Void")]
        span: SourceSpan,
    },

    #[error("{ty} is not iterable")]
    #[diagnostic(code(E2033))]
    NotIterable {
        ty: String,
        #[label("no iterator")]
        span: SourceSpan,
    },
}

impl SemanticError {
    /// Classification used by the diagnostics interface.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotResolved { .. } | Self::MethodNotResolved { .. } => ErrorKind::NotResolved,
            Self::AmbiguousCall { .. } => ErrorKind::Ambiguous,
            Self::NotAccessible { .. } => ErrorKind::NotAccessible,
            Self::IncompatibleTypes { .. } | Self::IncompatibleArguments { .. } => {
                ErrorKind::IncompatibleTypes
            }
            Self::NotATemplate { .. } => ErrorKind::NotATemplate,
            Self::ParameterCountMismatch { .. } => ErrorKind::ParameterCountMismatch,
            Self::TypeNotConstrained { .. } => ErrorKind::TypeNotConstrained,
            Self::InstantiationTooDeep { .. } => ErrorKind::InstantiationTooDeep,
            Self::MissingOperator { .. } => ErrorKind::MissingOperator,
            Self::DelegateOperator { .. } => ErrorKind::DelegateOperator,
            Self::DuplicateFieldName { .. } => ErrorKind::DuplicateFieldName,
            Self::MethodConflict { .. } => ErrorKind::MethodConflict,
            Self::CircularHierarchy { .. } => ErrorKind::CircularHierarchy,
            Self::DuplicateTraitReference { .. } => ErrorKind::DuplicateTraitReference,
            Self::DuplicateProperty { .. } => ErrorKind::DuplicateProperty,
            Self::DuplicateSymbol { .. } => ErrorKind::DuplicateSymbol,
            Self::NotExtendable { .. } => ErrorKind::NotExtendable,
            Self::OverrideMismatch { .. } => ErrorKind::OverrideMismatch,
            Self::AbstractNotImplemented { .. } => ErrorKind::AbstractNotImplemented,
            Self::OperatorContract { .. } => ErrorKind::OperatorContract,
            Self::NonBooleanControl { .. } => ErrorKind::NonBooleanControl,
            Self::ImmutableAssignment { .. } => ErrorKind::ImmutableAssignment,
            Self::UsedBeforeInitialised { .. } => ErrorKind::UsedBeforeInitialised,
            Self::InvalidThisOrSuper { .. } => ErrorKind::InvalidThisOrSuper,
            Self::PureViolation { .. } => ErrorKind::PureViolation,
            Self::CannotInstantiate { .. } => ErrorKind::CannotInstantiate,
            Self::NotCallable { .. } => ErrorKind::NotCallable,
            Self::PipelineStageMismatch { .. } => ErrorKind::PipelineStageMismatch,
            Self::NoPipeForType { .. } => ErrorKind::NoPipeForType,
            Self::VoidPipeline { .. } => ErrorKind::VoidPipeline,
            Self::NotIterable { .. } => ErrorKind::NotIterable,
        }
    }
}

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum SemanticWarning {
    #[error("'{name}' is declared but never referenced")]
    #[diagnostic(code(W2001), severity(Warning))]
    NotReferenced {
        name: String,
        #[label("unused")]
        span: SourceSpan,
    },

    #[error("'{operator}' is explicitly declared, the default request is ignored")]
    #[diagnostic(code(W2002), severity(Warning))]
    DefaultIgnored {
        operator: String,
        #[label("already declared")]
        span: SourceSpan,
    },
}

/// Failures caused by a broken upstream invariant rather than by the program
/// under analysis. These stop analysis of the unit.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum InternalError {
    #[error("built-in '{name}' is missing from the symbol registry")]
    #[diagnostic(code(E9001))]
    MissingBuiltin { name: String },

    #[error("no symbol was recorded against node {node} ({what})")]
    #[diagnostic(code(E9002))]
    UnrecordedSymbol { node: u32, what: &'static str },

    #[error("scope stack underflow while leaving {context}")]
    #[diagnostic(code(E9003))]
    ScopeStackUnderflow { context: &'static str },
}
