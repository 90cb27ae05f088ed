//! ek9 semantic core: symbols and scopes, type compatibility, generic
//! parameterization, overload resolution and pipeline type flow.

pub mod analyzer;
pub mod ast;
pub mod compatibility;
pub mod compilation_db;
pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod generic;
pub mod methods;
pub mod node_map;
pub mod pipeline;
pub mod symbols;
pub mod type_display;

pub use analyzer::{AnalysisOutput, Analyzer};
pub use ast::AstBuilder;
pub use compatibility::{MatchKind, classify_match, is_assignable, weight_of_match};
pub use compilation_db::CompilationDb;
pub use config::{AnalyzerConfig, ConfigError};
pub use diagnostics::{Diagnostics, TypeError, TypeWarning};
pub use errors::{ErrorKind, InternalError, SemanticError, SemanticWarning};
pub use generic::{ParameterizeError, Refresh, refresh_stale, resolve_or_define};
pub use methods::{MethodResolution, resolve_method};
pub use node_map::NodeBindings;
pub use pipeline::{StageKind, StreamFlow, analyze_pipeline};
pub use symbols::{SymbolTable, builtin};
pub use type_display::display_type;
