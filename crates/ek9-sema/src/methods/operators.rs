// methods/operators.rs
//
// Arity and return-type contracts of the fixed operator set.

use ek9_identity::{Span, SymbolId};

use crate::diagnostics::Diagnostics;
use crate::errors::SemanticError;
use crate::symbols::{SymbolTable, builtin};
use crate::type_display::display_type;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnRule {
    Exactly(SymbolId),
    NonVoid,
    Unconstrained,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorContract {
    pub min_args: usize,
    pub max_args: usize,
    pub returns: ReturnRule,
}

const fn contract(min_args: usize, max_args: usize, returns: ReturnRule) -> OperatorContract {
    OperatorContract {
        min_args,
        max_args,
        returns,
    }
}

/// Contract for operator `op`, `None` if it is not an operator at all.
pub fn operator_contract(op: &str) -> Option<OperatorContract> {
    use ReturnRule::*;
    let found = match op {
        "==" | "<>" | "<" | "<=" | ">" | ">=" => contract(1, 1, Exactly(builtin::BOOLEAN)),
        "<=>" => contract(1, 1, Exactly(builtin::INTEGER)),
        "$" => contract(0, 0, Exactly(builtin::STRING)),
        "$$" => contract(0, 0, Exactly(builtin::JSON)),
        "#?" => contract(0, 0, Exactly(builtin::INTEGER)),
        "?" => contract(0, 0, Exactly(builtin::BOOLEAN)),
        "~" => contract(0, 0, NonVoid),
        "#^" | "#<" | "#>" | "abs" | "sqrt" | "empty" | "length" => contract(0, 0, NonVoid),
        "-" => contract(0, 1, NonVoid),
        "+" | "*" | "/" | "^" | "mod" | "rem" | "and" | "or" | "xor" => {
            contract(1, 1, NonVoid)
        }
        "+=" | "-=" | "*=" | "/=" | ":=:" | ":~:" | ":^:" => contract(1, 1, Exactly(builtin::VOID)),
        "++" | "--" => contract(0, 0, NonVoid),
        "|" => contract(1, 1, Unconstrained),
        "contains" | "matches" => contract(1, 1, Exactly(builtin::BOOLEAN)),
        _ => return None,
    };
    Some(found)
}

/// Check a declared operator against its contract, reporting each violation.
pub fn check_operator_contract(
    table: &SymbolTable,
    method: SymbolId,
    span: Span,
    diags: &mut Diagnostics,
) -> bool {
    let op = table.symbol_name(method).to_string();
    let Some(contract) = operator_contract(&op) else {
        diags.error(
            SemanticError::OperatorContract {
                operator: op,
                detail: "is not a recognised operator".to_string(),
                span: span.into(),
            },
            span,
        );
        return false;
    };

    let arity = table.param_types(method).len();
    let mut ok = true;
    if arity < contract.min_args || arity > contract.max_args {
        let expected = if contract.min_args == contract.max_args {
            format!("{}", contract.min_args)
        } else {
            format!("{} or {}", contract.min_args, contract.max_args)
        };
        diags.error(
            SemanticError::OperatorContract {
                operator: op.clone(),
                detail: format!("takes {expected} parameters, found {arity}"),
                span: span.into(),
            },
            span,
        );
        ok = false;
    }

    let ret = table.return_type(method);
    let detail = match contract.returns {
        ReturnRule::Exactly(expected) if ret != expected && ret != builtin::UNRESOLVED => {
            Some(format!("must return {}", display_type(table, expected)))
        }
        ReturnRule::NonVoid if ret == builtin::VOID => Some("must return a value".to_string()),
        _ => None,
    };
    if let Some(detail) = detail {
        diags.error(
            SemanticError::OperatorContract {
                operator: op,
                detail,
                span: span.into(),
            },
            span,
        );
        ok = false;
    }
    ok
}
