// symbols/search.rs
//
// Name + category searches used by scope resolution.

use ek9_identity::Name;

use super::symbol::SymbolKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchCategory {
    Any,
    Type,
    Variable,
    Method,
    Function,
    /// Variables and functions: anything usable as a value.
    Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolSearch {
    pub name: Name,
    pub category: SearchCategory,
}

impl SymbolSearch {
    pub fn new(name: Name, category: SearchCategory) -> Self {
        Self { name, category }
    }

    pub fn any(name: Name) -> Self {
        Self::new(name, SearchCategory::Any)
    }

    pub fn of_type(name: Name) -> Self {
        Self::new(name, SearchCategory::Type)
    }

    pub fn variable(name: Name) -> Self {
        Self::new(name, SearchCategory::Variable)
    }

    pub fn method(name: Name) -> Self {
        Self::new(name, SearchCategory::Method)
    }

    pub fn value(name: Name) -> Self {
        Self::new(name, SearchCategory::Value)
    }

    pub fn matches(&self, kind: &SymbolKind) -> bool {
        match self.category {
            SearchCategory::Any => !matches!(kind, SymbolKind::Unresolved),
            SearchCategory::Type => kind.is_type(),
            SearchCategory::Variable => matches!(kind, SymbolKind::Variable(_)),
            SearchCategory::Method => matches!(kind, SymbolKind::Method(_)),
            SearchCategory::Function => matches!(kind, SymbolKind::Function(_)),
            SearchCategory::Value => {
                matches!(kind, SymbolKind::Variable(_) | SymbolKind::Function(_))
            }
        }
    }
}
