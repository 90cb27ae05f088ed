//! First-class identity types for semantic entities.
//!
//! Every symbol, scope, module and syntax node is addressed by a small copyable
//! handle. Equality of two handles is identity of the entity they name, which is
//! what the parameterized-type cache relies on.

macro_rules! define_entity_id {
    ($(#[$meta:meta])* $vis:vis struct $name:ident;) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        $vis struct $name(u32);

        impl $name {
            pub const fn new(index: u32) -> Self {
                Self(index)
            }

            pub const fn index(self) -> u32 {
                self.0
            }

            /// Index as a `usize`, for addressing arena storage.
            #[inline]
            pub const fn slot(self) -> usize {
                self.0 as usize
            }
        }
    };
}

define_entity_id! {
    /// Identity for any symbol: variable, property, method, function, type or
    /// conceptual type parameter.
    pub struct SymbolId;
}

define_entity_id! {
    /// Identity for a scope (module, type body, function, method, block, capture).
    pub struct ScopeId;
}

define_entity_id! {
    /// Identity for a module (a named namespace owning a module scope)
    pub struct ModuleId;
}

define_entity_id! {
    /// Identity for a syntax node handed over by the parser.
    pub struct NodeId;
}
