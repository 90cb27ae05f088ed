// analyzer/structure.rs
//
// Structural checks that need every explicit type of the unit resolved.

use ek9_identity::SymbolId;

use super::Binder;
use crate::ast::Decl;
use crate::errors::InternalError;
use crate::methods::{
    check_abstract_implemented, check_circular_hierarchy, check_duplicate_properties,
    check_method_conflicts, check_operator_contract, check_overrides, default_operators_or_error,
};

impl Binder<'_> {
    pub(super) fn check_structure(&mut self, decl: &Decl) -> Result<(), InternalError> {
        let Decl::Aggregate(aggregate) = decl else {
            return Ok(());
        };
        let id = self.unit.bindings.require_symbol(aggregate.id, "aggregate")?;
        let diags = &mut self.unit.diags;

        if !check_circular_hierarchy(self.table, id, self.config.max_hierarchy_depth, diags) {
            // The broken link is cut; member checks over a partial hierarchy
            // would only add noise.
            return Ok(());
        }
        check_duplicate_properties(self.table, id, diags);

        let operators: Vec<SymbolId> = self
            .table
            .members(id)
            .iter()
            .copied()
            .filter(|m| {
                self.table
                    .method(*m)
                    .is_some_and(|info| info.flags.operator && !info.flags.defaulted)
            })
            .collect();
        for op in operators {
            let span = self.table.get(op).span;
            check_operator_contract(self.table, op, span, diags);
        }

        check_overrides(self.table, id, diags);
        check_method_conflicts(self.table, id, diags);
        check_abstract_implemented(self.table, id, diags);
        default_operators_or_error(self.table, id, diags);
        tracing::trace!(name = %aggregate.name, errors = diags.error_count(), "structure checked");
        Ok(())
    }
}
