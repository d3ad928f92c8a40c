// Deliberate-unsoundness rules, isolated so each can be tested (and
// questioned) on its own. Each one trades soundness or precision for
// usable results on real code.

use crate::error::AnalysisError;
use crate::ifds::access_path::{AccessPath, Accessor};
use crate::ifds::fact::Tainted;
use crate::ir::{CallExpr, IrTraits};

/// Array read coarsening: reading `a[*]` when the whole array `a` is
/// marked taints the destination, and the array stays marked. Element
/// accessors are index-insensitive, so a marked array stands in for all
/// of its cells.
pub fn is_whole_array_read<V: Clone + Eq>(
    fact_path: &AccessPath<V>,
    from_path: &AccessPath<V>,
) -> bool {
    matches!(from_path.accessors().last(), Some(Accessor::Element))
        && *from_path == fact_path.appended(Accessor::Element)
}

/// Array write coarsening: writing `a[*]` does not kill a mark on the
/// array, since element accessors are index-insensitive and the other
/// cells may still hold marked data. The nullness flow does not use this
/// rule; there an element write overwrites like any other store.
pub fn is_array_element_write<V: Clone + Eq>(to_path: &AccessPath<V>) -> bool {
    matches!(to_path.accessors().last(), Some(Accessor::Element))
}

/// Nullness kill on overwrite: any assignment into a location kills
/// "may be null" facts under it, regardless of what the right-hand side
/// is. Overwrites with another possibly-null value are re-generated
/// separately.
pub fn nullness_overridden_by_write<V: Clone + Eq>(
    fact: &Tainted<V>,
    to_path: &AccessPath<V>,
) -> bool {
    fact.is_nullness() && fact.path.starts_with(to_path)
}

/// String concatenation pass-through: a synthetic concat call assigned to
/// a destination propagates a mark from any argument to the destination,
/// keeping the argument's mark. Returns `None` when the call is not a
/// concat-into-assignment and normal call handling applies.
pub fn string_concat_pass_through<T: IrTraits>(
    ir: &T,
    call: &T::Statement,
    call_expr: &CallExpr<T::Method, T::Value>,
    fact: &Tainted<T::Value>,
) -> Result<Option<Vec<Tainted<T::Value>>>, AnalysisError> {
    if !call_expr.is_string_concat {
        return Ok(None);
    }
    let Some(assign) = ir.assignment(call) else {
        return Ok(None);
    };
    for arg in &call_expr.args {
        if ir.value_to_path(arg).as_ref() == Some(&fact.path) {
            let lhs_path = ir.value_to_path_or_err(&assign.lhs)?;
            return Ok(Some(vec![fact.clone(), fact.with_path(lhs_path)]));
        }
    }
    Ok(Some(vec![fact.clone()]))
}
