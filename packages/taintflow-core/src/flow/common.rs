// Call-site machinery shared by the taint and nullness flow families:
// position-based rule evaluation and actual/formal fact rewriting.

use taintflow_config::{Action, TaintRule};
use tracing::trace;

use crate::config::action::ActionEvaluator;
use crate::config::condition::{BasicConditionEvaluator, FactAwareConditionEvaluator};
use crate::config::resolvers::{CallPositionResolver, EntryPositionResolver};
use crate::config::TaintConfigProvider;
use crate::error::AnalysisError;
use crate::ifds::edge::FactOf;
use crate::ifds::fact::{TaintFact, Tainted};
use crate::ir::{ApplicationGraph, CallExpr, IrTraits};

pub(crate) fn push_unique<X: PartialEq>(items: &mut Vec<X>, item: X) {
    if !items.contains(&item) {
        items.push(item);
    }
}

pub(crate) fn into_facts<T: IrTraits>(tainted: Vec<Tainted<T::Value>>) -> Vec<FactOf<T>> {
    tainted.into_iter().map(TaintFact::Tainted).collect()
}

/// Moves a fact across a value binding: if `fact` sits under `from`, the
/// same accessor tail is re-rooted at `to`. A pathless `from` (constants,
/// opaque expressions) carries no facts. With `kill_deref_at` set,
/// nullness facts dereferenced at that statement die instead of moving.
pub(crate) fn transmit<T: IrTraits>(
    ir: &T,
    fact: &Tainted<T::Value>,
    from: &T::Value,
    to: &T::Value,
    kill_deref_at: Option<&T::Statement>,
) -> Result<Option<Tainted<T::Value>>, AnalysisError> {
    if let Some(at) = kill_deref_at {
        if fact.is_nullness() && ir.is_dereferenced_at(&fact.path, at) {
            return Ok(None);
        }
    }
    let Some(from_path) = ir.value_to_path(from) else {
        return Ok(None);
    };
    let to_path = ir.value_to_path_or_err(to)?;
    Ok(fact
        .path
        .minus(&from_path)
        .map(|tail| fact.with_path(to_path.extended(&tail))))
}

/// Adds facts from `EntryPointSource` rules of the method to `facts`.
pub(crate) fn entry_point_source_facts<T, C>(
    ir: &T,
    config: &C,
    method: &T::Method,
    facts: &mut Vec<FactOf<T>>,
) -> Result<(), AnalysisError>
where
    T: IrTraits,
    C: TaintConfigProvider<T::Method>,
{
    let rules = config.rules_for(method);
    if rules.is_empty() {
        return Ok(());
    }
    let resolver = EntryPositionResolver::new(ir, method);
    let conditions = BasicConditionEvaluator::new(ir, &resolver);
    let actions = ActionEvaluator::new(&resolver);
    for rule in &rules {
        let TaintRule::EntryPointSource(source) = rule else {
            continue;
        };
        if !conditions.evaluate(&source.condition)? {
            continue;
        }
        for action in &source.actions {
            let result = match action {
                Action::AssignMark { position, mark } => actions.assign_mark(*position, mark)?,
                other => {
                    return Err(AnalysisError::UnexpectedAction {
                        rule_kind: "EntryPointSource",
                        action: format!("{other:?}"),
                    })
                }
            };
            if let Some(new_facts) = result {
                for tainted in new_facts {
                    push_unique(facts, TaintFact::Tainted(tainted));
                }
            }
        }
    }
    Ok(())
}

/// Adds facts from `MethodSource` rules of the callee to `facts`,
/// evaluated at the call site under the Zero fact.
pub(crate) fn method_source_facts<T>(
    ir: &T,
    rules: &[TaintRule],
    call: &T::Statement,
    facts: &mut Vec<FactOf<T>>,
) -> Result<(), AnalysisError>
where
    T: IrTraits,
{
    if rules.is_empty() {
        return Ok(());
    }
    let resolver = CallPositionResolver::new(ir, call)?;
    let conditions = BasicConditionEvaluator::new(ir, &resolver);
    let actions = ActionEvaluator::new(&resolver);
    for rule in rules {
        let TaintRule::MethodSource(source) = rule else {
            continue;
        };
        if !conditions.evaluate(&source.condition)? {
            continue;
        }
        for action in &source.actions {
            let result = match action {
                Action::AssignMark { position, mark } => actions.assign_mark(*position, mark)?,
                other => {
                    return Err(AnalysisError::UnexpectedAction {
                        rule_kind: "MethodSource",
                        action: format!("{other:?}"),
                    })
                }
            };
            if let Some(new_facts) = result {
                for tainted in new_facts {
                    push_unique(facts, TaintFact::Tainted(tainted));
                }
            }
        }
    }
    Ok(())
}

/// Evaluates `PassThrough` then `Cleaner` rules of the callee against a
/// fact. `Ok(None)` means no action applied and the default call behavior
/// stays in force; `Ok(Some(facts))` replaces it entirely.
pub(crate) fn pass_and_cleaner_facts<T>(
    ir: &T,
    rules: &[TaintRule],
    call: &T::Statement,
    fact: &Tainted<T::Value>,
) -> Result<Option<Vec<Tainted<T::Value>>>, AnalysisError>
where
    T: IrTraits,
{
    if rules.is_empty() {
        return Ok(None);
    }
    let resolver = CallPositionResolver::new(ir, call)?;
    let conditions = FactAwareConditionEvaluator::new(ir, &resolver, fact);
    let actions = ActionEvaluator::new(&resolver);

    let mut facts: Vec<Tainted<T::Value>> = Vec::new();
    let mut default_behavior = true;

    for rule in rules {
        let TaintRule::PassThrough(pass) = rule else {
            continue;
        };
        if !conditions.evaluate(&pass.condition)? {
            continue;
        }
        for action in &pass.actions {
            let result = match action {
                Action::CopyMark { from, to, mark } => actions.copy_mark(*from, *to, mark, fact)?,
                Action::CopyAllMarks { from, to } => actions.copy_all_marks(*from, *to, fact)?,
                Action::RemoveMark { position, mark } => {
                    actions.remove_mark(*position, mark, fact)?
                }
                Action::RemoveAllMarks { position } => {
                    actions.remove_all_marks(*position, fact)?
                }
                other => {
                    return Err(AnalysisError::UnexpectedAction {
                        rule_kind: "PassThrough",
                        action: format!("{other:?}"),
                    })
                }
            };
            if let Some(new_facts) = result {
                for tainted in new_facts {
                    push_unique(&mut facts, tainted);
                }
                default_behavior = false;
            }
        }
    }

    for rule in rules {
        let TaintRule::Cleaner(cleaner) = rule else {
            continue;
        };
        if !conditions.evaluate(&cleaner.condition)? {
            continue;
        }
        for action in &cleaner.actions {
            let result = match action {
                Action::RemoveMark { position, mark } => {
                    actions.remove_mark(*position, mark, fact)?
                }
                Action::RemoveAllMarks { position } => {
                    actions.remove_all_marks(*position, fact)?
                }
                other => {
                    return Err(AnalysisError::UnexpectedAction {
                        rule_kind: "Cleaner",
                        action: format!("{other:?}"),
                    })
                }
            };
            if let Some(new_facts) = result {
                for tainted in new_facts {
                    push_unique(&mut facts, tainted);
                }
                default_behavior = false;
            }
        }
    }

    if default_behavior {
        Ok(None)
    } else {
        if !facts.is_empty() {
            trace!(count = facts.len(), "facts rewritten by call rules");
        }
        Ok(Some(facts))
    }
}

/// Default call-to-return behavior for a non-zero fact once rules and
/// adhoc cases did not fire.
///
/// Facts flowing into an analyzable callee (via arguments, the receiver,
/// or statics) are dropped here and re-enter through the summary edge;
/// facts under the assigned lhs are overwritten by the call result;
/// everything else passes through. Constructors always pass through.
pub(crate) fn default_call_to_return<T, G>(
    ir: &T,
    graph: &G,
    call: &T::Statement,
    call_expr: &CallExpr<T::Method, T::Value>,
    fact: &Tainted<T::Value>,
) -> Result<Vec<Tainted<T::Value>>, AnalysisError>
where
    T: IrTraits,
    G: ApplicationGraph<T>,
{
    if ir.is_constructor(&call_expr.callee) {
        return Ok(vec![fact.clone()]);
    }

    if graph.callees(call).contains(&call_expr.callee) {
        if fact.path.is_static() {
            return Ok(Vec::new());
        }
        for actual in &call_expr.args {
            if let Some(path) = ir.value_to_path(actual) {
                if fact.path.starts_with(&path) {
                    // Handled by the summary edge.
                    return Ok(Vec::new());
                }
            }
        }
        if let Some(instance) = &call_expr.instance {
            if let Some(path) = ir.value_to_path(instance) {
                if fact.path.starts_with(&path) {
                    return Ok(Vec::new());
                }
            }
        }
    }

    if let Some(assign) = ir.assignment(call) {
        if let Some(path) = ir.value_to_path(&assign.lhs) {
            if fact.path.starts_with(&path) {
                // Overwritten by the call result.
                return Ok(Vec::new());
            }
        }
    }

    Ok(vec![fact.clone()])
}

/// Non-zero call-to-start rewriting: actuals to formals, receiver to
/// `this`, statics verbatim.
pub(crate) fn call_to_start_facts<T>(
    ir: &T,
    call: &T::Statement,
    callee: &T::Method,
    fact: &Tainted<T::Value>,
    kill_deref: bool,
) -> Result<Vec<Tainted<T::Value>>, AnalysisError>
where
    T: IrTraits,
{
    let call_expr = ir
        .call_expr(call)
        .ok_or_else(|| AnalysisError::MissingCallExpression {
            statement: format!("{call:?}"),
        })?;
    let kill_at = kill_deref.then_some(call);

    let mut facts = Vec::new();
    let formals = ir.formal_arguments(callee);
    for (formal, actual) in formals.iter().zip(&call_expr.args) {
        if let Some(tainted) = transmit(ir, fact, actual, formal, kill_at)? {
            push_unique(&mut facts, tainted);
        }
    }
    if let (Some(instance), Some(this)) = (&call_expr.instance, ir.this_instance(callee)) {
        if let Some(tainted) = transmit(ir, fact, instance, &this, kill_at)? {
            push_unique(&mut facts, tainted);
        }
    }
    if fact.path.is_static() {
        push_unique(&mut facts, fact.clone());
    }
    Ok(facts)
}

/// Non-zero exit-to-return rewriting: heap facts formals back to actuals,
/// `this` back to the receiver, statics verbatim, returned value to the
/// assigned lhs.
pub(crate) fn exit_to_return_facts<T>(
    ir: &T,
    call: &T::Statement,
    exit: &T::Statement,
    callee: &T::Method,
    fact: &Tainted<T::Value>,
    kill_deref: bool,
) -> Result<Vec<Tainted<T::Value>>, AnalysisError>
where
    T: IrTraits,
{
    let call_expr = ir
        .call_expr(call)
        .ok_or_else(|| AnalysisError::MissingCallExpression {
            statement: format!("{call:?}"),
        })?;
    let kill_at = kill_deref.then_some(call);

    let mut facts = Vec::new();

    // Formals are passed back only when the fact lives on the heap;
    // locals of the callee die with its frame.
    if fact.path.is_on_heap() {
        let formals = ir.formal_arguments(callee);
        for (formal, actual) in formals.iter().zip(&call_expr.args) {
            if let Some(tainted) = transmit(ir, fact, formal, actual, kill_at)? {
                push_unique(&mut facts, tainted);
            }
        }
    }

    if let (Some(instance), Some(this)) = (&call_expr.instance, ir.this_instance(callee)) {
        if let Some(tainted) = transmit(ir, fact, &this, instance, kill_at)? {
            push_unique(&mut facts, tainted);
        }
    }

    if fact.path.is_static() {
        push_unique(&mut facts, fact.clone());
    }

    if let Some(returned) = ir.returned_value(exit) {
        if let Some(assign) = ir.assignment(call) {
            if let Some(tainted) = transmit(ir, fact, &returned, &assign.lhs, kill_at)? {
                push_unique(&mut facts, tainted);
            }
        }
    }

    Ok(facts)
}
