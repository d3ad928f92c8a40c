use taintflow_config::TaintMark;

use crate::config::TaintConfigProvider;
use crate::error::AnalysisError;
use crate::flow::common::{
    call_to_start_facts, default_call_to_return, entry_point_source_facts, exit_to_return_facts,
    into_facts, method_source_facts, pass_and_cleaner_facts, push_unique,
};
use crate::flow::{policy, FlowFunctions};
use crate::ifds::access_path::Accessor;
use crate::ifds::edge::FactOf;
use crate::ifds::fact::{TaintFact, Tainted};
use crate::ir::{ApplicationGraph, AssignRhs, Assignment, IrTraits, NullImplication};

/// Forward nullness propagation.
///
/// A `NULLNESS` fact on a path means the location may hold null. Facts
/// are generated by null literals, nullable-returning calls, nullable
/// formals and nullable array allocations; they die when the location is
/// overwritten, proven non-null by a branch, or dereferenced (execution
/// cannot continue past a null dereference, the dereference itself is the
/// analyzer's finding).
pub struct NullnessFlowFunctions<'a, T, G, C> {
    ir: &'a T,
    graph: &'a G,
    config: &'a C,
}

impl<'a, T, G, C> NullnessFlowFunctions<'a, T, G, C>
where
    T: IrTraits,
    G: ApplicationGraph<T>,
    C: TaintConfigProvider<T::Method>,
{
    pub fn new(ir: &'a T, graph: &'a G, config: &'a C) -> Self {
        Self { ir, graph, config }
    }

    /// Start facts without the speculative nullable formals; also what the
    /// Zero fact seeds into analyzed callees.
    fn start_facts_basic(&self, method: &T::Method) -> Result<Vec<FactOf<T>>, AnalysisError> {
        let mut facts = vec![TaintFact::Zero];
        entry_point_source_facts(self.ir, self.config, method, &mut facts)?;
        Ok(facts)
    }

    /// Nullness facts generated by the statement itself, observed from
    /// the Zero fact.
    fn generated(&self, stmt: &T::Statement) -> Result<Vec<FactOf<T>>, AnalysisError> {
        let Some(assign) = self.ir.assignment(stmt) else {
            return Ok(Vec::new());
        };
        let to_path = self.ir.value_to_path_or_err(&assign.lhs)?;
        let facts = match &assign.rhs {
            AssignRhs::NullConstant => {
                vec![TaintFact::Tainted(Tainted::new(to_path, TaintMark::nullness()))]
            }
            AssignRhs::Call => {
                let nullable = self
                    .ir
                    .call_expr(stmt)
                    .is_some_and(|call_expr| self.ir.returns_nullable(&call_expr.callee));
                if nullable {
                    vec![TaintFact::Tainted(Tainted::new(to_path, TaintMark::nullness()))]
                } else {
                    Vec::new()
                }
            }
            AssignRhs::NewArray {
                dims,
                nullable_elements: true,
            } => {
                let mut path = to_path;
                for _ in 0..*dims {
                    path = path.appended(Accessor::Element);
                }
                vec![TaintFact::Tainted(Tainted::new(path, TaintMark::nullness()))]
            }
            _ => Vec::new(),
        };
        Ok(facts)
    }

    fn transmit_assign(
        &self,
        fact: &Tainted<T::Value>,
        assign: &Assignment<T::Value>,
    ) -> Result<Vec<Tainted<T::Value>>, AnalysisError> {
        let to_path = self.ir.value_to_path_or_err(&assign.lhs)?;

        if policy::nullness_overridden_by_write(fact, &to_path) {
            return Ok(Vec::new());
        }

        let from_path = match &assign.rhs {
            AssignRhs::Value(value) => self.ir.value_to_path(value),
            _ => None,
        };
        if let Some(from_path) = from_path {
            if policy::is_whole_array_read(&fact.path, &from_path) {
                return Ok(vec![fact.clone(), fact.with_path(to_path)]);
            }
            if let Some(tail) = fact.path.minus(&from_path) {
                return Ok(vec![fact.clone(), fact.with_path(to_path.extended(&tail))]);
            }
        }

        let mut facts = Vec::new();
        if matches!(assign.rhs, AssignRhs::NullConstant) {
            push_unique(&mut facts, Tainted::new(to_path.clone(), TaintMark::nullness()));
        }
        if !fact.path.starts_with(&to_path) {
            push_unique(&mut facts, fact.clone());
        }
        Ok(facts)
    }

    /// Branch splitting at a null comparison.
    ///
    /// `Some(facts)` means the edge was fully handled here. Under Zero,
    /// the null-implied edge gets a speculative nullness fact *without*
    /// Zero, so code behind the guard is only reached when the fact
    /// holds. A nullness fact on the compared path becomes Zero on the
    /// null-implied edge and dies on the other.
    fn split_null_branch(
        &self,
        current: &T::Statement,
        next: &T::Statement,
        fact: &FactOf<T>,
    ) -> Option<Vec<FactOf<T>>> {
        let (compared, implication) = self.ir.null_implication(current, next)?;
        let compared_path = self.ir.value_to_path(&compared);
        match fact {
            TaintFact::Zero => {
                if implication == NullImplication::Null {
                    let path = compared_path?;
                    return Some(vec![TaintFact::Tainted(Tainted::new(
                        path,
                        TaintMark::nullness(),
                    ))]);
                }
                None
            }
            TaintFact::Tainted(tainted) if tainted.is_nullness() => {
                if compared_path.as_ref() != Some(&tainted.path) {
                    return Some(vec![TaintFact::Tainted(tainted.clone())]);
                }
                if implication == NullImplication::Null {
                    Some(vec![TaintFact::Zero])
                } else {
                    Some(Vec::new())
                }
            }
            TaintFact::Tainted(_) => None,
        }
    }
}

impl<T, G, C> FlowFunctions<T> for NullnessFlowFunctions<'_, T, G, C>
where
    T: IrTraits,
    G: ApplicationGraph<T>,
    C: TaintConfigProvider<T::Method>,
{
    fn start_facts(&self, method: &T::Method) -> Result<Vec<FactOf<T>>, AnalysisError> {
        let mut facts = self.start_facts_basic(method)?;
        for formal in self.ir.nullable_formal_arguments(method) {
            let path = self.ir.value_to_path_or_err(&formal)?;
            push_unique(
                &mut facts,
                TaintFact::Tainted(Tainted::new(path, TaintMark::nullness())),
            );
        }
        Ok(facts)
    }

    fn sequent(
        &self,
        current: &T::Statement,
        next: &T::Statement,
        fact: &FactOf<T>,
    ) -> Result<Vec<FactOf<T>>, AnalysisError> {
        if let TaintFact::Tainted(tainted) = fact {
            if tainted.is_nullness() && self.ir.is_dereferenced_at(&tainted.path, current) {
                return Ok(Vec::new());
            }
        }

        if let Some(facts) = self.split_null_branch(current, next, fact) {
            return Ok(facts);
        }

        let fact = match fact {
            TaintFact::Zero => {
                let mut facts = vec![TaintFact::Zero];
                for generated in self.generated(current)? {
                    push_unique(&mut facts, generated);
                }
                return Ok(facts);
            }
            TaintFact::Tainted(fact) => fact,
        };

        match self.ir.assignment(current) {
            Some(assign) => Ok(into_facts::<T>(self.transmit_assign(fact, &assign)?)),
            None => Ok(vec![TaintFact::Tainted(fact.clone())]),
        }
    }

    fn call_to_return(
        &self,
        call: &T::Statement,
        _return_site: &T::Statement,
        fact: &FactOf<T>,
    ) -> Result<Vec<FactOf<T>>, AnalysisError> {
        if let TaintFact::Tainted(tainted) = fact {
            if tainted.is_nullness() && self.ir.is_dereferenced_at(&tainted.path, call) {
                return Ok(Vec::new());
            }
        }

        let call_expr =
            self.ir
                .call_expr(call)
                .ok_or_else(|| AnalysisError::MissingCallExpression {
                    statement: format!("{call:?}"),
                })?;

        if let TaintFact::Tainted(tainted) = fact {
            if let Some(handled) =
                policy::string_concat_pass_through(self.ir, call, &call_expr, tainted)?
            {
                return Ok(into_facts::<T>(handled));
            }
        }

        let rules = self.config.rules_for(&call_expr.callee);

        let fact = match fact {
            TaintFact::Zero => {
                let mut facts = vec![TaintFact::Zero];
                for generated in self.generated(call)? {
                    push_unique(&mut facts, generated);
                }
                method_source_facts(self.ir, &rules, call, &mut facts)?;
                return Ok(facts);
            }
            TaintFact::Tainted(fact) => fact,
        };

        // String-append-like helpers keep their default behavior here;
        // their pass-through rules are tuned for the taint analysis and
        // would erase nullness facts.
        if !call_expr.is_string_concat {
            if let Some(facts) = pass_and_cleaner_facts(self.ir, &rules, call, fact)? {
                return Ok(into_facts::<T>(facts));
            }
        }

        Ok(into_facts::<T>(default_call_to_return(
            self.ir, self.graph, call, &call_expr, fact,
        )?))
    }

    fn call_to_start(
        &self,
        call: &T::Statement,
        callee: &T::Method,
        fact: &FactOf<T>,
    ) -> Result<Vec<FactOf<T>>, AnalysisError> {
        match fact {
            // Analyzed callees get no speculative nullable formals: what
            // flows in is decided by the call site.
            TaintFact::Zero => self.start_facts_basic(callee),
            TaintFact::Tainted(fact) => Ok(into_facts::<T>(call_to_start_facts(
                self.ir, call, callee, fact, true,
            )?)),
        }
    }

    fn exit_to_return(
        &self,
        call: &T::Statement,
        _return_site: &T::Statement,
        exit: &T::Statement,
        fact: &FactOf<T>,
    ) -> Result<Vec<FactOf<T>>, AnalysisError> {
        let fact = match fact {
            TaintFact::Zero => {
                let mut facts = vec![TaintFact::Zero];
                // `return null` in the callee lands as a nullness fact on
                // the caller's assignment target.
                if let Some(returned) = self.ir.returned_value(exit) {
                    if self.ir.is_null_constant(&returned) {
                        if let Some(assign) = self.ir.assignment(call) {
                            let to_path = self.ir.value_to_path_or_err(&assign.lhs)?;
                            push_unique(
                                &mut facts,
                                TaintFact::Tainted(Tainted::new(to_path, TaintMark::nullness())),
                            );
                        }
                    }
                }
                return Ok(facts);
            }
            TaintFact::Tainted(fact) => fact,
        };
        let callee = self.graph.method_of(exit);
        Ok(into_facts::<T>(exit_to_return_facts(
            self.ir, call, exit, &callee, fact, true,
        )?))
    }
}
