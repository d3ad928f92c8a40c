use crate::config::TaintConfigProvider;
use crate::error::AnalysisError;
use crate::flow::common::{
    call_to_start_facts, default_call_to_return, entry_point_source_facts, exit_to_return_facts,
    into_facts, method_source_facts, pass_and_cleaner_facts,
};
use crate::flow::{policy, FlowFunctions};
use crate::ifds::edge::FactOf;
use crate::ifds::fact::{TaintFact, Tainted};
use crate::ir::{ApplicationGraph, AssignRhs, Assignment, IrTraits};

/// Forward taint propagation.
///
/// Marks enter through source rules, move along assignments and calls,
/// and are rewritten or removed by pass-through and cleaner rules.
pub struct TaintFlowFunctions<'a, T, G, C> {
    ir: &'a T,
    graph: &'a G,
    config: &'a C,
}

impl<'a, T, G, C> TaintFlowFunctions<'a, T, G, C>
where
    T: IrTraits,
    G: ApplicationGraph<T>,
    C: TaintConfigProvider<T::Method>,
{
    pub fn new(ir: &'a T, graph: &'a G, config: &'a C) -> Self {
        Self { ir, graph, config }
    }

    /// Assignment transfer for a mark.
    ///
    /// Reading under the marked path taints the destination with the same
    /// tail (both stay marked); writing over the marked path kills it,
    /// unless the write targets an array element and the array stays
    /// marked; anything else passes through.
    fn transmit_assign(
        &self,
        fact: &Tainted<T::Value>,
        assign: &Assignment<T::Value>,
    ) -> Result<Vec<Tainted<T::Value>>, AnalysisError> {
        let to_path = self.ir.value_to_path_or_err(&assign.lhs)?;
        let from_path = match &assign.rhs {
            AssignRhs::Value(value) => self.ir.value_to_path(value),
            _ => None,
        };

        if let Some(from_path) = from_path {
            if policy::is_whole_array_read(&fact.path, &from_path) {
                return Ok(vec![fact.clone(), fact.with_path(to_path)]);
            }
            if let Some(tail) = fact.path.minus(&from_path) {
                // Both 'from' and 'to' are marked now.
                return Ok(vec![fact.clone(), fact.with_path(to_path.extended(&tail))]);
            }
        }

        if fact.path.starts_with(&to_path) && !policy::is_array_element_write(&to_path) {
            // Overwritten.
            Ok(Vec::new())
        } else {
            Ok(vec![fact.clone()])
        }
    }
}

impl<T, G, C> FlowFunctions<T> for TaintFlowFunctions<'_, T, G, C>
where
    T: IrTraits,
    G: ApplicationGraph<T>,
    C: TaintConfigProvider<T::Method>,
{
    fn start_facts(&self, method: &T::Method) -> Result<Vec<FactOf<T>>, AnalysisError> {
        let mut facts = vec![TaintFact::Zero];
        entry_point_source_facts(self.ir, self.config, method, &mut facts)?;
        Ok(facts)
    }

    fn sequent(
        &self,
        current: &T::Statement,
        _next: &T::Statement,
        fact: &FactOf<T>,
    ) -> Result<Vec<FactOf<T>>, AnalysisError> {
        let fact = match fact {
            TaintFact::Zero => return Ok(vec![TaintFact::Zero]),
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
                method_source_facts(self.ir, &rules, call, &mut facts)?;
                return Ok(facts);
            }
            TaintFact::Tainted(fact) => fact,
        };

        if let Some(facts) = pass_and_cleaner_facts(self.ir, &rules, call, fact)? {
            return Ok(into_facts::<T>(facts));
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
            TaintFact::Zero => self.start_facts(callee),
            TaintFact::Tainted(fact) => Ok(into_facts::<T>(call_to_start_facts(
                self.ir, call, callee, fact, false,
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
            TaintFact::Zero => return Ok(vec![TaintFact::Zero]),
            TaintFact::Tainted(fact) => fact,
        };
        let callee = self.graph.method_of(exit);
        Ok(into_facts::<T>(exit_to_return_facts(
            self.ir, call, exit, &callee, fact, false,
        )?))
    }
}
