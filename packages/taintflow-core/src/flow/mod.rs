// Flow functions of the exploded supergraph.
//
// Four families per IFDS: sequent (intraprocedural step), call-to-return
// (around a call), call-to-start (into a callee), exit-to-return (back
// from a callee). Plus the start facts seeding a method's fixpoint.

mod common;
pub mod nullness;
pub mod policy;
pub mod taint;

pub use nullness::NullnessFlowFunctions;
pub use taint::TaintFlowFunctions;

use crate::error::AnalysisError;
use crate::ifds::edge::FactOf;
use crate::ir::IrTraits;

/// The flow-function space of one analysis.
///
/// All functions are distributive over facts: they take one fact and
/// return the facts holding after the edge. Fatal errors abort the
/// enclosing unit's fixpoint.
pub trait FlowFunctions<T: IrTraits>: Send + Sync {
    /// Facts seeding the fixpoint of a method analyzed from scratch.
    fn start_facts(&self, method: &T::Method) -> Result<Vec<FactOf<T>>, AnalysisError>;

    /// Intraprocedural edge `current -> next`.
    fn sequent(
        &self,
        current: &T::Statement,
        next: &T::Statement,
        fact: &FactOf<T>,
    ) -> Result<Vec<FactOf<T>>, AnalysisError>;

    /// Edge around a call, from the call statement to its return site.
    fn call_to_return(
        &self,
        call: &T::Statement,
        return_site: &T::Statement,
        fact: &FactOf<T>,
    ) -> Result<Vec<FactOf<T>>, AnalysisError>;

    /// Edge into a callee's entry point.
    fn call_to_start(
        &self,
        call: &T::Statement,
        callee: &T::Method,
        fact: &FactOf<T>,
    ) -> Result<Vec<FactOf<T>>, AnalysisError>;

    /// Edge from a callee's exit back to the caller's return site.
    fn exit_to_return(
        &self,
        call: &T::Statement,
        return_site: &T::Statement,
        exit: &T::Statement,
        fact: &FactOf<T>,
    ) -> Result<Vec<FactOf<T>>, AnalysisError>;
}
