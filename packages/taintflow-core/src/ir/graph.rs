use crate::ir::IrTraits;

/// CFG and call-graph view of the program under analysis.
///
/// `callees` returns only methods the graph can look into; a call whose
/// target is absent from it is treated as opaque (externally modeled by
/// configuration rules, or passed through).
pub trait ApplicationGraph<T: IrTraits>: Send + Sync {
    fn successors(&self, stmt: &T::Statement) -> Vec<T::Statement>;

    fn predecessors(&self, stmt: &T::Statement) -> Vec<T::Statement>;

    /// Analyzable targets of a call statement.
    fn callees(&self, stmt: &T::Statement) -> Vec<T::Method>;

    /// Call statements invoking the method.
    fn callers(&self, method: &T::Method) -> Vec<T::Statement>;

    fn entry_points(&self, method: &T::Method) -> Vec<T::Statement>;

    fn exit_points(&self, method: &T::Method) -> Vec<T::Statement>;

    fn method_of(&self, stmt: &T::Statement) -> T::Method;

    /// Every statement of the method body.
    fn statements_of(&self, method: &T::Method) -> Vec<T::Statement>;
}
