// IR capability interface.
//
// The engine never sees a concrete instruction set. A front end exposes
// its IR through [`IrTraits`] (statement and value interrogation) and
// [`ApplicationGraph`] (CFG + call graph), and everything else is generic
// over those two traits.

pub mod graph;

use std::fmt;
use std::hash::Hash;

pub use graph::ApplicationGraph;

use crate::error::AnalysisError;
use crate::ifds::access_path::AccessPath;

/// A call site decomposed into engine-relevant parts.
#[derive(Debug, Clone)]
pub struct CallExpr<M, V> {
    pub callee: M,
    /// Receiver of an instance call, `None` for static calls.
    pub instance: Option<V>,
    /// Actual arguments, in declaration order.
    pub args: Vec<V>,
    /// Synthetic string-concatenation call (compiler-generated helpers).
    pub is_string_concat: bool,
}

/// Right-hand side of an assignment, as far as the engine cares.
#[derive(Debug, Clone)]
pub enum AssignRhs<V> {
    /// A value that may denote a storage location.
    Value(V),
    /// The null literal.
    NullConstant,
    /// Array allocation. `nullable_elements` is false only when the
    /// element type provably cannot hold null.
    NewArray { dims: u32, nullable_elements: bool },
    /// A call; details come from [`IrTraits::call_expr`] on the same
    /// statement.
    Call,
    /// Any other constant or opaque expression.
    Other,
}

/// An assignment decomposed into lhs and rhs.
#[derive(Debug, Clone)]
pub struct Assignment<V> {
    pub lhs: V,
    pub rhs: AssignRhs<V>,
}

/// What taking a branch edge says about a value compared with null.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullImplication {
    /// On this edge the value is null.
    Null,
    /// On this edge the value is not null.
    NonNull,
}

/// A compile-time constant, for rule condition evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeConstant {
    Int(i64),
    Bool(bool),
    Str(String),
    Null,
}

/// Capabilities a front end must provide over its IR.
///
/// Implementors are typically the program representation itself; all
/// methods take `&self` so lookups can go through its tables.
pub trait IrTraits: Send + Sync {
    type Method: Clone + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync;
    type Statement: Clone + Eq + Hash + fmt::Debug + Send + Sync;
    type Value: Clone + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync;

    fn method_name(&self, method: &Self::Method) -> String;

    fn is_constructor(&self, method: &Self::Method) -> bool;

    /// Whether calls of this method may return null.
    fn returns_nullable(&self, method: &Self::Method) -> bool;

    /// Formal parameters, in declaration order.
    fn formal_arguments(&self, method: &Self::Method) -> Vec<Self::Value>;

    /// Formal parameters that may legally be passed null.
    fn nullable_formal_arguments(&self, method: &Self::Method) -> Vec<Self::Value>;

    /// The `this` value of an instance method, `None` for static methods.
    fn this_instance(&self, method: &Self::Method) -> Option<Self::Value>;

    /// Access path for a value, if it denotes a storage location.
    /// Constants and opaque expressions have no path.
    fn value_to_path(&self, value: &Self::Value) -> Option<AccessPath<Self::Value>>;

    /// The constant a value evaluates to, if any.
    fn constant_of(&self, value: &Self::Value) -> Option<RuntimeConstant>;

    /// Call expression at the statement, if it is a call (standalone or
    /// the rhs of an assignment).
    fn call_expr(&self, stmt: &Self::Statement) -> Option<CallExpr<Self::Method, Self::Value>>;

    /// Assignment decomposition, if the statement is an assignment.
    fn assignment(&self, stmt: &Self::Statement) -> Option<Assignment<Self::Value>>;

    fn is_return(&self, stmt: &Self::Statement) -> bool;

    /// Value returned by a return statement, if any.
    fn returned_value(&self, stmt: &Self::Statement) -> Option<Self::Value>;

    /// If `stmt` branches on a null comparison and `successor` is one of
    /// its targets, the compared value and what the edge implies about it.
    fn null_implication(
        &self,
        stmt: &Self::Statement,
        successor: &Self::Statement,
    ) -> Option<(Self::Value, NullImplication)>;

    /// Whether executing `stmt` dereferences the location named by `path`
    /// (field/element access through it, or an instance call on it).
    fn is_dereferenced_at(&self, path: &AccessPath<Self::Value>, stmt: &Self::Statement) -> bool;

    /// `value_to_path` for values that must have a path; failure is an
    /// internal-contract violation.
    fn value_to_path_or_err(
        &self,
        value: &Self::Value,
    ) -> Result<AccessPath<Self::Value>, AnalysisError> {
        self.value_to_path(value)
            .ok_or_else(|| AnalysisError::NoAccessPath {
                value: value.to_string(),
            })
    }

    fn is_null_constant(&self, value: &Self::Value) -> bool {
        matches!(self.constant_of(value), Some(RuntimeConstant::Null))
    }
}
