// Interprocedural taint and nullness dataflow engine
//
// An IFDS-style tabulation over an abstract IR: facts are access paths
// carrying marks, flow functions move them across statements and calls,
// and per-unit runners reach a fixpoint over path edges, exchanging
// summary edges through a manager.
//
// The engine is generic over the program representation: a front end
// implements [`ir::IrTraits`] and [`ir::ApplicationGraph`], and rule
// semantics for opaque methods come from a [`config::TaintConfigProvider`].
// [`simple_ir`] ships a small reference front end used by the test suite.

pub mod analyzer;
pub mod config;
pub mod error;
pub mod flow;
pub mod ifds;
pub mod ir;
pub mod manager;
pub mod runner;
pub mod simple_ir;

pub use analyzer::{Analyzer, Event, Finding, NullnessAnalyzer, TaintAnalyzer};
pub use config::{EmptyConfig, RuleSetProvider, TaintConfigProvider};
pub use error::AnalysisError;
pub use flow::{FlowFunctions, NullnessFlowFunctions, TaintFlowFunctions};
pub use ifds::{
    AccessPath, Accessor, Edge, EdgeOf, FactOf, FnUnitResolver, SingletonUnitResolver, TaintFact,
    Tainted, UnitId, UnitResolver, Vertex, VertexOf,
};
pub use ir::{
    ApplicationGraph, AssignRhs, Assignment, CallExpr, IrTraits, NullImplication, RuntimeConstant,
};
pub use manager::Manager;
pub use runner::{SharedSummaries, UnitRunner};
