use serde::Serialize;

use crate::ifds::fact::TaintFact;
use crate::ir::IrTraits;

/// A node of the exploded supergraph: a statement paired with a fact
/// holding right before it executes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Vertex<S, V> {
    pub statement: S,
    pub fact: TaintFact<V>,
}

impl<S, V> Vertex<S, V> {
    pub fn new(statement: S, fact: TaintFact<V>) -> Self {
        Self { statement, fact }
    }
}

/// A path edge (or summary edge) of the tabulation algorithm.
///
/// `from` is always a method-entry vertex; `to` is any vertex of the same
/// method. An edge whose `to` sits at an exit point is a summary edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Edge<S, V> {
    pub from: Vertex<S, V>,
    pub to: Vertex<S, V>,
}

impl<S: Clone, V: Clone> Edge<S, V> {
    pub fn new(from: Vertex<S, V>, to: Vertex<S, V>) -> Self {
        Self { from, to }
    }

    /// Self-loop at a method-entry vertex, seeding a new fixpoint.
    pub fn entry_loop(vertex: Vertex<S, V>) -> Self {
        Self {
            from: vertex.clone(),
            to: vertex,
        }
    }
}

pub type FactOf<T> = TaintFact<<T as IrTraits>::Value>;
pub type VertexOf<T> = Vertex<<T as IrTraits>::Statement, <T as IrTraits>::Value>;
pub type EdgeOf<T> = Edge<<T as IrTraits>::Statement, <T as IrTraits>::Value>;
