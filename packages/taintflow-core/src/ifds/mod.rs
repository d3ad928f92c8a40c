// IFDS domain primitives: access paths, taint facts, exploded-graph
// vertices and edges, and analysis units.

pub mod access_path;
pub mod edge;
pub mod fact;
pub mod unit;

pub use access_path::{AccessPath, Accessor};
pub use edge::{Edge, EdgeOf, FactOf, Vertex, VertexOf};
pub use fact::{TaintFact, Tainted};
pub use unit::{FnUnitResolver, SingletonUnitResolver, UnitId, UnitResolver};
