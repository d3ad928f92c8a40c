use std::fmt;

use serde::Serialize;
use taintflow_config::TaintMark;

use crate::ifds::access_path::AccessPath;

/// A mark attached to an access path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Tainted<V> {
    pub path: AccessPath<V>,
    pub mark: TaintMark,
}

impl<V: Clone + Eq> Tainted<V> {
    pub fn new(path: AccessPath<V>, mark: TaintMark) -> Self {
        Self { path, mark }
    }

    /// Same mark moved to another path.
    pub fn with_path(&self, path: AccessPath<V>) -> Self {
        Self {
            path,
            mark: self.mark.clone(),
        }
    }

    pub fn is_nullness(&self) -> bool {
        self.mark.is_nullness()
    }
}

/// A dataflow fact of the exploded supergraph.
///
/// `Zero` is the synthetic reachability fact present at every reachable
/// program point; every mark is introduced from a `Zero` edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum TaintFact<V> {
    Zero,
    Tainted(Tainted<V>),
}

impl<V> TaintFact<V> {
    pub fn is_zero(&self) -> bool {
        matches!(self, TaintFact::Zero)
    }

    pub fn as_tainted(&self) -> Option<&Tainted<V>> {
        match self {
            TaintFact::Zero => None,
            TaintFact::Tainted(tainted) => Some(tainted),
        }
    }
}

impl<V> From<Tainted<V>> for TaintFact<V> {
    fn from(tainted: Tainted<V>) -> Self {
        TaintFact::Tainted(tainted)
    }
}

impl<V: fmt::Display> fmt::Display for TaintFact<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaintFact::Zero => write!(f, "0"),
            TaintFact::Tainted(tainted) => write!(f, "{}@{}", tainted.mark, tainted.path),
        }
    }
}
