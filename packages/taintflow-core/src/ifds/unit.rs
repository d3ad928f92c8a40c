use std::fmt;
use std::sync::Arc;

/// Identifier of an analysis unit.
///
/// Units partition methods; each unit gets its own runner and its own
/// fixpoint. Methods resolving to `Unknown` are excluded from analysis
/// altogether.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UnitId {
    /// Not part of any unit; never analyzed.
    Unknown,
    /// The whole program as a single unit.
    Singleton,
    /// A named partition, e.g. a class or a package.
    Named(Arc<str>),
}

impl UnitId {
    pub fn named(name: impl AsRef<str>) -> Self {
        UnitId::Named(Arc::from(name.as_ref()))
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitId::Unknown => write!(f, "<unknown>"),
            UnitId::Singleton => write!(f, "<singleton>"),
            UnitId::Named(name) => write!(f, "{name}"),
        }
    }
}

/// Maps methods to analysis units.
pub trait UnitResolver<M>: Send + Sync {
    fn resolve(&self, method: &M) -> UnitId;
}

/// Puts every method into one unit; the whole program is analyzed by a
/// single runner.
pub struct SingletonUnitResolver;

impl<M> UnitResolver<M> for SingletonUnitResolver {
    fn resolve(&self, _method: &M) -> UnitId {
        UnitId::Singleton
    }
}

/// Closure-based resolver, e.g. grouping methods by class name.
pub struct FnUnitResolver<F>(pub F);

impl<M, F> UnitResolver<M> for FnUnitResolver<F>
where
    F: Fn(&M) -> UnitId + Send + Sync,
{
    fn resolve(&self, method: &M) -> UnitId {
        (self.0)(method)
    }
}
