use taintflow_config::{Position, TaintMark};

use crate::config::resolvers::PositionResolver;
use crate::error::AnalysisError;
use crate::ifds::fact::Tainted;
use crate::ir::IrTraits;

/// Interprets rule actions, producing replacement fact sets.
///
/// Every method returns `Ok(None)` when the action does not apply to the
/// current fact (or its position does not resolve); only `Ok(Some(_))`
/// suppresses the engine's default call behavior.
pub struct ActionEvaluator<'a, T: IrTraits, R> {
    resolver: &'a R,
    _ir: std::marker::PhantomData<&'a T>,
}

impl<'a, T, R> ActionEvaluator<'a, T, R>
where
    T: IrTraits,
    R: PositionResolver<T>,
{
    pub fn new(resolver: &'a R) -> Self {
        Self {
            resolver,
            _ir: std::marker::PhantomData,
        }
    }

    /// `AssignMark`: mark the value at `position`.
    pub fn assign_mark(
        &self,
        position: Position,
        mark: &TaintMark,
    ) -> Result<Option<Vec<Tainted<T::Value>>>, AnalysisError> {
        Ok(self
            .resolver
            .resolve_path(position)?
            .map(|path| vec![Tainted::new(path, mark.clone())]))
    }

    /// `CopyMark`: if the fact is `mark` at `from`, also mark `to`.
    pub fn copy_mark(
        &self,
        from: Position,
        to: Position,
        mark: &TaintMark,
        fact: &Tainted<T::Value>,
    ) -> Result<Option<Vec<Tainted<T::Value>>>, AnalysisError> {
        if fact.mark != *mark {
            return Ok(None);
        }
        self.copy_all_marks(from, to, fact)
    }

    /// `CopyAllMarks`: if the fact sits at `from`, also mark `to`.
    pub fn copy_all_marks(
        &self,
        from: Position,
        to: Position,
        fact: &Tainted<T::Value>,
    ) -> Result<Option<Vec<Tainted<T::Value>>>, AnalysisError> {
        let Some(from_path) = self.resolver.resolve_path(from)? else {
            return Ok(None);
        };
        if from_path != fact.path {
            return Ok(None);
        }
        let Some(to_path) = self.resolver.resolve_path(to)? else {
            return Ok(None);
        };
        Ok(Some(vec![fact.clone(), fact.with_path(to_path)]))
    }

    /// `RemoveMark`: drop the fact if it is `mark` at `position`.
    pub fn remove_mark(
        &self,
        position: Position,
        mark: &TaintMark,
        fact: &Tainted<T::Value>,
    ) -> Result<Option<Vec<Tainted<T::Value>>>, AnalysisError> {
        if fact.mark != *mark {
            return Ok(None);
        }
        self.remove_all_marks(position, fact)
    }

    /// `RemoveAllMarks`: drop the fact if it sits at `position`.
    pub fn remove_all_marks(
        &self,
        position: Position,
        fact: &Tainted<T::Value>,
    ) -> Result<Option<Vec<Tainted<T::Value>>>, AnalysisError> {
        let Some(path) = self.resolver.resolve_path(position)? else {
            return Ok(None);
        };
        if path == fact.path {
            Ok(Some(Vec::new()))
        } else {
            Ok(None)
        }
    }
}
