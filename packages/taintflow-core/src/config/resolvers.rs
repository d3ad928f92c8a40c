use taintflow_config::Position;

use crate::error::AnalysisError;
use crate::ifds::access_path::AccessPath;
use crate::ir::{CallExpr, IrTraits};

/// Resolves rule positions to IR values and access paths in some context.
///
/// `Ok(None)` means the position simply does not exist here (e.g. a rule
/// talks about `arg[2]` of a two-argument call) and the rule silently does
/// not apply. `Err` means the position is meaningless in this context
/// altogether, which is a configuration bug.
pub trait PositionResolver<T: IrTraits> {
    fn resolve_value(&self, position: Position) -> Result<Option<T::Value>, AnalysisError>;

    fn resolve_path(
        &self,
        position: Position,
    ) -> Result<Option<AccessPath<T::Value>>, AnalysisError>;
}

/// Position resolution at a call site: arguments are actuals, `This` is
/// the receiver, `Result` is the assigned lhs.
pub struct CallPositionResolver<'a, T: IrTraits> {
    ir: &'a T,
    call: &'a T::Statement,
    call_expr: CallExpr<T::Method, T::Value>,
}

impl<'a, T: IrTraits> CallPositionResolver<'a, T> {
    pub fn new(ir: &'a T, call: &'a T::Statement) -> Result<Self, AnalysisError> {
        let call_expr = ir
            .call_expr(call)
            .ok_or_else(|| AnalysisError::MissingCallExpression {
                statement: format!("{call:?}"),
            })?;
        Ok(Self { ir, call, call_expr })
    }
}

impl<T: IrTraits> PositionResolver<T> for CallPositionResolver<'_, T> {
    fn resolve_value(&self, position: Position) -> Result<Option<T::Value>, AnalysisError> {
        let value = match position {
            Position::This => self.call_expr.instance.clone(),
            Position::Argument { index } => self.call_expr.args.get(index as usize).cloned(),
            Position::Result => self.ir.assignment(self.call).map(|assign| assign.lhs),
        };
        Ok(value)
    }

    fn resolve_path(
        &self,
        position: Position,
    ) -> Result<Option<AccessPath<T::Value>>, AnalysisError> {
        Ok(self
            .resolve_value(position)?
            .and_then(|value| self.ir.value_to_path(&value)))
    }
}

/// Position resolution at a method entry: arguments are formals, `This`
/// is the method's receiver, `Result` does not exist.
pub struct EntryPositionResolver<'a, T: IrTraits> {
    ir: &'a T,
    method: &'a T::Method,
}

impl<'a, T: IrTraits> EntryPositionResolver<'a, T> {
    pub fn new(ir: &'a T, method: &'a T::Method) -> Self {
        Self { ir, method }
    }
}

impl<T: IrTraits> PositionResolver<T> for EntryPositionResolver<'_, T> {
    fn resolve_value(&self, position: Position) -> Result<Option<T::Value>, AnalysisError> {
        match position {
            Position::This => Ok(self.ir.this_instance(self.method)),
            Position::Argument { index } => Ok(self
                .ir
                .formal_arguments(self.method)
                .get(index as usize)
                .cloned()),
            Position::Result => Err(AnalysisError::UnexpectedPosition {
                position,
                context: "method entry",
            }),
        }
    }

    fn resolve_path(
        &self,
        position: Position,
    ) -> Result<Option<AccessPath<T::Value>>, AnalysisError> {
        Ok(self
            .resolve_value(position)?
            .and_then(|value| self.ir.value_to_path(&value)))
    }
}
