use taintflow_config::{ConfigError, Position};
use thiserror::Error;

use crate::ifds::unit::UnitId;

/// Fatal analysis errors.
///
/// Every variant is an internal-contract violation or a configuration
/// misuse. They abort the fixpoint of the unit that hit them; other units
/// keep running and results computed so far stay valid.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("call statement has no call expression: {statement}")]
    MissingCallExpression { statement: String },

    #[error("no access path for value: {value}")]
    NoAccessPath { value: String },

    #[error("position {position} cannot be resolved at a {context}")]
    UnexpectedPosition {
        position: Position,
        context: &'static str,
    },

    #[error("condition is not supported by this evaluator: {condition}")]
    UnsupportedCondition { condition: String },

    #[error("action {action} is not applicable to {rule_kind} rules")]
    UnexpectedAction {
        rule_kind: &'static str,
        action: String,
    },

    #[error("runner for unit {unit} already exists")]
    RunnerExists { unit: UnitId },

    #[error("edge belongs to unit {edge_unit}, not to runner unit {runner_unit}")]
    ForeignEdge {
        runner_unit: UnitId,
        edge_unit: UnitId,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}
