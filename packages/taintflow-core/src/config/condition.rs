use regex::Regex;
use taintflow_config::{Condition, ConstantValue, Position};

use crate::config::resolvers::PositionResolver;
use crate::error::AnalysisError;
use crate::ifds::fact::Tainted;
use crate::ir::{IrTraits, RuntimeConstant};

/// Interprets rule conditions that only inspect constants at positions.
///
/// `ContainsMark` has no meaning without a fact in scope and is a fatal
/// error here; use [`FactAwareConditionEvaluator`] where a fact exists.
pub struct BasicConditionEvaluator<'a, T: IrTraits, R> {
    ir: &'a T,
    resolver: &'a R,
}

impl<'a, T, R> BasicConditionEvaluator<'a, T, R>
where
    T: IrTraits,
    R: PositionResolver<T>,
{
    pub fn new(ir: &'a T, resolver: &'a R) -> Self {
        Self { ir, resolver }
    }

    pub fn evaluate(&self, condition: &Condition) -> Result<bool, AnalysisError> {
        match condition {
            Condition::ConstantTrue => Ok(true),
            Condition::Not { arg } => Ok(!self.evaluate(arg)?),
            Condition::And { args } => {
                for arg in args {
                    if !self.evaluate(arg)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Condition::Or { args } => {
                for arg in args {
                    if self.evaluate(arg)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Condition::IsConstant { position } => Ok(self.constant_at(*position)?.is_some()),
            Condition::ConstantEq { position, value } => {
                Ok(self.constant_at(*position)?.is_some_and(|c| constant_eq(&c, value)))
            }
            Condition::ConstantLt { position, value } => {
                Ok(self.constant_at(*position)?.is_some_and(|c| constant_lt(&c, value)))
            }
            Condition::ConstantGt { position, value } => {
                Ok(self.constant_at(*position)?.is_some_and(|c| constant_gt(&c, value)))
            }
            Condition::ConstantMatches { position, pattern } => {
                let Some(constant) = self.constant_at(*position)? else {
                    return Ok(false);
                };
                let regex = anchored(pattern)?;
                Ok(regex.is_match(&render(&constant)))
            }
            Condition::ContainsMark { .. } => Err(AnalysisError::UnsupportedCondition {
                condition: format!("{condition:?}"),
            }),
        }
    }

    fn constant_at(&self, position: Position) -> Result<Option<RuntimeConstant>, AnalysisError> {
        Ok(self
            .resolver
            .resolve_value(position)?
            .and_then(|value| self.ir.constant_of(&value)))
    }
}

/// Interprets the full condition language against a concrete fact.
///
/// Everything except `ContainsMark` is delegated to the basic evaluator.
pub struct FactAwareConditionEvaluator<'a, T: IrTraits, R> {
    basic: BasicConditionEvaluator<'a, T, R>,
    ir: &'a T,
    resolver: &'a R,
    fact: &'a Tainted<T::Value>,
}

impl<'a, T, R> FactAwareConditionEvaluator<'a, T, R>
where
    T: IrTraits,
    R: PositionResolver<T>,
{
    pub fn new(ir: &'a T, resolver: &'a R, fact: &'a Tainted<T::Value>) -> Self {
        Self {
            basic: BasicConditionEvaluator::new(ir, resolver),
            ir,
            resolver,
            fact,
        }
    }

    pub fn evaluate(&self, condition: &Condition) -> Result<bool, AnalysisError> {
        match condition {
            Condition::Not { arg } => Ok(!self.evaluate(arg)?),
            Condition::And { args } => {
                for arg in args {
                    if !self.evaluate(arg)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Condition::Or { args } => {
                for arg in args {
                    if self.evaluate(arg)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Condition::ContainsMark { position, mark } => {
                if self.fact.mark != *mark {
                    return Ok(false);
                }
                let Some(value) = self.resolver.resolve_value(*position)? else {
                    return Ok(false);
                };
                let Some(path) = self.ir.value_to_path(&value) else {
                    return Ok(false);
                };
                if path == self.fact.path {
                    return Ok(true);
                }
                // Adhoc for arrays: the whole array stands in for its
                // elements when only trailing element accessors differ.
                Ok(path.remove_trailing_element_accessors()
                    == self.fact.path.remove_trailing_element_accessors())
            }
            other => self.basic.evaluate(other),
        }
    }
}

fn constant_eq(constant: &RuntimeConstant, expected: &ConstantValue) -> bool {
    match (constant, expected) {
        (RuntimeConstant::Int(a), ConstantValue::Int(b)) => a == b,
        (RuntimeConstant::Bool(a), ConstantValue::Bool(b)) => a == b,
        (RuntimeConstant::Str(a), ConstantValue::Str(b)) => a == b,
        _ => false,
    }
}

fn constant_lt(constant: &RuntimeConstant, expected: &ConstantValue) -> bool {
    match (constant, expected) {
        (RuntimeConstant::Int(a), ConstantValue::Int(b)) => a < b,
        (RuntimeConstant::Str(a), ConstantValue::Str(b)) => a < b,
        _ => false,
    }
}

fn constant_gt(constant: &RuntimeConstant, expected: &ConstantValue) -> bool {
    match (constant, expected) {
        (RuntimeConstant::Int(a), ConstantValue::Int(b)) => a > b,
        (RuntimeConstant::Str(a), ConstantValue::Str(b)) => a > b,
        _ => false,
    }
}

fn render(constant: &RuntimeConstant) -> String {
    match constant {
        RuntimeConstant::Int(value) => value.to_string(),
        RuntimeConstant::Bool(value) => value.to_string(),
        RuntimeConstant::Str(value) => value.clone(),
        RuntimeConstant::Null => "null".to_string(),
    }
}

// Patterns are validated at rule-set load time; compilation here cannot
// fail for rules that went through a RuleSet.
fn anchored(pattern: &str) -> Result<Regex, AnalysisError> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|_| AnalysisError::UnsupportedCondition {
        condition: format!("ConstantMatches({pattern})"),
    })
}
