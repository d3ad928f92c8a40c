use serde::{Deserialize, Serialize};

use crate::mark::TaintMark;
use crate::position::Position;

/// A constant literal a condition can compare against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum ConstantValue {
    Int(i64),
    Bool(bool),
    Str(String),
}

/// Guard of a taint rule, evaluated against a concrete call site or
/// method entry before the rule's actions fire.
///
/// `ContainsMark` is only meaningful for rules evaluated against a
/// specific dataflow fact (sinks, pass-throughs, cleaners); evaluators
/// without a fact in scope treat it as a fatal configuration error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Condition {
    /// Always holds. The conventional "unconditional rule" guard.
    ConstantTrue,
    Not {
        arg: Box<Condition>,
    },
    And {
        args: Vec<Condition>,
    },
    Or {
        args: Vec<Condition>,
    },
    /// The value at `position` is a compile-time constant.
    IsConstant {
        position: Position,
    },
    ConstantEq {
        position: Position,
        value: ConstantValue,
    },
    ConstantLt {
        position: Position,
        value: ConstantValue,
    },
    ConstantGt {
        position: Position,
        value: ConstantValue,
    },
    /// The constant at `position` is a string matching `pattern` (anchored).
    ConstantMatches {
        position: Position,
        pattern: String,
    },
    /// The current fact carries `mark` on the value at `position`.
    ContainsMark {
        position: Position,
        mark: TaintMark,
    },
}

impl Condition {
    /// Walks the condition tree, calling `visit` on every node.
    pub fn for_each_node<'a>(&'a self, visit: &mut impl FnMut(&'a Condition)) {
        visit(self);
        match self {
            Condition::Not { arg } => arg.for_each_node(visit),
            Condition::And { args } | Condition::Or { args } => {
                for arg in args {
                    arg.for_each_node(visit);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_condition_json_round_trip() {
        let cond = Condition::And {
            args: vec![
                Condition::ContainsMark {
                    position: Position::Argument { index: 0 },
                    mark: TaintMark::new("UNTRUSTED"),
                },
                Condition::Not {
                    arg: Box::new(Condition::IsConstant {
                        position: Position::Argument { index: 1 },
                    }),
                },
            ],
        };
        let json = serde_json::to_string(&cond).unwrap();
        let back: Condition = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cond);
    }

    #[test]
    fn test_for_each_node_visits_nested_conditions() {
        let cond = Condition::Or {
            args: vec![
                Condition::ConstantTrue,
                Condition::Not {
                    arg: Box::new(Condition::ConstantTrue),
                },
            ],
        };
        let mut count = 0;
        cond.for_each_node(&mut |_| count += 1);
        assert_eq!(count, 4);
    }
}
