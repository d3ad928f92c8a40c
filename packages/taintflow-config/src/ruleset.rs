use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::condition::Condition;
use crate::error::ConfigError;
use crate::item::TaintRule;

/// Selects the methods a group of rules applies to, by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum FunctionMatcher {
    /// Exact method name.
    Name { name: String },
    /// Anchored regex over the method name.
    Pattern { pattern: String },
}

/// One rule-set entry as it appears in the JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleEntry {
    pub function: FunctionMatcher,
    pub rules: Vec<TaintRule>,
}

struct CompiledEntry {
    entry: RuleEntry,
    // Present iff the matcher is a pattern.
    pattern: Option<Regex>,
}

/// A validated collection of taint rules, queryable by method name.
///
/// Construction compiles every name pattern and every `ConstantMatches`
/// pattern, and checks action-kind validity for every rule. A `RuleSet`
/// that exists is a `RuleSet` that cannot fail later.
#[derive(Default)]
pub struct RuleSet {
    entries: Vec<CompiledEntry>,
}

impl RuleSet {
    pub fn new(entries: Vec<RuleEntry>) -> Result<Self, ConfigError> {
        let mut compiled = Vec::with_capacity(entries.len());
        for entry in entries {
            for rule in &entry.rules {
                rule.validate()?;
                validate_condition_patterns(rule.condition())?;
            }
            let pattern = match &entry.function {
                FunctionMatcher::Name { .. } => None,
                FunctionMatcher::Pattern { pattern } => Some(compile_anchored(pattern)?),
            };
            compiled.push(CompiledEntry { entry, pattern });
        }
        Ok(Self { entries: compiled })
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let entries: Vec<RuleEntry> = serde_json::from_str(json)?;
        Self::new(entries)
    }

    /// All rules whose matcher accepts the given method name, in file order.
    pub fn rules_for_name(&self, name: &str) -> Vec<TaintRule> {
        let mut rules = Vec::new();
        for compiled in &self.entries {
            let matched = match (&compiled.entry.function, &compiled.pattern) {
                (FunctionMatcher::Name { name: exact }, _) => exact == name,
                (FunctionMatcher::Pattern { .. }, Some(regex)) => regex.is_match(name),
                (FunctionMatcher::Pattern { .. }, None) => unreachable!("pattern not compiled"),
            };
            if matched {
                rules.extend(compiled.entry.rules.iter().cloned());
            }
        }
        rules
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn validate_condition_patterns(condition: &Condition) -> Result<(), ConfigError> {
    let mut result = Ok(());
    condition.for_each_node(&mut |node| {
        if result.is_err() {
            return;
        }
        if let Condition::ConstantMatches { pattern, .. } = node {
            if let Err(err) = compile_anchored(pattern) {
                result = Err(err);
            }
        }
    });
    result
}

pub(crate) fn compile_anchored(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|source| ConfigError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use crate::item::{SinkRule, SourceRule, TaintRuleKind};
    use crate::mark::TaintMark;
    use crate::position::Position;
    use pretty_assertions::assert_eq;

    fn source_entry(matcher: FunctionMatcher) -> RuleEntry {
        RuleEntry {
            function: matcher,
            rules: vec![TaintRule::MethodSource(SourceRule {
                condition: Condition::ConstantTrue,
                actions: vec![Action::AssignMark {
                    position: Position::Result,
                    mark: TaintMark::new("UNTRUSTED"),
                }],
            })],
        }
    }

    #[test]
    fn test_exact_name_matching() {
        let rules = RuleSet::new(vec![source_entry(FunctionMatcher::Name {
            name: "readLine".into(),
        })])
        .unwrap();
        assert_eq!(rules.rules_for_name("readLine").len(), 1);
        assert_eq!(rules.rules_for_name("readLines").len(), 0);
    }

    #[test]
    fn test_pattern_matching_is_anchored() {
        let rules = RuleSet::new(vec![source_entry(FunctionMatcher::Pattern {
            pattern: "get.*".into(),
        })])
        .unwrap();
        assert_eq!(rules.rules_for_name("getParameter").len(), 1);
        assert_eq!(rules.rules_for_name("forget").len(), 0);
    }

    #[test]
    fn test_invalid_name_pattern_is_rejected() {
        let result = RuleSet::new(vec![source_entry(FunctionMatcher::Pattern {
            pattern: "(".into(),
        })]);
        assert!(matches!(result, Err(ConfigError::InvalidPattern { .. })));
    }

    #[test]
    fn test_invalid_condition_pattern_is_rejected() {
        let entry = RuleEntry {
            function: FunctionMatcher::Name {
                name: "exec".into(),
            },
            rules: vec![TaintRule::MethodSink(SinkRule {
                condition: Condition::ConstantMatches {
                    position: Position::Argument { index: 0 },
                    pattern: "[".into(),
                },
                note: String::new(),
                cwe: vec![],
            })],
        };
        assert!(RuleSet::new(vec![entry]).is_err());
    }

    #[test]
    fn test_forbidden_action_rejected_at_load() {
        let entry = RuleEntry {
            function: FunctionMatcher::Name {
                name: "sanitize".into(),
            },
            rules: vec![TaintRule::Cleaner(crate::item::PassRule {
                condition: Condition::ConstantTrue,
                actions: vec![Action::AssignMark {
                    position: Position::Result,
                    mark: TaintMark::new("UNTRUSTED"),
                }],
            })],
        };
        assert!(matches!(
            RuleSet::new(vec![entry]),
            Err(ConfigError::ForbiddenAction { .. })
        ));
    }

    #[test]
    fn test_json_round_trip_through_rule_set() {
        let json = r#"[
            {
                "function": { "kind": "Name", "name": "source" },
                "rules": [
                    {
                        "kind": "MethodSource",
                        "condition": { "kind": "ConstantTrue" },
                        "actions": [
                            {
                                "kind": "AssignMark",
                                "position": { "kind": "Result" },
                                "mark": "UNTRUSTED"
                            }
                        ]
                    }
                ]
            },
            {
                "function": { "kind": "Name", "name": "sink" },
                "rules": [
                    {
                        "kind": "MethodSink",
                        "condition": {
                            "kind": "ContainsMark",
                            "position": { "kind": "Argument", "index": 0 },
                            "mark": "UNTRUSTED"
                        },
                        "note": "command injection",
                        "cwe": [78]
                    }
                ]
            }
        ]"#;
        let rules = RuleSet::from_json(json).unwrap();
        let for_source = rules.rules_for_name("source");
        assert_eq!(for_source.len(), 1);
        assert_eq!(for_source[0].kind(), TaintRuleKind::MethodSource);
        let for_sink = rules.rules_for_name("sink");
        assert_eq!(for_sink.len(), 1);
        match &for_sink[0] {
            TaintRule::MethodSink(sink) => assert_eq!(sink.cwe, vec![78]),
            other => panic!("unexpected rule: {other:?}"),
        }
    }
}
