use serde::{Deserialize, Serialize};

use crate::action::{Action, ActionKind};
use crate::condition::Condition;
use crate::error::ConfigError;

/// A source rule: when `condition` holds, `actions` introduce new marks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRule {
    pub condition: Condition,
    pub actions: Vec<Action>,
}

/// A sink rule: when `condition` holds against a fact at the call site,
/// a finding is reported with this rule's metadata attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinkRule {
    pub condition: Condition,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub cwe: Vec<u32>,
}

/// A pass-through or cleaner rule: `actions` rewrite the fact set across
/// the call when `condition` holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassRule {
    pub condition: Condition,
    pub actions: Vec<Action>,
}

/// A single configuration rule, attached to a method by the rule set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum TaintRule {
    /// Marks introduced when analysis starts at the method itself.
    EntryPointSource(SourceRule),
    /// Marks introduced at call sites of the method.
    MethodSource(SourceRule),
    /// Marked data must not reach a call of the method.
    MethodSink(SinkRule),
    /// Mark propagation across calls of the method.
    PassThrough(PassRule),
    /// Mark removal across calls of the method (sanitizers).
    Cleaner(PassRule),
}

/// Discriminant of [`TaintRule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaintRuleKind {
    EntryPointSource,
    MethodSource,
    MethodSink,
    PassThrough,
    Cleaner,
}

impl TaintRule {
    pub fn kind(&self) -> TaintRuleKind {
        match self {
            TaintRule::EntryPointSource(_) => TaintRuleKind::EntryPointSource,
            TaintRule::MethodSource(_) => TaintRuleKind::MethodSource,
            TaintRule::MethodSink(_) => TaintRuleKind::MethodSink,
            TaintRule::PassThrough(_) => TaintRuleKind::PassThrough,
            TaintRule::Cleaner(_) => TaintRuleKind::Cleaner,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind() {
            TaintRuleKind::EntryPointSource => "EntryPointSource",
            TaintRuleKind::MethodSource => "MethodSource",
            TaintRuleKind::MethodSink => "MethodSink",
            TaintRuleKind::PassThrough => "PassThrough",
            TaintRuleKind::Cleaner => "Cleaner",
        }
    }

    pub fn condition(&self) -> &Condition {
        match self {
            TaintRule::EntryPointSource(rule) | TaintRule::MethodSource(rule) => &rule.condition,
            TaintRule::MethodSink(rule) => &rule.condition,
            TaintRule::PassThrough(rule) | TaintRule::Cleaner(rule) => &rule.condition,
        }
    }

    fn actions(&self) -> &[Action] {
        match self {
            TaintRule::EntryPointSource(rule) | TaintRule::MethodSource(rule) => &rule.actions,
            TaintRule::MethodSink(_) => &[],
            TaintRule::PassThrough(rule) | TaintRule::Cleaner(rule) => &rule.actions,
        }
    }

    /// Checks that every action kind is legal for this rule kind.
    ///
    /// Sources can only introduce marks; pass-throughs can copy and remove;
    /// cleaners can only remove. Anything else is a configuration bug and
    /// is rejected here instead of surfacing mid-analysis.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let allowed: &[ActionKind] = match self.kind() {
            TaintRuleKind::EntryPointSource | TaintRuleKind::MethodSource => {
                &[ActionKind::AssignMark]
            }
            TaintRuleKind::MethodSink => &[],
            TaintRuleKind::PassThrough => &[
                ActionKind::CopyMark,
                ActionKind::CopyAllMarks,
                ActionKind::RemoveMark,
                ActionKind::RemoveAllMarks,
            ],
            TaintRuleKind::Cleaner => &[ActionKind::RemoveMark, ActionKind::RemoveAllMarks],
        };
        for action in self.actions() {
            if !allowed.contains(&action.kind()) {
                return Err(ConfigError::ForbiddenAction {
                    rule_kind: self.kind_name(),
                    action: action.kind().to_string(),
                });
            }
        }
        Ok(())
    }
}
