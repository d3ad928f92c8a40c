// Rule evaluation against concrete call sites and method entries.
//
// The data model lives in the `taintflow-config` crate; this module
// resolves rule positions to IR values/paths and interprets conditions
// and actions.

pub mod action;
pub mod condition;
pub mod resolvers;

use std::fmt;

use taintflow_config::{RuleSet, TaintRule};

pub use action::ActionEvaluator;
pub use condition::{BasicConditionEvaluator, FactAwareConditionEvaluator};
pub use resolvers::{CallPositionResolver, EntryPositionResolver, PositionResolver};

/// Supplies the taint rules attached to a method.
pub trait TaintConfigProvider<M>: Send + Sync {
    fn rules_for(&self, method: &M) -> Vec<TaintRule>;
}

/// No rules at all.
pub struct EmptyConfig;

impl<M> TaintConfigProvider<M> for EmptyConfig {
    fn rules_for(&self, _method: &M) -> Vec<TaintRule> {
        Vec::new()
    }
}

/// Adapts a [`RuleSet`] by matching on the method's display name.
pub struct RuleSetProvider {
    rules: RuleSet,
}

impl RuleSetProvider {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }
}

impl<M: fmt::Display + Send + Sync> TaintConfigProvider<M> for RuleSetProvider {
    fn rules_for(&self, method: &M) -> Vec<TaintRule> {
        self.rules.rules_for_name(&method.to_string())
    }
}
