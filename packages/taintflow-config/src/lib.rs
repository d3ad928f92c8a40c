// Taint rule configuration DSL
//
// Declarative rules that attach taint semantics to methods the analysis
// cannot (or should not) look into:
// - sources introduce marks (entry-point and call-site flavors)
// - sinks report marked data reaching a method
// - pass-throughs and cleaners rewrite marks across a call
//
// Rules are plain data (serde), loaded from JSON and validated eagerly:
// an action kind that is meaningless for its rule kind is rejected at
// load time, not when a flow function eventually trips over it.

pub mod action;
pub mod condition;
pub mod error;
pub mod item;
pub mod mark;
pub mod position;
pub mod ruleset;

pub use action::{Action, ActionKind};
pub use condition::{Condition, ConstantValue};
pub use error::ConfigError;
pub use item::{PassRule, SinkRule, SourceRule, TaintRule, TaintRuleKind};
pub use mark::TaintMark;
pub use position::Position;
pub use ruleset::{FunctionMatcher, RuleEntry, RuleSet};
