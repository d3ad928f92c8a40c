use std::fmt;

use serde::{Deserialize, Serialize};

/// A value slot at a method boundary that a rule can talk about.
///
/// Resolution is context-dependent: at a call site, `Argument(i)` is the
/// i-th actual and `Result` the assigned left-hand side; at a method entry,
/// `Argument(i)` is the i-th formal and `Result` does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Position {
    /// Receiver object of an instance call.
    This,
    /// Zero-based argument index.
    Argument { index: u32 },
    /// Value returned by the call.
    Result,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::This => write!(f, "this"),
            Position::Argument { index } => write!(f, "arg[{index}]"),
            Position::Result => write!(f, "result"),
        }
    }
}
