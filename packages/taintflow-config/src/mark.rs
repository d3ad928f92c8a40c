use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of the special mark tracked by the nullness analysis.
pub const NULLNESS_MARK: &str = "NULLNESS";

/// An opaque taint label, e.g. `"UNTRUSTED"` or `"SQL_INJECTION"`.
///
/// The engine never interprets mark names, with one exception: the
/// [`NULLNESS_MARK`] mark carries "may be null" facts for the nullness
/// analysis and enables its extra flow rules.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaintMark(String);

impl TaintMark {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The distinguished mark used by the nullness analysis.
    pub fn nullness() -> Self {
        Self(NULLNESS_MARK.to_string())
    }

    pub fn is_nullness(&self) -> bool {
        self.0 == NULLNESS_MARK
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaintMark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nullness_mark_is_distinguished() {
        assert!(TaintMark::nullness().is_nullness());
        assert!(!TaintMark::new("UNTRUSTED").is_nullness());
    }

    #[test]
    fn test_mark_serde_is_transparent() {
        let mark = TaintMark::new("SQL_INJECTION");
        let json = serde_json::to_string(&mark).unwrap();
        assert_eq!(json, "\"SQL_INJECTION\"");
        let back: TaintMark = serde_json::from_str(&json).unwrap();
        assert_eq!(back, mark);
    }
}
