use std::fmt;

use serde::{Deserialize, Serialize};

use crate::mark::TaintMark;
use crate::position::Position;

/// Effect of a taint rule on the fact set at a call site or method entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Action {
    /// Put `mark` on the value at `position`.
    AssignMark { position: Position, mark: TaintMark },
    /// If the current fact is `mark` at `from`, also mark `to`.
    CopyMark {
        from: Position,
        to: Position,
        mark: TaintMark,
    },
    /// If the current fact sits at `from`, also mark `to` (any mark).
    CopyAllMarks { from: Position, to: Position },
    /// Drop the current fact if it is `mark` at `position`.
    RemoveMark { position: Position, mark: TaintMark },
    /// Drop the current fact if it sits at `position` (any mark).
    RemoveAllMarks { position: Position },
}

/// Discriminant of [`Action`], used for load-time validity checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    AssignMark,
    CopyMark,
    CopyAllMarks,
    RemoveMark,
    RemoveAllMarks,
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::AssignMark { .. } => ActionKind::AssignMark,
            Action::CopyMark { .. } => ActionKind::CopyMark,
            Action::CopyAllMarks { .. } => ActionKind::CopyAllMarks,
            Action::RemoveMark { .. } => ActionKind::RemoveMark,
            Action::RemoveAllMarks { .. } => ActionKind::RemoveAllMarks,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionKind::AssignMark => "AssignMark",
            ActionKind::CopyMark => "CopyMark",
            ActionKind::CopyAllMarks => "CopyAllMarks",
            ActionKind::RemoveMark => "RemoveMark",
            ActionKind::RemoveAllMarks => "RemoveAllMarks",
        };
        f.write_str(name)
    }
}
