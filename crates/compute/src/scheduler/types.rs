use std::fmt;
use std::str::FromStr;

use partbench_core::BenchError;
use serde::{Deserialize, Serialize};

/// The three task-assignment strategies under comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyKind {
    /// Fixed contiguous subset per worker; workers are only told "go".
    Preassigned,
    /// Same subsets, but computed and handed to each worker every round.
    Queued,
    /// One shared cursor; idle workers claim the next task.
    AtomicQueued,
}

impl PolicyKind {
    pub const ALL: [PolicyKind; 3] = [Self::Preassigned, Self::Queued, Self::AtomicQueued];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preassigned => "preassigned",
            Self::Queued => "queued",
            Self::AtomicQueued => "atomic-queued",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyKind {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, BenchError> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "preassigned" => Ok(Self::Preassigned),
            "queued" => Ok(Self::Queued),
            "atomic-queued" | "atomicqueued" => Ok(Self::AtomicQueued),
            other => Err(BenchError::Config(format!(
                "unknown policy '{other}', expected 'preassigned', 'queued' or 'atomic-queued'"
            ))),
        }
    }
}
