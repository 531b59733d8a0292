use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier of a task.
///
/// Local storage hands out millisecond timestamps, remote tables hand out
/// whatever their primary key is (bigserial, uuid, ...). Both serialize as the
/// bare JSON value so blobs and rows round-trip unchanged.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskId {
    Int(i64),
    Opaque(String),
}

impl TaskId {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            TaskId::Int(n) => Some(*n),
            TaskId::Opaque(_) => None,
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskId::Int(n) => write!(f, "{n}"),
            TaskId::Opaque(s) => f.write_str(s),
        }
    }
}

impl FromStr for TaskId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(match s.parse::<i64>() {
            Ok(n) => TaskId::Int(n),
            Err(_) => TaskId::Opaque(s.to_string()),
        })
    }
}

impl From<i64> for TaskId {
    fn from(n: i64) -> Self {
        TaskId::Int(n)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        TaskId::Opaque(s.to_string())
    }
}
