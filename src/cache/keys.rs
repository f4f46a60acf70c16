//! Query cache key definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies one cached collection. At most one entry exists per key in a
/// [`QueryCache`](super::QueryCache).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryKey {
    /// The full todo list, newest first.
    Todos,
}

impl QueryKey {
    pub const fn as_str(&self) -> &'static str {
        match self {
            QueryKey::Todos => "todos",
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
