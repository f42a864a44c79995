use serde::{Deserialize, Serialize};

/// Display name used when a poster leaves the name blank.
pub const DEFAULT_NAME: &str = "anonymous";

/// A single post on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub name: String,
    pub content: String,
    /// Milliseconds since the Unix epoch, set once at insert time.
    pub timestamp: i64,
    pub likes: i64,
    /// True once the message has been liked at least once. Never reset.
    pub liked: bool,
}
