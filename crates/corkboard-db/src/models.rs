//! Database row types. Kept separate from the corkboard-types API model so
//! the storage layout can change without touching the wire format.
use corkboard_types::models::Message;
use rusqlite::Row;

/// Column list matching [`MessageRow::from_row`].
pub const MESSAGE_COLUMNS: &str = "id, name, content, timestamp, likes, liked";

pub struct MessageRow {
    pub id: i64,
    pub name: String,
    pub content: String,
    pub timestamp: i64,
    pub likes: i64,
    pub liked: bool,
}

impl MessageRow {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            content: row.get(2)?,
            timestamp: row.get(3)?,
            likes: row.get(4)?,
            liked: row.get(5)?,
        })
    }
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            content: row.content,
            timestamp: row.timestamp,
            likes: row.likes,
            liked: row.liked,
        }
    }
}
