use corkboard_types::models::{DEFAULT_NAME, Message};
use rusqlite::{Connection, OptionalExtension};

use crate::models::{MESSAGE_COLUMNS, MessageRow};
use crate::{Database, Result, StoreError};

pub const MAX_NAME_CHARS: usize = 64;
pub const MAX_CONTENT_CHARS: usize = 2000;

impl Database {
    /// All messages, newest first. Messages sharing a timestamp keep their
    /// insertion order.
    pub fn list_messages(&self) -> Result<Vec<Message>> {
        self.with_conn(query_messages)
    }

    pub fn get_message(&self, id: i64) -> Result<Option<Message>> {
        self.with_conn(|conn| query_message(conn, id))
    }

    pub fn count_messages(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM messages", [], |r| r.get(0))?;
            Ok(count as usize)
        })
    }

    pub fn create_message(&self, name: Option<&str>, content: &str) -> Result<Message> {
        let name = normalize_name(name)?;
        let content = validate_content(content)?;
        let timestamp = chrono::Utc::now().timestamp_millis();

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (name, content, timestamp, likes, liked)
                 VALUES (?1, ?2, ?3, 0, 0)",
                rusqlite::params![&name, &content, timestamp],
            )?;

            Ok(Message {
                id: conn.last_insert_rowid(),
                name,
                content,
                timestamp,
                likes: 0,
                liked: false,
            })
        })
    }

    /// Delete one message. A missing id, including one deleted earlier, is
    /// reported as [`StoreError::NotFound`].
    pub fn delete_message(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            let changes = conn.execute("DELETE FROM messages WHERE id = ?1", [id])?;
            if changes == 0 {
                return Err(StoreError::NotFound(id));
            }
            Ok(())
        })
    }

    /// Bump the like counter in a single statement and return the updated row.
    pub fn like_message(&self, id: i64) -> Result<Message> {
        self.with_conn(|conn| {
            let sql = format!(
                "UPDATE messages SET likes = likes + 1, liked = 1
                 WHERE id = ?1 RETURNING {MESSAGE_COLUMNS}"
            );
            conn.query_row(&sql, [id], MessageRow::from_row)
                .optional()?
                .map(Message::from)
                .ok_or(StoreError::NotFound(id))
        })
    }
}

fn query_messages(conn: &Connection) -> Result<Vec<Message>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages ORDER BY timestamp DESC, id ASC"
    ))?;

    let rows = stmt
        .query_map([], MessageRow::from_row)?
        .map(|row| row.map(Message::from))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn query_message(conn: &Connection, id: i64) -> Result<Option<Message>> {
    let row = conn
        .query_row(
            &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"),
            [id],
            MessageRow::from_row,
        )
        .optional()?;

    Ok(row.map(Message::from))
}

fn normalize_name(name: Option<&str>) -> Result<String> {
    let name = name.map(str::trim).filter(|n| !n.is_empty()).unwrap_or(DEFAULT_NAME);
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(StoreError::Validation(format!(
            "name must be at most {MAX_NAME_CHARS} characters"
        )));
    }
    Ok(name.to_string())
}

fn validate_content(content: &str) -> Result<String> {
    if content.trim().is_empty() {
        return Err(StoreError::Validation("content is required".into()));
    }
    if content.chars().count() > MAX_CONTENT_CHARS {
        return Err(StoreError::Validation(format!(
            "content must be at most {MAX_CONTENT_CHARS} characters"
        )));
    }
    Ok(content.to_string())
}
