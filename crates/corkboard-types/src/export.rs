use serde::{Deserialize, Serialize};

/// Layout of the JSON export written next to every binary snapshot.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageExport {
    pub export_time: String,
    pub total_count: usize,
    pub items: Vec<ExportItem>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExportItem {
    pub id: i64,
    pub name: String,
    pub content: String,
    /// Local time, `YYYY-MM-DD HH:MM:SS`.
    pub time: String,
    pub likes: i64,
    pub liked: bool,
}
