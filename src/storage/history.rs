// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Chat history storage using SQLite.

use anyhow::Result;
use chrono::{DateTime, Local, TimeZone};
use parking_lot::Mutex;
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// A single history entry.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub id: i64,
    pub timestamp: DateTime<Local>,
    pub direction: Direction,
    pub peer: String,
    pub content: String,
}

/// Direction of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Incoming,
    Outgoing,
}

impl Direction {
    fn as_str(&self) -> &'static str {
        match self {
            Direction::Incoming => "IN",
            Direction::Outgoing => "OUT",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "OUT" => Direction::Outgoing,
            _ => Direction::Incoming,
        }
    }
}

const SELECT_COLUMNS: &str = "SELECT id, timestamp, direction, peer, content FROM messages";

/// History database manager.
#[derive(Clone)]
pub struct History {
    conn: Arc<Mutex<Connection>>,
    max_entries: u32,
}

impl History {
    /// Create or open history database.
    pub fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let db_path = data_dir.join("history.db");
        info!("Opening history database: {:?}", db_path);

        let conn = Connection::open(&db_path)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp INTEGER NOT NULL,
                direction TEXT NOT NULL,
                peer TEXT NOT NULL,
                content TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_messages_timestamp ON messages(timestamp DESC)",
            [],
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            max_entries: 10000,
        })
    }

    /// Set maximum number of entries to keep.
    pub fn with_max_entries(mut self, max: u32) -> Self {
        self.max_entries = max.max(1);
        self
    }

    /// Record a message received from `peer`.
    pub fn add_incoming(&self, peer: &str, text: &str) -> Result<()> {
        self.add_entry(Direction::Incoming, peer, text)
    }

    /// Record a message sent to `peer`.
    pub fn add_outgoing(&self, peer: &str, text: &str) -> Result<()> {
        self.add_entry(Direction::Outgoing, peer, text)
    }

    pub fn add_entry(&self, direction: Direction, peer: &str, content: &str) -> Result<()> {
        let conn = self.conn.lock();
        let timestamp = Local::now().timestamp();

        conn.execute(
            "INSERT INTO messages (timestamp, direction, peer, content) VALUES (?1, ?2, ?3, ?4)",
            params![timestamp, direction.as_str(), peer, content],
        )?;

        self.cleanup_old_entries(&conn)?;

        Ok(())
    }

    /// Get recent history entries, newest first.
    pub fn get_recent(&self, limit: u32) -> Result<Vec<HistoryEntry>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "{} ORDER BY timestamp DESC, id DESC LIMIT ?1",
            SELECT_COLUMNS
        ))?;

        let entries = stmt
            .query_map([limit], Self::entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    /// Search history by content, newest first.
    pub fn search(&self, query: &str, limit: u32) -> Result<Vec<HistoryEntry>> {
        let conn = self.conn.lock();
        let pattern = format!("%{}%", query);
        let mut stmt = conn.prepare(&format!(
            "{} WHERE content LIKE ?1 ORDER BY timestamp DESC, id DESC LIMIT ?2",
            SELECT_COLUMNS
        ))?;

        let entries = stmt
            .query_map(params![pattern, limit], Self::entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    /// Export history to a text file, oldest first.
    pub fn export(&self, path: &Path) -> Result<usize> {
        let entries = self.get_recent(self.max_entries)?;
        let mut content = String::new();

        for entry in entries.iter().rev() {
            content.push_str(&format_entry(entry));
            content.push('\n');
        }

        std::fs::write(path, content)?;
        info!("Exported {} entries to {:?}", entries.len(), path);
        Ok(entries.len())
    }

    /// Clear all history.
    pub fn clear(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM messages", [])?;
        info!("History cleared");
        Ok(())
    }

    /// Get total entry count.
    pub fn count(&self) -> Result<u32> {
        let conn = self.conn.lock();
        let count: u32 = conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))?;
        Ok(count)
    }

    fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<HistoryEntry> {
        let timestamp_secs: i64 = row.get(1)?;
        let direction: String = row.get(2)?;

        Ok(HistoryEntry {
            id: row.get(0)?,
            timestamp: Local
                .timestamp_opt(timestamp_secs, 0)
                .single()
                .unwrap_or_else(Local::now),
            direction: Direction::parse(&direction),
            peer: row.get(3)?,
            content: row.get(4)?,
        })
    }

    /// Remove old entries beyond max_entries.
    fn cleanup_old_entries(&self, conn: &Connection) -> Result<()> {
        conn.execute(
            "DELETE FROM messages WHERE id NOT IN (
                SELECT id FROM messages ORDER BY timestamp DESC, id DESC LIMIT ?1
            )",
            [self.max_entries],
        )?;
        Ok(())
    }
}

/// One-line rendering used by the console and exports.
pub fn format_entry(entry: &HistoryEntry) -> String {
    let arrow = match entry.direction {
        Direction::Incoming => "<-",
        Direction::Outgoing => "->",
    };
    format!(
        "[{}] {} {}: {}",
        entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
        arrow,
        entry.peer,
        entry.content
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_history_basic() {
        let dir = tempdir().unwrap();
        let history = History::new(dir.path()).unwrap();

        history.add_incoming("Pixel", "Hello").unwrap();
        history.add_outgoing("Pixel", "Hi back").unwrap();

        let entries = history.get_recent(10).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].content, "Hi back");
        assert_eq!(entries[0].direction, Direction::Outgoing);
        assert_eq!(entries[1].content, "Hello");
        assert_eq!(entries[1].direction, Direction::Incoming);
        assert_eq!(entries[1].peer, "Pixel");
    }

    #[test]
    fn test_history_search() {
        let dir = tempdir().unwrap();
        let history = History::new(dir.path()).unwrap();

        history.add_incoming("a", "Hello world").unwrap();
        history.add_incoming("a", "Hello there").unwrap();
        history.add_outgoing("a", "Goodbye").unwrap();

        let results = history.search("Hello", 10).unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_history_keeps_max_entries() {
        let dir = tempdir().unwrap();
        let history = History::new(dir.path()).unwrap().with_max_entries(3);

        for i in 0..5 {
            history.add_incoming("a", &format!("msg {}", i)).unwrap();
        }

        assert_eq!(history.count().unwrap(), 3);
        let entries = history.get_recent(10).unwrap();
        assert_eq!(entries[0].content, "msg 4");
        assert_eq!(entries[2].content, "msg 2");
    }

    #[test]
    fn test_export_and_clear() {
        let dir = tempdir().unwrap();
        let history = History::new(dir.path()).unwrap();

        history.add_incoming("Pixel", "first").unwrap();
        history.add_outgoing("Pixel", "second").unwrap();

        let path = dir.path().join("export.txt");
        assert_eq!(history.export(&path).unwrap(), 2);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("<- Pixel: first"));
        assert!(lines[1].ends_with("-> Pixel: second"));

        history.clear().unwrap();
        assert_eq!(history.count().unwrap(), 0);
    }
}
