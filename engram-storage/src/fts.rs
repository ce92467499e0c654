//! Read-only full-text search over an externally owned messages table.
//!
//! The caller owns a table `(id INTEGER PK, role TEXT, content TEXT,
//! created_at TEXT)` and a contentless FTS5 table named `<table>_fts`
//! indexing `content` with `content_rowid = id`. The adapter only ever
//! reads.

use rusqlite::{params, Connection};

use engram_core::errors::{EngramError, EngramResult};

use crate::to_storage_err;

/// One matching conversation message.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ConversationHit {
    pub role: String,
    pub content: String,
    pub created_at: String,
}

/// Outcome of a conversation search. Missing-FTS and malformed-query
/// conditions are structured results; real storage failures propagate
/// as errors.
#[derive(Debug)]
pub enum ConversationSearchOutcome {
    Rows(Vec<ConversationHit>),
    FtsUnavailable { message: String },
    QueryError { message: String },
}

/// Adapter over the caller-owned messages table. The table name is
/// interpolated into SQL, so it is validated once at construction.
pub struct ConversationSearch {
    table: String,
}

impl ConversationSearch {
    /// Validate the table name (`^[A-Za-z_]\w*$`) and build the adapter.
    pub fn new(table: &str) -> EngramResult<Self> {
        if !is_safe_identifier(table) {
            return Err(EngramError::UnsafeIdentifier {
                name: table.to_string(),
            });
        }
        Ok(Self {
            table: table.to_string(),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Run an FTS5 MATCH query, best matches first.
    pub fn search(
        &self,
        conn: &Connection,
        query: &str,
        limit: i64,
    ) -> EngramResult<ConversationSearchOutcome> {
        let sql = format!(
            "SELECT m.role, m.content, m.created_at
             FROM {table}_fts f
             JOIN {table} m ON m.id = f.rowid
             WHERE {table}_fts MATCH ?1
             ORDER BY rank
             LIMIT ?2",
            table = self.table
        );

        let mut stmt = match conn.prepare(&sql) {
            Ok(stmt) => stmt,
            Err(e) => return classify_fts_error(e),
        };
        let rows = match stmt.query_map(params![query, limit], |row| {
            Ok(ConversationHit {
                role: row.get(0)?,
                content: row.get(1)?,
                created_at: row.get(2)?,
            })
        }) {
            Ok(rows) => rows,
            Err(e) => return classify_fts_error(e),
        };

        let mut hits = Vec::new();
        for row in rows {
            match row {
                Ok(hit) => hits.push(hit),
                Err(e) => return classify_fts_error(e),
            }
        }
        Ok(ConversationSearchOutcome::Rows(hits))
    }
}

/// Missing table or missing FTS5 module means the deployment simply has
/// no conversation index; a syntax-level failure is a bad query. I/O,
/// corruption, and OOM stay fatal.
fn classify_fts_error(e: rusqlite::Error) -> EngramResult<ConversationSearchOutcome> {
    let message = e.to_string();
    if message.contains("no such table") || message.contains("no such module") {
        return Ok(ConversationSearchOutcome::FtsUnavailable { message });
    }
    match e.sqlite_error_code() {
        Some(
            rusqlite::ErrorCode::DiskFull
            | rusqlite::ErrorCode::SystemIoFailure
            | rusqlite::ErrorCode::DatabaseCorrupt
            | rusqlite::ErrorCode::OutOfMemory
            | rusqlite::ErrorCode::CannotOpen
            | rusqlite::ErrorCode::NotADatabase,
        )
        | None => Err(to_storage_err(e)),
        // Anything else raised by this statement (generic SQLITE_ERROR,
        // FTS5 syntax errors, type mismatches) is a bad query.
        Some(_) => Ok(ConversationSearchOutcome::QueryError { message }),
    }
}

fn is_safe_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_validation() {
        assert!(ConversationSearch::new("messages").is_ok());
        assert!(ConversationSearch::new("_msgs2").is_ok());
        for bad in ["", "1messages", "messages; DROP TABLE chunks", "msgs-x", "m s"] {
            assert!(
                matches!(
                    ConversationSearch::new(bad),
                    Err(EngramError::UnsafeIdentifier { .. })
                ),
                "accepted unsafe identifier {bad:?}"
            );
        }
    }

    #[test]
    fn missing_table_is_unavailable() {
        let conn = Connection::open_in_memory().unwrap();
        let adapter = ConversationSearch::new("messages").unwrap();
        match adapter.search(&conn, "heron", 10).unwrap() {
            ConversationSearchOutcome::FtsUnavailable { .. } => {}
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn match_query_over_real_fts() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "
            CREATE TABLE messages (
                id INTEGER PRIMARY KEY,
                role TEXT,
                content TEXT,
                created_at TEXT
            );
            CREATE VIRTUAL TABLE messages_fts USING fts5(content, content_rowid = 'id');
            INSERT INTO messages VALUES
                (1, 'user', 'the heron stands in the reeds', '2024-05-01T10:00:00Z'),
                (2, 'assistant', 'herons hunt at dawn', '2024-05-01T10:00:05Z'),
                (3, 'user', 'unrelated message about parsers', '2024-05-01T10:01:00Z');
            INSERT INTO messages_fts (rowid, content)
                SELECT id, content FROM messages;
            ",
        )
        .unwrap();

        let adapter = ConversationSearch::new("messages").unwrap();
        match adapter.search(&conn, "heron", 10).unwrap() {
            ConversationSearchOutcome::Rows(hits) => {
                assert_eq!(hits.len(), 1);
                assert_eq!(hits[0].role, "user");
                assert!(hits[0].content.contains("heron"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn malformed_match_is_query_error() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "
            CREATE TABLE messages (id INTEGER PRIMARY KEY, role TEXT, content TEXT, created_at TEXT);
            CREATE VIRTUAL TABLE messages_fts USING fts5(content, content_rowid = 'id');
            ",
        )
        .unwrap();
        let adapter = ConversationSearch::new("messages").unwrap();
        match adapter.search(&conn, "\"unbalanced", 10).unwrap() {
            ConversationSearchOutcome::QueryError { .. } => {}
            other => panic!("unexpected: {other:?}"),
        }
    }
}
