mod schema;
mod store;

pub use store::CommentStore;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row};

use crate::models::*;

const COMMENT_COLUMNS: &str = "id, task_id, user_id, content, created_at";

/// SQLite-backed comment store.
///
/// A single connection is shared behind a mutex; clones share it.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        Self::open(default_path()?)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // Comment operations
    // ============================================================

    pub fn create_comment(&self, input: CreateCommentInput) -> Result<Comment> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();

        conn.execute(
            "INSERT INTO comments (task_id, user_id, content, created_at) VALUES (?, ?, ?, ?)",
            (&input.task_id, input.user_id, &input.content, now.to_rfc3339()),
        )?;

        Ok(Comment {
            id: conn.last_insert_rowid(),
            task_id: input.task_id,
            user_id: input.user_id,
            content: input.content,
            created_at: now,
        })
    }

    pub fn get_comments_by_task(&self, task_id: &str) -> Result<Vec<Comment>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE task_id = ? ORDER BY id"
        ))?;

        let comments = stmt
            .query_map([task_id], comment_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(comments)
    }

    pub fn get_comment(&self, id: i64) -> Result<Option<Comment>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let comment = conn
            .query_row(
                &format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?"),
                [id],
                comment_from_row,
            )
            .optional()?;
        Ok(comment)
    }

    /// Replace the content of a comment. Returns the refreshed row, or `None`
    /// when no comment has this id.
    pub fn update_comment_content(&self, id: i64, content: &str) -> Result<Option<Comment>> {
        {
            let conn = self.conn.lock().expect("database lock poisoned");
            let rows = conn.execute(
                "UPDATE comments SET content = ? WHERE id = ?",
                (content, id),
            )?;
            if rows == 0 {
                return Ok(None);
            }
        }

        self.get_comment(id)
    }

    pub fn delete_comment(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM comments WHERE id = ?", [id])?;
        Ok(rows > 0)
    }

    /// Delete every comment of a task and return how many rows went away.
    pub fn delete_comments_by_task(&self, task_id: &str) -> Result<usize> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM comments WHERE task_id = ?", [task_id])?;
        Ok(rows)
    }
}

/// Location of the database file when no explicit path is configured.
pub fn default_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "task-comments")
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
    Ok(dirs.data_dir().join("comments.db"))
}

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        task_id: row.get(1)?,
        user_id: row.get(2)?,
        content: row.get(3)?,
        created_at: parse_datetime(row.get::<_, String>(4)?),
    })
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
