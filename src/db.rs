use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteKind {
    Show,
    Episode,
}

impl FavoriteKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Show => "show",
            Self::Episode => "episode",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FavoriteRow {
    pub item_id: String,
    pub is_favorite: bool,
    pub date_added: String,
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {}", path.display()))?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS favorites (
                kind TEXT NOT NULL,
                item_id TEXT NOT NULL,
                is_favorite INTEGER NOT NULL,
                date_added TEXT NOT NULL,
                position INTEGER NOT NULL,
                PRIMARY KEY (kind, item_id)
            );
            CREATE INDEX IF NOT EXISTS idx_favorites_position ON favorites(kind, position);
            CREATE TABLE IF NOT EXISTS session_state (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    /// Rows for one ledger in first-toggle order.
    pub fn list_favorites(&self, kind: FavoriteKind) -> Result<Vec<FavoriteRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT item_id, is_favorite, date_added FROM favorites WHERE kind = ?1 ORDER BY position ASC",
        )?;
        let rows = stmt.query_map(params![kind.as_str()], |row| {
            Ok(FavoriteRow {
                item_id: row.get(0)?,
                is_favorite: row.get::<_, i64>(1)? != 0,
                date_added: row.get(2)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Inserts or updates one ledger row. `position` is only used on insert so
    /// a re-toggle keeps the entry's original place.
    pub fn upsert_favorite(
        &self,
        kind: FavoriteKind,
        row: &FavoriteRow,
        position: usize,
    ) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO favorites (kind, item_id, is_favorite, date_added, position)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(kind, item_id) DO UPDATE SET
                is_favorite = excluded.is_favorite,
                date_added = excluded.date_added
            "#,
            params![
                kind.as_str(),
                row.item_id,
                row.is_favorite as i64,
                row.date_added,
                position as i64
            ],
        )?;
        Ok(())
    }

    pub fn read_state(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM session_state WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn write_state(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO session_state (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
            params![key, value],
        )?;
        Ok(())
    }
}
