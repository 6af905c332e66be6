use anyhow::Context;
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use std::path::Path;

use crate::wizard::KeyValueStore;

pub const DB_FILE: &str = "prequal.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace).with_context(|| {
        format!(
            "failed to create workspace {}",
            workspace.to_string_lossy()
        )
    })?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}

fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;

    // Wizard snapshot: one row per key, written independently.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS local_store(
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS submissions(
            id TEXT PRIMARY KEY,
            email_sha256 TEXT NOT NULL,
            payload_json TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_submissions_created ON submissions(created_at)",
        [],
    )?;
    Ok(())
}

pub fn settings_get_json(
    conn: &Connection,
    key: &str,
) -> anyhow::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value_json FROM settings WHERE key = ?",
            [key],
            |r| r.get(0),
        )
        .optional()?;
    match raw {
        Some(s) => Ok(Some(
            serde_json::from_str(&s).with_context(|| format!("corrupt setting {}", key))?,
        )),
        None => Ok(None),
    }
}

pub fn settings_set_json(
    conn: &Connection,
    key: &str,
    value: &serde_json::Value,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        (key, value.to_string()),
    )?;
    Ok(())
}

impl KeyValueStore for Connection {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self
            .query_row("SELECT value FROM local_store WHERE key = ?", [key], |r| {
                r.get(0)
            })
            .optional()?)
    }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.execute(
            "INSERT INTO local_store(key, value) VALUES(?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            (key, value),
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> anyhow::Result<()> {
        self.execute("DELETE FROM local_store WHERE key = ?", [key])?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRow {
    pub id: String,
    pub email_sha256: String,
    pub payload: serde_json::Value,
    pub created_at: String,
}

pub fn insert_submission(conn: &Connection, row: &SubmissionRow) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO submissions(id, email_sha256, payload_json, created_at) VALUES(?, ?, ?, ?)",
        (
            &row.id,
            &row.email_sha256,
            row.payload.to_string(),
            &row.created_at,
        ),
    )
    .context("failed to record submission")?;
    Ok(())
}

pub fn list_submissions(conn: &Connection, limit: i64) -> anyhow::Result<Vec<SubmissionRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, email_sha256, payload_json, created_at
         FROM submissions
         ORDER BY created_at DESC, id
         LIMIT ?",
    )?;
    let rows = stmt
        .query_map([limit], |row| {
            let payload_raw: String = row.get(2)?;
            Ok(SubmissionRow {
                id: row.get(0)?,
                email_sha256: row.get(1)?,
                payload: serde_json::from_str(&payload_raw).unwrap_or(serde_json::Value::Null),
                created_at: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
