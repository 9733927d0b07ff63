//! Database schema and migrations.

use anyhow::Result;
use rusqlite::Connection;

/// Run all pending migrations.
pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS detections (
            id TEXT PRIMARY KEY,
            prediction TEXT NOT NULL,
            confidence REAL NOT NULL,
            user_id TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_detections_created ON detections(created_at);
        CREATE INDEX IF NOT EXISTS idx_detections_user ON detections(user_id);",
    )?;

    // Migration: record the class id and full distribution alongside the label
    let has_class_id: i32 = conn.query_row(
        "SELECT count(*) FROM pragma_table_info('detections') WHERE name='class_id'",
        [],
        |row| row.get(0),
    )?;

    if has_class_id == 0 {
        conn.execute_batch(
            "ALTER TABLE detections ADD COLUMN class_id INTEGER;
             ALTER TABLE detections ADD COLUMN probabilities_json TEXT NOT NULL DEFAULT '[]';",
        )?;
    }

    Ok(())
}
