//! Database schema migrations.

use rusqlite::Connection;
use tracing::info;

use digest_core::error::DigestError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), DigestError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| DigestError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version = current_version(conn)?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: articles");
    }

    Ok(())
}

/// Highest applied migration version, 0 for a fresh database.
pub fn current_version(conn: &Connection) -> Result<i64, DigestError> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )
    .map_err(|e| DigestError::Storage(format!("Failed to query migration version: {}", e)))
}

/// Version 1: articles table with an external-content FTS5 index.
fn apply_v1(conn: &Connection) -> Result<(), DigestError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS articles (
            link            TEXT PRIMARY KEY NOT NULL,
            title           TEXT NOT NULL,
            body            TEXT NOT NULL DEFAULT '',
            category        TEXT NOT NULL DEFAULT 'uncategorized',
            source          TEXT NOT NULL DEFAULT '',
            description     TEXT,
            -- unix milliseconds
            published_at    INTEGER NOT NULL,
            embedding       BLOB,
            embedding_dim   INTEGER,
            created_at      INTEGER NOT NULL DEFAULT (strftime('%s', 'now') * 1000)
        );

        CREATE INDEX IF NOT EXISTS idx_articles_published
            ON articles (published_at DESC);

        CREATE INDEX IF NOT EXISTS idx_articles_category
            ON articles (category, published_at DESC);

        CREATE VIRTUAL TABLE IF NOT EXISTS articles_fts USING fts5(
            title,
            body,
            content='articles',
            content_rowid='rowid'
        );

        CREATE TRIGGER IF NOT EXISTS articles_ai AFTER INSERT ON articles BEGIN
            INSERT INTO articles_fts (rowid, title, body)
            VALUES (new.rowid, new.title, new.body);
        END;

        CREATE TRIGGER IF NOT EXISTS articles_ad AFTER DELETE ON articles BEGIN
            INSERT INTO articles_fts (articles_fts, rowid, title, body)
            VALUES ('delete', old.rowid, old.title, old.body);
        END;

        CREATE TRIGGER IF NOT EXISTS articles_au AFTER UPDATE OF title, body ON articles BEGIN
            INSERT INTO articles_fts (articles_fts, rowid, title, body)
            VALUES ('delete', old.rowid, old.title, old.body);
            INSERT INTO articles_fts (rowid, title, body)
            VALUES (new.rowid, new.title, new.body);
        END;

        INSERT OR IGNORE INTO schema_migrations (version, name) VALUES (1, 'articles');
        ",
    )
    .map_err(|e| DigestError::Storage(format!("Migration v1 failed: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_apply_once() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        assert_eq!(current_version(&conn).unwrap(), 1);
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_fts_tracks_inserts_and_deletes() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        conn.execute(
            "INSERT INTO articles (link, title, body, published_at) VALUES ('l1', 'Solar record', 'Panels everywhere', 0)",
            [],
        )
        .unwrap();
        let hits: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM articles_fts WHERE articles_fts MATCH 'solar'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(hits, 1);

        conn.execute("DELETE FROM articles", []).unwrap();
        let hits: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM articles_fts WHERE articles_fts MATCH 'solar'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(hits, 0);
    }
}
