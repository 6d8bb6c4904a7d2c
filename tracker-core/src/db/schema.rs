use std::collections::HashSet;

use anyhow::{Context, Result};
use rusqlite::Connection;

struct Migration {
    version: &'static str,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "001",
        name: "initial",
        sql: include_str!("migrations/001_initial.sql"),
    },
    Migration {
        version: "002",
        name: "access_tokens",
        sql: include_str!("migrations/002_access_tokens.sql"),
    },
];

/// Bring the schema up to date.
///
/// Each pending migration runs in its own transaction together with its
/// `schema_migrations` row, so a failed migration leaves no trace.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
    )
    .context("Failed to create schema_migrations table")?;

    let applied = applied_versions(conn)?;
    let pending = MIGRATIONS
        .iter()
        .filter(|m| !applied.contains(m.version));

    for migration in pending {
        apply(conn, migration).with_context(|| {
            format!(
                "Failed to apply migration {} ({})",
                migration.version, migration.name
            )
        })?;
    }

    Ok(())
}

fn applied_versions(conn: &Connection) -> Result<HashSet<String>> {
    let mut stmt = conn.prepare("SELECT version FROM schema_migrations")?;
    let versions = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<HashSet<_>, _>>()?;
    Ok(versions)
}

fn apply(conn: &Connection, migration: &Migration) -> Result<()> {
    tracing::info!(version = migration.version, name = migration.name, "Applying migration");

    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(migration.sql)?;
    tx.execute(
        "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?, ?, ?)",
        (
            migration.version,
            migration.name,
            chrono::Utc::now().to_rfc3339(),
        ),
    )?;
    tx.commit()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_exists(conn: &Connection, name: &str) -> bool {
        let count: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?",
                [name],
                |row| row.get(0),
            )
            .unwrap();
        count == 1
    }

    fn versions(conn: &Connection) -> Vec<String> {
        let mut versions: Vec<String> = applied_versions(conn).unwrap().into_iter().collect();
        versions.sort();
        versions
    }

    #[test]
    fn test_migrations_run_on_fresh_db() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        for table in [
            "users",
            "fansub_sites",
            "mangas",
            "manga_chapters",
            "access_tokens",
        ] {
            assert!(table_exists(&conn, table), "missing table {}", table);
        }

        assert_eq!(versions(&conn), vec!["001", "002"]);
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        assert_eq!(versions(&conn), vec!["001", "002"]);
    }

    #[test]
    fn test_partially_migrated_db_catches_up() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE schema_migrations (
                version TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL
            )",
        )
        .unwrap();
        apply(&conn, &MIGRATIONS[0]).unwrap();
        assert!(!table_exists(&conn, "access_tokens"));

        run_migrations(&conn).unwrap();

        assert!(table_exists(&conn, "access_tokens"));
        assert_eq!(versions(&conn), vec!["001", "002"]);
    }

    #[test]
    fn test_failed_migration_leaves_no_trace() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let broken = Migration {
            version: "999",
            name: "broken",
            sql: "CREATE TABLE scratch (id INTEGER); NOT VALID SQL;",
        };
        assert!(apply(&conn, &broken).is_err());

        assert!(!table_exists(&conn, "scratch"));
        assert_eq!(versions(&conn), vec!["001", "002"]);
    }
}
