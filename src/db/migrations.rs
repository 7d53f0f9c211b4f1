//! Ordered, idempotent schema migrations.
//!
//! Migrations are plain `.sql` files named with a numeric prefix
//! (`001_initial.sql`, `002_indexes.sql`, ...). Applied versions are recorded
//! in `_migrations`; each unapplied file runs together with its tracking
//! insert inside one transaction, so a failing file leaves no trace.

use std::borrow::Cow;
use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result, bail};
use rusqlite::{Connection, params};

const TRACKING_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS _migrations (
        version INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        applied_at TEXT NOT NULL
    );
";

#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i64,
    pub name: String,
    pub sql: Cow<'static, str>,
}

impl Migration {
    /// Build a migration from a file stem such as `003_add_events`.
    /// Returns `None` when the stem has no numeric prefix.
    pub fn from_stem(stem: &str, sql: impl Into<Cow<'static, str>>) -> Option<Self> {
        let digits: String = stem.chars().take_while(|c| c.is_ascii_digit()).collect();
        let version = digits.parse::<i64>().ok()?;
        let name = stem[digits.len()..]
            .trim_start_matches(['_', '-'])
            .to_string();
        Some(Self {
            version,
            name,
            sql: sql.into(),
        })
    }
}

/// The crate's own schema, compiled in.
pub fn embedded() -> Vec<Migration> {
    [
        ("001_initial", include_str!("../../migrations/001_initial.sql")),
        ("002_indexes", include_str!("../../migrations/002_indexes.sql")),
    ]
    .into_iter()
    .filter_map(|(stem, sql)| Migration::from_stem(stem, sql))
    .collect()
}

/// Scan `dir` for numerically prefixed `.sql` files, sorted by version.
pub fn load_dir(dir: &Path) -> Result<Vec<Migration>> {
    let pattern = dir.join("*.sql");
    let pattern = pattern
        .to_str()
        .context("Migrations directory path contains invalid UTF-8")?;

    let mut migrations = Vec::new();
    for entry in glob::glob(pattern).context("Invalid migrations glob pattern")? {
        let path = entry.context("Failed to read migrations directory entry")?;
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let sql = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read migration {}", path.display()))?;
        match Migration::from_stem(stem, sql) {
            Some(m) => migrations.push(m),
            None => {
                tracing::warn!(file = %path.display(), "skipping migration without numeric prefix");
            }
        }
    }

    migrations.sort_by_key(|m| m.version);
    for pair in migrations.windows(2) {
        if pair[0].version == pair[1].version {
            bail!(
                "Duplicate migration version {} ({} and {})",
                pair[0].version,
                pair[0].name,
                pair[1].name
            );
        }
    }
    Ok(migrations)
}

/// Versions already recorded in `_migrations`.
pub fn applied_versions(conn: &Connection) -> Result<HashSet<i64>> {
    conn.execute_batch(TRACKING_TABLE)
        .context("Failed to create _migrations table")?;
    let mut stmt = conn
        .prepare("SELECT version FROM _migrations")
        .context("Failed to prepare applied_versions")?;
    let rows = stmt
        .query_map([], |row| row.get::<_, i64>(0))
        .context("Failed to query _migrations")?;
    let mut versions = HashSet::new();
    for row in rows {
        versions.insert(row.context("Failed to read _migrations row")?);
    }
    Ok(versions)
}

/// Apply every migration not yet recorded, in version order.
/// Returns the versions applied by this call.
pub fn apply(conn: &Connection, migrations: &[Migration]) -> Result<Vec<i64>> {
    let applied = applied_versions(conn)?;

    let mut pending: Vec<&Migration> = migrations
        .iter()
        .filter(|m| !applied.contains(&m.version))
        .collect();
    pending.sort_by_key(|m| m.version);

    let mut newly_applied = Vec::new();
    for migration in pending {
        let tx = conn
            .unchecked_transaction()
            .context("Failed to begin migration transaction")?;
        tx.execute_batch(&migration.sql).with_context(|| {
            format!(
                "Migration {} ({}) failed",
                migration.version, migration.name
            )
        })?;
        tx.execute(
            "INSERT INTO _migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
            params![migration.version, migration.name, super::now()],
        )
        .context("Failed to record migration")?;
        tx.commit().context("Failed to commit migration")?;

        tracing::debug!(version = migration.version, name = %migration.name, "applied migration");
        newly_applied.push(migration.version);
    }
    Ok(newly_applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn table_exists(conn: &Connection, name: &str) -> bool {
        conn.query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![name],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn test_from_stem_parses_version_and_name() {
        let m = Migration::from_stem("012_add_events", "SELECT 1;").unwrap();
        assert_eq!(m.version, 12);
        assert_eq!(m.name, "add_events");
        assert!(Migration::from_stem("initial", "SELECT 1;").is_none());
    }

    #[test]
    fn test_embedded_migrations_are_ordered() {
        let versions: Vec<i64> = embedded().iter().map(|m| m.version).collect();
        assert_eq!(versions, vec![1, 2]);
    }

    #[test]
    fn test_apply_is_idempotent() -> Result<()> {
        let conn = Connection::open_in_memory()?;
        let first = apply(&conn, &embedded())?;
        assert_eq!(first, vec![1, 2]);
        assert!(table_exists(&conn, "projects"));
        assert!(table_exists(&conn, "events"));

        let second = apply(&conn, &embedded())?;
        assert!(second.is_empty());

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM _migrations", [], |r| r.get(0))?;
        assert_eq!(count, 2);
        Ok(())
    }

    #[test]
    fn test_load_dir_sorts_numerically_and_skips_unprefixed() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("010_late.sql"), "CREATE TABLE late (id INTEGER);")?;
        fs::write(dir.path().join("2_early.sql"), "CREATE TABLE early (id INTEGER);")?;
        fs::write(dir.path().join("README.sql"), "-- not a migration")?;
        fs::write(dir.path().join("notes.txt"), "ignored")?;

        let migrations = load_dir(dir.path())?;
        let versions: Vec<i64> = migrations.iter().map(|m| m.version).collect();
        assert_eq!(versions, vec![2, 10]);
        assert_eq!(migrations[0].name, "early");
        Ok(())
    }

    #[test]
    fn test_load_dir_rejects_duplicate_versions() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("001_a.sql"), "SELECT 1;")?;
        fs::write(dir.path().join("01_b.sql"), "SELECT 1;")?;

        let err = load_dir(dir.path()).unwrap_err();
        assert!(err.to_string().contains("Duplicate migration version 1"));
        Ok(())
    }

    #[test]
    fn test_failing_migration_rolls_back_and_stops() -> Result<()> {
        let conn = Connection::open_in_memory()?;
        let migrations = vec![
            Migration::from_stem("001_ok", "CREATE TABLE ok_table (id INTEGER);").unwrap(),
            Migration::from_stem(
                "002_broken",
                "CREATE TABLE half_done (id INTEGER); INSERT INTO missing_table VALUES (1);",
            )
            .unwrap(),
            Migration::from_stem("003_never", "CREATE TABLE never (id INTEGER);").unwrap(),
        ];

        let err = apply(&conn, &migrations).unwrap_err();
        assert!(format!("{:#}", err).contains("Migration 2 (broken) failed"));

        assert!(table_exists(&conn, "ok_table"));
        assert!(!table_exists(&conn, "half_done"));
        assert!(!table_exists(&conn, "never"));
        assert_eq!(applied_versions(&conn)?, HashSet::from([1]));
        Ok(())
    }

    #[test]
    fn test_apply_picks_up_new_files_on_rerun() -> Result<()> {
        let dir = tempdir()?;
        let conn = Connection::open_in_memory()?;
        fs::write(dir.path().join("001_one.sql"), "CREATE TABLE one (id INTEGER);")?;
        assert_eq!(apply(&conn, &load_dir(dir.path())?)?, vec![1]);

        fs::write(dir.path().join("002_two.sql"), "CREATE TABLE two (id INTEGER);")?;
        assert_eq!(apply(&conn, &load_dir(dir.path())?)?, vec![2]);
        assert!(table_exists(&conn, "two"));
        Ok(())
    }
}
