use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::Type;
use rusqlite::Connection;

use crate::error::Result;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS categories (
    id          INTEGER PRIMARY KEY,
    owner_id    INTEGER NOT NULL,
    name        TEXT NOT NULL CHECK(length(name) > 0),
    description TEXT,
    color       TEXT NOT NULL DEFAULT '#3B82F6',
    created_at  TEXT NOT NULL DEFAULT ((strftime('%Y-%m-%dT%H:%M:%f', 'now') || '000Z')),
    updated_at  TEXT NOT NULL DEFAULT ((strftime('%Y-%m-%dT%H:%M:%f', 'now') || '000Z')),
    UNIQUE (owner_id, name)
);

CREATE TABLE IF NOT EXISTS tasks (
    id          INTEGER PRIMARY KEY,
    owner_id    INTEGER NOT NULL,
    title       TEXT NOT NULL CHECK(length(title) > 0),
    description TEXT,
    completed   INTEGER NOT NULL DEFAULT 0 CHECK(completed IN (0, 1)),
    priority    INTEGER NOT NULL DEFAULT 5 CHECK(priority BETWEEN 1 AND 10),
    due_date    TEXT,
    order_index REAL NOT NULL DEFAULT 0.0,
    category_id INTEGER REFERENCES categories(id) ON DELETE SET NULL,
    created_at  TEXT NOT NULL DEFAULT ((strftime('%Y-%m-%dT%H:%M:%f', 'now') || '000Z')),
    updated_at  TEXT NOT NULL DEFAULT ((strftime('%Y-%m-%dT%H:%M:%f', 'now') || '000Z')),
    UNIQUE (owner_id, title)
);

CREATE INDEX IF NOT EXISTS tasks_owner_order ON tasks(owner_id, order_index, id);
CREATE INDEX IF NOT EXISTS tasks_owner_due ON tasks(owner_id, due_date);
CREATE INDEX IF NOT EXISTS tasks_owner_priority ON tasks(owner_id, priority);
";

/// Text layout for every stored timestamp. Fixed width, UTC and microsecond
/// precision, so string comparison in SQL agrees with chronological order.
/// SQL-side defaults pad SQLite's millisecond `%f` to the same width.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

pub fn timestamp(t: &DateTime<Utc>) -> String {
    t.format(TIMESTAMP_FORMAT).to_string()
}

pub(crate) fn parse_timestamp(column: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;",
    )?;
    // SQLite's lower() only folds ASCII; search needs full Unicode folding.
    conn.create_scalar_function(
        "casefold",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|t| t.to_lowercase()))
        },
    )?;
    Ok(())
}

pub fn open(path: &str) -> Result<Connection> {
    let conn = Connection::open(path)?;
    configure(&conn)?;
    Ok(conn)
}

pub fn init(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Run `body` inside a named SAVEPOINT. Everything it wrote is rolled back if
/// it returns an error. Savepoints nest, so this works both standalone and
/// inside an outer transaction.
pub fn with_savepoint<T>(
    conn: &Connection,
    name: &str,
    body: impl FnOnce() -> Result<T>,
) -> Result<T> {
    conn.execute_batch(&format!("SAVEPOINT {name}"))?;
    match body() {
        Ok(v) => {
            conn.execute_batch(&format!("RELEASE {name}"))?;
            Ok(v)
        }
        Err(e) => {
            log::debug!("rolling back savepoint {name}: {e}");
            let _ = conn.execute_batch(&format!("ROLLBACK TO {name}"));
            let _ = conn.execute_batch(&format!("RELEASE {name}"));
            Err(e)
        }
    }
}

#[cfg(test)]
pub fn open_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure(&conn)?;
    init(&conn)?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use chrono::TimeZone;

    #[test]
    fn timestamp_uses_fixed_utc_layout() {
        let t = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 0).unwrap();
        assert_eq!(timestamp(&t), "2024-03-09T07:05:00.000000Z");
        assert_eq!(parse_timestamp(0, "2024-03-09T07:05:00.000000Z").unwrap(), t);
    }

    #[test]
    fn timestamp_keeps_sub_second_precision() {
        let t = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 0).unwrap()
            + chrono::Duration::microseconds(100_250);
        assert_eq!(timestamp(&t), "2024-03-09T07:05:00.100250Z");
        assert_eq!(parse_timestamp(0, &timestamp(&t)).unwrap(), t);
        let later = t + chrono::Duration::milliseconds(500);
        assert!(timestamp(&t) < timestamp(&later));
    }

    #[test]
    fn storage_defaults_use_the_same_layout() {
        let conn = open_memory().unwrap();
        conn.execute("INSERT INTO tasks (owner_id, title) VALUES (1, 't')", [])
            .unwrap();
        let raw: String = conn
            .query_row("SELECT created_at FROM tasks", [], |row| row.get(0))
            .unwrap();
        assert_eq!(raw.len(), "2024-03-09T07:05:00.000000Z".len());
        assert!(parse_timestamp(0, &raw).is_ok());
    }

    #[test]
    fn parse_timestamp_rejects_other_layouts() {
        assert!(parse_timestamp(0, "2024-03-09 07:05:00").is_err());
        assert!(parse_timestamp(0, "2024-03-09T07:05:00Z").is_err());
    }

    #[test]
    fn casefold_lowercases_unicode() {
        let conn = open_memory().unwrap();
        let folded: String = conn
            .query_row("SELECT casefold('ÉCOLE Milk')", [], |row| row.get(0))
            .unwrap();
        assert_eq!(folded, "école milk");
        let null: Option<String> = conn
            .query_row("SELECT casefold(NULL)", [], |row| row.get(0))
            .unwrap();
        assert!(null.is_none());
    }

    #[test]
    fn init_is_idempotent() {
        let conn = open_memory().unwrap();
        init(&conn).unwrap();
        init(&conn).unwrap();
    }

    #[test]
    fn savepoint_rolls_back_on_error() {
        let conn = open_memory().unwrap();
        let result: Result<()> = with_savepoint(&conn, "t", || {
            conn.execute(
                "INSERT INTO tasks (owner_id, title) VALUES (1, 'kept?')",
                [],
            )?;
            Err(Error::EmptyBatch)
        });
        assert!(matches!(result, Err(Error::EmptyBatch)));
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn savepoint_commits_on_success() {
        let conn = open_memory().unwrap();
        with_savepoint(&conn, "t", || {
            conn.execute("INSERT INTO tasks (owner_id, title) VALUES (1, 'kept')", [])?;
            Ok(())
        })
        .unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
