//! Ordered schema migrations.
//!
//! Applied versions are recorded in `schema_migrations`; each migration runs
//! once, in its own transaction. Column additions also check the live table
//! first so databases created before the migration table existed, which may
//! already carry the column, upgrade cleanly.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use tracing::info;

use crate::error::{EngineError, EngineResult};

struct Migration {
    version: u32,
    name: &'static str,
    apply: fn(&Transaction<'_>) -> rusqlite::Result<()>,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "base schema",
        apply: base_schema,
    },
    Migration {
        version: 2,
        name: "appointment payment columns",
        apply: payment_columns,
    },
    Migration {
        version: 3,
        name: "appointment client reference",
        apply: client_reference,
    },
];

/// Applies every pending migration and returns how many ran.
pub fn run(conn: &mut Connection) -> EngineResult<usize> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
    )?;

    let mut applied = 0;
    for migration in MIGRATIONS {
        let done = conn
            .query_row(
                "SELECT 1 FROM schema_migrations WHERE version = ?1",
                [migration.version],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if done {
            continue;
        }

        let fail = |source| EngineError::Migration {
            version: migration.version,
            name: migration.name,
            source,
        };
        let tx = conn.transaction().map_err(fail)?;
        (migration.apply)(&tx).map_err(fail)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
            params![migration.version, migration.name, Utc::now()],
        )
        .map_err(fail)?;
        tx.commit().map_err(fail)?;

        info!(version = migration.version, name = migration.name, "applied migration");
        applied += 1;
    }
    Ok(applied)
}

/// Returns the highest applied version, 0 for a fresh database.
pub fn current_version(conn: &Connection) -> EngineResult<u32> {
    let version: Option<u32> = conn.query_row(
        "SELECT MAX(version) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;
    Ok(version.unwrap_or(0))
}

fn has_column(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let names = stmt.query_map([], |row| row.get::<_, String>(1))?;
    for name in names {
        if name? == column {
            return Ok(true);
        }
    }
    Ok(false)
}

fn add_column(tx: &Transaction<'_>, table: &str, column: &str, decl: &str) -> rusqlite::Result<()> {
    if !has_column(tx, table, column)? {
        tx.execute_batch(&format!("ALTER TABLE {table} ADD COLUMN {column} {decl}"))?;
    }
    Ok(())
}

fn base_schema(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS services (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            category TEXT NOT NULL,
            price TEXT NOT NULL,
            duration_minutes INTEGER NOT NULL,
            description TEXT,
            active INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS clients (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            phone TEXT,
            email TEXT
        );

        CREATE TABLE IF NOT EXISTS slots (
            id TEXT PRIMARY KEY,
            date TEXT NOT NULL,
            time TEXT NOT NULL,
            available INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS appointments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            slot_id TEXT NOT NULL REFERENCES slots(id),
            date TEXT NOT NULL,
            time TEXT NOT NULL,
            client_name TEXT NOT NULL,
            service_id INTEGER REFERENCES services(id),
            service TEXT,
            notes TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT 'confirmed',
            total_paid TEXT NOT NULL DEFAULT '0',
            created_at TEXT NOT NULL,
            completed_at TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_appointments_slot ON appointments(slot_id);

        CREATE TABLE IF NOT EXISTS appointment_services (
            appointment_id INTEGER NOT NULL REFERENCES appointments(id) ON DELETE CASCADE,
            service_id INTEGER NOT NULL REFERENCES services(id),
            PRIMARY KEY (appointment_id, service_id)
        );

        CREATE TABLE IF NOT EXISTS external_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            external_id TEXT NOT NULL UNIQUE,
            calendar_name TEXT,
            summary TEXT NOT NULL,
            description TEXT,
            date TEXT NOT NULL,
            start_time TEXT NOT NULL,
            end_time TEXT NOT NULL,
            location TEXT,
            attendees TEXT NOT NULL DEFAULT '[]',
            classification TEXT NOT NULL DEFAULT 'home',
            converted INTEGER NOT NULL DEFAULT 0,
            converted_appointment_id INTEGER REFERENCES appointments(id) ON DELETE SET NULL
        );

        CREATE TABLE IF NOT EXISTS sync_cursor (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            last_sync_at TEXT,
            access_token TEXT,
            refresh_token TEXT,
            token_expiry TEXT
        );
        INSERT OR IGNORE INTO sync_cursor (id) VALUES (1);",
    )
}

fn payment_columns(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    add_column(tx, "appointments", "payment_method", "TEXT")?;
    add_column(tx, "appointments", "cash_received", "TEXT")?;
    add_column(tx, "appointments", "change_returned", "TEXT")
}

fn client_reference(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    add_column(tx, "appointments", "client_id", "INTEGER REFERENCES clients(id)")
}
