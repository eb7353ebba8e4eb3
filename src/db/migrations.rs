use anyhow::Context;
use rusqlite::Connection;

// Migrations are embedded so that in-memory databases (tests, ephemeral dev
// runs) get the full schema without a migrations directory on disk.
const MIGRATIONS: &[(&str, &str)] = &[
    (
        "001_practices",
        "CREATE TABLE IF NOT EXISTS practices (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            phone_number TEXT,
            hours_json TEXT NOT NULL DEFAULT '{}',
            insurances_json TEXT NOT NULL DEFAULT '[]',
            faq_json TEXT NOT NULL DEFAULT '{}',
            services_json TEXT NOT NULL DEFAULT '[]',
            location_json TEXT NOT NULL DEFAULT '{}',
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_practices_phone ON practices(phone_number);",
    ),
    (
        "002_calls",
        "CREATE TABLE IF NOT EXISTS calls (
            id TEXT PRIMARY KEY,
            practice_id TEXT,
            caller_number TEXT,
            status TEXT NOT NULL,
            transcript TEXT NOT NULL DEFAULT '',
            intent TEXT NOT NULL,
            intent_confidence REAL NOT NULL DEFAULT 0.0,
            faq_matched TEXT,
            response_text TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_calls_practice ON calls(practice_id);",
    ),
    (
        "003_appointments",
        "CREATE TABLE IF NOT EXISTS appointments (
            id TEXT PRIMARY KEY,
            practice_id TEXT NOT NULL,
            caller_phone TEXT NOT NULL,
            caller_name TEXT,
            service TEXT,
            date_time TEXT NOT NULL,
            duration_minutes INTEGER NOT NULL DEFAULT 60,
            status TEXT NOT NULL,
            calendar_event_id TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_appointments_phone ON appointments(caller_phone);",
    ),
    (
        "004_booking_sessions",
        "CREATE TABLE IF NOT EXISTS booking_sessions (
            call_id TEXT PRIMARY KEY,
            practice_id TEXT,
            step TEXT NOT NULL,
            data TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );",
    ),
];

pub fn run_migrations(conn: &Connection) -> anyhow::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            name TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )
    .context("failed to create migrations table")?;

    for (name, sql) in MIGRATIONS {
        let already_applied: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM _migrations WHERE name = ?1",
                [name],
                |row| row.get(0),
            )
            .context("failed to check migration status")?;

        if already_applied {
            continue;
        }

        conn.execute_batch(sql)
            .with_context(|| format!("failed to apply migration: {name}"))?;

        conn.execute("INSERT INTO _migrations (name) VALUES (?1)", [name])
            .with_context(|| format!("failed to record migration: {name}"))?;

        tracing::info!("applied migration: {name}");
    }

    Ok(())
}
