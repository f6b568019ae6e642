//! Schema creation and versioned upgrades for [`SqliteStore`][super::SqliteStore].
//!
//! The schema version lives in the `acmedns` table as the `db_version` row. Upgrades run in
//! order from the stored version, each inside its own transaction together with the version
//! bump, so a failed step leaves the store at the previous version and is retried on the next
//! start. Every step is safe to run against a store that already has its effect.

use crate::error::Error;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

type Upgrade = fn(&Connection) -> Result<(), Error>;

// UPGRADES[n] takes the schema from version n to n + 1.
const UPGRADES: [Upgrade; 2] = [upgrade_to_1, upgrade_to_2];

/// The schema version this build reads and writes.
#[allow(clippy::cast_possible_wrap)]
pub const SCHEMA_VERSION: i64 = UPGRADES.len() as i64;

const CREATE_TABLES: &str = "
    CREATE TABLE IF NOT EXISTS acmedns(
        Name TEXT,
        Value TEXT
    );
    CREATE TABLE IF NOT EXISTS records(
        Username TEXT UNIQUE NOT NULL PRIMARY KEY,
        Password TEXT UNIQUE NOT NULL,
        Subdomain TEXT UNIQUE NOT NULL,
        AllowFrom TEXT
    );
    CREATE TABLE IF NOT EXISTS txt(
        Subdomain TEXT NOT NULL,
        Value TEXT NOT NULL DEFAULT '',
        LastUpdate INT
    );";

/// Bring the store at `conn` up to [`SCHEMA_VERSION`], creating it if empty.
///
/// # Errors
///
/// Returns [`Error::UnsupportedSchema`] for stores written by a newer build,
/// [`Error::InvalidSchemaVersion`] for an unreadable version marker, and [`Error::Database`]
/// if an upgrade step fails.
pub(super) fn upgrade(conn: &mut Connection) -> Result<(), Error> {
    conn.execute_batch(CREATE_TABLES)?;

    let version = match stored_version(conn)? {
        Some(version) => version,
        None => {
            conn.execute(
                "INSERT INTO acmedns (Name, Value) VALUES ('db_version', '0')",
                [],
            )?;
            0
        }
    };
    if version > SCHEMA_VERSION {
        return Err(Error::UnsupportedSchema {
            found: version,
            supported: SCHEMA_VERSION,
        });
    }

    let start = usize::try_from(version)
        .map_err(|_| Error::InvalidSchemaVersion(version.to_string()))?;
    for (from, step) in UPGRADES.iter().enumerate().skip(start) {
        let tx = conn.transaction()?;
        step(&*tx)?;
        tx.execute(
            "UPDATE acmedns SET Value = ?1 WHERE Name = 'db_version'",
            params![(from + 1).to_string()],
        )?;
        tx.commit()?;
        info!("upgraded database schema from version {from} to {}", from + 1);
    }
    Ok(())
}

pub(super) fn stored_version(conn: &Connection) -> Result<Option<i64>, Error> {
    let value: Option<String> = conn
        .query_row(
            "SELECT Value FROM acmedns WHERE Name = 'db_version'",
            [],
            |row| row.get(0),
        )
        .optional()?;
    value
        .map(|v| v.trim().parse().map_err(|_| Error::InvalidSchemaVersion(v)))
        .transpose()
}

fn columns(conn: &Connection, table: &str) -> Result<Vec<String>, Error> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1)")?;
    let rows = stmt.query_map(params![table], |row| row.get(0))?;
    Ok(rows.collect::<Result<Vec<String>, _>>()?)
}

fn has_column(columns: &[String], name: &str) -> bool {
    columns.iter().any(|c| c.eq_ignore_ascii_case(name))
}

// Legacy stores kept a single value (and its update time) on the account row itself. Move any
// such value into the txt table and make sure the account row can carry an allow list.
fn upgrade_to_1(conn: &Connection) -> Result<(), Error> {
    let record_columns = columns(conn, "records")?;
    if !has_column(&record_columns, "AllowFrom") {
        conn.execute("ALTER TABLE records ADD COLUMN AllowFrom TEXT", [])?;
    }
    if has_column(&record_columns, "Value") {
        let last_update = if has_column(&record_columns, "LastActive") {
            "LastActive"
        } else {
            "0"
        };
        conn.execute("DELETE FROM txt WHERE Subdomain IN (SELECT Subdomain FROM records)", [])?;
        conn.execute(
            &format!(
                "INSERT INTO txt (Subdomain, Value, LastUpdate)
                 SELECT Subdomain, Value, {last_update} FROM records
                 WHERE Value IS NOT NULL AND Value != ''"
            ),
            [],
        )?;
    }
    Ok(())
}

// Version 1 pre-allocated two empty rows per subdomain and overwrote the oldest on update. Values
// are now appended, so the placeholders go.
fn upgrade_to_2(conn: &Connection) -> Result<(), Error> {
    conn.execute("DELETE FROM txt WHERE Value = ''", [])?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS txt_subdomain_idx ON txt(Subdomain, LastUpdate)",
        [],
    )?;
    Ok(())
}
