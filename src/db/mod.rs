pub mod migrations;
pub mod queries;

use anyhow::Context;
use rusqlite::Connection;

/// Opens the local storage database (the on-disk analogue of browser
/// localStorage) and brings its schema up to date.
pub fn init_db(path: &str) -> anyhow::Result<Connection> {
    let conn = Connection::open(path).context("failed to open local storage")?;

    conn.execute_batch("PRAGMA journal_mode=WAL;")
        .context("failed to set database pragmas")?;

    migrations::run_migrations(&conn)?;

    Ok(conn)
}
