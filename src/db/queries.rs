use rusqlite::{params, Connection, OptionalExtension};

// ── Local storage ──

pub fn get_item(conn: &Connection, key: &str) -> anyhow::Result<Option<String>> {
    let value = conn
        .query_row(
            "SELECT value FROM local_storage WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

pub fn set_item(conn: &Connection, key: &str, value: &str) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO local_storage (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key, value],
    )?;
    Ok(())
}

pub fn remove_item(conn: &Connection, key: &str) -> anyhow::Result<()> {
    conn.execute("DELETE FROM local_storage WHERE key = ?1", params![key])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[test]
    fn test_get_missing_item() {
        let conn = db::init_db(":memory:").unwrap();
        assert_eq!(get_item(&conn, "user").unwrap(), None);
    }

    #[test]
    fn test_set_overwrites_and_remove_clears() {
        let conn = db::init_db(":memory:").unwrap();
        set_item(&conn, "user", "first").unwrap();
        set_item(&conn, "user", "second").unwrap();
        assert_eq!(get_item(&conn, "user").unwrap().as_deref(), Some("second"));

        remove_item(&conn, "user").unwrap();
        assert_eq!(get_item(&conn, "user").unwrap(), None);
        // Removing twice is harmless
        remove_item(&conn, "user").unwrap();
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = db::init_db(":memory:").unwrap();
        db::migrations::run_migrations(&conn).unwrap();
        set_item(&conn, "k", "v").unwrap();
        assert_eq!(get_item(&conn, "k").unwrap().as_deref(), Some("v"));
    }
}
