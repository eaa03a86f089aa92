use super::{Db, StoreResult, models::LogEntry};
use rusqlite::{Row, params};

fn map_log(row: &Row<'_>) -> rusqlite::Result<LogEntry> {
    Ok(LogEntry {
        id: row.get(0)?,
        search_query_id: row.get(1)?,
        log_msg: row.get(2)?,
        log_time: row.get(3)?,
    })
}

impl Db {
    /// Appends an audit entry for an operation performed against a query.
    pub fn append_log(&self, query_id: i64, msg: &str) -> StoreResult<i64> {
        self.conn.execute(
            "INSERT INTO search_log (search_query_id, log_msg) VALUES (?, ?)",
            params![query_id, msg],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Returns the audit log of a query in insertion order.
    pub fn logs_for_query(&self, query_id: i64) -> StoreResult<Vec<LogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, search_query_id, log_msg, log_time FROM search_log WHERE search_query_id = ? ORDER BY id",
        )?;
        let rows = stmt.query_map(params![query_id], map_log)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }
}
