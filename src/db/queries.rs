use super::{Db, StoreResult, models::SearchQuery};
use rusqlite::{OptionalExtension, Row, params};

fn map_query(row: &Row<'_>) -> rusqlite::Result<SearchQuery> {
    Ok(SearchQuery {
        id: row.get(0)?,
        criteria: row.get(1)?,
        created_at: row.get(2)?,
        status: row.get(3)?,
        user_id: row.get(4)?,
    })
}

impl Db {
    /// Records a new search query and returns its id.
    ///
    /// `status` starts as "pending" and `created_at` as the insertion
    /// time, both from the schema defaults.
    pub fn insert_query(&self, criteria: &str, user_id: Option<i64>) -> StoreResult<i64> {
        self.conn.execute(
            "INSERT INTO search_query (criteria, user_id) VALUES (?, ?)",
            params![criteria, user_id],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Updates the processing status of a query. Returns false when no
    /// such query exists.
    pub fn update_status(&self, query_id: i64, status: &str) -> StoreResult<bool> {
        let rows = self.conn.execute(
            "UPDATE search_query SET status = ? WHERE id = ?",
            params![status, query_id],
        )?;
        Ok(rows > 0)
    }

    pub fn get_query(&self, query_id: i64) -> StoreResult<Option<SearchQuery>> {
        let query = self
            .conn
            .query_row(
                "SELECT id, criteria, created_at, status, user_id FROM search_query WHERE id = ?",
                params![query_id],
                map_query,
            )
            .optional()?;
        Ok(query)
    }

    /// Returns the id of the most recent query for the given criteria.
    pub fn latest_query_id_by_criteria(&self, criteria: &str) -> StoreResult<Option<i64>> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM search_query WHERE criteria = ? ORDER BY created_at DESC, id DESC LIMIT 1",
                params![criteria],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    /// Returns all tracked queries, most recent first.
    pub fn list_queries(&self) -> StoreResult<Vec<SearchQuery>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, criteria, created_at, status, user_id FROM search_query ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map([], map_query)?;

        let mut queries = Vec::new();
        for row in rows {
            queries.push(row?);
        }
        Ok(queries)
    }

    /// Deletes a query and, via cascade, its raw results, their
    /// structured projections, and its log entries.
    pub fn delete_query(&self, query_id: i64) -> StoreResult<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM search_query WHERE id = ?", params![query_id])?;
        Ok(rows > 0)
    }
}
