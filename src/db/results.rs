use super::{
    Db, StoreResult,
    models::{NewStructured, RawResult, StructuredResult},
};
use rusqlite::{OptionalExtension, Row, params};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Key injected into stored payloads to identify identical documents.
const HASH_KEY: &str = "_hash";

fn map_raw(row: &Row<'_>) -> rusqlite::Result<RawResult> {
    Ok(RawResult {
        id: row.get(0)?,
        search_query_id: row.get(1)?,
        source: row.get(2)?,
        raw_json: row.get(3)?,
        collected_at: row.get(4)?,
    })
}

fn map_structured(row: &Row<'_>) -> rusqlite::Result<StructuredResult> {
    Ok(StructuredResult {
        id: row.get(0)?,
        search_result_raw_id: row.get(1)?,
        category: row.get(2)?,
        title: row.get(3)?,
        date_found: row.get(4)?,
        applicant: row.get(5)?,
        summary: row.get(6)?,
        structured_json: row.get(7)?,
    })
}

/// SHA-256 over the canonical JSON text. Object keys serialize in
/// sorted order, so the hash is independent of insertion order.
fn content_hash(payload: &Value) -> Result<String, serde_json::Error> {
    let canonical = serde_json::to_string(payload)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

impl Db {
    /// Records one raw result collected from an external source.
    ///
    /// The table is append-only and permits duplicate (query, source)
    /// pairs. Payload-carrying inserts are deduplicated by content: the
    /// hash of the document is stored under `"_hash"` inside the
    /// payload, and inserting an identical document for the same query
    /// returns the existing row id instead of appending.
    pub fn insert_raw_result(
        &self,
        query_id: i64,
        source: &str,
        payload: Option<&Value>,
    ) -> StoreResult<i64> {
        let Some(payload) = payload else {
            self.conn.execute(
                "INSERT INTO search_result_raw (search_query_id, source) VALUES (?, ?)",
                params![query_id, source],
            )?;
            return Ok(self.conn.last_insert_rowid());
        };

        let hash = content_hash(payload)?;
        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM search_result_raw WHERE search_query_id = ? AND json_extract(raw_json, '$._hash') = ?",
                params![query_id, hash],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            return Ok(id);
        }

        let mut stored = payload.clone();
        if let Value::Object(map) = &mut stored {
            map.insert(HASH_KEY.to_string(), Value::String(hash));
        }
        self.conn.execute(
            "INSERT INTO search_result_raw (search_query_id, source, raw_json) VALUES (?, ?, ?)",
            params![query_id, source, stored],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Returns the raw results collected for a query, in collection order.
    pub fn raw_results_for_query(&self, query_id: i64) -> StoreResult<Vec<RawResult>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, search_query_id, source, raw_json, collected_at
             FROM search_result_raw WHERE search_query_id = ? ORDER BY id",
        )?;
        let rows = stmt.query_map(params![query_id], map_raw)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Stores a structured projection derived from one raw result.
    ///
    /// Reprocessing appends a fresh row; earlier projections stay in
    /// place until their raw result is deleted.
    pub fn insert_structured(&self, raw_id: i64, fields: &NewStructured<'_>) -> StoreResult<i64> {
        self.conn.execute(
            "INSERT INTO search_result_structured
             (search_result_raw_id, category, title, date_found, applicant, summary, structured_json)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                raw_id,
                fields.category,
                fields.title,
                fields.date_found,
                fields.applicant,
                fields.summary,
                fields.structured_json,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn structured_for_raw(&self, raw_id: i64) -> StoreResult<Vec<StructuredResult>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, search_result_raw_id, category, title, date_found, applicant, summary, structured_json
             FROM search_result_structured WHERE search_result_raw_id = ? ORDER BY id",
        )?;
        let rows = stmt.query_map(params![raw_id], map_structured)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Collects the structured payloads for every result of a query,
    /// joining through the owning raw rows. Rows without a payload are
    /// skipped.
    pub fn structured_payloads_for_query(&self, query_id: i64) -> StoreResult<Vec<Value>> {
        let mut stmt = self.conn.prepare(
            "SELECT s.structured_json
             FROM search_result_structured s
             JOIN search_result_raw r ON s.search_result_raw_id = r.id
             WHERE r.search_query_id = ? AND s.structured_json IS NOT NULL
             ORDER BY s.id",
        )?;
        let rows = stmt.query_map(params![query_id], |row| row.get(0))?;

        let mut payloads = Vec::new();
        for row in rows {
            payloads.push(row?);
        }
        Ok(payloads)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use serde_json::json;

    #[test]
    fn test_raw_insert_and_content_dedup() {
        let db = Db::open_in_memory().unwrap();
        let query_id = db.insert_query("trademark X", None).unwrap();

        let payload = json!({"applicationNumber": "97123456", "title": "X mark"});
        let first = db
            .insert_raw_result(query_id, "uspto", Some(&payload))
            .unwrap();

        // Same document again: existing id, no new row
        let second = db
            .insert_raw_result(query_id, "uspto", Some(&payload))
            .unwrap();
        assert_eq!(first, second);

        let results = db.raw_results_for_query(query_id).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].source, "uspto");
        let stored = results[0].raw_json.as_ref().unwrap();
        assert!(stored.get("_hash").is_some(), "stored payload carries its hash");
        let age = (Utc::now() - results[0].collected_at).num_seconds().abs();
        assert!(age < 60, "collected_at should default to insertion time");
    }

    #[test]
    fn test_duplicate_query_source_pairs_allowed() {
        let db = Db::open_in_memory().unwrap();
        let query_id = db.insert_query("trademark X", None).unwrap();

        let a = db
            .insert_raw_result(query_id, "uspto", Some(&json!({"title": "first hit"})))
            .unwrap();
        let b = db
            .insert_raw_result(query_id, "uspto", Some(&json!({"title": "second hit"})))
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(db.raw_results_for_query(query_id).unwrap().len(), 2);
    }

    #[test]
    fn test_raw_insert_without_payload() {
        let db = Db::open_in_memory().unwrap();
        let query_id = db.insert_query("trademark X", None).unwrap();

        db.insert_raw_result(query_id, "inpi", None).unwrap();
        let results = db.raw_results_for_query(query_id).unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].raw_json.is_none());
    }

    #[test]
    fn test_raw_requires_existing_query() {
        let db = Db::open_in_memory().unwrap();
        let result = db.insert_raw_result(9999, "uspto", Some(&json!({"title": "orphan"})));
        assert!(result.is_err(), "orphan raw result must be rejected");
    }

    #[test]
    fn test_structured_crud() {
        let db = Db::open_in_memory().unwrap();
        let query_id = db.insert_query("trademark X", None).unwrap();
        let raw_id = db
            .insert_raw_result(query_id, "uspto", Some(&json!({"title": "X mark"})))
            .unwrap();

        let payload = json!({"title": "X mark", "category": "Trademarks"});
        db.insert_structured(
            raw_id,
            &NewStructured {
                category: Some("Trademarks"),
                title: Some("X mark"),
                date_found: NaiveDate::from_ymd_opt(2024, 11, 5),
                applicant: Some("X Corp"),
                summary: Some("Word mark for X"),
                structured_json: Some(&payload),
            },
        )
        .unwrap();
        // A projection with no payload
        db.insert_structured(
            raw_id,
            &NewStructured {
                title: Some("X mark (reclassified)"),
                ..Default::default()
            },
        )
        .unwrap();

        let projections = db.structured_for_raw(raw_id).unwrap();
        assert_eq!(projections.len(), 2);
        assert_eq!(projections[0].category.as_deref(), Some("Trademarks"));
        assert_eq!(
            projections[0].date_found,
            NaiveDate::from_ymd_opt(2024, 11, 5)
        );
        assert_eq!(projections[0].applicant.as_deref(), Some("X Corp"));
        assert!(projections[1].structured_json.is_none());

        // The reporting join skips the NULL payload
        let payloads = db.structured_payloads_for_query(query_id).unwrap();
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0]["title"], "X mark");
    }

    #[test]
    fn test_structured_requires_existing_raw() {
        let db = Db::open_in_memory().unwrap();
        let result = db.insert_structured(
            9999,
            &NewStructured {
                title: Some("orphan"),
                ..Default::default()
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_structured_null_raw_id_rejected() {
        let db = Db::open_in_memory().unwrap();
        let result = db.conn.execute(
            "INSERT INTO search_result_structured (search_result_raw_id, title) VALUES (NULL, 'x')",
            [],
        );
        assert!(result.is_err(), "NOT NULL violation must be rejected");
    }

    #[test]
    fn test_content_hash_key_order_independent() {
        let a = json!({"title": "X", "source": "uspto"});
        let b = json!({"source": "uspto", "title": "X"});
        assert_eq!(content_hash(&a).unwrap(), content_hash(&b).unwrap());

        let c = json!({"title": "Y", "source": "uspto"});
        assert_ne!(content_hash(&a).unwrap(), content_hash(&c).unwrap());
    }
}
