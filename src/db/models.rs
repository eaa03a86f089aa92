use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
pub struct SearchQuery {
    pub id: i64,
    pub criteria: String,
    pub created_at: DateTime<Utc>,
    pub status: String,
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RawResult {
    pub id: i64,
    pub search_query_id: i64,
    pub source: String,
    pub raw_json: Option<Value>,
    pub collected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StructuredResult {
    pub id: i64,
    pub search_result_raw_id: i64,
    pub category: Option<String>,
    pub title: Option<String>,
    pub date_found: Option<NaiveDate>,
    pub applicant: Option<String>,
    pub summary: Option<String>,
    pub structured_json: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub id: i64,
    pub search_query_id: i64,
    pub log_msg: Option<String>,
    pub log_time: DateTime<Utc>,
}

/// Field set for one structured projection, borrowed from the caller.
#[derive(Debug, Clone, Default)]
pub struct NewStructured<'a> {
    pub category: Option<&'a str>,
    pub title: Option<&'a str>,
    pub date_found: Option<NaiveDate>,
    pub applicant: Option<&'a str>,
    pub summary: Option<&'a str>,
    pub structured_json: Option<&'a Value>,
}
