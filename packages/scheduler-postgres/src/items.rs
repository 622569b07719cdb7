//! Row shape shared by every `scheduler_items` access path, and the
//! (de)serialization between a row's `attributes` JSONB and
//! [`scheduler_core::JobRecord`].

use scheduler_core::JobRecord;
use sqlx::postgres::PgRow;
use sqlx::Row;

/// Raw row as read back from `scheduler_items`.
#[derive(Debug, sqlx::FromRow)]
pub struct ItemRow {
    pub partition_key: String,
    pub sort_key: String,
    pub attributes: serde_json::Value,
}

impl ItemRow {
    pub fn into_job_record(self) -> Result<JobRecord, serde_json::Error> {
        serde_json::from_value(self.attributes)
    }
}

/// Pulls `attributes` straight off a row without the intermediate struct,
/// for call sites that only selected that one column.
pub fn job_record_from_row(row: &PgRow) -> Result<JobRecord, sqlx::Error> {
    let attributes: serde_json::Value = row.try_get("attributes")?;
    serde_json::from_value(attributes).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}
