//! Project cache records.
//!
//! One row per fetch attempt against the projects API. A row starts out
//! `pending`, then moves to `fetched` (with the response body) or `failed`.
//! Rows are never deleted here; the newest row by `fetched_at` is the
//! current view of a user's projects.

use std::fmt;
use std::str::FromStr;

use super::connection::{Db, is_unique_violation};
use crate::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{
    self,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};

/// Lifecycle state of a project cache record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    Pending,
    Fetched,
    Failed,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Pending => "pending",
            CacheStatus::Fetched => "fetched",
            CacheStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(CacheStatus::Pending),
            "fetched" => Ok(CacheStatus::Fetched),
            "failed" => Ok(CacheStatus::Failed),
            other => Err(Error::Decode(format!("unknown cache status: {other}"))),
        }
    }
}

impl ToSql for CacheStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for CacheStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: Error| FromSqlError::Other(e.to_string().into()))
    }
}

/// A cached response from the projects API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ProjectCacheRecord {
    pub id: i64,
    pub user_id: i64,
    pub status: CacheStatus,
    pub source_url: String,
    /// Raw response body; empty unless `status` is `fetched`.
    pub payload: String,
    /// When the row was created, not when the fetch completed.
    pub fetched_at: String,
}

impl ProjectCacheRecord {
    pub fn is_fetched(&self) -> bool {
        self.status == CacheStatus::Fetched
    }

    /// Parsed creation timestamp.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.fetched_at)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Whether this record can be served without refetching.
    ///
    /// Only `fetched` records qualify. With no `ttl` any fetched record is
    /// fresh; with a `ttl` it must also be younger than that window.
    pub fn is_fresh(&self, ttl: Option<chrono::Duration>, now: DateTime<Utc>) -> bool {
        if !self.is_fetched() {
            return false;
        }
        match ttl {
            None => true,
            Some(ttl) => self.created_at().is_some_and(|created| now - created < ttl),
        }
    }

    /// Decode the cached payload as a JSON list of projects.
    ///
    /// An empty payload decodes to an empty list.
    pub fn projects(&self) -> Result<Vec<serde_json::Value>, Error> {
        if self.payload.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&self.payload).map_err(|e| Error::Decode(format!("project payload: {e}")))
    }
}

const SELECT_RECORD: &str = "SELECT id, user_id, status, source_url, payload, fetched_at FROM project_cache";

fn record_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProjectCacheRecord> {
    Ok(ProjectCacheRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        status: row.get(2)?,
        source_url: row.get(3)?,
        payload: row.get(4)?,
        fetched_at: row.get(5)?,
    })
}

impl Db {
    /// Insert a `pending` record and return its id.
    ///
    /// Fails with [`Error::FetchInFlight`] if the user already has a pending
    /// record.
    pub async fn insert_pending_cache(&self, user_id: i64, url: &str) -> Result<i64, Error> {
        let url = url.to_string();
        let fetched_at = super::now();
        self.conn
            .call(move |conn| -> Result<i64, Error> {
                let inserted = conn.execute(
                    "INSERT INTO project_cache (user_id, status, source_url, payload, fetched_at)
                     VALUES (?1, ?2, ?3, '', ?4)",
                    params![user_id, CacheStatus::Pending, url, fetched_at],
                );
                match inserted {
                    Ok(_) => Ok(conn.last_insert_rowid()),
                    Err(e) if is_unique_violation(&e) => Err(Error::FetchInFlight(user_id)),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Transition a record to `failed`. The payload is left untouched.
    pub async fn mark_cache_failed(&self, cache_id: i64) -> Result<(), Error> {
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let updated = conn.execute(
                    "UPDATE project_cache SET status = ?1 WHERE id = ?2",
                    params![CacheStatus::Failed, cache_id],
                )?;
                if updated == 0 {
                    return Err(Error::NotFound(format!("project cache {cache_id}")));
                }
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Store the response body and transition the record to `fetched`.
    pub async fn mark_cache_fetched(&self, cache_id: i64, payload: &str) -> Result<(), Error> {
        let payload = payload.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let updated = conn.execute(
                    "UPDATE project_cache SET status = ?1, payload = ?2 WHERE id = ?3",
                    params![CacheStatus::Fetched, payload, cache_id],
                )?;
                if updated == 0 {
                    return Err(Error::NotFound(format!("project cache {cache_id}")));
                }
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Most recent record for a user, whatever its status.
    pub async fn get_latest_cache(&self, user_id: i64) -> Result<Option<ProjectCacheRecord>, Error> {
        self.conn
            .call(move |conn| -> Result<Option<ProjectCacheRecord>, Error> {
                let mut stmt =
                    conn.prepare(&format!("{SELECT_RECORD} WHERE user_id = ?1 ORDER BY fetched_at DESC, id DESC LIMIT 1"))?;

                match stmt.query_row(params![user_id], record_from_row) {
                    Ok(record) => Ok(Some(record)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Record by id.
    pub async fn get_cache(&self, cache_id: i64) -> Result<ProjectCacheRecord, Error> {
        self.conn
            .call(move |conn| -> Result<ProjectCacheRecord, Error> {
                let mut stmt = conn.prepare(&format!("{SELECT_RECORD} WHERE id = ?1"))?;

                match stmt.query_row(params![cache_id], record_from_row) {
                    Ok(record) => Ok(record),
                    Err(rusqlite::Error::QueryReturnedNoRows) => {
                        Err(Error::NotFound(format!("project cache {cache_id}")))
                    }
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Fail `pending` records for a user that were created before `cutoff`.
    ///
    /// Used to release rows orphaned by a crash between insert and
    /// completion. Returns the number of rows released.
    pub async fn expire_stale_pending(&self, user_id: i64, cutoff: DateTime<Utc>) -> Result<u64, Error> {
        let cutoff = super::timestamp(cutoff);
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute(
                    "UPDATE project_cache SET status = ?1
                     WHERE user_id = ?2 AND status = ?3 AND fetched_at < ?4",
                    params![CacheStatus::Failed, user_id, CacheStatus::Pending, cutoff],
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of cache rows stored for a user.
    pub async fn count_caches(&self, user_id: i64) -> Result<u64, Error> {
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM project_cache WHERE user_id = ?1",
                    params![user_id],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://devpad.example/api/v0/projects";

    #[tokio::test]
    async fn test_pending_then_fetched() {
        let db = Db::open_in_memory().await.unwrap();
        let id = db.insert_pending_cache(1, URL).await.unwrap();

        let pending = db.get_cache(id).await.unwrap();
        assert_eq!(pending.status, CacheStatus::Pending);
        assert_eq!(pending.payload, "");
        assert_eq!(pending.source_url, URL);

        db.mark_cache_fetched(id, r#"[{"id":"p1"}]"#).await.unwrap();
        let fetched = db.get_cache(id).await.unwrap();
        assert_eq!(fetched.status, CacheStatus::Fetched);
        assert_eq!(fetched.projects().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_keeps_empty_payload() {
        let db = Db::open_in_memory().await.unwrap();
        let id = db.insert_pending_cache(1, URL).await.unwrap();
        db.mark_cache_failed(id).await.unwrap();

        let failed = db.get_cache(id).await.unwrap();
        assert_eq!(failed.status, CacheStatus::Failed);
        assert!(failed.payload.is_empty());
        assert!(failed.projects().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_single_pending_per_user() {
        let db = Db::open_in_memory().await.unwrap();
        db.insert_pending_cache(1, URL).await.unwrap();

        let second = db.insert_pending_cache(1, URL).await;
        assert!(matches!(second, Err(Error::FetchInFlight(1))));

        // other users are unaffected
        db.insert_pending_cache(2, URL).await.unwrap();
    }

    #[tokio::test]
    async fn test_latest_is_newest_row() {
        let db = Db::open_in_memory().await.unwrap();
        assert!(db.get_latest_cache(1).await.unwrap().is_none());

        let first = db.insert_pending_cache(1, URL).await.unwrap();
        db.mark_cache_fetched(first, "[]").await.unwrap();
        let second = db.insert_pending_cache(1, URL).await.unwrap();
        db.mark_cache_failed(second).await.unwrap();

        let latest = db.get_latest_cache(1).await.unwrap().unwrap();
        assert_eq!(latest.id, second);
        assert_eq!(latest.status, CacheStatus::Failed);
        assert_eq!(db.count_caches(1).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_get_missing_cache() {
        let db = Db::open_in_memory().await.unwrap();
        assert!(matches!(db.get_cache(42).await, Err(Error::NotFound(_))));
        assert!(matches!(db.mark_cache_failed(42).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_expire_stale_pending() {
        let db = Db::open_in_memory().await.unwrap();
        let id = db.insert_pending_cache(1, URL).await.unwrap();

        let released = db.expire_stale_pending(1, Utc::now() - chrono::Duration::hours(1)).await.unwrap();
        assert_eq!(released, 0);

        let released = db.expire_stale_pending(1, Utc::now() + chrono::Duration::seconds(1)).await.unwrap();
        assert_eq!(released, 1);
        assert_eq!(db.get_cache(id).await.unwrap().status, CacheStatus::Failed);

        db.insert_pending_cache(1, URL).await.unwrap();
    }

    #[test]
    fn test_freshness() {
        let now = Utc::now();
        let record = ProjectCacheRecord {
            id: 1,
            user_id: 1,
            status: CacheStatus::Fetched,
            source_url: URL.into(),
            payload: "[]".into(),
            fetched_at: super::super::timestamp(now - chrono::Duration::hours(25)),
        };

        assert!(record.is_fresh(None, now));
        assert!(!record.is_fresh(Some(chrono::Duration::hours(24)), now));
        assert!(record.is_fresh(Some(chrono::Duration::hours(26)), now));

        let failed = ProjectCacheRecord { status: CacheStatus::Failed, ..record };
        assert!(!failed.is_fresh(None, now));
    }

    #[test]
    fn test_status_round_trip() {
        for status in [CacheStatus::Pending, CacheStatus::Fetched, CacheStatus::Failed] {
            assert_eq!(status.as_str().parse::<CacheStatus>().unwrap(), status);
        }
        assert!("done".parse::<CacheStatus>().is_err());
    }
}
