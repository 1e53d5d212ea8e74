//! Project cache engine.
//!
//! Serves a user's project list from the newest cache row when it is
//! usable, otherwise fetches it from the projects API. Each fetch is
//! recorded as its own row that moves from `pending` to `fetched` or
//! `failed`.
//!
//! ### Concurrency
//! Fetches for one user are serialized by an in-process lock, and the
//! database rejects a second `pending` row for the same user. A caller that
//! waited on the lock re-checks the cache before fetching, so concurrent
//! non-forced calls share one fetch. A user's lock entry is dropped once
//! no call holds or waits on it.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use blogsync_core::store::credentials::DEVPAD_SOURCE;
use blogsync_core::{Db, Error, ProjectCacheRecord};

use crate::ProjectSource;

/// How long a `pending` row may stay unresolved before a new fetch releases it.
const DEFAULT_STALE_PENDING_SECS: i64 = 40;

/// Fetches and caches users' project lists.
pub struct ProjectCacheEngine<S> {
    db: Db,
    source: S,
    ttl: Option<chrono::Duration>,
    stale_pending_after: chrono::Duration,
    locks: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl<S: ProjectSource> ProjectCacheEngine<S> {
    pub fn new(db: Db, source: S) -> Self {
        Self {
            db,
            source,
            ttl: None,
            stale_pending_after: chrono::Duration::seconds(DEFAULT_STALE_PENDING_SECS),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Treat `fetched` rows older than `ttl` as stale. `None` keeps every
    /// fetched row usable.
    pub fn with_ttl(mut self, ttl: Option<chrono::Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    /// Age after which a leftover `pending` row is marked `failed` so that a
    /// new fetch can proceed. Should exceed the HTTP deadline.
    pub fn with_stale_pending_after(mut self, after: chrono::Duration) -> Self {
        self.stale_pending_after = after;
        self
    }

    /// Return the user's project cache, fetching it if needed.
    ///
    /// With `force == false` a usable `fetched` row is returned as is and no
    /// request is made. Otherwise a new `pending` row is inserted, the
    /// projects API is called, and the row is re-read after being marked
    /// `fetched`. Any failure after the insert marks the row `failed` before
    /// the error is returned.
    ///
    /// # Errors
    ///
    /// - [`Error::CredentialMissing`] if the user has no devpad token; no
    ///   row is created
    /// - [`Error::FetchInFlight`] if another process holds a pending row
    /// - upstream and decode errors from the request
    /// - database errors
    pub async fn fetch_projects(&self, user_id: i64, force: bool) -> Result<ProjectCacheRecord, Error> {
        if !force && let Some(record) = self.usable_record(user_id).await? {
            tracing::debug!(user_id, cache_id = record.id, "serving cached projects");
            return Ok(record);
        }

        let lock = self.user_lock(user_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.fetch_locked(user_id, force).await
        };
        drop(lock);
        self.release_user_lock(user_id).await;
        result
    }

    async fn fetch_locked(&self, user_id: i64, force: bool) -> Result<ProjectCacheRecord, Error> {
        if !force && let Some(record) = self.usable_record(user_id).await? {
            tracing::debug!(user_id, cache_id = record.id, "projects fetched by concurrent call");
            return Ok(record);
        }

        let token = self
            .db
            .get_credential(user_id, DEVPAD_SOURCE)
            .await?
            .ok_or_else(|| Error::CredentialMissing { user_id, source_name: DEVPAD_SOURCE.to_string() })?;

        let released = self
            .db
            .expire_stale_pending(user_id, Utc::now() - self.stale_pending_after)
            .await?;
        if released > 0 {
            tracing::warn!(user_id, released, "released stale pending project fetches");
        }

        let url = self.source.projects_url().to_string();
        let cache_id = self.db.insert_pending_cache(user_id, &url).await?;
        tracing::info!(user_id, cache_id, force, url = %url, "fetching projects");

        let body = match self.source.fetch_projects(&token).await {
            Ok(body) => body,
            Err(e) => {
                let err = Error::from(e);
                tracing::warn!(user_id, cache_id, error = %err, "project fetch failed");
                self.mark_failed(cache_id).await;
                return Err(err);
            }
        };

        if let Err(err) = self.db.mark_cache_fetched(cache_id, &body).await {
            tracing::error!(user_id, cache_id, error = %err, "failed to store project payload");
            self.mark_failed(cache_id).await;
            return Err(err);
        }

        let record = self.db.get_cache(cache_id).await?;
        tracing::info!(user_id, cache_id, bytes = record.payload.len(), "projects cached");
        Ok(record)
    }

    async fn usable_record(&self, user_id: i64) -> Result<Option<ProjectCacheRecord>, Error> {
        let latest = self.db.get_latest_cache(user_id).await?;
        Ok(latest.filter(|record| record.is_fresh(self.ttl, Utc::now())))
    }

    async fn user_lock(&self, user_id: i64) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(user_id).or_default().clone()
    }

    /// Drop the user's lock entry once no call holds or waits on it.
    async fn release_user_lock(&self, user_id: i64) {
        let mut locks = self.locks.lock().await;
        if locks.get(&user_id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(&user_id);
        }
    }

    async fn mark_failed(&self, cache_id: i64) {
        if let Err(e) = self.db.mark_cache_failed(cache_id).await {
            tracing::error!(cache_id, error = %e, "failed to mark project cache as failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ApiError;
    use async_trait::async_trait;
    use blogsync_core::CacheStatus;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const URL: &str = "https://devpad.example/api/v0/projects";

    #[derive(Clone)]
    struct FakeProjects {
        calls: Arc<AtomicUsize>,
        response: Result<String, ApiError>,
        delay: Duration,
    }

    impl FakeProjects {
        fn ok(body: &str) -> Self {
            Self { calls: Arc::default(), response: Ok(body.to_string()), delay: Duration::ZERO }
        }

        fn failing(err: ApiError) -> Self {
            Self { calls: Arc::default(), response: Err(err), delay: Duration::ZERO }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ProjectSource for FakeProjects {
        fn projects_url(&self) -> &str {
            URL
        }

        async fn fetch_projects(&self, token: &str) -> Result<String, ApiError> {
            assert_eq!(token, "devpad-token");
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.response.clone()
        }
    }

    async fn setup(source: FakeProjects) -> (Db, ProjectCacheEngine<FakeProjects>) {
        let db = Db::open_in_memory().await.unwrap();
        db.set_credential(1, DEVPAD_SOURCE, "devpad-token").await.unwrap();
        let engine = ProjectCacheEngine::new(db.clone(), source);
        (db, engine)
    }

    #[tokio::test]
    async fn test_first_fetch_stores_payload() {
        let source = FakeProjects::ok(r#"[{"project_id":"blog"}]"#);
        let (db, engine) = setup(source.clone()).await;

        let record = engine.fetch_projects(1, false).await.unwrap();
        assert_eq!(record.status, CacheStatus::Fetched);
        assert_eq!(record.payload, r#"[{"project_id":"blog"}]"#);
        assert_eq!(record.source_url, URL);
        assert_eq!(record.projects().unwrap().len(), 1);
        assert_eq!(source.calls(), 1);
        assert_eq!(db.get_latest_cache(1).await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn test_cached_record_short_circuits() {
        let source = FakeProjects::ok("[]");
        let (db, engine) = setup(source.clone()).await;

        let first = engine.fetch_projects(1, false).await.unwrap();
        let second = engine.fetch_projects(1, false).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(source.calls(), 1);
        assert_eq!(db.count_caches(1).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_forced_fetch_always_calls_upstream() {
        let source = FakeProjects::ok("[]");
        let (db, engine) = setup(source.clone()).await;

        let first = engine.fetch_projects(1, false).await.unwrap();
        let second = engine.fetch_projects(1, true).await.unwrap();
        let third = engine.fetch_projects(1, true).await.unwrap();

        assert_eq!(source.calls(), 3);
        assert_eq!(db.count_caches(1).await.unwrap(), 3);
        assert!(first.id < second.id && second.id < third.id);
    }

    #[tokio::test]
    async fn test_http_error_marks_failed() {
        let source = FakeProjects::failing(ApiError::HttpError { status: 500 });
        let (db, engine) = setup(source.clone()).await;

        let err = engine.fetch_projects(1, false).await.unwrap_err();
        assert!(matches!(err, Error::UpstreamStatus { status: 500 }));

        let latest = db.get_latest_cache(1).await.unwrap().unwrap();
        assert_eq!(latest.status, CacheStatus::Failed);
        assert_eq!(latest.payload, "");
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_transport_error_marks_failed() {
        let source = FakeProjects::failing(ApiError::Timeout);
        let (db, engine) = setup(source).await;

        let err = engine.fetch_projects(1, true).await.unwrap_err();
        assert!(matches!(err, Error::UpstreamTransport(_)));
        assert_eq!(db.get_latest_cache(1).await.unwrap().unwrap().status, CacheStatus::Failed);
    }

    #[tokio::test]
    async fn test_failed_latest_is_refetched() {
        let source = FakeProjects::ok("[]");
        let (db, engine) = setup(source.clone()).await;

        let id = db.insert_pending_cache(1, URL).await.unwrap();
        db.mark_cache_failed(id).await.unwrap();

        let record = engine.fetch_projects(1, false).await.unwrap();
        assert_eq!(record.status, CacheStatus::Fetched);
        assert_ne!(record.id, id);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_missing_credential_leaves_no_row() {
        let source = FakeProjects::ok("[]");
        let db = Db::open_in_memory().await.unwrap();
        let engine = ProjectCacheEngine::new(db.clone(), source.clone());

        let err = engine.fetch_projects(2, true).await.unwrap_err();
        assert!(matches!(err, Error::CredentialMissing { user_id: 2, .. }));
        assert!(err.is_configuration());
        assert_eq!(db.count_caches(2).await.unwrap(), 0);
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_pending_row_blocks_fetch() {
        let source = FakeProjects::ok("[]");
        let (db, engine) = setup(source.clone()).await;

        db.insert_pending_cache(1, URL).await.unwrap();

        let err = engine.fetch_projects(1, true).await.unwrap_err();
        assert!(matches!(err, Error::FetchInFlight(1)));
        assert_eq!(source.calls(), 0);
        assert_eq!(db.count_caches(1).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_stale_pending_row_is_released() {
        let source = FakeProjects::ok("[]");
        let (db, engine) = setup(source.clone()).await;
        let engine = engine.with_stale_pending_after(chrono::Duration::zero());

        let orphan = db.insert_pending_cache(1, URL).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        let record = engine.fetch_projects(1, true).await.unwrap();
        assert_eq!(record.status, CacheStatus::Fetched);
        assert_eq!(db.get_cache(orphan).await.unwrap().status, CacheStatus::Failed);
    }

    #[tokio::test]
    async fn test_concurrent_calls_share_one_fetch() {
        let source = FakeProjects { delay: Duration::from_millis(50), ..FakeProjects::ok("[]") };
        let (db, engine) = setup(source.clone()).await;

        let (a, b) = tokio::join!(engine.fetch_projects(1, false), engine.fetch_projects(1, false));

        assert_eq!(a.unwrap().id, b.unwrap().id);
        assert_eq!(source.calls(), 1);
        assert_eq!(db.count_caches(1).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_user_locks_released_after_fetch() {
        let source = FakeProjects { delay: Duration::from_millis(20), ..FakeProjects::ok("[]") };
        let (db, engine) = setup(source).await;
        db.set_credential(2, DEVPAD_SOURCE, "devpad-token").await.unwrap();

        engine.fetch_projects(1, true).await.unwrap();
        assert!(engine.locks.lock().await.is_empty());

        let (a, b, c) = tokio::join!(
            engine.fetch_projects(1, true),
            engine.fetch_projects(1, true),
            engine.fetch_projects(2, false)
        );
        a.unwrap();
        b.unwrap();
        c.unwrap();
        assert!(engine.locks.lock().await.is_empty());

        let err = engine.fetch_projects(3, false).await.unwrap_err();
        assert!(matches!(err, Error::CredentialMissing { user_id: 3, .. }));
        assert!(engine.locks.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_ttl_expires_fetched_rows() {
        let source = FakeProjects::ok("[]");
        let (_db, engine) = setup(source.clone()).await;
        let engine = engine.with_ttl(Some(chrono::Duration::zero()));

        engine.fetch_projects(1, false).await.unwrap();
        engine.fetch_projects(1, false).await.unwrap();
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_ttl_keeps_young_rows() {
        let source = FakeProjects::ok("[]");
        let (_db, engine) = setup(source.clone()).await;
        let engine = engine.with_ttl(Some(chrono::Duration::hours(1)));

        engine.fetch_projects(1, false).await.unwrap();
        engine.fetch_projects(1, false).await.unwrap();
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_users_are_independent() {
        let source = FakeProjects::ok("[]");
        let (db, engine) = setup(source.clone()).await;
        db.set_credential(2, DEVPAD_SOURCE, "devpad-token").await.unwrap();

        let a = engine.fetch_projects(1, false).await.unwrap();
        let b = engine.fetch_projects(2, false).await.unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(b.user_id, 2);
        assert_eq!(source.calls(), 2);
    }
}
