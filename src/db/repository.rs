//! Database repository for profile and request documents.
//!
//! Uses prepared statements, conditional updates for optimistic concurrency,
//! and single-statement increments for vote counters.

use std::sync::Arc;

use chrono::Utc;
use sqlx::{Row, SqlitePool};
use tokio::sync::broadcast;

use crate::errors::AppError;
use crate::live::{RequestFeed, RequestSnapshot};
use crate::models::{FeatureRequest, Profile};

/// Attempts at the profile read-check-write before giving up.
pub const MAX_UPVOTE_ATTEMPTS: usize = 5;

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
    feed: RequestFeed,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            feed: RequestFeed::default(),
        }
    }

    // ==================== PROFILE OPERATIONS ====================

    /// Get a profile by uid.
    pub async fn get_profile(&self, uid: &str) -> Result<Option<Profile>, AppError> {
        let row = sqlx::query(
            "SELECT id, email, upvoted_on, created_at, version FROM users WHERE id = ?",
        )
        .bind(uid)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(profile_from_row).transpose()
    }

    /// Write a fresh profile for `uid`, overwriting any existing one.
    pub async fn set_profile(&self, uid: &str, email: Option<&str>) -> Result<Profile, AppError> {
        let now = Utc::now().to_rfc3339();

        let row = sqlx::query(
            r#"INSERT INTO users (id, email, upvoted_on, created_at, version)
               VALUES (?, ?, '[]', ?, 1)
               ON CONFLICT(id) DO UPDATE SET
                   email = excluded.email,
                   upvoted_on = '[]',
                   created_at = excluded.created_at,
                   version = users.version + 1
               RETURNING id, email, upvoted_on, created_at, version"#,
        )
        .bind(uid)
        .bind(email)
        .bind(&now)
        .fetch_one(&self.pool)
        .await?;

        profile_from_row(&row)
    }

    /// Delete a profile. Returns whether a profile existed.
    pub async fn delete_profile(&self, uid: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(uid)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Append `request_id` to the profile's `upvoted_on`, failing if it is already there.
    ///
    /// The read-check-write runs under optimistic concurrency: the write only
    /// lands if the profile version is unchanged since the read, otherwise the
    /// profile is re-read and the membership check repeated.
    pub async fn record_upvote(&self, uid: &str, request_id: &str) -> Result<Profile, AppError> {
        for attempt in 1..=MAX_UPVOTE_ATTEMPTS {
            let existing = self
                .get_profile(uid)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Profile {} not found", uid)))?;

            if existing.has_upvoted(request_id) {
                return Err(AppError::FailedPrecondition(
                    "You have already upvoted this request.".to_string(),
                ));
            }

            let mut upvoted_on = existing.upvoted_on.clone();
            upvoted_on.push(request_id.to_string());
            let upvoted_on_json = serde_json::to_string(&upvoted_on)?;

            let result = sqlx::query(
                "UPDATE users SET upvoted_on = ?, version = ? WHERE id = ? AND version = ?",
            )
            .bind(&upvoted_on_json)
            .bind(existing.version + 1)
            .bind(uid)
            .bind(existing.version)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 1 {
                return Ok(Profile {
                    upvoted_on,
                    version: existing.version + 1,
                    ..existing
                });
            }

            tracing::debug!(uid, attempt, "Concurrent profile modification, retrying");
        }

        Err(AppError::Aborted(format!(
            "Profile {} kept changing; gave up after {} attempts",
            uid, MAX_UPVOTE_ATTEMPTS
        )))
    }

    // ==================== REQUEST OPERATIONS ====================

    /// List all requests, most upvoted first.
    pub async fn list_requests(&self) -> Result<Vec<FeatureRequest>, AppError> {
        let rows = sqlx::query(
            "SELECT id, text, upvotes, created_at FROM requests ORDER BY upvotes DESC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(request_from_row).collect())
    }

    /// Get a request by ID.
    pub async fn get_request(&self, id: &str) -> Result<Option<FeatureRequest>, AppError> {
        let row = sqlx::query("SELECT id, text, upvotes, created_at FROM requests WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(request_from_row))
    }

    /// Create a new request with no upvotes.
    pub async fn create_request(&self, text: &str) -> Result<FeatureRequest, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query("INSERT INTO requests (id, text, upvotes, created_at) VALUES (?, ?, 0, ?)")
            .bind(&id)
            .bind(text)
            .bind(&now)
            .execute(&self.pool)
            .await?;

        self.notify_requests_changed().await;

        Ok(FeatureRequest {
            id,
            text: text.to_string(),
            upvotes: 0,
            created_at: now,
        })
    }

    /// Atomically add `delta` to a request's vote counter. Returns the new count.
    pub async fn increment_upvotes(&self, id: &str, delta: i64) -> Result<i64, AppError> {
        let row = sqlx::query(
            "UPDATE requests SET upvotes = upvotes + ? WHERE id = ? RETURNING upvotes",
        )
        .bind(delta)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let upvotes: i64 = row
            .map(|r| r.get::<i64, _>("upvotes"))
            .ok_or_else(|| AppError::NotFound(format!("Request {} not found", id)))?;

        self.notify_requests_changed().await;

        Ok(upvotes)
    }

    // ==================== LIVE SUBSCRIPTION ====================

    /// Subscribe to the ranked request list.
    ///
    /// Returns the current snapshot and a receiver for every later one. The
    /// receiver is created before the read, so no write can fall between them.
    pub async fn subscribe_requests(
        &self,
    ) -> Result<(RequestSnapshot, broadcast::Receiver<RequestSnapshot>), AppError> {
        let rx = self.feed.subscribe();
        let current = Arc::new(self.list_requests().await?);
        Ok((current, rx))
    }

    /// Publish a fresh snapshot. The write has already landed, so a failed
    /// read here is logged rather than returned.
    async fn notify_requests_changed(&self) {
        if self.feed.subscriber_count() == 0 {
            return;
        }

        let _guard = self.feed.lock().await;
        match self.list_requests().await {
            Ok(requests) => self.feed.send(Arc::new(requests)),
            Err(e) => tracing::warn!("Failed to publish request snapshot: {}", e),
        }
    }
}

// Helper functions for row conversion

/// Unreadable `upvoted_on` is an error: treating it as empty would let the
/// next upvote overwrite the user's vote history.
fn profile_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Profile, AppError> {
    let id: String = row.get("id");
    let upvoted_on: String = row.get("upvoted_on");
    let upvoted_on = serde_json::from_str(&upvoted_on).map_err(|e| {
        tracing::error!(uid = %id, "Corrupt upvoted_on column: {}", e);
        AppError::Internal(format!("Profile {} has unreadable upvote history", id))
    })?;

    Ok(Profile {
        id,
        email: row.get("email"),
        upvoted_on,
        created_at: row.get("created_at"),
        version: row.get("version"),
    })
}

fn request_from_row(row: &sqlx::sqlite::SqliteRow) -> FeatureRequest {
    FeatureRequest {
        id: row.get("id"),
        text: row.get("text"),
        upvotes: row.get("upvotes"),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use tempfile::TempDir;

    async fn repository() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let pool = init_database(&temp_dir.path().join("repo.sqlite"))
            .await
            .expect("Failed to init DB");
        (Repository::new(pool), temp_dir)
    }

    #[tokio::test]
    async fn test_set_profile_overwrites_existing() {
        let (repo, _dir) = repository().await;

        repo.set_profile("u1", Some("old@example.com")).await.unwrap();
        let request = repo.create_request("Dark mode").await.unwrap();
        repo.record_upvote("u1", &request.id).await.unwrap();

        let profile = repo.set_profile("u1", Some("new@example.com")).await.unwrap();
        assert_eq!(profile.email.as_deref(), Some("new@example.com"));
        assert!(profile.upvoted_on.is_empty());
        assert!(profile.version > 1);
    }

    #[tokio::test]
    async fn test_record_upvote_rejects_duplicates() {
        let (repo, _dir) = repository().await;
        repo.set_profile("u1", None).await.unwrap();

        let profile = repo.record_upvote("u1", "r1").await.unwrap();
        assert_eq!(profile.upvoted_on, vec!["r1".to_string()]);

        let err = repo.record_upvote("u1", "r1").await.unwrap_err();
        assert!(matches!(err, AppError::FailedPrecondition(_)));

        let stored = repo.get_profile("u1").await.unwrap().unwrap();
        assert_eq!(stored.upvoted_on, vec!["r1".to_string()]);
    }

    #[tokio::test]
    async fn test_record_upvote_refuses_corrupt_history() {
        let (repo, _dir) = repository().await;
        repo.set_profile("u1", None).await.unwrap();
        sqlx::query("UPDATE users SET upvoted_on = 'not json' WHERE id = 'u1'")
            .execute(&repo.pool)
            .await
            .unwrap();

        let err = repo.record_upvote("u1", "r1").await.unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));

        let row = sqlx::query("SELECT upvoted_on, version FROM users WHERE id = 'u1'")
            .fetch_one(&repo.pool)
            .await
            .unwrap();
        assert_eq!(row.get::<String, _>("upvoted_on"), "not json");
        assert_eq!(row.get::<i64, _>("version"), 1);
    }

    #[tokio::test]
    async fn test_record_upvote_missing_profile() {
        let (repo, _dir) = repository().await;
        let err = repo.record_upvote("ghost", "r1").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_concurrent_upvotes_keep_every_request_id() {
        let (repo, _dir) = repository().await;
        repo.set_profile("u1", None).await.unwrap();

        let ids: Vec<String> = (0..4).map(|i| format!("r{}", i)).collect();
        let tasks: Vec<_> = ids
            .iter()
            .cloned()
            .map(|id| {
                let repo = repo.clone();
                tokio::spawn(async move { repo.record_upvote("u1", &id).await })
            })
            .collect();

        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let mut stored = repo.get_profile("u1").await.unwrap().unwrap().upvoted_on;
        stored.sort();
        assert_eq!(stored, ids);
    }

    #[tokio::test]
    async fn test_increment_upvotes_missing_request() {
        let (repo, _dir) = repository().await;
        let err = repo.increment_upvotes("missing", 1).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_requests_ranked_by_upvotes() {
        let (repo, _dir) = repository().await;
        let low = repo.create_request("Low").await.unwrap();
        let high = repo.create_request("High").await.unwrap();
        repo.increment_upvotes(&high.id, 1).await.unwrap();
        repo.increment_upvotes(&high.id, 1).await.unwrap();
        repo.increment_upvotes(&low.id, 1).await.unwrap();

        let list = repo.list_requests().await.unwrap();
        assert_eq!(list[0].id, high.id);
        assert_eq!(list[0].upvotes, 2);
        assert_eq!(list[1].id, low.id);
        assert_eq!(list[1].upvotes, 1);
    }

    #[tokio::test]
    async fn test_subscribers_receive_snapshot_after_each_write() {
        let (repo, _dir) = repository().await;
        let (initial, mut rx) = repo.subscribe_requests().await.unwrap();
        assert!(initial.is_empty());

        let request = repo.create_request("Export CSV").await.unwrap();
        let snapshot = rx.recv().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].upvotes, 0);

        repo.increment_upvotes(&request.id, 1).await.unwrap();
        let snapshot = rx.recv().await.unwrap();
        assert_eq!(snapshot[0].upvotes, 1);
    }
}
