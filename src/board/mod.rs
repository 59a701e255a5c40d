//! Request board workflows: profile lifecycle, request submission and upvotes.
//!
//! Handlers in `api` are thin transport wrappers around these methods.

use std::sync::Arc;

use async_trait::async_trait;

use crate::auth::CallerContext;
use crate::client::Upvoter;
use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{FeatureRequest, IdentityUser, Profile, MAX_REQUEST_TEXT_CHARS};

#[derive(Clone)]
pub struct RequestBoard {
    repo: Arc<Repository>,
}

impl RequestBoard {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &Arc<Repository> {
        &self.repo
    }

    pub fn say_hello(name: &str) -> String {
        format!("Hello, {}", name)
    }

    /// Create the profile document for a newly registered identity.
    pub async fn on_identity_created(&self, user: &IdentityUser) -> Result<Profile, AppError> {
        let profile = self.repo.set_profile(&user.uid, user.email.as_deref()).await?;
        tracing::info!(uid = %user.uid, "Created profile for new identity");
        Ok(profile)
    }

    /// Remove the profile document of a deleted identity. A missing profile is fine.
    pub async fn on_identity_deleted(&self, user: &IdentityUser) -> Result<(), AppError> {
        if self.repo.delete_profile(&user.uid).await? {
            tracing::info!(uid = %user.uid, "Deleted profile for removed identity");
        } else {
            tracing::debug!(uid = %user.uid, "No profile to delete");
        }
        Ok(())
    }

    /// Persist a new request. Text may be empty but not longer than
    /// [`MAX_REQUEST_TEXT_CHARS`] UTF-16 code units.
    pub async fn submit_request(
        &self,
        caller: &CallerContext,
        text: &str,
    ) -> Result<FeatureRequest, AppError> {
        let auth = caller.require_auth()?;

        if text.encode_utf16().count() > MAX_REQUEST_TEXT_CHARS {
            return Err(AppError::InvalidArgument(format!(
                "Request must be no more than {} characters long.",
                MAX_REQUEST_TEXT_CHARS
            )));
        }

        let request = self.repo.create_request(text).await?;
        tracing::info!(uid = %auth.uid, request_id = %request.id, "Request submitted");
        Ok(request)
    }

    /// Record the caller's vote on `request_id`, then bump the request's counter.
    ///
    /// The counter only moves after the profile write lands. If the counter
    /// update fails the recorded vote stays; nothing is rolled back.
    pub async fn upvote(&self, caller: &CallerContext, request_id: &str) -> Result<(), AppError> {
        let auth = caller.require_auth()?;
        tracing::info!(uid = %auth.uid, request_id, "Upvote requested");

        self.repo.record_upvote(&auth.uid, request_id).await?;

        let upvotes = self.repo.increment_upvotes(request_id, 1).await.map_err(|e| {
            tracing::error!(
                uid = %auth.uid,
                request_id,
                "Vote recorded on profile but counter update failed: {}",
                e
            );
            e
        })?;

        tracing::debug!(request_id, upvotes, "Upvote counted");
        Ok(())
    }

    /// Bind the board to a caller, for in-process clients.
    pub fn session(&self, caller: CallerContext) -> CallerSession {
        CallerSession {
            board: self.clone(),
            caller,
        }
    }
}

/// A board bound to one caller identity.
#[derive(Clone)]
pub struct CallerSession {
    board: RequestBoard,
    caller: CallerContext,
}

#[async_trait]
impl Upvoter for CallerSession {
    async fn upvote(&self, request_id: &str) -> Result<(), AppError> {
        self.board.upvote(&self.caller, request_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::LiveRequestList;
    use crate::db::init_database;
    use tempfile::TempDir;

    async fn board() -> (RequestBoard, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let pool = init_database(&temp_dir.path().join("board.sqlite"))
            .await
            .expect("Failed to init DB");
        (RequestBoard::new(Arc::new(Repository::new(pool))), temp_dir)
    }

    fn user(uid: &str) -> IdentityUser {
        IdentityUser {
            uid: uid.to_string(),
            email: Some(format!("{}@example.com", uid)),
        }
    }

    #[test]
    fn test_say_hello() {
        assert_eq!(RequestBoard::say_hello("Tapiwa"), "Hello, Tapiwa");
    }

    #[tokio::test]
    async fn test_identity_lifecycle() {
        let (board, _dir) = board().await;

        let profile = board.on_identity_created(&user("u1")).await.unwrap();
        assert_eq!(profile.id, "u1");
        assert_eq!(profile.email.as_deref(), Some("u1@example.com"));
        assert!(profile.upvoted_on.is_empty());

        board.on_identity_deleted(&user("u1")).await.unwrap();
        assert!(board.repository().get_profile("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_deleting_unknown_identity_succeeds() {
        let (board, _dir) = board().await;
        board.on_identity_deleted(&user("never-created")).await.unwrap();
    }

    #[tokio::test]
    async fn test_submit_request() {
        let (board, _dir) = board().await;
        let caller = CallerContext::signed_in("u1");

        let request = board.submit_request(&caller, "Add dark mode").await.unwrap();
        assert_eq!(request.text, "Add dark mode");
        assert_eq!(request.upvotes, 0);

        let stored = board.repository().get_request(&request.id).await.unwrap();
        assert_eq!(stored, Some(request));
    }

    #[tokio::test]
    async fn test_submit_request_length_limit() {
        let (board, _dir) = board().await;
        let caller = CallerContext::signed_in("u1");

        let exactly = "a".repeat(MAX_REQUEST_TEXT_CHARS);
        assert!(board.submit_request(&caller, &exactly).await.is_ok());
        assert!(board.submit_request(&caller, "").await.is_ok());

        // Counted in UTF-16 code units, not bytes
        let accented = "é".repeat(MAX_REQUEST_TEXT_CHARS);
        assert!(board.submit_request(&caller, &accented).await.is_ok());

        // Each emoji is a surrogate pair
        let fifteen_emoji = "😀".repeat(15);
        assert!(board.submit_request(&caller, &fifteen_emoji).await.is_ok());
        let sixteen_emoji = "😀".repeat(16);
        let err = board.submit_request(&caller, &sixteen_emoji).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));

        let too_long = "a".repeat(MAX_REQUEST_TEXT_CHARS + 1);
        let err = board.submit_request(&caller, &too_long).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));

        let list = board.repository().list_requests().await.unwrap();
        assert_eq!(list.len(), 4);
    }

    #[tokio::test]
    async fn test_anonymous_caller_has_no_side_effects() {
        let (board, _dir) = board().await;
        let anonymous = CallerContext::anonymous();

        let err = board.submit_request(&anonymous, "Hi").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated(_)));

        let request = board
            .submit_request(&CallerContext::signed_in("u1"), "Hi")
            .await
            .unwrap();
        let err = board.upvote(&anonymous, &request.id).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated(_)));

        let list = board.repository().list_requests().await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].upvotes, 0);
    }

    #[tokio::test]
    async fn test_upvote_records_vote_and_increments() {
        let (board, _dir) = board().await;
        board.on_identity_created(&user("u1")).await.unwrap();
        let caller = CallerContext::signed_in("u1");

        let request = board.submit_request(&caller, "Keyboard shortcuts").await.unwrap();
        board.repository().increment_upvotes(&request.id, 3).await.unwrap();

        board.upvote(&caller, &request.id).await.unwrap();

        let profile = board.repository().get_profile("u1").await.unwrap().unwrap();
        assert!(profile.has_upvoted(&request.id));
        let stored = board.repository().get_request(&request.id).await.unwrap().unwrap();
        assert_eq!(stored.upvotes, 4);
    }

    #[tokio::test]
    async fn test_second_upvote_fails_and_leaves_counter() {
        let (board, _dir) = board().await;
        board.on_identity_created(&user("u1")).await.unwrap();
        let caller = CallerContext::signed_in("u1");
        let request = board.submit_request(&caller, "Offline mode").await.unwrap();

        board.upvote(&caller, &request.id).await.unwrap();
        let err = board.upvote(&caller, &request.id).await.unwrap_err();
        assert!(matches!(err, AppError::FailedPrecondition(_)));

        let stored = board.repository().get_request(&request.id).await.unwrap().unwrap();
        assert_eq!(stored.upvotes, 1);
    }

    #[tokio::test]
    async fn test_upvote_unknown_request_keeps_recorded_vote() {
        let (board, _dir) = board().await;
        board.on_identity_created(&user("u1")).await.unwrap();
        let caller = CallerContext::signed_in("u1");

        let err = board.upvote(&caller, "no-such-request").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let profile = board.repository().get_profile("u1").await.unwrap().unwrap();
        assert!(profile.has_upvoted("no-such-request"));
    }

    #[tokio::test]
    async fn test_concurrent_upvotes_by_one_user_all_count() {
        let (board, _dir) = board().await;
        board.on_identity_created(&user("u1")).await.unwrap();
        let caller = CallerContext::signed_in("u1");

        let first = board.submit_request(&caller, "First").await.unwrap();
        let second = board.submit_request(&caller, "Second").await.unwrap();

        let (a, b) = tokio::join!(
            board.upvote(&caller, &first.id),
            board.upvote(&caller, &second.id)
        );
        a.unwrap();
        b.unwrap();

        let profile = board.repository().get_profile("u1").await.unwrap().unwrap();
        assert!(profile.has_upvoted(&first.id));
        assert!(profile.has_upvoted(&second.id));
        for request in board.repository().list_requests().await.unwrap() {
            assert_eq!(request.upvotes, 1);
        }
    }

    #[tokio::test]
    async fn test_live_list_upvotes_through_session() {
        let (board, _dir) = board().await;
        board.on_identity_created(&user("u1")).await.unwrap();
        let caller = CallerContext::signed_in("u1");
        let request = board.submit_request(&caller, "Markdown support").await.unwrap();

        let list = LiveRequestList::new(Arc::new(board.session(caller)));
        let (initial, rx) = board.repository().subscribe_requests().await.unwrap();
        let _task = list.attach(initial, rx);

        list.request_upvote(&request.id).await;
        // Duplicate is logged by the list, not returned
        list.request_upvote(&request.id).await;

        let stored = board.repository().get_request(&request.id).await.unwrap().unwrap();
        assert_eq!(stored.upvotes, 1);

        let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
        while list.current_list()[0].upvotes != 1 {
            assert!(tokio::time::Instant::now() < deadline, "snapshot never arrived");
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
    }
}
