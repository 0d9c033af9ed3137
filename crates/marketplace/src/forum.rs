//! Forum posts, comments and upvotes.

use database::forum::{self as store, NewComment, NewPost};
use database::validation::{validate_text, MAX_BODY_LENGTH, MAX_TITLE_LENGTH};
use database::{Comment, Database, ForumPost, UpvoteStatus, UpvoteTarget};
use serde::Deserialize;
use tracing::info;

use crate::error::{MarketplaceError, Result};

/// A new post as submitted by a client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPostRequest {
    pub author_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub course: Option<String>,
}

/// Forum rules on top of the database.
#[derive(Debug, Clone)]
pub struct Forum {
    db: Database,
}

impl Forum {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create a post. Title and content are checked before anything is stored.
    pub async fn create_post(&self, request: NewPostRequest) -> Result<ForumPost> {
        validate_text("authorId", &request.author_id, MAX_TITLE_LENGTH)?;
        validate_text("title", &request.title, MAX_TITLE_LENGTH)?;
        validate_text("content", &request.content, MAX_BODY_LENGTH)?;

        let course = request
            .course
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        let post = store::create_post(
            self.db.pool(),
            &NewPost {
                author_id: request.author_id,
                title: request.title,
                content: request.content,
                course,
            },
        )
        .await?;

        info!(post_id = %post.id, author_id = %post.author_id, "Created forum post");
        Ok(post)
    }

    /// Posts, newest first, optionally for one course.
    pub async fn list_posts(&self, course: Option<&str>) -> Result<Vec<ForumPost>> {
        let course = course.map(str::trim).filter(|c| !c.is_empty());
        Ok(store::list_posts(self.db.pool(), course).await?)
    }

    pub async fn get_post(&self, post_id: &str) -> Result<ForumPost> {
        Ok(store::get_post(self.db.pool(), post_id).await?)
    }

    /// Comment on a post.
    pub async fn add_comment(
        &self,
        post_id: &str,
        author_id: &str,
        content: &str,
    ) -> Result<Comment> {
        validate_text("authorId", author_id, MAX_TITLE_LENGTH)?;
        validate_text("content", content, MAX_BODY_LENGTH)?;

        Ok(store::create_comment(
            self.db.pool(),
            post_id,
            &NewComment {
                author_id: author_id.to_string(),
                content: content.to_string(),
            },
        )
        .await?)
    }

    /// Comments on a post, oldest first.
    pub async fn list_comments(&self, post_id: &str) -> Result<Vec<Comment>> {
        // Distinguish a missing post from one without comments.
        store::get_post(self.db.pool(), post_id).await?;
        Ok(store::list_comments(self.db.pool(), post_id).await?)
    }

    /// Add `user_id`'s upvote if absent, remove it if present.
    pub async fn toggle_upvote(&self, target: &UpvoteTarget, user_id: &str) -> Result<UpvoteStatus> {
        validate_text("userId", user_id, MAX_TITLE_LENGTH)?;
        Ok(store::toggle_upvote(self.db.pool(), target, user_id).await?)
    }

    pub async fn upvote_status(&self, target: &UpvoteTarget, user_id: &str) -> Result<UpvoteStatus> {
        Ok(store::upvote_status(self.db.pool(), target, user_id).await?)
    }

    /// Delete a post and everything under it. Only the author may do this.
    pub async fn delete_post(&self, post_id: &str, requester_id: &str) -> Result<()> {
        let post = store::get_post(self.db.pool(), post_id).await?;
        if post.author_id != requester_id {
            return Err(MarketplaceError::Forbidden(
                "only the author can delete a post".to_string(),
            ));
        }

        store::delete_post_cascade(self.db.pool(), post_id).await?;
        Ok(())
    }

    /// Delete a comment. Only its author may do this.
    pub async fn delete_comment(
        &self,
        post_id: &str,
        comment_id: &str,
        requester_id: &str,
    ) -> Result<()> {
        let comment = store::get_comment(self.db.pool(), post_id, comment_id).await?;
        if comment.author_id != requester_id {
            return Err(MarketplaceError::Forbidden(
                "only the author can delete a comment".to_string(),
            ));
        }

        store::delete_comment(self.db.pool(), post_id, comment_id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn forum() -> Forum {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        Forum::new(db)
    }

    fn post(author: &str, title: &str, content: &str) -> NewPostRequest {
        NewPostRequest {
            author_id: author.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            course: Some("CS2100".to_string()),
        }
    }

    #[tokio::test]
    async fn test_blank_post_is_rejected_before_storing() {
        let forum = forum().await;

        assert!(matches!(
            forum.create_post(post("alice", "  ", "body")).await,
            Err(MarketplaceError::Validation(_))
        ));
        assert!(matches!(
            forum.create_post(post("alice", "Title", "")).await,
            Err(MarketplaceError::Validation(_))
        ));
        assert!(forum.list_posts(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upvote_toggle_round_trip() {
        let forum = forum().await;
        let created = forum
            .create_post(post("alice", "Pipelining", "How do hazards work?"))
            .await
            .unwrap();
        let target = UpvoteTarget::Post(created.id.clone());

        let on = forum.toggle_upvote(&target, "bob").await.unwrap();
        assert_eq!((on.upvote_count, on.has_upvoted), (1, true));

        let other = forum.toggle_upvote(&target, "carol").await.unwrap();
        assert_eq!(other.upvote_count, 2);

        let off = forum.toggle_upvote(&target, "bob").await.unwrap();
        assert_eq!((off.upvote_count, off.has_upvoted), (1, false));

        let status = forum.upvote_status(&target, "carol").await.unwrap();
        assert!(status.has_upvoted);
        assert_eq!(status.upvote_count, 1);
    }

    #[tokio::test]
    async fn test_only_author_deletes_post() {
        let forum = forum().await;
        let created = forum
            .create_post(post("alice", "Cache", "Direct mapped vs set associative"))
            .await
            .unwrap();
        forum.add_comment(&created.id, "bob", "Set associative!").await.unwrap();

        assert!(matches!(
            forum.delete_post(&created.id, "bob").await,
            Err(MarketplaceError::Forbidden(_))
        ));

        forum.delete_post(&created.id, "alice").await.unwrap();
        assert!(matches!(
            forum.get_post(&created.id).await,
            Err(MarketplaceError::NotFound { .. })
        ));
        assert!(matches!(
            forum.list_comments(&created.id).await,
            Err(MarketplaceError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_comment_deletion_rights() {
        let forum = forum().await;
        let created = forum
            .create_post(post("alice", "Question", "Anyone has notes?"))
            .await
            .unwrap();
        let by_bob = forum.add_comment(&created.id, "bob", "Yes").await.unwrap();
        let by_carol = forum.add_comment(&created.id, "carol", "Me too").await.unwrap();

        assert!(matches!(
            forum.delete_comment(&created.id, &by_bob.id, "carol").await,
            Err(MarketplaceError::Forbidden(_))
        ));
        // The post author has no say over other people's comments.
        assert!(matches!(
            forum.delete_comment(&created.id, &by_carol.id, "alice").await,
            Err(MarketplaceError::Forbidden(_))
        ));
        assert!(matches!(
            forum.delete_comment(&created.id, "no-such-comment", "alice").await,
            Err(MarketplaceError::NotFound { .. })
        ));

        forum.delete_comment(&created.id, &by_bob.id, "bob").await.unwrap();
        forum.delete_comment(&created.id, &by_carol.id, "carol").await.unwrap();

        assert!(forum.list_comments(&created.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_created_post_echoes_input() {
        let forum = forum().await;
        let created = forum
            .create_post(post("alice", "  Recursion help ", "Tail calls?"))
            .await
            .unwrap();

        assert_eq!(created.title, "  Recursion help ");
        assert_eq!(created.content, "Tail calls?");
        assert_eq!(created.author_id, "alice");
        assert_eq!(created.course.as_deref(), Some("CS2100"));
    }

    #[tokio::test]
    async fn test_course_filter() {
        let forum = forum().await;
        forum.create_post(post("alice", "A", "a")).await.unwrap();
        let mut other = post("bob", "B", "b");
        other.course = None;
        forum.create_post(other).await.unwrap();

        assert_eq!(forum.list_posts(Some("CS2100")).await.unwrap().len(), 1);
        assert_eq!(forum.list_posts(Some(" ")).await.unwrap().len(), 2);
        assert_eq!(forum.list_posts(None).await.unwrap().len(), 2);
    }
}
