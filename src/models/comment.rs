//! Represents comments and their metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A comment left on a post.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Comment {
    pub id: i64,
    pub blog_id: i64,

    /// Post this comment belongs to.
    pub post_id: i64,

    pub author: String,
    pub author_email: String,
    pub author_url: String,
    pub author_ip: String,
    pub created_at: DateTime<Utc>,
    pub content: String,

    /// Moderation state: "1", "0", "spam" or "trash".
    pub approved: String,

    pub agent: String,
    pub comment_type: String,

    /// Comment replied to, 0 for top-level comments.
    pub parent_id: i64,

    /// Registered commenter, 0 for guests.
    pub user_id: i64,
}

impl Comment {
    /// Copy of the scalar fields, re-parented onto `post_id`.
    pub fn to_new(&self, post_id: i64, parent_id: i64) -> NewComment {
        NewComment {
            post_id,
            author: self.author.clone(),
            author_email: self.author_email.clone(),
            author_url: self.author_url.clone(),
            author_ip: self.author_ip.clone(),
            created_at: self.created_at,
            content: self.content.clone(),
            approved: self.approved.clone(),
            agent: self.agent.clone(),
            comment_type: self.comment_type.clone(),
            parent_id,
            user_id: self.user_id,
        }
    }
}

/// Insert payload for a comment.
#[derive(Clone, Debug)]
pub struct NewComment {
    pub post_id: i64,
    pub author: String,
    pub author_email: String,
    pub author_url: String,
    pub author_ip: String,
    pub created_at: DateTime<Utc>,
    pub content: String,
    pub approved: String,
    pub agent: String,
    pub comment_type: String,
    pub parent_id: i64,
    pub user_id: i64,
}

impl NewComment {
    /// An approved top-level comment by a guest.
    pub fn new(post_id: i64, author: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            post_id,
            author: author.into(),
            author_email: String::new(),
            author_url: String::new(),
            author_ip: String::new(),
            created_at: Utc::now(),
            content: content.into(),
            approved: "1".into(),
            agent: String::new(),
            comment_type: "comment".into(),
            parent_id: 0,
            user_id: 0,
        }
    }
}

/// Key-value metadata attached to a comment.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct CommentMeta {
    pub meta_id: i64,
    pub comment_id: i64,
    pub meta_key: String,
    pub meta_value: String,
}
