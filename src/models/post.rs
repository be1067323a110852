//! Represents posts, attachments, and their metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Post type of regular content items.
pub const POST_TYPE_POST: &str = "post";

/// Post type of uploaded media. Attachments point at their parent through
/// `parent_id` and at their binary resource through `guid`.
pub const POST_TYPE_ATTACHMENT: &str = "attachment";

/// A content item stored in a site.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Post {
    /// Identifier assigned by the owning site.
    pub id: i64,

    /// Site that owns this post.
    pub blog_id: i64,

    pub author_id: i64,
    pub published_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,

    /// Body. May embed attachment locators.
    pub content: String,

    pub title: String,
    pub excerpt: String,

    /// Publication status (e.g. "publish", "draft").
    pub status: String,

    pub comment_status: String,
    pub ping_status: String,
    pub password: String,

    /// URL slug. Not required to be unique.
    pub slug: String,

    pub to_ping: String,
    pub pinged: String,

    /// Parent post, 0 when none.
    pub parent_id: i64,

    /// Resource locator for attachments, permalink otherwise.
    pub guid: String,

    pub menu_order: i64,
    pub post_type: String,
    pub mime_type: String,
}

impl Post {
    /// Copy of the scalar fields, ready to be inserted elsewhere.
    pub fn to_new(&self) -> NewPost {
        NewPost {
            author_id: self.author_id,
            published_at: self.published_at,
            modified_at: self.modified_at,
            content: self.content.clone(),
            title: self.title.clone(),
            excerpt: self.excerpt.clone(),
            status: self.status.clone(),
            comment_status: self.comment_status.clone(),
            ping_status: self.ping_status.clone(),
            password: self.password.clone(),
            slug: self.slug.clone(),
            to_ping: self.to_ping.clone(),
            pinged: self.pinged.clone(),
            parent_id: self.parent_id,
            guid: self.guid.clone(),
            menu_order: self.menu_order,
            post_type: self.post_type.clone(),
            mime_type: self.mime_type.clone(),
        }
    }
}

/// Insert payload for a post. The owning site and identifier are assigned
/// by the content store.
#[derive(Clone, Debug)]
pub struct NewPost {
    pub author_id: i64,
    pub published_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub content: String,
    pub title: String,
    pub excerpt: String,
    pub status: String,
    pub comment_status: String,
    pub ping_status: String,
    pub password: String,
    pub slug: String,
    pub to_ping: String,
    pub pinged: String,
    pub parent_id: i64,
    pub guid: String,
    pub menu_order: i64,
    pub post_type: String,
    pub mime_type: String,
}

impl NewPost {
    /// A published post of type `post` with the given title and body.
    pub fn post(title: impl Into<String>, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            author_id: 0,
            published_at: now,
            modified_at: now,
            content: content.into(),
            title: title.into(),
            excerpt: String::new(),
            status: "publish".into(),
            comment_status: "open".into(),
            ping_status: "open".into(),
            password: String::new(),
            slug: String::new(),
            to_ping: String::new(),
            pinged: String::new(),
            parent_id: 0,
            guid: String::new(),
            menu_order: 0,
            post_type: POST_TYPE_POST.into(),
            mime_type: String::new(),
        }
    }

    /// An attachment under `parent_id` whose resource lives at `guid`.
    pub fn attachment(
        parent_id: i64,
        title: impl Into<String>,
        guid: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            parent_id,
            guid: guid.into(),
            mime_type: mime_type.into(),
            status: "inherit".into(),
            post_type: POST_TYPE_ATTACHMENT.into(),
            ..Self::post(title, "")
        }
    }
}

/// Key-value metadata attached to a post.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct PostMeta {
    pub meta_id: i64,
    pub post_id: i64,
    pub meta_key: String,
    pub meta_value: String,
}
