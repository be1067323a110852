//! src/services/content_store.rs
//!
//! ContentStore: posts, comments, terms, and their metadata, backed by
//! SQLite. Every call takes an explicit [`SiteScope`]; there is no notion of
//! a "current" site held anywhere in the process.

use crate::models::{
    comment::{Comment, CommentMeta, NewComment},
    post::{NewPost, POST_TYPE_ATTACHMENT, POST_TYPE_POST, Post, PostMeta},
    term::Term,
};
use chrono::Utc;
use sqlx::{QueryBuilder, SqlitePool, sqlite::Sqlite};
use std::{io, sync::Arc};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("This is not a multisite install.")]
    NotMultisite,
    #[error("Site not found.")]
    SiteNotFound(String),
    #[error("Network with id {0} does not exist.")]
    NetworkNotFound(i64),
    #[error("Site with that address already exists.")]
    SiteExists { domain: String, path: String },
    #[error("The following words are reserved and cannot be used as blog names: {0}")]
    ReservedSlug(String),
    #[error("Can't create user.")]
    UserCreation(String),
    #[error("unsupported resource locator `{0}`")]
    UnsupportedLocator(String),
    #[error("failed to fetch resource: {0}")]
    Fetch(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Explicit handle naming the site a content operation reads or writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SiteScope {
    pub blog_id: i64,
}

impl SiteScope {
    pub fn new(blog_id: i64) -> Self {
        Self { blog_id }
    }
}

const POST_COLUMNS: &str = "id, blog_id, author_id, published_at, modified_at, content, title, \
     excerpt, status, comment_status, ping_status, password, slug, to_ping, pinged, parent_id, \
     guid, menu_order, post_type, mime_type";

const COMMENT_COLUMNS: &str = "id, blog_id, post_id, author, author_email, author_url, \
     author_ip, created_at, content, approved, agent, comment_type, parent_id, user_id";

const TERM_SELECT: &str = "SELECT t.term_id, tt.term_taxonomy_id, t.name, t.slug, t.term_group, \
     tt.taxonomy, tt.description, tt.parent, tt.count \
     FROM terms t JOIN term_taxonomy tt ON tt.term_id = t.term_id AND tt.blog_id = t.blog_id";

/// Row counts removed by [`ContentStore::purge_content`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PurgeSummary {
    pub posts: u64,
    pub comments: u64,
    pub terms: u64,
}

#[derive(Clone)]
pub struct ContentStore {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,
}

impl ContentStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Append the `post` selection filter (type plus optional grouping term).
    fn push_post_filter(builder: &mut QueryBuilder<'_, Sqlite>, scope: SiteScope, term_id: Option<i64>) {
        builder.push(" WHERE blog_id = ");
        builder.push_bind(scope.blog_id);
        builder.push(" AND post_type = ");
        builder.push_bind(POST_TYPE_POST);
        if let Some(term_id) = term_id {
            builder.push(
                " AND id IN (SELECT tr.object_id FROM term_relationships tr \
                 JOIN term_taxonomy tt ON tt.term_taxonomy_id = tr.term_taxonomy_id \
                 WHERE tr.blog_id = ",
            );
            builder.push_bind(scope.blog_id);
            builder.push(" AND tt.term_id = ");
            builder.push_bind(term_id);
            builder.push(")");
        }
    }

    /// Count posts of type `post`, optionally restricted to one grouping term.
    pub async fn count_posts(&self, scope: SiteScope, term_id: Option<i64>) -> StorageResult<i64> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM posts");
        Self::push_post_filter(&mut builder, scope, term_id);
        let count: i64 = builder.build_query_scalar().fetch_one(&*self.db).await?;
        Ok(count)
    }

    /// Fetch the next page of `post` items strictly after `after_id`.
    ///
    /// Keyed on the identifier rather than an offset so that every item is
    /// visited exactly once even if the set changes between pages.
    pub async fn posts_after(
        &self,
        scope: SiteScope,
        term_id: Option<i64>,
        after_id: i64,
        limit: usize,
    ) -> StorageResult<Vec<Post>> {
        let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT {POST_COLUMNS} FROM posts"));
        Self::push_post_filter(&mut builder, scope, term_id);
        builder.push(" AND id > ");
        builder.push_bind(after_id);
        builder.push(" ORDER BY id ASC LIMIT ");
        builder.push_bind(limit as i64);

        let rows = builder.build_query_as::<Post>().fetch_all(&*self.db).await?;
        Ok(rows)
    }

    pub async fn get_post(&self, scope: SiteScope, id: i64) -> StorageResult<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE blog_id = ? AND id = ?"
        ))
        .bind(scope.blog_id)
        .bind(id)
        .fetch_optional(&*self.db)
        .await?;
        Ok(post)
    }

    /// Attachments whose parent is `parent_id`, in identifier order.
    pub async fn attachments(&self, scope: SiteScope, parent_id: i64) -> StorageResult<Vec<Post>> {
        let rows = sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts
             WHERE blog_id = ? AND parent_id = ? AND post_type = ?
             ORDER BY id ASC"
        ))
        .bind(scope.blog_id)
        .bind(parent_id)
        .bind(POST_TYPE_ATTACHMENT)
        .fetch_all(&*self.db)
        .await?;
        Ok(rows)
    }

    /// Insert a post and return its new identifier.
    pub async fn insert_post(&self, scope: SiteScope, post: &NewPost) -> StorageResult<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO posts (
                blog_id, author_id, published_at, modified_at, content, title, excerpt,
                status, comment_status, ping_status, password, slug, to_ping, pinged,
                parent_id, guid, menu_order, post_type, mime_type
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(scope.blog_id)
        .bind(post.author_id)
        .bind(post.published_at)
        .bind(post.modified_at)
        .bind(&post.content)
        .bind(&post.title)
        .bind(&post.excerpt)
        .bind(&post.status)
        .bind(&post.comment_status)
        .bind(&post.ping_status)
        .bind(&post.password)
        .bind(&post.slug)
        .bind(&post.to_ping)
        .bind(&post.pinged)
        .bind(post.parent_id)
        .bind(&post.guid)
        .bind(post.menu_order)
        .bind(&post.post_type)
        .bind(&post.mime_type)
        .fetch_one(&*self.db)
        .await?;

        debug!(blog_id = scope.blog_id, post_id = id, "inserted post");
        Ok(id)
    }

    /// Replace a post's body and bump its modification time.
    pub async fn update_post_content(
        &self,
        scope: SiteScope,
        id: i64,
        content: &str,
    ) -> StorageResult<()> {
        sqlx::query("UPDATE posts SET content = ?, modified_at = ? WHERE blog_id = ? AND id = ?")
            .bind(content)
            .bind(Utc::now())
            .bind(scope.blog_id)
            .bind(id)
            .execute(&*self.db)
            .await?;
        Ok(())
    }

    pub async fn post_meta(&self, scope: SiteScope, post_id: i64) -> StorageResult<Vec<PostMeta>> {
        let rows = sqlx::query_as::<_, PostMeta>(
            "SELECT meta_id, post_id, meta_key, meta_value FROM postmeta
             WHERE blog_id = ? AND post_id = ? ORDER BY meta_id ASC",
        )
        .bind(scope.blog_id)
        .bind(post_id)
        .fetch_all(&*self.db)
        .await?;
        Ok(rows)
    }

    /// Add a metadata row. Keys may repeat.
    pub async fn add_post_meta(
        &self,
        scope: SiteScope,
        post_id: i64,
        key: &str,
        value: &str,
    ) -> StorageResult<()> {
        sqlx::query(
            "INSERT INTO postmeta (blog_id, post_id, meta_key, meta_value) VALUES (?, ?, ?, ?)",
        )
        .bind(scope.blog_id)
        .bind(post_id)
        .bind(key)
        .bind(value)
        .execute(&*self.db)
        .await?;
        Ok(())
    }

    /// Comments of a post, oldest first so parents precede replies.
    pub async fn comments_for_post(
        &self,
        scope: SiteScope,
        post_id: i64,
    ) -> StorageResult<Vec<Comment>> {
        let rows = sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE blog_id = ? AND post_id = ? ORDER BY id ASC"
        ))
        .bind(scope.blog_id)
        .bind(post_id)
        .fetch_all(&*self.db)
        .await?;
        Ok(rows)
    }

    pub async fn insert_comment(&self, scope: SiteScope, comment: &NewComment) -> StorageResult<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO comments (
                blog_id, post_id, author, author_email, author_url, author_ip, created_at,
                content, approved, agent, comment_type, parent_id, user_id
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(scope.blog_id)
        .bind(comment.post_id)
        .bind(&comment.author)
        .bind(&comment.author_email)
        .bind(&comment.author_url)
        .bind(&comment.author_ip)
        .bind(comment.created_at)
        .bind(&comment.content)
        .bind(&comment.approved)
        .bind(&comment.agent)
        .bind(&comment.comment_type)
        .bind(comment.parent_id)
        .bind(comment.user_id)
        .fetch_one(&*self.db)
        .await?;
        Ok(id)
    }

    pub async fn comment_meta(
        &self,
        scope: SiteScope,
        comment_id: i64,
    ) -> StorageResult<Vec<CommentMeta>> {
        let rows = sqlx::query_as::<_, CommentMeta>(
            "SELECT meta_id, comment_id, meta_key, meta_value FROM commentmeta
             WHERE blog_id = ? AND comment_id = ? ORDER BY meta_id ASC",
        )
        .bind(scope.blog_id)
        .bind(comment_id)
        .fetch_all(&*self.db)
        .await?;
        Ok(rows)
    }

    pub async fn add_comment_meta(
        &self,
        scope: SiteScope,
        comment_id: i64,
        key: &str,
        value: &str,
    ) -> StorageResult<()> {
        sqlx::query(
            "INSERT INTO commentmeta (blog_id, comment_id, meta_key, meta_value) VALUES (?, ?, ?, ?)",
        )
        .bind(scope.blog_id)
        .bind(comment_id)
        .bind(key)
        .bind(value)
        .execute(&*self.db)
        .await?;
        Ok(())
    }

    /// Terms a post is related to, across all taxonomies.
    pub async fn post_terms(&self, scope: SiteScope, post_id: i64) -> StorageResult<Vec<Term>> {
        let rows = sqlx::query_as::<_, Term>(&format!(
            "{TERM_SELECT}
             JOIN term_relationships tr
               ON tr.term_taxonomy_id = tt.term_taxonomy_id AND tr.blog_id = tt.blog_id
             WHERE tt.blog_id = ? AND tr.object_id = ?
             ORDER BY tt.term_taxonomy_id ASC"
        ))
        .bind(scope.blog_id)
        .bind(post_id)
        .fetch_all(&*self.db)
        .await?;
        Ok(rows)
    }

    pub async fn find_term(
        &self,
        scope: SiteScope,
        taxonomy: &str,
        slug: &str,
    ) -> StorageResult<Option<Term>> {
        let term = sqlx::query_as::<_, Term>(&format!(
            "{TERM_SELECT} WHERE t.blog_id = ? AND tt.taxonomy = ? AND t.slug = ?"
        ))
        .bind(scope.blog_id)
        .bind(taxonomy)
        .bind(slug)
        .fetch_optional(&*self.db)
        .await?;
        Ok(term)
    }

    /// The taxonomy row of `term_id` within `taxonomy`.
    pub async fn term_in_taxonomy(
        &self,
        scope: SiteScope,
        taxonomy: &str,
        term_id: i64,
    ) -> StorageResult<Option<Term>> {
        let term = sqlx::query_as::<_, Term>(&format!(
            "{TERM_SELECT} WHERE t.blog_id = ? AND tt.taxonomy = ? AND t.term_id = ?"
        ))
        .bind(scope.blog_id)
        .bind(taxonomy)
        .bind(term_id)
        .fetch_optional(&*self.db)
        .await?;
        Ok(term)
    }

    pub async fn set_term_parent(
        &self,
        scope: SiteScope,
        term_taxonomy_id: i64,
        parent: i64,
    ) -> StorageResult<()> {
        sqlx::query(
            "UPDATE term_taxonomy SET parent = ? WHERE blog_id = ? AND term_taxonomy_id = ?",
        )
        .bind(parent)
        .bind(scope.blog_id)
        .bind(term_taxonomy_id)
        .execute(&*self.db)
        .await?;
        Ok(())
    }

    /// Return the term registered under `(taxonomy, slug)`, creating it with
    /// the given name, description and initial count when absent.
    pub async fn ensure_term(
        &self,
        scope: SiteScope,
        taxonomy: &str,
        name: &str,
        slug: &str,
        description: &str,
        count: i64,
    ) -> StorageResult<Term> {
        if let Some(term) = self.find_term(scope, taxonomy, slug).await? {
            return Ok(term);
        }

        let term_id: i64 = sqlx::query_scalar(
            "INSERT INTO terms (blog_id, name, slug, term_group) VALUES (?, ?, ?, 0) RETURNING term_id",
        )
        .bind(scope.blog_id)
        .bind(name)
        .bind(slug)
        .fetch_one(&*self.db)
        .await?;

        let term_taxonomy_id: i64 = sqlx::query_scalar(
            "INSERT INTO term_taxonomy (blog_id, term_id, taxonomy, description, parent, count)
             VALUES (?, ?, ?, ?, 0, ?) RETURNING term_taxonomy_id",
        )
        .bind(scope.blog_id)
        .bind(term_id)
        .bind(taxonomy)
        .bind(description)
        .bind(count)
        .fetch_one(&*self.db)
        .await?;

        debug!(blog_id = scope.blog_id, term_id, taxonomy, "created term");
        Ok(Term {
            term_id,
            term_taxonomy_id,
            name: name.to_string(),
            slug: slug.to_string(),
            term_group: 0,
            taxonomy: taxonomy.to_string(),
            description: description.to_string(),
            parent: 0,
            count,
        })
    }

    /// Relate a post to a taxonomy row. Returns false if already related.
    pub async fn relate_term(
        &self,
        scope: SiteScope,
        post_id: i64,
        term_taxonomy_id: i64,
    ) -> StorageResult<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO term_relationships (blog_id, object_id, term_taxonomy_id)
             VALUES (?, ?, ?)",
        )
        .bind(scope.blog_id)
        .bind(post_id)
        .bind(term_taxonomy_id)
        .execute(&*self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query(
            "UPDATE term_taxonomy SET count = count + 1 WHERE blog_id = ? AND term_taxonomy_id = ?",
        )
        .bind(scope.blog_id)
        .bind(term_taxonomy_id)
        .execute(&*self.db)
        .await?;
        Ok(true)
    }

    /// Distinct taxonomies with at least one term in the site.
    pub async fn taxonomies(&self, scope: SiteScope) -> StorageResult<Vec<String>> {
        let rows: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT taxonomy FROM term_taxonomy WHERE blog_id = ? ORDER BY taxonomy ASC",
        )
        .bind(scope.blog_id)
        .fetch_all(&*self.db)
        .await?;
        Ok(rows)
    }

    pub async fn get_option(&self, scope: SiteScope, name: &str) -> StorageResult<Option<String>> {
        let value = sqlx::query_scalar("SELECT value FROM site_options WHERE blog_id = ? AND name = ?")
            .bind(scope.blog_id)
            .bind(name)
            .fetch_optional(&*self.db)
            .await?;
        Ok(value)
    }

    /// Insert or overwrite a site option.
    pub async fn set_option(&self, scope: SiteScope, name: &str, value: &str) -> StorageResult<()> {
        sqlx::query(
            "INSERT INTO site_options (blog_id, name, value) VALUES (?, ?, ?)
             ON CONFLICT(blog_id, name) DO UPDATE SET value = excluded.value",
        )
        .bind(scope.blog_id)
        .bind(name)
        .bind(value)
        .execute(&*self.db)
        .await?;
        Ok(())
    }

    pub async fn delete_option(&self, scope: SiteScope, name: &str) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM site_options WHERE blog_id = ? AND name = ?")
            .bind(scope.blog_id)
            .bind(name)
            .execute(&*self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every post, comment and term of the site, with their metadata
    /// and relationships. Options are left alone.
    pub async fn purge_content(&self, scope: SiteScope) -> StorageResult<PurgeSummary> {
        let posts = self.delete_scoped("posts", scope).await?;
        self.delete_scoped("postmeta", scope).await?;
        let comments = self.delete_scoped("comments", scope).await?;
        self.delete_scoped("commentmeta", scope).await?;
        let terms = self.delete_scoped("terms", scope).await?;
        self.delete_scoped("term_taxonomy", scope).await?;
        self.delete_scoped("term_relationships", scope).await?;

        Ok(PurgeSummary {
            posts,
            comments,
            terms,
        })
    }

    /// Delete all content and every option of the site.
    pub async fn drop_site_tables(&self, scope: SiteScope) -> StorageResult<()> {
        self.purge_content(scope).await?;
        self.delete_scoped("site_options", scope).await?;
        Ok(())
    }

    async fn delete_scoped(&self, table: &'static str, scope: SiteScope) -> StorageResult<u64> {
        let result = sqlx::query(&format!("DELETE FROM {table} WHERE blog_id = ?"))
            .bind(scope.blog_id)
            .execute(&*self.db)
            .await?;
        debug!(
            blog_id = scope.blog_id,
            table,
            rows = result.rows_affected(),
            "cleared table"
        );
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::term::TAXONOMY_CATEGORY;

    async fn store() -> ContentStore {
        ContentStore::new(Arc::new(db::memory_pool().await.unwrap()))
    }

    #[tokio::test]
    async fn cursor_pages_visit_each_post_once() {
        let store = store().await;
        let scope = SiteScope::new(1);
        for i in 0..5 {
            store
                .insert_post(scope, &NewPost::post(format!("p{i}"), "body"))
                .await
                .unwrap();
        }
        store
            .insert_post(scope, &NewPost::attachment(1, "img", "http://x/a.png", "image/png"))
            .await
            .unwrap();

        assert_eq!(store.count_posts(scope, None).await.unwrap(), 5);

        let first = store.posts_after(scope, None, 0, 3).await.unwrap();
        assert_eq!(first.len(), 3);
        let last_seen = first.last().unwrap().id;
        let second = store.posts_after(scope, None, last_seen, 3).await.unwrap();
        assert_eq!(second.len(), 2);
        assert!(second.iter().all(|p| p.id > last_seen));
        assert!(second.iter().all(|p| p.post_type == POST_TYPE_POST));
    }

    #[tokio::test]
    async fn term_filter_restricts_posts() {
        let store = store().await;
        let scope = SiteScope::new(1);
        let tagged = store.insert_post(scope, &NewPost::post("a", "")).await.unwrap();
        store.insert_post(scope, &NewPost::post("b", "")).await.unwrap();

        let term = store
            .ensure_term(scope, TAXONOMY_CATEGORY, "News", "news", "", 0)
            .await
            .unwrap();
        assert!(store.relate_term(scope, tagged, term.term_taxonomy_id).await.unwrap());
        assert!(!store.relate_term(scope, tagged, term.term_taxonomy_id).await.unwrap());

        assert_eq!(store.count_posts(scope, Some(term.term_id)).await.unwrap(), 1);
        let rows = store.posts_after(scope, Some(term.term_id), 0, 10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, tagged);

        let refreshed = store.find_term(scope, TAXONOMY_CATEGORY, "news").await.unwrap().unwrap();
        assert_eq!(refreshed.count, 1);
    }

    #[tokio::test]
    async fn scopes_do_not_leak_between_sites() {
        let store = store().await;
        let one = SiteScope::new(1);
        let two = SiteScope::new(2);
        let id = store.insert_post(one, &NewPost::post("mine", "")).await.unwrap();
        store.add_post_meta(one, id, "k", "v").await.unwrap();

        assert!(store.get_post(two, id).await.unwrap().is_none());
        assert!(store.post_meta(two, id).await.unwrap().is_empty());
        assert_eq!(store.count_posts(two, None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn purge_content_clears_only_target_site() {
        let store = store().await;
        let one = SiteScope::new(1);
        let two = SiteScope::new(2);
        for scope in [one, two] {
            let id = store.insert_post(scope, &NewPost::post("t", "")).await.unwrap();
            store.add_post_meta(scope, id, "k", "v").await.unwrap();
            store
                .insert_comment(scope, &NewComment::new(id, "ann", "hi"))
                .await
                .unwrap();
            store
                .ensure_term(scope, TAXONOMY_CATEGORY, "News", "news", "", 0)
                .await
                .unwrap();
        }
        store.set_option(one, "blogname", "One").await.unwrap();

        let summary = store.purge_content(one).await.unwrap();
        assert_eq!(
            summary,
            PurgeSummary {
                posts: 1,
                comments: 1,
                terms: 1
            }
        );
        assert_eq!(store.count_posts(one, None).await.unwrap(), 0);
        assert_eq!(store.count_posts(two, None).await.unwrap(), 1);
        assert_eq!(store.get_option(one, "blogname").await.unwrap().as_deref(), Some("One"));

        store.drop_site_tables(one).await.unwrap();
        assert!(store.get_option(one, "blogname").await.unwrap().is_none());
    }
}
