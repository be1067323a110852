//! src/services/migrator.rs
//!
//! ContentMigrator: copies posts of one site into another together with
//! their metadata, attachments, comments and term assignments.
//!
//! Posts are read in fixed-size batches using an id cursor. For every post
//! all source rows are read first; only then is anything written to the
//! destination, and dependents are written only once the post itself exists
//! there. Failures are recorded per post in the returned [`MigrationReport`]
//! and never abort the run.

use crate::{
    models::{
        comment::{Comment, CommentMeta},
        post::{Post, PostMeta},
        site::Site,
        term::Term,
    },
    services::{
        content_store::{ContentStore, SiteScope, StorageResult},
        media_store::MediaStore,
    },
};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Number of posts read per batch.
pub const BATCH_SIZE: usize = 500;

/// Deepest term hierarchy followed when carrying terms over.
const MAX_TERM_DEPTH: usize = 32;

#[derive(Debug, Clone)]
pub struct MoveOptions {
    /// Only move posts related to this grouping term.
    pub term_id: Option<i64>,
    pub batch_size: usize,
}

impl Default for MoveOptions {
    fn default() -> Self {
        Self {
            term_id: None,
            batch_size: BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemStatus {
    Migrated {
        new_id: i64,
        attachments: usize,
        comments: usize,
        /// Dependents that could not be copied.
        warnings: Vec<String>,
    },
    Failed {
        reason: String,
    },
}

/// What happened to one source post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemOutcome {
    pub source_id: i64,
    pub status: ItemStatus,
}

#[derive(Debug, Clone, Default)]
pub struct MigrationReport {
    /// Matching posts counted before the first batch.
    pub total: i64,
    /// Size of every batch, in order.
    pub batches: Vec<usize>,
    pub outcomes: Vec<ItemOutcome>,
}

impl MigrationReport {
    pub fn migrated(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, ItemStatus::Migrated { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.migrated()
    }

    /// Source id and reason of every post that was not created.
    pub fn failures(&self) -> impl Iterator<Item = (i64, &str)> {
        self.outcomes.iter().filter_map(|o| match &o.status {
            ItemStatus::Failed { reason } => Some((o.source_id, reason.as_str())),
            ItemStatus::Migrated { .. } => None,
        })
    }

    /// New id assigned to a source post, if it was migrated.
    pub fn new_id(&self, source_id: i64) -> Option<i64> {
        self.outcomes.iter().find_map(|o| match o.status {
            ItemStatus::Migrated { new_id, .. } if o.source_id == source_id => Some(new_id),
            _ => None,
        })
    }
}

/// Everything read from the source site for one post.
struct SourceItem {
    post: Post,
    meta: Vec<PostMeta>,
    attachments: Vec<(Post, Vec<PostMeta>)>,
    comments: Vec<(Comment, Vec<CommentMeta>)>,
    /// Each assigned term preceded by its ancestors, root first.
    terms: Vec<Vec<Term>>,
}

#[derive(Clone)]
pub struct ContentMigrator {
    content: ContentStore,
    media: MediaStore,
}

impl ContentMigrator {
    pub fn new(content: ContentStore, media: MediaStore) -> Self {
        Self { content, media }
    }

    /// Move every matching post of `source` into `dest`.
    ///
    /// `sites` are the sites whose media locators may be read from disk.
    /// Source reads that fail at the database level abort the run; every
    /// destination write failure is recorded in the report instead.
    pub async fn move_posts(
        &self,
        source: &Site,
        dest: &Site,
        sites: &[Site],
        opts: &MoveOptions,
    ) -> StorageResult<MigrationReport> {
        let src = SiteScope::new(source.blog_id);
        let batch_size = opts.batch_size.max(1);

        let mut report = MigrationReport {
            total: self.content.count_posts(src, opts.term_id).await?,
            ..Default::default()
        };
        info!(
            source = source.blog_id,
            dest = dest.blog_id,
            term_id = ?opts.term_id,
            total = report.total,
            "moving posts"
        );

        let mut id_map: HashMap<i64, i64> = HashMap::new();
        let mut last_seen = 0;
        loop {
            let batch = self
                .content
                .posts_after(src, opts.term_id, last_seen, batch_size)
                .await?;
            if batch.is_empty() {
                break;
            }
            let fetched = batch.len();
            report.batches.push(fetched);
            debug!(batch = report.batches.len(), size = fetched, "processing batch");

            for post in batch {
                last_seen = post.id;
                let item = self.read_source_item(src, post).await?;
                let outcome = self.write_item(dest, sites, item, &mut id_map).await;
                if let ItemStatus::Failed { reason } = &outcome.status {
                    warn!(post_id = outcome.source_id, "post failed to be moved: {}", reason);
                }
                report.outcomes.push(outcome);
            }

            if fetched < batch_size {
                break;
            }
        }

        info!(
            migrated = report.migrated(),
            failed = report.failed(),
            batches = report.batches.len(),
            "move finished"
        );
        Ok(report)
    }

    /// Read a post's metadata, attachments, comments and terms from the
    /// source site. Comments are keyed by the source post id.
    async fn read_source_item(&self, src: SiteScope, post: Post) -> StorageResult<SourceItem> {
        let meta = self.content.post_meta(src, post.id).await?;

        let mut attachments = Vec::new();
        for attachment in self.content.attachments(src, post.id).await? {
            let attachment_meta = self.content.post_meta(src, attachment.id).await?;
            attachments.push((attachment, attachment_meta));
        }

        let mut comments = Vec::new();
        for comment in self.content.comments_for_post(src, post.id).await? {
            let comment_meta = self.content.comment_meta(src, comment.id).await?;
            comments.push((comment, comment_meta));
        }

        let mut terms = Vec::new();
        for term in self.content.post_terms(src, post.id).await? {
            terms.push(self.term_lineage(src, term).await?);
        }

        Ok(SourceItem {
            post,
            meta,
            attachments,
            comments,
            terms,
        })
    }

    /// `term` with its ancestors, root first. Stops at a missing parent or
    /// a cycle.
    async fn term_lineage(&self, src: SiteScope, term: Term) -> StorageResult<Vec<Term>> {
        let mut lineage = vec![term];
        while lineage.len() < MAX_TERM_DEPTH {
            let (taxonomy, parent_id) = match lineage.last() {
                Some(current) => (current.taxonomy.clone(), current.parent),
                None => break,
            };
            if parent_id == 0 || lineage.iter().any(|t| t.term_id == parent_id) {
                break;
            }
            let parent = self.content.term_in_taxonomy(src, &taxonomy, parent_id).await?;
            match parent {
                Some(parent) => lineage.push(parent),
                None => break,
            }
        }
        lineage.reverse();
        Ok(lineage)
    }

    async fn write_item(
        &self,
        dest: &Site,
        sites: &[Site],
        item: SourceItem,
        id_map: &mut HashMap<i64, i64>,
    ) -> ItemOutcome {
        let dst = SiteScope::new(dest.blog_id);
        let source_id = item.post.id;

        let mut new_post = item.post.to_new();
        new_post.parent_id = id_map.get(&item.post.parent_id).copied().unwrap_or(0);
        let new_id = match self.content.insert_post(dst, &new_post).await {
            Ok(id) => id,
            Err(err) => {
                return ItemOutcome {
                    source_id,
                    status: ItemStatus::Failed {
                        reason: err.to_string(),
                    },
                };
            }
        };
        id_map.insert(source_id, new_id);
        debug!(source_id, new_id, "post created in destination");

        let mut warnings = Vec::new();

        for meta in &item.meta {
            if let Err(err) = self
                .content
                .add_post_meta(dst, new_id, &meta.meta_key, &meta.meta_value)
                .await
            {
                warnings.push(format!("meta `{}`: {}", meta.meta_key, err));
            }
        }

        let mut body = item.post.content.clone();
        let mut attachments = 0;
        for (attachment, attachment_meta) in &item.attachments {
            match self
                .copy_attachment(dest, sites, new_id, attachment, attachment_meta)
                .await
            {
                Ok(new_locator) => {
                    attachments += 1;
                    if attachment.guid.is_empty() || !body.contains(&attachment.guid) {
                        continue;
                    }
                    body = body.replace(&attachment.guid, &new_locator);
                    if let Err(err) = self.content.update_post_content(dst, new_id, &body).await {
                        warnings.push(format!("rewrite body for attachment {}: {}", attachment.id, err));
                    }
                }
                Err(err) => {
                    warn!(attachment = attachment.id, "attachment failed to be moved: {}", err);
                    warnings.push(format!("attachment {}: {}", attachment.id, err));
                }
            }
        }

        let mut comment_map: HashMap<i64, i64> = HashMap::new();
        let mut comments = 0;
        for (comment, comment_meta) in &item.comments {
            let parent_id = comment_map.get(&comment.parent_id).copied().unwrap_or(0);
            let new_comment_id = match self
                .content
                .insert_comment(dst, &comment.to_new(new_id, parent_id))
                .await
            {
                Ok(id) => id,
                Err(err) => {
                    warn!(comment = comment.id, "comment failed to be moved: {}", err);
                    warnings.push(format!("comment {}: {}", comment.id, err));
                    continue;
                }
            };
            comment_map.insert(comment.id, new_comment_id);
            comments += 1;

            for meta in comment_meta {
                if let Err(err) = self
                    .content
                    .add_comment_meta(dst, new_comment_id, &meta.meta_key, &meta.meta_value)
                    .await
                {
                    warnings.push(format!("comment {} meta `{}`: {}", comment.id, meta.meta_key, err));
                }
            }
        }

        for lineage in &item.terms {
            if let Err(err) = self.assign_term(dst, new_id, lineage).await {
                let slug = lineage.last().map(|t| t.slug.as_str()).unwrap_or_default();
                warnings.push(format!("term `{}`: {}", slug, err));
            }
        }

        ItemOutcome {
            source_id,
            status: ItemStatus::Migrated {
                new_id,
                attachments,
                comments,
                warnings,
            },
        }
    }

    /// Re-host an attachment's resource, register it under `new_parent` and
    /// return the new locator.
    async fn copy_attachment(
        &self,
        dest: &Site,
        sites: &[Site],
        new_parent: i64,
        attachment: &Post,
        meta: &[PostMeta],
    ) -> StorageResult<String> {
        let dst = SiteScope::new(dest.blog_id);
        let stored = self.media.rehost(&attachment.guid, sites, dest).await?;
        debug!(
            from = %attachment.guid,
            key = %stored.key,
            size = stored.size_bytes,
            etag = %stored.etag,
            "re-hosted attachment"
        );

        let mut new_attachment = attachment.to_new();
        new_attachment.parent_id = new_parent;
        new_attachment.guid = stored.locator.clone();
        let new_attachment_id = self.content.insert_post(dst, &new_attachment).await?;

        for row in meta {
            self.content
                .add_post_meta(dst, new_attachment_id, &row.meta_key, &row.meta_value)
                .await?;
        }
        Ok(stored.locator)
    }

    /// Relate `post_id` to the destination's term with the same taxonomy
    /// and slug as the last entry of `lineage`. Terms missing from the
    /// destination are created under the destination copy of their parent.
    async fn assign_term(&self, dst: SiteScope, post_id: i64, lineage: &[Term]) -> StorageResult<()> {
        let mut parent = 0;
        let mut target = None;
        for term in lineage {
            let ensured = match self.content.find_term(dst, &term.taxonomy, &term.slug).await? {
                Some(existing) => existing,
                None => {
                    let created = self
                        .content
                        .ensure_term(dst, &term.taxonomy, &term.name, &term.slug, &term.description, 0)
                        .await?;
                    if parent != 0 {
                        self.content
                            .set_term_parent(dst, created.term_taxonomy_id, parent)
                            .await?;
                    }
                    created
                }
            };
            parent = ensured.term_id;
            target = Some(ensured);
        }

        if let Some(target) = target {
            self.content
                .relate_term(dst, post_id, target.term_taxonomy_id)
                .await?;
        }
        Ok(())
    }
}
