//! Represents a site (blog) registered in a network.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A site registered in the network's site table.
///
/// The site is the storage scope for posts, comments, terms, and options.
/// Its `blog_id` is what every content row is keyed by.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Site {
    pub blog_id: i64,

    /// Network this site belongs to.
    pub network_id: i64,

    pub domain: String,

    /// Always begins and ends with `/`.
    pub path: String,

    /// When this site was created.
    pub registered: DateTime<Utc>,

    /// Last time anything about this site changed.
    pub last_updated: DateTime<Utc>,

    /// Whether search engines may index this site.
    pub public: bool,

    /// Set when the site was deleted but its content was kept.
    pub deleted: bool,
}

impl Site {
    /// Address without scheme, e.g. `example.com/blog/`.
    pub fn url(&self) -> String {
        format!("{}{}", self.domain, self.path)
    }

    /// Fully qualified site URL, always ending in `/`.
    pub fn site_url(&self) -> String {
        format!("http://{}", self.url())
    }

    /// Prefix every media locator of this site starts with.
    pub fn media_url_prefix(&self) -> String {
        format!("{}files/", self.site_url())
    }
}
