//! Represents a network, the top-level container for sites.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A multisite network.
///
/// Every site belongs to exactly one network. The network decides whether new
/// sites are addressed by subdomain (`blog.example.com`) or by subdirectory
/// (`example.com/blog/`).
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Network {
    pub id: i64,

    /// Primary domain of the network (e.g. "example.com").
    pub domain: String,

    /// Base path of the network, normally "/".
    pub path: String,

    /// Whether new sites get their own subdomain.
    pub subdomain_install: bool,
}

impl Network {
    /// Network domain with any leading `www.` removed.
    pub fn bare_domain(&self) -> &str {
        self.domain.strip_prefix("www.").unwrap_or(&self.domain)
    }
}
