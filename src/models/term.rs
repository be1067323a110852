//! Represents terms and the taxonomies they are registered in.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Taxonomy used for post categories.
pub const TAXONOMY_CATEGORY: &str = "category";

/// A term joined with one of its taxonomy rows.
///
/// `term_taxonomy_id` is what posts are related to; `term_id` is the
/// grouping identifier operators pass on the command line.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Term {
    pub term_id: i64,
    pub term_taxonomy_id: i64,
    pub name: String,
    pub slug: String,
    pub term_group: i64,
    pub taxonomy: String,
    pub description: String,
    pub parent: i64,
    pub count: i64,
}
