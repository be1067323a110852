//! Core data models for the multisite content platform.
//!
//! These entities represent networks, the sites they host, and the content
//! each site owns. They map cleanly to database tables via `sqlx::FromRow`
//! and serialize naturally as JSON via `serde`.

pub mod comment;
pub mod network;
pub mod post;
pub mod site;
pub mod term;
pub mod user;
