//! Represents a network-wide user account.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A user account. Users are shared by all sites of the install.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct User {
    pub id: i64,
    pub login: String,
    pub email: String,
    pub password_hash: String,
    pub registered: DateTime<Utc>,
    pub is_super_admin: bool,
}
