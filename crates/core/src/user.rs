//! # User Module
//!
//! Users are owned by the session subsystem. The core only reads them to
//! resolve recipients, snapshot names onto transfers and pick default
//! accounts for the send fast path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    /// Account that receives fast-path sends
    pub default_account_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            default_account_id: None,
            created_at: Utc::now(),
        }
    }
}
