use chrono::{DateTime, Utc};

use crate::helpers::time::now;

/// Token held in process memory for one destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedToken {
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl CachedToken {
    pub fn new(token: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    /// Entries without an expiry never expire on their own.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| now() >= exp)
    }
}
