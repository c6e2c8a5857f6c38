//! Caption model.
//!
//! A caption is a short piece of text suggested by a chat member. It starts
//! out pending and either gets approved (the flag flips to `true` once and
//! never back) or rejected, in which case the row is deleted outright.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique, immutable identifier of a caption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CaptionId(pub Uuid);

impl CaptionId {
    /// Generate a fresh identifier. Identifiers are never reused.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CaptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CaptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CaptionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// Messaging-network identifier of a user (the caption author, a reviewer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One submitted caption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Caption {
    pub id: CaptionId,
    pub text: String,
    pub author_id: UserId,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
}

impl Caption {
    /// Build a new pending caption with a fresh id and the current timestamp.
    pub fn pending(text: impl Into<String>, author_id: UserId) -> Self {
        Self {
            id: CaptionId::new(),
            text: text.into(),
            author_id,
            approved: false,
            created_at: Utc::now(),
        }
    }

    pub fn is_pending(&self) -> bool {
        !self.approved
    }
}
