//! Connection-related data models.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Lifecycle of a store context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreState {
    Constructed,
    Initialized,
    Connected,
    Closed,
}

impl std::fmt::Display for StoreState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Constructed => write!(f, "constructed"),
            Self::Initialized => write!(f, "initialized"),
            Self::Connected => write!(f, "connected"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Information about an established connection (no secrets exposed).
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionInfo {
    /// Connection URL with the password masked
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    pub connected_at: DateTime<Utc>,
}
