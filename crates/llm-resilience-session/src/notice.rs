use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Notice left for a session that was displaced by a new login, read at
/// most once by the displaced client polling `/session-status` (spec
/// §4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidationNotice {
    pub timestamp: DateTime<Utc>,
    pub ip_address: String,
}

impl InvalidationNotice {
    pub fn new(ip_address: Option<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            ip_address: ip_address.unwrap_or_else(|| "unknown".to_string()),
        }
    }
}
