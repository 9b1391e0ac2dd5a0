use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_LEAD_STATUS: &str = "new";
pub const UNKNOWN_LEAD_SOURCE: &str = "unknown";

/// A contact or prospect normalized out of one platform's payload.
///
/// `external_id` is only unique within the platform the lead came from; no
/// cross-platform identity is inferred.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub external_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub status: String,
    pub source: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub raw_data: Value,
}

impl Lead {
    pub fn new(external_id: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            name: None,
            email: None,
            phone: None,
            company: None,
            status: DEFAULT_LEAD_STATUS.to_string(),
            source: UNKNOWN_LEAD_SOURCE.to_string(),
            created_at: None,
            updated_at: None,
            raw_data: Value::Null,
        }
    }

    pub fn created_after(&self, boundary: DateTime<Utc>) -> bool {
        self.created_at.map(|created_at| created_at > boundary).unwrap_or(false)
    }
}
