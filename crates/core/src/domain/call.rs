use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_CALL_OUTCOME: &str = "completed";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallDirection {
    Inbound,
    #[default]
    Outbound,
}

impl CallDirection {
    /// Unknown or missing vocabularies fall back to outbound.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|value| value.trim().to_ascii_lowercase()).as_deref() {
            Some("inbound") => Self::Inbound,
            _ => Self::Outbound,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub external_id: String,
    /// Lead in the same platform, when the platform could tell us.
    pub lead_external_id: Option<String>,
    pub direction: CallDirection,
    /// Seconds.
    pub duration: u64,
    pub outcome: String,
    pub notes: String,
    pub recording_url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub raw_data: Value,
}

impl Call {
    pub fn new(external_id: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            lead_external_id: None,
            direction: CallDirection::default(),
            duration: 0,
            outcome: DEFAULT_CALL_OUTCOME.to_string(),
            notes: String::new(),
            recording_url: None,
            created_at: None,
            raw_data: Value::Null,
        }
    }
}
