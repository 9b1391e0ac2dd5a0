//! HubSpot object payloads mapped onto the shared lead/call/deal schema.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use compass_core::domain::budget::StageSentinels;
use compass_core::domain::call::{Call, CallDirection, DEFAULT_CALL_OUTCOME};
use compass_core::domain::lead::{Lead, DEFAULT_LEAD_STATUS, UNKNOWN_LEAD_SOURCE};
use compass_core::normalize::{from_epoch_millis, parse_timestamp};
use rust_decimal::Decimal;
use serde_json::Value;

pub const CONTACT_PROPERTIES: &[&str] = &[
    "firstname",
    "lastname",
    "email",
    "phone",
    "company",
    "hs_lead_status",
    "hs_analytics_source",
    "createdate",
    "lastmodifieddate",
];

pub const CALL_PROPERTIES: &[&str] = &[
    "hs_call_duration",
    "hs_call_direction",
    "hs_call_status",
    "hs_call_body",
    "createdate",
    "hs_call_recording_url",
];

pub const DEAL_PROPERTIES: &[&str] =
    &["amount", "dealstage", "closedate", "dealname", "createdate", "hs_deal_stage_probability"];

pub const STAGE_SENTINELS: StageSentinels =
    StageSentinels { closed_won: "closedwon", closed_lost: "closedlost" };

pub const UNKNOWN_STAGE: &str = "unknown";

fn property<'a>(object: &'a Value, key: &str) -> Option<&'a Value> {
    object.get("properties").and_then(|properties| properties.get(key)).filter(|v| !v.is_null())
}

/// Non-empty text form of a property; numbers are rendered as text.
fn property_text(object: &Value, key: &str) -> Option<String> {
    match property(object, key)? {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

pub fn object_id(object: &Value) -> String {
    match object.get("id") {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => String::new(),
    }
}

/// HubSpot timestamps are usually epoch milliseconds, sometimes as digit
/// strings. Anything else goes through the shared ladder.
pub fn parse_hubspot_date(value: Option<&Value>) -> Option<DateTime<Utc>> {
    match value? {
        Value::String(text) if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) => {
            text.parse::<i64>().ok().and_then(from_epoch_millis)
        }
        other => parse_timestamp(other),
    }
}

pub fn normalize_contact(raw: &Value) -> Lead {
    let first = property_text(raw, "firstname").unwrap_or_default();
    let last = property_text(raw, "lastname").unwrap_or_default();
    let email = property_text(raw, "email");

    let full_name = format!("{first} {last}").trim().to_string();
    let name = if full_name.is_empty() {
        email.clone().unwrap_or_else(|| "Unknown".to_string())
    } else {
        full_name
    };

    let mut lead = Lead::new(object_id(raw));
    lead.name = Some(name);
    lead.email = email;
    lead.phone = property_text(raw, "phone");
    lead.company = property_text(raw, "company");
    lead.status =
        property_text(raw, "hs_lead_status").unwrap_or_else(|| DEFAULT_LEAD_STATUS.to_string());
    lead.source = property_text(raw, "hs_analytics_source")
        .unwrap_or_else(|| UNKNOWN_LEAD_SOURCE.to_string());
    lead.created_at = parse_hubspot_date(property(raw, "createdate"));
    lead.updated_at = parse_hubspot_date(property(raw, "lastmodifieddate"));
    lead.raw_data = raw.clone();
    lead
}

/// Seconds; unreadable or negative values count as zero.
fn parse_duration(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(number)) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Some(Value::String(text)) => {
            let text = text.trim();
            text.parse::<u64>()
                .ok()
                .or_else(|| text.parse::<f64>().ok().filter(|f| *f >= 0.0).map(|f| f as u64))
                .unwrap_or(0)
        }
        _ => 0,
    }
}

/// `lead_external_id` is left empty; HubSpot keeps it behind an association.
pub fn normalize_call(raw: &Value) -> Call {
    let mut call = Call::new(object_id(raw));
    call.direction = CallDirection::parse(property_text(raw, "hs_call_direction").as_deref());
    call.duration = parse_duration(property(raw, "hs_call_duration"));
    call.outcome =
        property_text(raw, "hs_call_status").unwrap_or_else(|| DEFAULT_CALL_OUTCOME.to_string());
    call.notes = property_text(raw, "hs_call_body").unwrap_or_default();
    call.recording_url = property_text(raw, "hs_call_recording_url");
    call.created_at = parse_hubspot_date(property(raw, "createdate"));
    call.raw_data = raw.clone();
    call
}

pub fn deal_amount(raw: &Value) -> Decimal {
    property_text(raw, "amount")
        .and_then(|amount| {
            let amount = amount.trim();
            Decimal::from_str(amount).or_else(|_| Decimal::from_scientific(amount)).ok()
        })
        .unwrap_or(Decimal::ZERO)
}

pub fn deal_stage(raw: &Value) -> String {
    property_text(raw, "dealstage").unwrap_or_else(|| UNKNOWN_STAGE.to_string())
}

/// Contact ids from `associations.contacts.results[*].id`.
pub fn deal_contact_ids(raw: &Value) -> Vec<String> {
    raw.pointer("/associations/contacts/results")
        .and_then(Value::as_array)
        .map(|results| results.iter().map(object_id).filter(|id| !id.is_empty()).collect())
        .unwrap_or_default()
}
