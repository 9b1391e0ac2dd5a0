use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One page of `/crm/v3/objects/{type}` or `/crm/v3/objects/{type}/search`.
#[derive(Debug, Default, Deserialize)]
pub struct ObjectPage {
    #[serde(default)]
    pub results: Vec<Value>,
    #[serde(default)]
    pub paging: Option<Paging>,
}

impl ObjectPage {
    pub fn next_cursor(&self) -> Option<String> {
        self.paging
            .as_ref()
            .and_then(|paging| paging.next.as_ref())
            .map(|next| next.after.clone())
            .filter(|after| !after.is_empty())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Paging {
    #[serde(default)]
    pub next: Option<NextPage>,
}

#[derive(Debug, Deserialize)]
pub struct NextPage {
    pub after: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct AssociationPage {
    #[serde(default)]
    pub results: Vec<Value>,
}

#[derive(Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub filter_groups: Vec<FilterGroup>,
    pub properties: Vec<String>,
    pub limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FilterGroup {
    pub filters: Vec<Filter>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    pub property_name: String,
    pub operator: &'static str,
    pub value: String,
}

impl SearchRequest {
    /// Objects whose `property` is strictly later than `since`.
    pub fn modified_after(
        property: &str,
        since: DateTime<Utc>,
        properties: &[&str],
        limit: usize,
        after: Option<String>,
    ) -> Self {
        Self {
            filter_groups: vec![FilterGroup {
                filters: vec![Filter {
                    property_name: property.to_string(),
                    operator: "GT",
                    value: since.timestamp_millis().to_string(),
                }],
            }],
            properties: properties.iter().map(|property| property.to_string()).collect(),
            limit,
            after,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::{ObjectPage, SearchRequest};

    #[test]
    fn search_body_uses_hubspot_field_names() {
        let since = Utc.with_ymd_and_hms(2024, 1, 15, 10, 50, 0).single().expect("valid time");
        let body = SearchRequest::modified_after("lastmodifieddate", since, &["email"], 100, None);

        let encoded = serde_json::to_value(&body).expect("serializable");
        assert_eq!(
            encoded,
            json!({
                "filterGroups": [{
                    "filters": [{
                        "propertyName": "lastmodifieddate",
                        "operator": "GT",
                        "value": "1705315800000"
                    }]
                }],
                "properties": ["email"],
                "limit": 100
            })
        );
    }

    #[test]
    fn cursor_is_absent_on_last_page() {
        let last: ObjectPage = serde_json::from_value(json!({"results": []})).expect("decodes");
        assert_eq!(last.next_cursor(), None);

        let more: ObjectPage = serde_json::from_value(json!({
            "results": [{"id": "1"}],
            "paging": {"next": {"after": "abc", "link": "ignored"}}
        }))
        .expect("decodes");
        assert_eq!(more.next_cursor().as_deref(), Some("abc"));
    }
}
