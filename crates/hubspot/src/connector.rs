use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use compass_core::config::HubSpotSettings;
use compass_core::connector::{ConnectorStatus, CrmConnector, FetchQuery};
use compass_core::domain::budget::BudgetSummary;
use compass_core::domain::call::Call;
use compass_core::domain::lead::Lead;
use compass_core::errors::ConnectorError;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::normalize::{
    deal_amount, deal_contact_ids, deal_stage, normalize_call, normalize_contact, object_id,
    CALL_PROPERTIES, CONTACT_PROPERTIES, DEAL_PROPERTIES, STAGE_SENTINELS,
};
use crate::wire::{AssociationPage, ObjectPage, SearchRequest, TokenResponse};

pub const PLATFORM_NAME: &str = "HubSpot";
const PAGE_MAX: usize = 100;

#[derive(Clone, Debug)]
pub struct HubSpotConfig {
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
    pub api_base: String,
    pub timeout: Duration,
}

impl HubSpotConfig {
    pub fn new(access_token: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            access_token: SecretString::from(access_token.into()),
            refresh_token: None,
            client_id: None,
            client_secret: None,
            api_base: api_base.into(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_refresh(
        mut self,
        refresh_token: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.refresh_token = Some(SecretString::from(refresh_token.into()));
        self.client_id = Some(client_id.into());
        self.client_secret = Some(SecretString::from(client_secret.into()));
        self
    }

    /// `None` when no access token is configured.
    pub fn from_settings(settings: &HubSpotSettings) -> Option<Self> {
        let access_token = settings.access_token.clone().filter(|_| settings.is_configured())?;
        Some(Self {
            access_token,
            refresh_token: settings.refresh_token.clone(),
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            api_base: settings.api_base.clone(),
            timeout: Duration::from_secs(settings.timeout_secs),
        })
    }
}

struct Session {
    access_token: SecretString,
    refresh_token: Option<SecretString>,
    authenticated: bool,
    last_sync: Option<DateTime<Utc>>,
}

/// Which HubSpot object collection to page through.
#[derive(Clone, Copy)]
struct ObjectRequest {
    object: &'static str,
    properties: &'static [&'static str],
    since_property: &'static str,
    associations: Option<&'static str>,
}

const CONTACTS: ObjectRequest = ObjectRequest {
    object: "contacts",
    properties: CONTACT_PROPERTIES,
    since_property: "lastmodifieddate",
    associations: None,
};

const CALLS: ObjectRequest = ObjectRequest {
    object: "calls",
    properties: CALL_PROPERTIES,
    since_property: "createdate",
    associations: None,
};

const DEALS: ObjectRequest = ObjectRequest {
    object: "deals",
    properties: DEAL_PROPERTIES,
    since_property: "createdate",
    associations: None,
};

pub struct HubSpotConnector {
    client: Client,
    api_base: String,
    client_id: Option<String>,
    client_secret: Option<SecretString>,
    session: RwLock<Session>,
    // Serializes the auth check + refresh so concurrent callers refresh at most once.
    auth_gate: Mutex<()>,
}

impl HubSpotConnector {
    pub fn new(config: HubSpotConfig) -> Result<Self, ConnectorError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|error| ConnectorError::Configuration(error.to_string()))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            client_id: config.client_id,
            client_secret: config.client_secret,
            session: RwLock::new(Session {
                access_token: config.access_token,
                refresh_token: config.refresh_token,
                authenticated: false,
                last_sync: None,
            }),
            auth_gate: Mutex::new(()),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    async fn bearer(&self) -> String {
        self.session.read().await.access_token.expose_secret().to_string()
    }

    async fn set_authenticated(&self, authenticated: bool) {
        self.session.write().await.authenticated = authenticated;
    }

    async fn refresh_access_token(&self) -> bool {
        let Some(refresh_token) = self.session.read().await.refresh_token.clone() else {
            return false;
        };
        let (Some(client_id), Some(client_secret)) = (&self.client_id, &self.client_secret) else {
            warn!(
                event_name = "connector.hubspot.refresh_unavailable",
                "refresh token present but client credentials are missing"
            );
            return false;
        };

        let response = match self
            .client
            .post(self.url("/oauth/v1/token"))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.expose_secret()),
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.expose_secret()),
            ])
            .send()
            .await
        {
            Ok(response) => response,
            Err(error) => {
                warn!(
                    event_name = "connector.hubspot.refresh_failed",
                    error = %error,
                    "hubspot token refresh request failed"
                );
                return false;
            }
        };

        if !response.status().is_success() {
            warn!(
                event_name = "connector.hubspot.refresh_failed",
                status = response.status().as_u16(),
                "hubspot token endpoint rejected refresh"
            );
            return false;
        }

        let token: TokenResponse = match response.json().await {
            Ok(token) => token,
            Err(error) => {
                warn!(
                    event_name = "connector.hubspot.refresh_failed",
                    error = %error,
                    "failed to decode hubspot token response"
                );
                return false;
            }
        };
        if token.access_token.is_empty() {
            warn!(
                event_name = "connector.hubspot.refresh_failed",
                "hubspot token endpoint returned empty access token"
            );
            return false;
        }

        let mut session = self.session.write().await;
        session.access_token = SecretString::from(token.access_token);
        if let Some(rotated) = token.refresh_token.filter(|value| !value.is_empty()) {
            session.refresh_token = Some(SecretString::from(rotated));
        }
        session.authenticated = true;
        info!(event_name = "connector.hubspot.token_refreshed", "hubspot access token refreshed");
        true
    }

    /// Pages through one object collection until the cursor runs out or the
    /// query limit is reached. A rejected page ends the walk with whatever
    /// was already collected.
    async fn fetch_objects(
        &self,
        request: ObjectRequest,
        query: &FetchQuery,
    ) -> Result<Vec<Value>, ConnectorError> {
        if query.is_satisfied_by(0) {
            return Ok(Vec::new());
        }

        let page_size = query.page_size(PAGE_MAX);
        let token = self.bearer().await;
        let mut objects = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let builder = match query.since {
                Some(since) => self
                    .client
                    .post(self.url(&format!("/crm/v3/objects/{}/search", request.object)))
                    .json(&SearchRequest::modified_after(
                        request.since_property,
                        since,
                        request.properties,
                        page_size,
                        after.clone(),
                    )),
                None => {
                    let mut params = vec![
                        ("limit", page_size.to_string()),
                        ("properties", request.properties.join(",")),
                    ];
                    if let Some(associations) = request.associations {
                        params.push(("associations", associations.to_string()));
                    }
                    if let Some(cursor) = &after {
                        params.push(("after", cursor.clone()));
                    }
                    self.client
                        .get(self.url(&format!("/crm/v3/objects/{}", request.object)))
                        .query(&params)
                }
            };

            let response = builder
                .bearer_auth(&token)
                .send()
                .await
                .map_err(|error| ConnectorError::Transport(error.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                warn!(
                    event_name = "connector.hubspot.page_rejected",
                    object = request.object,
                    status = status.as_u16(),
                    fetched = objects.len(),
                    "hubspot rejected a page; returning records fetched so far"
                );
                break;
            }

            let page: ObjectPage =
                response.json().await.map_err(|error| ConnectorError::Decode(error.to_string()))?;
            let cursor = page.next_cursor();
            objects.extend(page.results);

            if let Some(limit) = query.limit.filter(|_| query.is_satisfied_by(objects.len())) {
                objects.truncate(limit);
                break;
            }
            match cursor {
                Some(cursor) => after = Some(cursor),
                None => break,
            }
        }

        debug!(
            event_name = "connector.hubspot.fetched",
            object = request.object,
            count = objects.len(),
            "hubspot collection fetched"
        );
        Ok(objects)
    }

    async fn call_contact_id(&self, call_id: &str) -> Option<String> {
        let url = self.url(&format!("/crm/v3/objects/calls/{call_id}/associations/contact"));
        let token = self.bearer().await;

        let response = match self.client.get(url).bearer_auth(&token).send().await {
            Ok(response) => response,
            Err(error) => {
                debug!(
                    event_name = "connector.hubspot.association_failed",
                    call_id,
                    error = %error,
                    "call association lookup failed"
                );
                return None;
            }
        };
        if !response.status().is_success() {
            debug!(
                event_name = "connector.hubspot.association_failed",
                call_id,
                status = response.status().as_u16(),
                "call association lookup rejected"
            );
            return None;
        }

        let page: AssociationPage = response.json().await.ok()?;
        page.results.first().map(object_id).filter(|id| !id.is_empty())
    }
}

#[async_trait]
impl CrmConnector for HubSpotConnector {
    fn platform_name(&self) -> &str {
        PLATFORM_NAME
    }

    async fn authenticate(&self) -> bool {
        let _gate = self.auth_gate.lock().await;

        let token = self.bearer().await;
        if token.trim().is_empty() {
            self.set_authenticated(false).await;
            warn!(event_name = "connector.hubspot.auth_failed", "no hubspot access token held");
            return false;
        }

        // Private-app tokens have no introspection endpoint; a one-record read
        // is the cheapest check that works for both token kinds.
        let check = self
            .client
            .get(self.url("/crm/v3/objects/contacts"))
            .bearer_auth(&token)
            .query(&[("limit", "1")])
            .send()
            .await;

        let status = match check {
            Ok(response) => response.status(),
            Err(error) => {
                self.set_authenticated(false).await;
                warn!(
                    event_name = "connector.hubspot.auth_failed",
                    error = %error,
                    "hubspot authentication check failed"
                );
                return false;
            }
        };

        if status.is_success() {
            self.set_authenticated(true).await;
            return true;
        }

        self.set_authenticated(false).await;
        if status == StatusCode::UNAUTHORIZED && self.refresh_access_token().await {
            return true;
        }

        warn!(
            event_name = "connector.hubspot.auth_failed",
            status = status.as_u16(),
            "hubspot rejected the access token"
        );
        false
    }

    async fn get_leads(&self, query: &FetchQuery) -> Result<Vec<Lead>, ConnectorError> {
        if !self.authenticate().await {
            return Ok(Vec::new());
        }

        let contacts = self.fetch_objects(CONTACTS, query).await?;
        Ok(contacts.iter().map(normalize_contact).collect())
    }

    async fn get_calls(&self, query: &FetchQuery) -> Result<Vec<Call>, ConnectorError> {
        if !self.authenticate().await {
            return Ok(Vec::new());
        }

        let raw_calls = self.fetch_objects(CALLS, query).await?;
        let mut calls = Vec::with_capacity(raw_calls.len());
        for raw in &raw_calls {
            let mut call = normalize_call(raw);
            call.lead_external_id = self.call_contact_id(&call.external_id).await;
            calls.push(call);
        }
        Ok(calls)
    }

    async fn get_budget_info(
        &self,
        lead_ids: Option<&[String]>,
    ) -> Result<BudgetSummary, ConnectorError> {
        if !self.authenticate().await {
            return Ok(BudgetSummary::default());
        }

        let wanted: Option<HashSet<&str>> =
            lead_ids.map(|ids| ids.iter().map(String::as_str).collect());
        let request = ObjectRequest {
            associations: wanted.as_ref().map(|_| "contacts"),
            ..DEALS
        };
        let deals = self.fetch_objects(request, &FetchQuery::unbounded()).await?;

        let mut summary = BudgetSummary::default();
        for deal in &deals {
            if let Some(wanted) = &wanted {
                let linked = deal_contact_ids(deal).iter().any(|id| wanted.contains(id.as_str()));
                if !linked {
                    continue;
                }
            }
            summary.record_deal(&deal_stage(deal), deal_amount(deal), STAGE_SENTINELS);
        }
        summary.finalize();
        Ok(summary)
    }

    async fn status(&self) -> ConnectorStatus {
        let session = self.session.read().await;
        ConnectorStatus { authenticated: session.authenticated, last_sync: session.last_sync }
    }

    async fn record_sync(&self, at: DateTime<Utc>) {
        self.session.write().await.last_sync = Some(at);
    }
}

#[cfg(test)]
mod tests {
    use compass_core::config::AppConfig;

    use super::HubSpotConfig;

    #[test]
    fn settings_without_token_build_no_config() {
        let settings = AppConfig::default().hubspot;
        assert!(HubSpotConfig::from_settings(&settings).is_none());
    }

    #[test]
    fn settings_with_token_carry_timeout_and_base() {
        let mut settings = AppConfig::default().hubspot;
        settings.access_token = Some("pat-na1-test".to_string().into());
        settings.timeout_secs = 12;

        let config = HubSpotConfig::from_settings(&settings).expect("token is configured");
        assert_eq!(config.timeout.as_secs(), 12);
        assert_eq!(config.api_base, "https://api.hubapi.com");
        assert!(config.refresh_token.is_none());
    }
}
