//! Compact snapshot of the live aggregation for the chat responder.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::connector::HealthStatus;
use crate::dashboard::{average_duration, total_duration};
use crate::domain::budget::BudgetSummary;
use crate::domain::call::Call;
use crate::domain::lead::Lead;
use crate::registry::PlatformResults;

pub const RECENT_LEADS: usize = 5;
pub const RECENT_CALLS: usize = 3;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LeadDigest {
    pub name: String,
    pub email: String,
    pub status: String,
    pub created_at: Option<DateTime<Utc>>,
    pub company: String,
}

impl From<&Lead> for LeadDigest {
    fn from(lead: &Lead) -> Self {
        Self {
            name: lead.name.clone().unwrap_or_else(|| "Unknown".to_string()),
            email: lead.email.clone().unwrap_or_default(),
            status: lead.status.clone(),
            created_at: lead.created_at,
            company: lead.company.clone().unwrap_or_default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LeadContext {
    pub total_count: usize,
    pub recent_leads: Vec<LeadDigest>,
    pub status_breakdown: BTreeMap<String, usize>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CallContext {
    pub total_count: usize,
    pub total_duration: u64,
    pub avg_duration: f64,
    pub recent_calls: Vec<Call>,
    pub outcome_breakdown: BTreeMap<String, usize>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AssistantContext {
    pub timestamp: DateTime<Utc>,
    pub platforms_status: BTreeMap<String, HealthStatus>,
    pub leads_summary: BTreeMap<String, LeadContext>,
    pub calls_summary: BTreeMap<String, CallContext>,
    pub budget_summary: BTreeMap<String, BudgetSummary>,
}

impl AssistantContext {
    pub fn all_platforms_healthy(&self) -> bool {
        self.platforms_status.values().all(HealthStatus::is_healthy)
    }

    pub fn total_leads(&self) -> usize {
        self.leads_summary.values().map(|summary| summary.total_count).sum()
    }

    pub fn total_calls(&self) -> usize {
        self.calls_summary.values().map(|summary| summary.total_count).sum()
    }
}

fn histogram<'a>(values: impl Iterator<Item = &'a str>) -> BTreeMap<String, usize> {
    let mut breakdown = BTreeMap::new();
    for value in values {
        *breakdown.entry(value.to_string()).or_insert(0) += 1;
    }
    breakdown
}

fn lead_context(leads: &[Lead]) -> LeadContext {
    let mut newest: Vec<&Lead> = leads.iter().collect();
    newest.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    LeadContext {
        total_count: leads.len(),
        recent_leads: newest.into_iter().take(RECENT_LEADS).map(LeadDigest::from).collect(),
        status_breakdown: histogram(leads.iter().map(|lead| lead.status.as_str())),
    }
}

fn call_context(calls: &[Call]) -> CallContext {
    let mut newest: Vec<&Call> = calls.iter().collect();
    newest.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let duration = total_duration(calls);

    CallContext {
        total_count: calls.len(),
        total_duration: duration,
        avg_duration: average_duration(duration, calls.len()),
        recent_calls: newest.into_iter().take(RECENT_CALLS).cloned().collect(),
        outcome_breakdown: histogram(calls.iter().map(|call| call.outcome.as_str())),
    }
}

/// Errored platforms are skipped without comment.
pub fn build_context(
    leads: &PlatformResults<Vec<Lead>>,
    calls: &PlatformResults<Vec<Call>>,
    budgets: &PlatformResults<BudgetSummary>,
    platforms_status: BTreeMap<String, HealthStatus>,
    now: DateTime<Utc>,
) -> AssistantContext {
    AssistantContext {
        timestamp: now,
        platforms_status,
        leads_summary: leads
            .iter()
            .filter_map(|(name, result)| Some((name.clone(), lead_context(result.data()?))))
            .collect(),
        calls_summary: calls
            .iter()
            .filter_map(|(name, result)| Some((name.clone(), call_context(result.data()?))))
            .collect(),
        budget_summary: budgets
            .iter()
            .filter_map(|(name, result)| result.data().map(|data| (name.clone(), data.clone())))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{Duration, Utc};

    use super::build_context;
    use crate::connector::HealthStatus;
    use crate::domain::call::Call;
    use crate::domain::lead::Lead;
    use crate::registry::{PlatformOutcome, PlatformResult};

    fn lead(id: &str, status: &str, age_days: i64) -> Lead {
        let mut lead = Lead::new(id);
        lead.name = Some(format!("Lead {id}"));
        lead.status = status.to_string();
        lead.created_at = Some(Utc::now() - Duration::days(age_days));
        lead
    }

    fn call(id: &str, outcome: &str, duration: u64, age_days: i64) -> Call {
        let mut call = Call::new(id);
        call.outcome = outcome.to_string();
        call.duration = duration;
        call.created_at = Some(Utc::now() - Duration::days(age_days));
        call
    }

    #[test]
    fn keeps_five_newest_leads_and_full_status_histogram() {
        let leads: Vec<Lead> = (0..8)
            .map(|age| lead(&age.to_string(), if age % 2 == 0 { "new" } else { "open" }, age))
            .collect();
        let results = BTreeMap::from([(
            "hubspot".to_string(),
            PlatformResult {
                platform: "HubSpot".to_string(),
                count: leads.len(),
                outcome: PlatformOutcome::Data(leads),
            },
        )]);

        let now = Utc::now();
        let context =
            build_context(&results, &BTreeMap::new(), &BTreeMap::new(), BTreeMap::new(), now);
        let summary = &context.leads_summary["hubspot"];

        assert_eq!(summary.total_count, 8);
        assert_eq!(summary.recent_leads.len(), 5);
        assert_eq!(summary.recent_leads[0].name, "Lead 0");
        assert_eq!(summary.recent_leads[4].name, "Lead 4");
        assert_eq!(summary.status_breakdown["new"], 4);
        assert_eq!(summary.status_breakdown["open"], 4);
        assert_eq!(context.total_leads(), 8);
    }

    #[test]
    fn keeps_three_newest_calls_with_duration_stats() {
        let calls = vec![
            call("old", "no_answer", 30, 9),
            call("new", "completed", 300, 0),
            call("mid", "completed", 90, 2),
            call("older", "busy", 0, 5),
        ];
        let results = BTreeMap::from([(
            "hubspot".to_string(),
            PlatformResult {
                platform: "HubSpot".to_string(),
                count: calls.len(),
                outcome: PlatformOutcome::Data(calls),
            },
        )]);

        let now = Utc::now();
        let context =
            build_context(&BTreeMap::new(), &results, &BTreeMap::new(), BTreeMap::new(), now);
        let summary = &context.calls_summary["hubspot"];

        assert_eq!(summary.total_duration, 420);
        assert_eq!(summary.avg_duration, 105.0);
        let recent: Vec<&str> =
            summary.recent_calls.iter().map(|call| call.external_id.as_str()).collect();
        assert_eq!(recent, vec!["new", "mid", "older"]);
        assert_eq!(summary.outcome_breakdown["completed"], 2);
    }

    #[test]
    fn errored_platforms_are_skipped_and_health_passes_through() {
        let leads = BTreeMap::from([(
            "salesforce".to_string(),
            PlatformResult::<Vec<Lead>> {
                platform: "Salesforce".to_string(),
                count: 0,
                outcome: PlatformOutcome::Error("boom".to_string()),
            },
        )]);
        let health = BTreeMap::from([
            ("hubspot".to_string(), HealthStatus::healthy(None)),
            ("salesforce".to_string(), HealthStatus::unhealthy("Authentication failed", None)),
        ]);

        let context = build_context(&leads, &BTreeMap::new(), &BTreeMap::new(), health, Utc::now());

        assert!(context.leads_summary.is_empty());
        assert_eq!(context.platforms_status.len(), 2);
        assert!(!context.all_platforms_healthy());
    }
}
