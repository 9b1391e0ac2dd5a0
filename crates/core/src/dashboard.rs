//! Cross-platform dashboard roll-ups.
//!
//! Platforms whose fetch errored are left out of the sums; their error is
//! already visible on the per-platform endpoints.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::budget::BudgetSummary;
use crate::domain::call::Call;
use crate::domain::lead::Lead;
use crate::registry::PlatformResults;

pub const NEW_LEAD_WINDOW_DAYS: i64 = 7;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PlatformLeadStats {
    pub total: usize,
    pub new_this_week: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LeadsSummary {
    pub total: usize,
    pub new_this_week: usize,
    pub by_platform: BTreeMap<String, PlatformLeadStats>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PlatformCallStats {
    pub total: usize,
    pub total_duration: u64,
    pub avg_duration: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CallsSummary {
    pub total: usize,
    pub total_duration: u64,
    pub avg_duration: f64,
    pub by_platform: BTreeMap<String, PlatformCallStats>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PlatformBudgetStats {
    pub pipeline_value: Decimal,
    pub closed_won: Decimal,
    pub closed_lost: Decimal,
    pub average_deal_size: Decimal,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BudgetRollup {
    pub total_pipeline_value: Decimal,
    pub total_closed_won: Decimal,
    pub total_closed_lost: Decimal,
    pub total_value: Decimal,
    pub by_platform: BTreeMap<String, PlatformBudgetStats>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub platforms: Vec<String>,
    pub total_platforms: usize,
    pub leads_summary: LeadsSummary,
    pub calls_summary: CallsSummary,
    pub budget_summary: BudgetRollup,
    pub last_updated: DateTime<Utc>,
}

/// Start of the trailing window of `days` calendar days ending at `now`.
pub fn window_start(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    now.checked_sub_signed(Duration::days(days)).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

pub fn average_duration(total_duration: u64, calls: usize) -> f64 {
    if calls == 0 {
        0.0
    } else {
        total_duration as f64 / calls as f64
    }
}

/// Saturates at `u64::MAX`; upstream durations are not trusted to be sane.
pub fn total_duration(calls: &[Call]) -> u64 {
    calls.iter().fold(0u64, |total, call| total.saturating_add(call.duration))
}

pub fn summarize_leads(leads: &PlatformResults<Vec<Lead>>, now: DateTime<Utc>) -> LeadsSummary {
    let boundary = window_start(now, NEW_LEAD_WINDOW_DAYS);
    let mut summary = LeadsSummary::default();

    for (platform, result) in leads {
        let Some(leads) = result.data() else {
            continue;
        };
        let new_this_week = leads.iter().filter(|lead| lead.created_after(boundary)).count();

        summary.total += leads.len();
        summary.new_this_week += new_this_week;
        summary
            .by_platform
            .insert(platform.clone(), PlatformLeadStats { total: leads.len(), new_this_week });
    }

    summary
}

pub fn summarize_calls(calls: &PlatformResults<Vec<Call>>) -> CallsSummary {
    let mut summary = CallsSummary::default();

    for (platform, result) in calls {
        let Some(calls) = result.data() else {
            continue;
        };
        let duration = total_duration(calls);

        summary.total += calls.len();
        summary.total_duration = summary.total_duration.saturating_add(duration);
        summary.by_platform.insert(
            platform.clone(),
            PlatformCallStats {
                total: calls.len(),
                total_duration: duration,
                avg_duration: average_duration(duration, calls.len()),
            },
        );
    }

    summary.avg_duration = average_duration(summary.total_duration, summary.total);
    summary
}

pub fn summarize_budgets(budgets: &PlatformResults<BudgetSummary>) -> BudgetRollup {
    let mut rollup = BudgetRollup::default();

    for (platform, result) in budgets {
        let Some(budget) = result.data() else {
            continue;
        };

        rollup.total_pipeline_value =
            rollup.total_pipeline_value.saturating_add(budget.total_pipeline_value);
        rollup.total_closed_won = rollup.total_closed_won.saturating_add(budget.total_closed_won);
        rollup.total_closed_lost =
            rollup.total_closed_lost.saturating_add(budget.total_closed_lost);
        rollup.by_platform.insert(
            platform.clone(),
            PlatformBudgetStats {
                pipeline_value: budget.total_pipeline_value,
                closed_won: budget.total_closed_won,
                closed_lost: budget.total_closed_lost,
                average_deal_size: budget.average_deal_size,
            },
        );
    }

    rollup.total_value = rollup
        .total_pipeline_value
        .saturating_add(rollup.total_closed_won)
        .saturating_add(rollup.total_closed_lost);
    rollup
}

pub fn build_dashboard(
    platforms: Vec<String>,
    leads: &PlatformResults<Vec<Lead>>,
    calls: &PlatformResults<Vec<Call>>,
    budgets: &PlatformResults<BudgetSummary>,
    now: DateTime<Utc>,
) -> DashboardSummary {
    DashboardSummary {
        total_platforms: platforms.len(),
        platforms,
        leads_summary: summarize_leads(leads, now),
        calls_summary: summarize_calls(calls),
        budget_summary: summarize_budgets(budgets),
        last_updated: now,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::{build_dashboard, summarize_budgets, summarize_calls, summarize_leads, window_start};
    use crate::domain::budget::{BudgetSummary, StageSentinels};
    use crate::domain::call::Call;
    use crate::domain::lead::Lead;
    use crate::registry::{PlatformOutcome, PlatformResult, PlatformResults};

    const SENTINELS: StageSentinels =
        StageSentinels { closed_won: "closedwon", closed_lost: "closedlost" };

    fn ok<T>(platform: &str, data: T, count: usize) -> PlatformResult<T> {
        PlatformResult {
            platform: platform.to_string(),
            count,
            outcome: PlatformOutcome::Data(data),
        }
    }

    fn failed<T>(platform: &str) -> PlatformResult<T> {
        PlatformResult {
            platform: platform.to_string(),
            count: 0,
            outcome: PlatformOutcome::Error("transport failure: timed out".to_string()),
        }
    }

    fn call(duration: u64) -> Call {
        let mut call = Call::new(format!("call-{duration}"));
        call.duration = duration;
        call
    }

    #[test]
    fn new_this_week_includes_six_days_and_excludes_eight() {
        let now = Utc.with_ymd_and_hms(2024, 3, 3, 12, 0, 0).single().expect("valid time");
        let mut recent = Lead::new("recent");
        recent.created_at = Some(now - Duration::days(6));
        let mut stale = Lead::new("stale");
        stale.created_at = Some(now - Duration::days(8));
        let undated = Lead::new("undated");

        let batch = ok("HubSpot", vec![recent, stale, undated], 3);
        let leads: PlatformResults<Vec<Lead>> = BTreeMap::from([("hubspot".to_string(), batch)]);

        let summary = summarize_leads(&leads, now);

        assert_eq!(summary.total, 3);
        assert_eq!(summary.new_this_week, 1);
        assert_eq!(summary.by_platform["hubspot"].new_this_week, 1);
    }

    #[test]
    fn window_crosses_month_boundary() {
        let now = Utc.with_ymd_and_hms(2024, 3, 3, 0, 0, 0).single().expect("valid time");
        let boundary = window_start(now, 7);
        assert_eq!(boundary, Utc.with_ymd_and_hms(2024, 2, 25, 0, 0, 0).single().expect("valid"));
    }

    #[test]
    fn errored_platforms_are_left_out_of_lead_totals() {
        let leads: PlatformResults<Vec<Lead>> = BTreeMap::from([
            ("hubspot".to_string(), ok("HubSpot", vec![Lead::new("1"), Lead::new("2")], 2)),
            ("salesforce".to_string(), failed("Salesforce")),
        ]);

        let summary = summarize_leads(&leads, Utc::now());

        assert_eq!(summary.total, 2);
        assert!(!summary.by_platform.contains_key("salesforce"));
    }

    #[test]
    fn call_averages_handle_empty_platforms() {
        let calls: PlatformResults<Vec<Call>> = BTreeMap::from([
            ("hubspot".to_string(), ok("HubSpot", vec![call(60), call(180)], 2)),
            ("pipedrive".to_string(), ok("Pipedrive", Vec::new(), 0)),
            ("salesforce".to_string(), failed("Salesforce")),
        ]);

        let summary = summarize_calls(&calls);

        assert_eq!(summary.total, 2);
        assert_eq!(summary.total_duration, 240);
        assert_eq!(summary.avg_duration, 120.0);
        assert_eq!(summary.by_platform["hubspot"].avg_duration, 120.0);
        assert_eq!(summary.by_platform["pipedrive"].avg_duration, 0.0);
    }

    #[test]
    fn no_calls_means_zero_average() {
        let summary = summarize_calls(&BTreeMap::new());
        assert_eq!(summary.total, 0);
        assert_eq!(summary.avg_duration, 0.0);
    }

    #[test]
    fn budget_rollup_keeps_platform_average() {
        let mut hubspot = BudgetSummary::default();
        hubspot.record_deal("closedwon", Decimal::new(900, 0), SENTINELS);
        hubspot.record_deal("presentationscheduled", Decimal::new(300, 0), SENTINELS);
        hubspot.finalize();

        let mut other = BudgetSummary::default();
        other.record_deal("closedlost", Decimal::new(200, 0), SENTINELS);
        other.finalize();

        let budgets: PlatformResults<BudgetSummary> = BTreeMap::from([
            ("hubspot".to_string(), ok("HubSpot", hubspot, 2)),
            ("other".to_string(), ok("Other", other, 1)),
            ("salesforce".to_string(), failed("Salesforce")),
        ]);

        let rollup = summarize_budgets(&budgets);

        assert_eq!(rollup.total_pipeline_value, Decimal::new(300, 0));
        assert_eq!(rollup.total_closed_won, Decimal::new(900, 0));
        assert_eq!(rollup.total_closed_lost, Decimal::new(200, 0));
        assert_eq!(rollup.total_value, Decimal::new(1400, 0));
        assert_eq!(rollup.by_platform["hubspot"].average_deal_size, Decimal::new(600, 0));
        assert_eq!(rollup.by_platform["other"].average_deal_size, Decimal::new(200, 0));
        assert_eq!(rollup.by_platform.len(), 2);
    }

    #[test]
    fn dashboard_lists_every_platform_even_when_failing() {
        let now = Utc::now();
        let summary = build_dashboard(
            vec!["hubspot".to_string(), "salesforce".to_string()],
            &BTreeMap::from([("salesforce".to_string(), failed("Salesforce"))]),
            &BTreeMap::new(),
            &BTreeMap::new(),
            now,
        );

        assert_eq!(summary.total_platforms, 2);
        assert_eq!(summary.leads_summary.total, 0);
        assert_eq!(summary.last_updated, now);
    }

    #[test]
    fn runaway_durations_saturate_per_platform_and_overall() {
        let calls: PlatformResults<Vec<Call>> = BTreeMap::from([
            ("hubspot".to_string(), ok("HubSpot", vec![call(u64::MAX), call(u64::MAX)], 2)),
            ("other".to_string(), ok("Other", vec![call(60)], 1)),
        ]);

        let summary = summarize_calls(&calls);

        assert_eq!(summary.by_platform["hubspot"].total_duration, u64::MAX);
        assert_eq!(summary.by_platform["other"].total_duration, 60);
        assert_eq!(summary.total_duration, u64::MAX);
        assert_eq!(summary.total, 3);
    }

    #[test]
    fn budget_rollup_saturates_at_decimal_max() {
        let mut huge = BudgetSummary::default();
        huge.record_deal("closedwon", Decimal::MAX, SENTINELS);
        huge.record_deal("appointmentscheduled", Decimal::MAX, SENTINELS);
        huge.finalize();

        let budgets: PlatformResults<BudgetSummary> = BTreeMap::from([
            ("hubspot".to_string(), ok("HubSpot", huge.clone(), 2)),
            ("other".to_string(), ok("Other", huge, 2)),
        ]);

        let rollup = summarize_budgets(&budgets);

        assert_eq!(rollup.total_closed_won, Decimal::MAX);
        assert_eq!(rollup.total_pipeline_value, Decimal::MAX);
        assert_eq!(rollup.total_value, Decimal::MAX);
        assert_eq!(rollup.by_platform.len(), 2);
    }
}
