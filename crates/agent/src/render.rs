use compass_core::context::AssistantContext;
use rust_decimal::Decimal;

use crate::intent::{ChatIntent, Utterance};

/// Calls shorter than this on average get the "extend conversations" tip.
const SHORT_CALL_SECS: f64 = 300.0;

pub fn render(
    intent: ChatIntent,
    utterance: &Utterance,
    message: &str,
    context: &AssistantContext,
) -> String {
    match intent {
        ChatIntent::Greeting => greeting(context),
        ChatIntent::Leads => leads(context, utterance),
        ChatIntent::Calls => calls(context),
        ChatIntent::Pipeline => pipeline(context),
        ChatIntent::Sync => sync(context),
        ChatIntent::Help => help(),
        ChatIntent::Fallback => fallback(context, message),
    }
}

fn title(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Whole dollars with thousands separators, e.g. `$12,500`.
pub fn format_money(amount: Decimal) -> String {
    let whole = amount.round_dp(0).trunc();
    let digits = whole.abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    if whole.is_sign_negative() && !whole.is_zero() {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}

fn greeting(context: &AssistantContext) -> String {
    format!(
        "Hello! I'm your CRM assistant. I've just analyzed your current data:\n\n\
         **Quick Overview:**\n\
         - **{}** total leads in your CRM\n\
         - **{}** recent calls logged\n\
         - **{}** platform(s) connected\n\n\
         I can help you analyze leads, review call performance, examine your sales pipeline, \
         or answer specific questions about your CRM data. What would you like to explore?",
        context.total_leads(),
        context.total_calls(),
        context.platforms_status.len()
    )
}

fn leads(context: &AssistantContext, utterance: &Utterance) -> String {
    let mut response = String::from("**Lead Analysis:**\n\n");

    for (platform, summary) in &context.leads_summary {
        response.push_str(&format!("**{} Platform:**\n", title(platform)));
        response.push_str(&format!("- Total leads: {}\n", summary.total_count));

        if !summary.status_breakdown.is_empty() {
            response.push_str("- Status breakdown:\n");
            for (status, count) in &summary.status_breakdown {
                response.push_str(&format!("  - {status}: {count}\n"));
            }
        }

        if !summary.recent_leads.is_empty() {
            response.push_str("\n**Recent leads:**\n");
            for (index, lead) in summary.recent_leads.iter().take(3).enumerate() {
                let company = if lead.company.is_empty() {
                    String::new()
                } else {
                    format!(" ({})", lead.company)
                };
                response.push_str(&format!(
                    "{}. {}{} - {}\n",
                    index + 1,
                    lead.name,
                    company,
                    lead.status
                ));
            }
        }
    }

    if utterance.mentions_prefix("convert") || utterance.mentions_prefix("conversion") {
        response.push_str(
            "\n**Conversion Insights:** Based on your current lead statuses, focus on leads in the \
             'qualified' stage for immediate follow-up.",
        );
    }

    response
}

fn calls(context: &AssistantContext) -> String {
    let mut response = String::from("**Call Performance Analysis:**\n\n");
    let mut total_calls = 0_usize;
    let mut total_secs = 0_u64;

    for (platform, summary) in &context.calls_summary {
        total_calls += summary.total_count;
        total_secs = total_secs.saturating_add(summary.total_duration);

        response.push_str(&format!("**{} Platform:**\n", title(platform)));
        response.push_str(&format!("- Total calls: {}\n", summary.total_count));
        response.push_str(&format!(
            "- Average duration: {:.1} minutes\n",
            summary.avg_duration / 60.0
        ));
        response.push_str(&format!(
            "- Total talk time: {:.1} hours\n",
            summary.total_duration as f64 / 3600.0
        ));

        if !summary.outcome_breakdown.is_empty() {
            response.push_str("- Call outcomes:\n");
            for (outcome, count) in &summary.outcome_breakdown {
                response.push_str(&format!("  - {outcome}: {count}\n"));
            }
        }
    }

    let average = if total_calls == 0 { 0.0 } else { total_secs as f64 / total_calls as f64 };
    response.push_str("\n**Performance Tip:** ");
    if average < SHORT_CALL_SECS {
        response.push_str(
            "Your average call duration is quite short. Consider preparing more engaging talking \
             points to extend conversations.",
        );
    } else {
        response.push_str(
            "Good call duration! Your team is having meaningful conversations with prospects.",
        );
    }

    response
}

fn pipeline(context: &AssistantContext) -> String {
    let mut response = String::from("**Sales Pipeline & Revenue Analysis:**\n\n");
    let mut total_pipeline = Decimal::ZERO;
    let mut total_won = Decimal::ZERO;
    let mut total_lost = Decimal::ZERO;

    for (platform, summary) in &context.budget_summary {
        total_pipeline = total_pipeline.saturating_add(summary.total_pipeline_value);
        total_won = total_won.saturating_add(summary.total_closed_won);
        total_lost = total_lost.saturating_add(summary.total_closed_lost);

        response.push_str(&format!("**{} Platform:**\n", title(platform)));
        response.push_str(&format!(
            "- Pipeline value: {}\n",
            format_money(summary.total_pipeline_value)
        ));
        response.push_str(&format!("- Closed won: {}\n", format_money(summary.total_closed_won)));
        response.push_str(&format!("- Closed lost: {}\n", format_money(summary.total_closed_lost)));
        response.push_str(&format!(
            "- Average deal size: {}\n\n",
            format_money(summary.average_deal_size)
        ));
    }

    let total_closed = total_won.saturating_add(total_lost);
    let win_rate = total_won
        .checked_div(total_closed)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED));
    if let Some(win_rate) = win_rate {
        response.push_str(&format!("**Overall Win Rate:** {:.1}%\n", win_rate.round_dp(1)));
    }
    response.push_str(&format!("**Total Active Pipeline:** {}", format_money(total_pipeline)));

    response
}

fn sync(context: &AssistantContext) -> String {
    format!(
        "**Data Synchronization:**\n\n\
         Your data was last updated: {}\n\n\
         I can trigger a fresh sync with your connected CRM platforms to get the latest \
         information. All platforms are currently connected and ready for updates.\n\n\
         Would you like me to refresh your data now, or is there something specific you'd like \
         me to analyze with the current data?",
        context.timestamp.to_rfc3339()
    )
}

fn help() -> String {
    "**I'm your CRM assistant!** Here's what I can help you with:\n\n\
     **Data Analysis:**\n\
     - Lead and contact insights\n\
     - Call performance tracking\n\
     - Sales pipeline analysis\n\
     - Revenue and deal summaries\n\n\
     **Real-time Data:**\n\
     - Always pulling fresh data from your connected CRMs\n\
     - Multi-platform aggregation\n\
     - On-demand sync\n\n\
     Try asking me things like:\n\
     - \"How are my leads performing?\"\n\
     - \"What's my sales pipeline looking like?\"\n\
     - \"Show me my call outcomes\"\n\n\
     What would you like to explore first?"
        .to_string()
}

fn fallback(context: &AssistantContext, message: &str) -> String {
    format!(
        "I understand you're asking: \"{message}\"\n\n\
         Based on your current CRM data, I have access to {} leads, recent call logs, and your \
         sales pipeline information.\n\n\
         Could you be more specific about what you'd like to know? For example:\n\
         - Lead performance and conversion rates\n\
         - Call outcomes and follow-up recommendations\n\
         - Sales pipeline and revenue summaries\n\
         - Specific customer or deal information",
        context.total_leads()
    )
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;
    use compass_core::context::{AssistantContext, CallContext, LeadContext, LeadDigest};
    use compass_core::domain::budget::{BudgetSummary, StageSentinels};
    use rust_decimal::Decimal;

    use super::{format_money, render};
    use crate::intent::{detect, ChatIntent, Utterance};

    const SENTINELS: StageSentinels =
        StageSentinels { closed_won: "closedwon", closed_lost: "closedlost" };

    fn context() -> AssistantContext {
        let mut budget = BudgetSummary::default();
        budget.record_deal("closedwon", Decimal::new(3000, 0), SENTINELS);
        budget.record_deal("closedlost", Decimal::new(1000, 0), SENTINELS);
        budget.record_deal("qualifiedtobuy", Decimal::new(12500, 0), SENTINELS);
        budget.finalize();

        AssistantContext {
            timestamp: Utc::now(),
            platforms_status: BTreeMap::new(),
            leads_summary: BTreeMap::from([(
                "hubspot".to_string(),
                LeadContext {
                    total_count: 2,
                    recent_leads: vec![LeadDigest {
                        name: "Ada Lovelace".to_string(),
                        email: "ada@example.com".to_string(),
                        status: "OPEN".to_string(),
                        created_at: None,
                        company: "Analytical Engines".to_string(),
                    }],
                    status_breakdown: BTreeMap::from([("OPEN".to_string(), 2)]),
                },
            )]),
            calls_summary: BTreeMap::from([(
                "hubspot".to_string(),
                CallContext {
                    total_count: 2,
                    total_duration: 1200,
                    avg_duration: 600.0,
                    recent_calls: Vec::new(),
                    outcome_breakdown: BTreeMap::from([("completed".to_string(), 2)]),
                },
            )]),
            budget_summary: BTreeMap::from([("hubspot".to_string(), budget)]),
        }
    }

    fn reply(message: &str) -> String {
        let utterance = Utterance::new(message);
        render(detect(&utterance), &utterance, message, &context())
    }

    #[test]
    fn money_is_grouped_in_whole_dollars() {
        assert_eq!(format_money(Decimal::new(1250000, 2)), "$12,500");
        assert_eq!(format_money(Decimal::ZERO), "$0");
        assert_eq!(format_money(Decimal::new(999, 0)), "$999");
        assert_eq!(format_money(Decimal::new(1234567, 0)), "$1,234,567");
    }

    #[test]
    fn pipeline_reports_win_rate() {
        let text = reply("how is the pipeline?");
        assert!(text.contains("**Hubspot Platform:**"));
        assert!(text.contains("Pipeline value: $12,500"));
        assert!(text.contains("**Overall Win Rate:** 75.0%"));
        assert!(text.contains("**Total Active Pipeline:** $12,500"));
    }

    #[test]
    fn pipeline_totals_saturate_across_platforms() {
        let mut huge = BudgetSummary::default();
        huge.record_deal("closedwon", Decimal::MAX, SENTINELS);
        huge.record_deal("closedwon", Decimal::MAX, SENTINELS);
        huge.finalize();

        let mut context = context();
        context.budget_summary =
            BTreeMap::from([("hubspot".to_string(), huge.clone()), ("zoho".to_string(), huge)]);

        let utterance = Utterance::new("pipeline");
        let text = render(ChatIntent::Pipeline, &utterance, "pipeline", &context);
        assert!(text.contains("**Overall Win Rate:** 100.0%"));
    }

    #[test]
    fn leads_list_recent_with_company() {
        let text = reply("show me my leads and conversion");
        assert!(text.contains("Total leads: 2"));
        assert!(text.contains("1. Ada Lovelace (Analytical Engines) - OPEN"));
        assert!(text.contains("Conversion Insights"));
    }

    #[test]
    fn calls_report_minutes_and_tip() {
        let text = reply("how are calls going");
        assert!(text.contains("Average duration: 10.0 minutes"));
        assert!(text.contains("Total talk time: 0.3 hours"));
        assert!(text.contains("Good call duration!"));
    }

    #[test]
    fn greeting_and_fallback_use_totals() {
        assert!(reply("hello").contains("**2** total leads"));
        let fallback = reply("tell me a joke");
        assert!(fallback.contains("\"tell me a joke\""));
        assert!(fallback.contains("access to 2 leads"));
        assert_eq!(detect(&Utterance::new("tell me a joke")), ChatIntent::Fallback);
    }
}
