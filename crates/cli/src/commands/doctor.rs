use compass_core::config::{AppConfig, LoadOptions};
use serde::Serialize;

use crate::commands::{build_registry, current_thread_runtime, CommandResult, EXIT_FAILURE};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { EXIT_FAILURE };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\
                 \"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            let credentials = check_hubspot_credentials(&config);
            let credentials_ok = credentials.status == CheckStatus::Pass;
            checks.push(credentials);
            checks.push(if credentials_ok {
                check_platform_connectivity(&config)
            } else {
                skipped("platform_connectivity", "no CRM platform is configured")
            });
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            let reason = "skipped because configuration did not load";
            checks.push(skipped("hubspot_credentials", reason));
            checks.push(skipped("platform_connectivity", reason));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn skipped(name: &'static str, reason: &str) -> DoctorCheck {
    DoctorCheck { name, status: CheckStatus::Skipped, details: reason.to_string() }
}

fn check_hubspot_credentials(config: &AppConfig) -> DoctorCheck {
    let settings = &config.hubspot;
    if !settings.is_configured() {
        return DoctorCheck {
            name: "hubspot_credentials",
            status: CheckStatus::Fail,
            details: "set COMPASS_HUBSPOT_ACCESS_TOKEN (or HUBSPOT_ACCESS_TOKEN)".to_string(),
        };
    }

    let refresh = if settings.refresh_token.is_some() { "enabled" } else { "disabled" };
    DoctorCheck {
        name: "hubspot_credentials",
        status: CheckStatus::Pass,
        details: format!("access token present; token refresh {refresh}"),
    }
}

fn check_platform_connectivity(config: &AppConfig) -> DoctorCheck {
    let check = current_thread_runtime().and_then(|runtime| {
        let registry = build_registry(config)?;
        Ok(runtime.block_on(registry.health_check()))
    });

    let health = match check {
        Ok(health) => health,
        Err(error) => {
            return DoctorCheck {
                name: "platform_connectivity",
                status: CheckStatus::Fail,
                details: format!("{error:#}"),
            };
        }
    };

    let failing: Vec<String> = health
        .iter()
        .filter(|(_, status)| !status.is_healthy())
        .map(|(name, status)| format!("{name}: {}", status.message))
        .collect();

    if failing.is_empty() {
        let names: Vec<&str> = health.keys().map(String::as_str).collect();
        DoctorCheck {
            name: "platform_connectivity",
            status: CheckStatus::Pass,
            details: format!("authenticated against {}", names.join(", ")),
        }
    } else {
        DoctorCheck {
            name: "platform_connectivity",
            status: CheckStatus::Fail,
            details: failing.join("; "),
        }
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
