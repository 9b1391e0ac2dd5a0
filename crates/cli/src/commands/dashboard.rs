use crate::commands::{open_session, CommandResult, EXIT_FAILURE};

/// Prints the dashboard roll-up as pretty JSON, the same shape the HTTP
/// dashboard endpoint returns.
pub fn run() -> CommandResult {
    let session = match open_session() {
        Ok(session) => session,
        Err(error) => return error.into_result("dashboard"),
    };

    if session.registry.is_empty() {
        return CommandResult::failure(
            "dashboard",
            "no_platforms",
            "no CRM platform is configured",
            EXIT_FAILURE,
        );
    }

    let limit = session.config.aggregation.dashboard_page_limit;
    let summary = session.runtime.block_on(session.registry.dashboard_summary(limit));

    match serde_json::to_string_pretty(&summary) {
        Ok(output) => CommandResult { exit_code: 0, output },
        Err(error) => CommandResult::failure(
            "dashboard",
            "serialization",
            error.to_string(),
            EXIT_FAILURE,
        ),
    }
}
