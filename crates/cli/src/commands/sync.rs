use std::sync::Arc;

use compass_core::connector::DiscardSink;
use compass_core::registry::PlatformOutcome;

use crate::commands::{open_session, CommandResult, EXIT_FAILURE};

pub fn run() -> CommandResult {
    let session = match open_session() {
        Ok(session) => session,
        Err(error) => return error.into_result("sync"),
    };

    if session.registry.is_empty() {
        return CommandResult::failure(
            "sync",
            "no_platforms",
            "no CRM platform is configured",
            EXIT_FAILURE,
        );
    }

    let results = session.runtime.block_on(session.registry.sync_all(Arc::new(DiscardSink)));

    let mut failed = Vec::new();
    let mut lines = Vec::new();
    for (name, result) in &results {
        match &result.outcome {
            PlatformOutcome::Data(report) => {
                lines.push(format!("{name}: {} records at {}", report.total(), report.timestamp));
            }
            PlatformOutcome::Error(error) => {
                failed.push(name.clone());
                lines.push(format!("{name}: failed ({error})"));
            }
        }
    }

    let message = lines.join("; ");
    if failed.is_empty() {
        CommandResult::success("sync", message)
    } else {
        CommandResult::failure("sync", "platform_sync", message, EXIT_FAILURE)
    }
}
