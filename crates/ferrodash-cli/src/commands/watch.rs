use std::time::Duration;

use ferrodash_core::{spawn_refresh, spawn_sweeper, FetchCoordinator, RefreshUpdate, WidgetSource};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::info;

use crate::cli::WatchArgs;
use crate::error::CliError;
use crate::metadata::EnvelopeError;
use crate::output;

use super::{parse_headers, CommandResult};

const SWEEP_PERIOD: Duration = Duration::from_secs(60);

/// Streams one envelope per refresh until `--count` updates or Ctrl-C.
///
/// Returns whether any update carried errors.
pub async fn run(args: &WatchArgs, coordinator: FetchCoordinator) -> Result<bool, CliError> {
    let source = WidgetSource::new(args.endpoint.url.as_str())
        .with_headers(parse_headers(&args.endpoint)?)
        .with_refresh_interval(Duration::from_secs(args.interval_secs))
        .with_selected_fields(args.fields.clone());

    let (updates_tx, mut updates_rx) = mpsc::channel(8);
    let sweeper = spawn_sweeper(coordinator.cache().clone(), SWEEP_PERIOD);
    let handle = spawn_refresh(coordinator, source, updates_tx)?;
    info!(endpoint = %args.endpoint.url, interval_secs = args.interval_secs, "watching");

    let mut seen = 0_u64;
    let mut had_errors = false;
    loop {
        let update = tokio::select! {
            update = updates_rx.recv() => update,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(update) = update else {
            break;
        };

        let result = to_command_result(&update)?;
        had_errors |= !result.errors.is_empty();
        output::render_line(&result.into_envelope())?;

        seen += 1;
        if args.count.is_some_and(|count| seen >= count) {
            break;
        }
    }

    handle.stop();
    sweeper.abort();
    Ok(had_errors)
}

fn to_command_result(update: &RefreshUpdate) -> Result<CommandResult, CliError> {
    let mut errors = Vec::new();
    if let Some(error) = update.error.as_ref() {
        errors.push(EnvelopeError::from(error));
    }
    if let Some(message) = update.result.as_ref().and_then(|result| result.error_message()) {
        errors.push(EnvelopeError::new("normalization_error", message));
    }

    let data = json!({
        "sequence": update.sequence,
        "shape": update.shape,
        "normalized": serde_json::to_value(&update.result)?,
    });
    Ok(CommandResult::ok(data)
        .with_from_cache(update.from_cache)
        .with_errors(errors))
}
