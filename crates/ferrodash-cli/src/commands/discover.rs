use std::time::Instant;

use ferrodash_core::{discover, filter_fields, DisplayMode, FetchCoordinator, FetchRequest};
use serde_json::{json, Value};

use crate::cli::DiscoverArgs;
use crate::error::CliError;
use crate::metadata::EnvelopeError;

use super::{elapsed_ms, parse_headers, CommandResult};

pub async fn run(
    args: &DiscoverArgs,
    coordinator: &FetchCoordinator,
) -> Result<CommandResult, CliError> {
    let request = FetchRequest::new(args.endpoint.url.as_str())?
        .with_headers(parse_headers(&args.endpoint)?)
        .skip_cache();

    let started = Instant::now();
    let outcome = coordinator.fetch(&request).await;
    let latency_ms = elapsed_ms(started);

    if let Some(error) = outcome.error.as_ref() {
        return Ok(CommandResult::ok(Value::Null)
            .with_errors(vec![EnvelopeError::from(error)])
            .with_latency(latency_ms));
    }

    let payload = outcome.data.unwrap_or(Value::Null);
    let mode: DisplayMode = args.mode.into();
    let discovery = discover(&payload);
    let matching = filter_fields(&discovery.fields, &args.search, mode);

    let mut result = CommandResult::ok(json!({
        "shape": discovery.shape,
        "summary": discovery.summary(),
        "hasArrays": discovery.has_arrays,
        "arrayFieldCount": discovery.array_field_count(),
        "fields": matching,
    }))
    .with_latency(latency_ms);

    if mode == DisplayMode::Table && !discovery.has_arrays {
        result = result.with_warning(
            "No array fields found in API response. Please select a different API.",
        );
    }
    Ok(result)
}
