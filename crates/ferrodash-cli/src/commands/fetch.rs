use std::time::{Duration, Instant};

use ferrodash_core::{FetchCoordinator, FetchRequest};
use serde_json::Value;
use tracing::info;

use crate::cli::FetchArgs;
use crate::error::CliError;
use crate::metadata::EnvelopeError;

use super::{analyze, elapsed_ms, parse_headers, CommandResult};

pub async fn run(args: &FetchArgs, coordinator: &FetchCoordinator) -> Result<CommandResult, CliError> {
    let mut request = FetchRequest::new(args.endpoint.url.as_str())?
        .with_headers(parse_headers(&args.endpoint)?);
    if args.ttl_secs > 0 {
        request = request.with_ttl(Duration::from_secs(args.ttl_secs));
    }

    let started = Instant::now();
    let outcome = coordinator.fetch(&request).await;
    let latency_ms = elapsed_ms(started);
    info!(endpoint = %request.endpoint, latency_ms, from_cache = outcome.from_cache, "fetch finished");

    let result = CommandResult::ok(Value::Null)
        .with_latency(latency_ms)
        .with_from_cache(outcome.from_cache);

    if let Some(error) = outcome.error.as_ref() {
        return Ok(result.with_errors(vec![EnvelopeError::from(error)]));
    }

    let payload = outcome.data.unwrap_or(Value::Null);
    let (data, errors) = analyze(&payload, &args.fields, args.mode.into())?;
    Ok(CommandResult { data, ..result }.with_errors(errors))
}
