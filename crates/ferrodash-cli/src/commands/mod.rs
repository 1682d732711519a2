mod discover;
mod fetch;
mod inspect;
mod watch;

use std::time::Duration;

use ferrodash_core::{
    discover as discover_fields, fields_for_display, normalize, validate_field_selection,
    CoordinatorConfig, DisplayMode, FetchCoordinator, HeaderSet, RequestRoute,
};
use serde::Serialize;
use serde_json::Value;

use crate::cli::{Cli, Command, EndpointArgs};
use crate::error::CliError;
use crate::metadata::{Envelope, EnvelopeError, Metadata};
use crate::output;

pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
    pub errors: Vec<EnvelopeError>,
    pub latency_ms: u64,
    pub from_cache: bool,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            warnings: Vec::new(),
            errors: Vec::new(),
            latency_ms: 0,
            from_cache: false,
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn with_errors(mut self, errors: Vec<EnvelopeError>) -> Self {
        self.errors.extend(errors);
        self
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn with_from_cache(mut self, from_cache: bool) -> Self {
        self.from_cache = from_cache;
        self
    }

    pub fn into_envelope(self) -> Envelope {
        let mut meta = Metadata::new(self.latency_ms, self.from_cache);
        for warning in self.warnings {
            meta.push_warning(warning);
        }
        Envelope::new(meta, self.data, self.errors)
    }
}

/// Runs the selected command and prints its output.
///
/// Returns whether any envelope carried errors.
pub async fn run(cli: &Cli) -> Result<bool, CliError> {
    let command_result = match &cli.command {
        Command::Inspect(args) => inspect::run(args)?,
        Command::Discover(args) => discover::run(args, &coordinator(cli)?).await?,
        Command::Fetch(args) => fetch::run(args, &coordinator(cli)?).await?,
        Command::Watch(args) => return watch::run(args, coordinator(cli)?).await,
    };

    let envelope = command_result.into_envelope();
    output::render(&envelope, cli.pretty)?;
    Ok(!envelope.errors.is_empty())
}

/// Coordinator configured from `FERRODASH_*` variables, then global flags.
fn coordinator(cli: &Cli) -> Result<FetchCoordinator, CliError> {
    let mut config = CoordinatorConfig::from_env()?;
    if let Some(relay_url) = &cli.relay_url {
        config = config.with_route(RequestRoute::relay(relay_url.as_str())?);
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config = config.with_timeout((timeout_ms > 0).then(|| Duration::from_millis(timeout_ms)));
    }
    Ok(FetchCoordinator::new(config))
}

fn parse_headers(args: &EndpointArgs) -> Result<HeaderSet, CliError> {
    let mut headers = HeaderSet::new();
    for raw in &args.headers {
        let (name, value) = HeaderSet::parse_line(raw)?;
        headers.insert(&name, &value);
    }
    Ok(headers)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Analysis {
    shape: ferrodash_core::ShapeTag,
    selected_fields: Vec<String>,
    field_count: usize,
    normalized: ferrodash_core::NormalizedResult,
}

/// Discovers `payload`, resolves the stored field list for `mode` and
/// normalizes. A rejected selection is reported as an envelope error.
fn analyze(
    payload: &Value,
    selected: &[String],
    mode: DisplayMode,
) -> Result<(Value, Vec<EnvelopeError>), CliError> {
    let discovery = discover_fields(payload);
    let mut errors = Vec::new();
    if let Err(error) = validate_field_selection(selected, mode, &discovery.fields) {
        errors.push(EnvelopeError::new("invalid_selection", error.to_string()));
    }

    let selected_fields = fields_for_display(selected, mode, discovery.shape, &discovery.fields);
    let normalized = normalize(payload, discovery.shape, &selected_fields);
    if let Some(message) = normalized.error_message() {
        errors.push(EnvelopeError::new("normalization_error", message));
    }

    let analysis = Analysis {
        shape: discovery.shape,
        selected_fields,
        field_count: discovery.fields.len(),
        normalized,
    };
    Ok((serde_json::to_value(analysis)?, errors))
}

fn elapsed_ms(started: std::time::Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
