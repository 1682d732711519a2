//! Timer-driven widget refresh.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::detect::{classify_payload, ShapeTag};
use crate::error::ValidationError;
use crate::fetch::{FetchCoordinator, FetchRequest};
use crate::fetch_error::FetchError;
use crate::headers::HeaderSet;
use crate::normalize::{normalize, NormalizedResult};

/// Refresh interval used when a widget does not set one.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// What a widget polls and how it reads the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetSource {
    pub endpoint: String,
    pub headers: HeaderSet,
    pub refresh_interval: Duration,
    pub selected_fields: Vec<String>,
    /// Shape fixed at configuration time. `None` classifies every payload.
    pub shape: Option<ShapeTag>,
}

impl WidgetSource {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            headers: HeaderSet::new(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            selected_fields: Vec::new(),
            shape: None,
        }
    }

    pub fn with_headers(mut self, headers: HeaderSet) -> Self {
        self.headers = headers;
        self
    }

    /// Zero keeps the default interval.
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        if !interval.is_zero() {
            self.refresh_interval = interval;
        }
        self
    }

    pub fn with_selected_fields(mut self, fields: Vec<String>) -> Self {
        self.selected_fields = fields;
        self
    }

    pub fn with_shape(mut self, shape: ShapeTag) -> Self {
        self.shape = Some(shape);
        self
    }

    fn fetch_request(&self) -> Result<FetchRequest, ValidationError> {
        Ok(FetchRequest::new(self.endpoint.clone())?
            .with_headers(self.headers.clone())
            .with_ttl(self.refresh_interval))
    }
}

/// One refresh result published to the widget.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshUpdate {
    /// Starts at 1 and increases by one per tick.
    pub sequence: u64,
    pub from_cache: bool,
    pub shape: Option<ShapeTag>,
    pub result: Option<NormalizedResult>,
    pub error: Option<FetchError>,
}

/// Running refresh timer. Dropping the handle leaves the timer running.
#[derive(Debug)]
pub struct RefreshHandle {
    task: JoinHandle<()>,
}

impl RefreshHandle {
    /// Stops the timer. A fetch already in flight is abandoned with it.
    pub fn stop(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the loop to end on its own (receiver dropped).
    pub async fn join(self) {
        let _ = self.task.await;
    }
}

/// Fetches `source` immediately and then once per refresh interval,
/// publishing each normalized result to `updates`.
///
/// The loop ends when `updates` is closed.
pub fn spawn_refresh(
    coordinator: FetchCoordinator,
    source: WidgetSource,
    updates: mpsc::Sender<RefreshUpdate>,
) -> Result<RefreshHandle, ValidationError> {
    let request = source.fetch_request()?;

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(source.refresh_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut sequence = 0_u64;

        loop {
            ticker.tick().await;
            sequence += 1;

            let outcome = coordinator.fetch(&request).await;
            let (shape, result) = match outcome.data.as_ref() {
                Some(data) => {
                    let shape = source.shape.unwrap_or_else(|| classify_payload(data));
                    (Some(shape), Some(normalize(data, shape, &source.selected_fields)))
                }
                None => (None, None),
            };

            let update = RefreshUpdate {
                sequence,
                from_cache: outcome.from_cache,
                shape,
                result,
                error: outcome.error,
            };
            if updates.send(update).await.is_err() {
                debug!(endpoint = %source.endpoint, "refresh receiver closed");
                break;
            }
        }
    });

    Ok(RefreshHandle { task })
}
