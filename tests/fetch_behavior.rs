//! Behavior-driven tests for the fetch coordinator
//!
//! These tests verify HOW the coordinator combines the response cache, the
//! rate-limit backoff table and the transport, using a scripted transport and
//! a manual clock so no test touches the network or sleeps.

use std::sync::Arc;
use std::time::Duration;

use ferrodash_core::{
    CoordinatorConfig, FetchCoordinator, FetchErrorKind, FetchOutcome, FetchRequest, HeaderSet,
    HttpError, HttpResponse, ManualClock, MemoryCache, RequestRoute, ResponseCache,
    ScriptedHttpClient,
};
use serde_json::json;

struct Harness {
    coordinator: FetchCoordinator,
    client: ScriptedHttpClient,
    clock: ManualClock,
}

fn harness(client: ScriptedHttpClient) -> Harness {
    harness_with_config(client, CoordinatorConfig::default())
}

fn harness_with_config(client: ScriptedHttpClient, config: CoordinatorConfig) -> Harness {
    let clock = ManualClock::starting_now();
    let cache = MemoryCache::with_clock(config.default_ttl, Arc::new(clock.clone()));
    let coordinator = FetchCoordinator::with_parts(
        Arc::new(cache),
        Arc::new(client.clone()),
        Arc::new(clock.clone()),
        config,
    );
    Harness {
        coordinator,
        client,
        clock,
    }
}

fn quote_request() -> FetchRequest {
    FetchRequest::new("https://www.alphavantage.co/query?function=TIME_SERIES_DAILY&symbol=IBM")
        .expect("valid endpoint")
        .with_headers(HeaderSet::new().with("X-Api-Key", "demo"))
}

// =============================================================================
// Rate limiting
// =============================================================================

#[tokio::test]
async fn when_api_rate_limits_requests_inside_the_window_short_circuit() {
    // Given: An API that answers 429 with Retry-After: 5, then succeeds
    let client = ScriptedHttpClient::new()
        .reply(HttpResponse::new(429, "{}").with_header("Retry-After", "5"))
        .reply(HttpResponse::ok_json(r#"{"ok":true}"#));
    let h = harness(client);

    // When: The first fetch is rate limited
    let first = h.coordinator.fetch(&quote_request()).await;

    // Then: A rate-limit error with the computed delay is returned
    let error = first.error.expect("rate limit error");
    assert_eq!(error.kind, FetchErrorKind::RateLimit);
    assert_eq!(error.retry_after, Some(5_000));
    assert_eq!(error.status, Some(429));

    // When: The widget refreshes 2 seconds later
    h.clock.advance(Duration::from_secs(2));
    let second = h.coordinator.fetch(&quote_request()).await;

    // Then: The cached error is returned without touching the transport
    assert_eq!(second.error.map(|e| e.kind), Some(FetchErrorKind::RateLimit));
    assert_eq!(h.client.calls(), 1);

    // When: The widget refreshes 6 seconds after the 429
    h.clock.advance(Duration::from_secs(4));
    let third = h.coordinator.fetch(&quote_request()).await;

    // Then: The transport is reached and the backoff record is gone
    assert_eq!(third, FetchOutcome::fresh(json!({"ok": true})));
    assert_eq!(h.client.calls(), 2);
    assert!(h.coordinator.backoff().is_empty().await);
}

#[tokio::test]
async fn when_retry_after_is_missing_the_window_is_sixty_seconds() {
    // Given: A 429 with no Retry-After header
    let client = ScriptedHttpClient::new().reply(HttpResponse::new(429, ""));
    let h = harness(client);

    // When: The fetch is rate limited and the widget retries after 59 s
    h.coordinator.fetch(&quote_request()).await;
    h.clock.advance(Duration::from_secs(59));
    let retry = h.coordinator.fetch(&quote_request()).await;

    // Then: The default 60 s window still applies
    assert_eq!(retry.error.and_then(|e| e.retry_after), Some(60_000));
    assert_eq!(h.client.calls(), 1);
}

#[tokio::test]
async fn when_skip_cache_is_set_backoff_is_bypassed() {
    // Given: An endpoint in backoff after a 429
    let client = ScriptedHttpClient::new()
        .reply(HttpResponse::new(429, "").with_header("Retry-After", "30"))
        .reply(HttpResponse::ok_json("[1,2]"));
    let h = harness(client);
    h.coordinator.fetch(&quote_request()).await;

    // When: A manual refresh skips the cache
    let outcome = h.coordinator.fetch(&quote_request().skip_cache()).await;

    // Then: The transport is reached, the result is cached and the backoff cleared
    assert_eq!(outcome, FetchOutcome::fresh(json!([1, 2])));
    assert!(h.coordinator.backoff().is_empty().await);
    assert_eq!(
        h.coordinator.fetch(&quote_request()).await,
        FetchOutcome::cached(json!([1, 2]))
    );
}

#[tokio::test]
async fn when_headers_differ_backoff_does_not_leak_between_keys() {
    // Given: One header set rate limited
    let client = ScriptedHttpClient::new()
        .reply(HttpResponse::new(429, "").with_header("Retry-After", "30"))
        .reply(HttpResponse::ok_json("{}"));
    let h = harness(client);
    h.coordinator.fetch(&quote_request()).await;

    // When: The same endpoint is requested with another API key
    let other = quote_request().with_headers(HeaderSet::new().with("X-Api-Key", "other"));
    let outcome = h.coordinator.fetch(&other).await;

    // Then: It goes to the network
    assert!(outcome.is_ok());
    assert_eq!(h.client.calls(), 2);
}

// =============================================================================
// Caching
// =============================================================================

#[tokio::test]
async fn when_entry_is_fresh_it_is_served_until_ttl_elapses() {
    // Given: A successful response cached with a 10 s TTL
    let client = ScriptedHttpClient::new()
        .reply(HttpResponse::ok_json(r#"{"v":1}"#))
        .reply(HttpResponse::ok_json(r#"{"v":2}"#));
    let h = harness(client);
    let request = quote_request().with_ttl(Duration::from_secs(10));
    h.coordinator.fetch(&request).await;

    // When: The widget refreshes at exactly cachedAt + ttl
    h.clock.advance(Duration::from_secs(10));
    let at_expiry = h.coordinator.fetch(&request).await;

    // Then: The entry is still served
    assert_eq!(at_expiry, FetchOutcome::cached(json!({"v": 1})));

    // When: Time moves past expiresAt
    h.clock.advance(Duration::from_millis(1));
    let after = h.coordinator.fetch(&request).await;

    // Then: The transport is reached again
    assert_eq!(after, FetchOutcome::fresh(json!({"v": 2})));
    assert_eq!(h.client.calls(), 2);
}

#[tokio::test]
async fn when_entry_is_invalidated_next_fetch_reaches_transport() {
    // Given: A cached response
    let client = ScriptedHttpClient::new();
    let h = harness(client);
    h.coordinator.fetch(&quote_request()).await;

    // When: The entry is invalidated
    assert!(h.coordinator.invalidate(&quote_request()).await);
    h.coordinator.fetch(&quote_request()).await;

    // Then: Both fetches reached the transport
    assert_eq!(h.client.calls(), 2);
}

// =============================================================================
// Error taxonomy
// =============================================================================

#[tokio::test]
async fn when_upstream_fails_errors_are_classified_and_not_cached() {
    let cases = [
        (401, FetchErrorKind::AuthError),
        (403, FetchErrorKind::PermissionError),
        (404, FetchErrorKind::NotFound),
        (502, FetchErrorKind::ServerError),
        (422, FetchErrorKind::HttpError),
    ];

    for (status, kind) in cases {
        // Given: An API returning the status
        let client = ScriptedHttpClient::new().reply(HttpResponse::new(status, ""));
        let h = harness(client);

        // When: It is fetched
        let outcome = h.coordinator.fetch(&quote_request()).await;

        // Then: The error kind matches and nothing was cached or backed off
        let error = outcome.error.expect("error outcome");
        assert_eq!(error.kind, kind, "status {status}");
        assert_eq!(error.status, Some(status));
        assert!(h
            .coordinator
            .cache()
            .get(&quote_request().cache_key())
            .await
            .is_none());
        assert!(h.coordinator.backoff().is_empty().await);
    }
}

#[tokio::test]
async fn when_transport_fails_a_network_error_is_returned_as_data() {
    // Given: A transport that times out
    let client = ScriptedHttpClient::new().fail(HttpError::timeout("request timeout"));
    let h = harness(client);

    // When: The endpoint is fetched
    let outcome = h.coordinator.fetch(&quote_request()).await;

    // Then: The failure is a network error value, not a panic
    assert_eq!(
        serde_json::to_value(&outcome).expect("serializes"),
        json!({
            "data": null,
            "fromCache": false,
            "error": {"message": "request timeout", "type": "network_error"}
        })
    );
}

#[tokio::test]
async fn when_relay_reports_an_error_its_message_and_details_are_kept() {
    // Given: A relay answering 400 with a structured body
    let client = ScriptedHttpClient::new().reply(HttpResponse::new(
        400,
        r#"{"error":"Response is not valid JSON","details":"<html>"}"#,
    ));
    let h = harness(client);

    // When: The endpoint is fetched
    let error = h
        .coordinator
        .fetch(&quote_request())
        .await
        .error
        .expect("error outcome");

    // Then: The relay's message and details surface
    assert_eq!(error.kind, FetchErrorKind::HttpError);
    assert_eq!(error.message, "Response is not valid JSON");
    assert_eq!(error.details.as_deref(), Some("<html>"));
}

// =============================================================================
// Routing
// =============================================================================

#[tokio::test]
async fn when_relay_route_is_configured_target_and_headers_are_encoded() {
    // Given: A coordinator routed through a relay
    let route = RequestRoute::relay("http://localhost:3000/api/proxy").expect("valid relay");
    let h = harness_with_config(
        ScriptedHttpClient::new(),
        CoordinatorConfig::default().with_route(route),
    );

    // When: An endpoint with headers is fetched
    h.coordinator
        .fetch(
            &FetchRequest::new("https://api.test/a?b=c")
                .expect("valid endpoint")
                .with_headers(HeaderSet::new().with("Accept", "application/json")),
        )
        .await;

    // Then: The relay receives the target and headers as query parameters
    let sent = &h.client.requests()[0];
    assert_eq!(
        sent.url,
        "http://localhost:3000/api/proxy?url=https%3A%2F%2Fapi.test%2Fa%3Fb%3Dc\
         &headers=%7B%22accept%22%3A%22application%2Fjson%22%7D"
    );
    assert!(sent.headers.is_empty());
}

// =============================================================================
// Untrusted durations
// =============================================================================

#[tokio::test]
async fn when_retry_after_is_absurdly_large_the_window_is_clamped() {
    // Given: An API that demands a wait far past the representable date range
    let client = ScriptedHttpClient::new()
        .reply(HttpResponse::new(429, "{}").with_header("Retry-After", "99999999999999"));
    let h = harness(client);

    // When: The widget fetches, then tries again a year later
    let first = h.coordinator.fetch(&quote_request()).await;
    h.clock.advance(Duration::from_secs(365 * 24 * 60 * 60));
    let second = h.coordinator.fetch(&quote_request()).await;

    // Then: Both are rate-limit errors and the transport was hit once
    assert_eq!(
        first.error.map(|error| error.kind),
        Some(FetchErrorKind::RateLimit)
    );
    assert_eq!(
        second.error.map(|error| error.kind),
        Some(FetchErrorKind::RateLimit)
    );
    assert_eq!(h.client.calls(), 1);
}

#[tokio::test]
async fn when_ttl_is_absurdly_large_the_payload_is_still_cached() {
    // Given: A caller asking for an effectively infinite cache lifetime
    let client = ScriptedHttpClient::new().reply(HttpResponse::ok_json(r#"{"v":1}"#));
    let h = harness(client);
    let request = quote_request().with_ttl(Duration::from_secs(u64::MAX / 2));

    // When: The widget fetches twice
    let first = h.coordinator.fetch(&request).await;
    let second = h.coordinator.fetch(&request).await;

    // Then: The first is fresh and the second is served from cache
    assert_eq!(first, FetchOutcome::fresh(json!({"v": 1})));
    assert_eq!(second, FetchOutcome::cached(json!({"v": 1})));
}
