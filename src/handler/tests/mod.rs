//! Handler tests against a mocked Eyes server


use crate::TestResultsHandler;
use crate::config::{Config, LongRequestConfig};
use crate::request::RequestSequence;
use crate::types::SessionSummary;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub(crate) const BATCH: &str = "123";
pub(crate) const SESSION: &str = "456";
pub(crate) const VIEW_KEY: &str = "test-view-key";

/// Config whose poll loop never sleeps, so 202 chains resolve instantly
pub(crate) fn zero_delay_config() -> Config {
    Config {
        long_request: LongRequestConfig {
            initial_delay_secs: 0,
            max_delay_secs: 0,
            backoff_factor: 1.5,
        },
        ..Config::default()
    }
}

pub(crate) async fn mount_summary(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/api/sessions/batches/{BATCH}/{SESSION}/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Handler wired to the mock server, with a fresh correlation sequence for
/// deterministic ids
pub(crate) async fn handler_with_summary(
    server: &MockServer,
    steps: usize,
    summary: serde_json::Value,
    config: Config,
) -> TestResultsHandler {
    mount_summary(server, summary).await;

    let session = SessionSummary {
        url: format!("{}/app/batches/{BATCH}/{SESSION}", server.uri()),
        steps,
    };

    TestResultsHandler::new(&session, VIEW_KEY, config)
        .await
        .expect("handler construction against the mock server")
        .with_sequence(RequestSequence::new())
}

/// Requests the mock server received for a given path
pub(crate) async fn requests_for(server: &MockServer, target: &str) -> Vec<wiremock::Request> {
    server
        .received_requests()
        .await
        .expect("request recording enabled")
        .into_iter()
        .filter(|request| request.url.path() == target)
        .collect()
}
