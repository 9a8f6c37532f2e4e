//! Test result handler: retrieval of session results and their artifacts
//!
//! The `TestResultsHandler` struct and its methods are organized by domain:
//! - [`long_request`] - the submit → poll → cleanup state machine
//! - [`artifacts`] - step classification driven image downloads
//!
//! This module holds the handler itself: construction from a session result,
//! the attempt executor every request funnels through, and retrieval of the
//! JSON summary document.

mod artifacts;
mod long_request;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::request::{RequestDescriptor, RequestSequence};
use crate::retry::send_with_retry;
use crate::types::{SessionResult, StepOutcome, TestResultDocument, TestResultRef};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Retrieves a completed visual test session's results and downloads its
/// artifact images
///
/// Construction extracts the server coordinates from the session's results
/// page URL and fetches the JSON summary document. The handler is cheap to
/// share behind a reference; artifact downloads take `&self` and may run
/// concurrently.
///
/// # Example
///
/// ```no_run
/// use eyes_dl::{Config, SessionSummary, TestResultsHandler};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let session = SessionSummary {
///         url: "https://eyes.applitools.com/app/batches/51246/61247".to_string(),
///         steps: 2,
///     };
///
///     let handler =
///         TestResultsHandler::new(&session, "VIEW_KEY", Config::default()).await?;
///
///     handler.download_images("./artifacts".as_ref()).await?;
///     handler.download_diffs("./artifacts".as_ref()).await?;
///
///     Ok(())
/// }
/// ```
pub struct TestResultsHandler {
    client: reqwest::Client,
    view_key: String,
    reference: TestResultRef,
    steps: usize,
    document: TestResultDocument,
    config: Config,
    sequence: RequestSequence,
    cancel: CancellationToken,
}

impl TestResultsHandler {
    /// Build a handler for a completed session and fetch its result document
    ///
    /// Fails with [`Error::InvalidResultsUrl`] when the session's URL does not
    /// contain the `/app/batches/{batch}/{session}` shape, with
    /// [`Error::Network`] when the summary request cannot be delivered, and
    /// with [`Error::Serialization`] when the summary body is not valid JSON.
    pub async fn new<R>(result: &R, view_key: impl Into<String>, config: Config) -> Result<Self>
    where
        R: SessionResult + ?Sized,
    {
        let view_key = view_key.into();
        let reference = TestResultRef::from_results_url(result.url())?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        let document = fetch_document(&client, &reference, &view_key).await?;

        Ok(Self {
            client,
            view_key,
            reference,
            steps: result.steps(),
            document,
            config,
            sequence: RequestSequence::global(),
            cancel: CancellationToken::new(),
        })
    }

    /// Replace the correlation-id sequence (deterministic ids in tests)
    pub fn with_sequence(mut self, sequence: RequestSequence) -> Self {
        self.sequence = sequence;
        self
    }

    /// Attach a cancellation token observed by every poll and retry sleep
    ///
    /// Cancellation surfaces as [`Error::Cancelled`] from the in-flight
    /// operation. The reproduced protocol has no cancellation of its own;
    /// this is a non-breaking extension.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Server coordinates extracted from the results page URL
    pub fn reference(&self) -> &TestResultRef {
        &self.reference
    }

    /// The session's result document, fetched at construction
    pub fn document(&self) -> &TestResultDocument {
        &self.document
    }

    /// Number of steps reported by the session result
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Classification of every step in the session
    pub fn step_outcomes(&self) -> Vec<StepOutcome> {
        self.document.step_outcomes()
    }

    /// Re-fetch the session's result document from the server
    ///
    /// The handler keeps serving the document captured at construction; this
    /// returns a fresh copy without replacing it.
    pub async fn fetch_result_document(&self) -> Result<TestResultDocument> {
        fetch_document(&self.client, &self.reference, &self.view_key).await
    }

    /// One logical request: a single dispatch wrapped in the configured
    /// per-attempt retry policy
    ///
    /// Each dispatch stamps a fresh correlation id and the `apiKey` query
    /// parameter. The returned response is a streaming handle; its body has
    /// not been read.
    pub(crate) async fn send_request(
        &self,
        descriptor: &RequestDescriptor,
    ) -> Result<reqwest::Response> {
        send_with_retry(&self.config.retry, || self.dispatch_attempt(descriptor)).await
    }

    async fn dispatch_attempt(&self, descriptor: &RequestDescriptor) -> Result<reqwest::Response> {
        let request_id = self.sequence.next_request_id();
        let url = descriptor.authenticated_url(&self.view_key);

        tracing::debug!(
            method = %descriptor.method,
            path = url.path(),
            request_id = %request_id,
            "dispatching request attempt"
        );

        let response = self
            .client
            .request(descriptor.method.into(), url)
            .headers(descriptor.attempt_headers(&request_id))
            .send()
            .await?;
        Ok(response)
    }

    /// Sleep that loses against the handler's cancellation token
    pub(crate) async fn sleep_cancellable(&self, duration: Duration) -> Result<()> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}

/// Fetch and decode the session's JSON summary
///
/// This is a plain GET, not a long request: the summary endpoint resolves
/// synchronously.
async fn fetch_document(
    client: &reqwest::Client,
    reference: &TestResultRef,
    view_key: &str,
) -> Result<TestResultDocument> {
    let mut url = Url::parse(&format!(
        "{}/api/sessions/batches/{}/{}/",
        reference.server_url, reference.batch_id, reference.session_id
    ))
    .map_err(|_| Error::InvalidResultsUrl(reference.server_url.clone()))?;
    url.query_pairs_mut()
        .append_pair("apiKey", view_key)
        .append_pair("format", "json");

    let response = client.get(url).send().await?;
    let body = response.bytes().await?;
    let document = serde_json::from_slice(&body)?;
    Ok(document)
}
