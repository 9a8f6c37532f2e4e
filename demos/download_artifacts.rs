//! Artifact download example
//!
//! This example demonstrates the core functionality of eyes-dl:
//! - Describing a completed visual test session
//! - Creating a results handler (fetches the summary document)
//! - Inspecting per-step outcomes
//! - Downloading baseline, current and diff images

use eyes_dl::config::{Config, LongRequestConfig, RetryConfig};
use eyes_dl::{SessionSummary, TestResultsHandler};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging (optional)
    // Uncomment if you add tracing-subscriber to your dependencies:
    // tracing_subscriber::fmt::init();

    // The results page URL and step count come out of the test run itself,
    // e.g. the result object your Eyes SDK returns on close()
    let session = SessionSummary {
        url: "https://eyes.applitools.com/app/batches/00000251/00000252".to_string(),
        steps: 2,
    };

    // Build configuration — the defaults match the server's documented
    // constants; shown here spelled out
    let config = Config {
        retry: RetryConfig {
            retries: 1,
            retry_interval: Duration::from_millis(500),
            delay_before_retry: false,
        },
        long_request: LongRequestConfig {
            initial_delay_secs: 2,
            max_delay_secs: 10,
            backoff_factor: 1.5,
        },
        request_timeout: Some(Duration::from_secs(30)),
    };

    // Create the handler; this extracts the server coordinates from the URL
    // and fetches the session's result document
    let view_key = std::env::var("APPLITOOLS_VIEW_KEY")?;
    let handler = TestResultsHandler::new(&session, view_key, config).await?;

    // Inspect per-step outcomes
    for (index, outcome) in handler.step_outcomes().iter().enumerate() {
        println!("step {}: {}", index + 1, outcome);
    }

    // Download everything into ./artifacts/{batch}/{session}/
    let base = std::path::Path::new("./artifacts");
    let images = handler.download_images(base).await?;
    let diffs = handler.download_diffs(base).await?;

    for saved in images.saved.iter().chain(diffs.saved.iter()) {
        println!("saved {}", saved.display());
    }
    for failure in images.failed.iter().chain(diffs.failed.iter()) {
        eprintln!(
            "step {} {} failed: {}",
            failure.step, failure.kind, failure.error
        );
    }

    Ok(())
}
