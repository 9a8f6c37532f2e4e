//! # eyes-dl
//!
//! Backend library for retrieving Applitools Eyes visual test results and
//! downloading their artifact images (baseline, current, diff).
//!
//! ## Design Philosophy
//!
//! eyes-dl is designed to be:
//! - **Protocol-faithful** - Implements the Eyes long-request protocol
//!   (202 polling with capped backoff, 201 cleanup) exactly as the server
//!   speaks it
//! - **Sensible defaults** - The documented retry and polling constants work
//!   out of the box; every one of them can be overridden
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Streaming** - Image bodies flow into caller-supplied sinks, never
//!   buffered whole
//!
//! ## Quick Start
//!
//! ```no_run
//! use eyes_dl::{Config, SessionSummary, TestResultsHandler};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // The results page URL and step count come from the test session
//!     // (an SDK result object, a CI record, ...)
//!     let session = SessionSummary {
//!         url: "https://eyes.applitools.com/app/batches/51246/61247".to_string(),
//!         steps: 2,
//!     };
//!
//!     let handler =
//!         TestResultsHandler::new(&session, "APPLITOOLS_VIEW_KEY", Config::default()).await?;
//!
//!     for (step, outcome) in handler.step_outcomes().iter().enumerate() {
//!         println!("step {}: {}", step + 1, outcome);
//!     }
//!
//!     handler.download_images("./artifacts".as_ref()).await?;
//!     handler.download_diffs("./artifacts".as_ref()).await?;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Test result handler (long-request engine and artifact downloads)
pub mod handler;
/// Request descriptors and protocol headers
pub mod request;
/// Retry logic for individual request attempts
pub mod retry;
/// Core types and step classification
pub mod types;

// Re-export commonly used types
pub use config::{Config, LongRequestConfig, RetryConfig};
pub use error::{Error, Result};
pub use handler::TestResultsHandler;
pub use request::{Method, RequestDescriptor, RequestSequence};
pub use retry::IsRetryable;
pub use types::{
    ArtifactKind, DownloadReport, ImageRef, SessionResult, SessionSummary, StepFailure,
    StepOutcome, StepOutput, TestResultDocument, TestResultRef,
};
