//! Core types for eyes-dl

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::OnceLock;

/// A completed visual test session, as supplied by the caller
///
/// This is the boundary to whatever produced the session (an SDK result
/// object, a CI record, a plain pair of values). The handler only needs the
/// results page URL and the number of visual checkpoints the session ran.
pub trait SessionResult {
    /// The results page URL, containing `/app/batches/{batch}/{session}`
    fn url(&self) -> &str;

    /// Number of visual checkpoints (steps) in the session
    fn steps(&self) -> usize;
}

/// Plain [`SessionResult`] for callers without an SDK result object
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Results page URL
    pub url: String,
    /// Number of steps in the session
    pub steps: usize,
}

impl SessionResult for SessionSummary {
    fn url(&self) -> &str {
        &self.url
    }

    fn steps(&self) -> usize {
        self.steps
    }
}

/// Server coordinates of one test session, extracted from its results page URL
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResultRef {
    /// URL prefix before `/app/batches`
    pub server_url: String,
    /// Path segment following `/app/batches/`
    pub batch_id: String,
    /// Path segment following the batch id
    pub session_id: String,
}

// The pattern is a literal and always compiles
#[allow(clippy::expect_used)]
fn results_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<server>.+?)/app/batches/(?P<batch>[^/?#]+)/(?P<session>[^/?#]+)")
            .expect("results URL pattern is valid")
    })
}

impl TestResultRef {
    /// Extract server URL, batch id and session id from a results page URL
    ///
    /// The URL must match `{server}/app/batches/{batch}/{session}...`;
    /// anything else fails with [`Error::InvalidResultsUrl`].
    pub fn from_results_url(url: &str) -> Result<Self> {
        let captures = results_url_pattern()
            .captures(url)
            .ok_or_else(|| Error::InvalidResultsUrl(url.to_string()))?;

        Ok(Self {
            server_url: captures["server"].to_string(),
            batch_id: captures["batch"].to_string(),
            session_id: captures["session"].to_string(),
        })
    }
}

/// Decoded JSON summary of one test session
///
/// Holds the two parallel step sequences the artifact selector walks. The
/// server sends more fields than these; everything else is ignored on decode.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResultDocument {
    /// Baseline output per step; `None` entries are steps with no baseline
    #[serde(default)]
    pub expected_app_output: Vec<Option<StepOutput>>,

    /// Current output per step; `None` entries are steps with no capture
    #[serde(default)]
    pub actual_app_output: Vec<Option<StepOutput>>,
}

/// One step's captured output inside a result document
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepOutput {
    /// Whether the capture matched the baseline (absent on baseline entries)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_matching: Option<bool>,

    /// Reference to the captured image, if one was stored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,
}

/// Stored image reference inside a step output
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ImageRef {
    /// Server-side image id, used to build the download URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl TestResultDocument {
    /// Classify every step of the session
    ///
    /// The sequence length is `max(len(expected), len(actual))`; an index
    /// beyond the end of the shorter sequence reads as an absent entry.
    pub fn step_outcomes(&self) -> Vec<StepOutcome> {
        let steps = self.expected_app_output.len().max(self.actual_app_output.len());
        (0..steps)
            .map(|i| {
                let expected = self.expected_app_output.get(i).and_then(Option::as_ref);
                let actual = self.actual_app_output.get(i).and_then(Option::as_ref);
                match (expected, actual) {
                    (_, None) => StepOutcome::Missing,
                    (None, Some(_)) => StepOutcome::New,
                    (Some(_), Some(actual)) if actual.is_matching == Some(true) => {
                        StepOutcome::Passed
                    }
                    _ => StepOutcome::Failed,
                }
            })
            .collect()
    }

    /// Image id stored for `kind` at zero-based `step`, if any
    ///
    /// Absence is an expected, non-exceptional outcome (a step may have no
    /// corresponding capture); it is logged and the caller skips the download.
    /// Diff images are addressed by step URL, not by id, so
    /// [`ArtifactKind::Diff`] always yields `None`.
    pub fn image_id(&self, kind: ArtifactKind, step: usize) -> Option<&str> {
        let output = match kind {
            ArtifactKind::Baseline => &self.expected_app_output,
            ArtifactKind::Current => &self.actual_app_output,
            ArtifactKind::Diff => return None,
        };

        let id = output
            .get(step)
            .and_then(Option::as_ref)
            .and_then(|step_output| step_output.image.as_ref())
            .and_then(|image| image.id.as_deref());

        if id.is_none() {
            tracing::warn!(step = step + 1, kind = %kind, "image missing for step");
        }
        id
    }
}

/// Result of comparing one step's capture against its baseline
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    /// Capture matched the baseline
    Passed,
    /// Capture differed from the baseline
    Failed,
    /// Capture exists but there is no baseline yet
    New,
    /// No capture was produced for this step
    Missing,
}

impl std::fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StepOutcome::Passed => "passed",
            StepOutcome::Failed => "failed",
            StepOutcome::New => "new",
            StepOutcome::Missing => "missing",
        };
        write!(f, "{s}")
    }
}

/// Kind of image artifact associated with a step
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// The expected (baseline) capture
    Baseline,
    /// The actual (current) capture
    Current,
    /// The rendered difference between baseline and current
    Diff,
}

impl ArtifactKind {
    /// Filename prefix used in the on-disk layout
    /// (`{prefix}_step_{n}.jpg`)
    pub fn prefix(&self) -> &'static str {
        match self {
            ArtifactKind::Baseline => "baseline",
            ArtifactKind::Current => "current",
            ArtifactKind::Diff => "diff",
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.prefix())
    }
}

/// One failed artifact download within a batch
#[derive(Debug)]
pub struct StepFailure {
    /// One-based step number
    pub step: usize,
    /// Which artifact failed
    pub kind: ArtifactKind,
    /// Why it failed
    pub error: Error,
}

/// Outcome of a batch of artifact downloads
///
/// A single failed image does not abort the remaining downloads; failures are
/// collected here instead. This aggregation is an extension over the original
/// behavior, which stopped the whole batch at the first error.
#[derive(Debug, Default)]
pub struct DownloadReport {
    /// Paths written, in download order
    pub saved: Vec<PathBuf>,
    /// One-based step numbers skipped because no artifact exists for them
    pub skipped: Vec<usize>,
    /// Downloads that failed, with the per-step error
    pub failed: Vec<StepFailure>,
}

impl DownloadReport {
    /// True when every existing artifact was downloaded successfully
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Fold another report into this one, preserving order
    pub fn merge(&mut self, other: DownloadReport) {
        self.saved.extend(other.saved);
        self.skipped.extend(other.skipped);
        self.failed.extend(other.failed);
    }
}
