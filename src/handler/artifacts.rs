//! Artifact selection and image downloads
//!
//! Walks the result document's step outcomes to decide which images exist
//! (baseline / current per stored image id, diff per failed step) and streams
//! each one through the long-request engine into a file under
//! `{base}/{batch}/{session}/`.

use super::TestResultsHandler;
use crate::error::{Error, Result};
use crate::request::Method;
use crate::types::{ArtifactKind, DownloadReport, StepFailure, StepOutcome};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use url::Url;

impl TestResultsHandler {
    /// Run `url` through the long-request engine as a GET and stream the
    /// response body into `sink`
    ///
    /// The body is consumed chunk by chunk, never buffered whole. The sink is
    /// flushed and shut down on success; on any exit path both the response
    /// stream and the sink are released when they drop.
    pub async fn fetch_image<W>(&self, url: Url, sink: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let response = self.send_long_request(Method::Get, url).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            sink.write_all(&chunk?).await?;
        }
        sink.flush().await?;
        sink.shutdown().await?;
        Ok(())
    }

    /// Download the diff image of every failed step into
    /// `{base}/{batch}/{session}/diff_step_{n}.jpg`
    ///
    /// Steps without a diff (passed, new, missing) are recorded as skipped. A
    /// failed download is recorded in the report and the remaining steps
    /// continue.
    pub async fn download_diffs(&self, base: &Path) -> Result<DownloadReport> {
        let dir = self.prepare_path(base).await?;
        let mut report = DownloadReport::default();

        let outcomes = self.document.step_outcomes();
        for (index, outcome) in outcomes.iter().enumerate() {
            let step = index + 1;
            if *outcome != StepOutcome::Failed {
                tracing::info!(step, outcome = %outcome, "no diff image in step");
                report.skipped.push(step);
                continue;
            }

            match self.diff_url(step) {
                Ok(url) => {
                    let dest = dir.join(format!("diff_step_{step}.jpg"));
                    self.save_artifact(url, dest, step, ArtifactKind::Diff, &mut report)
                        .await;
                }
                Err(error) => report.failed.push(StepFailure {
                    step,
                    kind: ArtifactKind::Diff,
                    error,
                }),
            }
        }

        Ok(report)
    }

    /// Download every stored baseline image into
    /// `{base}/{batch}/{session}/baseline_step_{n}.jpg`
    pub async fn download_baseline_images(&self, base: &Path) -> Result<DownloadReport> {
        self.download_output_images(base, ArtifactKind::Baseline)
            .await
    }

    /// Download every stored current image into
    /// `{base}/{batch}/{session}/current_step_{n}.jpg`
    pub async fn download_current_images(&self, base: &Path) -> Result<DownloadReport> {
        self.download_output_images(base, ArtifactKind::Current)
            .await
    }

    /// Download baseline and current images for every step
    pub async fn download_images(&self, base: &Path) -> Result<DownloadReport> {
        let mut report = self.download_baseline_images(base).await?;
        report.merge(self.download_current_images(base).await?);
        Ok(report)
    }

    async fn download_output_images(
        &self,
        base: &Path,
        kind: ArtifactKind,
    ) -> Result<DownloadReport> {
        let dir = self.prepare_path(base).await?;
        let mut report = DownloadReport::default();

        for index in 0..self.steps {
            let step = index + 1;
            let Some(id) = self.document.image_id(kind, index) else {
                // image_id already reported the missing artifact
                report.skipped.push(step);
                continue;
            };

            match self.image_url(id) {
                Ok(url) => {
                    let dest = dir.join(format!("{}_step_{}.jpg", kind.prefix(), step));
                    self.save_artifact(url, dest, step, kind, &mut report).await;
                }
                Err(error) => report.failed.push(StepFailure { step, kind, error }),
            }
        }

        Ok(report)
    }

    async fn save_artifact(
        &self,
        url: Url,
        dest: PathBuf,
        step: usize,
        kind: ArtifactKind,
        report: &mut DownloadReport,
    ) {
        match self.image_to_file(url, &dest).await {
            Ok(()) => {
                tracing::debug!(path = %dest.display(), "artifact saved");
                report.saved.push(dest);
            }
            Err(error) => {
                tracing::warn!(step, kind = %kind, error = %error, "artifact download failed");
                report.failed.push(StepFailure { step, kind, error });
            }
        }
    }

    async fn image_to_file(&self, url: Url, dest: &Path) -> Result<()> {
        let mut file = tokio::fs::File::create(dest).await?;
        self.fetch_image(url, &mut file).await
    }

    /// Destination directory `{base}/{batch}/{session}`, created if absent
    async fn prepare_path(&self, base: &Path) -> Result<PathBuf> {
        let dir = base
            .join(&self.reference.batch_id)
            .join(&self.reference.session_id);
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    fn diff_url(&self, step: usize) -> Result<Url> {
        let raw = format!(
            "{}/api/sessions/batches/{}/{}/steps/{}/diff",
            self.reference.server_url, self.reference.batch_id, self.reference.session_id, step
        );
        Url::parse(&raw).map_err(|_| Error::InvalidResultsUrl(raw))
    }

    fn image_url(&self, id: &str) -> Result<Url> {
        let raw = format!("{}/api/images/{}", self.reference.server_url, id);
        Url::parse(&raw).map_err(|_| Error::InvalidResultsUrl(raw))
    }
}
