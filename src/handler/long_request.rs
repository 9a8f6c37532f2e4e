//! The long-request engine
//!
//! Some server operations complete immediately, some are queued. A queued
//! operation answers 202 Accepted with a `location` header; the client polls
//! that location with an escalating, capped delay until the job reaches a
//! terminal state. A 201 Created answer hands back a resource that must be
//! DELETEd before the operation counts as finished.
//!
//! The engine is a small state machine keyed on the HTTP status of each
//! response:
//!
//! | Status | Transition |
//! |---|---|
//! | 200 | done, return the response |
//! | 202 | poll the `location` until the job settles, re-classify |
//! | 201 | DELETE the `location`; that attempt's outcome is the result |
//! | 410 | the server discarded the job — fatal |
//! | other | outside the contract — fatal |

use super::TestResultsHandler;
use crate::config::LongRequestConfig;
use crate::error::{Error, Result};
use crate::request::{Method, RequestDescriptor};
use reqwest::StatusCode;
use std::time::Duration;
use url::Url;

impl TestResultsHandler {
    /// Execute a request through the long-request protocol
    ///
    /// Returns the terminal 200 response (streaming handle, body unread), or
    /// the response of the cleanup DELETE when the server answered 201.
    pub(crate) async fn send_long_request(
        &self,
        method: Method,
        url: Url,
    ) -> Result<reqwest::Response> {
        let descriptor = RequestDescriptor::new(method, url);
        let response = self.send_request(&descriptor).await?;
        self.long_request_check_status(response).await
    }

    /// Classify a response and drive the protocol to a terminal outcome
    ///
    /// The source formulated this as mutual recursion between classification
    /// and the poll loop; an explicit loop keeps the call stack flat across
    /// any number of 202 rounds.
    async fn long_request_check_status(
        &self,
        mut response: reqwest::Response,
    ) -> Result<reqwest::Response> {
        loop {
            match response.status() {
                StatusCode::OK => return Ok(response),
                StatusCode::ACCEPTED => {
                    let url = location_url(&response)?;
                    let descriptor = RequestDescriptor::new(Method::Get, url);
                    // The loop only ever terminates on a non-202 response,
                    // which this loop iteration then re-classifies
                    response = self.long_request_loop(descriptor).await?;
                }
                StatusCode::CREATED => {
                    let url = location_url(&response)?;
                    tracing::debug!(location = %url, "resource created, sending cleanup delete");
                    let descriptor = RequestDescriptor::new(Method::Delete, url);
                    return self.send_request(&descriptor).await;
                }
                StatusCode::GONE => return Err(Error::JobGone),
                status => {
                    return Err(Error::UnknownLongRequestStatus {
                        status: status.as_u16(),
                    });
                }
            }
        }
    }

    /// Poll a job's follow-up location until it stops answering 202
    ///
    /// The delay is recomputed *before* every sleep, so the first poll
    /// already waits `initial * factor` seconds, and successive polls
    /// escalate until the cap. There is no iteration bound: the loop runs
    /// until the server answers something terminal, a transport attempt
    /// exhausts its retries, or the handler is cancelled.
    async fn long_request_loop(
        &self,
        descriptor: RequestDescriptor,
    ) -> Result<reqwest::Response> {
        let mut delay_secs = self.config.long_request.initial_delay_secs;

        loop {
            delay_secs = next_poll_delay(delay_secs, &self.config.long_request);
            tracing::debug!(delay_secs, "job still running, polling again");
            self.sleep_cancellable(Duration::from_secs(delay_secs)).await?;

            let response = self.send_request(&descriptor).await?;
            if response.status() != StatusCode::ACCEPTED {
                return Ok(response);
            }
        }
    }
}

/// Next delay in the polling schedule: `min(max, floor(current * factor))`
pub(crate) fn next_poll_delay(current_secs: u64, config: &LongRequestConfig) -> u64 {
    config
        .max_delay_secs
        .min((current_secs as f64 * config.backoff_factor).floor() as u64)
}

/// Follow-up URL from a 201/202 response's `location` header, resolved
/// against the request URL
fn location_url(response: &reqwest::Response) -> Result<Url> {
    let status = response.status().as_u16();
    let value = response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(Error::MissingLocation { status })?;

    response
        .url()
        .join(value)
        .map_err(|_| Error::MissingLocation { status })
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_schedule_escalates_and_stabilizes_at_the_cap() {
        let config = LongRequestConfig::default();
        let mut delay = config.initial_delay_secs;
        let mut schedule = vec![delay];
        for _ in 0..8 {
            delay = next_poll_delay(delay, &config);
            schedule.push(delay);
        }

        assert_eq!(schedule, vec![2, 3, 4, 6, 9, 10, 10, 10, 10]);
    }

    #[test]
    fn first_poll_delay_is_initial_times_factor_not_initial() {
        let config = LongRequestConfig::default();
        assert_eq!(next_poll_delay(config.initial_delay_secs, &config), 3);
    }

    #[test]
    fn delay_is_floored_to_whole_seconds() {
        let config = LongRequestConfig {
            initial_delay_secs: 3,
            max_delay_secs: 100,
            backoff_factor: 1.5,
        };
        // 3 * 1.5 = 4.5 -> 4
        assert_eq!(next_poll_delay(3, &config), 4);
    }

    #[test]
    fn delay_never_exceeds_the_cap() {
        let config = LongRequestConfig {
            initial_delay_secs: 2,
            max_delay_secs: 5,
            backoff_factor: 10.0,
        };
        assert_eq!(next_poll_delay(2, &config), 5);
        assert_eq!(next_poll_delay(5, &config), 5);
    }

    #[test]
    fn zero_delay_config_polls_without_sleeping() {
        let config = LongRequestConfig {
            initial_delay_secs: 0,
            max_delay_secs: 0,
            backoff_factor: 1.5,
        };
        assert_eq!(next_poll_delay(0, &config), 0);
    }
}
