//! Request descriptors and the long-request protocol headers
//!
//! Every request the handler sends is first built as a [`RequestDescriptor`]
//! carrying the two fixed protocol headers, then stamped per attempt with a
//! fresh correlation id and the `apiKey` query parameter.

use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue};
use std::sync::Arc;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use url::Url;
use uuid::Uuid;

/// Signals that the client understands queued 202 responses with a follow-up
/// `location` header
pub(crate) const EYES_EXPECT: &str = "eyes-expect";

/// Client-side request date, RFC-1123 GMT
pub(crate) const EYES_DATE: &str = "eyes-date";

/// Per-attempt correlation id, `<counter>--<uuid>`
pub(crate) const CLIENT_REQUEST_ID: &str = "x-applitools-eyes-client-request-id";

/// HTTP methods the long-request protocol uses
///
/// A closed enumeration: an unrecognized method is unrepresentable rather
/// than a runtime error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    /// Retrieve a resource or poll a job
    Get,
    /// Submit a job
    Post,
    /// Clean up a created resource
    Delete,
}

impl Method {
    /// Wire name of the method
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// An immutable request recipe: method, URL and the protocol headers
///
/// Built once per logical operation. The headers are copied and extended per
/// attempt (a fresh correlation id each send), never mutated in place.
#[derive(Clone, Debug)]
pub struct RequestDescriptor {
    /// Request method
    pub method: Method,
    /// Target URL, before authentication is appended
    pub url: Url,
    /// Protocol headers attached at build time
    pub headers: HeaderMap,
}

impl RequestDescriptor {
    /// Build a descriptor with the fixed protocol headers attached
    pub fn new(method: Method, url: Url) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(EYES_EXPECT, HeaderValue::from_static("202+location"));
        if let Ok(date) = HeaderValue::from_str(&eyes_date()) {
            headers.insert(EYES_DATE, date);
        }

        Self {
            method,
            url,
            headers,
        }
    }

    /// Headers for one attempt: the fixed set plus the correlation id
    pub(crate) fn attempt_headers(&self, request_id: &str) -> HeaderMap {
        let mut headers = self.headers.clone();
        if let Ok(value) = HeaderValue::from_str(request_id) {
            headers.insert(CLIENT_REQUEST_ID, value);
        }
        headers
    }

    /// Target URL with the `apiKey` query parameter appended
    pub(crate) fn authenticated_url(&self, view_key: &str) -> Url {
        let mut url = self.url.clone();
        url.query_pairs_mut().append_pair("apiKey", view_key);
        url
    }
}

/// Current date in the RFC-1123 GMT form the protocol requires,
/// e.g. `Tue, 07 Jul 2026 12:00:00 GMT`
fn eyes_date() -> String {
    Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Monotonic attempt counter feeding the correlation id
///
/// The counter is incremented before use, so the first id a sequence hands
/// out is `1--<uuid>`. Handlers share the process-wide [`global`] sequence by
/// default; tests inject a fresh one for deterministic numbering.
///
/// [`global`]: RequestSequence::global
#[derive(Clone, Debug)]
pub struct RequestSequence(Arc<AtomicU64>);

impl RequestSequence {
    /// A fresh sequence starting at zero
    pub fn new() -> Self {
        Self(Arc::new(AtomicU64::new(0)))
    }

    /// The process-wide sequence shared by all handlers
    pub fn global() -> Self {
        static GLOBAL: OnceLock<RequestSequence> = OnceLock::new();
        GLOBAL.get_or_init(RequestSequence::new).clone()
    }

    /// Next correlation id, `<counter>--<uuid-v4>`
    pub fn next_request_id(&self) -> String {
        let attempt = self.0.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}--{}", attempt, Uuid::new_v4())
    }
}

impl Default for RequestSequence {
    fn default() -> Self {
        Self::new()
    }
}
