//! Conditional-request fingerprint probe.
//!
//! Asks an origin whether a page's declared identity (ETag, Last-Modified,
//! Content-Length) changed, without downloading the body. Origins that
//! declare nothing fall back to a GET plus semantic sampling, decided by
//! the caller from the [`ProbeOutcome`].
//!
//! The probe itself never persists anything; the lightweight batch checker
//! owns all storage decisions.

use std::time::Duration;

use reqwest::header::{self, HeaderValue};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Errors from probe construction or body fetches.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("origin returned status {0}")]
    Status(StatusCode),
}

/// Fingerprint values stored from a previous observation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFingerprint {
    pub etag: Option<String>,
    /// Raw `Last-Modified` header value, replayed in `If-Modified-Since`.
    pub last_modified: Option<String>,
    pub content_length: Option<i64>,
    /// Semantic fingerprint for origins that declare no identity headers.
    pub sample_hash: Option<String>,
}

impl StoredFingerprint {
    /// True when nothing has ever been observed for this page.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.etag.is_none()
            && self.last_modified.is_none()
            && self.content_length.is_none()
            && self.sample_hash.is_none()
    }
}

/// Identity headers observed on the current response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservedFingerprint {
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub content_length: Option<i64>,
}

impl ObservedFingerprint {
    fn has_any(&self) -> bool {
        self.etag.is_some() || self.last_modified.is_some() || self.content_length.is_some()
    }
}

/// Which fingerprint component signalled the change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeReason {
    Etag,
    LastModified,
    ContentLength,
}

/// Probe classification for one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Origin's declared identity matches what we stored.
    Unchanged,
    /// A declared identity value differs from storage.
    Changed { reason: ChangeReason },
    /// Header-less origin with a stored semantic sample: the caller must
    /// GET the body and compare sample hashes.
    NeedsSampleCheck,
    /// Nothing stored yet (or a header-less origin with no stored sample):
    /// the caller persists the observed values and reports no change.
    FirstObservation,
    /// The probe itself failed; fingerprints must not advance.
    UnchangedWithError { error: String },
}

/// Result of probing one page.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub url: String,
    pub outcome: ProbeOutcome,
    pub observed: ObservedFingerprint,
}

/// Classify a response against storage. Pure; exercised directly by tests.
#[must_use]
pub fn classify_response(
    stored: &StoredFingerprint,
    observed: &ObservedFingerprint,
    status: StatusCode,
) -> ProbeOutcome {
    if status == StatusCode::NOT_MODIFIED {
        return ProbeOutcome::Unchanged;
    }

    if stored.is_empty() {
        return ProbeOutcome::FirstObservation;
    }

    if observed.has_any() {
        if let Some(etag) = &observed.etag {
            if stored.etag.as_deref() != Some(etag.as_str()) {
                return ProbeOutcome::Changed {
                    reason: ChangeReason::Etag,
                };
            }
        }
        if let Some(last_modified) = &observed.last_modified {
            if stored.last_modified.as_deref() != Some(last_modified.as_str()) {
                return ProbeOutcome::Changed {
                    reason: ChangeReason::LastModified,
                };
            }
        }
        if let Some(length) = observed.content_length {
            if stored.content_length != Some(length) {
                return ProbeOutcome::Changed {
                    reason: ChangeReason::ContentLength,
                };
            }
        }
        return ProbeOutcome::Unchanged;
    }

    // Origin declares nothing. With a stored sample we can still compare
    // semantics; without one this is effectively a first observation.
    if stored.sample_hash.is_some() {
        ProbeOutcome::NeedsSampleCheck
    } else {
        ProbeOutcome::FirstObservation
    }
}

/// Strip the weak-validator prefix so `W/"abc"` and `"abc"` compare equal.
fn normalize_etag(raw: &str) -> String {
    raw.strip_prefix("W/").unwrap_or(raw).to_string()
}

fn header_str(value: Option<&HeaderValue>) -> Option<String> {
    value.and_then(|v| v.to_str().ok()).map(str::to_string)
}

/// Issues conditional HEAD requests and classifies the responses.
#[derive(Clone)]
pub struct FingerprintProbe {
    client: reqwest::Client,
}

impl FingerprintProbe {
    /// Build a probe with its own HTTP client.
    pub fn new(user_agent: &str, timeout_secs: u64) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self { client })
    }

    /// Probe one page with a conditional HEAD.
    ///
    /// Origins that reject HEAD (405) are retried once with a conditional
    /// GET; only headers are inspected either way. Network failures
    /// classify as [`ProbeOutcome::UnchangedWithError`]: one failing page
    /// never fails a batch, and failed pages never advance fingerprints.
    pub async fn probe(&self, url: &str, stored: &StoredFingerprint) -> ProbeResult {
        match self.probe_inner(url, stored).await {
            Ok(result) => result,
            Err(err) => ProbeResult {
                url: url.to_string(),
                outcome: ProbeOutcome::UnchangedWithError {
                    error: err.to_string(),
                },
                observed: ObservedFingerprint::default(),
            },
        }
    }

    async fn probe_inner(
        &self,
        url: &str,
        stored: &StoredFingerprint,
    ) -> Result<ProbeResult, ProbeError> {
        let mut response = self.conditional_request(url, stored, true).await?;

        if response.status() == StatusCode::METHOD_NOT_ALLOWED {
            debug!(url, "origin rejects HEAD, retrying with GET");
            response = self.conditional_request(url, stored, false).await?;
        }

        let status = response.status();
        if status.is_server_error() || (status.is_client_error() && status != StatusCode::NOT_MODIFIED)
        {
            return Err(ProbeError::Status(status));
        }

        let headers = response.headers();
        let observed = ObservedFingerprint {
            etag: header_str(headers.get(header::ETAG)).map(|e| normalize_etag(&e)),
            last_modified: header_str(headers.get(header::LAST_MODIFIED)),
            content_length: header_str(headers.get(header::CONTENT_LENGTH))
                .and_then(|v| v.parse().ok()),
        };

        let outcome = classify_response(stored, &observed, status);
        debug!(url, ?outcome, "probe classified");

        Ok(ProbeResult {
            url: url.to_string(),
            outcome,
            observed,
        })
    }

    async fn conditional_request(
        &self,
        url: &str,
        stored: &StoredFingerprint,
        head: bool,
    ) -> Result<reqwest::Response, ProbeError> {
        let mut request = if head {
            self.client.head(url)
        } else {
            self.client.get(url)
        };

        if let Some(etag) = &stored.etag {
            request = request.header(header::IF_NONE_MATCH, etag);
        }
        if let Some(last_modified) = &stored.last_modified {
            request = request.header(header::IF_MODIFIED_SINCE, last_modified);
        }

        Ok(request.send().await?)
    }

    /// Fetch a page body for sample checks and drift analysis.
    pub async fn fetch_body(&self, url: &str) -> Result<String, ProbeError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Status(status));
        }
        Ok(response.text().await?)
    }
}
