use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{CONTENT_LENGTH, HeaderMap, HeaderValue, USER_AGENT};
use tracing::{debug, warn};

use crate::error::PortalError;

/// Looks up the byte size of a downloadable file by its transfer path.
pub trait SizeProbe: Send + Sync {
    fn probe(&self, transfer_path: &str) -> Result<u64, PortalError>;
}

impl<T: SizeProbe + ?Sized> SizeProbe for Box<T> {
    fn probe(&self, transfer_path: &str) -> Result<u64, PortalError> {
        (**self).probe(transfer_path)
    }
}

#[derive(Clone)]
pub struct HttpSizeProbe {
    client: Client,
}

impl HttpSizeProbe {
    pub fn new() -> Result<Self, PortalError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("portal-dl/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| PortalError::SizeProbe(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|err| PortalError::SizeProbe(err.to_string()))?;
        Ok(Self { client })
    }

    fn head_with_retries(
        &self,
        url: &str,
    ) -> Result<reqwest::blocking::Response, PortalError> {
        const MAX_RETRIES: usize = 2;
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            match self.client.head(url).send() {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        thread::sleep(Duration::from_millis(BASE_DELAY_MS * (attempt as u64 + 1)));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && (err.is_timeout() || err.is_connect()) {
                        thread::sleep(Duration::from_millis(BASE_DELAY_MS * (attempt as u64 + 1)));
                        attempt += 1;
                        continue;
                    }
                    return Err(PortalError::SizeProbe(err.to_string()));
                }
            }
        }
    }
}

impl SizeProbe for HttpSizeProbe {
    fn probe(&self, transfer_path: &str) -> Result<u64, PortalError> {
        let response = self.head_with_retries(transfer_path)?;
        if !response.status().is_success() {
            return Err(PortalError::SizeProbe(format!(
                "HEAD {transfer_path} returned {}",
                response.status().as_u16()
            )));
        }
        response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok())
            .ok_or_else(|| PortalError::SizeProbe(format!("no content length for {transfer_path}")))
    }
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Handle for one issued probe. Only the most recent ticket may report a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTicket {
    generation: u64,
    query: String,
}

impl ProbeTicket {
    pub fn query(&self) -> &str {
        &self.query
    }
}

/// Tracks the size of the currently resolved artifact across overlapping probes.
///
/// A probe whose selection has been superseded completes into nothing.
#[derive(Debug, Default)]
pub struct SizeProbeTracker {
    generation: u64,
    query: Option<String>,
    size: Option<u64>,
}

impl SizeProbeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Points the tracker at a new size query.
    ///
    /// Returns a ticket when a probe should be issued; re-requesting the current query
    /// returns `None` and keeps the known size.
    pub fn request(&mut self, query: Option<&str>) -> Option<ProbeTicket> {
        if self.query.as_deref() == query {
            return None;
        }
        self.generation += 1;
        self.query = query.map(str::to_string);
        self.size = None;
        query.map(|query| ProbeTicket {
            generation: self.generation,
            query: query.to_string(),
        })
    }

    pub fn complete(&mut self, ticket: &ProbeTicket, result: Result<u64, PortalError>) -> bool {
        if ticket.generation != self.generation {
            debug!(query = %ticket.query, "dropping superseded size probe");
            return false;
        }
        match result {
            Ok(size) => {
                self.size = Some(size);
                true
            }
            Err(err) => {
                warn!(query = %ticket.query, error = %err, "size probe failed");
                false
            }
        }
    }

    pub fn size(&self) -> Option<u64> {
        self.size
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }
}
