use reqwest::header::{CACHE_CONTROL, PRAGMA, USER_AGENT};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{FetchError, Unavailable};
use crate::extract::{ExtractedFields, Extractor};
use crate::labels::LabelTable;
use crate::sniff::{Format, Sniffer};

/// The first candidate that produced usable data.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub source: String,
    pub format: Format,
    pub fields: ExtractedFields,
}

/// Walks the configured status pages in priority order until one of them can
/// be read. Holds no state between calls.
pub struct StatusFetcher {
    client: Client,
    candidates: Vec<String>,
    timeout: Duration,
    user_agent: String,
    sniffer: Sniffer,
    extractor: Extractor,
}

impl StatusFetcher {
    pub fn new(
        client: Client,
        candidates: Vec<String>,
        timeout: Duration,
        user_agent: String,
        labels: &LabelTable,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            client,
            candidates,
            timeout,
            user_agent,
            sniffer: Sniffer::new(labels)?,
            extractor: Extractor::new(labels)?,
        })
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub async fn fetch(&self) -> Result<Resolved, Unavailable> {
        let mut tried = Vec::with_capacity(self.candidates.len());
        let mut last_error = None;

        for url in &self.candidates {
            tried.push(url.clone());
            match self.attempt(url).await {
                Ok(resolved) => {
                    debug!("Status candidate {} answered", url);
                    return Ok(resolved);
                }
                Err(e) => {
                    warn!("Status candidate {} failed: {}", url, e);
                    last_error = Some(e);
                }
            }
        }

        Err(Unavailable { tried, last_error })
    }

    async fn attempt(&self, url: &str) -> Result<Resolved, FetchError> {
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache")
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(e, self.timeout))?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(e, self.timeout))?;
        if body.trim().is_empty() {
            return Err(FetchError::EmptyBody);
        }

        let format = self.sniffer.sniff(&body).ok_or(FetchError::Unrecognized)?;
        let fields = self
            .extractor
            .extract(format, &body)
            .ok_or(FetchError::NoUsableFields(format))?;

        Ok(Resolved {
            source: url.to_string(),
            format,
            fields,
        })
    }
}
