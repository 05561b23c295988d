//! Z2Data parts-search client
//!
//! Two endpoints are used:
//! - `GET /GetPartDetailsBySearch?ApiKey=..&Z2MPN=..` (search by part number)
//! - `GET /GetPartDetailsbyPartID?ApiKey=..&PartID=..` (lifecycle/compliance)
//!
//! Both wrap their payload in a `{ statusCode, status, results }` envelope.
//! The envelope is always decoded before the HTTP status is considered; the
//! source reports authentication failures with `statusCode: 401` in a body
//! that may arrive with HTTP 200.
//!
//! Only [`Candidate`] and [`PartDetails`] leave this module.

use async_trait::async_trait;
use lcm_common::config::sanitize_credential;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::models::{Candidate, PartDetails};

pub const DEFAULT_BASE_URL: &str = "https://gateway.z2data.com";
const USER_AGENT: &str = concat!("lcm-enrich/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 30;
/// Minimum spacing between two requests through one client
pub const DEFAULT_RATE_LIMIT_MS: u64 = 200;

/// Parts-source errors
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// No usable API key; raised before any request is made
    #[error("Z2Data not configured: {0}")]
    Configuration(String),

    #[error("Z2Data auth failed: {0}")]
    Authentication(String),

    #[error("Z2Data error ({code}): {message}")]
    Source { code: i64, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl SourceError {
    /// Errors that make every further call pointless (stop the whole run)
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SourceError::Configuration(_) | SourceError::Authentication(_)
        )
    }
}

/// Abstract parts-search source
///
/// The enrichment engine, candidate resolver and manual resolution all talk to
/// this trait; tests substitute a canned implementation.
#[async_trait]
pub trait PartsSource: Send + Sync {
    /// Every match the source reports for `query`, in source order
    async fn search(&self, query: &str) -> Result<Vec<Candidate>, SourceError>;

    /// Lifecycle and compliance record for one part id; `None` when absent
    async fn get_details(&self, external_part_id: &str)
        -> Result<Option<PartDetails>, SourceError>;
}

/// Connection settings injected at construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Z2DataConfig {
    pub api_key: String,
    pub base_url: String,
}

impl Z2DataConfig {
    /// Build a config; a blank key (after sanitizing) is a configuration error
    pub fn new(api_key: &str, base_url: Option<&str>) -> Result<Self, SourceError> {
        let api_key = sanitize_credential(api_key);
        if api_key.is_empty() {
            return Err(SourceError::Configuration(
                "Z2Data API key is empty".to_string(),
            ));
        }

        let base_url = base_url
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();

        Ok(Self { api_key, base_url })
    }
}

/// Rate limiter enforcing a minimum interval between requests
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// HTTP client for the Z2Data gateway
pub struct Z2DataClient {
    http_client: reqwest::Client,
    config: Z2DataConfig,
    rate_limiter: Arc<RateLimiter>,
}

impl Z2DataClient {
    pub fn new(config: Z2DataConfig) -> Result<Self, SourceError> {
        Self::with_rate_limit(config, DEFAULT_RATE_LIMIT_MS)
    }

    pub fn with_rate_limit(config: Z2DataConfig, min_interval_ms: u64) -> Result<Self, SourceError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| SourceError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            config,
            rate_limiter: Arc::new(RateLimiter::new(min_interval_ms)),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// GET an endpoint and return (HTTP status, body text)
    ///
    /// The request URL carries the API key, so transport errors are stripped
    /// of it before they become a `SourceError`.
    async fn get(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<(u16, String), SourceError> {
        self.rate_limiter.wait().await;

        let url = format!("{}/{}", self.config.base_url, endpoint);
        let mut query: Vec<(&str, &str)> = vec![("ApiKey", self.config.api_key.as_str())];
        query.extend_from_slice(params);

        let response = self
            .http_client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&query)
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(network_error)?;

        Ok((status, body))
    }
}

fn network_error(e: reqwest::Error) -> SourceError {
    SourceError::Network(e.without_url().to_string())
}

#[async_trait]
impl PartsSource for Z2DataClient {
    async fn search(&self, query: &str) -> Result<Vec<Candidate>, SourceError> {
        tracing::debug!(query = %query, "Searching Z2Data");

        let (http_status, body) = self
            .get("GetPartDetailsBySearch", &[("Z2MPN", query)])
            .await?;
        let candidates = decode_search(http_status, &body)?;

        tracing::debug!(query = %query, hits = candidates.len(), "Z2Data search complete");
        Ok(candidates)
    }

    async fn get_details(
        &self,
        external_part_id: &str,
    ) -> Result<Option<PartDetails>, SourceError> {
        tracing::debug!(part_id = %external_part_id, "Fetching Z2Data part details");

        let (http_status, body) = self
            .get("GetPartDetailsbyPartID", &[("PartID", external_part_id)])
            .await?;
        decode_details(http_status, &body)
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(rename = "statusCode")]
    status_code: i64,
    #[serde(default)]
    status: Option<String>,
    results: Option<T>,
}

/// Part ids arrive as JSON numbers, occasionally as strings
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireId {
    Number(i64),
    Text(String),
}

impl WireId {
    fn into_string(self) -> String {
        match self {
            WireId::Number(n) => n.to_string(),
            WireId::Text(s) => s.trim().to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    #[serde(rename = "PartSearch", default)]
    part_search: Option<PartSearch>,
}

#[derive(Debug, Deserialize)]
struct PartSearch {
    #[serde(rename = "Result", default)]
    result: Option<Vec<WireSearchItem>>,
}

#[derive(Debug, Deserialize)]
struct WireSearchItem {
    #[serde(rename = "PartID")]
    part_id: Option<WireId>,
    #[serde(rename = "MPN", default)]
    mpn: Option<String>,
    #[serde(rename = "Manufacturer", default)]
    manufacturer: Option<String>,
    #[serde(rename = "Description", default)]
    description: Option<String>,
    #[serde(rename = "Datasheet", default)]
    datasheet: Option<String>,
    #[serde(rename = "ProductType", default)]
    product_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DetailsResults {
    #[serde(rename = "MPNSummary", default)]
    mpn_summary: Option<WireSummary>,
    #[serde(rename = "Lifecycle", default)]
    lifecycle: Option<WireLifecycle>,
    #[serde(rename = "ComplianceDetails", default)]
    compliance: Option<WireCompliance>,
}

#[derive(Debug, Deserialize)]
struct WireSummary {
    #[serde(rename = "PartID", default)]
    part_id: Option<WireId>,
    #[serde(rename = "MPN", default)]
    mpn: Option<String>,
    #[serde(rename = "Supplier", default)]
    supplier: Option<String>,
    #[serde(rename = "Description", default)]
    description: Option<String>,
    #[serde(rename = "DataSheet", default)]
    datasheet: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireLifecycle {
    #[serde(rename = "LifecycleStatus", default)]
    lifecycle_status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireCompliance {
    #[serde(rename = "RoHSStatus", default)]
    rohs_status: Option<String>,
    #[serde(rename = "REACHStatus", default)]
    reach_status: Option<String>,
}

/// Parse the envelope and map its status code to an error
fn open_envelope<T>(http_status: u16, body: &str) -> Result<Option<T>, SourceError>
where
    T: for<'de> Deserialize<'de>,
{
    let envelope: Envelope<T> = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(e) if !(200..300).contains(&http_status) => {
            // Non-JSON error page from a proxy or gateway
            return Err(SourceError::Source {
                code: i64::from(http_status),
                message: format!("unreadable response body: {}", e),
            });
        }
        Err(e) => return Err(SourceError::Parse(e.to_string())),
    };

    let status = envelope.status.unwrap_or_default();
    match envelope.status_code {
        200 => Ok(envelope.results),
        401 => Err(SourceError::Authentication(status)),
        code => Err(SourceError::Source {
            code,
            message: status,
        }),
    }
}

pub(crate) fn decode_search(http_status: u16, body: &str) -> Result<Vec<Candidate>, SourceError> {
    let items = open_envelope::<SearchResults>(http_status, body)?
        .and_then(|r| r.part_search)
        .and_then(|p| p.result)
        .unwrap_or_default();

    Ok(items
        .into_iter()
        .filter_map(|item| {
            let external_part_id = item.part_id?.into_string();
            if external_part_id.is_empty() {
                return None;
            }
            Some(Candidate {
                external_part_id,
                mpn: item.mpn.unwrap_or_default(),
                manufacturer: item.manufacturer.unwrap_or_default(),
                description: item.description.unwrap_or_default(),
                datasheet_url: item.datasheet.unwrap_or_default(),
                product_type: item.product_type.filter(|s| !s.is_empty()),
            })
        })
        .collect())
}

pub(crate) fn decode_details(
    http_status: u16,
    body: &str,
) -> Result<Option<PartDetails>, SourceError> {
    let Some(results) = open_envelope::<DetailsResults>(http_status, body)? else {
        return Ok(None);
    };

    let summary = results.mpn_summary;
    let lifecycle = results.lifecycle;
    let compliance = results.compliance;
    if summary.is_none() && lifecycle.is_none() && compliance.is_none() {
        return Ok(None);
    }

    let (external_part_id, mpn, manufacturer, description, datasheet_url) = match summary {
        Some(s) => (
            s.part_id.map(WireId::into_string),
            s.mpn,
            s.supplier,
            s.description,
            s.datasheet,
        ),
        None => (None, None, None, None, None),
    };
    let (rohs_status, reach_status) = match compliance {
        Some(c) => (c.rohs_status, c.reach_status),
        None => (None, None),
    };

    Ok(Some(PartDetails {
        external_part_id,
        mpn,
        manufacturer,
        description,
        datasheet_url,
        lifecycle_status: lifecycle.and_then(|l| l.lifecycle_status),
        rohs_status,
        reach_status,
    }))
}
