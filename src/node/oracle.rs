//! Reachability oracle client
//!
//! Asks an external probing aggregator whether `host:port` answers from a
//! target country and reduces the per-vantage-point results to a verdict.

use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::OracleConfig;
use crate::error::Result;

/// Fraction of target-country probes that must succeed
pub const REACHABLE_RATIO: f64 = 0.5;

const PROBE_USER_AGENT: &str = "Mozilla/5.0";
const SUCCESS_STATUS: &str = "success";

/// Source of reachability verdicts
///
/// Any failure to obtain a verdict is reported as `false`.
#[async_trait]
pub trait ReachabilityOracle: Send + Sync {
    async fn probe(&self, host: &str, port: u16) -> bool;
}

/// Aggregator response body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeReport {
    #[serde(default)]
    pub data: Vec<ProbeResult>,
}

/// One vantage point's probe outcome
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeResult {
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl ProbeReport {
    /// Reduce the report to a reachability verdict for `country`
    ///
    /// No results from `country` means unreachable.
    pub fn verdict(&self, country: &str) -> bool {
        let from_country: Vec<&ProbeResult> = self
            .data
            .iter()
            .filter(|r| r.country.as_deref() == Some(country))
            .collect();

        if from_country.is_empty() {
            return false;
        }

        let succeeded = from_country
            .iter()
            .filter(|r| r.status.as_deref() == Some(SUCCESS_STATUS))
            .count();

        succeeded as f64 / from_country.len() as f64 >= REACHABLE_RATIO
    }
}

/// HTTP client for the probing aggregator
#[derive(Clone)]
pub struct AggregatorOracle {
    client: Client,
    endpoint: Url,
    target_country: String,
}

impl AggregatorOracle {
    /// Create a new oracle client
    ///
    /// # Errors
    ///
    /// Returns `CastError::HttpClient` if the HTTP client cannot be built
    pub fn new(config: &OracleConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            endpoint: config.url.clone(),
            target_country: config.target_country.clone(),
        })
    }

    async fn fetch_report(&self, host: &str, port: u16) -> std::result::Result<ProbeReport, reqwest::Error> {
        let port = port.to_string();
        self.client
            .get(self.endpoint.clone())
            .query(&[("host", host), ("port", port.as_str())])
            .header(USER_AGENT, PROBE_USER_AGENT)
            .send()
            .await?
            .error_for_status()?
            .json::<ProbeReport>()
            .await
    }
}

#[async_trait]
impl ReachabilityOracle for AggregatorOracle {
    #[instrument(skip(self))]
    async fn probe(&self, host: &str, port: u16) -> bool {
        match self.fetch_report(host, port).await {
            Ok(report) => {
                let reachable = report.verdict(&self.target_country);
                debug!(
                    reachable,
                    results = report.data.len(),
                    "Probe finished for {}:{}",
                    host,
                    port
                );
                reachable
            }
            Err(e) => {
                warn!("Probe failed for {}:{}, treating as unreachable: {}", host, port, e);
                false
            }
        }
    }
}
