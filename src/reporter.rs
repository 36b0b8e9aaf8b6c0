use super::error::Result;
use super::types::{DiagnosticRecord, ReportOutcome};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// Destination for diagnostic records.
///
/// Implementations swallow every failure and answer with an outcome; a
/// report can never abort the flow that sends it.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn report(&self, record: &DiagnosticRecord) -> ReportOutcome;
}

/// POSTs records as JSON to the report endpoint.
#[derive(Clone)]
pub struct HttpReporter {
    client: Client,
    endpoint: String,
}

impl HttpReporter {
    /// `timeout` bounds the whole request, connect included.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ReportSink for HttpReporter {
    async fn report(&self, record: &DiagnosticRecord) -> ReportOutcome {
        match self.client.post(&self.endpoint).json(record).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(status = %response.status(), "diagnostic report delivered");
                ReportOutcome::Delivered
            }
            Ok(response) => {
                warn!(status = %response.status(), endpoint = %self.endpoint, "diagnostic report rejected");
                ReportOutcome::Failed
            }
            Err(e) => {
                warn!(error = %e, endpoint = %self.endpoint, "diagnostic report failed");
                ReportOutcome::Failed
            }
        }
    }
}

/// Send `record`, giving up on waiting after `grace`.
///
/// Returns `None` when the grace period ran out first; the in-flight request
/// is dropped and its outcome discarded.
pub async fn report_within(
    sink: &dyn ReportSink,
    record: &DiagnosticRecord,
    grace: Duration,
) -> Option<ReportOutcome> {
    match tokio::time::timeout(grace, sink.report(record)).await {
        Ok(outcome) => Some(outcome),
        Err(_) => {
            debug!(?grace, "report still pending, not waiting");
            None
        }
    }
}
