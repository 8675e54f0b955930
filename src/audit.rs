//! Audit sink: forwards selected lifecycle events to an external HTTP endpoint.
//!
//! Enabled only when both the endpoint URL and the service key are configured.
//! Failures are the caller's to log; they never affect connection state.

use edison_core::{config::AuditConfig, error::EdisonError, state::Phase};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Path appended to the configured base URL.
const BOT_LOG_PATH: &str = "/functions/v1/bot-log";

/// One forwarded event.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    pub event: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub phone: Option<String>,
    pub metadata: Option<Value>,
    pub timestamp: String,
    pub status: Phase,
}

impl AuditRecord {
    /// Stamp a record with the current time.
    pub fn new(event: impl Into<String>, kind: impl Into<String>, status: Phase) -> Self {
        Self {
            event: event.into(),
            kind: kind.into(),
            phone: None,
            metadata: None,
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            status,
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// HTTP client for the audit endpoint. Cheap to clone.
#[derive(Clone)]
pub struct AuditSink {
    client: reqwest::Client,
    endpoint: String,
    auth: String,
}

impl AuditSink {
    /// Build a sink from config. Returns `None` when forwarding is not configured
    /// or the HTTP client cannot be built.
    pub fn from_config(config: &AuditConfig) -> Option<Self> {
        let (url, key) = config.credentials()?;
        let client = match reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
        {
            Ok(c) => c,
            Err(e) => {
                warn!("audit sink disabled: failed to build HTTP client: {e}");
                return None;
            }
        };
        Some(Self {
            client,
            endpoint: format!("{}{BOT_LOG_PATH}", url.trim_end_matches('/')),
            auth: format!("Bearer {key}"),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST one record.
    pub async fn forward(&self, record: &AuditRecord) -> Result<(), EdisonError> {
        debug!("audit: POST {} ({})", self.endpoint, record.kind);

        let resp = self
            .client
            .post(&self.endpoint)
            .header("Authorization", &self.auth)
            .json(record)
            .send()
            .await
            .map_err(|e| EdisonError::Audit(format!("audit request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(EdisonError::Audit(format!(
                "audit endpoint returned {}",
                resp.status()
            )));
        }
        Ok(())
    }
}
