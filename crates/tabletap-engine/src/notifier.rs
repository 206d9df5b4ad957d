//! # POS Notifier
//!
//! Best-effort outbound notification to a restaurant's point-of-sale
//! system after a bill closure commits.
//!
//! ## Failure Isolation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Closure vs. Notification                             │
//! │                                                                         │
//! │  ┌──────────────────────────────┐                                      │
//! │  │   CLOSURE TRANSACTION        │  ← source of truth                   │
//! │  │   session closed, totals     │                                      │
//! │  │   persisted, audit row       │                                      │
//! │  └──────────────┬───────────────┘                                      │
//! │                 │ COMMIT                                               │
//! │                 ▼                                                       │
//! │  ┌──────────────────────────────┐                                      │
//! │  │   POS NOTIFICATION           │  ← at-most-once, best-effort         │
//! │  │   POST closure payload       │    transport error == non-2xx        │
//! │  └──────────────┬───────────────┘    no retry in the engine            │
//! │                 │                                                       │
//! │        success / failure recorded in the result and on the audit       │
//! │        row - NEVER rolls anything back                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The trait exists so tests can inject failing or recording fakes; the
//! production implementation is [`HttpPosNotifier`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use tabletap_core::PaymentMethod;

// =============================================================================
// Payload
// =============================================================================

/// One line item in the POS payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayloadItem {
    pub name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

/// The closure payload POSTed to the restaurant's POS endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosurePayload {
    /// Unique correlation id; the POS side dedupes on this.
    pub pos_reference: String,
    pub session_id: String,
    pub table_id: String,
    pub unit_id: String,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub closed_at: chrono::DateTime<chrono::Utc>,
    pub items: Vec<PayloadItem>,
    pub subtotal_cents: i64,
    pub service_charge_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
}

// =============================================================================
// Notifier Trait
// =============================================================================

/// Error from a POS notification attempt.
///
/// Non-fatal by construction: callers record it, they don't propagate it.
#[derive(Debug, Clone, Error)]
#[error("POS notification failed: {0}")]
pub struct NotifyError(pub String);

/// Outbound POS boundary.
///
/// Implementations must treat any transport error identically to an HTTP
/// non-2xx: one `Err` value, no retry.
#[async_trait]
pub trait PosNotifier: Send + Sync {
    async fn notify(
        &self,
        endpoint: &str,
        credential: Option<&str>,
        payload: &ClosurePayload,
    ) -> Result<(), NotifyError>;
}

// =============================================================================
// HTTP Implementation
// =============================================================================

/// Notifier configuration.
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    /// Per-request timeout. A hung POS endpoint must not hold the closure
    /// response longer than this.
    /// Default: 10 seconds
    pub timeout: Duration,
}

impl NotifierConfig {
    /// Sets the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        NotifierConfig {
            timeout: Duration::from_secs(10),
        }
    }
}

/// Production POS notifier over HTTP.
///
/// Holds one shared `reqwest::Client` (connection pooling); cloning is
/// cheap.
#[derive(Debug, Clone)]
pub struct HttpPosNotifier {
    client: reqwest::Client,
}

impl HttpPosNotifier {
    /// Creates a notifier with the given configuration.
    pub fn new(config: NotifierConfig) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| NotifyError(format!("failed to create HTTP client: {e}")))?;

        Ok(HttpPosNotifier { client })
    }
}

#[async_trait]
impl PosNotifier for HttpPosNotifier {
    async fn notify(
        &self,
        endpoint: &str,
        credential: Option<&str>,
        payload: &ClosurePayload,
    ) -> Result<(), NotifyError> {
        debug!(endpoint = %endpoint, reference = %payload.pos_reference, "Sending POS notification");

        let mut request = self.client.post(endpoint).json(payload);
        if let Some(credential) = credential {
            request = request.bearer_auth(credential);
        }

        let response = request
            .send()
            .await
            .map_err(|e| NotifyError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError(format!("POS endpoint returned {status}")));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
