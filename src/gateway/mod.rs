//! Payment gateway integration.
//!
//! [`PaymentGateway`] is the seam the payment service calls to open a charge.
//! [`MidtransClient`] talks to a Midtrans-compatible HTTP API and
//! [`NotificationVerifier`] checks the signatures on its callbacks.

pub mod midtrans;
pub mod signature;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{is_payment_confirmed, GatewayCorrelation, PaymentMethod};

pub use midtrans::MidtransClient;
pub use signature::NotificationVerifier;

pub const DEFAULT_BANK: &str = "bca";

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("HTTP request failed: {0}")]
    Request(String),
    #[error("gateway call timed out after {0}s")]
    Timeout(u64),
    #[error("gateway rejected the charge: {0}")]
    Rejected(String),
    #[error("Invalid response from gateway: {0}")]
    InvalidResponse(String),
    #[error("Circuit breaker open: {0}")]
    CircuitBreakerOpen(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerDetails {
    pub first_name: String,
    pub student_number: String,
}

/// One charge to open at the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeRequest {
    pub order_id: String,
    /// Whole rupiah.
    pub gross_amount: i64,
    pub method: PaymentMethod,
    /// Bank for virtual-account transfers; ignored for other methods.
    pub bank: Option<String>,
    pub customer: Option<CustomerDetails>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Opens a charge and returns the gateway's correlation data.
    async fn charge(&self, request: &ChargeRequest) -> Result<GatewayCorrelation, GatewayError>;

    /// `"closed"` while calls are permitted, `"open"` otherwise.
    fn circuit_state(&self) -> String {
        "closed".to_string()
    }
}

/// Status callback posted by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayNotification {
    pub order_id: String,
    pub status_code: String,
    pub gross_amount: String,
    pub transaction_status: String,
    pub signature_key: String,
    pub transaction_id: Option<String>,
    pub payment_type: Option<String>,
    pub fraud_status: Option<String>,
}

impl GatewayNotification {
    /// Whether this notification means the funds were received.
    pub fn confirms_payment(&self) -> bool {
        is_payment_confirmed(&self.transaction_status, self.fraud_status.as_deref())
    }
}
