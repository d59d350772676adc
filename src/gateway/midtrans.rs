use async_trait::async_trait;
use failsafe::futures::CircuitBreaker as FuturesCircuitBreaker;
use failsafe::{backoff, failure_policy, Config, Error as FailsafeError, StateMachine};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{ChargeRequest, CustomerDetails, GatewayError, PaymentGateway, DEFAULT_BANK};
use crate::domain::{GatewayAction, GatewayCorrelation, PaymentInstruction, PaymentMethod};

const CHARGE_PATH: &str = "/v2/charge";
const DEEPLINK_ACTION: &str = "deeplink-redirect";

#[derive(Debug, Serialize)]
struct ChargeBody<'a> {
    payment_type: &'static str,
    transaction_details: TransactionDetails<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bank_transfer: Option<BankTransfer<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gopay: Option<Gopay>,
    #[serde(skip_serializing_if = "Option::is_none")]
    credit_card: Option<CreditCard>,
    #[serde(skip_serializing_if = "Option::is_none")]
    customer_details: Option<&'a CustomerDetails>,
}

#[derive(Debug, Serialize)]
struct TransactionDetails<'a> {
    order_id: &'a str,
    gross_amount: i64,
}

#[derive(Debug, Serialize)]
struct BankTransfer<'a> {
    bank: &'a str,
}

#[derive(Debug, Serialize)]
struct Gopay {
    enable_callback: bool,
}

#[derive(Debug, Serialize)]
struct CreditCard {
    secure: bool,
}

impl<'a> ChargeBody<'a> {
    fn from_request(request: &'a ChargeRequest) -> Self {
        let transaction_details = TransactionDetails {
            order_id: &request.order_id,
            gross_amount: request.gross_amount,
        };
        let mut body = ChargeBody {
            payment_type: payment_type(request.method),
            transaction_details,
            bank_transfer: None,
            gopay: None,
            credit_card: None,
            customer_details: request.customer.as_ref(),
        };
        match request.method {
            PaymentMethod::BankTransfer => {
                body.bank_transfer = Some(BankTransfer {
                    bank: request.bank.as_deref().unwrap_or(DEFAULT_BANK),
                })
            }
            PaymentMethod::EWallet => body.gopay = Some(Gopay { enable_callback: true }),
            PaymentMethod::CreditCard => body.credit_card = Some(CreditCard { secure: true }),
        }
        body
    }
}

fn payment_type(method: PaymentMethod) -> &'static str {
    match method {
        PaymentMethod::BankTransfer => "bank_transfer",
        PaymentMethod::EWallet => "gopay",
        PaymentMethod::CreditCard => "credit_card",
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VaNumber {
    pub bank: String,
    pub va_number: String,
}

/// Response from the `/v2/charge` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ChargeResponse {
    pub status_code: Option<String>,
    pub status_message: Option<String>,
    pub transaction_id: Option<String>,
    pub order_id: Option<String>,
    pub transaction_status: Option<String>,
    pub fraud_status: Option<String>,
    pub payment_type: Option<String>,
    pub redirect_url: Option<String>,
    #[serde(default)]
    pub va_numbers: Vec<VaNumber>,
    pub bill_key: Option<String>,
    pub biller_code: Option<String>,
    #[serde(default)]
    pub actions: Vec<GatewayAction>,
}

impl ChargeResponse {
    /// Turns a charge response into correlation data, keeping only the
    /// instruction that belongs to `method`.
    pub fn into_correlation(
        self,
        method: PaymentMethod,
        requested_order_id: &str,
    ) -> Result<GatewayCorrelation, GatewayError> {
        if let Some(code) = self.status_code.as_deref() {
            if !code.starts_with('2') {
                return Err(GatewayError::Rejected(format!(
                    "{} {}",
                    code,
                    self.status_message.unwrap_or_default()
                )));
            }
        }

        let instruction = match method {
            PaymentMethod::CreditCard => self
                .redirect_url
                .map(|url| PaymentInstruction::Redirect { url }),
            PaymentMethod::BankTransfer => self.va_numbers.into_iter().next().map(|va| {
                PaymentInstruction::VirtualAccount {
                    bank: va.bank,
                    number: va.va_number,
                }
            }),
            PaymentMethod::EWallet => match (self.bill_key, self.biller_code) {
                (Some(bill_key), Some(biller_code)) => Some(PaymentInstruction::BillPayment {
                    bill_key,
                    biller_code,
                }),
                _ => self
                    .actions
                    .iter()
                    .find(|action| action.name == DEEPLINK_ACTION)
                    .map(|action| PaymentInstruction::Redirect {
                        url: action.url.clone(),
                    }),
            },
        };

        let instruction = instruction.ok_or_else(|| {
            GatewayError::InvalidResponse(format!(
                "no payment instructions for method {}",
                method
            ))
        })?;

        Ok(GatewayCorrelation {
            order_id: self
                .order_id
                .unwrap_or_else(|| requested_order_id.to_string()),
            transaction_id: self.transaction_id,
            transaction_status: self.transaction_status,
            fraud_status: self.fraud_status,
            payment_type: self.payment_type,
            instruction: Some(instruction),
            actions: self.actions,
        })
    }
}

/// HTTP client for a Midtrans-compatible Core API
#[derive(Clone)]
pub struct MidtransClient {
    client: Client,
    base_url: String,
    server_key: String,
    timeout_secs: u64,
    circuit_breaker: StateMachine<failure_policy::ConsecutiveFailures<backoff::EqualJittered>, ()>,
}

impl MidtransClient {
    /// Creates a client with the default circuit breaker (3 failures, 60s backoff)
    pub fn new(base_url: String, server_key: String, timeout_secs: u64) -> Self {
        Self::with_circuit_breaker(base_url, server_key, timeout_secs, 3, 60)
    }

    /// Creates a client with custom circuit breaker configuration
    pub fn with_circuit_breaker(
        base_url: String,
        server_key: String,
        timeout_secs: u64,
        failure_threshold: u32,
        reset_timeout_secs: u64,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();

        let backoff = backoff::equal_jittered(
            Duration::from_secs(reset_timeout_secs),
            Duration::from_secs(reset_timeout_secs * 2),
        );
        let policy = failure_policy::consecutive_failures(failure_threshold, backoff);
        let circuit_breaker = Config::new().failure_policy(policy).build();

        MidtransClient {
            client,
            base_url,
            server_key,
            timeout_secs,
            circuit_breaker,
        }
    }
}

fn map_request_error(err: reqwest::Error, timeout_secs: u64) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout(timeout_secs)
    } else {
        GatewayError::Request(err.to_string())
    }
}

#[async_trait]
impl PaymentGateway for MidtransClient {
    async fn charge(&self, request: &ChargeRequest) -> Result<GatewayCorrelation, GatewayError> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), CHARGE_PATH);
        let body = serde_json::to_value(ChargeBody::from_request(request))
            .map_err(|e| GatewayError::Request(e.to_string()))?;
        let client = self.client.clone();
        let server_key = self.server_key.clone();
        let timeout_secs = self.timeout_secs;

        let result = self
            .circuit_breaker
            .call(async move {
                let response = client
                    .post(&url)
                    .basic_auth(&server_key, Some(""))
                    .json(&body)
                    .send()
                    .await
                    .map_err(|e| map_request_error(e, timeout_secs))?;

                let status = response.status();
                if status.is_server_error() {
                    return Err(GatewayError::Request(format!("gateway returned {}", status)));
                }

                let text = response
                    .text()
                    .await
                    .map_err(|e| map_request_error(e, timeout_secs))?;

                if status.is_client_error() {
                    let message = serde_json::from_str::<ChargeResponse>(&text)
                        .ok()
                        .and_then(|parsed| parsed.status_message)
                        .unwrap_or(text);
                    return Err(GatewayError::Rejected(format!(
                        "{} {}",
                        status.as_u16(),
                        message
                    )));
                }

                serde_json::from_str::<ChargeResponse>(&text)
                    .map_err(|e| GatewayError::InvalidResponse(e.to_string()))
            })
            .await;

        let response = match result {
            Ok(response) => response,
            Err(FailsafeError::Rejected) => {
                return Err(GatewayError::CircuitBreakerOpen(
                    "payment gateway circuit breaker is open".to_string(),
                ))
            }
            Err(FailsafeError::Inner(e)) => return Err(e),
        };

        response.into_correlation(request.method, &request.order_id)
    }

    fn circuit_state(&self) -> String {
        if self.circuit_breaker.is_call_permitted() {
            "closed".to_string()
        } else {
            "open".to_string()
        }
    }
}
