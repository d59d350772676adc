use bigdecimal::BigDecimal;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use super::fee::FeeComponents;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
}

impl PaymentStatus {
    pub const ALL: [&'static str; 2] = ["unpaid", "paid"];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Paid => "paid",
        }
    }

    /// Resolves a requested status change.
    ///
    /// `paid` is terminal unless `allow_override` is set; re-applying the
    /// current status is a no-op.
    pub fn transition(
        self,
        target: PaymentStatus,
        allow_override: bool,
    ) -> Result<PaymentStatus, TransitionError> {
        match (self, target) {
            (PaymentStatus::Paid, PaymentStatus::Unpaid) if !allow_override => {
                Err(TransitionError::RevertPaid)
            }
            (_, target) => Ok(target),
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "unpaid" => Ok(PaymentStatus::Unpaid),
            "paid" => Ok(PaymentStatus::Paid),
            other => Err(format!("unknown payment status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("payment is already paid; reverting to unpaid requires an administrative override")]
    RevertPaid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    BankTransfer,
    EWallet,
    CreditCard,
}

impl PaymentMethod {
    pub const ALL: [&'static str; 3] = ["bank_transfer", "e_wallet", "credit_card"];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::EWallet => "e_wallet",
            PaymentMethod::CreditCard => "credit_card",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "bank_transfer" => Ok(PaymentMethod::BankTransfer),
            "e_wallet" => Ok(PaymentMethod::EWallet),
            "credit_card" => Ok(PaymentMethod::CreditCard),
            other => Err(format!("unknown payment method '{}'", other)),
        }
    }
}

/// How the payer completes a gateway payment. Only the fields relevant to
/// the chosen channel exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaymentInstruction {
    Redirect {
        url: String,
    },
    #[serde(rename_all = "camelCase")]
    VirtualAccount { bank: String, number: String },
    #[serde(rename_all = "camelCase")]
    BillPayment { bill_key: String, biller_code: String },
}

/// Flat column view of a [`PaymentInstruction`], as stored in the database.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstructionColumns {
    pub redirect_url: Option<String>,
    pub va_number: Option<String>,
    pub va_bank: Option<String>,
    pub bill_key: Option<String>,
    pub biller_code: Option<String>,
}

impl PaymentInstruction {
    pub fn to_columns(instruction: Option<&PaymentInstruction>) -> InstructionColumns {
        match instruction {
            Some(PaymentInstruction::Redirect { url }) => InstructionColumns {
                redirect_url: Some(url.clone()),
                ..Default::default()
            },
            Some(PaymentInstruction::VirtualAccount { bank, number }) => InstructionColumns {
                va_number: Some(number.clone()),
                va_bank: Some(bank.clone()),
                ..Default::default()
            },
            Some(PaymentInstruction::BillPayment {
                bill_key,
                biller_code,
            }) => InstructionColumns {
                bill_key: Some(bill_key.clone()),
                biller_code: Some(biller_code.clone()),
                ..Default::default()
            },
            None => InstructionColumns::default(),
        }
    }

    pub fn from_columns(columns: InstructionColumns) -> Option<PaymentInstruction> {
        match columns {
            InstructionColumns {
                va_number: Some(number),
                va_bank: Some(bank),
                ..
            } => Some(PaymentInstruction::VirtualAccount { bank, number }),
            InstructionColumns {
                bill_key: Some(bill_key),
                biller_code: Some(biller_code),
                ..
            } => Some(PaymentInstruction::BillPayment {
                bill_key,
                biller_code,
            }),
            InstructionColumns {
                redirect_url: Some(url),
                ..
            } => Some(PaymentInstruction::Redirect { url }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayAction {
    pub name: String,
    pub method: String,
    pub url: String,
}

/// Whether a gateway transaction status means the funds were received.
/// Card captures held by fraud screening (`challenge`, `deny`) do not count.
pub fn is_payment_confirmed(transaction_status: &str, fraud_status: Option<&str>) -> bool {
    match transaction_status {
        "settlement" => true,
        "capture" => !matches!(fraud_status, Some("challenge") | Some("deny")),
        _ => false,
    }
}

/// Identifiers returned by the payment gateway for one charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayCorrelation {
    pub order_id: String,
    pub transaction_id: Option<String>,
    pub transaction_status: Option<String>,
    pub fraud_status: Option<String>,
    pub payment_type: Option<String>,
    pub instruction: Option<PaymentInstruction>,
    #[serde(default)]
    pub actions: Vec<GatewayAction>,
}

impl GatewayCorrelation {
    pub fn confirms_payment(&self) -> bool {
        self.transaction_status
            .as_deref()
            .map_or(false, |status| {
                is_payment_confirmed(status, self.fraud_status.as_deref())
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub id: Uuid,
    pub student_id: Uuid,
    pub payment_code: String,
    #[serde(flatten)]
    pub fees: FeeComponents,
    pub total_amount: BigDecimal,
    pub payment_method: PaymentMethod,
    pub status: PaymentStatus,
    pub gateway: Option<GatewayCorrelation>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentRecord {
    pub fn new(
        student_id: Uuid,
        payment_code: String,
        payment_method: PaymentMethod,
        fees: FeeComponents,
    ) -> Self {
        let now = Utc::now();
        let total_amount = fees.total();
        Self {
            id: Uuid::new_v4(),
            student_id,
            payment_code,
            fees,
            total_amount,
            payment_method,
            status: PaymentStatus::Unpaid,
            gateway: None,
            paid_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies present components and recomputes `total_amount`.
    pub fn update_fees(&mut self, patch: FeeComponents) {
        self.fees.merge(patch);
        self.total_amount = self.fees.total();
        self.updated_at = Utc::now();
    }

    /// Stamps `updated_at` for a write replacing the version stamped
    /// `previous`. The new stamp is later than `previous` even at the
    /// microsecond precision the database keeps.
    pub fn touch(&mut self, previous: DateTime<Utc>) {
        self.updated_at = std::cmp::max(Utc::now(), previous + Duration::microseconds(1));
    }

    /// Moves the record to `target`. Returns whether the status changed.
    pub fn apply_status(
        &mut self,
        target: PaymentStatus,
        allow_override: bool,
    ) -> Result<bool, TransitionError> {
        let next = self.status.transition(target, allow_override)?;
        if next == self.status {
            return Ok(false);
        }

        self.status = next;
        self.paid_at = match next {
            PaymentStatus::Paid => Some(Utc::now()),
            PaymentStatus::Unpaid => None,
        };
        self.updated_at = Utc::now();
        Ok(true)
    }
}
