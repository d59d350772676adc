use bigdecimal::{BigDecimal, ToPrimitive, Zero};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use super::{require_admin, FeeComponentsInput, FeeComputationService};
use crate::domain::{FeeComponents, PaymentMethod, PaymentRecord, PaymentStatus, Student};
use crate::error::AppError;
use crate::gateway::{ChargeRequest, CustomerDetails, GatewayNotification, PaymentGateway};
use crate::ports::{PaymentFilter, PaymentRepository, RepositoryError, StudentRepository};
use crate::session::RequestContext;
use crate::validation::{
    parse_uuid, required_text, sanitize_string, validate_enum, validate_payment_code,
    validate_semester, ValidationError,
};

const BANK_MAX_LEN: usize = 32;
const TRANSACTION_STATUS_MAX_LEN: usize = 32;
const MAX_WRITE_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    #[serde(default)]
    pub student_id: String,
    #[serde(default)]
    pub payment_code: String,
    #[serde(default)]
    pub payment_method: String,
    #[serde(flatten)]
    pub fees: FeeComponentsInput,
    pub status: Option<String>,
    /// Copy the components from the student's fee schedule when none are given.
    #[serde(default)]
    pub use_fee_schedule: bool,
    /// Semester used for the fee schedule lookup.
    pub semester: Option<i32>,
    /// Virtual-account bank for gateway bank transfers.
    pub bank: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePaymentRequest {
    pub payment_code: Option<String>,
    pub payment_method: Option<String>,
    #[serde(flatten)]
    pub fees: FeeComponentsInput,
    pub status: Option<String>,
    pub transaction_status: Option<String>,
    /// Administrative override for `paid -> unpaid`.
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPaymentsQuery {
    pub student_id: Option<String>,
    pub status: Option<String>,
}

fn parse_method(raw: &str) -> Result<PaymentMethod, ValidationError> {
    let raw = sanitize_string(raw);
    validate_enum("paymentMethod", &raw, &PaymentMethod::ALL)?;
    raw.parse()
        .map_err(|e: String| ValidationError::new("paymentMethod", e))
}

fn parse_status(raw: &str) -> Result<PaymentStatus, ValidationError> {
    let raw = sanitize_string(raw);
    validate_enum("status", &raw, &PaymentStatus::ALL)?;
    raw.parse().map_err(|e: String| ValidationError::new("status", e))
}

/// Converts a total into the whole-rupiah amount the gateway charges.
fn gross_amount(total: &BigDecimal) -> Result<i64, ValidationError> {
    if total <= &BigDecimal::zero() {
        return Err(ValidationError::new(
            "totalAmount",
            "must be greater than zero for gateway payments",
        ));
    }
    if &total.with_scale(0) != total {
        return Err(ValidationError::new(
            "totalAmount",
            "must be a whole amount for gateway payments",
        ));
    }
    total
        .to_i64()
        .ok_or_else(|| ValidationError::new("totalAmount", "is too large for gateway payments"))
}

#[derive(Clone)]
pub struct PaymentService {
    payments: Arc<dyn PaymentRepository>,
    students: Arc<dyn StudentRepository>,
    fee_computation: FeeComputationService,
    gateway: Arc<dyn PaymentGateway>,
}

impl PaymentService {
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        students: Arc<dyn StudentRepository>,
        fee_computation: FeeComputationService,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            payments,
            students,
            fee_computation,
            gateway,
        }
    }

    /// Validates a creation request and builds the unsaved record.
    async fn prepare(
        &self,
        input: &CreatePaymentRequest,
    ) -> Result<(PaymentRecord, Student), AppError> {
        let student_id = parse_uuid("studentId", &input.student_id)?;
        let payment_code = validate_payment_code(&input.payment_code)?;
        let method = parse_method(&input.payment_method)?;
        let mut fees = input.fees.parse()?;
        let status = input.status.as_deref().map(parse_status).transpose()?;
        if let Some(semester) = input.semester {
            validate_semester("semester", semester)?;
        }

        let student = self.students.get_by_id(student_id).await?;

        if input.use_fee_schedule && fees.is_empty() {
            let default_fee = self
                .fee_computation
                .default_fee_for(&student, input.semester)
                .await?;
            match default_fee.fee_schedule {
                Some(schedule) => fees = schedule.components(),
                None => {
                    return Err(ValidationError::new(
                        "useFeeSchedule",
                        default_fee.message.unwrap_or_default(),
                    )
                    .into())
                }
            }
        }

        let mut record = PaymentRecord::new(student_id, payment_code, method, fees);
        if let Some(status) = status {
            record.apply_status(status, false)?;
        }
        Ok((record, student))
    }

    pub async fn create(&self, input: CreatePaymentRequest) -> Result<PaymentRecord, AppError> {
        let (record, _) = self.prepare(&input).await?;
        let saved = self.payments.insert(&record).await?;

        tracing::info!(
            payment_id = %saved.id,
            payment_code = %saved.payment_code,
            total_amount = %saved.total_amount,
            "payment created"
        );
        Ok(saved)
    }

    /// Creates a payment and opens the matching gateway charge.
    ///
    /// Nothing is persisted unless the gateway call succeeds.
    pub async fn create_with_gateway_intent(
        &self,
        input: CreatePaymentRequest,
    ) -> Result<PaymentRecord, AppError> {
        let (mut record, student) = self.prepare(&input).await?;
        if record.status == PaymentStatus::Paid {
            return Err(
                ValidationError::new("status", "gateway payments must start unpaid").into(),
            );
        }
        let bank = input
            .bank
            .as_deref()
            .map(|raw| required_text("bank", raw, BANK_MAX_LEN).map(|b| b.to_lowercase()))
            .transpose()?;

        let request = ChargeRequest {
            order_id: record.payment_code.clone(),
            gross_amount: gross_amount(&record.total_amount)?,
            method: record.payment_method,
            bank,
            customer: Some(CustomerDetails {
                first_name: student.name.clone(),
                student_number: student.student_number.clone(),
            }),
        };

        let correlation = self.gateway.charge(&request).await.map_err(|e| {
            tracing::warn!(
                payment_code = %record.payment_code,
                error = %e,
                "gateway charge failed; payment not persisted"
            );
            e
        })?;

        let confirmed = correlation.confirms_payment();
        record.gateway = Some(correlation);
        if confirmed {
            record.apply_status(PaymentStatus::Paid, false)?;
        }

        let saved = self.payments.insert(&record).await?;
        tracing::info!(
            payment_id = %saved.id,
            payment_code = %saved.payment_code,
            method = %saved.payment_method,
            "payment created with gateway intent"
        );
        Ok(saved)
    }

    pub async fn get(&self, id: Uuid) -> Result<PaymentRecord, AppError> {
        Ok(self.payments.get_by_id(id).await?)
    }

    pub async fn list(&self, query: ListPaymentsQuery) -> Result<Vec<PaymentRecord>, AppError> {
        let filter = PaymentFilter {
            student_id: query
                .student_id
                .as_deref()
                .filter(|raw| !raw.trim().is_empty())
                .map(|raw| parse_uuid("studentId", raw))
                .transpose()?,
            status: query
                .status
                .as_deref()
                .filter(|raw| !raw.trim().is_empty())
                .map(parse_status)
                .transpose()?,
        };
        Ok(self.payments.list(filter).await?)
    }

    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        patch: UpdatePaymentRequest,
    ) -> Result<PaymentRecord, AppError> {
        let payment_code = patch
            .payment_code
            .as_deref()
            .map(validate_payment_code)
            .transpose()?;
        let method = patch.payment_method.as_deref().map(parse_method).transpose()?;
        let fees = patch.fees.parse()?;
        let status = patch.status.as_deref().map(parse_status).transpose()?;
        let transaction_status = patch
            .transaction_status
            .as_deref()
            .map(|raw| required_text("transactionStatus", raw, TRANSACTION_STATUS_MAX_LEN))
            .transpose()?;
        if patch.force {
            require_admin(ctx, "overriding a payment status")?;
        }

        let current = self.payments.get_by_id(id).await?;
        let (previous, updated) = self
            .write_with_retry(current, |record| {
                if record.gateway.is_some() {
                    ensure_charge_unchanged(record, payment_code.as_deref(), method, &fees)?;
                }
                if let Some(code) = &payment_code {
                    record.payment_code = code.clone();
                }
                if let Some(method) = method {
                    record.payment_method = method;
                }
                if !fees.is_empty() {
                    record.update_fees(fees.clone());
                }
                if let Some(transaction_status) = &transaction_status {
                    let gateway = record.gateway.as_mut().ok_or_else(|| {
                        ValidationError::new("transactionStatus", "payment has no gateway intent")
                    })?;
                    gateway.transaction_status = Some(transaction_status.clone());
                }
                if let Some(status) = status {
                    record.apply_status(status, patch.force)?;
                }
                Ok(())
            })
            .await?;

        if updated.status != previous.status {
            tracing::info!(
                request_id = %ctx.request_id,
                payment_id = %updated.id,
                from = %previous.status,
                to = %updated.status,
                overridden = patch.force,
                "payment status changed"
            );
        }
        tracing::info!(
            request_id = %ctx.request_id,
            payment_id = %updated.id,
            payment_code = %updated.payment_code,
            "payment updated"
        );
        Ok(updated)
    }

    pub async fn remove(&self, ctx: &RequestContext, id: Uuid) -> Result<(), AppError> {
        require_admin(ctx, "deleting a payment")?;
        self.payments.delete(id).await?;
        tracing::info!(request_id = %ctx.request_id, payment_id = %id, "payment deleted");
        Ok(())
    }

    /// Applies a verified gateway status callback. Repeated notifications
    /// leave the record unchanged.
    pub async fn apply_notification(
        &self,
        notification: &GatewayNotification,
    ) -> Result<PaymentRecord, AppError> {
        let current = self
            .payments
            .find_by_order_id(&notification.order_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Payment for order {}", notification.order_id))
            })?;

        let confirmed = notification.confirms_payment();
        let (previous, updated) = self
            .write_with_retry(current, |record| {
                if let Some(gateway) = record.gateway.as_mut() {
                    gateway.transaction_status = Some(notification.transaction_status.clone());
                    if notification.fraud_status.is_some() {
                        gateway.fraud_status = notification.fraud_status.clone();
                    }
                    if notification.transaction_id.is_some() {
                        gateway.transaction_id = notification.transaction_id.clone();
                    }
                    if notification.payment_type.is_some() {
                        gateway.payment_type = notification.payment_type.clone();
                    }
                }
                if confirmed {
                    record.apply_status(PaymentStatus::Paid, false)?;
                }
                Ok(())
            })
            .await?;

        if updated.status != previous.status {
            tracing::info!(
                payment_id = %updated.id,
                order_id = %notification.order_id,
                "payment confirmed by gateway"
            );
        } else {
            tracing::info!(
                payment_id = %updated.id,
                order_id = %notification.order_id,
                transaction_status = %notification.transaction_status,
                "gateway notification recorded"
            );
        }
        Ok(updated)
    }

    /// Applies `change` to a copy of `current` and writes it back. When
    /// another request wrote the row first, the row is read again and
    /// `change` reapplied to it. Returns the record as read and as written.
    async fn write_with_retry<F>(
        &self,
        mut current: PaymentRecord,
        mut change: F,
    ) -> Result<(PaymentRecord, PaymentRecord), AppError>
    where
        F: FnMut(&mut PaymentRecord) -> Result<(), AppError> + Send,
    {
        let mut attempt = 1;
        loop {
            let expected = current.updated_at;
            let mut next = current.clone();
            change(&mut next)?;
            next.touch(expected);

            match self.payments.update(&next, expected).await {
                Ok(saved) => return Ok((current, saved)),
                Err(RepositoryError::Stale(_)) if attempt < MAX_WRITE_ATTEMPTS => {
                    tracing::debug!(
                        payment_id = %current.id,
                        attempt,
                        "payment changed during update; retrying on fresh read"
                    );
                    current = self.payments.get_by_id(current.id).await?;
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

/// A record with an open gateway charge keeps the code, method and amount
/// the charge was opened with.
fn ensure_charge_unchanged(
    record: &PaymentRecord,
    payment_code: Option<&str>,
    method: Option<PaymentMethod>,
    fees: &FeeComponents,
) -> Result<(), ValidationError> {
    const LOCKED: &str = "cannot change once a gateway charge is open";

    if payment_code.map_or(false, |code| code != record.payment_code) {
        return Err(ValidationError::new("paymentCode", LOCKED));
    }
    if method.map_or(false, |method| method != record.payment_method) {
        return Err(ValidationError::new("paymentMethod", LOCKED));
    }
    let mut merged = record.fees.clone();
    merged.merge(fees.clone());
    if merged != record.fees {
        return Err(ValidationError::new("totalAmount", LOCKED));
    }
    Ok(())
}
