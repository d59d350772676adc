//! Postgres implementation of PaymentRepository.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{
    FeeComponents, GatewayAction, GatewayCorrelation, InstructionColumns, PaymentInstruction,
    PaymentMethod, PaymentRecord, PaymentStatus,
};
use crate::ports::{PaymentFilter, PaymentRepository, RepositoryError, RepositoryResult};

const COLUMNS: &str = "id, student_id, payment_code, basic_fee, major_surcharge, lab_fee, \
                       exam_fee, activity_fee, total_amount, payment_method, status, \
                       gateway_order_id, gateway_transaction_id, gateway_transaction_status, \
                       gateway_fraud_status, gateway_payment_type, redirect_url, va_number, va_bank, bill_key, \
                       biller_code, gateway_actions, paid_at, created_at, updated_at";

/// Postgres-backed payment repository.
#[derive(Clone)]
pub struct PostgresPaymentRepository {
    pool: PgPool,
}

impl PostgresPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentRepository for PostgresPaymentRepository {
    async fn insert(&self, payment: &PaymentRecord) -> RepositoryResult<PaymentRecord> {
        let sql = format!(
            r#"
            INSERT INTO payments (
                id, student_id, payment_code, basic_fee, major_surcharge, lab_fee,
                exam_fee, activity_fee, total_amount, payment_method, status,
                gateway_order_id, gateway_transaction_id, gateway_transaction_status,
                gateway_fraud_status, gateway_payment_type, redirect_url, va_number, va_bank,
                bill_key, biller_code, gateway_actions, paid_at, created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25
            )
            RETURNING {COLUMNS}
            "#
        );
        let gateway = GatewayColumns::from_domain(payment.gateway.as_ref());

        let row = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(payment.id)
            .bind(payment.student_id)
            .bind(&payment.payment_code)
            .bind(&payment.fees.basic_fee)
            .bind(&payment.fees.major_surcharge)
            .bind(&payment.fees.lab_fee)
            .bind(&payment.fees.exam_fee)
            .bind(&payment.fees.activity_fee)
            .bind(&payment.total_amount)
            .bind(payment.payment_method.as_str())
            .bind(payment.status.as_str())
            .bind(&gateway.order_id)
            .bind(&gateway.transaction_id)
            .bind(&gateway.transaction_status)
            .bind(&gateway.fraud_status)
            .bind(&gateway.payment_type)
            .bind(&gateway.instruction.redirect_url)
            .bind(&gateway.instruction.va_number)
            .bind(&gateway.instruction.va_bank)
            .bind(&gateway.instruction.bill_key)
            .bind(&gateway.instruction.biller_code)
            .bind(Json(&gateway.actions))
            .bind(payment.paid_at)
            .bind(payment.created_at)
            .bind(payment.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        row.into_domain()
    }

    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<PaymentRecord> {
        let sql = format!("SELECT {COLUMNS} FROM payments WHERE id = $1");
        let row = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        row.ok_or_else(|| RepositoryError::NotFound(format!("Payment {}", id)))?
            .into_domain()
    }

    async fn find_by_order_id(&self, order_id: &str) -> RepositoryResult<Option<PaymentRecord>> {
        let sql = format!("SELECT {COLUMNS} FROM payments WHERE gateway_order_id = $1");
        let row = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        row.map(PaymentRow::into_domain).transpose()
    }

    async fn list(&self, filter: PaymentFilter) -> RepositoryResult<Vec<PaymentRecord>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM payments \
             WHERE ($1::uuid IS NULL OR student_id = $1) \
             AND ($2::text IS NULL OR status = $2) \
             ORDER BY created_at, id"
        );
        let rows = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(filter.student_id)
            .bind(filter.status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        rows.into_iter().map(PaymentRow::into_domain).collect()
    }

    async fn update(
        &self,
        payment: &PaymentRecord,
        expected_updated_at: DateTime<Utc>,
    ) -> RepositoryResult<PaymentRecord> {
        let sql = format!(
            r#"
            UPDATE payments SET
                payment_code = $2, basic_fee = $3, major_surcharge = $4, lab_fee = $5,
                exam_fee = $6, activity_fee = $7, total_amount = $8, payment_method = $9,
                status = $10, gateway_order_id = $11, gateway_transaction_id = $12,
                gateway_transaction_status = $13, gateway_fraud_status = $14,
                gateway_payment_type = $15, redirect_url = $16, va_number = $17,
                va_bank = $18, bill_key = $19, biller_code = $20, gateway_actions = $21,
                paid_at = $22, updated_at = $23
            WHERE id = $1 AND updated_at = $24
            RETURNING {COLUMNS}
            "#
        );
        let gateway = GatewayColumns::from_domain(payment.gateway.as_ref());

        let row = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(payment.id)
            .bind(&payment.payment_code)
            .bind(&payment.fees.basic_fee)
            .bind(&payment.fees.major_surcharge)
            .bind(&payment.fees.lab_fee)
            .bind(&payment.fees.exam_fee)
            .bind(&payment.fees.activity_fee)
            .bind(&payment.total_amount)
            .bind(payment.payment_method.as_str())
            .bind(payment.status.as_str())
            .bind(&gateway.order_id)
            .bind(&gateway.transaction_id)
            .bind(&gateway.transaction_status)
            .bind(&gateway.fraud_status)
            .bind(&gateway.payment_type)
            .bind(&gateway.instruction.redirect_url)
            .bind(&gateway.instruction.va_number)
            .bind(&gateway.instruction.va_bank)
            .bind(&gateway.instruction.bill_key)
            .bind(&gateway.instruction.biller_code)
            .bind(Json(&gateway.actions))
            .bind(payment.paid_at)
            .bind(payment.updated_at)
            .bind(expected_updated_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        match row {
            Some(row) => row.into_domain(),
            None => {
                // No row matched: either it is gone or another write got there first.
                let exists: bool =
                    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM payments WHERE id = $1)")
                        .bind(payment.id)
                        .fetch_one(&self.pool)
                        .await
                        .map_err(RepositoryError::from)?;
                if exists {
                    Err(RepositoryError::Stale(format!("Payment {}", payment.id)))
                } else {
                    Err(RepositoryError::NotFound(format!("Payment {}", payment.id)))
                }
            }
        }
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM payments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("Payment {}", id)));
        }
        Ok(())
    }
}

/// Gateway correlation flattened into nullable columns.
struct GatewayColumns {
    order_id: Option<String>,
    transaction_id: Option<String>,
    transaction_status: Option<String>,
    fraud_status: Option<String>,
    payment_type: Option<String>,
    instruction: InstructionColumns,
    actions: Vec<GatewayAction>,
}

impl GatewayColumns {
    fn from_domain(gateway: Option<&GatewayCorrelation>) -> Self {
        match gateway {
            Some(g) => Self {
                order_id: Some(g.order_id.clone()),
                transaction_id: g.transaction_id.clone(),
                transaction_status: g.transaction_status.clone(),
                fraud_status: g.fraud_status.clone(),
                payment_type: g.payment_type.clone(),
                instruction: PaymentInstruction::to_columns(g.instruction.as_ref()),
                actions: g.actions.clone(),
            },
            None => Self {
                order_id: None,
                transaction_id: None,
                transaction_status: None,
                fraud_status: None,
                payment_type: None,
                instruction: InstructionColumns::default(),
                actions: Vec::new(),
            },
        }
    }
}

/// Internal row type for SQLx. Not exposed outside the adapter.
#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    student_id: Uuid,
    payment_code: String,
    basic_fee: Option<BigDecimal>,
    major_surcharge: Option<BigDecimal>,
    lab_fee: Option<BigDecimal>,
    exam_fee: Option<BigDecimal>,
    activity_fee: Option<BigDecimal>,
    total_amount: BigDecimal,
    payment_method: String,
    status: String,
    gateway_order_id: Option<String>,
    gateway_transaction_id: Option<String>,
    gateway_transaction_status: Option<String>,
    gateway_fraud_status: Option<String>,
    gateway_payment_type: Option<String>,
    redirect_url: Option<String>,
    va_number: Option<String>,
    va_bank: Option<String>,
    bill_key: Option<String>,
    biller_code: Option<String>,
    gateway_actions: Json<Vec<GatewayAction>>,
    paid_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PaymentRow {
    fn into_domain(self) -> RepositoryResult<PaymentRecord> {
        let payment_method = self
            .payment_method
            .parse::<PaymentMethod>()
            .map_err(RepositoryError::Database)?;
        let status = self
            .status
            .parse::<PaymentStatus>()
            .map_err(RepositoryError::Database)?;

        let instruction = PaymentInstruction::from_columns(InstructionColumns {
            redirect_url: self.redirect_url,
            va_number: self.va_number,
            va_bank: self.va_bank,
            bill_key: self.bill_key,
            biller_code: self.biller_code,
        });
        let gateway = self.gateway_order_id.map(|order_id| GatewayCorrelation {
            order_id,
            transaction_id: self.gateway_transaction_id,
            transaction_status: self.gateway_transaction_status,
            fraud_status: self.gateway_fraud_status,
            payment_type: self.gateway_payment_type,
            instruction,
            actions: self.gateway_actions.0,
        });

        Ok(PaymentRecord {
            id: self.id,
            student_id: self.student_id,
            payment_code: self.payment_code,
            fees: FeeComponents {
                basic_fee: self.basic_fee,
                major_surcharge: self.major_surcharge,
                lab_fee: self.lab_fee,
                exam_fee: self.exam_fee,
                activity_fee: self.activity_fee,
            },
            total_amount: self.total_amount,
            payment_method,
            status,
            gateway,
            paid_at: self.paid_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
