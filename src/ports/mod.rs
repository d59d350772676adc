//! Repository ports. Services depend on these traits; `adapters` implements
//! them for Postgres and for in-process storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{FeeSchedule, PaymentRecord, PaymentStatus, Student};

/// Postgres SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0} already exists")]
    Conflict(String),
    #[error("{0} was modified by another request")]
    Stale(String),
    #[error("{0}")]
    Database(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("row".to_string()),
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                RepositoryError::Conflict(describe_constraint(db_err.constraint()))
            }
            other => RepositoryError::Database(other.to_string()),
        }
    }
}

fn describe_constraint(constraint: Option<&str>) -> String {
    match constraint {
        Some("payments_payment_code_key") => "payment code".to_string(),
        Some("fee_schedules_major_semester_key") => "fee schedule for this major and semester".to_string(),
        Some("students_student_number_key") => "student number".to_string(),
        Some(other) => other.to_string(),
        None => "record".to_string(),
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Filters for [`PaymentRepository::list`]. Unset fields match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaymentFilter {
    pub student_id: Option<Uuid>,
    pub status: Option<PaymentStatus>,
}

impl PaymentFilter {
    pub fn matches(&self, payment: &PaymentRecord) -> bool {
        self.student_id.map_or(true, |id| payment.student_id == id)
            && self.status.map_or(true, |status| payment.status == status)
    }
}

#[async_trait]
pub trait StudentRepository: Send + Sync {
    /// Fails with `Conflict` when the student number is taken.
    async fn insert(&self, student: &Student) -> RepositoryResult<Student>;
    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Student>;
    async fn list(&self, major_id: Option<&str>) -> RepositoryResult<Vec<Student>>;
}

#[async_trait]
pub trait FeeScheduleRepository: Send + Sync {
    /// Fails with `Conflict` when `(major_id, semester)` already has a schedule.
    async fn insert(&self, schedule: &FeeSchedule) -> RepositoryResult<FeeSchedule>;
    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<FeeSchedule>;
    async fn find_by_major_semester(
        &self,
        major_id: &str,
        semester: i32,
    ) -> RepositoryResult<Option<FeeSchedule>>;
    async fn list(&self, major_id: Option<&str>) -> RepositoryResult<Vec<FeeSchedule>>;
    async fn update(&self, schedule: &FeeSchedule) -> RepositoryResult<FeeSchedule>;
    async fn delete(&self, id: Uuid) -> RepositoryResult<()>;
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Fails with `Conflict` when the payment code is taken. Uniqueness is the
    /// store's responsibility so concurrent inserts cannot both succeed.
    async fn insert(&self, payment: &PaymentRecord) -> RepositoryResult<PaymentRecord>;
    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<PaymentRecord>;
    async fn find_by_order_id(&self, order_id: &str) -> RepositoryResult<Option<PaymentRecord>>;
    /// Returns matching records in creation order.
    async fn list(&self, filter: PaymentFilter) -> RepositoryResult<Vec<PaymentRecord>>;
    /// Writes `payment` only while the stored row is still stamped
    /// `expected_updated_at`; a row changed since it was read fails with
    /// `Stale`.
    async fn update(
        &self,
        payment: &PaymentRecord,
        expected_updated_at: DateTime<Utc>,
    ) -> RepositoryResult<PaymentRecord>;
    async fn delete(&self, id: Uuid) -> RepositoryResult<()>;
}
