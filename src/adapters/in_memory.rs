//! In-memory repositories for tests and local development.
//!
//! Each store keeps rows in insertion order behind a `RwLock`. Uniqueness
//! checks and the insert happen under the same write lock, so they hold
//! under concurrent callers just like a unique index.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::domain::{FeeSchedule, PaymentRecord, Student};
use crate::ports::{
    FeeScheduleRepository, PaymentFilter, PaymentRepository, RepositoryError, RepositoryResult,
    StudentRepository,
};

fn read<T>(lock: &RwLock<Vec<T>>) -> RepositoryResult<RwLockReadGuard<'_, Vec<T>>> {
    lock.read()
        .map_err(|e| RepositoryError::Database(format!("Failed to acquire read lock: {}", e)))
}

fn write<T>(lock: &RwLock<Vec<T>>) -> RepositoryResult<RwLockWriteGuard<'_, Vec<T>>> {
    lock.write()
        .map_err(|e| RepositoryError::Database(format!("Failed to acquire write lock: {}", e)))
}

#[derive(Clone, Default)]
pub struct InMemoryStudentRepository {
    rows: Arc<RwLock<Vec<Student>>>,
}

impl InMemoryStudentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StudentRepository for InMemoryStudentRepository {
    async fn insert(&self, student: &Student) -> RepositoryResult<Student> {
        let mut rows = write(&self.rows)?;
        if rows.iter().any(|s| s.student_number == student.student_number) {
            return Err(RepositoryError::Conflict("student number".to_string()));
        }
        rows.push(student.clone());
        Ok(student.clone())
    }

    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Student> {
        read(&self.rows)?
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(format!("Student {}", id)))
    }

    async fn list(&self, major_id: Option<&str>) -> RepositoryResult<Vec<Student>> {
        Ok(read(&self.rows)?
            .iter()
            .filter(|s| major_id.map_or(true, |m| s.major_id == m))
            .cloned()
            .collect())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryFeeScheduleRepository {
    rows: Arc<RwLock<Vec<FeeSchedule>>>,
}

impl InMemoryFeeScheduleRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FeeScheduleRepository for InMemoryFeeScheduleRepository {
    async fn insert(&self, schedule: &FeeSchedule) -> RepositoryResult<FeeSchedule> {
        let mut rows = write(&self.rows)?;
        if rows
            .iter()
            .any(|s| s.major_id == schedule.major_id && s.semester == schedule.semester)
        {
            return Err(RepositoryError::Conflict(
                "fee schedule for this major and semester".to_string(),
            ));
        }
        rows.push(schedule.clone());
        Ok(schedule.clone())
    }

    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<FeeSchedule> {
        read(&self.rows)?
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(format!("Fee schedule {}", id)))
    }

    async fn find_by_major_semester(
        &self,
        major_id: &str,
        semester: i32,
    ) -> RepositoryResult<Option<FeeSchedule>> {
        Ok(read(&self.rows)?
            .iter()
            .find(|s| s.major_id == major_id && s.semester == semester)
            .cloned())
    }

    async fn list(&self, major_id: Option<&str>) -> RepositoryResult<Vec<FeeSchedule>> {
        Ok(read(&self.rows)?
            .iter()
            .filter(|s| major_id.map_or(true, |m| s.major_id == m))
            .cloned()
            .collect())
    }

    async fn update(&self, schedule: &FeeSchedule) -> RepositoryResult<FeeSchedule> {
        let mut rows = write(&self.rows)?;
        if rows.iter().any(|s| {
            s.id != schedule.id && s.major_id == schedule.major_id && s.semester == schedule.semester
        }) {
            return Err(RepositoryError::Conflict(
                "fee schedule for this major and semester".to_string(),
            ));
        }
        let slot = rows
            .iter_mut()
            .find(|s| s.id == schedule.id)
            .ok_or_else(|| RepositoryError::NotFound(format!("Fee schedule {}", schedule.id)))?;
        *slot = schedule.clone();
        Ok(schedule.clone())
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<()> {
        let mut rows = write(&self.rows)?;
        let before = rows.len();
        rows.retain(|s| s.id != id);
        if rows.len() == before {
            return Err(RepositoryError::NotFound(format!("Fee schedule {}", id)));
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryPaymentRepository {
    rows: Arc<RwLock<Vec<PaymentRecord>>>,
}

impl InMemoryPaymentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.read().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn insert(&self, payment: &PaymentRecord) -> RepositoryResult<PaymentRecord> {
        let mut rows = write(&self.rows)?;
        if rows.iter().any(|p| p.payment_code == payment.payment_code) {
            return Err(RepositoryError::Conflict(format!(
                "payment code {}",
                payment.payment_code
            )));
        }
        rows.push(payment.clone());
        Ok(payment.clone())
    }

    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<PaymentRecord> {
        read(&self.rows)?
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(format!("Payment {}", id)))
    }

    async fn find_by_order_id(&self, order_id: &str) -> RepositoryResult<Option<PaymentRecord>> {
        Ok(read(&self.rows)?
            .iter()
            .find(|p| p.gateway.as_ref().map_or(false, |g| g.order_id == order_id))
            .cloned())
    }

    async fn list(&self, filter: PaymentFilter) -> RepositoryResult<Vec<PaymentRecord>> {
        Ok(read(&self.rows)?
            .iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect())
    }

    async fn update(
        &self,
        payment: &PaymentRecord,
        expected_updated_at: DateTime<Utc>,
    ) -> RepositoryResult<PaymentRecord> {
        let mut rows = write(&self.rows)?;
        if rows
            .iter()
            .any(|p| p.id != payment.id && p.payment_code == payment.payment_code)
        {
            return Err(RepositoryError::Conflict(format!(
                "payment code {}",
                payment.payment_code
            )));
        }
        let slot = rows
            .iter_mut()
            .find(|p| p.id == payment.id)
            .ok_or_else(|| RepositoryError::NotFound(format!("Payment {}", payment.id)))?;
        if slot.updated_at != expected_updated_at {
            return Err(RepositoryError::Stale(format!("Payment {}", payment.id)));
        }
        *slot = payment.clone();
        Ok(payment.clone())
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<()> {
        let mut rows = write(&self.rows)?;
        let before = rows.len();
        rows.retain(|p| p.id != id);
        if rows.len() == before {
            return Err(RepositoryError::NotFound(format!("Payment {}", id)));
        }
        Ok(())
    }
}
