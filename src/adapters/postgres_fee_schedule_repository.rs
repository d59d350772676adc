//! Postgres implementation of FeeScheduleRepository.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::FeeSchedule;
use crate::ports::{FeeScheduleRepository, RepositoryError, RepositoryResult};

const COLUMNS: &str = "id, major_id, semester, basic_fee, major_surcharge, lab_fee, exam_fee, \
                       activity_fee, created_at, updated_at";

#[derive(Clone)]
pub struct PostgresFeeScheduleRepository {
    pool: PgPool,
}

impl PostgresFeeScheduleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FeeScheduleRepository for PostgresFeeScheduleRepository {
    async fn insert(&self, schedule: &FeeSchedule) -> RepositoryResult<FeeSchedule> {
        let sql = format!(
            r#"
            INSERT INTO fee_schedules (
                id, major_id, semester, basic_fee, major_surcharge, lab_fee, exam_fee,
                activity_fee, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, FeeScheduleRow>(&sql)
            .bind(schedule.id)
            .bind(&schedule.major_id)
            .bind(schedule.semester)
            .bind(&schedule.basic_fee)
            .bind(&schedule.major_surcharge)
            .bind(&schedule.lab_fee)
            .bind(&schedule.exam_fee)
            .bind(&schedule.activity_fee)
            .bind(schedule.created_at)
            .bind(schedule.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        Ok(row.into_domain())
    }

    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<FeeSchedule> {
        let sql = format!("SELECT {COLUMNS} FROM fee_schedules WHERE id = $1");
        let row = sqlx::query_as::<_, FeeScheduleRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        row.map(FeeScheduleRow::into_domain)
            .ok_or_else(|| RepositoryError::NotFound(format!("Fee schedule {}", id)))
    }

    async fn find_by_major_semester(
        &self,
        major_id: &str,
        semester: i32,
    ) -> RepositoryResult<Option<FeeSchedule>> {
        let sql = format!("SELECT {COLUMNS} FROM fee_schedules WHERE major_id = $1 AND semester = $2");
        let row = sqlx::query_as::<_, FeeScheduleRow>(&sql)
            .bind(major_id)
            .bind(semester)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        Ok(row.map(FeeScheduleRow::into_domain))
    }

    async fn list(&self, major_id: Option<&str>) -> RepositoryResult<Vec<FeeSchedule>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM fee_schedules \
             WHERE ($1::text IS NULL OR major_id = $1) \
             ORDER BY major_id, semester"
        );
        let rows = sqlx::query_as::<_, FeeScheduleRow>(&sql)
            .bind(major_id)
            .fetch_all(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        Ok(rows.into_iter().map(FeeScheduleRow::into_domain).collect())
    }

    async fn update(&self, schedule: &FeeSchedule) -> RepositoryResult<FeeSchedule> {
        let sql = format!(
            r#"
            UPDATE fee_schedules
            SET major_id = $2, semester = $3, basic_fee = $4, major_surcharge = $5,
                lab_fee = $6, exam_fee = $7, activity_fee = $8, updated_at = $9
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, FeeScheduleRow>(&sql)
            .bind(schedule.id)
            .bind(&schedule.major_id)
            .bind(schedule.semester)
            .bind(&schedule.basic_fee)
            .bind(&schedule.major_surcharge)
            .bind(&schedule.lab_fee)
            .bind(&schedule.exam_fee)
            .bind(&schedule.activity_fee)
            .bind(schedule.updated_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        row.map(FeeScheduleRow::into_domain)
            .ok_or_else(|| RepositoryError::NotFound(format!("Fee schedule {}", schedule.id)))
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM fee_schedules WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("Fee schedule {}", id)));
        }
        Ok(())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct FeeScheduleRow {
    id: Uuid,
    major_id: String,
    semester: i32,
    basic_fee: BigDecimal,
    major_surcharge: BigDecimal,
    lab_fee: BigDecimal,
    exam_fee: BigDecimal,
    activity_fee: BigDecimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl FeeScheduleRow {
    fn into_domain(self) -> FeeSchedule {
        FeeSchedule {
            id: self.id,
            major_id: self.major_id,
            semester: self.semester,
            basic_fee: self.basic_fee,
            major_surcharge: self.major_surcharge,
            lab_fee: self.lab_fee,
            exam_fee: self.exam_fee,
            activity_fee: self.activity_fee,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
