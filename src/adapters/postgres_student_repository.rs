//! Postgres implementation of StudentRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::Student;
use crate::ports::{RepositoryError, RepositoryResult, StudentRepository};

#[derive(Clone)]
pub struct PostgresStudentRepository {
    pool: PgPool,
}

impl PostgresStudentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StudentRepository for PostgresStudentRepository {
    async fn insert(&self, student: &Student) -> RepositoryResult<Student> {
        let row = sqlx::query_as::<_, StudentRow>(
            r#"
            INSERT INTO students (id, student_number, name, major_id, semester, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, student_number, name, major_id, semester, created_at
            "#,
        )
        .bind(student.id)
        .bind(&student.student_number)
        .bind(&student.name)
        .bind(&student.major_id)
        .bind(student.semester)
        .bind(student.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(row.into_domain())
    }

    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Student> {
        let row = sqlx::query_as::<_, StudentRow>(
            "SELECT id, student_number, name, major_id, semester, created_at FROM students WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        row.map(StudentRow::into_domain)
            .ok_or_else(|| RepositoryError::NotFound(format!("Student {}", id)))
    }

    async fn list(&self, major_id: Option<&str>) -> RepositoryResult<Vec<Student>> {
        let rows = sqlx::query_as::<_, StudentRow>(
            r#"
            SELECT id, student_number, name, major_id, semester, created_at
            FROM students
            WHERE ($1::text IS NULL OR major_id = $1)
            ORDER BY created_at, id
            "#,
        )
        .bind(major_id)
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(rows.into_iter().map(StudentRow::into_domain).collect())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StudentRow {
    id: Uuid,
    student_number: String,
    name: String,
    major_id: String,
    semester: i32,
    created_at: DateTime<Utc>,
}

impl StudentRow {
    fn into_domain(self) -> Student {
        Student {
            id: self.id,
            student_number: self.student_number,
            name: self.name,
            major_id: self.major_id,
            semester: self.semester,
            created_at: self.created_at,
        }
    }
}
