use bigdecimal::{BigDecimal, Zero};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{FeeSchedule, Student, StudentSummary};
use crate::domain::fee::AMOUNT_SCALE;
use crate::error::AppError;
use crate::ports::{FeeScheduleRepository, StudentRepository};
use crate::validation::validate_semester;

/// The fee schedule that applies to a student, with its total.
///
/// `fee_schedule` is `None` when nothing is configured for the student's
/// major and semester; `message` then says so and `total` is zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultFee {
    pub student: StudentSummary,
    pub semester: i32,
    pub fee_schedule: Option<FeeSchedule>,
    pub total: BigDecimal,
    pub message: Option<String>,
}

#[derive(Clone)]
pub struct FeeComputationService {
    students: Arc<dyn StudentRepository>,
    schedules: Arc<dyn FeeScheduleRepository>,
}

impl FeeComputationService {
    pub fn new(
        students: Arc<dyn StudentRepository>,
        schedules: Arc<dyn FeeScheduleRepository>,
    ) -> Self {
        Self {
            students,
            schedules,
        }
    }

    /// Resolves the default fee for `student_id`, using `semester` instead of
    /// the student's recorded semester when given.
    pub async fn default_fee(
        &self,
        student_id: Uuid,
        semester: Option<i32>,
    ) -> Result<DefaultFee, AppError> {
        if let Some(semester) = semester {
            validate_semester("semester", semester)?;
        }
        let student = self.students.get_by_id(student_id).await?;
        self.default_fee_for(&student, semester).await
    }

    pub async fn default_fee_for(
        &self,
        student: &Student,
        semester: Option<i32>,
    ) -> Result<DefaultFee, AppError> {
        let semester = semester.unwrap_or(student.semester);
        validate_semester("semester", semester)?;

        let schedule = self
            .schedules
            .find_by_major_semester(&student.major_id, semester)
            .await?;

        let (total, message) = match &schedule {
            Some(schedule) => (schedule.total(), None),
            None => {
                tracing::debug!(
                    student_id = %student.id,
                    major_id = %student.major_id,
                    semester,
                    "no default fee configured"
                );
                (
                    BigDecimal::zero().with_scale(AMOUNT_SCALE),
                    Some(format!(
                        "No default fee configured for major {} semester {}; enter the amounts manually",
                        student.major_id, semester
                    )),
                )
            }
        };

        Ok(DefaultFee {
            student: student.summary(),
            semester,
            fee_schedule: schedule,
            total,
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryFeeScheduleRepository, InMemoryStudentRepository};
    use std::str::FromStr;

    fn dec(value: &str) -> BigDecimal {
        BigDecimal::from_str(value).unwrap()
    }

    async fn fixture() -> (FeeComputationService, Student) {
        let students = Arc::new(InMemoryStudentRepository::new());
        let schedules = Arc::new(InMemoryFeeScheduleRepository::new());

        let student = Student::new(
            "2024001".to_string(),
            "Siti Rahma".to_string(),
            "INF".to_string(),
            3,
        );
        students.insert(&student).await.unwrap();
        schedules
            .insert(&FeeSchedule::new(
                "INF".to_string(),
                3,
                [
                    dec("5000000"),
                    dec("1000000"),
                    dec("500000"),
                    dec("300000"),
                    dec("200000"),
                ],
            ))
            .await
            .unwrap();

        (FeeComputationService::new(students, schedules), student)
    }

    #[tokio::test]
    async fn sums_schedule_for_recorded_semester() {
        let (service, student) = fixture().await;
        let result = service.default_fee(student.id, None).await.unwrap();

        assert_eq!(result.semester, 3);
        assert_eq!(result.total, dec("7000000"));
        assert!(result.fee_schedule.is_some());
        assert!(result.message.is_none());
        assert_eq!(result.student.major_id, "INF");
    }

    #[tokio::test]
    async fn missing_schedule_is_not_an_error() {
        let (service, student) = fixture().await;
        let result = service.default_fee(student.id, Some(4)).await.unwrap();

        assert_eq!(result.semester, 4);
        assert!(result.fee_schedule.is_none());
        assert_eq!(result.total, dec("0"));
        assert!(result.message.unwrap().contains("semester 4"));
    }

    #[tokio::test]
    async fn rejects_out_of_range_override() {
        let (service, student) = fixture().await;
        for semester in [0, 9] {
            let err = service.default_fee(student.id, Some(semester)).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
    }

    #[tokio::test]
    async fn unknown_student_is_not_found() {
        let (service, _) = fixture().await;
        let err = service.default_fee(Uuid::new_v4(), None).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
