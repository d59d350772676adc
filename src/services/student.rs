use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::Student;
use crate::error::AppError;
use crate::ports::StudentRepository;
use crate::validation::{
    required_text, validate_semester, ValidationError, MAJOR_ID_MAX_LEN, NAME_MAX_LEN,
    STUDENT_NUMBER_MAX_LEN,
};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStudentRequest {
    #[serde(default)]
    pub student_number: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub major_id: String,
    pub semester: Option<i32>,
}

#[derive(Clone)]
pub struct StudentService {
    students: Arc<dyn StudentRepository>,
}

impl StudentService {
    pub fn new(students: Arc<dyn StudentRepository>) -> Self {
        Self { students }
    }

    pub async fn create(&self, input: CreateStudentRequest) -> Result<Student, AppError> {
        let student_number =
            required_text("studentNumber", &input.student_number, STUDENT_NUMBER_MAX_LEN)?;
        let name = required_text("name", &input.name, NAME_MAX_LEN)?;
        let major_id = required_text("majorId", &input.major_id, MAJOR_ID_MAX_LEN)?;
        let semester = input
            .semester
            .ok_or_else(|| ValidationError::new("semester", "must not be empty"))?;
        validate_semester("semester", semester)?;

        let student = self
            .students
            .insert(&Student::new(student_number, name, major_id, semester))
            .await?;

        tracing::info!(
            student_id = %student.id,
            major_id = %student.major_id,
            semester = student.semester,
            "student registered"
        );
        Ok(student)
    }

    pub async fn get(&self, id: Uuid) -> Result<Student, AppError> {
        Ok(self.students.get_by_id(id).await?)
    }

    pub async fn list(&self, major_id: Option<&str>) -> Result<Vec<Student>, AppError> {
        Ok(self.students.list(major_id).await?)
    }
}
