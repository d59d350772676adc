use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A student's enrolment data, used to resolve the applicable fee schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: Uuid,
    pub student_number: String,
    pub name: String,
    pub major_id: String,
    pub semester: i32,
    pub created_at: DateTime<Utc>,
}

impl Student {
    pub fn new(student_number: String, name: String, major_id: String, semester: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            student_number,
            name,
            major_id,
            semester,
            created_at: Utc::now(),
        }
    }

    pub fn summary(&self) -> StudentSummary {
        StudentSummary {
            id: self.id,
            student_number: self.student_number.clone(),
            name: self.name.clone(),
            major_id: self.major_id.clone(),
            semester: self.semester,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    pub id: Uuid,
    pub student_number: String,
    pub name: String,
    pub major_id: String,
    pub semester: i32,
}
