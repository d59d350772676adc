use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use super::{require_admin, FeeComponentsInput};
use crate::domain::FeeSchedule;
use crate::error::AppError;
use crate::ports::FeeScheduleRepository;
use crate::session::RequestContext;
use crate::validation::{
    parse_amount, required_text, validate_semester, ValidationError, MAJOR_ID_MAX_LEN,
};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFeeScheduleRequest {
    #[serde(default)]
    pub major_id: String,
    pub semester: Option<i32>,
    #[serde(flatten)]
    pub fees: FeeComponentsInput,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFeeScheduleRequest {
    pub major_id: Option<String>,
    pub semester: Option<i32>,
    #[serde(flatten)]
    pub fees: FeeComponentsInput,
}

/// Administrative CRUD over fee schedules.
#[derive(Clone)]
pub struct FeeScheduleService {
    schedules: Arc<dyn FeeScheduleRepository>,
}

impl FeeScheduleService {
    pub fn new(schedules: Arc<dyn FeeScheduleRepository>) -> Self {
        Self { schedules }
    }

    pub async fn create(
        &self,
        ctx: &RequestContext,
        input: CreateFeeScheduleRequest,
    ) -> Result<FeeSchedule, AppError> {
        require_admin(ctx, "creating a fee schedule")?;

        let major_id = required_text("majorId", &input.major_id, MAJOR_ID_MAX_LEN)?;
        let semester = input
            .semester
            .ok_or_else(|| ValidationError::new("semester", "must not be empty"))?;
        validate_semester("semester", semester)?;

        let required = |field: &'static str, raw: &Option<String>| {
            parse_amount(field, raw.as_deref().unwrap_or(""))
        };
        let components = [
            required("basicFee", &input.fees.basic_fee)?,
            required("majorSurcharge", &input.fees.major_surcharge)?,
            required("labFee", &input.fees.lab_fee)?,
            required("examFee", &input.fees.exam_fee)?,
            required("activityFee", &input.fees.activity_fee)?,
        ];

        let schedule = self
            .schedules
            .insert(&FeeSchedule::new(major_id, semester, components))
            .await?;

        tracing::info!(
            request_id = %ctx.request_id,
            fee_schedule_id = %schedule.id,
            major_id = %schedule.major_id,
            semester = schedule.semester,
            "fee schedule created"
        );
        Ok(schedule)
    }

    pub async fn get(&self, id: Uuid) -> Result<FeeSchedule, AppError> {
        Ok(self.schedules.get_by_id(id).await?)
    }

    pub async fn list(&self, major_id: Option<&str>) -> Result<Vec<FeeSchedule>, AppError> {
        Ok(self.schedules.list(major_id).await?)
    }

    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        patch: UpdateFeeScheduleRequest,
    ) -> Result<FeeSchedule, AppError> {
        require_admin(ctx, "updating a fee schedule")?;

        let major_id = patch
            .major_id
            .as_deref()
            .map(|raw| required_text("majorId", raw, MAJOR_ID_MAX_LEN))
            .transpose()?;
        if let Some(semester) = patch.semester {
            validate_semester("semester", semester)?;
        }
        let fees = patch.fees.parse()?;

        let mut schedule = self.schedules.get_by_id(id).await?;
        if let Some(major_id) = major_id {
            schedule.major_id = major_id;
        }
        if let Some(semester) = patch.semester {
            schedule.semester = semester;
        }
        schedule.apply(fees);

        let updated = self.schedules.update(&schedule).await?;
        tracing::info!(
            request_id = %ctx.request_id,
            fee_schedule_id = %updated.id,
            "fee schedule updated"
        );
        Ok(updated)
    }

    pub async fn remove(&self, ctx: &RequestContext, id: Uuid) -> Result<(), AppError> {
        require_admin(ctx, "deleting a fee schedule")?;
        self.schedules.delete(id).await?;
        tracing::info!(request_id = %ctx.request_id, fee_schedule_id = %id, "fee schedule deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryFeeScheduleRepository;

    fn service() -> FeeScheduleService {
        FeeScheduleService::new(Arc::new(InMemoryFeeScheduleRepository::new()))
    }

    fn request(major: &str, semester: i32) -> CreateFeeScheduleRequest {
        CreateFeeScheduleRequest {
            major_id: major.to_string(),
            semester: Some(semester),
            fees: FeeComponentsInput {
                basic_fee: Some("5000000".to_string()),
                major_surcharge: Some("1000000".to_string()),
                lab_fee: Some("500000".to_string()),
                exam_fee: Some("300000".to_string()),
                activity_fee: Some("200000".to_string()),
            },
        }
    }

    #[tokio::test]
    async fn creates_and_rejects_duplicate_major_semester() {
        let service = service();
        let admin = RequestContext::admin();
        let created = service.create(&admin, request("INF", 1)).await.unwrap();
        assert_eq!(created.total().to_string(), "7000000.00");

        let err = service.create(&admin, request("INF", 1)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn requires_every_component_and_valid_semester() {
        let service = service();
        let admin = RequestContext::admin();

        let mut missing = request("INF", 1);
        missing.fees.exam_fee = None;
        match service.create(&admin, missing).await.unwrap_err() {
            AppError::Validation(err) => assert_eq!(err.field, "examFee"),
            other => panic!("unexpected error: {:?}", other),
        }

        let err = service.create(&admin, request("INF", 9)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(e) if e.field == "semester"));
    }

    #[tokio::test]
    async fn mutations_require_admin() {
        let service = service();
        let err = service
            .create(&RequestContext::anonymous(), request("INF", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn patch_updates_components_in_place() {
        let service = service();
        let admin = RequestContext::admin();
        let created = service.create(&admin, request("INF", 1)).await.unwrap();

        let patch = UpdateFeeScheduleRequest {
            fees: FeeComponentsInput {
                lab_fee: Some("750000".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let updated = service.update(&admin, created.id, patch).await.unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.total().to_string(), "7250000.00");

        service.remove(&admin, created.id).await.unwrap();
        assert!(matches!(
            service.get(created.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
