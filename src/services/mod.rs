pub mod fee_computation;
pub mod fee_schedule;
pub mod payment;
pub mod student;

use serde::{Deserialize, Deserializer};

use crate::domain::FeeComponents;
use crate::error::AppError;
use crate::session::RequestContext;
use crate::validation::{parse_optional_amount, ValidationError};

pub use fee_computation::{DefaultFee, FeeComputationService};
pub use fee_schedule::FeeScheduleService;
pub use payment::PaymentService;
pub use student::StudentService;

/// Fee components as decimal text, as they arrive in request bodies.
/// JSON numbers are accepted and kept in their literal form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeComponentsInput {
    #[serde(default, deserialize_with = "amount_text")]
    pub basic_fee: Option<String>,
    #[serde(default, deserialize_with = "amount_text")]
    pub major_surcharge: Option<String>,
    #[serde(default, deserialize_with = "amount_text")]
    pub lab_fee: Option<String>,
    #[serde(default, deserialize_with = "amount_text")]
    pub exam_fee: Option<String>,
    #[serde(default, deserialize_with = "amount_text")]
    pub activity_fee: Option<String>,
}

fn amount_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Integer(u64),
        Number(f64),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Text(text)) => Some(text),
        Some(Raw::Integer(value)) => Some(value.to_string()),
        Some(Raw::Number(value)) => Some(value.to_string()),
        None => None,
    })
}

impl FeeComponentsInput {
    pub fn parse(&self) -> Result<FeeComponents, ValidationError> {
        Ok(FeeComponents {
            basic_fee: parse_optional_amount("basicFee", self.basic_fee.as_deref())?,
            major_surcharge: parse_optional_amount(
                "majorSurcharge",
                self.major_surcharge.as_deref(),
            )?,
            lab_fee: parse_optional_amount("labFee", self.lab_fee.as_deref())?,
            exam_fee: parse_optional_amount("examFee", self.exam_fee.as_deref())?,
            activity_fee: parse_optional_amount("activityFee", self.activity_fee.as_deref())?,
        })
    }
}

pub(crate) fn require_admin(ctx: &RequestContext, action: &str) -> Result<(), AppError> {
    if ctx.is_admin() {
        return Ok(());
    }
    tracing::warn!(request_id = %ctx.request_id, action, "administrative action refused");
    Err(AppError::Unauthorized(format!("{} requires an administrator", action)))
}
