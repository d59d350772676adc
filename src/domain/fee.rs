use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const AMOUNT_SCALE: i64 = 2;

/// The five named sub-amounts that make up a payment.
///
/// Any component may be absent; absent components count as zero in
/// [`FeeComponents::total`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeComponents {
    pub basic_fee: Option<BigDecimal>,
    pub major_surcharge: Option<BigDecimal>,
    pub lab_fee: Option<BigDecimal>,
    pub exam_fee: Option<BigDecimal>,
    pub activity_fee: Option<BigDecimal>,
}

impl FeeComponents {
    pub fn iter(&self) -> impl Iterator<Item = &BigDecimal> {
        [
            &self.basic_fee,
            &self.major_surcharge,
            &self.lab_fee,
            &self.exam_fee,
            &self.activity_fee,
        ]
        .into_iter()
        .flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn total(&self) -> BigDecimal {
        self.iter()
            .fold(BigDecimal::zero(), |acc, amount| acc + amount)
            .with_scale(AMOUNT_SCALE)
    }

    /// Overwrites every component that is present in `patch`.
    pub fn merge(&mut self, patch: FeeComponents) {
        if patch.basic_fee.is_some() {
            self.basic_fee = patch.basic_fee;
        }
        if patch.major_surcharge.is_some() {
            self.major_surcharge = patch.major_surcharge;
        }
        if patch.lab_fee.is_some() {
            self.lab_fee = patch.lab_fee;
        }
        if patch.exam_fee.is_some() {
            self.exam_fee = patch.exam_fee;
        }
        if patch.activity_fee.is_some() {
            self.activity_fee = patch.activity_fee;
        }
    }
}

/// Base fees for one major in one semester. At most one exists per
/// `(major_id, semester)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeSchedule {
    pub id: Uuid,
    pub major_id: String,
    pub semester: i32,
    pub basic_fee: BigDecimal,
    pub major_surcharge: BigDecimal,
    pub lab_fee: BigDecimal,
    pub exam_fee: BigDecimal,
    pub activity_fee: BigDecimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FeeSchedule {
    pub fn new(major_id: String, semester: i32, components: [BigDecimal; 5]) -> Self {
        let [basic_fee, major_surcharge, lab_fee, exam_fee, activity_fee] = components;
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            major_id,
            semester,
            basic_fee,
            major_surcharge,
            lab_fee,
            exam_fee,
            activity_fee,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn components(&self) -> FeeComponents {
        FeeComponents {
            basic_fee: Some(self.basic_fee.clone()),
            major_surcharge: Some(self.major_surcharge.clone()),
            lab_fee: Some(self.lab_fee.clone()),
            exam_fee: Some(self.exam_fee.clone()),
            activity_fee: Some(self.activity_fee.clone()),
        }
    }

    pub fn total(&self) -> BigDecimal {
        self.components().total()
    }

    pub fn apply(&mut self, patch: FeeComponents) {
        let mut current = self.components();
        current.merge(patch);
        // Every field is Some after merging onto a full component set.
        let zero = BigDecimal::zero;
        self.basic_fee = current.basic_fee.unwrap_or_else(zero);
        self.major_surcharge = current.major_surcharge.unwrap_or_else(zero);
        self.lab_fee = current.lab_fee.unwrap_or_else(zero);
        self.exam_fee = current.exam_fee.unwrap_or_else(zero);
        self.activity_fee = current.activity_fee.unwrap_or_else(zero);
        self.updated_at = Utc::now();
    }
}
