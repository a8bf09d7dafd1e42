use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::plans::{
    InsertPlanEntity, PlanEntity, UpdatePlanEntity, format_timestamp,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlanModel {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub duration: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PlanEntity> for PlanModel {
    fn from(value: PlanEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            description: value.description,
            price: value.price,
            duration: value.duration,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InsertPlanModel {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    pub duration: i32,
}

impl InsertPlanModel {
    pub fn to_entity(&self, now: DateTime<Utc>) -> InsertPlanEntity {
        let now = format_timestamp(now);
        InsertPlanEntity {
            name: self.name.clone(),
            description: self.description.clone(),
            price: self.price,
            duration: self.duration,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlanModel {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub duration: Option<i32>,
}

impl UpdatePlanModel {
    pub fn to_entity(&self, now: DateTime<Utc>) -> UpdatePlanEntity {
        UpdatePlanEntity {
            name: self.name.clone(),
            description: self.description.clone(),
            price: self.price,
            duration: self.duration,
            updated_at: format_timestamp(now),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProratedPriceQuery {
    pub current_plan_id: i32,
    pub new_plan_id: i32,
    pub days_remaining: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ProratedPriceDto {
    pub price: f64,
}

/// Price of switching to `new_plan` with `days_remaining` days left on `current_plan`.
///
/// The credit for the unused days of the current plan is subtracted from the new plan's
/// full period price. The new price is not scaled by `days_remaining / new_plan.duration`,
/// so the result only reads as a true proration when both plans share a duration.
/// No rounding is applied. A zero `current_plan.duration` yields a non-finite value.
///
/// With Basic (100 / 30 days) and Premium (200 / 30 days) and 15 days left this returns
/// 150. Earlier acceptance notes expected 100 for the same inputs; that disagreement is
/// unresolved and this keeps the credit-the-unused-days arithmetic.
pub fn prorated_upgrade_price(
    current_plan: &PlanEntity,
    new_plan: &PlanEntity,
    days_remaining: f64,
) -> f64 {
    let unused_amount = current_plan.daily_rate() * days_remaining;
    new_plan.price - unused_amount
}
