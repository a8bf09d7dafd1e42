use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::entities::plans::{InsertPlanEntity, PlanEntity, UpdatePlanEntity};

/// Storage port for plan records. `Ok(None)` means the statement touched no row.
#[async_trait]
#[automock]
pub trait PlanRepository {
    async fn insert(&self, insert_plan_entity: InsertPlanEntity) -> Result<Option<PlanEntity>>;
    async fn find_by_id(&self, plan_id: i32) -> Result<Option<PlanEntity>>;
    async fn update(
        &self,
        plan_id: i32,
        update_plan_entity: UpdatePlanEntity,
    ) -> Result<Option<PlanEntity>>;
}
