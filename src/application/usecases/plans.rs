use std::sync::Arc;

use axum::http::StatusCode;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
    application::interfaces::clock::Clock,
    domain::{
        entities::plans::PlanEntity,
        repositories::plans::PlanRepository,
        value_objects::plans::{
            InsertPlanModel, PlanModel, ProratedPriceDto, ProratedPriceQuery, UpdatePlanModel,
            prorated_upgrade_price,
        },
    },
};

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    BadRequest(&'static str),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl PlanError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PlanError::NotFound(_) => StatusCode::NOT_FOUND,
            PlanError::BadRequest(_) => StatusCode::BAD_REQUEST,
            PlanError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, PlanError>;

pub struct PlanUseCase<T>
where
    T: PlanRepository + Send + Sync + 'static,
{
    plan_repository: Arc<T>,
    clock: Arc<dyn Clock>,
}

impl<T> PlanUseCase<T>
where
    T: PlanRepository + Send + Sync + 'static,
{
    pub fn new(plan_repository: Arc<T>, clock: Arc<dyn Clock>) -> Self {
        Self {
            plan_repository,
            clock,
        }
    }

    pub async fn create_plan(&self, insert_plan_model: InsertPlanModel) -> UseCaseResult<PlanModel> {
        info!(
            name = %insert_plan_model.name,
            price = insert_plan_model.price,
            duration = insert_plan_model.duration,
            "plans: create requested"
        );

        let insert_plan_entity = insert_plan_model.to_entity(self.clock.now());

        let plan = self
            .plan_repository
            .insert(insert_plan_entity)
            .await
            .map_err(|err| {
                let err = PlanError::Internal(err);
                error!(
                    db_error = ?err,
                    status = err.status_code().as_u16(),
                    "plans: failed to insert plan"
                );
                err
            })?
            .ok_or_else(|| {
                let err = PlanError::BadRequest("Plan not created");
                warn!(
                    status = err.status_code().as_u16(),
                    "plans: insert returned no row"
                );
                err
            })?;

        info!(plan_id = plan.id, "plans: plan created");
        Ok(plan.into())
    }

    pub async fn get_plan(&self, plan_id: i32) -> UseCaseResult<PlanModel> {
        self.find_plan(plan_id).await.map(PlanModel::from)
    }

    pub async fn update_plan(
        &self,
        plan_id: i32,
        update_plan_model: UpdatePlanModel,
    ) -> UseCaseResult<PlanModel> {
        info!(
            plan_id,
            name = update_plan_model.name.is_some(),
            description = update_plan_model.description.is_some(),
            price = update_plan_model.price.is_some(),
            duration = update_plan_model.duration.is_some(),
            "plans: update requested"
        );

        let update_plan_entity = update_plan_model.to_entity(self.clock.now());

        let plan = self
            .plan_repository
            .update(plan_id, update_plan_entity)
            .await
            .map_err(|err| {
                let err = PlanError::Internal(err);
                error!(
                    plan_id,
                    db_error = ?err,
                    status = err.status_code().as_u16(),
                    "plans: failed to update plan"
                );
                err
            })?
            .ok_or_else(|| {
                let err = PlanError::BadRequest("Plan not updated");
                warn!(
                    plan_id,
                    status = err.status_code().as_u16(),
                    "plans: update matched no row"
                );
                err
            })?;

        info!(plan_id, "plans: plan updated");
        Ok(plan.into())
    }

    /// Reads are sequential; a missing current plan short-circuits before the new plan is read.
    pub async fn calculate_prorated_price(
        &self,
        query: ProratedPriceQuery,
    ) -> UseCaseResult<ProratedPriceDto> {
        info!(
            current_plan_id = query.current_plan_id,
            new_plan_id = query.new_plan_id,
            days_remaining = query.days_remaining,
            "plans: prorated price requested"
        );

        let current_plan = self.find_plan(query.current_plan_id).await?;
        let new_plan = self.find_plan(query.new_plan_id).await?;

        let price = prorated_upgrade_price(&current_plan, &new_plan, query.days_remaining);

        info!(
            current_plan_id = current_plan.id,
            new_plan_id = new_plan.id,
            price,
            "plans: prorated price calculated"
        );
        Ok(ProratedPriceDto { price })
    }

    async fn find_plan(&self, plan_id: i32) -> UseCaseResult<PlanEntity> {
        self.plan_repository
            .find_by_id(plan_id)
            .await
            .map_err(|err| {
                let err = PlanError::Internal(err);
                error!(
                    plan_id,
                    db_error = ?err,
                    status = err.status_code().as_u16(),
                    "plans: failed to load plan"
                );
                err
            })?
            .ok_or_else(|| {
                let err = PlanError::NotFound("Plan not found");
                warn!(
                    plan_id,
                    status = err.status_code().as_u16(),
                    "plans: plan not found"
                );
                err
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        application::interfaces::clock::MockClock,
        domain::{
            entities::plans::{
                InsertPlanEntity, UpdatePlanEntity, format_timestamp, parse_timestamp,
            },
            repositories::plans::MockPlanRepository,
        },
    };
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use mockall::predicate::eq;
    use std::sync::Mutex;

    struct SteppingClock {
        now: Mutex<DateTime<Utc>>,
        step: Duration,
    }

    impl SteppingClock {
        fn new(start: DateTime<Utc>, step: Duration) -> Self {
            Self {
                now: Mutex::new(start),
                step,
            }
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            let mut now = self.now.lock().unwrap();
            let current = *now;
            *now = current + self.step;
            current
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn fixed_clock() -> Arc<dyn Clock> {
        let mut clock = MockClock::new();
        clock.expect_now().returning(start);
        Arc::new(clock)
    }

    fn stored(id: i32, entity: &InsertPlanEntity) -> PlanEntity {
        PlanEntity {
            id,
            name: entity.name.clone(),
            description: entity.description.clone(),
            price: entity.price,
            duration: entity.duration,
            created_at: parse_timestamp(&entity.created_at).unwrap(),
            updated_at: parse_timestamp(&entity.updated_at).unwrap(),
        }
    }

    fn applied(mut plan: PlanEntity, patch: &UpdatePlanEntity) -> PlanEntity {
        if let Some(name) = &patch.name {
            plan.name = name.clone();
        }
        if let Some(description) = &patch.description {
            plan.description = Some(description.clone());
        }
        if let Some(price) = patch.price {
            plan.price = price;
        }
        if let Some(duration) = patch.duration {
            plan.duration = duration;
        }
        plan.updated_at = parse_timestamp(&patch.updated_at).unwrap();
        plan
    }

    fn sample_plan(id: i32, name: &str, price: f64, duration: i32) -> PlanEntity {
        PlanEntity {
            id,
            name: name.to_string(),
            description: Some(format!("A {} plan", name.to_lowercase())),
            price,
            duration,
            created_at: start(),
            updated_at: start(),
        }
    }

    fn basic_plan_model() -> InsertPlanModel {
        InsertPlanModel {
            name: "Basic Plan".to_string(),
            description: Some("A basic plan".to_string()),
            price: 100.0,
            duration: 30,
        }
    }

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(
            PlanError::NotFound("Plan not found").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            PlanError::BadRequest("Plan not updated").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            PlanError::Internal(anyhow::anyhow!("pool timed out")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn create_returns_input_fields_and_store_assigned_values() {
        let mut plan_repository = MockPlanRepository::new();
        plan_repository
            .expect_insert()
            .withf(|entity| {
                entity.name == "Basic Plan"
                    && entity.created_at == "2024-05-01T12:00:00.000Z"
                    && entity.updated_at == entity.created_at
            })
            .times(1)
            .returning(|entity| {
                let plan = stored(1, &entity);
                Box::pin(async move { Ok(Some(plan)) })
            });

        let usecase = PlanUseCase::new(Arc::new(plan_repository), fixed_clock());

        let plan = usecase.create_plan(basic_plan_model()).await.unwrap();

        assert_eq!(plan.id, 1);
        assert_eq!(plan.name, "Basic Plan");
        assert_eq!(plan.description.as_deref(), Some("A basic plan"));
        assert_eq!(plan.price, 100.0);
        assert_eq!(plan.duration, 30);
        assert_eq!(plan.created_at, start());
        assert_eq!(plan.updated_at, start());
    }

    #[tokio::test]
    async fn create_without_row_is_bad_request() {
        let mut plan_repository = MockPlanRepository::new();
        plan_repository
            .expect_insert()
            .returning(|_| Box::pin(async { Ok(None) }));

        let usecase = PlanUseCase::new(Arc::new(plan_repository), fixed_clock());

        let err = usecase.create_plan(basic_plan_model()).await.unwrap_err();

        assert!(matches!(err, PlanError::BadRequest("Plan not created")));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_storage_failure_is_internal() {
        let mut plan_repository = MockPlanRepository::new();
        plan_repository
            .expect_insert()
            .returning(|_| Box::pin(async { Err(anyhow::anyhow!("connection refused")) }));

        let usecase = PlanUseCase::new(Arc::new(plan_repository), fixed_clock());

        let err = usecase.create_plan(basic_plan_model()).await.unwrap_err();

        assert!(matches!(err, PlanError::Internal(_)));
        assert_eq!(
            err.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn get_returns_created_business_fields() {
        let mut plan_repository = MockPlanRepository::new();
        let basic = sample_plan(4, "Basic", 100.0, 30);
        plan_repository
            .expect_find_by_id()
            .with(eq(4))
            .times(1)
            .returning(move |_| {
                let plan = basic.clone();
                Box::pin(async move { Ok(Some(plan)) })
            });

        let usecase = PlanUseCase::new(Arc::new(plan_repository), fixed_clock());

        let plan = usecase.get_plan(4).await.unwrap();

        assert_eq!(plan.name, "Basic");
        assert_eq!(plan.description.as_deref(), Some("A basic plan"));
        assert_eq!(plan.price, 100.0);
        assert_eq!(plan.duration, 30);
    }

    #[tokio::test]
    async fn get_missing_plan_is_not_found() {
        let mut plan_repository = MockPlanRepository::new();
        plan_repository
            .expect_find_by_id()
            .with(eq(404))
            .returning(|_| Box::pin(async { Ok(None) }));

        let usecase = PlanUseCase::new(Arc::new(plan_repository), fixed_clock());

        let err = usecase.get_plan(404).await.unwrap_err();

        assert!(matches!(err, PlanError::NotFound("Plan not found")));
        assert_eq!(err.to_string(), "Plan not found");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn update_changes_only_given_fields_and_advances_updated_at() {
        let existing = sample_plan(9, "Basic", 100.0, 30);
        let before = existing.clone();

        let mut plan_repository = MockPlanRepository::new();
        plan_repository
            .expect_update()
            .withf(|plan_id, patch| {
                *plan_id == 9
                    && patch.name.as_deref() == Some("Updated Plan")
                    && patch.price == Some(150.0)
                    && patch.description.is_none()
                    && patch.duration.is_none()
            })
            .times(1)
            .returning(move |_, patch| {
                let plan = applied(existing.clone(), &patch);
                Box::pin(async move { Ok(Some(plan)) })
            });

        let clock = SteppingClock::new(start() + Duration::hours(2), Duration::seconds(1));
        let usecase = PlanUseCase::new(Arc::new(plan_repository), Arc::new(clock));

        let update = UpdatePlanModel {
            name: Some("Updated Plan".to_string()),
            price: Some(150.0),
            ..Default::default()
        };
        let plan = usecase.update_plan(9, update).await.unwrap();

        assert_eq!(plan.name, "Updated Plan");
        assert_eq!(plan.price, 150.0);
        assert_eq!(plan.description, before.description);
        assert_eq!(plan.duration, before.duration);
        assert_eq!(plan.created_at, before.created_at);
        assert!(plan.updated_at > before.updated_at);
        assert_eq!(
            format_timestamp(plan.updated_at),
            "2024-05-01T14:00:00.000Z"
        );
    }

    #[tokio::test]
    async fn updated_at_advances_between_create_and_update() {
        let mut plan_repository = MockPlanRepository::new();
        let created: Arc<Mutex<Option<PlanEntity>>> = Arc::new(Mutex::new(None));

        let created_for_insert = Arc::clone(&created);
        plan_repository.expect_insert().returning(move |entity| {
            let plan = stored(2, &entity);
            *created_for_insert.lock().unwrap() = Some(plan.clone());
            Box::pin(async move { Ok(Some(plan)) })
        });

        let created_for_update = Arc::clone(&created);
        plan_repository
            .expect_update()
            .returning(move |_, patch| {
                let current = created_for_update.lock().unwrap().clone().unwrap();
                let plan = applied(current, &patch);
                Box::pin(async move { Ok(Some(plan)) })
            });

        let clock = SteppingClock::new(start(), Duration::minutes(5));
        let usecase = PlanUseCase::new(Arc::new(plan_repository), Arc::new(clock));

        let plan = usecase.create_plan(basic_plan_model()).await.unwrap();
        let updated = usecase
            .update_plan(plan.id, UpdatePlanModel::default())
            .await
            .unwrap();

        assert_eq!(updated.name, plan.name);
        assert_eq!(updated.price, plan.price);
        assert_eq!(updated.created_at, plan.created_at);
        assert_eq!(updated.updated_at - plan.updated_at, Duration::minutes(5));
    }

    #[tokio::test]
    async fn update_missing_plan_is_bad_request() {
        let mut plan_repository = MockPlanRepository::new();
        plan_repository
            .expect_update()
            .returning(|_, _| Box::pin(async { Ok(None) }));

        let usecase = PlanUseCase::new(Arc::new(plan_repository), fixed_clock());

        let update = UpdatePlanModel {
            price: Some(1.0),
            ..Default::default()
        };
        let err = usecase.update_plan(77, update).await.unwrap_err();

        assert!(matches!(err, PlanError::BadRequest("Plan not updated")));
    }

    #[tokio::test]
    async fn prorated_price_credits_unused_days_of_current_plan() {
        let basic = sample_plan(1, "Basic", 100.0, 30);
        let premium = sample_plan(2, "Premium", 200.0, 30);

        let mut plan_repository = MockPlanRepository::new();
        plan_repository
            .expect_find_by_id()
            .with(eq(1))
            .times(1)
            .returning(move |_| {
                let plan = basic.clone();
                Box::pin(async move { Ok(Some(plan)) })
            });
        plan_repository
            .expect_find_by_id()
            .with(eq(2))
            .times(1)
            .returning(move |_| {
                let plan = premium.clone();
                Box::pin(async move { Ok(Some(plan)) })
            });

        let usecase = PlanUseCase::new(Arc::new(plan_repository), fixed_clock());

        let response = usecase
            .calculate_prorated_price(ProratedPriceQuery {
                current_plan_id: 1,
                new_plan_id: 2,
                days_remaining: 15.0,
            })
            .await
            .unwrap();

        assert!((response.price - 150.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn prorated_price_with_missing_current_plan_skips_second_read() {
        let mut plan_repository = MockPlanRepository::new();
        plan_repository
            .expect_find_by_id()
            .with(eq(1))
            .times(1)
            .returning(|_| Box::pin(async { Ok(None) }));
        plan_repository.expect_find_by_id().with(eq(2)).times(0);

        let usecase = PlanUseCase::new(Arc::new(plan_repository), fixed_clock());

        let err = usecase
            .calculate_prorated_price(ProratedPriceQuery {
                current_plan_id: 1,
                new_plan_id: 2,
                days_remaining: 15.0,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, PlanError::NotFound("Plan not found")));
    }

    #[tokio::test]
    async fn prorated_price_with_missing_new_plan_is_not_found() {
        let basic = sample_plan(1, "Basic", 100.0, 30);

        let mut plan_repository = MockPlanRepository::new();
        plan_repository
            .expect_find_by_id()
            .with(eq(1))
            .returning(move |_| {
                let plan = basic.clone();
                Box::pin(async move { Ok(Some(plan)) })
            });
        plan_repository
            .expect_find_by_id()
            .with(eq(99))
            .returning(|_| Box::pin(async { Ok(None) }));

        let usecase = PlanUseCase::new(Arc::new(plan_repository), fixed_clock());

        let err = usecase
            .calculate_prorated_price(ProratedPriceQuery {
                current_plan_id: 1,
                new_plan_id: 99,
                days_remaining: 15.0,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, PlanError::NotFound(_)));
    }
}
