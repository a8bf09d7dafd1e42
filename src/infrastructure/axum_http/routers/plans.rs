use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    routing::{get, post},
};
use tracing::info;

use crate::{
    application::{interfaces::clock::Clock, usecases::plans::PlanUseCase},
    domain::{
        repositories::plans::PlanRepository,
        value_objects::plans::{
            InsertPlanModel, PlanModel, ProratedPriceDto, ProratedPriceQuery, UpdatePlanModel,
        },
    },
    infrastructure::{
        axum_http::{auth::AuthUser, error_responses::AppError},
        postgres::{postgres_connection::PgPoolSquad, repositories::plans::PlanPostgres},
    },
};

pub fn routes(db_pool: Arc<PgPoolSquad>, clock: Arc<dyn Clock>) -> Router {
    let plan_repository = PlanPostgres::new(Arc::clone(&db_pool));
    let plan_usecase = PlanUseCase::new(Arc::new(plan_repository), clock);

    router(Arc::new(plan_usecase))
}

pub fn router<T>(plan_usecase: Arc<PlanUseCase<T>>) -> Router
where
    T: PlanRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/", post(create::<T>))
        .route("/prorated-price", post(calculate_prorated_price::<T>))
        .route("/:plan_id", get(get_one::<T>).patch(update::<T>))
        .with_state(plan_usecase)
}

pub async fn create<T>(
    State(plan_usecase): State<Arc<PlanUseCase<T>>>,
    auth: AuthUser,
    payload: Result<Json<InsertPlanModel>, JsonRejection>,
) -> Result<Json<PlanModel>, AppError>
where
    T: PlanRepository + Send + Sync + 'static,
{
    info!(
        user_id = %auth.user_id,
        email = ?auth.email,
        role = %auth.role,
        "plans router: create"
    );
    let Json(insert_plan_model) = payload?;
    let plan = plan_usecase.create_plan(insert_plan_model).await?;
    Ok(Json(plan))
}

pub async fn update<T>(
    State(plan_usecase): State<Arc<PlanUseCase<T>>>,
    auth: AuthUser,
    plan_id: Result<Path<i32>, PathRejection>,
    payload: Result<Json<UpdatePlanModel>, JsonRejection>,
) -> Result<Json<PlanModel>, AppError>
where
    T: PlanRepository + Send + Sync + 'static,
{
    let Path(plan_id) = plan_id?;
    let Json(update_plan_model) = payload?;
    info!(
        user_id = %auth.user_id,
        email = ?auth.email,
        plan_id,
        "plans router: update"
    );
    let plan = plan_usecase.update_plan(plan_id, update_plan_model).await?;
    Ok(Json(plan))
}

pub async fn get_one<T>(
    State(plan_usecase): State<Arc<PlanUseCase<T>>>,
    plan_id: Result<Path<i32>, PathRejection>,
) -> Result<Json<PlanModel>, AppError>
where
    T: PlanRepository + Send + Sync + 'static,
{
    let Path(plan_id) = plan_id?;
    let plan = plan_usecase.get_plan(plan_id).await?;
    Ok(Json(plan))
}

pub async fn calculate_prorated_price<T>(
    State(plan_usecase): State<Arc<PlanUseCase<T>>>,
    payload: Result<Json<ProratedPriceQuery>, JsonRejection>,
) -> Result<Json<ProratedPriceDto>, AppError>
where
    T: PlanRepository + Send + Sync + 'static,
{
    let Json(query) = payload?;
    let price = plan_usecase.calculate_prorated_price(query).await?;
    Ok(Json(price))
}
