pub mod adapters;
pub mod cli;
pub mod config;
pub mod db;
pub mod display;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod middleware;
pub mod ports;
pub mod services;
pub mod session;
pub mod utils;
pub mod validation;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::adapters::{
    InMemoryFeeScheduleRepository, InMemoryPaymentRepository, InMemoryStudentRepository,
    PostgresFeeScheduleRepository, PostgresPaymentRepository, PostgresStudentRepository,
};
use crate::gateway::{NotificationVerifier, PaymentGateway};
use crate::ports::{FeeScheduleRepository, PaymentRepository, StudentRepository};
use crate::services::{FeeComputationService, FeeScheduleService, PaymentService, StudentService};

/// The repository set the services run against.
#[derive(Clone)]
pub struct Repositories {
    pub students: Arc<dyn StudentRepository>,
    pub fee_schedules: Arc<dyn FeeScheduleRepository>,
    pub payments: Arc<dyn PaymentRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            students: Arc::new(PostgresStudentRepository::new(pool.clone())),
            fee_schedules: Arc::new(PostgresFeeScheduleRepository::new(pool.clone())),
            payments: Arc::new(PostgresPaymentRepository::new(pool)),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            students: Arc::new(InMemoryStudentRepository::new()),
            fee_schedules: Arc::new(InMemoryFeeScheduleRepository::new()),
            payments: Arc::new(InMemoryPaymentRepository::new()),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub students: StudentService,
    pub fee_schedules: FeeScheduleService,
    pub fee_computation: FeeComputationService,
    pub payments: PaymentService,
    pub gateway: Arc<dyn PaymentGateway>,
    pub verifier: NotificationVerifier,
    pub admin_api_key: String,
    /// `None` in in-memory mode.
    pub db: Option<PgPool>,
    pub log_request_body: bool,
}

impl AppState {
    pub fn new(
        repositories: Repositories,
        gateway: Arc<dyn PaymentGateway>,
        verifier: NotificationVerifier,
        admin_api_key: impl Into<String>,
    ) -> Self {
        let fee_computation = FeeComputationService::new(
            repositories.students.clone(),
            repositories.fee_schedules.clone(),
        );
        Self {
            students: StudentService::new(repositories.students.clone()),
            fee_schedules: FeeScheduleService::new(repositories.fee_schedules),
            payments: PaymentService::new(
                repositories.payments,
                repositories.students,
                fee_computation.clone(),
                gateway.clone(),
            ),
            fee_computation,
            gateway,
            verifier,
            admin_api_key: admin_api_key.into(),
            db: None,
            log_request_body: false,
        }
    }

    pub fn with_db(mut self, pool: PgPool) -> Self {
        self.db = Some(pool);
        self
    }

    pub fn with_request_body_logging(mut self, enabled: bool) -> Self {
        self.log_request_body = enabled;
        self
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/students",
            get(handlers::students::list_students).post(handlers::students::create_student),
        )
        .route("/students/:id", get(handlers::students::get_student))
        .route(
            "/biaya",
            get(handlers::biaya::list_fee_schedules).post(handlers::biaya::create_fee_schedule),
        )
        .route(
            "/biaya/:id",
            get(handlers::biaya::get_fee_schedule)
                .patch(handlers::biaya::update_fee_schedule)
                .delete(handlers::biaya::delete_fee_schedule),
        )
        .route(
            "/payment",
            get(handlers::payment::list_payments).post(handlers::payment::create_payment),
        )
        .route(
            "/payment/midtrans",
            post(handlers::payment::create_gateway_payment),
        )
        .route(
            "/payment/notification",
            post(handlers::payment::gateway_notification),
        )
        .route(
            "/payment/biaya-default/:student_id",
            get(handlers::payment::default_fee),
        )
        .route(
            "/payment/:id",
            get(handlers::payment::get_payment)
                .patch(handlers::payment::update_payment)
                .delete(handlers::payment::delete_payment),
        )
        .route("/payment/:id/summary", get(handlers::payment::payment_summary))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::request_logger::request_logger_middleware,
        ))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
