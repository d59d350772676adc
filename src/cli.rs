use clap::{Args, Parser, Subcommand};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::{mask_password, Config};
use crate::display::{format_currency, payment_method_label, status_label};
use crate::gateway::{MidtransClient, NotificationVerifier, PaymentGateway};
use crate::services::payment::{ListPaymentsQuery, UpdatePaymentRequest};
use crate::session::RequestContext;
use crate::{AppState, Repositories};

#[derive(Parser)]
#[command(name = "campus-billing")]
#[command(about = "Campus Billing - tuition fee schedules and student payments", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve(ServeArgs),

    /// Database management commands
    #[command(subcommand)]
    Db(DbCommands),

    /// Payment administration commands
    #[command(subcommand)]
    Payment(PaymentCommands),

    /// Configuration validation
    Config,
}

#[derive(Args, Debug, Default, Clone)]
pub struct ServeArgs {
    /// Keep all data in process memory instead of Postgres
    #[arg(long)]
    pub in_memory: bool,
}

#[derive(Subcommand)]
pub enum DbCommands {
    /// Run database migrations
    Migrate,
}

#[derive(Subcommand)]
pub enum PaymentCommands {
    /// Mark a payment as paid by ID
    MarkPaid {
        /// Payment UUID
        #[arg(value_name = "PAYMENT_ID")]
        payment_id: Uuid,
    },

    /// List payments
    List {
        /// Only payments of this student
        #[arg(long)]
        student: Option<Uuid>,

        /// Only payments with this status (unpaid, paid)
        #[arg(long)]
        status: Option<String>,
    },
}

pub fn build_gateway(config: &Config) -> Arc<dyn PaymentGateway> {
    Arc::new(MidtransClient::with_circuit_breaker(
        config.gateway_base_url.clone(),
        config.gateway_server_key.clone(),
        config.gateway_timeout_secs,
        config.gateway_failure_threshold,
        config.gateway_reset_timeout_secs,
    ))
}

/// Wires services against `pool`, or against in-memory storage when `None`.
pub fn build_state(config: &Config, pool: Option<PgPool>) -> AppState {
    let repositories = match &pool {
        Some(pool) => Repositories::postgres(pool.clone()),
        None => Repositories::in_memory(),
    };
    let state = AppState::new(
        repositories,
        build_gateway(config),
        NotificationVerifier::new(config.gateway_server_key.clone()),
        config.admin_api_key.clone(),
    )
    .with_request_body_logging(config.log_request_body);

    match pool {
        Some(pool) => state.with_db(pool),
        None => state,
    }
}

pub async fn handle_payment_mark_paid(state: &AppState, payment_id: Uuid) -> anyhow::Result<()> {
    let patch = UpdatePaymentRequest {
        status: Some("paid".to_string()),
        ..Default::default()
    };
    let payment = state
        .payments
        .update(&RequestContext::admin(), payment_id, patch)
        .await?;

    tracing::info!("Payment {} marked as paid", payment_id);
    println!(
        "✓ Payment {} ({}) marked as paid",
        payment.id, payment.payment_code
    );
    Ok(())
}

pub async fn handle_payment_list(
    state: &AppState,
    student: Option<Uuid>,
    status: Option<String>,
) -> anyhow::Result<()> {
    let payments = state
        .payments
        .list(ListPaymentsQuery {
            student_id: student.map(|id| id.to_string()),
            status,
        })
        .await?;

    if payments.is_empty() {
        println!("No payments found");
        return Ok(());
    }

    println!(
        "{:<38} {:<20} {:<14} {:<12} {:>18}",
        "ID", "Code", "Method", "Status", "Total"
    );
    println!("{}", "-".repeat(106));

    for payment in payments {
        println!(
            "{:<38} {:<20} {:<14} {:<12} {:>18}",
            payment.id,
            payment.payment_code,
            payment_method_label(payment.payment_method.as_str()),
            status_label(payment.status.as_str()).label,
            format_currency(&payment.total_amount)
        );
    }

    Ok(())
}

pub async fn handle_db_migrate(config: &Config) -> anyhow::Result<()> {
    let pool = crate::db::create_pool(config).await?;

    tracing::info!("Running database migrations...");
    crate::db::run_migrations(&pool).await?;

    println!("✓ Database migrations completed");
    Ok(())
}

pub fn handle_config_validate(config: &Config) -> anyhow::Result<()> {
    tracing::info!("Validating configuration...");

    println!("Configuration:");
    println!("  Server Port: {}", config.server_port);
    match &config.database_url {
        Some(url) => println!("  Database URL: {}", mask_password(url)),
        None => println!("  Database URL: (not set, in-memory only)"),
    }
    println!("  Database Max Connections: {}", config.database_max_connections);
    println!("  Gateway Base URL: {}", config.gateway_base_url);
    println!("  Gateway Timeout: {}s", config.gateway_timeout_secs);
    println!(
        "  Gateway Circuit Breaker: {} failures, {}s reset",
        config.gateway_failure_threshold, config.gateway_reset_timeout_secs
    );
    println!("  Log Format: {:?}", config.log_format);

    tracing::info!("Configuration is valid");
    println!("✓ Configuration is valid");

    Ok(())
}
