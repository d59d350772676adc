use campus_billing::cli::{self, Cli, Commands, DbCommands, PaymentCommands, ServeArgs};
use campus_billing::config::{Config, LogFormat};
use campus_billing::{create_app, db};
use clap::Parser;
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;
    init_tracing(config.log_format);

    match cli.command.unwrap_or(Commands::Serve(ServeArgs::default())) {
        Commands::Serve(args) => serve(config, args).await,
        Commands::Db(DbCommands::Migrate) => cli::handle_db_migrate(&config).await,
        Commands::Config => cli::handle_config_validate(&config),
        Commands::Payment(command) => {
            let pool = db::create_pool(&config).await?;
            let state = cli::build_state(&config, Some(pool));
            match command {
                PaymentCommands::MarkPaid { payment_id } => {
                    cli::handle_payment_mark_paid(&state, payment_id).await
                }
                PaymentCommands::List { student, status } => {
                    cli::handle_payment_list(&state, student, status).await
                }
            }
        }
    }
}

async fn serve(config: Config, args: ServeArgs) -> anyhow::Result<()> {
    let pool = if args.in_memory {
        tracing::warn!("Serving from in-memory storage; data is lost on exit");
        None
    } else {
        let pool = db::create_pool(&config).await?;
        db::run_migrations(&pool).await?;
        Some(pool)
    };

    tracing::info!(
        "Payment gateway client initialized with URL: {}",
        config.gateway_base_url
    );
    let app = create_app(cli::build_state(&config, pool));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
