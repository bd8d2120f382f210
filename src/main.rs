use std::{process, sync::Arc};

use quire::{
    application::{
        context::{ApplicationContext, Repositories},
        error::{AppError, ErrorReport},
    },
    cache::KeyValueCache,
    config::{self, Command, TokenCommand},
    infra::{
        cache::{build_cache, health_check},
        db::PostgresRepositories,
        error::InfraError,
        mail::LogMailer,
        telemetry,
    },
    session::{SessionTokenManager, SystemClock},
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    let report = ErrorReport::from_error("quire::main", error);
    if dispatcher::has_been_set() {
        error!(source = report.source, error = %report.joined(), "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(source = report.source, error = %report.joined(), "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::internal(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match cli_args.command.unwrap_or(Command::Check) {
        Command::Migrate => run_migrate(&settings).await,
        Command::Check => run_check(&settings).await,
        Command::Token(args) => run_token(&settings, args.command).await,
    }
}

async fn run_migrate(settings: &config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(settings).await?;
    PostgresRepositories::run_migrations(repositories.pool())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;
    info!(target_module = "quire::main", "Migrations applied");
    Ok(())
}

async fn run_check(settings: &config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(settings).await?;
    repositories
        .health_check()
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    let cache = build_cache(&settings.cache)?;
    health_check(cache.as_ref()).await?;

    let context = ApplicationContext::build(
        Repositories::postgres(repositories),
        cache,
        Arc::new(LogMailer),
        Arc::new(SystemClock),
        settings,
    )?;
    let categories = context
        .category_cache
        .sum()
        .await
        .map_err(|err| AppError::from_repo("category", err))?;

    info!(
        target_module = "quire::main",
        server = %settings.server.name,
        categories,
        revocation_check = settings.session.revocation_check.as_str(),
        "Database and cache are reachable"
    );
    Ok(())
}

async fn run_token(settings: &config::Settings, command: TokenCommand) -> Result<(), AppError> {
    let cache: Arc<dyn KeyValueCache> = build_cache(&settings.cache)?;
    let sessions =
        SessionTokenManager::with_system_clock(&settings.session, &settings.server.name, cache)?;

    match command {
        TokenCommand::Issue { subject, role } => {
            let token = sessions.create(subject, role.into())?;
            println!("{token}");
        }
        TokenCommand::Inspect { token } => {
            let claims = sessions.validate(&token).await?;
            let rendered = serde_json::to_string_pretty(&claims)
                .map_err(|err| AppError::internal(err.to_string()))?;
            println!("{rendered}");
        }
        TokenCommand::Revoke { token } => {
            sessions.revoke(&token).await?;
            info!(
                target_module = "quire::main",
                set = sessions.revocation_set(),
                "Token revoked"
            );
        }
        TokenCommand::Prune => {
            let removed = sessions.prune().await?;
            info!(target_module = "quire::main", removed, "Revocation list pruned");
        }
    }
    Ok(())
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(
        database_url,
        settings.database.max_connections.get(),
        settings.database.acquire_timeout,
    )
    .await
    .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}
