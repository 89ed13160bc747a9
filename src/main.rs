use std::{process, sync::Arc, time::Duration};

use bytes::Bytes;
use openmusic::{
    application::{context::CatalogContext, error::AppError},
    cache::{self, CacheBackendKind, CacheConfig, KeyValueCache, Lookup, RedisStore},
    config,
    infra::{
        db::{ApalisPublisher, PostgresRepositories},
        error::InfraError,
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

const HEALTH_PROBE_KEY: &str = "openmusic:health-probe";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    let report = error.report();
    if dispatcher::has_been_set() {
        error!(status = report.status, chain = ?report.messages, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(status = report.status, chain = ?report.messages, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli().map_err(|err| {
        InfraError::configuration(format!("failed to load configuration: {err}"))
    })?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Check(config::CheckArgs::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Migrate(_) => run_migrate(&settings).await,
        config::Command::Check(_) => run_check(&settings).await,
        config::Command::Export(args) => run_export(&settings, args).await,
    }
}

async fn run_migrate(settings: &config::Settings) -> Result<(), AppError> {
    let repositories = connect_repositories(settings).await?;
    PostgresRepositories::run_migrations(repositories.pool())
        .await
        .map_err(|err| InfraError::database(err.to_string()))?;
    info!("migrations applied");
    Ok(())
}

async fn run_check(settings: &config::Settings) -> Result<(), AppError> {
    if settings.database.url.is_some() {
        let repositories = connect_repositories(settings).await?;
        repositories
            .health_check()
            .await
            .map_err(|err| InfraError::database(err.to_string()))?;
        info!("database reachable");
    } else {
        info!("database url not configured; skipping database probe");
    }

    let cache_config = CacheConfig::from(&settings.cache);
    if let (CacheBackendKind::Redis, Some(url)) =
        (cache_config.backend, cache_config.redis_url.as_deref())
    {
        RedisStore::connect(url, cache_config.pool_size)
            .map_err(InfraError::from)?
            .ping()
            .await
            .map_err(InfraError::from)?;
    }
    let store = cache::build_store(&cache_config).map_err(InfraError::from)?;
    probe_store(store.as_ref()).await?;
    info!(backend = ?cache_config.backend, "cache reachable");
    Ok(())
}

async fn run_export(settings: &config::Settings, args: config::ExportArgs) -> Result<(), AppError> {
    let repositories = Arc::new(connect_repositories(settings).await?);
    let publisher = Arc::new(ApalisPublisher::new(repositories.as_ref().clone()));

    let cache_config = CacheConfig::from(&settings.cache);
    let store = cache::build_store(&cache_config).map_err(InfraError::from)?;

    let context = CatalogContext::new(
        repositories,
        store,
        cache_config.default_ttl,
        publisher,
        settings.exports.topic.clone(),
    );

    context
        .exports
        .request_export(&args.principal, &args.playlist, &args.target_email)
        .await?;
    info!(playlist_id = %args.playlist, "export requested");
    Ok(())
}

async fn connect_repositories(
    settings: &config::Settings,
) -> Result<PostgresRepositories, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| InfraError::database(err.to_string()))?;

    Ok(PostgresRepositories::new(pool))
}

/// Write, read back and delete a probe key.
async fn probe_store(store: &dyn KeyValueCache) -> Result<(), AppError> {
    let payload = Bytes::from_static(b"ok");
    store
        .set(HEALTH_PROBE_KEY, payload.clone(), Duration::from_secs(5))
        .await
        .map_err(InfraError::from)?;
    let lookup = store
        .get(HEALTH_PROBE_KEY)
        .await
        .map_err(InfraError::from)?;
    store
        .delete(HEALTH_PROBE_KEY)
        .await
        .map_err(InfraError::from)?;

    match lookup {
        Lookup::Hit(bytes) if bytes == payload => Ok(()),
        // The disabled backend never stores anything.
        Lookup::Miss => Ok(()),
        Lookup::Hit(_) => Err(InfraError::from(cache::CacheError::unavailable(
            "health probe read back a different value",
        ))
        .into()),
    }
}
