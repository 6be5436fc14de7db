//! Curriculum Engine server binary.

use std::error::Error;
use std::sync::Arc;

use tokio::sync::watch;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use curriculum_engine::adapters::http::{build_app_router, CurriculumAppState};
use curriculum_engine::adapters::postgres::{
    self, PostgresAssignmentRepository, PostgresDefinitionStore, PostgresEnrollmentBridge,
};
use curriculum_engine::adapters::{
    profile_channel, AssignmentAuditLog, InMemoryEventBus, ProfileEventDispatcher, RetryPolicy,
    SweepScheduler, SweepSchedulerConfig, SystemClock,
};
use curriculum_engine::application::{
    CurriculumResolver, DeleteDefinitionHandler, EnrollmentSettings, GetCurriculumTreeHandler,
    ProfileEventAdapter, ProgressionOperator, SweepTask,
};
use curriculum_engine::config::{AppConfig, LogConfig, ValidationError};
use curriculum_engine::ports::{
    AssignmentRepository, Clock, DefinitionReader, DefinitionRepository, EventPublisher,
    EventSubscriber,
};

/// Recent events kept by the in-process bus.
const EVENT_HISTORY: usize = 1024;

fn init_tracing(log: &LogConfig, production: bool) -> Result<(), ValidationError> {
    let registry = tracing_subscriber::registry().with(log.env_filter()?);
    if log.json || production {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    // --- Configuration ---
    let config = AppConfig::load()?;
    config.validate()?;
    init_tracing(&config.log, config.is_production())?;
    tracing::info!(
        environment = ?config.server.environment,
        port = config.server.port,
        "Loaded configuration"
    );

    // --- Database ---
    let pool = postgres::connect(&config.database).await?;
    tracing::info!("Database connection pool created");
    if config.database.run_migrations {
        postgres::run_migrations(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    // --- Stores ---
    let definition_store = Arc::new(PostgresDefinitionStore::new(pool.clone()));
    let definitions: Arc<dyn DefinitionReader> = definition_store.clone();
    let definition_repo: Arc<dyn DefinitionRepository> = definition_store;
    let assignments: Arc<dyn AssignmentRepository> =
        Arc::new(PostgresAssignmentRepository::new(pool.clone()));
    let enrollment = Arc::new(PostgresEnrollmentBridge::new(pool, config.enrollment.enabled));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // --- Event bus ---
    let event_bus = Arc::new(InMemoryEventBus::with_history_limit(EVENT_HISTORY));
    event_bus.subscribe_all(AssignmentAuditLog::EVENT_TYPES, Arc::new(AssignmentAuditLog::new()));
    let publisher: Arc<dyn EventPublisher> = event_bus;

    // --- Application ---
    let resolver = Arc::new(CurriculumResolver::new(definitions.clone(), assignments.clone()));
    let operator = Arc::new(ProgressionOperator::new(
        definitions.clone(),
        assignments.clone(),
        enrollment,
        publisher,
        resolver.clone(),
        EnrollmentSettings {
            channel: config.enrollment.channel.clone(),
            role: config.enrollment.role.clone(),
        },
    ));
    let sweep = Arc::new(SweepTask::new(
        resolver.clone(),
        operator.clone(),
        assignments.clone(),
        clock.clone(),
    ));

    // --- Background tasks ---
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let profile_config = &config.profile_events;
    let dispatcher = ProfileEventDispatcher::new()
        .register(Arc::new(ProfileEventAdapter::new(
            assignments.clone(),
            operator,
            clock.clone(),
        )))
        .with_retry(
            RetryPolicy::default()
                .with_max_attempts(profile_config.retry_attempts)
                .with_initial_backoff(profile_config.retry_backoff())
                .with_max_backoff(profile_config.retry_max_backoff()),
        );
    tracing::info!(
        handlers = dispatcher.handler_count(),
        queue_capacity = profile_config.queue_capacity,
        retry_attempts = profile_config.retry_attempts,
        "Profile event dispatcher ready"
    );
    let (profile_events, profile_worker) =
        profile_channel(profile_config.queue_capacity, Arc::new(dispatcher));
    let worker_handle = tokio::spawn(profile_worker.run(shutdown_rx.clone()));

    let scheduler_handle = if config.sweep.enabled {
        let scheduler = SweepScheduler::new(
            sweep.clone(),
            SweepSchedulerConfig::default()
                .with_interval(config.sweep.interval())
                .with_run_on_start(config.sweep.run_on_start),
        );
        let shutdown = shutdown_rx.clone();
        Some(tokio::spawn(async move { scheduler.run(shutdown).await }))
    } else {
        tracing::info!("Sweep scheduler disabled");
        None
    };

    // --- HTTP ---
    let state = CurriculumAppState {
        resolver,
        definitions: definitions.clone(),
        sweep,
        profile_events,
        tree_handler: Arc::new(GetCurriculumTreeHandler::new(definitions.clone(), clock.clone())),
        delete_handler: Arc::new(DeleteDefinitionHandler::new(
            definitions,
            definition_repo,
            assignments,
        )),
        clock,
    };
    let app = build_app_router(state, config.server.request_timeout());

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Curriculum engine listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown signal received");
        })
        .await?;

    // --- Drain ---
    let _ = shutdown_tx.send(true);
    match worker_handle.await {
        Ok(processed) => tracing::info!(processed, "Profile event worker stopped"),
        Err(err) => tracing::error!(error = %err, "Profile event worker panicked"),
    }
    if let Some(handle) = scheduler_handle {
        match handle.await {
            Ok(sweeps) => tracing::info!(sweeps, "Sweep scheduler stopped"),
            Err(err) => tracing::error!(error = %err, "Sweep scheduler panicked"),
        }
    }

    Ok(())
}
