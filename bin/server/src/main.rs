use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wicara_ai::{FileStore, GeminiClient};
use wicara_engine::{Dispatcher, ObserverHub, Orchestrator, OrchestratorConfig};
use wicara_server::config::ServerConfig;
use wicara_server::db::{ConversationRepository, SqlxQueryExecutor};
use wicara_server::routes::{router, AppState};
use wicara_server::wa::WhatsAppClient;
use wicara_tools::{
    CommandSnapshotSource, ServiceControlTool, SnapshotTool, StaffLookupTool, StudentLookupTool,
    TableInsertTool, TableUpdateTool, ToolHandler, ToolRegistry,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env().expect("failed to load configuration");
    tracing::info!("Loaded configuration");

    // Create database connection pool
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("failed to run migrations");

    let gemini = Arc::new(GeminiClient::new(
        config.gemini.api_key.clone(),
        config.gemini.model.clone(),
    ));
    let store = Arc::new(ConversationRepository::new(db_pool.clone()));
    let executor = Arc::new(SqlxQueryExecutor::new(db_pool.clone()));

    let snapshot_source = Arc::new(CommandSnapshotSource::new(
        config.engine.snapshot_command.clone(),
        Vec::new(),
    ));
    let registry = Arc::new(
        ToolRegistry::new()
            .with_group(vec![
                Arc::new(StaffLookupTool::new(executor.clone())) as Arc<dyn ToolHandler>,
                Arc::new(StudentLookupTool::new(executor.clone())),
                Arc::new(TableUpdateTool::new(executor.clone())),
                Arc::new(TableInsertTool::new(executor.clone())),
            ])
            .with_group(vec![
                Arc::new(ServiceControlTool::new(config.engine.cctv_service.clone()))
                    as Arc<dyn ToolHandler>,
                Arc::new(SnapshotTool::new(
                    snapshot_source,
                    gemini.clone() as Arc<dyn FileStore>,
                )),
            ]),
    );

    let whatsapp = Arc::new(WhatsAppClient::new(
        config.whatsapp.clone(),
        gemini.clone() as Arc<dyn FileStore>,
    ));
    let hub = ObserverHub::new();

    let orchestrator_config = OrchestratorConfig::new(config.engine.system_instruction.clone());
    let apology = orchestrator_config.apology.clone();
    let orchestrator = Arc::new(Orchestrator::new(
        gemini,
        registry,
        store.clone(),
        whatsapp.clone(),
        orchestrator_config,
    ));
    let dispatcher = Arc::new(Dispatcher::new(
        store.clone(),
        orchestrator,
        whatsapp.clone(),
        whatsapp,
        hub.clone(),
        apology,
    ));

    let state = AppState {
        dispatcher,
        store,
        hub,
        verify_token: config.whatsapp.verify_token.clone(),
    };
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .expect("failed to bind listener");
    tracing::info!(addr = %config.listen_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await
        .expect("server error");
}
