use std::error::Error;
use std::sync::Arc;

use dotenvy::dotenv;

use expense_desk::{
    create_router,
    database::{create_database_pool, run_migrations},
    store::{MemoryStore, PgStore, Store},
    AppState, Config,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    env_logger::init();

    let config = Config::from_env()?;

    let store: Arc<dyn Store> = if config.uses_memory_store() {
        log::warn!("Using the in-memory store; data is lost on shutdown");
        Arc::new(MemoryStore::new())
    } else {
        let db = create_database_pool(&config.database_url).await?;
        run_migrations(&db).await?;
        Arc::new(PgStore::new(db))
    };

    if config.receipt_parser.is_none() {
        log::warn!("RECEIPT_PARSER_CMD is not set; receipt parse jobs will fail");
    }
    if config.expose_generated_passwords {
        log::warn!("EXPOSE_GENERATED_PASSWORDS is on; reset passwords are returned in responses");
    }

    let addr = format!("0.0.0.0:{}", config.port);
    let app = create_router(AppState::new(config, store));

    log::info!("expense-desk listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
