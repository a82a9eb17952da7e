//! # Threads Binary
//!
//! The entry point that assembles the application based on compile-time features.

mod settings;

use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use threads_api::middleware::{cors_policy, standard_middleware};
use threads_api::{configure_routes, AppState};

use crate::settings::Settings;

// Feature-gated imports: the storage backend is chosen at compile time
#[cfg(feature = "db-sqlite")]
use threads_db_sqlite::SqliteThreadsRepo;

#[cfg(not(feature = "db-sqlite"))]
compile_error!("enable a storage backend feature, e.g. `db-sqlite`");

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let settings = Settings::load().context("failed to load settings")?;

    // 1. Initialize Database Implementation
    #[cfg(feature = "db-sqlite")]
    let repo = Arc::new(
        SqliteThreadsRepo::with_max_connections(&settings.database_url, settings.max_connections)
            .await
            .context("failed to open SQLite store")?,
    );

    // 2. One store serves all three ports
    let state = web::Data::new(AppState {
        threads: repo.clone(),
        communities: repo.clone(),
        users: repo,
    });

    log::info!("threads starting on http://{}:{}", settings.host, settings.port);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(standard_middleware())
            .wrap(cors_policy())
            .configure(configure_routes)
    })
    .bind(settings.bind_addr())?
    .run()
    .await?;

    Ok(())
}
