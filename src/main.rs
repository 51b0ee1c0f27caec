use actix_cors::Cors;
use actix_files::Files;
use actix_web::{middleware, web, App, HttpServer};
use chrono::Utc;
use clap::Parser;
use tera::Tera;
use tracing_subscriber::EnvFilter;

mod backup;
mod config;
mod error;
mod message_database;
mod routes;
mod storage;

use config::Config;
use message_database::MessageDatabase;
use routes::AppState;
use storage::JsonFileStorage;

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .init();
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config = Config::parse();
    init_logging(config.verbose);

    if let Some(backup_dir) = &config.backup_dir {
        backup::backup_data_file(&config.data_file, backup_dir, Utc::now())?;
    }

    let db = MessageDatabase::new(JsonFileStorage::new(&config.data_file), config.retention());
    if let Err(e) = db.ensure_initialized() {
        tracing::error!(error = %e, path = %config.data_file.display(), "could not initialize data file");
        ::std::process::exit(1);
    }

    let tera = match Tera::new(&config.templates_glob()) {
        Ok(t) => t,
        Err(e) => {
            tracing::error!(error = %e, "template parsing error");
            ::std::process::exit(1);
        }
    };

    tracing::info!(
        data_file = %config.data_file.display(),
        retention = ?db.retention(),
        "message store ready"
    );

    let app_data = web::Data::new(AppState {
        tera,
        db,
        poll_interval_ms: config.poll_interval_ms,
    });
    let static_dir = config.static_dir.clone();

    let (host, port) = config.bind_addr();
    tracing::info!("listening on http://{}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .wrap(Cors::permissive())
            .app_data(app_data.clone())
            .configure(routes::configure)
            .service(Files::new("/static", &static_dir))
    })
    .bind((host, port))?
    .run()
    .await
}
