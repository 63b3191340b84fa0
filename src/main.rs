mod auth;
mod chime;
mod db;
mod filters;
mod finance;
mod images;
mod models;
mod routes;
mod schedule;
mod sound;
mod state;
mod templates;

use actix_files::Files;
use actix_web::{middleware, web, App, HttpServer};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::env;
use std::str::FromStr;
use tokio::sync::broadcast;

use crate::chime::SharedStamp;
use crate::sound::SoundCache;
use crate::state::{
    AdminCredentials, AppState, ChimeConfig, ImageHostConfig, DEFAULT_ADMIN_EMAIL,
    DEFAULT_ADMIN_PASSWORD,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(err) = run().await {
        eprintln!("Startup error: {err}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .init();

    let db_url = env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://./data/navalha.db".to_string());
    db::ensure_sqlite_dir(&db_url)?;

    let connect_options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(connect_options)
        .await?;

    db::run_migrations(&pool).await?;
    db::seed_defaults(&pool).await?;

    let admin = AdminCredentials {
        email: env::var("ADMIN_EMAIL").unwrap_or_else(|_| DEFAULT_ADMIN_EMAIL.to_string()),
        password: env::var("ADMIN_PASSWORD").unwrap_or_else(|_| DEFAULT_ADMIN_PASSWORD.to_string()),
    };
    if admin.is_default() {
        log::warn!("Running with the built-in admin credentials; set ADMIN_EMAIL and ADMIN_PASSWORD.");
    }

    let defaults = ChimeConfig::default();
    let chime = ChimeConfig {
        coalesce_ms: env_i64("CHIME_COALESCE_MS", defaults.coalesce_ms),
        suppress_ms: env_i64("CHIME_SUPPRESS_MS", defaults.suppress_ms),
    };

    let sound = SoundCache::new(env::var("CHIME_SOUND_URL").unwrap_or_default());
    {
        let sound = sound.clone();
        tokio::spawn(async move { sound.preload().await });
    }

    let images = ImageHostConfig {
        upload_url: env::var("IMAGE_UPLOAD_URL").unwrap_or_default(),
        api_key: env::var("IMAGE_UPLOAD_KEY").unwrap_or_default(),
    };

    let (events, _) = broadcast::channel(64);

    let state = AppState {
        db: pool.clone(),
        events,
        admin,
        chime,
        stamp: SharedStamp::default(),
        sound,
        images,
    };

    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(8080);

    let address = format!("0.0.0.0:{port}");
    log::info!("Starting Navalha on http://{address}");

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(middleware::Logger::default())
            .service(Files::new("/static", "./static").prefer_utf8(true))
            .configure(routes::public::configure)
            .configure(routes::admin::configure)
            .configure(routes::events::configure)
    })
    .bind(address)?
    .run()
    .await?;

    Ok(())
}

fn env_i64(key: &str, fallback: i64) -> i64 {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(fallback)
}
