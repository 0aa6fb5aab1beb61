mod config;
mod error;
mod handlers;
mod models;
mod services;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::fmt::Debug;
use std::sync::Arc;

use config::Config;
use services::{AnalysisService, CacheBackend, CompletionService, DatasetStore, MemoryCacheService, OpenAIService};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("🚀 Starting Data Insight API");

    let config = Config::from_env()?;

    log::info!("🤖 Model-backed strategies enabled: {}", config.ai_enabled());
    let completion = OpenAIService::new(&config)?.map(|service| Arc::new(service) as Arc<dyn CompletionService>);

    #[cfg(feature = "external-services")]
    {
        if let Some(redis_url) = config.redis_url.clone() {
            log::info!("🔌 Using Redis cache at {}", redis_url);
            let redis_service = services::RedisService::new(&redis_url)?;
            return serve(config, redis_service, completion).await;
        }
    }

    if config.redis_url.is_some() && !cfg!(feature = "external-services") {
        log::warn!("⚠️ REDIS_URL is set but the external-services feature is disabled, using the in-memory cache");
    }
    log::info!("💾 Using in-memory cache");
    serve(config, MemoryCacheService::new(), completion).await
}

async fn serve<C>(config: Config, backend: C, completion: Option<Arc<dyn CompletionService>>) -> anyhow::Result<()>
where
    C: CacheBackend + Clone + Debug,
{
    let store = web::Data::new(DatasetStore::new());
    let analysis = web::Data::new(AnalysisService::from_config(&config, backend, completion));
    let port = config.server_port;
    let config = web::Data::new(config);

    log::info!("🌐 Starting server at http://127.0.0.1:{}", port);

    HttpServer::new(move || {
        let cors = config
            .allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allow_any_method()
            .allow_any_header()
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(store.clone())
            .app_data(analysis.clone())
            .app_data(config.clone())
            .app_data(web::JsonConfig::default().limit(1024 * 1024))
            .configure(handlers::configure::<C>)
    })
    .bind(("127.0.0.1", port))
    .map_err(|e| {
        log::error!("❌ Failed to bind to port {}: {}", port, e);
        e
    })?
    .run()
    .await?;

    Ok(())
}
