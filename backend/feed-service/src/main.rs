use actix_web::{dev::Service, web, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use std::io;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use feed_cache::{CacheStore, FeedCache, MemoryStore, RedisStore};
use feed_service::config::{Config, KafkaConfig, RedisConfig};
use feed_service::db::{
    ClickHouseTimeline, PgContentRepository, PgGraphRepository, PgUserRepository, MIGRATOR,
};
use feed_service::handlers::{self, AppState};
use feed_service::jobs::CacheWarmerConfig;
use feed_service::services::{
    ContentSource, EngagementService, FeedService, KafkaNotifier, NoopNotifier,
    NotificationSender, SocialGraph,
};

async fn build_cache_store(config: &RedisConfig) -> Arc<dyn CacheStore> {
    let Some(url) = config.url.as_deref() else {
        info!("REDIS_URL not set, caching in process memory");
        return Arc::new(MemoryStore::new());
    };

    let connected = match RedisStore::connect(url).await {
        Ok(store) => store.ping().await.map(|()| store),
        Err(e) => Err(e),
    };

    match connected {
        Ok(store) => {
            info!("Redis cache store connected");
            Arc::new(store)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Redis unavailable, caching in process memory");
            Arc::new(MemoryStore::new())
        }
    }
}

fn build_notifier(config: &KafkaConfig) -> Arc<dyn NotificationSender> {
    let Some(brokers) = config.brokers.as_deref() else {
        info!("KAFKA_BROKERS not set, notifications disabled");
        return Arc::new(NoopNotifier);
    };

    match KafkaNotifier::new(brokers, &config.notification_topic) {
        Ok(notifier) => Arc::new(notifier),
        Err(e) => {
            tracing::warn!(error = %e, "Kafka producer unavailable, notifications disabled");
            Arc::new(NoopNotifier)
        }
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_file(true)
                .with_target(true),
        )
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Configuration loading failed: {:#}", e);
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Starting feed-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app.env);

    let db_pool = match PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Database pool creation failed: {:#}", e);
            eprintln!("ERROR: Failed to create database pool: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = MIGRATOR.run(&db_pool).await {
        tracing::error!("Database migration failed: {:#}", e);
        eprintln!("ERROR: Failed to run migrations: {}", e);
        std::process::exit(1);
    }

    let users = Arc::new(PgUserRepository::new(db_pool.clone()));
    let graph = SocialGraph::new(Arc::new(PgGraphRepository::new(db_pool.clone())));
    let content_repo = Arc::new(PgContentRepository::new(db_pool.clone()));

    let mut content = ContentSource::new(content_repo.clone());
    match ClickHouseTimeline::from_config(&config.timeline) {
        Some(timeline) => {
            info!(database = %config.timeline.database, "ClickHouse timeline enabled");
            content = content.with_timeline(Arc::new(timeline));
        }
        None => info!("TIMELINE_CLICKHOUSE_URL not set, personal pools read from Postgres"),
    }

    let cache = FeedCache::new(build_cache_store(&config.redis).await);
    let notifier = build_notifier(&config.kafka);

    let feed = Arc::new(FeedService::new(
        users.clone(),
        graph,
        content,
        cache.clone(),
        config.feed.clone(),
    ));
    let engagement = Arc::new(EngagementService::new(
        users.clone(),
        content_repo,
        cache,
        notifier,
    ));

    let state = web::Data::new(AppState {
        feed,
        engagement,
        users,
        warmer: CacheWarmerConfig::from_feed_config(&config.feed),
    });

    let bind_addr = format!("{}:{}", config.app.host, config.app.port);
    info!("HTTP server listening on {}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .route("/health", web::get().to(|| async { "OK" }))
            .route("/metrics", web::get().to(feed_service::metrics::serve_metrics))
            .wrap_fn(|req, srv| {
                let method = req.method().to_string();
                let path = req
                    .match_pattern()
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| req.path().to_string());
                let start = Instant::now();

                let fut = srv.call(req);
                async move {
                    match fut.await {
                        Ok(res) => {
                            feed_service::metrics::observe_http_request(
                                &method,
                                &path,
                                res.status().as_u16(),
                                start.elapsed(),
                            );
                            Ok(res)
                        }
                        Err(err) => {
                            feed_service::metrics::observe_http_request(
                                &method,
                                &path,
                                500,
                                start.elapsed(),
                            );
                            Err(err)
                        }
                    }
                }
            })
            .configure(handlers::configure)
    })
    .bind(bind_addr)?
    .run()
    .await
}
