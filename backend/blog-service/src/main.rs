use actix_cors::Cors;
use actix_web::{web, App, HttpResponse, HttpServer};
use anyhow::Context;
use blog_service::cache::CategoryCache;
use blog_service::handlers;
use blog_service::metrics::serve_metrics;
use blog_service::middleware::JwtAuth;
use blog_service::services::CategoryService;
use blog_service::store::PgStore;
use blog_service::Config;
use db_pool::{create_pool, DbConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

struct HealthState {
    db_pool: sqlx::PgPool,
}

async fn health_summary(state: web::Data<HealthState>) -> HttpResponse {
    match sqlx::query("SELECT 1").execute(&state.db_pool).await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "status": "ok",
            "service": "blog-service",
            "version": env!("CARGO_PKG_VERSION")
        })),
        Err(e) => {
            tracing::warn!(error = %e, "health check failed");
            HttpResponse::ServiceUnavailable().json(serde_json::json!({
                "status": "unhealthy",
                "error": "PostgreSQL connection failed",
                "service": "blog-service"
            }))
        }
    }
}

async fn liveness_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"alive": true}))
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,actix_web=info,sqlx=warn".into());

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Blog Service
///
/// # Routes
///
/// - `DELETE /api/v1/categories/{id}` - delete a category (admin only)
/// - `GET /api/v1/categories` - list categories
/// - `GET /api/v1/health`, `GET /api/v1/health/live` - health checks
/// - `GET /metrics` - Prometheus metrics
#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is normal outside development
    let _ = dotenvy::dotenv();

    let config = Config::from_env()
        .map_err(anyhow::Error::msg)
        .context("Failed to load configuration")?;

    init_tracing(config.app.json_logs);

    tracing::info!("Starting blog-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        env = %config.app.env,
        cascade_mode = config.categories.cascade_mode.as_str(),
        fallback_category = %config.categories.fallback_name,
        "Configuration loaded"
    );

    let jwt_auth = match &config.auth.jwt_public_key_pem {
        Some(pem) => JwtAuth::from_public_key_pem(pem).context("Invalid JWT_PUBLIC_KEY_PEM")?,
        None => {
            tracing::warn!(
                "JWT public key not configured; authenticated requests will be rejected"
            );
            JwtAuth::disabled()
        }
    };

    let mut db_cfg = DbConfig::for_service("blog-service", config.database.url.clone());
    if std::env::var("DB_MAX_CONNECTIONS").is_err() {
        db_cfg.max_connections = config.database.max_connections;
    }
    db_cfg.log_config();

    let db_pool = create_pool(db_cfg)
        .await
        .context("Failed to create database pool")?;

    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    let store = Arc::new(PgStore::new(
        db_pool.clone(),
        config.categories.fallback_name.clone(),
    ));
    let category_cache = Arc::new(CategoryCache::new(
        Duration::from_secs(config.categories.cache_ttl_secs),
        config.categories.cache_max_entries,
    ));
    let category_service = web::Data::new(
        CategoryService::new(store.clone(), store, &config.categories).with_cache(category_cache),
    );
    let health_state = web::Data::new(HealthState {
        db_pool: db_pool.clone(),
    });

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    tracing::info!("Starting HTTP server at {}", bind_address);

    let allowed_origins = config.cors.allowed_origins.clone();
    HttpServer::new(move || {
        let mut cors = Cors::default();
        for origin in allowed_origins.split(',') {
            let origin = origin.trim();
            if origin == "*" {
                cors = cors.allow_any_origin();
            } else if !origin.is_empty() {
                cors = cors.allowed_origin(origin);
            }
        }
        cors = cors.allow_any_method().allow_any_header().max_age(3600);

        App::new()
            .app_data(category_service.clone())
            .app_data(health_state.clone())
            .wrap(jwt_auth.clone())
            .wrap(cors)
            .wrap(TracingLogger::default())
            .route("/api/v1/health", web::get().to(health_summary))
            .route("/api/v1/health/live", web::get().to(liveness_check))
            .route("/metrics", web::get().to(serve_metrics))
            .configure(handlers::configure)
    })
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {}", bind_address))?
    .run()
    .await
    .context("HTTP server error")?;

    tracing::info!("blog-service stopped");
    Ok(())
}
