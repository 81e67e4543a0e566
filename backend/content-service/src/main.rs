use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpResponse, HttpServer};
use content_service::cache::{RelatedCache, RelatedResultCache};
use content_service::db::{self, ContentRepository, PgContentRepository};
use content_service::handlers::{self, HealthState, RelatedHandlerState};
use content_service::openapi::ApiDoc;
use content_service::services::RelatedPostsService;
use std::io;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

async fn openapi_json(doc: web::Data<utoipa::openapi::OpenApi>) -> actix_web::Result<HttpResponse> {
    let body = serde_json::to_string(&*doc).map_err(|e| {
        tracing::error!("OpenAPI serialization failed: {}", e);
        actix_web::error::ErrorInternalServerError("OpenAPI serialization error")
    })?;

    Ok(HttpResponse::Ok()
        .content_type("application/json")
        .body(body))
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate =
            signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = terminate.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,actix_web=info,sqlx=warn".into());
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

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

/// Content Service
///
/// Serves published blog content for the Wayfarer Journal site.
///
/// # Routes
///
/// - `GET /api/v1/posts/{slug}/related` - related posts for a published post
/// - `GET /api/v1/health[/ready|/live]` - health probes
/// - `GET /metrics` - Prometheus metrics
/// - `GET /api/v1/openapi.json`, `/swagger-ui/` - API documentation
///
/// Runs on port 8081 unless CONTENT_SERVICE_PORT says otherwise.
#[actix_web::main]
async fn main() -> io::Result<()> {
    // Container healthchecks: `content-service healthcheck` (or `healthcheck-http`)
    {
        let mut args = std::env::args();
        let _bin = args.next();
        if let Some(cmd) = args.next() {
            if cmd == "healthcheck" || cmd == "healthcheck-http" {
                let port = std::env::var("CONTENT_SERVICE_PORT").unwrap_or_else(|_| "8081".into());
                let url = format!("http://127.0.0.1:{}/api/v1/health", port);
                match reqwest::Client::new().get(&url).send().await {
                    Ok(resp) if resp.status().is_success() => return Ok(()),
                    Ok(resp) => {
                        eprintln!("healthcheck HTTP status: {}", resp.status());
                        return Err(io::Error::new(io::ErrorKind::Other, "healthcheck failed"));
                    }
                    Err(e) => {
                        eprintln!("healthcheck HTTP error: {}", e);
                        return Err(io::Error::new(io::ErrorKind::Other, "healthcheck error"));
                    }
                }
            }
        }
    }

    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("WARN: failed to read .env file: {}", e);
        }
    }

    init_tracing();

    let config = match content_service::Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Configuration loading failed: {:#}", e);
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Starting content-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app.env);

    let db_pool = match db::create_pool(&config.database).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Database pool creation failed: {:#}", e);
            eprintln!("ERROR: Failed to create database pool: {}", e);
            std::process::exit(1);
        }
    };

    if config.database.run_migrations {
        db::run_migrations(&db_pool).await.map_err(|e| {
            io::Error::new(
                io::ErrorKind::Other,
                format!("Failed to run database migrations: {e}"),
            )
        })?;
    }

    let related_cache = match &config.cache {
        Some(cache_cfg) => {
            match RelatedCache::connect(&cache_cfg.url, config.related.cache_ttl_secs).await {
                Ok(cache) => {
                    tracing::info!("Related-posts cache enabled");
                    Some(Arc::new(cache) as Arc<dyn RelatedResultCache>)
                }
                Err(e) => {
                    tracing::warn!("Redis unavailable, related-posts cache disabled: {}", e);
                    None
                }
            }
        }
        None => {
            tracing::info!("REDIS_URL not set; related-posts cache disabled");
            None
        }
    };

    let repo: Arc<dyn ContentRepository> = Arc::new(PgContentRepository::new(db_pool));

    let mut related = RelatedPostsService::new(repo.clone(), &config.related);
    if let Some(cache) = &related_cache {
        related = related.with_cache(cache.clone());
    }

    let related_state = web::Data::new(RelatedHandlerState {
        related: Arc::new(related),
        default_limit: config.related.default_limit,
        max_limit: config.related.max_limit,
    });
    let health_state = web::Data::new(HealthState::new(repo.clone(), related_cache.clone()));

    let http_bind_address = format!("{}:{}", config.app.host, config.app.port);
    tracing::info!("Starting HTTP server at {}", http_bind_address);

    let allowed_origins = config.cors.allowed_origins.clone();
    let server = HttpServer::new(move || {
        let mut cors = Cors::default();
        for origin in allowed_origins.split(',') {
            let origin = origin.trim();
            if origin == "*" {
                cors = cors.allow_any_origin();
            } else if !origin.is_empty() {
                cors = cors.allowed_origin(origin);
            }
        }
        cors = cors
            .allowed_methods(vec!["GET", "OPTIONS"])
            .allow_any_header()
            .max_age(3600);

        let openapi_doc = ApiDoc::openapi();

        App::new()
            .app_data(web::Data::new(openapi_doc.clone()))
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url(ApiDoc::openapi_json_path(), openapi_doc.clone()),
            )
            .route(ApiDoc::openapi_json_path(), web::get().to(openapi_json))
            .app_data(related_state.clone())
            .app_data(health_state.clone())
            .wrap(cors)
            .wrap(Logger::default())
            .wrap(tracing_actix_web::TracingLogger::default())
            .route(
                "/metrics",
                web::get().to(content_service::metrics::serve_metrics),
            )
            .configure(handlers::configure_routes)
    })
    .bind(&http_bind_address)?
    .workers(4)
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let result = tokio::select! {
        joined = server_task => match joined {
            Ok(res) => res,
            Err(e) => Err(io::Error::new(io::ErrorKind::Other, e.to_string())),
        },
        _ = &mut shutdown => {
            tracing::info!("Shutdown signal received");
            server_handle.stop(true).await;
            Ok(())
        }
    };

    tracing::info!("Content-service shutting down");
    result
}
