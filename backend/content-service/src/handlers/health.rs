/// Health probes - liveness, summary and per-component readiness
use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::cache::RelatedResultCache;
use crate::db::ContentRepository;

pub struct HealthState {
    repo: Arc<dyn ContentRepository>,
    cache: Option<Arc<dyn RelatedResultCache>>,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Serialize)]
pub struct ComponentCheck {
    status: ComponentStatus,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    latency_ms: Option<u64>,
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    ready: bool,
    status: ComponentStatus,
    checks: HashMap<String, ComponentCheck>,
    timestamp: String,
}

impl HealthState {
    pub fn new(
        repo: Arc<dyn ContentRepository>,
        cache: Option<Arc<dyn RelatedResultCache>>,
    ) -> Self {
        Self { repo, cache }
    }
}

pub async fn health_summary(state: web::Data<HealthState>) -> HttpResponse {
    match state.repo.ping().await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "status": "ok",
            "service": "content-service",
            "version": env!("CARGO_PKG_VERSION")
        })),
        Err(e) => HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "status": "unhealthy",
            "error": format!("PostgreSQL connection failed: {}", e),
            "service": "content-service"
        })),
    }
}

pub async fn readiness_summary(state: web::Data<HealthState>) -> HttpResponse {
    let mut checks = HashMap::new();
    let mut ready = true;

    let start = Instant::now();
    let pg_result = state.repo.ping().await;
    let pg_latency = Some(start.elapsed().as_millis() as u64);
    let postgres_check = match pg_result {
        Ok(_) => ComponentCheck {
            status: ComponentStatus::Healthy,
            message: "PostgreSQL connection successful".to_string(),
            latency_ms: pg_latency,
        },
        Err(e) => {
            ready = false;
            ComponentCheck {
                status: ComponentStatus::Unhealthy,
                message: format!("PostgreSQL connection failed: {}", e),
                latency_ms: pg_latency,
            }
        }
    };
    checks.insert("postgresql".to_string(), postgres_check);

    // The cache is optional; a failing Redis degrades but does not block traffic.
    let mut degraded = false;
    if let Some(cache) = &state.cache {
        let start = Instant::now();
        let redis_result = cache.ping().await;
        let redis_latency = Some(start.elapsed().as_millis() as u64);
        let redis_check = match redis_result {
            Ok(_) => ComponentCheck {
                status: ComponentStatus::Healthy,
                message: "Redis ping successful".to_string(),
                latency_ms: redis_latency,
            },
            Err(e) => {
                degraded = true;
                ComponentCheck {
                    status: ComponentStatus::Degraded,
                    message: format!("Redis ping failed: {}", e),
                    latency_ms: redis_latency,
                }
            }
        };
        checks.insert("redis".to_string(), redis_check);
    }

    let status = match (ready, degraded) {
        (false, _) => ComponentStatus::Unhealthy,
        (true, true) => ComponentStatus::Degraded,
        (true, false) => ComponentStatus::Healthy,
    };

    let response = ReadinessResponse {
        ready,
        status,
        checks,
        timestamp: Utc::now().to_rfc3339(),
    };

    if ready {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}

pub async fn liveness_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"alive": true}))
}
