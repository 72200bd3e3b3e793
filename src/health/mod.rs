//! Health check endpoints
//!
//! - GET /health - liveness (process is up)
//! - GET /ready - readiness (a feed is driving the engine)

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::watch;
use tracing::{debug, info};
use warp::Filter;

use crate::engine::handle::AnalyticsEngine;
use crate::feed::controller::FeedState;

/// Health check server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 9876,
        }
    }
}

/// What the health checks inspect
#[derive(Clone)]
pub struct HealthDependencies {
    pub engine: AnalyticsEngine,
    pub feed_state: watch::Receiver<FeedState>,
}

/// Readiness body and whether the service is ready
pub async fn readiness_report(dependencies: &HealthDependencies) -> (serde_json::Value, bool) {
    let feed_state = *dependencies.feed_state.borrow();
    let instruments = dependencies.engine.instruments().await;
    let subscribers = dependencies.engine.broadcaster().subscriber_count();

    let (feed, is_ready) = match feed_state {
        FeedState::Running(kind) => (json!({ "status": "running", "kind": kind }), true),
        FeedState::Idle => (json!({ "status": "idle" }), false),
    };

    let body = json!({
        "status": if is_ready { "ready" } else { "not_ready" },
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "checks": {
            "feed": feed,
            "instruments": instruments,
            "subscribers": subscribers,
            "advisory_enabled": dependencies.engine.advisory_enabled(),
        }
    });
    (body, is_ready)
}

/// Start the health check HTTP server
pub async fn start_health_server(
    config: HealthConfig,
    dependencies: HealthDependencies,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let deps = Arc::new(dependencies);

    let health = warp::path("health")
        .and(warp::get())
        .map(|| {
            debug!("Health check requested");
            warp::reply::with_status(
                warp::reply::json(&json!({
                    "status": "healthy",
                    "timestamp": chrono::Utc::now().to_rfc3339(),
                    "service": "analytics-feeder"
                })),
                warp::http::StatusCode::OK,
            )
        });

    let ready = warp::path("ready")
        .and(warp::get())
        .and_then(move || {
            let deps = Arc::clone(&deps);
            async move {
                let (body, is_ready) = readiness_report(&deps).await;
                let status = if is_ready {
                    warp::http::StatusCode::OK
                } else {
                    warp::http::StatusCode::SERVICE_UNAVAILABLE
                };
                Ok::<_, warp::Rejection>(warp::reply::with_status(warp::reply::json(&body), status))
            }
        });

    let routes = health.or(ready);

    info!("🏥 Starting health check server on port {}", config.port);

    warp::serve(routes)
        .run(([0, 0, 0, 0], config.port))
        .await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::structs::EngineConfig;
    use crate::feed::FeedKind;

    #[tokio::test]
    async fn test_readiness_follows_feed_state() {
        let (engine, _advisory) = AnalyticsEngine::new(EngineConfig::default());
        let (state_tx, feed_state) = watch::channel(FeedState::Idle);
        let deps = HealthDependencies { engine, feed_state };

        let (body, ready) = readiness_report(&deps).await;
        assert!(!ready);
        assert_eq!(body["status"], "not_ready");
        assert_eq!(body["checks"]["feed"]["status"], "idle");

        state_tx.send_replace(FeedState::Running(FeedKind::Simulated));
        let (body, ready) = readiness_report(&deps).await;
        assert!(ready);
        assert_eq!(body["checks"]["feed"]["kind"], "simulated");
    }

    #[tokio::test]
    async fn test_not_ready_once_live_feed_gives_up() {
        use crate::feed::{FeedController, LiveFeedConfig, SimulatorConfig};

        let (engine, _advisory) = AnalyticsEngine::new(EngineConfig::default());
        let live = LiveFeedConfig {
            base_url: "ws://127.0.0.1:1".to_string(),
            symbols: vec!["BTCUSDT".to_string()],
            reconnect_delay_secs: 0,
            max_reconnect_attempts: 1,
        };
        let mut controller = FeedController::new(engine.clone(), SimulatorConfig::default(), Some(live));
        let deps = HealthDependencies { engine, feed_state: controller.watch_state() };

        controller.start(FeedKind::Live).await.unwrap();
        let mut state = controller.watch_state();
        tokio::time::timeout(std::time::Duration::from_secs(5), state.wait_for(|s| *s == FeedState::Idle))
            .await
            .unwrap()
            .unwrap();

        let (body, ready) = readiness_report(&deps).await;
        assert!(!ready);
        assert_eq!(body["status"], "not_ready");
    }

    #[test]
    fn test_default_port() {
        assert_eq!(HealthConfig::default().port, 9876);
    }
}
