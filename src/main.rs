use std::path::Path;
use std::time::{Duration, Instant};

use analytics_feeder::analytics::AdvisoryRequest;
use analytics_feeder::config::AppConfig;
use analytics_feeder::engine::AnalyticsEngine;
use analytics_feeder::feed::FeedController;
use analytics_feeder::health::{start_health_server, HealthDependencies};
use analytics_feeder::logging::{cleanup_old_logs, init_dual_logging, init_simple_logging};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

const CONFIG_PATH: &str = "config.toml";
const STATS_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() {
    let config = match AppConfig::load(CONFIG_PATH) {
        Ok(config) => {
            // Simple print until logging is initialized
            println!("✅ Loaded configuration from {}", CONFIG_PATH);
            config
        }
        Err(e) => {
            println!("⚠️ Failed to load {}: {}. Using default configuration", CONFIG_PATH, e);
            AppConfig::default()
        }
    };

    let _logging_guard = match init_dual_logging(&config.logging) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("❌ Failed to initialize logging system: {}", e);
            if let Err(e) = init_simple_logging(&config.logging.level_filter) {
                eprintln!("❌ Console logging unavailable: {}", e);
            }
            None
        }
    };

    if let Err(e) = cleanup_old_logs(Path::new(&config.logging.log_dir), config.logging.retention_days) {
        warn!("⚠️ Failed to clean up old log files: {}", e);
    }

    info!(
        feed = %config.application.feed,
        symbols = ?config.application.symbols,
        bin_count = config.volume_profile.bin_count,
        trade_window = config.order_flow.window_size,
        advisory = config.advisory.enabled,
        live_configured = config.live.is_some(),
        health_port = config.health.port,
        "🔧 System configuration"
    );
    info!("🚀 Starting Analytics Feeder");

    if let Err(e) = run(config).await {
        error!("💥 Analytics pipeline failed: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let startup = Instant::now();

    info!("🎭 PHASE 1: Creating analytics engine...");
    let (engine, advisory_rx) = AnalyticsEngine::new(config.engine_config());
    tokio::spawn(consume_advisory_requests(advisory_rx));
    info!("✅ PHASE 1 COMPLETE: Engine ready (advisory tap {})",
          if engine.advisory_enabled() { "enabled" } else { "disabled" });

    info!("📡 PHASE 2: Starting {} feed...", config.application.feed);
    let mut controller = FeedController::new(engine.clone(), config.simulator_config(), config.live_config());
    let started = controller.start(config.application.feed).await?;
    info!("✅ PHASE 2 COMPLETE: {} feed running", started);

    if config.health.enabled {
        info!("🏥 PHASE 3: Starting health server...");
        let deps = HealthDependencies {
            engine: engine.clone(),
            feed_state: controller.watch_state(),
        };
        let health_config = config.health.clone();
        tokio::spawn(async move {
            if let Err(e) = start_health_server(health_config, deps).await {
                error!("❌ Health server failed: {}", e);
            }
        });
    } else {
        info!("🚫 Health server disabled");
    }

    let stats_task = tokio::spawn(log_statistics(engine.clone()));
    info!("🎉 Startup completed in {:?}", startup.elapsed());

    tokio::signal::ctrl_c().await?;
    info!("🛑 Shutdown requested");

    stats_task.abort();
    if let Err(e) = controller.stop().await {
        warn!("⚠️ Feed stopped with error: {}", e);
    }
    engine.shutdown().await;
    info!("👋 Analytics Feeder stopped");
    Ok(())
}

/// Stand-in advisor: reports what an external signal generator would receive
async fn consume_advisory_requests(mut requests: mpsc::Receiver<AdvisoryRequest>) {
    while let Some(request) = requests.recv().await {
        info!(
            symbol = %request.symbol,
            close = request.candle.close,
            poc = request.current_profile.poc,
            vah = request.current_profile.vah,
            val = request.current_profile.val,
            cvd = request.order_flow.cvd,
            trend = %request.order_flow.cvd_trend,
            imbalance = request.order_flow.imbalance_ratio,
            notional = request.order_flow.total_notional(),
            lvn = request.current_profile.low_volume_nodes().count(),
            hvn = request.current_profile.high_volume_nodes().count(),
            "🧠 Advisory request"
        );
    }
    debug!("Advisory channel closed");
}

async fn log_statistics(engine: AnalyticsEngine) {
    let mut interval = tokio::time::interval(STATS_INTERVAL);
    interval.tick().await;
    loop {
        interval.tick().await;
        for symbol in engine.instruments().await {
            if let Some(stats) = engine.get_statistics(&symbol).await {
                info!(
                    symbol = %stats.symbol,
                    candles = stats.candles_ingested,
                    trades = stats.trades_ingested,
                    rejected = stats.rejected_events,
                    recomputes = stats.recomputes,
                    buffered_candles = stats.buffered_candles,
                    buffered_trades = stats.buffered_trades,
                    "📊 Instrument statistics"
                );
            }
        }
        debug!("Broadcast subscribers: {}", engine.broadcaster().subscriber_count());
    }
}
