use std::time::Duration;

use tokio::time::timeout;

use analytics_feeder::analytics::BroadcastEvent;
use analytics_feeder::engine::{AnalyticsEngine, EngineConfig, EngineError};
use analytics_feeder::market::{Candle, MarketDataError, TradeSide};
use analytics_feeder::order_flow::structs::CvdTrend;
use analytics_feeder::timeframe::Timeframe;

mod fixtures;
use fixtures::{
    create_candle_series, create_sample_candle, create_sample_signal, create_sample_trade,
    create_test_engine_config, create_trade_series, BASE_TS, MINUTE,
};

async fn feed(engine: &AnalyticsEngine, symbol: &str, trades: usize, candles: usize) {
    for trade in create_trade_series(symbol, trades, 100.0) {
        engine.ingest_trade(symbol, trade).await.unwrap();
    }
    for candle in create_candle_series(symbol, candles, 100.0, 0.0) {
        engine.ingest_candle(symbol, candle).await.unwrap();
    }
}

/// Market updates start with the first candle that completes a profile
#[tokio::test]
async fn test_market_update_after_tenth_candle() {
    let (engine, _advisory) = AnalyticsEngine::new(create_test_engine_config());
    let mut subscription = engine.subscribe();
    let started = chrono::Utc::now().timestamp_millis();

    for trade in create_trade_series("BTCUSDT", 12, 100.0) {
        engine.ingest_trade("BTCUSDT", trade).await.unwrap();
    }

    let candles = create_candle_series("BTCUSDT", 10, 100.0, 0.0);
    for (i, candle) in candles.into_iter().enumerate() {
        let outcome = engine.ingest_candle("BTCUSDT", candle).await.unwrap();
        assert!(outcome.order_flow);
        if i < 9 {
            assert!(!outcome.current_profile, "profile before 10 candles");
            assert_eq!(outcome.delivered, 0);
        } else {
            assert!(outcome.current_profile);
            assert!(outcome.session_profile);
            assert_eq!(outcome.delivered, 1);
        }
    }

    let event = timeout(Duration::from_secs(1), subscription.recv())
        .await
        .expect("update timed out")
        .expect("subscription closed");
    let BroadcastEvent::MarketUpdate(update) = event else {
        panic!("expected a market update");
    };
    assert_eq!(update.symbol, "BTCUSDT");
    assert!(update.timestamp >= started);
    assert!(update.timestamp <= chrono::Utc::now().timestamp_millis());
    assert_eq!(update.latest_price, 100.5);
    assert!(update.volume_profile.levels.len() <= 20);
    assert!(update
        .volume_profile
        .levels
        .windows(2)
        .all(|pair| pair[0].price < pair[1].price));
    assert_eq!(update.order_flow.imbalance_ratio, 50.0);
    assert_eq!(update.order_flow.cvd, 0.0);

    let profile = engine.get_current_profile("BTCUSDT").unwrap();
    assert!((profile.total_volume - 100.0).abs() < 1e-6);
    assert!(profile.val <= profile.poc && profile.poc <= profile.vah);
    assert!(profile.poc >= 99.0 && profile.poc <= 101.0);
    assert!(engine.get_session_profile("BTCUSDT").is_some());
    assert!(subscription.try_recv().is_none());
}

#[tokio::test]
async fn test_history_and_recent_candles() {
    let (engine, _advisory) = AnalyticsEngine::new(create_test_engine_config());
    feed(&engine, "ETHUSDT", 0, 10).await;

    let recent = engine.get_recent_candles("ETHUSDT", 3).await;
    assert_eq!(recent.len(), 3);
    assert_eq!(recent[2].timestamp, BASE_TS + 9 * MINUTE);

    let five_minute = engine.get_history("ETHUSDT", Timeframe::FiveMinutes).await;
    assert_eq!(five_minute.len(), 2);
    assert_eq!(five_minute[0].timestamp, BASE_TS);
    assert_eq!(five_minute[1].timestamp, BASE_TS + 5 * MINUTE);
    assert_eq!(five_minute[0].volume, 50.0);
    assert_eq!(five_minute[0].open, 100.0);
    assert_eq!(five_minute[0].close, 100.5);

    assert_eq!(engine.get_history("ETHUSDT", Timeframe::OneMinute).await.len(), 10);
    assert!(engine.get_history("XRPUSDT", Timeframe::OneHour).await.is_empty());

    // Without trades there is no order flow and so no market update
    assert!(engine.get_order_flow("ETHUSDT").is_none());
}

#[tokio::test]
async fn test_malformed_events_rejected_at_boundary() {
    let (engine, _advisory) = AnalyticsEngine::new(create_test_engine_config());

    let inverted = Candle::new("BTCUSDT", BASE_TS, 100.0, 99.0, 101.0, 100.0, 10.0, 5.0);
    assert!(matches!(
        engine.ingest_candle("BTCUSDT", inverted).await,
        Err(EngineError::Rejected(MarketDataError::InvalidCandle(_)))
    ));

    let misrouted = create_sample_candle("ETHUSDT", 0, 100.0, 10.0);
    assert!(matches!(
        engine.ingest_candle("BTCUSDT", misrouted).await,
        Err(EngineError::Rejected(MarketDataError::SymbolMismatch { .. }))
    ));

    let zero_qty = create_sample_trade("BTCUSDT", 0, 100.0, 0.0, TradeSide::Buy);
    assert!(matches!(
        engine.ingest_trade("BTCUSDT", zero_qty).await,
        Err(EngineError::Rejected(_))
    ));

    let bad_symbol = create_sample_candle("btc-usd", 0, 100.0, 10.0);
    assert!(matches!(
        engine.ingest_candle("btc-usd", bad_symbol).await,
        Err(EngineError::Rejected(MarketDataError::InvalidSymbol(_)))
    ));
    assert!(!engine.instruments().await.contains(&"btc-usd".to_string()));

    let stats = engine.get_statistics("BTCUSDT").await.unwrap();
    assert_eq!(stats.rejected_events, 3);
    assert_eq!(stats.candles_ingested, 0);
    assert_eq!(stats.buffered_candles, 0);
    assert!(engine.get_recent_candles("BTCUSDT", 10).await.is_empty());
}

#[tokio::test]
async fn test_replayed_candles_not_double_counted() {
    let (engine, _advisory) = AnalyticsEngine::new(create_test_engine_config());
    feed(&engine, "BTCUSDT", 0, 10).await;

    let replay = create_sample_candle("BTCUSDT", 9, 100.0, 10.0);
    assert!(matches!(
        engine.ingest_candle("BTCUSDT", replay).await,
        Err(EngineError::Rejected(MarketDataError::OutOfOrder { .. }))
    ));
    let late = create_sample_candle("BTCUSDT", 2, 100.0, 10.0);
    assert!(matches!(
        engine.ingest_candle("BTCUSDT", late).await,
        Err(EngineError::Rejected(MarketDataError::OutOfOrder { .. }))
    ));

    let session = engine.get_session_profile("BTCUSDT").unwrap();
    assert_eq!(session.candle_count, 10);
    assert!((session.total_volume - 100.0).abs() < 1e-6);
    let volumes: Vec<f64> = engine
        .get_history("BTCUSDT", Timeframe::FiveMinutes)
        .await
        .iter()
        .map(|c| c.volume)
        .collect();
    assert_eq!(volumes, vec![50.0, 50.0]);

    let stats = engine.get_statistics("BTCUSDT").await.unwrap();
    assert_eq!(stats.rejected_events, 2);
    assert_eq!(stats.candles_ingested, 10);
}

#[tokio::test]
async fn test_only_five_most_recent_big_prints() {
    let (engine, _advisory) = AnalyticsEngine::new(create_test_engine_config());

    for i in 0..20 {
        let trade = create_sample_trade("BTCUSDT", i * 10, 100.0, 1.0, TradeSide::Buy);
        engine.ingest_trade("BTCUSDT", trade).await.unwrap();
    }
    for i in 0..7 {
        let trade = create_sample_trade("BTCUSDT", 1_000 + i * 10, 100.0, 50.0, TradeSide::Sell);
        engine.ingest_trade("BTCUSDT", trade).await.unwrap();
    }
    engine
        .ingest_candle("BTCUSDT", create_sample_candle("BTCUSDT", 0, 100.0, 10.0))
        .await
        .unwrap();

    let metrics = engine.get_order_flow("BTCUSDT").unwrap();
    assert_eq!(metrics.big_prints.len(), 5);
    let timestamps: Vec<i64> = metrics.big_prints.iter().map(|t| t.timestamp - BASE_TS).collect();
    assert_eq!(timestamps, vec![1_020, 1_030, 1_040, 1_050, 1_060]);
    assert!(metrics.big_prints.iter().all(|t| t.is_big_print));
    assert_eq!(metrics.cvd, 20.0 - 350.0);
    assert_eq!(metrics.cvd_trend, CvdTrend::Neutral);
    assert!(!metrics.is_buy_dominant());
}

#[tokio::test]
async fn test_advisory_tap_toggle() {
    let config = EngineConfig {
        advisory_enabled: true,
        ..create_test_engine_config()
    };
    let (engine, mut advisory) = AnalyticsEngine::new(config);
    feed(&engine, "BTCUSDT", 12, 10).await;

    let request = advisory.try_recv().expect("advisory request queued");
    assert_eq!(request.symbol, "BTCUSDT");
    assert_eq!(request.candle.timestamp, BASE_TS + 9 * MINUTE);
    assert!(advisory.try_recv().is_err());

    engine.set_advisory_enabled(false);
    assert!(!engine.advisory_enabled());
    let outcome = engine
        .ingest_candle("BTCUSDT", create_sample_candle("BTCUSDT", 10, 100.0, 10.0))
        .await
        .unwrap();
    assert!(!outcome.advisory_queued);
    assert!(advisory.try_recv().is_err());
}

#[tokio::test]
async fn test_signal_fan_out_survives_dropped_subscriber() {
    let (engine, _advisory) = AnalyticsEngine::new(create_test_engine_config());
    let mut kept = engine.subscribe();
    let dropped = engine.subscribe();
    drop(dropped);

    let delivered = engine.publish_signal(create_sample_signal("BTCUSDT"));
    assert_eq!(delivered, 1);
    assert_eq!(engine.broadcaster().subscriber_count(), 1);

    match kept.try_recv() {
        Some(BroadcastEvent::NewSignal(update)) => {
            assert_eq!(update.symbol, "BTCUSDT");
            assert!(update.signal.is_actionable(70));
        }
        other => panic!("expected a signal, got {:?}", other),
    }

    let mut weak = create_sample_signal("BTCUSDT");
    weak.confidence_score = 55;
    assert_eq!(engine.publish_signal(weak), 0);
    assert!(kept.try_recv().is_none());

    assert!(engine.unsubscribe(kept.id()));
    assert_eq!(engine.publish_signal(create_sample_signal("ETHUSDT")), 0);
}

#[tokio::test]
async fn test_instruments_are_isolated() {
    let (engine, _advisory) = AnalyticsEngine::new(create_test_engine_config());
    feed(&engine, "BTCUSDT", 12, 10).await;
    feed(&engine, "ETHUSDT", 0, 3).await;

    assert_eq!(engine.instruments().await, vec!["BTCUSDT", "ETHUSDT"]);
    assert!(engine.get_current_profile("BTCUSDT").is_some());
    assert!(engine.get_current_profile("ETHUSDT").is_none());

    assert!(engine.remove_instrument("BTCUSDT").await);
    assert!(!engine.remove_instrument("BTCUSDT").await);
    assert!(engine.get_current_profile("BTCUSDT").is_none());
    assert_eq!(engine.get_recent_candles("ETHUSDT", 10).await.len(), 3);
    assert_eq!(engine.instruments().await, vec!["ETHUSDT"]);

    engine.shutdown().await;
    assert!(engine.instruments().await.is_empty());
}
