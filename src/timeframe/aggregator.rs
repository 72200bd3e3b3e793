use tracing::{debug, warn};

use crate::common::constants::MILLISECONDS_PER_MINUTE;
use crate::market::structs::{AggregatedCandle, Candle, TimestampMS};

/// Rebucket time-ascending 1-minute candles into `bucket_minutes` candles.
///
/// Consecutive candles sharing a bucket are merged (first open, last close,
/// max high, min low, summed volumes). A bucket is only emitted when it holds at
/// least `ceil(bucket_minutes / 2)` source candles, so a young trailing bucket is
/// left out until enough of it has closed.
pub fn aggregate(candles: &[Candle], bucket_minutes: u32) -> Vec<AggregatedCandle> {
    if bucket_minutes == 0 {
        warn!("Refusing to aggregate into zero-minute buckets");
        return Vec::new();
    }
    if bucket_minutes == 1 {
        return candles.to_vec();
    }
    if candles.is_empty() {
        return Vec::new();
    }

    let min_members = bucket_minutes.div_ceil(2) as usize;
    let mut aggregated = Vec::new();
    let mut current: Option<(TimestampMS, Vec<&Candle>)> = None;

    for candle in candles {
        let key = bucket_start(candle.timestamp, bucket_minutes);

        if let Some((start, members)) = current.as_mut() {
            if *start == key {
                members.push(candle);
                continue;
            }
        }
        if let Some((start, members)) = current.take() {
            if let Some(merged) = merge_bucket(start, &members, min_members) {
                aggregated.push(merged);
            }
        }
        current = Some((key, vec![candle]));
    }

    if let Some((start, members)) = current {
        if let Some(merged) = merge_bucket(start, &members, min_members) {
            aggregated.push(merged);
        }
    }

    debug!("Aggregated {} 1m candles into {} {}m candles",
           candles.len(), aggregated.len(), bucket_minutes);

    aggregated
}

/// Start of the bucket containing `timestamp`, in milliseconds
pub fn bucket_start(timestamp: TimestampMS, bucket_minutes: u32) -> TimestampMS {
    let minutes = timestamp.div_euclid(MILLISECONDS_PER_MINUTE);
    let bucket = i64::from(bucket_minutes);
    minutes.div_euclid(bucket) * bucket * MILLISECONDS_PER_MINUTE
}

fn merge_bucket(start: TimestampMS, members: &[&Candle], min_members: usize) -> Option<AggregatedCandle> {
    if members.len() < min_members {
        debug!("Dropping bucket at {} with {} of {} required candles",
               start, members.len(), min_members);
        return None;
    }

    let first = members.first()?;
    let last = members.last()?;

    let mut merged = Candle {
        symbol: first.symbol.clone(),
        timestamp: start,
        open: first.open,
        high: first.high,
        low: first.low,
        close: last.close,
        volume: 0.0,
        buy_volume: 0.0,
        sell_volume: 0.0,
    };

    for candle in members {
        merged.high = merged.high.max(candle.high);
        merged.low = merged.low.min(candle.low);
        merged.volume += candle.volume;
        merged.buy_volume += candle.buy_volume;
        merged.sell_volume += candle.sell_volume;
    }

    Some(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR_START: TimestampMS = 1_736_985_600_000; // 2025-01-16 00:00:00 UTC

    fn minute_candle(minute: i64, open: f64, close: f64, volume: f64) -> Candle {
        let high = open.max(close) + 0.05;
        let low = open.min(close) - 0.05;
        Candle::new("BTCUSDT", HOUR_START + minute * MILLISECONDS_PER_MINUTE,
                    open, high, low, close, volume, volume * 0.5)
    }

    fn hour_of_candles() -> Vec<Candle> {
        (0..60)
            .map(|i| {
                let open = 100.0 + i as f64 * 0.1;
                minute_candle(i, open, open, 1.0)
            })
            .collect()
    }

    #[test]
    fn test_hour_aggregation() {
        let candles = hour_of_candles();
        let aggregated = aggregate(&candles, 60);

        assert_eq!(aggregated.len(), 1);
        let hour = &aggregated[0];
        assert_eq!(hour.timestamp, HOUR_START);
        assert_eq!(hour.open, 100.0);
        assert!((hour.close - 105.9).abs() < 1e-9);

        let max_high = candles.iter().map(|c| c.high).fold(f64::MIN, f64::max);
        let min_low = candles.iter().map(|c| c.low).fold(f64::MAX, f64::min);
        assert_eq!(hour.high, max_high);
        assert_eq!(hour.low, min_low);
        assert!((hour.volume - 60.0).abs() < 1e-9);
        assert!((hour.buy_volume + hour.sell_volume - hour.volume).abs() < 1e-9);
    }

    #[test]
    fn test_one_minute_is_identity() {
        let candles = hour_of_candles();
        assert_eq!(aggregate(&candles, 1), candles);
    }

    #[test]
    fn test_incomplete_trailing_bucket_dropped() {
        // 5 full minutes then 2 minutes of the next 5m bucket (needs 3)
        let candles: Vec<Candle> = (0..7).map(|i| minute_candle(i, 100.0, 101.0, 2.0)).collect();
        let aggregated = aggregate(&candles, 5);

        assert_eq!(aggregated.len(), 1);
        assert!((aggregated[0].volume - 10.0).abs() < 1e-9);

        // A third minute makes the second bucket half complete
        let mut more = candles.clone();
        more.push(minute_candle(7, 101.0, 102.0, 2.0));
        let aggregated = aggregate(&more, 5);
        assert_eq!(aggregated.len(), 2);
        assert_eq!(aggregated[1].timestamp, HOUR_START + 5 * MILLISECONDS_PER_MINUTE);
        assert_eq!(aggregated[1].close, 102.0);
    }

    #[test]
    fn test_buckets_align_to_boundaries() {
        // Start mid-bucket: minutes 12..=17 split into [10,15) and [15,20)
        let candles: Vec<Candle> = (12..18).map(|i| minute_candle(i, 100.0, 100.5, 1.0)).collect();
        let aggregated = aggregate(&candles, 5);

        assert_eq!(aggregated.len(), 2);
        assert_eq!(aggregated[0].timestamp, HOUR_START + 10 * MILLISECONDS_PER_MINUTE);
        assert!((aggregated[0].volume - 3.0).abs() < 1e-9);
        assert_eq!(aggregated[1].timestamp, HOUR_START + 15 * MILLISECONDS_PER_MINUTE);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(aggregate(&[], 15).is_empty());
        assert!(aggregate(&hour_of_candles(), 0).is_empty());
    }

    #[test]
    fn test_bucket_start_handles_seconds() {
        let ts = HOUR_START + 7 * MILLISECONDS_PER_MINUTE + 42_000;
        assert_eq!(bucket_start(ts, 5), HOUR_START + 5 * MILLISECONDS_PER_MINUTE);
        assert_eq!(bucket_start(ts, 1), HOUR_START + 7 * MILLISECONDS_PER_MINUTE);
    }
}
