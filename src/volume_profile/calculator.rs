use std::cmp::Ordering;

use chrono::Utc;
use tracing::debug;

use crate::common::errors::Unavailable;
use crate::market::structs::Candle;
use super::structs::{VolumeProfile, VolumeProfileConfig, VolumeProfileLevel};

/// Build a volume-at-price profile from a candle window.
///
/// The window's `[min low, max high]` range is split into `bin_count` equal bins.
/// Each candle spreads its volume evenly over sub-levels stepping up from its low
/// by one bin width; a candle with no range drops its whole volume into the bin
/// holding its close. Zero-volume candles contribute nothing.
pub fn compute_volume_profile(
    symbol: &str,
    candles: &[Candle],
    config: &VolumeProfileConfig,
) -> Result<VolumeProfile, Unavailable> {
    if candles.len() < config.min_candles {
        return Err(Unavailable::InsufficientCandles {
            got: candles.len(),
            need: config.min_candles,
        });
    }
    if candles.is_empty() {
        return Err(Unavailable::InsufficientCandles { got: 0, need: 1 });
    }

    let (min_price, max_price) = candles.iter().fold((f64::MAX, f64::MIN), |(lo, hi), c| {
        (lo.min(c.low), hi.max(c.high))
    });
    let total_volume: f64 = candles.iter().map(|c| c.volume.max(0.0)).sum();
    let range = max_price - min_price;

    if range <= 0.0 {
        if total_volume <= 0.0 {
            return Err(Unavailable::DegenerateRange);
        }
        debug!("{} profile collapsed to a single level at {}", symbol, min_price);
        return Ok(single_level_profile(symbol, min_price, total_volume, candles.len()));
    }
    if total_volume <= 0.0 {
        return Err(Unavailable::NoVolume);
    }

    let bin_count = config.bin_count.max(1);
    let bin_width = range / bin_count as f64;
    let mut bins = vec![0.0_f64; bin_count];

    for candle in candles {
        if candle.volume <= 0.0 {
            continue;
        }

        let candle_range = candle.range();
        if candle_range <= 0.0 {
            bins[bin_index(candle.close, min_price, bin_width, bin_count)] += candle.volume;
            continue;
        }

        let sub_levels = ((candle_range / bin_width).floor() as usize).max(1);
        let share = candle.volume / sub_levels as f64;
        for i in 0..sub_levels {
            let price = candle.low + i as f64 * bin_width;
            bins[bin_index(price, min_price, bin_width, bin_count)] += share;
        }
    }

    let mut levels: Vec<VolumeProfileLevel> = bins
        .iter()
        .enumerate()
        .filter(|(_, volume)| **volume > 0.0)
        .map(|(idx, volume)| VolumeProfileLevel {
            price: min_price + (idx as f64 + 0.5) * bin_width,
            volume: *volume,
            is_poc: false,
            is_lvn: false,
            is_hvn: false,
        })
        .collect();

    if levels.is_empty() {
        return Err(Unavailable::NoVolume);
    }

    let poc_idx = point_of_control(&levels);
    levels[poc_idx].is_poc = true;

    let binned_total: f64 = levels.iter().map(|l| l.volume).sum();
    let mean = binned_total / levels.len() as f64;
    for level in levels.iter_mut() {
        level.is_lvn = level.volume < config.lvn_factor * mean;
        level.is_hvn = level.volume > config.hvn_factor * mean;
    }

    let selected = select_value_area(&levels, config.value_area_percentage);
    let (val, vah) = selected.iter().fold((f64::MAX, f64::MIN), |(lo, hi), &idx| {
        (lo.min(levels[idx].price), hi.max(levels[idx].price))
    });

    debug!("{} profile: {} candles, {} levels, POC {:.6}, VA [{:.6}, {:.6}]",
           symbol, candles.len(), levels.len(), levels[poc_idx].price, val, vah);

    Ok(VolumeProfile {
        symbol: symbol.to_string(),
        timestamp: Utc::now().timestamp_millis(),
        poc: levels[poc_idx].price,
        vah,
        val,
        levels,
        total_volume,
        bin_width,
        candle_count: candles.len(),
    })
}

/// Index into `[0, bin_count)` of the bin containing `price`
fn bin_index(price: f64, min_price: f64, bin_width: f64, bin_count: usize) -> usize {
    let raw = ((price - min_price) / bin_width).floor();
    if raw <= 0.0 {
        0
    } else {
        (raw as usize).min(bin_count - 1)
    }
}

/// Highest-volume level; the first (lowest price) wins ties
fn point_of_control(levels: &[VolumeProfileLevel]) -> usize {
    let mut best = 0;
    for (idx, level) in levels.iter().enumerate().skip(1) {
        if level.volume > levels[best].volume {
            best = idx;
        }
    }
    best
}

/// Fewest levels whose combined volume reaches `percentage` of the total.
///
/// Levels are taken by volume descending, lower price first on ties. The result
/// need not be contiguous in price.
pub(crate) fn select_value_area(levels: &[VolumeProfileLevel], percentage: f64) -> Vec<usize> {
    let total: f64 = levels.iter().map(|l| l.volume).sum();
    let target = total * percentage / 100.0;

    let mut order: Vec<usize> = (0..levels.len()).collect();
    order.sort_by(|&a, &b| {
        levels[b].volume
            .partial_cmp(&levels[a].volume)
            .unwrap_or(Ordering::Equal)
            .then_with(|| levels[a].price.partial_cmp(&levels[b].price).unwrap_or(Ordering::Equal))
    });

    let mut selected = Vec::new();
    let mut cumulative = 0.0;
    for idx in order {
        selected.push(idx);
        cumulative += levels[idx].volume;
        if cumulative >= target {
            break;
        }
    }
    selected
}

fn single_level_profile(symbol: &str, price: f64, volume: f64, candle_count: usize) -> VolumeProfile {
    VolumeProfile {
        symbol: symbol.to_string(),
        timestamp: Utc::now().timestamp_millis(),
        poc: price,
        vah: price,
        val: price,
        levels: vec![VolumeProfileLevel {
            price,
            volume,
            is_poc: true,
            is_lvn: false,
            is_hvn: false,
        }],
        total_volume: volume,
        bin_width: 0.0,
        candle_count,
    }
}
