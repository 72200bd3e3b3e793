/// Engine-wide defaults

// Buffer capacities (per instrument)
pub const DEFAULT_CANDLE_CAPACITY: usize = 1440; // One day of 1-minute candles
pub const DEFAULT_TRADE_CAPACITY: usize = 20_000;
pub const CVD_HISTORY_CAPACITY: usize = 500;

// Volume profile
pub const DEFAULT_BIN_COUNT: usize = 50;
pub const DEFAULT_CURRENT_WINDOW: usize = 50;
pub const MIN_PROFILE_CANDLES: usize = 10;
pub const VALUE_AREA_PERCENTAGE: f64 = 70.0;
pub const LVN_FACTOR: f64 = 0.5;
pub const HVN_FACTOR: f64 = 1.5;

// Order flow
pub const DEFAULT_TRADE_WINDOW: usize = 100;
pub const MIN_ORDER_FLOW_TRADES: usize = 10;
pub const BIG_PRINT_MULTIPLIER: f64 = 3.0;
pub const MAX_BIG_PRINTS: usize = 5;
pub const NEUTRAL_IMBALANCE: f64 = 50.0;

// Broadcast
pub const DEFAULT_SUBSCRIBER_QUEUE: usize = 256;
pub const BROADCAST_TOP_LEVELS: usize = 20;

// Advisory
pub const DEFAULT_ADVISORY_QUEUE: usize = 64;
pub const DEFAULT_MIN_SIGNAL_CONFIDENCE: u8 = 70;

// Time constants
pub const MILLISECONDS_PER_MINUTE: i64 = 60_000;

// Interval labels
pub const INTERVAL_1M: &str = "1m";
pub const INTERVAL_5M: &str = "5m";
pub const INTERVAL_15M: &str = "15m";
pub const INTERVAL_30M: &str = "30m";
pub const INTERVAL_1H: &str = "1h";
pub const INTERVAL_4H: &str = "4h";
pub const INTERVAL_1D: &str = "1d";

// Feed defaults
pub const DEFAULT_SYMBOLS: [&str; 4] = ["BTCUSDT", "ETHUSDT", "LTCUSDT", "DOGEUSDT"];
pub const BINANCE_STREAM_BASE_URL: &str = "wss://stream.binance.com:9443";
pub const WEBSOCKET_KLINE_SUFFIX: &str = "@kline_1m";
pub const WEBSOCKET_TRADE_SUFFIX: &str = "@trade";
pub const DEFAULT_RECONNECTION_DELAY_SECONDS: u64 = 5;
