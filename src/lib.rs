pub mod analytics;
pub mod common;
pub mod config;
pub mod engine;
pub mod feed;
pub mod health;
pub mod logging;
pub mod market;
pub mod order_flow;
pub mod timeframe;
pub mod volume_profile;
