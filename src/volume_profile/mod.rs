//! Volume-at-price profiles
//!
//! Bins candle volume across the window's price range and derives the point of
//! control, the 70% value area and low/high volume node flags. The engine keeps
//! two profiles per instrument: a short "current" window and the whole session.
pub mod calculator;
pub mod structs;

pub use calculator::compute_volume_profile;
pub use structs::{VolumeProfile, VolumeProfileConfig, VolumeProfileLevel};
