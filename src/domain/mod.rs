//! Core domain types and logic.

pub mod error;
pub mod ohlcv;
pub mod indicator;
pub mod series;
pub mod normalize;
pub mod resample;
pub mod market_data;
pub mod sentiment;
pub mod decision;
pub mod risk;
pub mod session;
pub mod monitor;
pub mod control;
pub mod cycle;
pub mod settings;
