//! Concrete adapter implementations for ports.

pub mod console_notifier;
pub mod csv_adapter;
pub mod file_config_adapter;
pub mod message_format;
#[cfg(feature = "http")]
pub mod newsapi_adapter;
#[cfg(feature = "http")]
pub mod telegram_adapter;
#[cfg(feature = "http")]
pub mod yahoo_adapter;
