pub mod battery;
pub mod bot;
pub mod chart;
pub mod claude;
pub mod config;
pub mod telegram_log;
pub mod weather;
