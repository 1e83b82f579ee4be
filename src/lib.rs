pub mod config;
pub mod log;
pub mod pricing;
pub mod providers;
pub mod ticker;
pub mod ui;
pub mod valuation;
