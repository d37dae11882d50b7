pub mod api;
pub mod app;
pub mod config;
pub mod contacts;
pub mod dashboard;
pub mod device;
pub mod entities;
pub mod error;
pub mod history;
pub mod metrics;
pub mod migrator;
pub mod status;
pub mod store;
pub mod telemetry;
pub mod workflow;

#[cfg(test)]
mod testing;

pub use sea_orm;
