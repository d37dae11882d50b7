use thiserror::Error;

/// Failure talking to the persistence layer.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    DbErr(#[from] sea_orm::DbErr),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum ContactError {
    #[error("{0} must not be empty")]
    MissingField(&'static str),
    #[error("emergency contact {0} not found")]
    NotFound(uuid::Uuid),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("monitoring is off, accident detection is disabled")]
    MonitoringOff,
    #[error("failed to read emergency contacts: {0}")]
    ContactRead(#[source] StoreError),
    #[error("failed to persist accident alert: {0}")]
    AlertWrite(#[source] StoreError),
}

#[derive(Error, Debug)]
pub enum StatusError {
    #[error("alerts can only move to Resolved or False Alarm")]
    InvalidTarget,
    #[error("accident alert {0} not found")]
    NotFound(uuid::Uuid),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Missing or malformed environment configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeolocationError {
    #[error("geolocation is unavailable")]
    Unavailable,
    #[error("geolocation permission was denied")]
    Denied,
}
