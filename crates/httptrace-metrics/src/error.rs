use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum MetricsError {
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Metrics are disabled")]
    Disabled,
}

pub type Result<T> = std::result::Result<T, MetricsError>;
