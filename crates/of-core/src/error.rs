use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Unknown {what}: {value}")]
    Unknown { what: &'static str, value: String },

    #[error("Invalid id: {value}")]
    InvalidId { value: String },

    #[error("Progress out of range: {value} (expected 0-6)")]
    ProgressOutOfRange { value: i64 },

    #[error("Invalid route: {route}")]
    InvalidRoute { route: String },

    #[error("Malformed histogram for {what}: {reason}")]
    Histogram { what: &'static str, reason: String },
}
