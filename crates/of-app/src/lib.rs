//! Shared application service layer for optiflow.
//!
//! Wraps the API client and the client stores into the operations the CLI
//! (or any other front end) calls: project and dataset management, the flow
//! wizard, training and its progress poller.

pub mod config;
pub mod error;
pub mod flow_service;
pub mod polling;
pub mod project_service;
pub mod session;
pub mod validation;
pub mod wizard;

// Re-export key types for convenience
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use polling::{PollEvent, ProgressPoller};
pub use session::Session;
pub use validation::{ValidationError, parse_bound, validate_goal};
pub use wizard::{GuardError, Wizard};
