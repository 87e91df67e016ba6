pub mod config;
pub mod error;
pub mod logging;
pub mod state;

pub use config::{DeploymentProfile, Environment, ServerConfig};
pub use error::{AppError, ServiceError, UnexpectedError};
pub use logging::LoggingContext;
pub use state::AppState;
