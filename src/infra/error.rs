use thiserror::Error;

/// Failures at the process edges: the listener socket, the Postgres pool,
/// tracing installation, and deployment settings. Request-path database
/// errors travel as `RepoError`; this type only shows up around startup.
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("database unavailable: {message}")]
    Database { message: String },
    #[error("telemetry setup failed: {message}")]
    Telemetry { message: String },
    #[error("deployment misconfigured: {message}")]
    Configuration { message: String },
}

impl InfraError {
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}
