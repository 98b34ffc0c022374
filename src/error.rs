//! Application-wide error types.

use thiserror::Error;

use crate::bootstrap::BootstrapError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    #[error("server error: {0}")]
    Server(String),

    #[error("bootstrap error: {0}")]
    Bootstrap(#[from] BootstrapError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::path::PathBuf;

    #[test]
    fn config_error_display() {
        let e = AppError::Config("missing SUPABASE_URL".into());
        assert!(e.to_string().contains("missing SUPABASE_URL"));
    }

    #[test]
    fn logger_error_display() {
        let e = AppError::Logger("already initialized".into());
        assert!(e.to_string().contains("already initialized"));
    }

    #[test]
    fn bootstrap_error_converts() {
        let inner = BootstrapError::ConfigNotFound(PathBuf::from(".setup/.env.config"));
        let e: AppError = inner.into();
        assert!(e.to_string().starts_with("bootstrap error"));
        assert!(e.to_string().contains(".setup/.env.config"));
    }

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let e: AppError = io_err.into();
        assert!(e.to_string().contains("io error"));
        let _: &dyn Error = &e;
    }
}
