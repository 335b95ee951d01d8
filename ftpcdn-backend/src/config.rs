use crate::error::{AppError, Result};
use std::env;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub server_address: String,
    pub max_file_size: usize,
    pub ftp: FtpConfig,
}

/// Connection settings for the remote FTP store. Loaded once at startup.
#[derive(Clone, Debug)]
pub struct FtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Directory every remote operation is rooted at
    pub base_path: String,
    pub connect_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://ftpcdn.db?mode=rwc".to_string()),

            server_address: env::var("SERVER_ADDRESS")
                .unwrap_or_else(|_| "127.0.0.1:3000".to_string()),

            max_file_size: env::var("MAX_FILE_SIZE")
                .unwrap_or_else(|_| "50".to_string()) // Default 50MB
                .parse::<usize>()
                .map_err(|_| AppError::ConfigError("Invalid MAX_FILE_SIZE".to_string()))?
                * 1024
                * 1024, // Convert MB to bytes

            ftp: FtpConfig::from_env()?,
        })
    }
}

impl FtpConfig {
    pub fn from_env() -> Result<Self> {
        Ok(FtpConfig {
            host: env::var("FTP_HOST").unwrap_or_else(|_| "localhost".to_string()),

            port: env::var("FTP_PORT")
                .unwrap_or_else(|_| "21".to_string())
                .parse()
                .map_err(|_| AppError::ConfigError("Invalid FTP_PORT".to_string()))?,

            username: env::var("FTP_USERNAME").unwrap_or_else(|_| "anonymous".to_string()),

            password: env::var("FTP_PASSWORD").unwrap_or_default(),

            base_path: env::var("FTP_BASE_PATH").unwrap_or_else(|_| "/uploads".to_string()),

            connect_timeout: Duration::from_secs(
                env::var("FTP_CONNECT_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .map_err(|_| {
                        AppError::ConfigError("Invalid FTP_CONNECT_TIMEOUT_SECS".to_string())
                    })?,
            ),
        })
    }

    /// `host:port` form used to open the control connection
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
