//! Configuration module for the attendance backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;

use crate::service::AttendancePolicy;

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    pub log_format: LogFormat,
    /// Referential and duplicate-day rules for attendance writes
    pub policy: AttendancePolicy,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AddrParseError> {
        dotenvy::dotenv().ok();

        let db_path = env::var("ATTENDANCE_DB_PATH")
            .unwrap_or_else(|_| "./data/attendance.sqlite".to_string())
            .into();

        let bind_addr = env::var("ATTENDANCE_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:5000".to_string())
            .parse()?;

        let log_level = env::var("ATTENDANCE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let log_format = match env::var("ATTENDANCE_LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        let policy = AttendancePolicy {
            require_existing_student: env_flag("ATTENDANCE_REQUIRE_STUDENT"),
            unique_per_day: env_flag("ATTENDANCE_UNIQUE_DAILY"),
        };

        Ok(Self {
            db_path,
            bind_addr,
            log_level,
            log_format,
            policy,
        })
    }
}

fn env_flag(name: &str) -> bool {
    let Ok(value) = env::var(name) else {
        return false;
    };
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
