use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::occupancy::DeletePolicy;
use crate::tenancy::TenantStatus;

const DEFAULT_HASH_COST: u32 = 10;
const DEFAULT_TEMP_PASSWORD_LENGTH: usize = 12;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub security: SecurityConfig,
    pub lease: LeasePolicy,
    /// Fixed bearer token for the seeded admin account. The only way to reach authenticated
    /// routes in production, where per-start tokens are not logged.
    pub operator_token: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let security = SecurityConfig::from_env()?;
        let lease = LeasePolicy::from_env()?;
        let operator_token = env::var("APP_OPERATOR_TOKEN")
            .ok()
            .map(|raw| raw.trim().to_string())
            .filter(|token| !token.is_empty());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            security,
            lease,
            operator_token,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Credential issuance for occupants created during tenant provisioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecurityConfig {
    pub password_hash_cost: u32,
    pub temporary_password_length: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            password_hash_cost: DEFAULT_HASH_COST,
            temporary_password_length: DEFAULT_TEMP_PASSWORD_LENGTH,
        }
    }
}

impl SecurityConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let password_hash_cost = match env::var("APP_PASSWORD_HASH_COST") {
            Ok(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|cost| (4..=31).contains(cost))
                .ok_or(ConfigError::InvalidHashCost)?,
            Err(_) => DEFAULT_HASH_COST,
        };

        let temporary_password_length = match env::var("APP_TEMP_PASSWORD_LENGTH") {
            Ok(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|length| (8..=32).contains(length))
                .ok_or(ConfigError::InvalidPasswordLength)?,
            Err(_) => DEFAULT_TEMP_PASSWORD_LENGTH,
        };

        Ok(Self {
            password_hash_cost,
            temporary_password_length,
        })
    }
}

/// Operator-selected lease lifecycle policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeasePolicy {
    /// Status given to the departing tenant when its target is vacated.
    pub vacated_status: TenantStatus,
    pub delete_policy: DeletePolicy,
}

impl Default for LeasePolicy {
    fn default() -> Self {
        Self {
            vacated_status: TenantStatus::Terminated,
            delete_policy: DeletePolicy::Block,
        }
    }
}

impl LeasePolicy {
    fn from_env() -> Result<Self, ConfigError> {
        let vacated_status = match env::var("APP_VACATED_TENANT_STATUS") {
            Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "terminated" => TenantStatus::Terminated,
                "inactive" => TenantStatus::Inactive,
                _ => return Err(ConfigError::InvalidVacatedStatus(raw)),
            },
            Err(_) => TenantStatus::Terminated,
        };

        let delete_policy = match env::var("APP_PROPERTY_DELETE_POLICY") {
            Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "block" => DeletePolicy::Block,
                "cascade" => DeletePolicy::Cascade,
                _ => return Err(ConfigError::InvalidDeletePolicy(raw)),
            },
            Err(_) => DeletePolicy::Block,
        };

        Ok(Self {
            vacated_status,
            delete_policy,
        })
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidHashCost,
    InvalidPasswordLength,
    InvalidVacatedStatus(String),
    InvalidDeletePolicy(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidHashCost => {
                write!(f, "APP_PASSWORD_HASH_COST must be between 4 and 31")
            }
            ConfigError::InvalidPasswordLength => {
                write!(f, "APP_TEMP_PASSWORD_LENGTH must be between 8 and 32")
            }
            ConfigError::InvalidVacatedStatus(value) => write!(
                f,
                "APP_VACATED_TENANT_STATUS must be 'terminated' or 'inactive', found '{value}'"
            ),
            ConfigError::InvalidDeletePolicy(value) => write!(
                f,
                "APP_PROPERTY_DELETE_POLICY must be 'block' or 'cascade', found '{value}'"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
