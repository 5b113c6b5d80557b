use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::config::BillingSettings;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub db: DbConfig,
    pub storage: StorageConfig,
    pub billing: BillingConfig,
    pub sweeper: SweeperConfig,
    pub logging: LoggingConfig,
    pub environment: EnvironmentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_url: SecretString,
    pub pool_size: u32,
    pub query_timeout_secs: u64,
}

impl Serialize for DbConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("DbConfig", 3)?;
        state.serialize_field("database_url", "[REDACTED]")?;
        state.serialize_field("pool_size", &self.pool_size)?;
        state.serialize_field("query_timeout_secs", &self.query_timeout_secs)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for DbConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct DbConfigHelper {
            database_url: String,
            pool_size: u32,
            query_timeout_secs: u64,
        }

        let helper = DbConfigHelper::deserialize(deserializer)?;
        Ok(DbConfig {
            database_url: SecretString::from(helper.database_url),
            pool_size: helper.pool_size,
            query_timeout_secs: helper.query_timeout_secs,
        })
    }
}

impl DbConfig {
    #[must_use]
    pub fn redacted_url(&self) -> String {
        let url_str = self.database_url.expose_secret();
        match url::Url::parse(url_str) {
            Ok(mut url) => {
                if url.password().is_some() {
                    url.set_password(Some("***")).ok();
                }
                url.to_string()
            }
            Err(_) => "[INVALID_URL]".to_string(),
        }
    }

    #[must_use]
    pub fn database_url(&self) -> &str {
        self.database_url.expose_secret()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageBackend {
    #[serde(rename = "postgres")]
    Postgres,
    #[serde(rename = "memory")]
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingConfig {
    pub history_default_limit: u32,
    pub history_max_limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweeperConfig {
    pub enabled: bool,
    pub stale_after_secs: u64,
    pub interval_secs: u64,
    pub batch_size: u32,
    pub jitter_min_percent: u8,
    pub jitter_max_percent: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    pub include_location: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LogFormat {
    #[serde(rename = "json")]
    Json,
    #[serde(rename = "pretty")]
    Pretty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub env: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                cors_origin: None,
            },
            db: DbConfig {
                database_url: SecretString::from("postgresql://localhost/intervox"),
                pool_size: 10,
                query_timeout_secs: 5,
            },
            storage: StorageConfig {
                backend: StorageBackend::Postgres,
            },
            billing: BillingConfig {
                history_default_limit: 20,
                history_max_limit: 100,
            },
            sweeper: SweeperConfig {
                enabled: true,
                stale_after_secs: 3600,
                interval_secs: 300,
                batch_size: 100,
                jitter_min_percent: 10,
                jitter_max_percent: 20,
            },
            logging: LoggingConfig {
                level: "debug".to_string(),
                format: LogFormat::Pretty,
                include_location: false,
            },
            environment: EnvironmentConfig {
                env: "development".to_string(),
            },
        }
    }
}

impl Config {
    pub fn validate(&self) -> AppResult<()> {
        if self.server.host.trim().is_empty() {
            return Err(AppError::ConfigError {
                message: "server host cannot be empty".to_string(),
            });
        }

        if self.db.database_url.expose_secret().is_empty() {
            return Err(AppError::ConfigError {
                message: "database_url cannot be empty".to_string(),
            });
        }

        if self.db.pool_size == 0 {
            return Err(AppError::ConfigError {
                message: "db pool_size must be greater than 0".to_string(),
            });
        }

        if self.db.query_timeout_secs == 0 {
            return Err(AppError::ConfigError {
                message: "query_timeout_secs must be greater than 0".to_string(),
            });
        }

        if self.billing.history_default_limit == 0 || self.billing.history_max_limit == 0 {
            return Err(AppError::ConfigError {
                message: "history page limits must be greater than 0".to_string(),
            });
        }

        if self.billing.history_default_limit > self.billing.history_max_limit {
            return Err(AppError::ConfigError {
                message: "history_default_limit cannot exceed history_max_limit".to_string(),
            });
        }

        if self.sweeper.enabled {
            if self.sweeper.stale_after_secs == 0 || self.sweeper.interval_secs == 0 {
                return Err(AppError::ConfigError {
                    message: "sweeper intervals must be greater than 0 when enabled".to_string(),
                });
            }

            if self.sweeper.batch_size == 0 {
                return Err(AppError::ConfigError {
                    message: "sweeper batch_size must be greater than 0 when enabled".to_string(),
                });
            }
        }

        if self.sweeper.jitter_min_percent > self.sweeper.jitter_max_percent {
            return Err(AppError::ConfigError {
                message: "jitter_min_percent must be <= jitter_max_percent".to_string(),
            });
        }

        if self.sweeper.jitter_max_percent > 100 {
            return Err(AppError::ConfigError {
                message: "jitter_max_percent must be <= 100".to_string(),
            });
        }

        Ok(())
    }

    #[must_use]
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Sweep interval with jitter so replicas do not scan in lockstep.
    #[must_use]
    pub fn sweep_interval_with_jitter(&self) -> u64 {
        use rand::Rng;

        let min_percent = f64::from(self.sweeper.jitter_min_percent) / 100.0;
        let max_percent = f64::from(self.sweeper.jitter_max_percent) / 100.0;

        let mut rng = rand::rng();
        let jitter_factor = rng.random_range((1.0 + min_percent)..=(1.0 + max_percent));

        #[allow(clippy::cast_precision_loss)]
        let result = (self.sweeper.interval_secs as f64 * jitter_factor).round();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let result_u64 = result as u64;
        result_u64
    }

    #[must_use]
    pub fn billing_settings(&self) -> BillingSettings {
        BillingSettings {
            history_default_limit: self.billing.history_default_limit,
            history_max_limit: self.billing.history_max_limit,
            stale_reservation_ttl_secs: self.sweeper.stale_after_secs,
            stale_sweep_batch_size: self.sweeper.batch_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validation_rejects_inverted_history_limits() {
        let mut config = Config::default();
        config.billing.history_default_limit = 200;
        config.billing.history_max_limit = 100;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validation_rejects_zero_sweep_interval_when_enabled() {
        let mut config = Config::default();
        config.sweeper.interval_secs = 0;
        assert!(config.validate().is_err());

        config.sweeper.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn database_url_is_redacted_for_display() {
        let mut config = Config::default();
        config.db.database_url = SecretString::from("postgresql://user:hunter2@db/intervox");
        assert_eq!(
            config.db.redacted_url(),
            "postgresql://user:***@db/intervox"
        );
    }
}
