use std::env;
use dotenv::dotenv;
use serde::Deserialize;
use log::{info, warn};
use chrono_tz::Tz;

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl Default for Environment {
    fn default() -> Self {
        Environment::Development
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Development),
            "test" => Ok(Environment::Test),
            "prod" | "production" => Ok(Environment::Production),
            _ => Err(format!("Unknown environment: {}", s)),
        }
    }
}

/// Where events and accounts are persisted.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub enum StorageBackend {
    ArangoDb,
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "arangodb" | "arango" => Ok(StorageBackend::ArangoDb),
            "memory" | "in-memory" => Ok(StorageBackend::Memory),
            _ => Err(format!("Unknown storage backend: {}", s)),
        }
    }
}

/// Where sessions are kept.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub enum SessionBackend {
    Redis,
    Memory,
}

impl std::str::FromStr for SessionBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "redis" => Ok(SessionBackend::Redis),
            "memory" | "in-memory" => Ok(SessionBackend::Memory),
            _ => Err(format!("Unknown session backend: {}", s)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub sessions: SessionConfig,
    pub realtime: RealtimeConfig,
    pub events: EventsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub url: String,
    pub name: String,
    pub username: String,
    pub password: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub backend: SessionBackend,
    pub redis_url: String,
    pub ttl_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    pub channel_capacity: usize,
}

#[derive(Debug, Clone)]
pub struct EventsConfig {
    /// IANA zone used to read datetime-local form values.
    pub timezone_name: String,
}

impl EventsConfig {
    pub fn timezone(&self) -> Tz {
        self.timezone_name.parse().unwrap_or(Tz::UTC)
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub filter: String,
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

fn required(name: &str) -> Result<String, String> {
    env::var(name).map_err(|_| format!("{} must be set in production", name))
}

impl Config {
    fn parse_backend_url(url: &str) -> (String, u16) {
        // Parse BACKEND_URL like "http://localhost:50002" or "http://127.0.0.1:50002"
        if let Ok(parsed_url) = url::Url::parse(url) {
            let host = parsed_url.host_str().unwrap_or("127.0.0.1").to_string();
            let port = parsed_url.port().unwrap_or(50002);
            (host, port)
        } else {
            ("127.0.0.1".to_string(), 50002)
        }
    }

    fn load_env_files() {
        if let Ok(env_file_path) = env::var("ENV_FILE_PATH") {
            if !env_file_path.is_empty() {
                info!("Loading environment from ENV_FILE_PATH: {}", env_file_path);
                dotenv::from_filename(&env_file_path).ok();
                return;
            }
        }

        dotenv().ok();
        // .env.<environment> overrides the base file outside development
        let environment_hint = env::var("RUST_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .parse()
            .unwrap_or(Environment::Development);
        let env_file = format!(".env.{:?}", environment_hint).to_lowercase();
        if env_file != ".env.development" {
            let _ = dotenv::from_filename(&env_file);
        }
    }

    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        Self::load_env_files();

        let environment = env::var("RUST_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .parse()
            .unwrap_or(Environment::Development);

        info!("Loading configuration for environment: {:?}", environment);

        let config = Self::from_environment(environment)?;
        config.validate()?;
        config.log_configuration();

        Ok(config)
    }

    /// Builds the configuration from process variables with the defaults of
    /// `environment`. Does not read any `.env` file.
    pub fn from_environment(environment: Environment) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Config {
            server: Self::load_server_config(&environment),
            storage: Self::load_storage_config(&environment)?,
            sessions: Self::load_session_config(&environment)?,
            realtime: Self::load_realtime_config(&environment),
            events: Self::load_events_config(&environment),
            logging: Self::load_logging_config(&environment),
            environment,
        })
    }

    fn load_server_config(env: &Environment) -> ServerConfig {
        let backend_url = env_or("BACKEND_URL", "http://0.0.0.0:50002");
        let (host, port) = Self::parse_backend_url(&backend_url);
        let default_workers = match env {
            Environment::Production => 8,
            Environment::Development | Environment::Test => 1,
        };

        ServerConfig {
            // SERVER_HOST takes precedence over the BACKEND_URL host
            host: env::var("SERVER_HOST").unwrap_or(host),
            port: env_parse_or("SERVER_PORT", port),
            workers: env_parse_or("BACKEND_WORKERS", default_workers),
        }
    }

    fn load_storage_config(env: &Environment) -> Result<StorageConfig, String> {
        match env {
            Environment::Development => {
                let arango_url = env::var("ARANGO_URL");
                match &arango_url {
                    Ok(url) => info!("Found ARANGO_URL in environment: {}", url),
                    Err(_) => warn!("ARANGO_URL not found in environment, using default"),
                }

                Ok(StorageConfig {
                    backend: env_or("STORAGE_BACKEND", "memory").parse()?,
                    url: arango_url.unwrap_or_else(|_| "http://localhost:8529".to_string()),
                    name: env_or("ARANGO_DB", "events_dev"),
                    username: env_or("ARANGO_USERNAME", "root"),
                    password: env_or("ARANGO_PASSWORD", "test"),
                    timeout_seconds: env_parse_or("DB_TIMEOUT", 30),
                })
            }
            Environment::Production => Ok(StorageConfig {
                backend: env_or("STORAGE_BACKEND", "arangodb").parse()?,
                url: required("ARANGO_URL")?,
                name: required("ARANGO_DB")?,
                username: required("ARANGO_USERNAME")?,
                password: required("ARANGO_PASSWORD")?,
                timeout_seconds: env_parse_or("DB_TIMEOUT", 120),
            }),
            Environment::Test => Ok(StorageConfig {
                backend: env_or("STORAGE_BACKEND", "memory").parse()?,
                url: env_or("ARANGO_URL", "http://test-arangodb:8529"),
                name: env_or("ARANGO_DB", "events_test"),
                username: env_or("ARANGO_USERNAME", "root"),
                password: env_or("ARANGO_PASSWORD", "test"),
                timeout_seconds: env_parse_or("DB_TIMEOUT", 30),
            }),
        }
    }

    fn load_session_config(env: &Environment) -> Result<SessionConfig, String> {
        match env {
            Environment::Development => Ok(SessionConfig {
                backend: env_or("SESSION_BACKEND", "memory").parse()?,
                redis_url: env_or("REDIS_URL", "redis://127.0.0.1/"),
                ttl_seconds: env_parse_or("SESSION_TTL_SECONDS", 86_400),
            }),
            Environment::Production => Ok(SessionConfig {
                backend: env_or("SESSION_BACKEND", "redis").parse()?,
                redis_url: required("REDIS_URL")?,
                ttl_seconds: env_parse_or("SESSION_TTL_SECONDS", 86_400),
            }),
            Environment::Test => Ok(SessionConfig {
                backend: env_or("SESSION_BACKEND", "memory").parse()?,
                redis_url: env_or("REDIS_URL", "redis://test-redis:6379/"),
                ttl_seconds: env_parse_or("SESSION_TTL_SECONDS", 3_600),
            }),
        }
    }

    fn load_realtime_config(_env: &Environment) -> RealtimeConfig {
        RealtimeConfig {
            channel_capacity: env_parse_or("REALTIME_CHANNEL_CAPACITY", 256),
        }
    }

    fn load_events_config(_env: &Environment) -> EventsConfig {
        EventsConfig {
            timezone_name: env_or("EVENTS_TIMEZONE", "UTC"),
        }
    }

    fn load_logging_config(env: &Environment) -> LoggingConfig {
        let default_filter = match env {
            Environment::Development => "debug",
            Environment::Test | Environment::Production => "info",
        };
        LoggingConfig {
            filter: env_or("RUST_LOG", default_filter),
        }
    }

    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.environment == Environment::Production {
            if self.storage.backend == StorageBackend::Memory {
                return Err("Production cannot use the in-memory event store".into());
            }
            if self.sessions.backend == SessionBackend::Memory {
                return Err("Production cannot use the in-memory session store".into());
            }
            if self.storage.password == "test" {
                return Err("Production database password cannot be 'test'".into());
            }
        }

        if self.server.port == 0 {
            return Err("Server port cannot be 0".into());
        }
        if self.server.workers == 0 {
            return Err("Worker count cannot be 0".into());
        }
        if self.realtime.channel_capacity == 0 {
            return Err("Realtime channel capacity cannot be 0".into());
        }
        if self.sessions.ttl_seconds == 0 {
            return Err("Session TTL cannot be 0".into());
        }
        if shared::dates::parse_timezone(&self.events.timezone_name).is_err() {
            return Err(format!("Unknown EVENTS_TIMEZONE: {}", self.events.timezone_name).into());
        }

        Ok(())
    }

    fn log_configuration(&self) {
        info!("Configuration loaded successfully");
        info!("Environment: {:?}", self.environment);
        info!("Server: {}:{} (workers: {})", self.server.host, self.server.port, self.server.workers);
        info!("Event store: {:?} ({} / {})", self.storage.backend, self.storage.url, self.storage.name);
        info!("Sessions: {:?} (ttl: {}s)", self.sessions.backend, self.sessions.ttl_seconds);
        info!("Realtime channel capacity: {}", self.realtime.channel_capacity);
        info!("Events time zone: {}", self.events.timezone_name);

        if self.environment == Environment::Development {
            warn!("Running in development mode - some security features are disabled");
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    pub(crate) fn test_config(environment: Environment) -> Config {
        Config {
            environment,
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 50002,
                workers: 1,
            },
            storage: StorageConfig {
                backend: StorageBackend::ArangoDb,
                url: "http://prod-arango:8529".to_string(),
                name: "events_prod".to_string(),
                username: "events".to_string(),
                password: "secure_password".to_string(),
                timeout_seconds: 60,
            },
            sessions: SessionConfig {
                backend: SessionBackend::Redis,
                redis_url: "redis://prod-redis:6379".to_string(),
                ttl_seconds: 3600,
            },
            realtime: RealtimeConfig { channel_capacity: 64 },
            events: EventsConfig {
                timezone_name: "Europe/Berlin".to_string(),
            },
            logging: LoggingConfig {
                filter: "info".to_string(),
            },
        }
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!("development".parse::<Environment>().unwrap(), Environment::Development);
        assert_eq!("dev".parse::<Environment>().unwrap(), Environment::Development);
        assert_eq!("TEST".parse::<Environment>().unwrap(), Environment::Test);
        assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Production);
        assert!("unknown".parse::<Environment>().is_err());
    }

    #[test]
    fn test_environment_default() {
        assert_eq!(Environment::default(), Environment::Development);
    }

    #[test]
    fn test_backend_parsing() {
        assert_eq!("arangodb".parse::<StorageBackend>().unwrap(), StorageBackend::ArangoDb);
        assert_eq!("Memory".parse::<StorageBackend>().unwrap(), StorageBackend::Memory);
        assert!("postgres".parse::<StorageBackend>().is_err());
        assert_eq!("redis".parse::<SessionBackend>().unwrap(), SessionBackend::Redis);
        assert!("memcached".parse::<SessionBackend>().is_err());
    }

    #[test]
    fn test_production_config_validation() {
        let config = test_config(Environment::Production);
        assert!(config.validate().is_ok());
        assert!(config.is_production());
        assert!(!config.is_development());
    }

    #[test]
    fn test_production_rejects_memory_backends() {
        let mut config = test_config(Environment::Production);
        config.storage.backend = StorageBackend::Memory;
        assert!(config.validate().is_err());

        let mut config = test_config(Environment::Production);
        config.sessions.backend = SessionBackend::Memory;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_memory_backends_allowed_in_development() {
        let mut config = test_config(Environment::Development);
        config.storage.backend = StorageBackend::Memory;
        config.sessions.backend = SessionBackend::Memory;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = test_config(Environment::Development);
        config.realtime.channel_capacity = 0;
        assert!(config.validate().is_err());

        let mut config = test_config(Environment::Development);
        config.events.timezone_name = "Mars/Olympus".to_string();
        assert!(config.validate().is_err());

        let mut config = test_config(Environment::Development);
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_events_timezone() {
        let config = test_config(Environment::Development);
        assert_eq!(config.events.timezone(), chrono_tz::Europe::Berlin);
    }

    #[test]
    fn test_parse_backend_url() {
        assert_eq!(
            Config::parse_backend_url("http://localhost:8080"),
            ("localhost".to_string(), 8080)
        );
        assert_eq!(
            Config::parse_backend_url("not a url"),
            ("127.0.0.1".to_string(), 50002)
        );
    }
}
