use std::env;
use std::net::{IpAddr, Ipv4Addr};

pub const DEFAULT_PROVIDER_BACKEND: &str = "docker";
pub const DEFAULT_ROOM_ID_LENGTH: usize = 6;
pub const DEFAULT_CREATE_MAX_ATTEMPTS: u32 = 64;
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 30;

pub const DEFAULT_HEALTH_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_HEALTH_GRACE_PERIOD_SECS: u64 = 60;
pub const DEFAULT_HEALTH_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_HEALTH_MAX_CONCURRENCY: usize = 8;

pub const DEFAULT_DOCKER_API_URL: &str = "http://127.0.0.1:2375";
pub const DEFAULT_DOCKER_API_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_ROOM_IMAGE: &str = "quiz-room:latest";
pub const DEFAULT_ROOM_NETWORK: &str = "quiz-rooms";
pub const DEFAULT_ROOM_CONTAINER_PREFIX: &str = "quizroom";
pub const DEFAULT_ROOM_CONTAINER_PORT: u16 = 3000;

pub const DEFAULT_STORE_BACKEND: &str = "mongodb";
pub const DEFAULT_MONGODB_URL: &str = "mongodb://127.0.0.1:27017";
pub const DEFAULT_MONGODB_DATABASE: &str = "quiz";

pub struct Config {
    pub server: ServerConfig,
    pub provider: ProviderConfig,
    pub docker: DockerConfig,
    pub store: StoreConfig,
    pub health: HealthConfig,
}

pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Controller-level settings: which backend provisions rooms and how
/// room codes are allocated.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Backend name: "docker", "cluster" or "kubernetes"
    pub backend: String,
    pub room_id_length: usize,
    pub create_max_attempts: u32,
    pub cleanup_interval_secs: u64,
}

/// Docker Engine API settings for the reference provider
#[derive(Debug, Clone)]
pub struct DockerConfig {
    pub api_url: String,
    pub api_timeout_secs: u64,
    /// Image every room container runs
    pub image: String,
    /// Docker network the room containers join; the room host is resolved
    /// through this network by container name
    pub network: String,
    pub container_prefix: String,
    /// Port the room runtime listens on inside its container
    pub room_port: u16,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// "mongodb" or "memory"
    pub backend: String,
    pub mongodb_url: String,
    pub mongodb_database: String,
}

#[derive(Debug, Clone)]
pub struct HealthConfig {
    pub interval_secs: u64,
    /// An empty room older than this is considered stale
    pub grace_period_secs: u64,
    pub request_timeout_secs: u64,
    /// Upper bound on concurrent health probes per pass
    pub max_concurrency: usize,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        Self {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("SERVER_PORT")
                    .unwrap_or_else(|_| "8080".to_string())
                    .parse()
                    .expect("Invalid SERVER_PORT"),
            },
            provider: ProviderConfig {
                backend: env::var("ROOM_PROVIDER")
                    .unwrap_or_else(|_| DEFAULT_PROVIDER_BACKEND.to_string())
                    .to_lowercase(),
                room_id_length: env_parse("ROOM_ID_LENGTH", DEFAULT_ROOM_ID_LENGTH),
                create_max_attempts: env_parse(
                    "ROOM_CREATE_MAX_ATTEMPTS",
                    DEFAULT_CREATE_MAX_ATTEMPTS,
                ),
                cleanup_interval_secs: env_parse(
                    "CLEANUP_INTERVAL_SECS",
                    DEFAULT_CLEANUP_INTERVAL_SECS,
                ),
            },
            docker: DockerConfig {
                api_url: env::var("DOCKER_API_URL")
                    .unwrap_or_else(|_| DEFAULT_DOCKER_API_URL.to_string()),
                api_timeout_secs: env_parse("DOCKER_API_TIMEOUT_SECS", DEFAULT_DOCKER_API_TIMEOUT_SECS),
                image: env::var("ROOM_IMAGE").unwrap_or_else(|_| DEFAULT_ROOM_IMAGE.to_string()),
                network: env::var("ROOM_NETWORK")
                    .unwrap_or_else(|_| DEFAULT_ROOM_NETWORK.to_string()),
                container_prefix: env::var("ROOM_CONTAINER_PREFIX")
                    .unwrap_or_else(|_| DEFAULT_ROOM_CONTAINER_PREFIX.to_string()),
                room_port: env_parse("ROOM_CONTAINER_PORT", DEFAULT_ROOM_CONTAINER_PORT),
            },
            store: StoreConfig {
                backend: env::var("ROOM_STORE")
                    .unwrap_or_else(|_| DEFAULT_STORE_BACKEND.to_string())
                    .to_lowercase(),
                mongodb_url: env::var("MONGODB_URL")
                    .unwrap_or_else(|_| DEFAULT_MONGODB_URL.to_string()),
                mongodb_database: env::var("MONGODB_DATABASE")
                    .unwrap_or_else(|_| DEFAULT_MONGODB_DATABASE.to_string()),
            },
            health: HealthConfig {
                interval_secs: env_parse("HEALTH_CHECK_INTERVAL_SECS", DEFAULT_HEALTH_INTERVAL_SECS),
                grace_period_secs: env_parse(
                    "HEALTH_GRACE_PERIOD_SECS",
                    DEFAULT_HEALTH_GRACE_PERIOD_SECS,
                ),
                request_timeout_secs: env_parse(
                    "HEALTH_REQUEST_TIMEOUT_SECS",
                    DEFAULT_HEALTH_TIMEOUT_SECS,
                ),
                max_concurrency: env_parse("HEALTH_MAX_CONCURRENCY", DEFAULT_HEALTH_MAX_CONCURRENCY),
            },
        }
    }

    pub fn bind_address(&self) -> ([u8; 4], u16) {
        let ip_addr = self.parse_host_to_ipv4();
        (ip_addr.octets(), self.server.port)
    }

    fn parse_host_to_ipv4(&self) -> Ipv4Addr {
        // Try to parse as IP address first
        if let Ok(addr) = self.server.host.parse::<IpAddr>() {
            match addr {
                IpAddr::V4(ipv4) => return ipv4,
                IpAddr::V6(_) => {
                    tracing::warn!(
                        host = %self.server.host,
                        "IPv6 address provided but only IPv4 supported, using 0.0.0.0"
                    );
                    return Ipv4Addr::new(0, 0, 0, 0);
                }
            }
        }

        // Handle common hostnames
        match self.server.host.as_str() {
            "localhost" => Ipv4Addr::new(127, 0, 0, 1),
            "" | "0.0.0.0" => Ipv4Addr::new(0, 0, 0, 0),
            _ => {
                tracing::warn!(
                    host = %self.server.host,
                    "Unable to parse host as IPv4, using 0.0.0.0"
                );
                Ipv4Addr::new(0, 0, 0, 0)
            }
        }
    }
}

/// Parses an env var, falling back to the default when unset or malformed
fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_host(host: &str, port: u16) -> Config {
        let mut config = Config::from_env();
        config.server = ServerConfig {
            host: host.to_string(),
            port,
        };
        config
    }

    #[test]
    fn test_parse_localhost() {
        let config = config_with_host("localhost", 8080);
        assert_eq!(config.bind_address(), ([127, 0, 0, 1], 8080));
    }

    #[test]
    fn test_parse_ipv4_address() {
        let config = config_with_host("192.168.1.1", 3000);
        assert_eq!(config.bind_address(), ([192, 168, 1, 1], 3000));
    }

    #[test]
    fn test_parse_all_interfaces() {
        let config = config_with_host("0.0.0.0", 8080);
        assert_eq!(config.bind_address(), ([0, 0, 0, 0], 8080));
    }

    #[test]
    fn test_parse_invalid_hostname_defaults_to_all() {
        let config = config_with_host("invalid-hostname", 9000);
        assert_eq!(config.bind_address(), ([0, 0, 0, 0], 9000));
    }

    #[test]
    fn test_env_parse_fallback() {
        assert_eq!(env_parse("NO_SUCH_VAR_FOR_SURE", 42u64), 42);
    }

    #[test]
    fn test_default_allocation_bounds() {
        assert_eq!(DEFAULT_ROOM_ID_LENGTH, 6);
        assert_eq!(DEFAULT_CLEANUP_INTERVAL_SECS, 30);
        assert_eq!(DEFAULT_HEALTH_GRACE_PERIOD_SECS, 60);
        assert!(DEFAULT_CREATE_MAX_ATTEMPTS > 0);
    }
}
