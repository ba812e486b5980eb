use config::{Config, Environment, Map};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::{AppError, Result};

pub const DEFAULT_LISTEN_ADDR: &str = ":8000";
pub const MYSQL_PORT: u16 = 3306;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub volume: VolumeConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
}

#[derive(Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
    pub root_ca_cert: PathBuf,
}

// Keeps the password out of startup logs and panics.
impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("root_ca_cert", &self.root_ca_cert)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct VolumeConfig {
    pub path: PathBuf,
}

/// Flat view of the process environment, one field per variable.
#[derive(Debug, Deserialize)]
struct EnvSettings {
    mysql_host: Option<String>,
    mysql_database: Option<String>,
    mysql_user: Option<String>,
    mysql_password: Option<String>,
    volume_path: Option<String>,
    root_ca_cert: Option<String>,
    listen_addr: String,
}

impl AppConfig {
    /// Loads the configuration from the process environment.
    pub fn load() -> Result<Self> {
        Self::from_environment(Environment::default())
    }

    /// Loads the configuration from an explicit variable map instead of the
    /// process environment. Keys use the same upper-case names.
    pub fn from_vars(vars: Map<String, String>) -> Result<Self> {
        Self::from_environment(Environment::default().source(Some(vars)))
    }

    fn from_environment(environment: Environment) -> Result<Self> {
        let settings: EnvSettings = Config::builder()
            .set_default("listen_addr", DEFAULT_LISTEN_ADDR)?
            .add_source(environment.ignore_empty(true))
            .build()?
            .try_deserialize()?;

        let config = AppConfig {
            server: ServerConfig {
                listen_addr: parse_listen_addr(&settings.listen_addr)?,
            },
            database: DatabaseConfig {
                host: required("MYSQL_HOST", settings.mysql_host)?,
                port: MYSQL_PORT,
                name: required("MYSQL_DATABASE", settings.mysql_database)?,
                user: required("MYSQL_USER", settings.mysql_user)?,
                password: required("MYSQL_PASSWORD", settings.mysql_password)?,
                root_ca_cert: required("ROOT_CA_CERT", settings.root_ca_cert)?.into(),
            },
            volume: VolumeConfig {
                path: required("VOLUME_PATH", settings.volume_path)?.into(),
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.host.contains('/') {
            return Err(AppError::Config(format!(
                "MYSQL_HOST must be a host name, got {:?}",
                self.database.host
            )));
        }

        if self.volume.path.is_relative() {
            tracing::warn!(
                path = %self.volume.path.display(),
                "VOLUME_PATH is relative to the working directory"
            );
        }

        Ok(())
    }

    pub fn bind_address(&self) -> SocketAddr {
        self.server.listen_addr
    }
}

fn required(var: &str, value: Option<String>) -> Result<String> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(AppError::Config(format!("missing required env var {}", var))),
    }
}

/// Accepts `host:port` or the bare `:port` form, which binds every interface.
fn parse_listen_addr(raw: &str) -> Result<SocketAddr> {
    let raw = raw.trim();
    let candidate = if raw.starts_with(':') {
        format!("0.0.0.0{}", raw)
    } else {
        raw.to_string()
    };

    candidate
        .parse()
        .map_err(|e| AppError::Config(format!("invalid LISTEN_ADDR {:?}: {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_vars() -> Map<String, String> {
        [
            ("MYSQL_HOST", "db.internal"),
            ("MYSQL_DATABASE", "app"),
            ("MYSQL_USER", "probe"),
            ("MYSQL_PASSWORD", "s3cret"),
            ("VOLUME_PATH", "/data"),
            ("ROOT_CA_CERT", "/etc/ssl/root-ca.pem"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn test_load_with_defaults() {
        let config = AppConfig::from_vars(base_vars()).unwrap();

        assert_eq!(config.database.host, "db.internal");
        assert_eq!(config.database.name, "app");
        assert_eq!(config.database.user, "probe");
        assert_eq!(config.database.password, "s3cret");
        assert_eq!(config.database.port, 3306);
        assert_eq!(config.database.root_ca_cert, PathBuf::from("/etc/ssl/root-ca.pem"));
        assert_eq!(config.volume.path, PathBuf::from("/data"));
        assert_eq!(config.bind_address(), "0.0.0.0:8000".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn test_listen_addr_override() {
        let mut vars = base_vars();
        vars.insert("LISTEN_ADDR".to_string(), "127.0.0.1:9090".to_string());

        let config = AppConfig::from_vars(vars).unwrap();
        assert_eq!(config.bind_address(), "127.0.0.1:9090".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn test_host_with_scheme_is_rejected() {
        let mut vars = base_vars();
        vars.insert("MYSQL_HOST".to_string(), "tcp://db.internal".to_string());

        assert!(AppConfig::from_vars(vars).is_err());
    }

    #[test]
    fn test_missing_required_variable_is_named() {
        for var in [
            "MYSQL_HOST",
            "MYSQL_DATABASE",
            "MYSQL_USER",
            "MYSQL_PASSWORD",
            "VOLUME_PATH",
            "ROOT_CA_CERT",
        ] {
            let mut vars = base_vars();
            vars.remove(var);

            let err = AppConfig::from_vars(vars).unwrap_err();
            assert!(matches!(err, AppError::Config(_)));
            assert!(err.to_string().contains(var), "error should name {}: {}", var, err);
        }
    }

    #[test]
    fn test_empty_required_variable_counts_as_missing() {
        let mut vars = base_vars();
        vars.insert("VOLUME_PATH".to_string(), String::new());

        let err = AppConfig::from_vars(vars).unwrap_err();
        assert!(err.to_string().contains("VOLUME_PATH"));
    }

    #[test]
    fn test_invalid_listen_addr() {
        let mut vars = base_vars();
        vars.insert("LISTEN_ADDR".to_string(), "not-an-address".to_string());

        assert!(AppConfig::from_vars(vars).is_err());
    }

    #[test]
    fn test_parse_listen_addr_forms() {
        let cases = [
            (":8000", "0.0.0.0:8000"),
            ("127.0.0.1:3000", "127.0.0.1:3000"),
            ("[::1]:8080", "[::1]:8080"),
        ];
        for (value, expected) in cases {
            let expected: SocketAddr = expected.parse().unwrap();
            assert_eq!(parse_listen_addr(value).unwrap(), expected);
        }
        assert!(parse_listen_addr("8000").is_err());
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = AppConfig::from_vars(base_vars()).unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("<redacted>"));
    }
}
