use std::net::SocketAddr;
use std::path::Path;

use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use problem_details::ProblemsConfig;
use serde::{Deserialize, Serialize};

/// Prefix of environment overrides, e.g. `PROBLEMS__SERVER__BIND_ADDR`.
pub const ENV_PREFIX: &str = "PROBLEMS__";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8087".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is not set.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub problems: ProblemsConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            problems: ProblemsConfig {
                trace_key: Some("trace-id".to_owned()),
                trace_header: Some("x-request-id".to_owned()),
            },
        }
    }
}

impl AppConfig {
    /// Layered config: defaults -> YAML (if provided) -> env (`PROBLEMS__*`).
    ///
    /// # Errors
    /// Returns an error if a source cannot be read or the merged document
    /// does not match the schema.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::figment(path)
            .extract()
            .context("invalid configuration")
    }

    fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Replace the port of `server.bind_addr`.
    ///
    /// # Errors
    /// Returns an error if `bind_addr` is not a socket address.
    pub fn override_port(&mut self, port: u16) -> Result<()> {
        let mut addr: SocketAddr = self
            .server
            .bind_addr
            .parse()
            .with_context(|| format!("invalid bind_addr '{}'", self.server.bind_addr))?;
        addr.set_port(port);
        self.server.bind_addr = addr.to_string();
        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_enable_tracing() {
        Jail::expect_with(|_jail| {
            let cfg = AppConfig::load(None).map_err(|e| e.to_string())?;
            assert_eq!(cfg.server.bind_addr, "127.0.0.1:8087");
            assert_eq!(cfg.problems.trace_key.as_deref(), Some("trace-id"));
            assert_eq!(cfg.problems.trace_header.as_deref(), Some("x-request-id"));
            Ok(())
        });
    }

    #[test]
    fn yaml_then_env_override_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "problems.yaml",
                r#"
server:
  bind_addr: "0.0.0.0:9000"
problems:
  trace_key: correlation
"#,
            )?;
            jail.set_env("PROBLEMS__LOGGING__LEVEL", "debug");
            jail.set_env("PROBLEMS__PROBLEMS__TRACE_HEADER", "x-correlation-id");

            let cfg = AppConfig::load(Some(Path::new("problems.yaml"))).map_err(|e| e.to_string())?;
            assert_eq!(cfg.server.bind_addr, "0.0.0.0:9000");
            assert_eq!(cfg.logging.level, "debug");
            assert_eq!(cfg.problems.trace_key.as_deref(), Some("correlation"));
            assert_eq!(cfg.problems.trace_header.as_deref(), Some("x-correlation-id"));
            Ok(())
        });
    }

    #[test]
    fn unknown_keys_are_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("bad.yaml", "problems:\n  trace: x\n")?;
            assert!(AppConfig::load(Some(Path::new("bad.yaml"))).is_err());
            Ok(())
        });
    }

    #[test]
    fn port_override_keeps_host() {
        let mut cfg = AppConfig::default();
        cfg.override_port(9999).unwrap();
        assert_eq!(cfg.server.bind_addr, "127.0.0.1:9999");

        cfg.server.bind_addr = "not-an-addr".to_owned();
        assert!(cfg.override_port(1).is_err());
    }
}
