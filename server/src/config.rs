//! Server configuration loaded from the environment

use anyhow::{Context, Result};
use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

const DEFAULT_PORT: u16 = 3005;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Interface to bind (`TANDEM_BIND`, default 0.0.0.0)
    pub bind: IpAddr,
    /// Listen port (`PORT`, default 3005)
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. Unset keys fall back to defaults; set but
    /// unparseable keys are errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let bind = match lookup("TANDEM_BIND") {
            Some(raw) => raw
                .trim()
                .parse::<IpAddr>()
                .with_context(|| format!("TANDEM_BIND is not an IP address: {raw}"))?,
            None => defaults.bind,
        };

        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .with_context(|| format!("PORT is not a valid port: {raw}"))?,
            None => defaults.port,
        };

        Ok(Self { bind, port })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:3005");
    }

    #[test]
    fn reads_bind_and_port() {
        let config =
            Config::from_lookup(lookup(&[("TANDEM_BIND", "127.0.0.1"), ("PORT", " 8080 ")]))
                .unwrap();
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:8080");
    }

    #[test]
    fn bad_port_is_an_error() {
        let err = Config::from_lookup(lookup(&[("PORT", "99999")])).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }
}
