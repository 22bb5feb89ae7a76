//! Server configuration.
//!
//! There is exactly one knob: where to listen. Everything else (TLS, body
//! limits, timeouts) is the reverse proxy's job.

use std::net::SocketAddr;

use crate::error::Error;

/// Environment variable read by [`Config::from_env`].
pub const ADDR_ENV: &str = "LAPSE_ADDR";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub addr: SocketAddr,
}

impl Config {
    /// Reads `LAPSE_ADDR`, falling back to `0.0.0.0:3000` when it is unset.
    pub fn from_env() -> Result<Self, Error> {
        match std::env::var(ADDR_ENV) {
            Ok(raw) => Self::parse(&raw),
            Err(std::env::VarError::NotPresent) => Ok(Self::default()),
            Err(e) => Err(Error::Config(format!("{ADDR_ENV}: {e}"))),
        }
    }

    fn parse(raw: &str) -> Result<Self, Error> {
        let addr = raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("{ADDR_ENV}={raw:?}: {e}")))?;
        Ok(Self { addr })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self { addr: SocketAddr::from(([0, 0, 0, 0], 3000)) }
    }
}
