// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rack-modbus-logger project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Logger configuration
//!
//! The only configurable state is the rack directory: which rack ids exist
//! and where they answer on the network. The built-in default is the
//! deployment's ten racks on `192.168.1.160`-`169`; a YAML file given with
//! `--config` replaces the whole table.
//!
//! # Example
//!
//! ```yaml
//! racks:
//!   - id: A
//!     host: 192.168.1.160
//!   - id: B
//!     host: 192.168.1.161
//!     port: 502
//! ```

use std::net::{IpAddr, SocketAddr};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::directory::{DirectoryError, RackDirectory, RackId};

/// Standard Modbus/TCP port.
pub const DEFAULT_MODBUS_PORT: u16 = 502;

fn default_port() -> u16 {
    DEFAULT_MODBUS_PORT
}

/// One rack directory entry: a rack id and the endpoint it answers on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RackEntry {
    /// Rack identifier, `A` through `J`.
    pub id: RackId,
    /// IPv4 or IPv6 address of the rack controller.
    pub host: String,
    /// TCP port of the rack controller (default: 502).
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Top-level configuration for the logger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// The rack directory entries, in polling order.
    pub racks: Vec<RackEntry>,
}

impl Default for Config {
    /// The deployment's fixed fleet: racks `A`..`J` on
    /// `192.168.1.160`..`169`, port 502.
    fn default() -> Self {
        let racks = RackId::ALL
            .iter()
            .enumerate()
            .map(|(index, id)| RackEntry {
                id: *id,
                host: format!("192.168.1.{}", 160 + index),
                port: DEFAULT_MODBUS_PORT,
            })
            .collect();
        Self { racks }
    }
}

impl Config {
    /// Load a configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
        let config: Config = serde_yml::from_str(&contents)
            .with_context(|| format!("Failed to parse configuration file {}", path.display()))?;
        Ok(config)
    }

    /// Validate the entries and build the rack directory from them.
    pub fn build_directory(&self) -> Result<RackDirectory, ConfigError> {
        if self.racks.is_empty() {
            return Err(ConfigError::EmptyDirectory);
        }

        let mut entries = Vec::with_capacity(self.racks.len());
        for entry in &self.racks {
            let ip: IpAddr = entry
                .host
                .parse()
                .map_err(|_| ConfigError::InvalidHost {
                    rack_id: entry.id,
                    host: entry.host.clone(),
                })?;
            entries.push((entry.id, SocketAddr::new(ip, entry.port)));
        }

        RackDirectory::new(entries).map_err(ConfigError::Directory)
    }
}

/// Errors turning a [`Config`] into a usable rack directory.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("the rack directory is empty - at least one rack must be configured")]
    EmptyDirectory,
    #[error("rack {rack_id} has an invalid host address: {host}")]
    InvalidHost { rack_id: RackId, host: String },
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_builds_ten_racks() {
        let directory = Config::default().build_directory().unwrap();
        assert_eq!(directory.len(), 10);
        assert_eq!(
            directory.address_of(RackId::D).unwrap(),
            "192.168.1.163:502".parse().unwrap()
        );
    }

    #[test]
    fn test_yaml_round_trip() {
        let yaml = "racks:\n  - id: A\n    host: 127.0.0.1\n    port: 1502\n  - id: B\n    host: 127.0.0.2\n";
        let config: Config = serde_yml::from_str(yaml).unwrap();
        assert_eq!(config.racks.len(), 2);
        assert_eq!(config.racks[1].port, DEFAULT_MODBUS_PORT);

        let directory = config.build_directory().unwrap();
        assert_eq!(
            directory.address_of(RackId::A).unwrap(),
            "127.0.0.1:1502".parse().unwrap()
        );
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "racks:").unwrap();
        writeln!(file, "  - id: C").unwrap();
        writeln!(file, "    host: 10.1.2.3").unwrap();
        file.flush().unwrap();

        let config = Config::from_file(file.path()).unwrap();
        let directory = config.build_directory().unwrap();
        assert_eq!(directory.len(), 1);
        assert_eq!(
            directory.address_of(RackId::C).unwrap(),
            "10.1.2.3:502".parse().unwrap()
        );
    }

    #[test]
    fn test_invalid_host_is_rejected() {
        let config = Config {
            racks: vec![RackEntry {
                id: RackId::A,
                host: "not-an-address".into(),
                port: 502,
            }],
        };
        assert!(matches!(
            config.build_directory(),
            Err(ConfigError::InvalidHost { .. })
        ));
    }

    #[test]
    fn test_empty_directory_is_rejected() {
        let config = Config { racks: Vec::new() };
        assert!(matches!(
            config.build_directory(),
            Err(ConfigError::EmptyDirectory)
        ));
    }
}
