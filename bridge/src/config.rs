// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Interfaces for parsing configuration files and working with the bridge
//! server configuration
//!
//! Example TOML:
//!
//! ```toml
//! [dropshot]
//! bind_address = "127.0.0.1:8787"
//!
//! [log]
//! mode = "stderr-terminal"
//! level = "info"
//!
//! [bridge]
//! region = "nova"
//! external_url = "http://localhost:8787"
//! backend = "sim"
//! ```

use dropshot::ConfigDropshot;
use dropshot::ConfigLogging;
use serde::Deserialize;
use serde::Serialize;
use std::path::Path;
use std::path::PathBuf;
use thiserror::Error;

/// Configuration for a bridge server
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    /// Dropshot configuration for the external API server
    #[serde(default)]
    pub dropshot: ConfigDropshot,
    /// Server-wide logging configuration
    pub log: ConfigLogging,
    /// Bridge-specific settings
    #[serde(default)]
    pub bridge: BridgeConfig,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct BridgeConfig {
    /// Name of the single region the backing cloud is exposed as
    pub region: String,
    /// URL base used when rendering `selfLink`/`targetLink` fields
    pub external_url: String,
    /// Which backend implementation to wire up
    pub backend: BackendMode,
}

impl Default for BridgeConfig {
    fn default() -> BridgeConfig {
        BridgeConfig {
            region: String::from("nova"),
            external_url: String::from("http://localhost"),
            backend: BackendMode::Sim,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    /// In-memory simulated cloud; also used by the test suite
    Sim,
}

impl Config {
    /// Load a `Config` from the given TOML file
    pub fn from_file(path: &Path) -> Result<Config, LoadError> {
        let file_contents = std::fs::read_to_string(path)
            .map_err(|err| LoadError::Io { path: path.into(), err })?;
        let config_parsed: Config = toml::from_str(&file_contents)
            .map_err(|err| LoadError::Parse { path: path.into(), err })?;
        Ok(config_parsed)
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("error reading \"{path}\": {err}")]
    Io {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error("error parsing \"{path}\": {err}")]
    Parse {
        path: PathBuf,
        #[source]
        err: toml::de::Error,
    },
}
