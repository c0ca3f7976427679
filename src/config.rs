// Paramorph
// Copyright (C) 2021  Wesley Merkel
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! JSON descriptions of control surfaces.
//!
//! A [`ControlSurfaceConfig`] lists the parameters of a control surface, where its presets are
//! kept, and which OSC servers to start. It is turned into a running
//! [`ControlSurface`](crate::surface::ControlSurface) with
//! [`ControlSurface::from_config`](crate::surface::ControlSurface::from_config).
//!
//! ```json
//! {
//!   "preset_directory": "sequencerPresets",
//!   "morph_time": 2.0,
//!   "parameters": [
//!     { "name": "X", "group": "Position", "default": 0.0, "min": -1.0, "max": 1.0 },
//!     { "name": "Y", "group": "Position", "default": 0.0, "min": -1.0, "max": 1.0 },
//!     { "name": "Scale", "group": "Size", "default": 1.0, "min": 0.1, "max": 3.0 }
//!   ],
//!   "parameter_server": { "bind": "127.0.0.1:9010", "listeners": ["127.0.0.1:13560"] },
//!   "preset_server": { "bind": "127.0.0.1:9011" },
//!   "sequence_server": { "bind": "127.0.0.1:9012", "address": "/sequence" }
//! }
//! ```
//!
//! Everything except `preset_directory` and each parameter's `name`, `group` and `default` is
//! optional.

use crate::parameter::{self, Parameter};
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};
use thiserror::Error;

/// A specialized [`Result`] type for reading configurations.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type returned when a configuration cannot be read.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read config {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("parameter {address} has an invalid range [{min}, {max}]")]
    InvalidRange { address: String, min: f32, max: f32 },
    #[error("invalid morph time {0}")]
    InvalidMorphTime(f64),
}

/// A control surface description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControlSurfaceConfig {
    /// The directory presets and sequences are kept in.
    pub preset_directory: PathBuf,

    /// The initial morph time in seconds.
    #[serde(default)]
    pub morph_time: f64,

    #[serde(default)]
    pub parameters: Vec<ParameterConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter_server: Option<ServerConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset_server: Option<ServerConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_server: Option<ServerConfig>,
}

/// The description of a single [`Parameter`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParameterConfig {
    pub name: String,
    pub group: String,
    #[serde(default)]
    pub prefix: String,
    pub default: f32,
    #[serde(default = "default_min")]
    pub min: f32,
    #[serde(default = "default_max")]
    pub max: f32,
}

/// Where an OSC server listens and who it notifies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// The UDP address to listen on, for example `127.0.0.1:9010`.
    pub bind: String,

    /// The OSC address to respond on. Only used by preset and sequence servers. Each server has
    /// its own default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// UDP addresses to send notifications to.
    #[serde(default)]
    pub listeners: Vec<String>,
}

fn default_min() -> f32 {
    parameter::DEFAULT_MIN
}

fn default_max() -> f32 {
    parameter::DEFAULT_MAX
}

impl ControlSurfaceConfig {
    /// Creates a configuration with no parameters and no servers.
    pub fn new(preset_directory: impl Into<PathBuf>) -> ControlSurfaceConfig {
        ControlSurfaceConfig {
            preset_directory: preset_directory.into(),
            morph_time: 0.0,
            parameters: Vec::new(),
            parameter_server: None,
            preset_server: None,
            sequence_server: None,
        }
    }

    /// Reads a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Read`] if the file cannot be read, and the errors of
    /// [`validate`](ControlSurfaceConfig::validate) otherwise.
    pub fn from_path(path: impl AsRef<Path>) -> Result<ControlSurfaceConfig> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_owned(),
            source,
        })?;
        text.parse()
    }

    /// Encodes the configuration as pretty printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks the values that JSON decoding cannot.
    ///
    /// # Errors
    ///
    /// * Returns [`Error::InvalidRange`] if a parameter's `min` is greater than its `max`.
    /// * Returns [`Error::InvalidMorphTime`] if the morph time is negative or not finite.
    pub fn validate(&self) -> Result<()> {
        if !self.morph_time.is_finite() || self.morph_time < 0.0 {
            return Err(Error::InvalidMorphTime(self.morph_time));
        }
        for parameter in self.parameters.iter() {
            if !(parameter.min <= parameter.max) {
                return Err(Error::InvalidRange {
                    address: parameter::address(
                        &parameter.prefix,
                        &parameter.group,
                        &parameter.name,
                    ),
                    min: parameter.min,
                    max: parameter.max,
                });
            }
        }
        Ok(())
    }

    /// The morph time as a [`Duration`]. Invalid morph times are treated as zero.
    pub fn morph_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.morph_time).unwrap_or(Duration::ZERO)
    }
}

impl FromStr for ControlSurfaceConfig {
    type Err = Error;

    /// Decodes and [validates](ControlSurfaceConfig::validate) a JSON configuration.
    fn from_str(json: &str) -> Result<ControlSurfaceConfig> {
        let config: ControlSurfaceConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

impl ParameterConfig {
    /// Builds the described parameter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRange`] if `min` is greater than `max`.
    pub fn build(&self) -> Result<Parameter> {
        let parameter = Parameter::new(self.name.clone(), self.group.clone(), self.default)
            .with_prefix(self.prefix.clone());
        if !(self.min <= self.max) {
            return Err(Error::InvalidRange {
                address: parameter.address().to_owned(),
                min: self.min,
                max: self.max,
            });
        }
        Ok(parameter.with_range(self.min, self.max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config: ControlSurfaceConfig = r#"{
            "preset_directory": "presets",
            "parameters": [{ "name": "X", "group": "Position", "default": 0.5 }]
        }"#
        .parse()
        .unwrap();

        assert_eq!(
            config,
            ControlSurfaceConfig {
                parameters: vec![ParameterConfig {
                    name: "X".into(),
                    group: "Position".into(),
                    prefix: "".into(),
                    default: 0.5,
                    min: parameter::DEFAULT_MIN,
                    max: parameter::DEFAULT_MAX,
                }],
                ..ControlSurfaceConfig::new("presets")
            }
        );
        assert_eq!(config.morph_duration(), Duration::ZERO);
    }

    #[test]
    fn test_full() {
        let config: ControlSurfaceConfig = r#"{
            "preset_directory": "sequencerPresets",
            "morph_time": 2.0,
            "parameters": [
                { "name": "Scale", "group": "Size", "prefix": "cone", "default": 1.0, "min": 0.1, "max": 3.0 }
            ],
            "parameter_server": { "bind": "127.0.0.1:9010", "listeners": ["127.0.0.1:13560"] },
            "preset_server": { "bind": "127.0.0.1:9011", "address": "/scene" }
        }"#
        .parse()
        .unwrap();

        assert_eq!(config.morph_duration(), Duration::from_secs(2));
        assert_eq!(
            config.parameter_server,
            Some(ServerConfig {
                bind: "127.0.0.1:9010".into(),
                address: None,
                listeners: vec!["127.0.0.1:13560".into()],
            })
        );
        assert_eq!(
            config.preset_server.as_ref().and_then(|s| s.address.as_deref()),
            Some("/scene")
        );
        assert_eq!(config.sequence_server, None);

        let size = config.parameters[0].build().unwrap();
        assert_eq!(size.address(), "/coneSize/Scale");
        assert_eq!((size.min(), size.max(), size.get()), (0.1, 3.0, 1.0));

        let reparsed: ControlSurfaceConfig = config.to_json().unwrap().parse().unwrap();
        assert_eq!(reparsed, config);
    }

    #[test]
    fn test_invalid() {
        let bad_range = r#"{
            "preset_directory": "p",
            "parameters": [{ "name": "X", "group": "G", "default": 0, "min": 1, "max": -1 }]
        }"#;
        match bad_range.parse::<ControlSurfaceConfig>() {
            Err(Error::InvalidRange { address, .. }) => assert_eq!(address, "/G/X"),
            other => panic!("unexpected {:?}", other),
        }

        let bad_morph = r#"{ "preset_directory": "p", "morph_time": -1 }"#;
        assert!(matches!(
            bad_morph.parse::<ControlSurfaceConfig>(),
            Err(Error::InvalidMorphTime(_))
        ));

        let unknown_field = r#"{ "preset_directory": "p", "colour": "red" }"#;
        assert!(matches!(
            unknown_field.parse::<ControlSurfaceConfig>(),
            Err(Error::Parse(_))
        ));
    }
}
