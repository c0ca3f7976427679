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

//! A complete control surface.
//!
//! [`ControlSurface`] wires parameters, a [`PresetHandler`], a [`PresetSequencer`] and any of the
//! OSC servers together, either by hand or from a [`ControlSurfaceConfig`].
//!
//! # Examples
//!
//! ```no_run
//! use paramorph::{config::ControlSurfaceConfig, surface::ControlSurface};
//! use std::{thread::sleep, time::Duration};
//!
//! let config = ControlSurfaceConfig::from_path("surface.json")?;
//! let surface = ControlSurface::from_config(&config)?;
//! println!("{}", surface);
//!
//! loop {
//!     surface.advance(Duration::from_millis(16));
//!     sleep(Duration::from_millis(16));
//! }
//! # #[allow(unreachable_code)]
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::{
    config::{self, ControlSurfaceConfig, ServerConfig},
    parameter::Parameter,
    preset::{self, PresetHandler},
    registry::{self, Registry},
    sequencer::PresetSequencer,
    server::{self, ParameterServer, PresetServer, SequenceServer},
};
use std::{fmt, path::PathBuf, sync::Arc, time::Duration};
use thiserror::Error;

/// A specialized [`Result`] type for building control surfaces.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type returned when a control surface cannot be built.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] config::Error),
    #[error(transparent)]
    Registry(#[from] registry::Error),
    #[error(transparent)]
    Preset(#[from] preset::Error),
    #[error("failed to start server on {bind}: {source}")]
    Server { bind: String, source: server::Error },
}

/// Parameters, presets, sequences and the servers that expose them.
pub struct ControlSurface {
    parameters: Registry,
    handler: PresetHandler,
    sequencer: PresetSequencer,
    parameter_server: Option<ParameterServer>,
    preset_server: Option<PresetServer>,
    sequence_server: Option<SequenceServer>,
}

impl fmt::Debug for ControlSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlSurface")
            .field("parameters", &self.parameters.addresses())
            .field("handler", &self.handler)
            .field("sequencer", &self.sequencer)
            .field("parameter_server", &self.parameter_server)
            .field("preset_server", &self.preset_server)
            .field("sequence_server", &self.sequence_server)
            .finish()
    }
}

impl fmt::Display for ControlSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Presets in: {}", self.handler.current_path().display())?;
        if let Some(server) = &self.parameter_server {
            write!(f, "{}", server)?;
        }
        if let Some(server) = &self.preset_server {
            write!(f, "{}", server)?;
        }
        if let Some(server) = &self.sequence_server {
            write!(f, "{}", server)?;
        }
        Ok(())
    }
}

impl ControlSurface {
    /// Creates a control surface with no parameters and no servers, keeping presets in
    /// `preset_directory`.
    ///
    /// # Errors
    ///
    /// Returns an error if the preset directory cannot be created or listed.
    pub fn new(preset_directory: impl Into<PathBuf>) -> Result<ControlSurface> {
        let handler = PresetHandler::new(preset_directory)?;
        let sequencer = PresetSequencer::new(handler.clone());
        Ok(ControlSurface {
            parameters: Registry::new(),
            handler,
            sequencer,
            parameter_server: None,
            preset_server: None,
            sequence_server: None,
        })
    }

    /// Builds and starts everything a configuration describes.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the preset directory cannot be used, two
    /// parameters share an address, or a server cannot be started.
    pub fn from_config(config: &ControlSurfaceConfig) -> Result<ControlSurface> {
        config.validate()?;

        let mut surface = ControlSurface::new(&config.preset_directory)?;
        surface.handler.set_morph_time(config.morph_duration());
        for parameter in config.parameters.iter() {
            surface.add_parameter(Arc::new(parameter.build()?))?;
        }

        if let Some(server_config) = &config.parameter_server {
            surface.start_parameter_server(server_config)?;
        }
        if let Some(server_config) = &config.preset_server {
            surface.start_preset_server(server_config)?;
        }
        if let Some(server_config) = &config.sequence_server {
            surface.start_sequence_server(server_config)?;
        }
        Ok(surface)
    }

    /// Adds a parameter to the surface, its presets and its parameter server.
    ///
    /// # Errors
    ///
    /// Returns an error if a different parameter is already registered at the same address.
    pub fn add_parameter(&mut self, parameter: Arc<Parameter>) -> Result<()> {
        self.parameters.register(Arc::clone(&parameter))?;
        self.handler.register(Arc::clone(&parameter))?;
        if let Some(server) = &self.parameter_server {
            server
                .register(parameter)
                .map_err(|source| Error::Server {
                    bind: local_addr_string(server.local_addr()),
                    source,
                })?;
        }
        Ok(())
    }

    /// Starts a [`ParameterServer`] exposing every parameter of the surface, replacing any
    /// previous one.
    pub fn start_parameter_server(&mut self, config: &ServerConfig) -> Result<&ParameterServer> {
        let server_error = |source| Error::Server {
            bind: config.bind.clone(),
            source,
        };
        let server = ParameterServer::bind(config.bind.as_str()).map_err(server_error)?;
        server
            .register_all(self.parameters.iter().cloned())
            .map_err(server_error)?;
        add_listeners(config, |listener| server.add_listener(listener)).map_err(server_error)?;
        Ok(self.parameter_server.insert(server))
    }

    /// Starts a [`PresetServer`] for the surface's handler, replacing any previous one.
    pub fn start_preset_server(&mut self, config: &ServerConfig) -> Result<&PresetServer> {
        let server_error = |source| Error::Server {
            bind: config.bind.clone(),
            source,
        };
        let server =
            PresetServer::bind(config.bind.as_str(), self.handler.clone()).map_err(server_error)?;
        if let Some(address) = &config.address {
            server.set_address(address.as_str());
        }
        add_listeners(config, |listener| server.add_listener(listener)).map_err(server_error)?;
        Ok(self.preset_server.insert(server))
    }

    /// Starts a [`SequenceServer`] for the surface's sequencer, replacing any previous one.
    pub fn start_sequence_server(&mut self, config: &ServerConfig) -> Result<&SequenceServer> {
        let server = SequenceServer::bind(config.bind.as_str(), self.sequencer.clone()).map_err(
            |source| Error::Server {
                bind: config.bind.clone(),
                source,
            },
        )?;
        if let Some(address) = &config.address {
            server.set_address(address.as_str());
        }
        if !config.listeners.is_empty() {
            log::warn!("sequence servers do not notify listeners, ignoring them");
        }
        Ok(self.sequence_server.insert(server))
    }

    /// Returns the parameter registered at `address`.
    pub fn parameter(&self, address: &str) -> Option<&Arc<Parameter>> {
        self.parameters.get(address)
    }

    pub fn parameters(&self) -> &Registry {
        &self.parameters
    }

    pub fn handler(&self) -> &PresetHandler {
        &self.handler
    }

    pub fn sequencer(&self) -> &PresetSequencer {
        &self.sequencer
    }

    pub fn parameter_server(&self) -> Option<&ParameterServer> {
        self.parameter_server.as_ref()
    }

    pub fn preset_server(&self) -> Option<&PresetServer> {
        self.preset_server.as_ref()
    }

    pub fn sequence_server(&self) -> Option<&SequenceServer> {
        self.sequence_server.as_ref()
    }

    /// Advances sequence playback and the current morph by `delta`.
    pub fn advance(&self, delta: Duration) {
        self.sequencer.advance(delta);
    }
}

fn add_listeners<F>(config: &ServerConfig, mut add: F) -> server::Result<()>
where
    F: FnMut(&str) -> server::Result<()>,
{
    for listener in config.listeners.iter() {
        add(listener.as_str())?;
    }
    Ok(())
}

fn local_addr_string(addr: server::Result<std::net::SocketAddr>) -> String {
    match addr {
        Ok(addr) => addr.to_string(),
        Err(_) => "unknown address".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempdir::TempDir;

    #[test]
    fn test_add_parameter() {
        let dir = TempDir::new("surface").unwrap();
        let mut surface = ControlSurface::new(dir.path()).unwrap();

        let x = Arc::new(Parameter::new("X", "Position", 0.0).with_range(-1.0, 1.0));
        surface.add_parameter(Arc::clone(&x)).unwrap();
        surface.add_parameter(Arc::clone(&x)).unwrap();

        let other = Arc::new(Parameter::new("X", "Position", 0.5));
        assert!(matches!(
            surface.add_parameter(other),
            Err(Error::Registry(registry::Error::DuplicateAddress(_)))
        ));

        assert_eq!(surface.parameters().addresses(), vec!["/Position/X"]);
        assert_eq!(surface.handler().registry().addresses(), vec!["/Position/X"]);
        assert!(Arc::ptr_eq(surface.parameter("/Position/X").unwrap(), &x));
        assert!(surface.parameter("/Position/Y").is_none());
    }

    #[test]
    fn test_advance_drives_morph() {
        let dir = TempDir::new("surface").unwrap();
        let mut surface = ControlSurface::new(dir.path()).unwrap();
        let x = Arc::new(Parameter::new("X", "Position", 0.0));
        surface.add_parameter(Arc::clone(&x)).unwrap();

        x.set(1.0);
        surface.handler().store_preset("one").unwrap();
        x.set(0.0);

        surface.handler().set_morph_time(Duration::from_secs(2));
        surface.handler().recall_preset("one").unwrap();
        surface.advance(Duration::from_secs(1));
        assert_eq!(x.get(), 0.5);
        surface.advance(Duration::from_secs(1));
        assert_eq!(x.get(), 1.0);
        assert!(!surface.handler().is_morphing());
    }
}
