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

use super::{
    private::{self, lock, Endpoint, Message},
    write_listeners, Result,
};
use crate::{
    parameter::{Parameter, ParameterChange},
    registry::Registry,
};
use std::{
    fmt,
    net::{SocketAddr, ToSocketAddrs},
    sync::{mpsc, Arc, Mutex},
};

/// Exposes parameters over OSC.
///
/// See [the module level documentation](super) for more.
#[derive(Clone)]
pub struct ParameterServer(Arc<ParameterServerInner>);

struct ParameterServerInner {
    endpoint: Arc<Endpoint>,
    registry: Mutex<Registry>,
    changes: Mutex<mpsc::Sender<ParameterChange>>,
}

impl Drop for ParameterServerInner {
    fn drop(&mut self) {
        self.endpoint.shutdown();
    }
}

impl fmt::Debug for ParameterServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterServer")
            .field("local_addr", &self.local_addr().ok())
            .field("parameters", &lock(&self.0.registry).addresses())
            .field("listeners", &self.listeners())
            .finish()
    }
}

impl fmt::Display for ParameterServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.local_addr() {
            Ok(addr) => writeln!(f, "Parameter server listening on: {}", addr)?,
            Err(_) => writeln!(f, "Parameter server not listening")?,
        }
        writeln!(f, "Registered parameters:")?;
        for parameter in lock(&self.0.registry).iter() {
            writeln!(
                f,
                "Parameter {} : {}",
                parameter.name(),
                parameter.address()
            )?;
        }
        write_listeners(f, &self.listeners())
    }
}

impl ParameterServer {
    /// Starts a server listening for OSC messages on the given UDP address.
    ///
    /// # Errors
    ///
    /// Returns an error if the UDP socket cannot be bound or the background threads cannot be
    /// started.
    pub fn bind<A: ToSocketAddrs>(address: A) -> Result<ParameterServer> {
        let endpoint = Arc::new(Endpoint::bind(address)?);
        let (changes, receiver) = mpsc::channel();

        private::spawn_recv_loop(Arc::clone(&endpoint), "parameter-server")?;
        private::spawn_notifier(
            Arc::clone(&endpoint),
            "parameter-server-notifier",
            receiver,
            |change: ParameterChange| {
                Some(
                    Message::addr(&*change.address)
                        .arg(change.value)
                        .into_packet(),
                )
            },
        )?;

        let server = ParameterServer(Arc::new(ParameterServerInner {
            endpoint,
            registry: Mutex::new(Registry::new()),
            changes: Mutex::new(changes),
        }));
        log::info!("parameter server listening on {:?}", server.local_addr().ok());
        Ok(server)
    }

    /// Exposes a parameter at its address.
    ///
    /// Numeric OSC arguments of any type are accepted and clamped by [`Parameter::set`].
    ///
    /// # Errors
    ///
    /// Returns an error if a different parameter is already registered at the same address.
    pub fn register(&self, parameter: Arc<Parameter>) -> Result<()> {
        let mut registry = lock(&self.0.registry);
        if registry.contains(parameter.address()) {
            return Ok(registry.register(parameter)?);
        }
        registry.register(Arc::clone(&parameter))?;

        let target = Arc::clone(&parameter);
        self.0
            .endpoint
            .router()
            .addr(parameter.address())
            .capture("value")
            .handle(move |args| {
                let value = args.float("value")?;
                target.set(value);
                Some(())
            });
        parameter.subscribe_with(lock(&self.0.changes).clone());
        Ok(())
    }

    /// Registers each parameter in order, stopping at the first error.
    pub fn register_all<I>(&self, parameters: I) -> Result<()>
    where
        I: IntoIterator<Item = Arc<Parameter>>,
    {
        for parameter in parameters {
            self.register(parameter)?;
        }
        Ok(())
    }

    /// Adds a listener that is sent every change of a registered parameter.
    ///
    /// # Errors
    ///
    /// Returns an error if `address` cannot be resolved.
    pub fn add_listener<A: ToSocketAddrs>(&self, address: A) -> Result<()> {
        self.0.endpoint.add_listener(address)
    }

    pub fn listeners(&self) -> Vec<SocketAddr> {
        self.0.endpoint.listeners()
    }

    /// Returns the addresses of the registered parameters.
    pub fn addresses(&self) -> Vec<String> {
        lock(&self.0.registry)
            .addresses()
            .into_iter()
            .map(str::to_owned)
            .collect()
    }

    /// Returns the address of the server's UDP socket.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.0.endpoint.local_addr()
    }

    /// Stops the server's background threads.
    pub fn shutdown(&self) {
        self.0.endpoint.shutdown();
    }
}
