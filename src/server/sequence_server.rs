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
    private::{self, lock, Endpoint},
    Result, DEFAULT_SEQUENCE_ADDRESS,
};
use crate::sequencer::PresetSequencer;
use std::{
    fmt,
    net::{SocketAddr, ToSocketAddrs},
    sync::{Arc, Mutex},
};

/// Exposes a [`PresetSequencer`] over OSC.
///
/// Plays the named sequence when it receives a string at `/sequence`, for example
/// `/sequence demo` plays `demo.sequence`. The address can be changed with
/// [`set_address`](SequenceServer::set_address).
#[derive(Clone)]
pub struct SequenceServer(Arc<SequenceServerInner>);

struct SequenceServerInner {
    endpoint: Arc<Endpoint>,
    sequencer: PresetSequencer,
    address: Mutex<String>,
}

impl Drop for SequenceServerInner {
    fn drop(&mut self) {
        self.endpoint.shutdown();
    }
}

impl fmt::Debug for SequenceServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequenceServer")
            .field("local_addr", &self.local_addr().ok())
            .field("address", &self.address())
            .field("sequencer", &self.0.sequencer)
            .finish()
    }
}

impl fmt::Display for SequenceServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.local_addr() {
            Ok(addr) => writeln!(f, "Sequence server listening on: {}", addr)?,
            Err(_) => writeln!(f, "Sequence server not listening")?,
        }
        writeln!(f, "Communicating on path: {}", self.address())
    }
}

impl SequenceServer {
    /// Starts a server for `sequencer` listening for OSC messages on the given UDP address.
    ///
    /// # Errors
    ///
    /// Returns an error if the UDP socket cannot be bound or the background thread cannot be
    /// started.
    pub fn bind<A: ToSocketAddrs>(
        address: A,
        sequencer: PresetSequencer,
    ) -> Result<SequenceServer> {
        let endpoint = Arc::new(Endpoint::bind(address)?);
        private::spawn_recv_loop(Arc::clone(&endpoint), "sequence-server")?;

        let server = SequenceServer(Arc::new(SequenceServerInner {
            endpoint,
            sequencer,
            address: Mutex::new(DEFAULT_SEQUENCE_ADDRESS.to_owned()),
        }));
        server.install_routes();
        log::info!("sequence server listening on {:?}", server.local_addr().ok());
        Ok(server)
    }

    /// Changes the OSC address the server responds on.
    pub fn set_address(&self, address: impl Into<String>) {
        *lock(&self.0.address) = address.into();
        self.install_routes();
    }

    pub fn address(&self) -> String {
        lock(&self.0.address).clone()
    }

    /// Returns the sequencer this server controls.
    pub fn sequencer(&self) -> &PresetSequencer {
        &self.0.sequencer
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.0.endpoint.local_addr()
    }

    /// Stops the server's background thread.
    pub fn shutdown(&self) {
        self.0.endpoint.shutdown();
    }

    fn install_routes(&self) {
        let mut router = self.0.endpoint.router();
        router.clear();

        let sequencer = self.0.sequencer.clone();
        router
            .addr(self.address())
            .capture("name")
            .handle(move |args| {
                let name = args.string("name")?;
                if let Err(err) = sequencer.play_sequence(&name) {
                    log::warn!("playing sequence {:?}: {}", name, err);
                }
                Some(())
            });
    }
}
