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
    write_listeners, Result, DEFAULT_PRESET_ADDRESS, MORPH_TIME_SUFFIX,
};
use crate::preset::{PresetEvent, PresetHandler};
use std::{
    fmt,
    net::{SocketAddr, ToSocketAddrs},
    sync::{Arc, Mutex},
    time::Duration,
};

/// Exposes a [`PresetHandler`] over OSC.
///
/// By default the server recalls presets when it receives an int or float preset index at
/// `/preset`, and sets the morph time when it receives a float number of seconds at
/// `/preset/morphTime`. The address can be changed with [`set_address`](PresetServer::set_address).
///
/// Listeners receive `/preset <index>` whenever an indexed preset is recalled and
/// `/preset/morphTime <seconds>` whenever the morph time changes, whether the change came from
/// this server or anywhere else.
#[derive(Clone)]
pub struct PresetServer(Arc<PresetServerInner>);

struct PresetServerInner {
    endpoint: Arc<Endpoint>,
    handler: PresetHandler,
    address: Arc<Mutex<String>>,
}

impl Drop for PresetServerInner {
    fn drop(&mut self) {
        self.endpoint.shutdown();
    }
}

impl fmt::Debug for PresetServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PresetServer")
            .field("local_addr", &self.local_addr().ok())
            .field("address", &self.address())
            .field("handler", &self.0.handler)
            .field("listeners", &self.listeners())
            .finish()
    }
}

impl fmt::Display for PresetServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.local_addr() {
            Ok(addr) => writeln!(f, "Preset server listening on: {}", addr)?,
            Err(_) => writeln!(f, "Preset server not listening")?,
        }
        writeln!(f, "Communicating on path: {}", self.address())?;
        write_listeners(f, &self.listeners())
    }
}

impl PresetServer {
    /// Starts a server for `handler` listening for OSC messages on the given UDP address.
    ///
    /// # Errors
    ///
    /// Returns an error if the UDP socket cannot be bound or the background threads cannot be
    /// started.
    pub fn bind<A: ToSocketAddrs>(address: A, handler: PresetHandler) -> Result<PresetServer> {
        let endpoint = Arc::new(Endpoint::bind(address)?);
        let osc_address = Arc::new(Mutex::new(DEFAULT_PRESET_ADDRESS.to_owned()));

        let events = handler.subscribe();
        let notify_address = Arc::clone(&osc_address);
        private::spawn_recv_loop(Arc::clone(&endpoint), "preset-server")?;
        private::spawn_notifier(
            Arc::clone(&endpoint),
            "preset-server-notifier",
            events,
            move |event| {
                let address = lock(&notify_address).clone();
                match event {
                    PresetEvent::Recalled {
                        index: Some(index), ..
                    } => Some(Message::addr(address).arg(index).into_packet()),
                    PresetEvent::MorphTimeChanged(morph_time) => Some(
                        Message::addr(address + MORPH_TIME_SUFFIX)
                            .arg(morph_time.as_secs_f32())
                            .into_packet(),
                    ),
                    _ => None,
                }
            },
        )?;

        let server = PresetServer(Arc::new(PresetServerInner {
            endpoint,
            handler,
            address: osc_address,
        }));
        server.install_routes();
        log::info!("preset server listening on {:?}", server.local_addr().ok());
        Ok(server)
    }

    /// Changes the OSC address the server responds on. The morph time address becomes
    /// `<address>/morphTime`.
    pub fn set_address(&self, address: impl Into<String>) {
        *lock(&self.0.address) = address.into();
        self.install_routes();
    }

    pub fn address(&self) -> String {
        lock(&self.0.address).clone()
    }

    /// Returns the handler this server controls.
    pub fn handler(&self) -> &PresetHandler {
        &self.0.handler
    }

    /// Adds a listener that is notified of preset recalls and morph time changes.
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

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.0.endpoint.local_addr()
    }

    /// Stops the server's background threads.
    pub fn shutdown(&self) {
        self.0.endpoint.shutdown();
    }

    fn install_routes(&self) {
        let address = self.address();
        let mut router = self.0.endpoint.router();
        router.clear();

        let handler = self.0.handler.clone();
        router
            .addr(address.clone())
            .capture("index")
            .handle(move |args| {
                let index = args.int("index")?;
                if let Err(err) = handler.recall_preset_index(index) {
                    log::warn!("recalling preset {}: {}", index, err);
                }
                Some(())
            });

        let handler = self.0.handler.clone();
        router
            .addr(address + MORPH_TIME_SUFFIX)
            .capture("seconds")
            .handle(move |args| {
                let seconds = args.float("seconds")?;
                handler.set_morph_time(seconds_to_duration(seconds));
                Some(())
            });
    }
}

// Negative and NaN times become zero; times too large for a Duration saturate.
fn seconds_to_duration(seconds: f32) -> Duration {
    if seconds.is_nan() || seconds <= 0.0 {
        Duration::ZERO
    } else {
        Duration::try_from_secs_f32(seconds).unwrap_or(Duration::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_to_duration() {
        assert_eq!(seconds_to_duration(1.5), Duration::from_millis(1500));
        assert_eq!(seconds_to_duration(-2.0), Duration::ZERO);
        assert_eq!(seconds_to_duration(f32::NAN), Duration::ZERO);
        assert_eq!(seconds_to_duration(f32::INFINITY), Duration::MAX);
    }
}
