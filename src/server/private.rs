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

use super::{osc_router::Router, Error, ErrorInner, Result};
use rosc::{decoder::decode, encoder::encode, OscMessage, OscPacket, OscType};
use std::{
    io,
    net::{SocketAddr, ToSocketAddrs, UdpSocket},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard,
    },
    thread,
    time::Duration,
};

// How often background loops wake up to check whether the server was shut down.
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

pub struct Message(OscMessage);

impl Message {
    pub fn addr(addr: impl Into<String>) -> Message {
        Message(OscMessage {
            addr: addr.into(),
            args: Vec::new(),
        })
    }

    pub fn arg<T: Into<OscType>>(mut self, arg: T) -> Message {
        self.0.args.push(arg.into());
        self
    }

    pub fn into_packet(self) -> OscPacket {
        OscPacket::Message(self.0)
    }
}

/// A bound UDP socket, its listeners and the routes for incoming messages.
pub struct Endpoint {
    socket: UdpSocket,
    listeners: Mutex<Vec<SocketAddr>>,
    router: Mutex<Router<()>>,
    running: AtomicBool,
}

impl Endpoint {
    pub fn bind<A: ToSocketAddrs>(address: A) -> Result<Endpoint> {
        let socket = UdpSocket::bind(address).map_err(|err| Error(ErrorInner::UdpBind(err)))?;
        socket
            .set_read_timeout(Some(POLL_INTERVAL))
            .map_err(|err| Error(ErrorInner::UdpBind(err)))?;
        Ok(Endpoint {
            socket,
            listeners: Mutex::new(Vec::new()),
            router: Mutex::new(Router::default()),
            running: AtomicBool::new(true),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket
            .local_addr()
            .map_err(|err| Error(ErrorInner::UdpBind(err)))
    }

    pub fn add_listener<A: ToSocketAddrs>(&self, address: A) -> Result<()> {
        let resolved = address
            .to_socket_addrs()
            .map_err(|err| Error(ErrorInner::Resolve(err)))?
            .next()
            .ok_or_else(|| {
                Error(ErrorInner::Resolve(io::Error::new(
                    io::ErrorKind::NotFound,
                    "no addresses found",
                )))
            })?;
        let mut listeners = lock(&self.listeners);
        if !listeners.contains(&resolved) {
            listeners.push(resolved);
        }
        Ok(())
    }

    pub fn listeners(&self) -> Vec<SocketAddr> {
        lock(&self.listeners).clone()
    }

    pub fn router(&self) -> MutexGuard<'_, Router<()>> {
        lock(&self.router)
    }

    /// Sends a packet to every listener.
    pub fn broadcast(&self, packet: OscPacket) -> Result<()> {
        log::debug!("broadcast: {:?}", packet);
        let bytes = encode(&packet).map_err(|err| Error(ErrorInner::OscEncode(err)))?;
        for listener in self.listeners() {
            self.socket
                .send_to(&bytes, listener)
                .map_err(|err| Error(ErrorInner::Send(err)))?;
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn shutdown(&self) {
        self.running.store(false, Ordering::Release);
    }

    // Returns None when the read times out.
    fn recv(&self, buffer: &mut [u8]) -> Result<Option<OscPacket>> {
        let (len, from) = match self.socket.recv_from(buffer) {
            Ok(received) => received,
            Err(err)
                if err.kind() == io::ErrorKind::WouldBlock
                    || err.kind() == io::ErrorKind::TimedOut =>
            {
                return Ok(None)
            }
            Err(err) => return Err(Error(ErrorInner::Recv(err))),
        };
        let packet = decode(&buffer[..len]).map_err(|err| Error(ErrorInner::OscDecode(err)))?;
        log::debug!("recv from {}: {:?}", from, packet);
        Ok(Some(packet))
    }

    fn dispatch(&self, packet: OscPacket) {
        match packet {
            OscPacket::Message(message) => {
                if self.router().route(&message).is_none() {
                    log::warn!("ignoring unroutable message: {:?}", message);
                }
            }
            OscPacket::Bundle(bundle) => {
                for packet in bundle.content {
                    self.dispatch(packet);
                }
            }
        }
    }
}

/// Routes incoming packets on a background thread until the endpoint is shut down.
pub fn spawn_recv_loop(endpoint: Arc<Endpoint>, name: &str) -> Result<()> {
    thread::Builder::new()
        .name(name.to_owned())
        .spawn(move || {
            const MTU: usize = 65536;
            let mut buffer = vec![0_u8; MTU];

            while endpoint.is_running() {
                match endpoint.recv(&mut buffer) {
                    Ok(Some(packet)) => endpoint.dispatch(packet),
                    Ok(None) => {}
                    Err(err) => log::error!("error receiving next packet: {}", err),
                }
            }
            log::debug!("receive loop stopped");
        })
        .map(drop)
        .map_err(|err| Error(ErrorInner::Spawn(err)))
}

/// Forwards each item received from `items` to the endpoint's listeners on a background thread.
///
/// The thread stops when the endpoint is shut down or all senders are dropped.
pub fn spawn_notifier<T, F>(
    endpoint: Arc<Endpoint>,
    name: &str,
    items: std::sync::mpsc::Receiver<T>,
    to_packet: F,
) -> Result<()>
where
    T: Send + 'static,
    F: Fn(T) -> Option<OscPacket> + Send + 'static,
{
    use std::sync::mpsc::RecvTimeoutError;

    thread::Builder::new()
        .name(name.to_owned())
        .spawn(move || {
            while endpoint.is_running() {
                match items.recv_timeout(POLL_INTERVAL) {
                    Ok(item) => {
                        if let Some(packet) = to_packet(item) {
                            if let Err(err) = endpoint.broadcast(packet) {
                                log::error!("error notifying listeners: {}", err);
                            }
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            log::debug!("notifier stopped");
        })
        .map(drop)
        .map_err(|err| Error(ErrorInner::Spawn(err)))
}

pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
