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

//! Remote control over Open Sound Control (OSC).
//!
//! This module exposes parameters, presets and sequences to other programs, such as a browser
//! based control surface or a tablet running an OSC controller, using OSC messages over
//! [UDP]. It provides three servers:
//!
//! * [`ParameterServer`] - Sets registered parameters when it receives a message with a number at
//!   a parameter's [address](crate::parameter::Parameter::address), for example
//!   `/Position/X 0.5`. Every change to a registered parameter, wherever it comes from, is sent to
//!   the server's listeners in the same form.
//! * [`PresetServer`] - Recalls presets by index when it receives `/preset <index>` and sets the
//!   morph time when it receives `/preset/morphTime <seconds>`. Listeners are told about recalls
//!   and morph time changes.
//! * [`SequenceServer`] - Plays the named sequence when it receives `/sequence <name>`.
//!
//! Each server listens on its own UDP socket and handles incoming messages on a background thread.
//! Servers are cheap to clone and safe to use from several threads. The background threads stop
//! when [`shutdown`](ParameterServer::shutdown) is called or the last clone of the server is
//! dropped.
//!
//! Listeners are added with `add_listener`. Notifications are sent from a background thread, so
//! they never hold up the code that changed a parameter.
//!
//! # Examples
//!
//! ```no_run
//! use paramorph::{parameter::Parameter, server::ParameterServer};
//! use std::sync::Arc;
//!
//! let x = Arc::new(Parameter::new("X", "Position", 0.0).with_range(-1.0, 1.0));
//!
//! let server = ParameterServer::bind("127.0.0.1:9010")?;
//! server.register(Arc::clone(&x))?;
//! server.add_listener("127.0.0.1:13560")?;
//! println!("{}", server);
//! # paramorph::server::Result::Ok(())
//! ```
//!
//! [UDP]: https://en.wikipedia.org/wiki/User_Datagram_Protocol

mod osc_router;
mod parameter_server;
mod preset_server;
mod private;
mod sequence_server;

pub use parameter_server::ParameterServer;
pub use preset_server::PresetServer;
pub use sequence_server::SequenceServer;

use crate::registry;
use rosc::OscError;
use std::{error, fmt, io, net::SocketAddr};

/// The default OSC address of a [`PresetServer`].
pub const DEFAULT_PRESET_ADDRESS: &str = "/preset";

/// The default OSC address of a [`SequenceServer`].
pub const DEFAULT_SEQUENCE_ADDRESS: &str = "/sequence";

/// The suffix appended to a [`PresetServer`]'s address to set the morph time.
pub const MORPH_TIME_SUFFIX: &str = "/morphTime";

/// A specialized [`Result`] type for server operations.
///
/// Most of the functions and methods that can fail in this module return this type.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type returned by server operations.
#[derive(Debug)]
pub struct Error(ErrorInner);

// Kept private so that rosc's error type does not become part of the public API.
#[derive(Debug)]
enum ErrorInner {
    UdpBind(io::Error),
    Resolve(io::Error),
    Send(io::Error),
    Recv(io::Error),
    Spawn(io::Error),
    OscDecode(OscError),
    OscEncode(OscError),
    Registry(registry::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            ErrorInner::UdpBind(e) => write!(f, "binding to UDP socket: {}", e),
            ErrorInner::Resolve(e) => write!(f, "resolving listener address: {}", e),
            ErrorInner::Send(e) => write!(f, "sending message to listener: {}", e),
            ErrorInner::Recv(e) => write!(f, "receiving message: {}", e),
            ErrorInner::Spawn(e) => write!(f, "starting server thread: {}", e),
            ErrorInner::OscDecode(e) => write!(f, "decoding OSC packet: {:?}", e),
            ErrorInner::OscEncode(_) => write!(f, "encoding OSC packet"),
            ErrorInner::Registry(e) => write!(f, "registering parameter: {}", e),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.0 {
            ErrorInner::UdpBind(e) => Some(e),
            ErrorInner::Resolve(e) => Some(e),
            ErrorInner::Send(e) => Some(e),
            ErrorInner::Recv(e) => Some(e),
            ErrorInner::Spawn(e) => Some(e),
            ErrorInner::OscDecode(_) => None,
            ErrorInner::OscEncode(_) => None,
            ErrorInner::Registry(e) => Some(e),
        }
    }
}

impl From<registry::Error> for Error {
    fn from(err: registry::Error) -> Error {
        Error(ErrorInner::Registry(err))
    }
}

// Writes the "Registered listeners" section shared by each server's `Display` output.
fn write_listeners(f: &mut fmt::Formatter<'_>, listeners: &[SocketAddr]) -> fmt::Result {
    writeln!(f, "Registered listeners:")?;
    for listener in listeners {
        writeln!(f, "{}", listener)?;
    }
    Ok(())
}
