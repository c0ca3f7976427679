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

//! Named parameters with presets, morphing, sequencing and Open Sound Control.
//!
//! # Introduction
//!
//! Interactive audio and graphics programs are usually steered by a handful of numbers: a
//! position, a size, a filter cutoff. Paramorph gives each of those numbers a name and an address,
//! and builds a small control layer on top of them:
//!
//!  * [`parameter`](crate::parameter) - [`Parameter`](parameter::Parameter), a named `f32` value
//!    with a range that can be read and written from any thread.
//!
//!  * [`registry`](crate::registry) - A collection of parameters keyed by their addresses.
//!
//!  * [`morph`](crate::morph) - Linear interpolation of many parameters towards target values over
//!    a duration.
//!
//!  * [`preset`](crate::preset) - [`PresetHandler`](preset::PresetHandler), which stores snapshots
//!    of parameter values as `.preset` text files and morphs back to them when they are recalled.
//!
//!  * [`sequencer`](crate::sequencer) - [`PresetSequencer`](sequencer::PresetSequencer), which plays
//!    `.sequence` files: lists of presets with a morph time and a wait time for each.
//!
//!  * [`server`](crate::server) - OSC servers that let other programs set parameters, recall
//!    presets and play sequences over UDP.
//!
//!  * [`config`](crate::config) and [`surface`](crate::surface) - Describe all of the above in a
//!    JSON file and start it with one call.
//!
//! Nothing in this crate runs on its own clock. Morphs and sequences move forward only when the
//! application calls `advance` with the time that has passed, usually once per frame.
//!
//! # Examples
//!
//! ```no_run
//! use paramorph::{
//!     parameter::Parameter,
//!     preset::PresetHandler,
//!     sequencer::{PresetSequencer, Sequence, Step},
//!     server::ParameterServer,
//! };
//! use std::{sync::Arc, thread::sleep, time::Duration};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let x = Arc::new(Parameter::new("X", "Position", 0.0).with_range(-1.0, 1.0));
//!     let y = Arc::new(Parameter::new("Y", "Position", 0.0).with_range(-1.0, 1.0));
//!
//!     // Let an OSC controller move the parameters, and tell it when they change.
//!     let server = ParameterServer::bind("127.0.0.1:9010")?;
//!     server.register_all(vec![Arc::clone(&x), Arc::clone(&y)])?;
//!     server.add_listener("127.0.0.1:13560")?;
//!
//!     let handler = PresetHandler::new("sequencerPresets")?;
//!     handler.register_all(vec![Arc::clone(&x), Arc::clone(&y)])?;
//!
//!     // Store two corners.
//!     x.set(-1.0);
//!     y.set(-1.0);
//!     handler.store_preset("A")?;
//!     x.set(1.0);
//!     y.set(1.0);
//!     handler.store_preset("B")?;
//!
//!     // Sweep between them forever.
//!     let sequencer = PresetSequencer::new(handler);
//!     sequencer.store_sequence(&Sequence {
//!         name: "sweep".into(),
//!         steps: vec![
//!             Step::new("A", Duration::from_secs(2), Duration::from_secs(1)),
//!             Step::new("B", Duration::from_secs(2), Duration::from_secs(1)),
//!         ],
//!     })?;
//!
//!     loop {
//!         if !sequencer.is_playing() {
//!             sequencer.play_sequence("sweep")?;
//!         }
//!         sequencer.advance(Duration::from_millis(16));
//!         sleep(Duration::from_millis(16));
//!     }
//! }
//! ```

pub mod config;
pub mod morph;
pub mod parameter;
pub mod preset;
pub mod registry;
pub mod sequencer;
pub mod server;
pub mod surface;
