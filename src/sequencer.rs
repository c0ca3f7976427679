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

//! Timed playback of preset recalls.
//!
//! A [`PresetSequencer`] reads sequence files from the preset directory of the
//! [`PresetHandler`] it is attached to and recalls their presets over time. Each step of a
//! [`Sequence`] names a preset, the time it takes to morph to that preset, and the time to hold
//! the preset once the morph time has passed. See the [`format`] module for the file format.
//!
//! Like the handler, the sequencer keeps no clock of its own. The application calls
//! [`PresetSequencer::advance`] from its update loop with the time that passed since the last
//! call. This advances both the playing sequence and the handler's morph. Time left over when a
//! morph or wait ends inside one call carries into the next phase, so playback follows the same
//! timeline whatever the size of the steps.
//!
//! Only one sequence plays at a time. Playing a sequence while another is playing abandons the
//! first one immediately.
//!
//! # Examples
//!
//! ```no_run
//! use paramorph::{preset::PresetHandler, sequencer::PresetSequencer};
//! use std::time::Duration;
//!
//! let handler = PresetHandler::new("sequencerPresets")?;
//! let sequencer = PresetSequencer::new(handler);
//!
//! // Plays sequencerPresets/demo.sequence.
//! sequencer.play_sequence("demo")?;
//! while sequencer.is_playing() {
//!     sequencer.advance(Duration::from_millis(16));
//! #   break;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod format;

pub use format::{ParseError, Sequence, Step};

use crate::preset::{self, PresetHandler};
use std::{
    fmt, fs, io,
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};
use thiserror::Error;

/// The file extension of sequence files.
pub const SEQUENCE_EXTENSION: &str = "sequence";

/// A specialized [`Result`] type for sequencer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type returned by [`PresetSequencer`] operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("sequence {name:?} not found at {path}")]
    NotFound { name: String, path: PathBuf },
    #[error("invalid sequence name {name:?}")]
    InvalidName { name: String },
    #[error("failed to read sequence {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write sequence {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("failed to list sequence directory {path}: {source}")]
    ReadDirectory { path: PathBuf, source: io::Error },
    #[error("malformed sequence {path}: {source}")]
    Malformed { path: PathBuf, source: ParseError },
}

impl Error {
    /// Returns `true` if the error was caused by a missing sequence file.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

/// The part of a step that is playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Morphing to the step's preset.
    Morphing,
    /// Holding the step's preset after the morph completed.
    Waiting,
}

/// What a [`PresetSequencer`] is doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequencerState {
    Idle,
    Playing {
        /// The name of the playing sequence.
        sequence: String,
        /// The index of the current step.
        step: usize,
        phase: Phase,
    },
}

/// Plays sequences of presets on a [`PresetHandler`].
///
/// `PresetSequencer` is cheap to clone; clones control the same playback. See [the module level
/// documentation](self) for more.
#[derive(Clone)]
pub struct PresetSequencer(Arc<SequencerInner>);

struct SequencerInner {
    state: Mutex<SequencerData>,
}

struct SequencerData {
    handler: PresetHandler,
    playback: Option<Playback>,
}

#[derive(Debug)]
struct Playback {
    sequence: Sequence,
    step: usize,
    phase: Phase,
    // Time left in the current phase.
    remaining: Duration,
}

impl fmt::Debug for PresetSequencer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.lock();
        f.debug_struct("PresetSequencer")
            .field("directory", &data.handler.current_path())
            .field("playback", &data.playback)
            .finish()
    }
}

impl PresetSequencer {
    /// Creates a sequencer attached to `handler`.
    pub fn new(handler: PresetHandler) -> PresetSequencer {
        PresetSequencer(Arc::new(SequencerInner {
            state: Mutex::new(SequencerData {
                handler,
                playback: None,
            }),
        }))
    }

    /// Attaches the sequencer to a different handler, stopping any playing sequence.
    pub fn attach(&self, handler: PresetHandler) {
        self.stop();
        self.lock().handler = handler;
    }

    /// Returns the handler the sequencer is attached to.
    pub fn handler(&self) -> PresetHandler {
        self.lock().handler.clone()
    }

    /// Reads `<preset directory>/<name>.sequence`.
    ///
    /// # Errors
    ///
    /// * Returns [`Error::NotFound`] if the file does not exist, or if `name` is not a plain file
    ///   name.
    /// * Returns [`Error::Read`] if the file cannot be read.
    /// * Returns [`Error::Malformed`] if the file cannot be decoded.
    pub fn load_sequence(&self, name: &str) -> Result<Sequence> {
        let path = self.sequence_path(name);
        if !preset::is_valid_name(name) {
            return Err(Error::NotFound {
                name: name.to_owned(),
                path,
            });
        }
        let text = fs::read_to_string(&path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                Error::NotFound {
                    name: name.to_owned(),
                    path: path.clone(),
                }
            } else {
                Error::Read {
                    path: path.clone(),
                    source,
                }
            }
        })?;
        Sequence::parse(name, &text).map_err(|source| Error::Malformed { path, source })
    }

    /// Writes a sequence file named after the sequence into the preset directory.
    ///
    /// # Errors
    ///
    /// * Returns [`Error::InvalidName`] if the sequence name is not a plain file name.
    /// * Returns [`Error::Write`] if the file cannot be written.
    pub fn store_sequence(&self, sequence: &Sequence) -> Result<()> {
        if !preset::is_valid_name(&sequence.name) {
            return Err(Error::InvalidName {
                name: sequence.name.clone(),
            });
        }
        let path = self.sequence_path(&sequence.name);
        preset::write_atomically(&path, &sequence.to_string())
            .map_err(|source| Error::Write { path, source })?;
        log::info!("stored sequence {:?}", sequence.name);
        Ok(())
    }

    /// Returns the sorted names of the sequences in the preset directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReadDirectory`] if the directory cannot be listed.
    pub fn sequence_names(&self) -> Result<Vec<String>> {
        let directory = self.handler().current_path().to_owned();
        let mut names = preset::list_files(&directory, SEQUENCE_EXTENSION)
            .map_err(|source| Error::ReadDirectory {
                path: directory,
                source,
            })?;
        names.sort();
        Ok(names)
    }

    /// Loads the named sequence and starts playing it from its first step.
    ///
    /// The first preset is recalled before this method returns; if its morph time is zero the
    /// parameters already hold its values. A sequence that was playing is abandoned where it is.
    ///
    /// # Errors
    ///
    /// See [`load_sequence`](PresetSequencer::load_sequence). When an error is returned, any
    /// sequence that was already playing keeps playing.
    pub fn play_sequence(&self, name: &str) -> Result<()> {
        let sequence = self.load_sequence(name)?;
        self.play(sequence);
        Ok(())
    }

    /// Starts playing an already loaded sequence from its first step.
    pub fn play(&self, sequence: Sequence) {
        let mut data = self.lock();
        if let Some(previous) = data.playback.take() {
            log::info!("abandoning sequence {:?}", previous.sequence.name);
        }
        log::info!("playing sequence {:?}", sequence.name);

        let mut playback = Playback {
            sequence,
            step: 0,
            phase: Phase::Morphing,
            remaining: Duration::ZERO,
        };
        let handler = data.handler.clone();
        data.playback = if playback.sequence.steps.is_empty() {
            log::info!("sequence {:?} has no steps", playback.sequence.name);
            None
        } else {
            playback.start_step(&handler);
            playback.run(&handler, Duration::ZERO)
        };
    }

    /// Stops playback. Parameters stay at whatever values they have reached.
    pub fn stop(&self) {
        let mut data = self.lock();
        if let Some(playback) = data.playback.take() {
            log::info!("stopped sequence {:?}", playback.sequence.name);
            data.handler.cancel_morph();
        }
    }

    /// Advances playback and the attached handler's morph by `delta`.
    ///
    /// Call this periodically from the application's update loop. It is safe to call when nothing
    /// is playing, in which case it only advances the handler's morph.
    pub fn advance(&self, delta: Duration) {
        let mut data = self.lock();
        let handler = data.handler.clone();
        data.playback = match data.playback.take() {
            Some(playback) => playback.run(&handler, delta),
            None => {
                handler.advance(delta);
                None
            }
        };
    }

    pub fn state(&self) -> SequencerState {
        match self.lock().playback {
            Some(ref playback) => SequencerState::Playing {
                sequence: playback.sequence.name.clone(),
                step: playback.step,
                phase: playback.phase,
            },
            None => SequencerState::Idle,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.lock().playback.is_some()
    }

    fn sequence_path(&self, name: &str) -> PathBuf {
        self.handler()
            .current_path()
            .join(format!("{}.{}", name, SEQUENCE_EXTENSION))
    }

    fn lock(&self) -> MutexGuard<'_, SequencerData> {
        self.0
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Playback {
    fn current(&self) -> &Step {
        &self.sequence.steps[self.step]
    }

    // Recalls the current step's preset. The morph phase lasts the step's morph time whatever the
    // handler's morph does. A preset that cannot be recalled skips straight to the wait.
    fn start_step(&mut self, handler: &PresetHandler) {
        let step = self.current().clone();
        log::debug!(
            "sequence {:?} step {}: {:?}",
            self.sequence.name,
            self.step,
            step
        );
        handler.set_morph_time(step.morph_time);
        match handler.recall_preset(&step.preset) {
            Ok(()) => {
                self.phase = Phase::Morphing;
                self.remaining = step.morph_time;
            }
            Err(err) => {
                log::warn!(
                    "sequence {:?} step {}: {}",
                    self.sequence.name,
                    self.step,
                    err
                );
                self.begin_wait();
            }
        }
    }

    fn begin_wait(&mut self) {
        self.phase = Phase::Waiting;
        self.remaining = self.current().wait_time;
    }

    // Spends `delta` on the playback, moving through as many phases and steps as it covers. The
    // handler's morph is advanced by the same amounts. Returns None once the last step's wait has
    // elapsed.
    fn run(mut self, handler: &PresetHandler, mut delta: Duration) -> Option<Playback> {
        loop {
            if delta < self.remaining {
                self.remaining -= delta;
                handler.advance(delta);
                return Some(self);
            }
            delta -= self.remaining;
            handler.advance(self.remaining);
            self.remaining = Duration::ZERO;

            match self.phase {
                Phase::Morphing => self.begin_wait(),
                Phase::Waiting => {
                    self.step += 1;
                    if self.step >= self.sequence.steps.len() {
                        log::info!("sequence {:?} finished", self.sequence.name);
                        handler.advance(delta);
                        return None;
                    }
                    self.start_step(handler);
                }
            }
        }
    }
}
