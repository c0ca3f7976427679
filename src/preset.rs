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

//! Storing, recalling and morphing between presets.
//!
//! A [`PresetHandler`] groups a set of [parameters](crate::parameter::Parameter) and stores
//! snapshots of their values, called presets, as plain text files inside a preset directory. When a
//! preset is recalled the parameters are not set immediately. Instead they are "morphed", linearly
//! interpolated from their current values to the preset's values over the handler's morph time.
//!
//! Presets are identified by a label, which is also the name of the file (`<label>.preset`), and
//! can optionally be given a numeric index so they can be recalled by number, for example from a
//! number key or from an OSC message. See the [`format`] module for the file format.
//!
//! # Examples
//!
//! ```no_run
//! use paramorph::{parameter::Parameter, preset::PresetHandler};
//! use std::{sync::Arc, time::Duration};
//!
//! let x = Arc::new(Parameter::new("X", "Position", 0.0).with_range(-1.0, 1.0));
//! let handler = PresetHandler::new("sequencerPresets")?
//!     .with_morph_time(Duration::from_secs(2));
//! handler.register(Arc::clone(&x))?;
//!
//! x.set(0.5);
//! handler.store_preset_indexed(1, "1")?;
//!
//! x.set(-0.5);
//! handler.recall_preset_index(1)?;
//!
//! // Call this from the application's update loop.
//! handler.advance(Duration::from_millis(16));
//! # paramorph::preset::Result::Ok(())
//! ```
//!
//! # Sharing
//!
//! `PresetHandler` is a handle to shared state and is cheap to clone. Clones given to a
//! [`PresetSequencer`](crate::sequencer::PresetSequencer) or a
//! [`PresetServer`](crate::server::PresetServer) all operate on the same presets, registry and
//! morph.

pub mod format;

pub use format::{ParseError, Preset};

use crate::{
    morph::MorphEngine,
    parameter::Parameter,
    registry::{self, Registry},
};
use std::{
    collections::BTreeMap,
    fmt, fs, io,
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex, MutexGuard},
    time::Duration,
};
use thiserror::Error;

/// The file extension of preset files.
pub const PRESET_EXTENSION: &str = "preset";

/// A specialized [`Result`] type for preset operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type returned by [`PresetHandler`] operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to create preset directory {path}: {source}")]
    CreateDirectory { path: PathBuf, source: io::Error },
    #[error("failed to list preset directory {path}: {source}")]
    ReadDirectory { path: PathBuf, source: io::Error },
    #[error("preset {label:?} not found at {path}")]
    NotFound { label: String, path: PathBuf },
    #[error("invalid preset label {label:?}")]
    InvalidLabel { label: String },
    #[error("failed to read preset {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write preset {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("malformed preset {path}: {source}")]
    Malformed { path: PathBuf, source: ParseError },
    #[error(transparent)]
    Registry(#[from] registry::Error),
}

impl Error {
    /// Returns `true` if the error was caused by a missing preset file.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

/// A notification sent to [subscribers](PresetHandler::subscribe) of a handler.
#[derive(Debug, Clone, PartialEq)]
pub enum PresetEvent {
    /// A preset was written to disk.
    Stored { label: String, index: Option<i32> },
    /// A preset was read and its morph started.
    Recalled { label: String, index: Option<i32> },
    /// The morph time used by subsequent recalls changed.
    MorphTimeChanged(Duration),
}

/// Stores and recalls presets for a group of parameters.
///
/// See [the module level documentation](self) for more.
#[derive(Clone)]
pub struct PresetHandler(Arc<HandlerInner>);

struct HandlerInner {
    directory: PathBuf,
    state: Mutex<HandlerState>,
}

#[derive(Default)]
struct HandlerState {
    registry: Registry,
    morph: MorphEngine,
    morph_time: Duration,
    labels_by_index: BTreeMap<i32, String>,
    indexes_by_label: BTreeMap<String, i32>,
    subscribers: Vec<mpsc::Sender<PresetEvent>>,
}

impl fmt::Debug for PresetHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("PresetHandler")
            .field("directory", &self.0.directory)
            .field("parameters", &state.registry.addresses())
            .field("morph_time", &state.morph_time)
            .field("morphing", &state.morph.is_morphing())
            .finish()
    }
}

impl PresetHandler {
    /// Creates a handler that keeps its presets in `directory`.
    ///
    /// The directory is created if it does not exist. The headers of any preset files already in
    /// the directory are read so that their indexes can be used with
    /// [`recall_preset_index`](PresetHandler::recall_preset_index). The morph time starts at zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or listed.
    pub fn new(directory: impl Into<PathBuf>) -> Result<PresetHandler> {
        let directory = directory.into();
        fs::create_dir_all(&directory).map_err(|source| Error::CreateDirectory {
            path: directory.clone(),
            source,
        })?;
        let handler = PresetHandler(Arc::new(HandlerInner {
            directory,
            state: Mutex::new(HandlerState::default()),
        }));
        handler.rescan()?;
        Ok(handler)
    }

    /// Sets the initial morph time.
    pub fn with_morph_time(self, morph_time: Duration) -> PresetHandler {
        self.lock().morph_time = morph_time;
        self
    }

    /// Returns the directory presets are stored in.
    ///
    /// Sequence files for a [`PresetSequencer`](crate::sequencer::PresetSequencer) are kept in
    /// the same directory.
    pub fn current_path(&self) -> &Path {
        &self.0.directory
    }

    /// Adds a parameter to the set of parameters stored in presets.
    ///
    /// Presets that were stored before the parameter was registered do not contain it, so
    /// recalling them leaves the parameter unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Registry`] if a different parameter is registered at the same address.
    pub fn register(&self, parameter: Arc<Parameter>) -> Result<()> {
        self.lock().registry.register(parameter)?;
        Ok(())
    }

    /// Registers each parameter in order, stopping at the first error.
    pub fn register_all<I>(&self, parameters: I) -> Result<()>
    where
        I: IntoIterator<Item = Arc<Parameter>>,
    {
        self.lock().registry.register_all(parameters)?;
        Ok(())
    }

    /// Returns a copy of the registered parameters.
    pub fn registry(&self) -> Registry {
        self.lock().registry.clone()
    }

    /// Stores the current parameter values under `label`.
    ///
    /// Overwrites any existing preset with the same label. If the label already had an index, the
    /// index is kept.
    ///
    /// # Errors
    ///
    /// * Returns [`Error::InvalidLabel`] if `label` is empty or is not a plain file name.
    /// * Returns [`Error::Write`] if the preset file cannot be written.
    ///
    /// Neither the preset directory nor the handler are changed when an error is returned.
    pub fn store_preset(&self, label: &str) -> Result<()> {
        let index = self.lock().indexes_by_label.get(label).copied();
        self.store(index, label)
    }

    /// Stores the current parameter values under `label` with a numeric index.
    ///
    /// The index replaces any index the label had before, and the label replaces any label
    /// previously stored under the index.
    ///
    /// # Errors
    ///
    /// See [`store_preset`](PresetHandler::store_preset).
    pub fn store_preset_indexed(&self, index: i32, label: &str) -> Result<()> {
        self.store(Some(index), label)
    }

    fn store(&self, index: Option<i32>, label: &str) -> Result<()> {
        if !is_valid_name(label) {
            return Err(Error::InvalidLabel {
                label: label.to_owned(),
            });
        }
        let preset = {
            let state = self.lock();
            Preset {
                label: label.to_owned(),
                index,
                values: state
                    .registry
                    .iter()
                    .map(|parameter| (parameter.address().to_owned(), parameter.get()))
                    .collect(),
            }
        };

        let path = self.preset_path(label);
        write_atomically(&path, &preset.to_string())
            .map_err(|source| Error::Write { path, source })?;
        log::info!("stored preset {:?} (index {:?})", label, index);

        let mut state = self.lock();
        state.map_index(label, index);
        state.publish(PresetEvent::Stored {
            label: label.to_owned(),
            index,
        });
        Ok(())
    }

    /// Recalls the preset stored under `label`, morphing the parameters to its values.
    ///
    /// Values for addresses that are not registered are ignored. Registered parameters that are
    /// missing from the preset keep their current values.
    ///
    /// # Errors
    ///
    /// * Returns [`Error::NotFound`] if there is no preset with this label, or if the label is not
    ///   a plain file name.
    /// * Returns [`Error::Read`] if the preset file cannot be read.
    /// * Returns [`Error::Malformed`] if the preset file cannot be decoded.
    ///
    /// Parameter values are not changed when an error is returned.
    pub fn recall_preset(&self, label: &str) -> Result<()> {
        let preset = self.load_preset(label)?;

        let mut state = self.lock();
        let targets: Vec<_> = preset
            .values
            .iter()
            .filter_map(|(address, value)| match state.registry.get(address) {
                Some(parameter) => Some((Arc::clone(parameter), *value)),
                None => {
                    log::debug!("preset {:?} ignores unregistered {}", label, address);
                    None
                }
            })
            .collect();
        let morph_time = state.morph_time;
        state.morph.begin(targets, morph_time);
        log::info!("recalling preset {:?} over {:?}", label, morph_time);

        if preset.index.is_some() {
            state.map_index(label, preset.index);
        }
        let index = state.indexes_by_label.get(label).copied();
        state.publish(PresetEvent::Recalled {
            label: label.to_owned(),
            index,
        });
        Ok(())
    }

    /// Recalls the preset stored under a numeric index.
    ///
    /// If no preset is known by this index, the index's decimal representation is used as the
    /// label, which matches presets stored with equal indexes and labels.
    ///
    /// # Errors
    ///
    /// See [`recall_preset`](PresetHandler::recall_preset).
    pub fn recall_preset_index(&self, index: i32) -> Result<()> {
        let label = self.label_for_index(index);
        self.recall_preset(&label)
    }

    /// Reads and decodes a preset without recalling it.
    ///
    /// # Errors
    ///
    /// See [`recall_preset`](PresetHandler::recall_preset).
    pub fn load_preset(&self, label: &str) -> Result<Preset> {
        if !is_valid_name(label) {
            return Err(Error::NotFound {
                label: label.to_owned(),
                path: self.0.directory.clone(),
            });
        }
        let path = self.preset_path(label);
        let text = fs::read_to_string(&path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                Error::NotFound {
                    label: label.to_owned(),
                    path: path.clone(),
                }
            } else {
                Error::Read {
                    path: path.clone(),
                    source,
                }
            }
        })?;
        Preset::parse(label, &text).map_err(|source| Error::Malformed { path, source })
    }

    /// Returns the label stored under `index`, or the index itself as a label if there is none.
    pub fn label_for_index(&self, index: i32) -> String {
        self.lock()
            .labels_by_index
            .get(&index)
            .cloned()
            .unwrap_or_else(|| index.to_string())
    }

    /// Returns the index of the preset stored under `label`, if it has one.
    pub fn index_for_label(&self, label: &str) -> Option<i32> {
        self.lock().indexes_by_label.get(label).copied()
    }

    /// Returns the sorted labels of all presets in the preset directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReadDirectory`] if the directory cannot be listed.
    pub fn preset_names(&self) -> Result<Vec<String>> {
        let mut names = list_files(&self.0.directory, PRESET_EXTENSION).map_err(|source| {
            Error::ReadDirectory {
                path: self.0.directory.clone(),
                source,
            }
        })?;
        names.sort();
        Ok(names)
    }

    /// Rebuilds the index/label mapping from the headers of the files in the preset directory.
    ///
    /// Files that cannot be read or decoded are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReadDirectory`] if the directory cannot be listed.
    pub fn rescan(&self) -> Result<()> {
        let mut indexes = Vec::new();
        for label in self.preset_names()? {
            let path = self.preset_path(&label);
            match fs::read_to_string(&path)
                .map_err(|err| err.to_string())
                .and_then(|text| Preset::parse_index(&text).map_err(|err| err.to_string()))
            {
                Ok(Some(index)) => indexes.push((label, index)),
                Ok(None) => {}
                Err(err) => log::warn!("skipping preset {}: {}", path.display(), err),
            }
        }

        let mut state = self.lock();
        state.labels_by_index.clear();
        state.indexes_by_label.clear();
        for (label, index) in indexes {
            state.map_index(&label, Some(index));
        }
        Ok(())
    }

    /// Sets the duration of the morphs started by later recalls.
    ///
    /// A morph that is already in progress keeps its original duration.
    pub fn set_morph_time(&self, morph_time: Duration) {
        let mut state = self.lock();
        state.morph_time = morph_time;
        state.publish(PresetEvent::MorphTimeChanged(morph_time));
    }

    pub fn morph_time(&self) -> Duration {
        self.lock().morph_time
    }

    /// Advances the current morph by `delta`. Returns `true` when no morph is in progress
    /// afterwards.
    ///
    /// Call this periodically from the application's update loop. When the handler is attached to
    /// a [`PresetSequencer`](crate::sequencer::PresetSequencer), call
    /// [`PresetSequencer::advance`](crate::sequencer::PresetSequencer::advance) instead, which
    /// advances the handler too.
    pub fn advance(&self, delta: Duration) -> bool {
        self.lock().morph.advance(delta)
    }

    pub fn is_morphing(&self) -> bool {
        self.lock().morph.is_morphing()
    }

    /// Stops the current morph where it is.
    pub fn cancel_morph(&self) {
        self.lock().morph.cancel();
    }

    /// Subscribes to store, recall and morph time notifications.
    ///
    /// Drop the receiver to unsubscribe.
    pub fn subscribe(&self) -> mpsc::Receiver<PresetEvent> {
        let (sender, receiver) = mpsc::channel();
        self.lock().subscribers.push(sender);
        receiver
    }

    fn preset_path(&self, label: &str) -> PathBuf {
        self.0
            .directory
            .join(format!("{}.{}", label, PRESET_EXTENSION))
    }

    fn lock(&self) -> MutexGuard<'_, HandlerState> {
        self.0
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl HandlerState {
    fn map_index(&mut self, label: &str, index: Option<i32>) {
        if let Some(old_index) = self.indexes_by_label.remove(label) {
            self.labels_by_index.remove(&old_index);
        }
        if let Some(index) = index {
            if let Some(old_label) = self.labels_by_index.insert(index, label.to_owned()) {
                self.indexes_by_label.remove(&old_label);
            }
            self.indexes_by_label.insert(label.to_owned(), index);
        }
    }

    fn publish(&mut self, event: PresetEvent) {
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }
}

// Writes to a temporary file next to `path`, then renames it into place.
pub(crate) fn write_atomically(path: &Path, contents: &str) -> io::Result<()> {
    let mut temp = path.as_os_str().to_owned();
    temp.push(".tmp");
    let temp = PathBuf::from(temp);
    fs::write(&temp, contents)
        .and_then(|()| fs::rename(&temp, path))
        .map_err(|err| {
            let _ = fs::remove_file(&temp);
            err
        })
}

// Accepts names that stay inside the directory they are joined to.
pub(crate) fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(|c: char| matches!(c, '/' | '\\' | '\0'))
}

// Lists the stems of the files in `directory` with the given extension.
pub(crate) fn list_files(directory: &Path, extension: &str) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(directory)? {
        let path = entry?.path();
        if path.extension().map_or(false, |ext| ext == extension) && path.is_file() {
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                names.push(stem.to_owned());
            }
        }
    }
    Ok(names)
}
