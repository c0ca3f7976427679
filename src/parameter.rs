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

//! Named, bounded control values that can be shared between threads.
//!
//! A [`Parameter`] holds a single `f32` value that is always kept within the parameter's range.
//! Reading and writing the value never takes a lock, so a parameter can be read on every frame of
//! a rendering loop or every block of an audio callback while other threads, such as an OSC
//! receive loop or a preset morph, write to it.
//!
//! Parameters are created once, wrapped in an [`Arc`], and then shared with everything that needs
//! them: a [`PresetHandler`](crate::preset::PresetHandler), a
//! [`ParameterServer`](crate::server::ParameterServer), or the host application itself.
//!
//! # Examples
//!
//! ```
//! use paramorph::parameter::Parameter;
//!
//! let x = Parameter::new("X", "Position", 0.0).with_range(-1.0, 1.0);
//! assert_eq!(x.address(), "/Position/X");
//!
//! // Out of range values are clamped.
//! x.set(4.0);
//! assert_eq!(x.get(), 1.0);
//! ```

use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicU32, Ordering},
        mpsc, Arc, Mutex,
    },
};
use thiserror::Error;

/// Minimum value used when a range is not given.
pub const DEFAULT_MIN: f32 = -99999.0;

/// Maximum value used when a range is not given.
pub const DEFAULT_MAX: f32 = 99999.0;

/// A named, range-clamped control value.
///
/// `Parameter` is `Send` and `Sync`. Share it between threads with an [`Arc`](std::sync::Arc).
pub struct Parameter {
    name: String,
    group: String,
    prefix: String,
    address: Arc<str>,
    min: f32,
    max: f32,
    default: f32,

    // The value's bits. Stored as a single word so readers never observe a torn value.
    value: AtomicU32,

    // Checked before touching `subscribers` so that un-observed parameters never lock.
    has_subscribers: AtomicBool,
    subscribers: Mutex<Vec<mpsc::Sender<ParameterChange>>>,
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("address", &self.address)
            .field("value", &self.get())
            .field("min", &self.min)
            .field("max", &self.max)
            .field("default", &self.default)
            .finish()
    }
}

impl Parameter {
    /// Creates a new parameter with the default range of [`DEFAULT_MIN`] to [`DEFAULT_MAX`].
    ///
    /// The group is used to build the parameter's [address](Parameter::address).
    pub fn new(name: impl Into<String>, group: impl Into<String>, default: f32) -> Parameter {
        let name = name.into();
        let group = group.into();
        let prefix = String::new();
        let address = address(&prefix, &group, &name).into();
        let default = clamp(default, DEFAULT_MIN, DEFAULT_MAX).unwrap_or(0.0);
        Parameter {
            name,
            group,
            prefix,
            address,
            min: DEFAULT_MIN,
            max: DEFAULT_MAX,
            default,
            value: AtomicU32::new(default.to_bits()),
            has_subscribers: AtomicBool::new(false),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Prepends a prefix to the parameter's address.
    ///
    /// ```
    /// use paramorph::parameter::Parameter;
    ///
    /// let size = Parameter::new("Scale", "Size", 1.0).with_prefix("cone");
    /// assert_eq!(size.address(), "/coneSize/Scale");
    /// ```
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Parameter {
        self.prefix = prefix.into();
        self.address = address(&self.prefix, &self.group, &self.name).into();
        self
    }

    /// Sets the range of the parameter. The default and current values are clamped into the new
    /// range.
    ///
    /// # Panics
    ///
    /// Panics if `min` is greater than `max` or if either bound is NaN.
    pub fn with_range(mut self, min: f32, max: f32) -> Parameter {
        assert!(
            min <= max,
            "parameter {} has an empty range: {} > {}",
            self.address,
            min,
            max
        );
        self.min = min;
        self.max = max;
        self.default = clamp(self.default, min, max).unwrap_or(min);
        let value = clamp(self.get(), min, max).unwrap_or(self.default);
        self.value.store(value.to_bits(), Ordering::Release);
        self
    }

    /// Returns the parameter's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the parameter's group.
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Returns the parameter's address prefix. Empty if none was set.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the address used to identify this parameter in preset files and OSC messages.
    ///
    /// Addresses have the form `/<prefix><group>/<name>`, or `/<prefix><name>` when the group is
    /// empty.
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn min(&self) -> f32 {
        self.min
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    pub fn default(&self) -> f32 {
        self.default
    }

    /// Returns the current value.
    ///
    /// This never blocks.
    pub fn get(&self) -> f32 {
        f32::from_bits(self.value.load(Ordering::Acquire))
    }

    /// Sets the value, clamping it into the parameter's range.
    ///
    /// Writing NaN has no effect. Subscribers are notified of every write that is applied; the
    /// notification is queued on an unbounded channel so it never waits on the receiver.
    pub fn set(&self, value: f32) {
        if let Some(value) = clamp(value, self.min, self.max) {
            self.value.store(value.to_bits(), Ordering::Release);
            self.notify(value);
        }
    }

    /// Sets the value if it lies within the parameter's range.
    ///
    /// # Errors
    ///
    /// Returns [`OutOfRange`] and leaves the value unchanged if `value` is outside of the range or
    /// is NaN.
    pub fn set_strict(&self, value: f32) -> Result<(), OutOfRange> {
        if value >= self.min && value <= self.max {
            self.set(value);
            Ok(())
        } else {
            Err(OutOfRange {
                address: self.address.to_string(),
                value,
                min: self.min,
                max: self.max,
            })
        }
    }

    /// Restores the default value.
    pub fn reset(&self) {
        self.set(self.default);
    }

    /// Subscribes to changes of this parameter.
    ///
    /// Returns the receiving end of a channel that receives a [`ParameterChange`] for every
    /// applied [`set`](Parameter::set). Drop the receiver to unsubscribe. Changes accumulate in
    /// the channel until they are received, so receivers should be drained promptly.
    pub fn subscribe(&self) -> mpsc::Receiver<ParameterChange> {
        let (sender, receiver) = mpsc::channel();
        self.subscribe_with(sender);
        receiver
    }

    /// Subscribes an existing channel to changes of this parameter.
    ///
    /// This lets a single receiver observe many parameters.
    pub fn subscribe_with(&self, sender: mpsc::Sender<ParameterChange>) {
        let mut subscribers = lock(&self.subscribers);
        subscribers.push(sender);
        self.has_subscribers.store(true, Ordering::Release);
    }

    fn notify(&self, value: f32) {
        if !self.has_subscribers.load(Ordering::Acquire) {
            return;
        }
        let mut subscribers = lock(&self.subscribers);
        subscribers.retain(|subscriber| {
            subscriber
                .send(ParameterChange {
                    address: Arc::clone(&self.address),
                    value,
                })
                .is_ok()
        });
        if subscribers.is_empty() {
            self.has_subscribers.store(false, Ordering::Release);
        }
    }
}

/// A change of a parameter's value, sent to [subscribers](Parameter::subscribe).
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterChange {
    /// The [address](Parameter::address) of the parameter that changed, shared with the
    /// parameter.
    pub address: Arc<str>,
    /// The new, clamped value.
    pub value: f32,
}

/// The error returned by [`Parameter::set_strict`].
#[derive(Debug, Clone, PartialEq, Error)]
#[error("value {value} is outside the range [{min}, {max}] of parameter {address}")]
pub struct OutOfRange {
    pub address: String,
    pub value: f32,
    pub min: f32,
    pub max: f32,
}

pub(crate) fn address(prefix: &str, group: &str, name: &str) -> String {
    if group.is_empty() {
        format!("/{}{}", prefix, name)
    } else {
        format!("/{}{}/{}", prefix, group, name)
    }
}

// Returns None for NaN.
fn clamp(value: f32, min: f32, max: f32) -> Option<f32> {
    if value.is_nan() {
        None
    } else {
        Some(value.max(min).min(max))
    }
}

// A subscriber list is never left half-updated, so a poisoned lock is still usable.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
