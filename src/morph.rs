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

//! Linear interpolation of parameters toward target values.
//!
//! A [`MorphEngine`] moves a set of parameters from the values they have when
//! [`begin`](MorphEngine::begin) is called to a set of target values over a fixed duration. The
//! engine does not keep time itself. The host advances it from its own loop with
//! [`advance`](MorphEngine::advance), usually once per frame or control block, which keeps
//! morphing deterministic and easy to test.
//!
//! ```
//! use paramorph::{morph::MorphEngine, parameter::Parameter};
//! use std::{sync::Arc, time::Duration};
//!
//! let x = Arc::new(Parameter::new("X", "Position", 0.0));
//! let mut engine = MorphEngine::new();
//! engine.begin(vec![(Arc::clone(&x), 1.0)], Duration::from_secs(2));
//!
//! assert!(!engine.advance(Duration::from_secs(1)));
//! assert_eq!(x.get(), 0.5);
//! assert!(engine.advance(Duration::from_secs(1)));
//! assert_eq!(x.get(), 1.0);
//! ```

use crate::parameter::Parameter;
use std::{sync::Arc, time::Duration};

#[derive(Debug)]
struct MorphTarget {
    parameter: Arc<Parameter>,
    start: f32,
    target: f32,
}

/// Drives parameters toward target values over time.
#[derive(Debug, Default)]
pub struct MorphEngine {
    targets: Vec<MorphTarget>,
    duration: Duration,
    elapsed: Duration,
    overshoot: Duration,
}

impl MorphEngine {
    pub fn new() -> MorphEngine {
        MorphEngine::default()
    }

    /// Starts a morph toward `targets` lasting `duration`.
    ///
    /// The current value of every target parameter becomes its starting point. Any unfinished
    /// morph is discarded, so beginning again mid-morph continues smoothly from wherever the
    /// parameters are now. Nothing is written until the next [`update`](MorphEngine::update) or
    /// [`advance`](MorphEngine::advance).
    pub fn begin<I>(&mut self, targets: I, duration: Duration)
    where
        I: IntoIterator<Item = (Arc<Parameter>, f32)>,
    {
        self.targets = targets
            .into_iter()
            .map(|(parameter, target)| MorphTarget {
                start: parameter.get(),
                parameter,
                target,
            })
            .collect();
        self.duration = duration;
        self.elapsed = Duration::ZERO;
        self.overshoot = Duration::ZERO;
        log::debug!(
            "morphing {} parameters over {:?}",
            self.targets.len(),
            duration
        );
    }

    /// Writes interpolated values for `elapsed` time since the morph began.
    ///
    /// Returns `true` once the morph is complete. At that point every parameter holds exactly its
    /// target value and the engine becomes idle. A zero duration completes on the first call.
    /// Returns `true` without writing anything if no morph is in progress.
    pub fn update(&mut self, elapsed: Duration) -> bool {
        if self.targets.is_empty() {
            return true;
        }
        self.elapsed = elapsed;

        if elapsed >= self.duration {
            for target in self.targets.iter() {
                target.parameter.set(target.target);
            }
            self.overshoot = elapsed - self.duration;
            self.targets.clear();
            return true;
        }

        let t = (elapsed.as_secs_f64() / self.duration.as_secs_f64()) as f32;
        for target in self.targets.iter() {
            target
                .parameter
                .set(target.start + t * (target.target - target.start));
        }
        false
    }

    /// Advances the morph by `delta` and writes the interpolated values.
    ///
    /// See [`update`](MorphEngine::update).
    pub fn advance(&mut self, delta: Duration) -> bool {
        if self.targets.is_empty() {
            return true;
        }
        self.update(self.elapsed + delta)
    }

    /// Returns `true` while a morph is in progress.
    pub fn is_morphing(&self) -> bool {
        !self.targets.is_empty()
    }

    /// Abandons the current morph, leaving parameters at their current values.
    pub fn cancel(&mut self) {
        self.targets.clear();
    }

    /// The duration of the current or most recent morph.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Time elapsed in the current or most recent morph.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// How far past its deadline the most recent morph was when it completed.
    ///
    /// Lets callers that step in coarse increments carry the remainder into whatever follows the
    /// morph.
    pub fn overshoot(&self) -> Duration {
        self.overshoot
    }
}
