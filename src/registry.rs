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

//! Ordered collections of parameters keyed by address.

use crate::parameter::Parameter;
use std::{slice, sync::Arc};
use thiserror::Error;

/// A specialized [`Result`] type for registry operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type returned by [`Registry`] operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("a different parameter is already registered at {0}")]
    DuplicateAddress(String),
}

/// An ordered, address-unique set of parameters.
///
/// Parameters are kept in the order they were registered. Registering the same parameter (the
/// same [`Arc`]) twice is allowed and has no effect; registering a different parameter whose
/// address is already taken is an error.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    parameters: Vec<Arc<Parameter>>,
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    /// Adds a parameter to the end of the registry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateAddress`] if a different parameter with the same address is
    /// already registered.
    pub fn register(&mut self, parameter: Arc<Parameter>) -> Result<()> {
        match self.get(parameter.address()) {
            Some(existing) if Arc::ptr_eq(existing, &parameter) => Ok(()),
            Some(_) => Err(Error::DuplicateAddress(parameter.address().to_owned())),
            None => {
                log::debug!("registered parameter {}", parameter.address());
                self.parameters.push(parameter);
                Ok(())
            }
        }
    }

    /// Registers each parameter in order, stopping at the first error.
    pub fn register_all<I>(&mut self, parameters: I) -> Result<()>
    where
        I: IntoIterator<Item = Arc<Parameter>>,
    {
        for parameter in parameters {
            self.register(parameter)?;
        }
        Ok(())
    }

    /// Finds the parameter registered at `address`.
    pub fn get(&self, address: &str) -> Option<&Arc<Parameter>> {
        self.parameters
            .iter()
            .find(|parameter| parameter.address() == address)
    }

    pub fn contains(&self, address: &str) -> bool {
        self.get(address).is_some()
    }

    pub fn iter(&self) -> slice::Iter<'_, Arc<Parameter>> {
        self.parameters.iter()
    }

    /// Returns the addresses of all parameters in registration order.
    pub fn addresses(&self) -> Vec<&str> {
        self.parameters.iter().map(|p| p.address()).collect()
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = &'a Arc<Parameter>;
    type IntoIter = slice::Iter<'a, Arc<Parameter>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn param(name: &str, group: &str) -> Arc<Parameter> {
        Arc::new(Parameter::new(name, group, 0.0))
    }

    #[test]
    fn test_preserves_order() {
        let mut registry = Registry::new();
        registry
            .register_all(vec![
                param("X", "Position"),
                param("Y", "Position"),
                param("Scale", "Size"),
            ])
            .unwrap();
        assert_eq!(
            registry.addresses(),
            vec!["/Position/X", "/Position/Y", "/Size/Scale"]
        );
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_reregistration_is_a_noop() {
        let x = param("X", "Position");
        let mut registry = Registry::new();
        registry.register(Arc::clone(&x)).unwrap();
        registry.register(Arc::clone(&x)).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_address_is_rejected() {
        let mut registry = Registry::new();
        registry.register(param("X", "Position")).unwrap();
        assert_eq!(
            registry.register(param("X", "Position")),
            Err(Error::DuplicateAddress("/Position/X".into()))
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_lookup() {
        let x = param("X", "Position");
        let mut registry = Registry::new();
        registry.register(Arc::clone(&x)).unwrap();
        assert!(Arc::ptr_eq(registry.get("/Position/X").unwrap(), &x));
        assert!(registry.contains("/Position/X"));
        assert!(!registry.contains("/Position/Y"));
        assert!(Registry::new().is_empty());
    }
}
