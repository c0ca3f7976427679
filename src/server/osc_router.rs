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

use rosc::{OscMessage, OscType};
use std::collections::HashMap;

type Handler<T> = Box<dyn Fn(&mut MatchedArgs) -> Option<T> + Send>;

pub struct Router<T> {
    matchers: Vec<Matcher<T>>,
}

impl<T> Default for Router<T> {
    fn default() -> Router<T> {
        Router {
            matchers: Vec::new(),
        }
    }
}

impl<T> Router<T> {
    pub fn addr(&mut self, addr: impl Into<String>) -> &mut Matcher<T> {
        let matcher = Matcher::addr(addr.into());
        self.matchers.push(matcher);
        let last_index = self.matchers.len() - 1;
        &mut self.matchers[last_index]
    }

    pub fn clear(&mut self) {
        self.matchers.clear();
    }

    pub fn route(&self, message: &OscMessage) -> Option<T> {
        for matcher in self.matchers.iter() {
            if let (Some(mut args), Some(handler)) = (matcher.match_msg(message), &matcher.handler)
            {
                return handler(&mut args);
            }
        }
        None
    }
}

pub struct Matcher<T> {
    addr: String,
    captures: Vec<&'static str>,
    handler: Option<Handler<T>>,
}

impl<T> Matcher<T> {
    fn addr(addr: String) -> Matcher<T> {
        Matcher {
            addr,
            captures: vec![],
            handler: None,
        }
    }

    pub fn capture(&mut self, name: &'static str) -> &mut Self {
        self.captures.push(name);
        self
    }

    pub fn handle<F>(&mut self, f: F)
    where
        F: Fn(&mut MatchedArgs) -> Option<T> + Send + 'static,
    {
        self.handler = Some(Box::new(f))
    }

    fn match_msg(&self, message: &OscMessage) -> Option<MatchedArgs> {
        if message.addr != self.addr || message.args.len() != self.captures.len() {
            return None;
        }
        let args = self
            .captures
            .iter()
            .copied()
            .zip(message.args.iter().cloned())
            .collect();
        Some(MatchedArgs { args })
    }
}

#[derive(Debug, Default)]
pub struct MatchedArgs {
    args: HashMap<&'static str, OscType>,
}

impl MatchedArgs {
    /// Takes a numeric argument of any OSC number type as an `f32`.
    pub fn float(&mut self, name: &'static str) -> Option<f32> {
        match self.args.remove(name) {
            Some(OscType::Float(x)) => Some(x),
            Some(OscType::Double(x)) => Some(x as f32),
            Some(OscType::Int(x)) => Some(x as f32),
            Some(OscType::Long(x)) => Some(x as f32),
            _ => None,
        }
    }

    /// Takes a numeric argument as an `i32`. Floating point values are truncated.
    pub fn int(&mut self, name: &'static str) -> Option<i32> {
        match self.args.remove(name) {
            Some(OscType::Int(x)) => Some(x),
            Some(OscType::Long(x)) => Some(x as i32),
            Some(OscType::Float(x)) if x.is_finite() => Some(x as i32),
            Some(OscType::Double(x)) if x.is_finite() => Some(x as i32),
            _ => None,
        }
    }

    pub fn string(&mut self, name: &'static str) -> Option<String> {
        match self.args.remove(name) {
            Some(OscType::String(x)) => Some(x),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(addr: &str, args: Vec<OscType>) -> OscMessage {
        OscMessage {
            addr: addr.to_owned(),
            args,
        }
    }

    #[test]
    fn test_routes_by_address_and_arity() {
        let mut router = Router::default();
        router
            .addr("/preset")
            .capture("index")
            .handle(|args| args.int("index").map(|i| format!("recall {}", i)));
        router
            .addr("/preset/morphTime")
            .capture("seconds")
            .handle(|args| args.float("seconds").map(|s| format!("morph {}", s)));

        assert_eq!(
            router.route(&message("/preset", vec![OscType::Int(3)])),
            Some("recall 3".to_owned())
        );
        assert_eq!(
            router.route(&message("/preset", vec![OscType::Float(2.0)])),
            Some("recall 2".to_owned())
        );
        assert_eq!(
            router.route(&message("/preset/morphTime", vec![OscType::Double(0.5)])),
            Some("morph 0.5".to_owned())
        );
        assert_eq!(router.route(&message("/preset", vec![])), None);
        assert_eq!(
            router.route(&message("/preset", vec![OscType::Int(1), OscType::Int(2)])),
            None
        );
        assert_eq!(
            router.route(&message("/preset", vec![OscType::String("x".into())])),
            None
        );
        assert_eq!(router.route(&message("/other", vec![OscType::Int(1)])), None);
    }

    #[test]
    fn test_clear() {
        let mut router = Router::default();
        router.addr("/a").handle(|_| Some(()));
        assert_eq!(router.route(&message("/a", vec![])), Some(()));
        router.clear();
        assert_eq!(router.route(&message("/a", vec![])), None);
    }
}
