/// Run-scoped variable store.
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::trace;

/// Variables visible to `[$name]` references during a single render.
///
/// A fresh `State` is empty. Callers can pre-populate one to pin variables
/// across repeated runs of the same generator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    vars: HashMap<String, String>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of `name`, if set.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    /// Overwrite or insert every entry of `updates`. Last writer wins.
    pub fn set_vars<'a, I>(&mut self, updates: I)
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        for (name, value) in updates {
            trace!(%name, %value, "set variable");
            self.vars.insert(name.clone(), value.clone());
        }
    }

    pub fn vars(&self) -> &HashMap<String, String> {
        &self.vars
    }
}

impl From<HashMap<String, String>> for State {
    fn from(vars: HashMap<String, String>) -> Self {
        Self { vars }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for State {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
