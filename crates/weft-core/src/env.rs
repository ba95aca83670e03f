//! Environment access as an injected interface.
//!
//! The engine never touches `std::env` directly; the `env` resolver reads
//! through this trait so hosts can substitute their own source and tests can
//! stay hermetic.

use std::collections::HashMap;

/// Read-only view over environment variables.
pub trait Env: Send + Sync {
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl Env for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// A fixed variable map, for tests and sandboxed hosts.
#[derive(Debug, Clone, Default)]
pub struct StaticEnv {
    vars: HashMap<String, String>,
}

impl StaticEnv {
    pub fn new() -> StaticEnv {
        StaticEnv::default()
    }

    pub fn set(mut self, key: &str, value: &str) -> StaticEnv {
        self.vars.insert(key.to_owned(), value.to_owned());
        self
    }
}

impl Env for StaticEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}
