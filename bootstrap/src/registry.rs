//! Named capability registry shared with extensions.
//!
//! The registry is the extensibility seam between the core and extensions:
//! a mutable mapping from operation name to callable. It is created once per
//! invocation and passed by reference to every extension, so a capability an
//! extension registers is visible to every later extension in the same run.

use std::collections::BTreeMap;
use std::fmt;

use anyhow::{Result, anyhow};
use serde_json::Value;

use crate::context::RunContext;

/// A registered operation: JSON parameters in, JSON value out.
pub type Capability = Box<dyn Fn(&RunContext, Value) -> Result<Value>>;

/// Mutable name-to-capability mapping.
#[derive(Default)]
pub struct CapabilityRegistry {
    entries: BTreeMap<String, Capability>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `capability` under `name`, silently replacing any prior entry.
    pub fn register(&mut self, name: impl Into<String>, capability: Capability) {
        self.entries.insert(name.into(), capability);
    }

    /// Look up a capability, erroring when the name is unknown.
    pub fn lookup(&self, name: &str) -> Result<&Capability> {
        self.entries
            .get(name)
            .ok_or_else(|| anyhow!("unknown capability '{name}'"))
    }

    /// Look up and invoke a capability.
    pub fn call(&self, name: &str, ctx: &RunContext, args: Value) -> Result<Value> {
        let capability = self.lookup(name)?;
        capability(ctx, args)
    }

    /// Registered names in sorted order (introspection and debugging).
    pub fn list(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("entries", &self.list())
            .finish()
    }
}
