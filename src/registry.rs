//! Type registry for filter and texture definitions
//!
//! Definitions are registered at startup and looked up by display name when a
//! configuration or the host adds an instance to the stack.

use std::collections::HashMap;
use std::sync::Arc;

/// Identity of a registrable definition
pub trait Descriptor {
    /// Display name, also the lookup key
    fn name(&self) -> &str;
}

/// Registry of definitions of one family (filters or textures)
pub struct TypeRegistry<D: ?Sized + Descriptor> {
    /// Definitions in registration order
    entries: Vec<Arc<D>>,
    /// Entry index by name
    by_name: HashMap<String, usize>,
}

impl<D: ?Sized + Descriptor> Default for TypeRegistry<D> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            by_name: HashMap::new(),
        }
    }
}

impl<D: ?Sized + Descriptor> TypeRegistry<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition, replacing any previous one with the same name
    pub fn register(&mut self, definition: Arc<D>) {
        let name = definition.name().to_string();
        if self.by_name.contains_key(&name) {
            tracing::warn!(name = %name, "Replacing registered type");
            self.unregister(&name);
        }
        self.by_name.insert(name, self.entries.len());
        self.entries.push(definition);
    }

    fn unregister(&mut self, name: &str) {
        self.entries.retain(|d| d.name() != name);
        self.by_name = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, d)| (d.name().to_string(), i))
            .collect();
    }

    pub fn get(&self, name: &str) -> Option<Arc<D>> {
        self.by_name.get(name).map(|&i| self.entries[i].clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|d| d.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
