//! Reorderable panel menus
//!
//! A menu lists one panel per live instance, in execution order. The stack
//! keeps its instance list in lockstep with the menu: every add, remove and
//! move goes to both. Sourcing lists (e.g. the current texture names) are
//! pushed into every panel whose enum draws from them.

use std::collections::HashMap;

use super::{HeadlessPanel, ParamError, ParamSpec, SharedPanel};

/// Creates panels for new menu items
pub trait PanelFactory: Send + Sync {
    fn create_panel(
        &self,
        title: &str,
        specs: &[ParamSpec],
        sourcing: &HashMap<String, Vec<String>>,
    ) -> SharedPanel;
}

/// Factory producing `HeadlessPanel`s
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessPanelFactory;

impl PanelFactory for HeadlessPanelFactory {
    fn create_panel(
        &self,
        title: &str,
        specs: &[ParamSpec],
        sourcing: &HashMap<String, Vec<String>>,
    ) -> SharedPanel {
        HeadlessPanel::new(title, specs, sourcing).shared()
    }
}

/// Change to a sourcing list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourcingChange {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl SourcingChange {
    pub fn added(name: &str) -> Self {
        Self {
            added: vec![name.to_string()],
            removed: Vec::new(),
        }
    }

    pub fn removed(name: &str) -> Self {
        Self {
            added: Vec::new(),
            removed: vec![name.to_string()],
        }
    }
}

/// One menu entry
#[derive(Clone)]
pub struct MenuItem<K> {
    pub key: K,
    pub panel: SharedPanel,
}

/// Ordered list of panels keyed by instance id
pub struct ParamMenu<K> {
    title: String,
    items: Vec<MenuItem<K>>,
    sourcing: HashMap<String, Vec<String>>,
}

impl<K: Copy + PartialEq + std::fmt::Debug> ParamMenu<K> {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            items: Vec::new(),
            sourcing: HashMap::new(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Append a panel for `key` built by `factory`
    pub fn add_item(
        &mut self,
        key: K,
        title: &str,
        specs: &[ParamSpec],
        factory: &dyn PanelFactory,
    ) -> SharedPanel {
        let panel = factory.create_panel(title, specs, &self.sourcing);
        self.items.push(MenuItem {
            key,
            panel: panel.clone(),
        });
        panel
    }

    /// Remove the panel for `key`; returns its former position
    pub fn remove_item(&mut self, key: K) -> Option<usize> {
        let index = self.position(key)?;
        self.items.remove(index);
        Some(index)
    }

    /// Move the item at `from` so that it ends up at `to`
    pub fn move_item(&mut self, from: usize, to: usize) -> Result<(), ParamError> {
        let len = self.items.len();
        if from >= len || to >= len {
            return Err(ParamError::IndexOutOfRange {
                index: from.max(to),
                len,
            });
        }
        let item = self.items.remove(from);
        self.items.insert(to, item);
        Ok(())
    }

    pub fn position(&self, key: K) -> Option<usize> {
        self.items.iter().position(|item| item.key == key)
    }

    pub fn panel(&self, key: K) -> Option<&SharedPanel> {
        self.items.iter().find(|item| item.key == key).map(|item| &item.panel)
    }

    /// Keys in display order
    pub fn order(&self) -> Vec<K> {
        self.items.iter().map(|item| item.key).collect()
    }

    pub fn items(&self) -> &[MenuItem<K>] {
        &self.items
    }

    /// Publish a named option list for sourced enums
    pub fn register_sourcing_data(&mut self, name: &str, options: Vec<String>) {
        self.sourcing.insert(name.to_string(), options);
        self.push_sourcing(name);
    }

    /// Apply an incremental change to a sourcing list and refresh every panel
    pub fn sourcing_data_changed(&mut self, name: &str, change: &SourcingChange) {
        let list = self.sourcing.entry(name.to_string()).or_default();
        list.retain(|o| !change.removed.contains(o));
        for added in &change.added {
            if !list.contains(added) {
                list.push(added.clone());
            }
        }
        self.push_sourcing(name);
    }

    pub fn sourcing_data(&self, name: &str) -> Option<&[String]> {
        self.sourcing.get(name).map(|v| v.as_slice())
    }

    fn push_sourcing(&self, name: &str) {
        let options = self.sourcing.get(name).cloned().unwrap_or_default();
        for item in &self.items {
            let mut panel = item.panel.lock();
            let params: Vec<String> = panel
                .specs()
                .iter()
                .filter(|s| s.sourcing() == Some(name))
                .map(|s| s.name.clone())
                .collect();
            for param in params {
                panel.set_options(&param, options.clone());
            }
        }
    }
}
