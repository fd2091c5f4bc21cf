//! Parameter panels
//!
//! A panel holds the live values for one filter or texture instance. Values are
//! readable in schema order (the kernel's positional order) and by name. Enum
//! options can change while the panel is live, as texture names come and go.
//!
//! Concrete widgets are out of scope; `HeadlessPanel` is the in-process
//! implementation used by the host binary and the tests.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{EnumOptions, ParamError, ParamKind, ParamSpec, ParamValue};

/// Value access for one instance's parameters
pub trait ParamPanel: Send {
    fn title(&self) -> &str;

    /// The schema this panel was built from
    fn specs(&self) -> &[ParamSpec];

    /// Current values in schema order
    fn values(&self) -> Vec<ParamValue>;

    fn value(&self, name: &str) -> Option<ParamValue>;

    /// Validate and store a value
    fn set_value(&mut self, name: &str, value: ParamValue) -> Result<(), ParamError>;

    /// Replace the options of an enum parameter
    fn set_options(&mut self, name: &str, options: Vec<String>);

    fn options(&self, name: &str) -> Option<Vec<String>>;

    /// Incremented on every successful `set_value`
    fn revision(&self) -> u64;
}

/// A panel shared between the menu that lists it and the instance that reads it
pub type SharedPanel = Arc<Mutex<dyn ParamPanel>>;

/// Panel without widgets
#[derive(Debug, Clone)]
pub struct HeadlessPanel {
    title: String,
    specs: Vec<ParamSpec>,
    values: Vec<ParamValue>,
    options: HashMap<String, Vec<String>>,
    revision: u64,
}

impl HeadlessPanel {
    /// Build a panel with every value at its default.
    ///
    /// Sourced enums take their options from `sourcing`.
    pub fn new(title: &str, specs: &[ParamSpec], sourcing: &HashMap<String, Vec<String>>) -> Self {
        let mut options = HashMap::new();
        for spec in specs {
            match &spec.kind {
                ParamKind::Enum {
                    options: EnumOptions::Static(list),
                } => {
                    options.insert(spec.name.clone(), list.clone());
                }
                ParamKind::Enum {
                    options: EnumOptions::Sourced(source),
                } => {
                    let list = sourcing.get(source).cloned().unwrap_or_default();
                    options.insert(spec.name.clone(), list);
                }
                _ => {}
            }
        }

        Self {
            title: title.to_string(),
            values: specs.iter().map(|s| s.default.clone()).collect(),
            specs: specs.to_vec(),
            options,
            revision: 0,
        }
    }

    pub fn shared(self) -> SharedPanel {
        Arc::new(Mutex::new(self))
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.specs.iter().position(|s| s.name == name)
    }
}

impl ParamPanel for HeadlessPanel {
    fn title(&self) -> &str {
        &self.title
    }

    fn specs(&self) -> &[ParamSpec] {
        &self.specs
    }

    fn values(&self) -> Vec<ParamValue> {
        self.values.clone()
    }

    fn value(&self, name: &str) -> Option<ParamValue> {
        self.index_of(name).map(|i| self.values[i].clone())
    }

    fn set_value(&mut self, name: &str, value: ParamValue) -> Result<(), ParamError> {
        let index = self.index_of(name).ok_or_else(|| ParamError::UnknownParam {
            param: name.to_string(),
        })?;
        let options = self.options.get(name).map(|o| o.as_slice());
        let value = self.specs[index].validate(value, options)?;
        if self.values[index] != value {
            self.values[index] = value;
            self.revision += 1;
        }
        Ok(())
    }

    fn set_options(&mut self, name: &str, options: Vec<String>) {
        if self.options.contains_key(name) {
            self.options.insert(name.to_string(), options);
        }
    }

    fn options(&self, name: &str) -> Option<Vec<String>> {
        self.options.get(name).cloned()
    }

    fn revision(&self) -> u64 {
        self.revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specs() -> Vec<ParamSpec> {
        vec![
            ParamSpec::sourced_choice("Shape", "Textures", "Trails"),
            ParamSpec::number("Red", 0.0, 1.0, 1.0),
            ParamSpec::boolean("Invert", false),
            ParamSpec::color("Tint", "#ffffff"),
        ]
    }

    fn sourcing() -> HashMap<String, Vec<String>> {
        let mut map = HashMap::new();
        map.insert("Textures".to_string(), vec!["Trails".to_string(), "Dots".to_string()]);
        map
    }

    #[test]
    fn test_defaults_in_schema_order() {
        let panel = HeadlessPanel::new("Color", &specs(), &sourcing());
        assert_eq!(
            panel.values(),
            vec![
                ParamValue::Text("Trails".into()),
                ParamValue::Number(1.0),
                ParamValue::Boolean(false),
                ParamValue::Text("#ffffff".into()),
            ]
        );
        assert_eq!(panel.value("Invert"), Some(ParamValue::Boolean(false)));
        assert_eq!(panel.value("Missing"), None);
    }

    #[test]
    fn test_set_value_validates() {
        let mut panel = HeadlessPanel::new("Color", &specs(), &sourcing());
        panel.set_value("Shape", "Dots".into()).unwrap();
        assert_eq!(panel.revision(), 1);
        assert!(panel.set_value("Shape", "Sparkles".into()).is_err());
        assert!(panel.set_value("Tint", "red".into()).is_err());
        assert!(matches!(
            panel.set_value("Nope", 1.0.into()),
            Err(ParamError::UnknownParam { .. })
        ));
        assert_eq!(panel.revision(), 1);
    }

    #[test]
    fn test_set_options_updates_enum() {
        let mut panel = HeadlessPanel::new("Color", &specs(), &HashMap::new());
        assert_eq!(panel.options("Shape"), Some(vec![]));
        panel.set_options("Shape", vec!["Sprinkles".into()]);
        panel.set_value("Shape", "Sprinkles".into()).unwrap();
        // Non-enum parameters have no option list
        panel.set_options("Red", vec!["x".into()]);
        assert_eq!(panel.options("Red"), None);
    }
}
