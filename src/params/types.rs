//! Parameter schema types
//!
//! A filter or texture type declares its parameters as an ordered list of
//! `ParamSpec`s. The order is significant: it is the positional argument order
//! of the kernel.

use serde::{Deserialize, Serialize};

use super::ParamError;

/// Where an enum parameter gets its options from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EnumOptions {
    /// Fixed option list
    Static(Vec<String>),
    /// Options published under this sourcing name (e.g. "Textures")
    Sourced(String),
}

/// Kind of a parameter and its constraints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamKind {
    Number { min: f32, max: f32, step: f32 },
    Boolean,
    Enum { options: EnumOptions },
    Color,
}

impl ParamKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            ParamKind::Number { .. } => "number",
            ParamKind::Boolean => "boolean",
            ParamKind::Enum { .. } => "enum",
            ParamKind::Color => "color",
        }
    }
}

/// A parameter value as held by a panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f32),
    Boolean(bool),
    /// Enum choice or hex color string
    Text(String),
}

impl ParamValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            ParamValue::Number(_) => "number",
            ParamValue::Boolean(_) => "boolean",
            ParamValue::Text(_) => "text",
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            ParamValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl From<f32> for ParamValue {
    fn from(v: f32) -> Self {
        ParamValue::Number(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Boolean(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

/// Declaration of one parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub default: ParamValue,
    /// Hidden parameters get no panel widget
    #[serde(default)]
    pub hidden: bool,
    /// External data key that supplies this value every tick (e.g. "Time")
    #[serde(default)]
    pub source: Option<String>,
}

impl ParamSpec {
    /// Number parameter with a default step of 0.01
    pub fn number(name: &str, min: f32, max: f32, default: f32) -> Self {
        Self {
            name: name.to_string(),
            kind: ParamKind::Number { min, max, step: 0.01 },
            default: ParamValue::Number(default),
            hidden: false,
            source: None,
        }
    }

    pub fn boolean(name: &str, default: bool) -> Self {
        Self {
            name: name.to_string(),
            kind: ParamKind::Boolean,
            default: ParamValue::Boolean(default),
            hidden: false,
            source: None,
        }
    }

    pub fn choice(name: &str, options: &[&str], default: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ParamKind::Enum {
                options: EnumOptions::Static(options.iter().map(|s| s.to_string()).collect()),
            },
            default: ParamValue::Text(default.to_string()),
            hidden: false,
            source: None,
        }
    }

    /// Enum whose options come from a named sourcing list
    pub fn sourced_choice(name: &str, sourcing: &str, default: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ParamKind::Enum {
                options: EnumOptions::Sourced(sourcing.to_string()),
            },
            default: ParamValue::Text(default.to_string()),
            hidden: false,
            source: None,
        }
    }

    pub fn color(name: &str, default: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ParamKind::Color,
            default: ParamValue::Text(default.to_string()),
            hidden: false,
            source: None,
        }
    }

    pub fn with_step(mut self, step: f32) -> Self {
        if let ParamKind::Number { step: s, .. } = &mut self.kind {
            *s = step;
        }
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Derive this parameter from external data every tick
    pub fn sourced_from(mut self, key: &str) -> Self {
        self.source = Some(key.to_string());
        self
    }

    /// Name of the sourcing list for sourced enums
    pub fn sourcing(&self) -> Option<&str> {
        match &self.kind {
            ParamKind::Enum {
                options: EnumOptions::Sourced(name),
            } => Some(name),
            _ => None,
        }
    }

    /// Check a value against this parameter's kind and range.
    ///
    /// Numbers are clamped to their range. Enum membership is checked against
    /// `options` when known; sourced options are checked at resolve time.
    pub fn validate(&self, value: ParamValue, options: Option<&[String]>) -> Result<ParamValue, ParamError> {
        match (&self.kind, value) {
            (ParamKind::Number { min, max, .. }, ParamValue::Number(v)) => {
                if !v.is_finite() {
                    return Err(ParamError::OutOfRange {
                        param: self.name.clone(),
                        value: v,
                        min: *min,
                        max: *max,
                    });
                }
                Ok(ParamValue::Number(v.clamp(*min, *max)))
            }
            (ParamKind::Boolean, ParamValue::Boolean(v)) => Ok(ParamValue::Boolean(v)),
            (ParamKind::Enum { .. }, ParamValue::Text(choice)) => {
                if let Some(options) = options {
                    if !options.iter().any(|o| *o == choice) {
                        return Err(ParamError::UnknownOption {
                            param: self.name.clone(),
                            option: choice,
                        });
                    }
                }
                Ok(ParamValue::Text(choice))
            }
            (ParamKind::Color, ParamValue::Text(hex)) => {
                parse_hex_color(&hex)?;
                Ok(ParamValue::Text(hex))
            }
            (kind, value) => Err(ParamError::TypeMismatch {
                param: self.name.clone(),
                expected: kind.type_name().to_string(),
                got: value.type_name().to_string(),
            }),
        }
    }
}

/// Parse `#rgb`, `#rgba`, `#rrggbb` or `#rrggbbaa` into RGBA floats in `[0, 1]`.
///
/// Alpha defaults to 1.
pub fn parse_hex_color(hex: &str) -> Result<[f32; 4], ParamError> {
    let invalid = || ParamError::InvalidColor {
        value: hex.to_string(),
    };
    let digits = hex.strip_prefix('#').ok_or_else(invalid)?;
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());
    let bytes: Vec<u8> = match digits.len() {
        3 | 4 => digits
            .chars()
            .map(|c| channel(&format!("{c}{c}")))
            .collect::<Result<_, _>>()?,
        6 | 8 => (0..digits.len())
            .step_by(2)
            .map(|i| channel(&digits[i..i + 2]))
            .collect::<Result<_, _>>()?,
        _ => return Err(invalid()),
    };

    let mut rgba = [1.0f32; 4];
    for (slot, byte) in rgba.iter_mut().zip(bytes) {
        *slot = byte as f32 / 255.0;
    }
    Ok(rgba)
}
