//! Parameters
//!
//! - `types`: `ParamSpec` schema and `ParamValue`
//! - `panel`: live value access per instance
//! - `menu`: reorderable panel lists with sourced enum options

mod menu;
mod panel;
mod types;

pub use menu::{HeadlessPanelFactory, MenuItem, PanelFactory, ParamMenu, SourcingChange};
pub use panel::{HeadlessPanel, ParamPanel, SharedPanel};
pub use types::{parse_hex_color, EnumOptions, ParamKind, ParamSpec, ParamValue};

use thiserror::Error;

/// Errors from parameter handling
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParamError {
    #[error("Unknown parameter: {param}")]
    UnknownParam { param: String },

    #[error("Parameter '{param}' value {value} out of range [{min}, {max}]")]
    OutOfRange {
        param: String,
        value: f32,
        min: f32,
        max: f32,
    },

    #[error("Parameter '{param}' type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        param: String,
        expected: String,
        got: String,
    },

    #[error("Parameter '{param}' has no option named '{option}'")]
    UnknownOption { param: String, option: String },

    #[error("Invalid color: {value}")]
    InvalidColor { value: String },

    #[error("Index {index} out of range for {len} items")]
    IndexOutOfRange { index: usize, len: usize },
}
