//! Video filters
//!
//! A filter is a per-pixel kernel over the running frame, a mask texture and
//! its parameters. The stack folds each frame through its filters in order.

pub mod builtin;
mod instance;
mod traits;

pub use builtin::register_builtin_filters;
pub use instance::{FilterId, FilterInstance};
pub use traits::{FilterDefinition, TextureLookup};

use thiserror::Error;

use crate::kernel::KernelError;
use crate::params::ParamError;
use crate::registry::TypeRegistry;

/// Registry of filter types
pub type FilterRegistry = TypeRegistry<dyn FilterDefinition>;

/// Errors from running a filter
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("Parameter '{param}' selects texture '{texture}', which does not exist")]
    MissingTexture { param: String, texture: String },

    #[error("Parameter '{param}' is sourced from '{sourcing}', which filters cannot read")]
    UnresolvableSource { param: String, sourcing: String },

    #[error("Kernel has not been compiled for the current dimensions")]
    NotCompiled,

    #[error(transparent)]
    Kernel(#[from] KernelError),

    #[error(transparent)]
    Param(#[from] ParamError),
}
