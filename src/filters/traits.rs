//! Filter definition trait

use std::sync::Arc;

use crate::frame::Frame;
use crate::kernel::PixelKernel;
use crate::params::ParamSpec;
use crate::registry::Descriptor;

/// A registrable filter type
///
/// The schema order is the kernel's positional argument order.
pub trait FilterDefinition: Descriptor + Send + Sync {
    fn params(&self) -> Vec<ParamSpec>;

    /// The per-pixel function, compiled per output size by the stack's backend
    fn kernel(&self) -> Arc<dyn PixelKernel>;
}

/// Read access to texture buffers by slot name
pub trait TextureLookup {
    fn texture(&self, name: &str) -> Option<&Frame>;
}

impl TextureLookup for std::collections::HashMap<String, Frame> {
    fn texture(&self, name: &str) -> Option<&Frame> {
        self.get(name)
    }
}
