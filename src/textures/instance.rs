//! Live texture generator bindings

use std::sync::Arc;

use super::traits::{DrawContext, TextureDefinition, TextureGenerator};
use crate::frame::Frame;
use crate::params::{ParamValue, SharedPanel};
use crate::pipeline::ExternalData;

/// Unique identifier for a texture instance within a stack
pub type TextureId = u32;

/// A named texture slot owned by the stack
pub struct TextureInstance {
    id: TextureId,
    /// Slot name, listed in the `Textures` sourcing feed
    name: String,
    definition: Arc<dyn TextureDefinition>,
    generator: Box<dyn TextureGenerator>,
    buffer: Frame,
    panel: Option<SharedPanel>,
    /// Filters currently reading this texture
    users: usize,
    needs_init: bool,
}

impl TextureInstance {
    pub fn new(id: TextureId, name: &str, definition: Arc<dyn TextureDefinition>) -> Self {
        let generator = definition.create();
        Self {
            id,
            name: name.to_string(),
            definition,
            generator,
            buffer: Frame::new(0, 0),
            panel: None,
            users: 0,
            needs_init: true,
        }
    }

    pub fn with_panel(mut self, panel: SharedPanel) -> Self {
        self.panel = Some(panel);
        self
    }

    pub fn id(&self) -> TextureId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &str {
        self.definition.name()
    }

    pub fn panel(&self) -> Option<&SharedPanel> {
        self.panel.as_ref()
    }

    pub fn buffer(&self) -> &Frame {
        &self.buffer
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.buffer.dimensions()
    }

    /// Reallocate the buffer; init runs again before the next draw
    pub fn update_dimensions(&mut self, width: u32, height: u32) {
        self.buffer.resize(width, height);
        self.needs_init = true;
        tracing::debug!(texture = %self.name, width, height, "Texture reallocated");
    }

    pub fn users(&self) -> usize {
        self.users
    }

    pub fn use_texture(&mut self) {
        self.users += 1;
    }

    /// Release one user; the count never goes below zero
    pub fn unuse(&mut self) {
        self.users = self.users.saturating_sub(1);
    }

    fn param_values(&self) -> Vec<ParamValue> {
        self.panel.as_ref().map(|p| p.lock().values()).unwrap_or_default()
    }

    /// Redraw the buffer for this tick
    pub fn draw(&mut self, source: &Frame, data: &ExternalData) {
        if self.buffer.is_empty() {
            return;
        }
        let params = self.param_values();
        let ctx = DrawContext::new(source, data, &params);
        if self.needs_init {
            self.generator.init(&mut self.buffer, &ctx);
            self.needs_init = false;
        }
        self.generator.draw(&mut self.buffer, &ctx);
    }
}

impl std::fmt::Debug for TextureInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureInstance")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("type", &self.type_name())
            .field("dimensions", &self.dimensions())
            .field("users", &self.users)
            .finish()
    }
}
