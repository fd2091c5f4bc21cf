//! Filter/texture stack
//!
//! The stack owns the pre-pipeline frame buffer, every texture slot, every
//! filter and the "Last Output Frame" slot. Per tick it:
//!
//! 1. skips unless running with a ready video
//! 2. refreshes time and live external data
//! 3. copies the video frame
//! 4. redraws the textures
//! 5. folds the frame through the filters in menu order
//! 6. presents the result
//! 7. stores it as the last output frame
//!
//! and leaves pacing of the next tick to the scheduler. A source size change
//! reallocates the frame buffer, then the textures, then the filters, before
//! the next frame is processed.

use std::sync::Arc;

use thiserror::Error;

use super::context::PipelineContext;
use super::output::{OutputError, OutputSurface};
use crate::filters::{FilterError, FilterId, FilterInstance, FilterRegistry, TextureLookup};
use crate::frame::Frame;
use crate::kernel::{CpuBackend, KernelBackend};
use crate::params::{HeadlessPanelFactory, PanelFactory, ParamError, ParamMenu, ParamValue, SourcingChange};
use crate::telemetry::FrameProfiler;
use crate::textures::{TextureId, TextureInstance, TextureRegistry, LAST_OUTPUT_FRAME, TEXTURES_SOURCING};
use crate::video::{SharedVideo, VideoError};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StackError {
    #[error("Source video has no frame size yet")]
    SourceNotReady,

    #[error("No source video configured")]
    NotConfigured,

    #[error("Unknown filter type: {0}")]
    UnknownFilterType(String),

    #[error("Unknown texture generator type: {0}")]
    UnknownTextureType(String),

    #[error("No filter with id {0}")]
    UnknownFilter(FilterId),

    #[error("No texture named '{0}'")]
    UnknownTexture(String),

    #[error("A texture named '{0}' already exists")]
    DuplicateTexture(String),

    #[error("'{0}' is reserved for the stack")]
    ReservedName(String),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Param(#[from] ParamError),

    #[error(transparent)]
    Video(#[from] VideoError),

    #[error(transparent)]
    Output(#[from] OutputError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackState {
    /// No source video yet
    Unconfigured,
    /// Buffers allocated for the source size
    Configured,
    Running,
    /// Takes effect at the start of the next tick
    StopRequested,
    Stopped,
}

/// What a tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not running
    Idle,
    /// Running, but the video had no frame to give
    NotReady,
    /// A frame went through the pipeline
    Rendered,
    /// The stop request took effect
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackOptions {
    /// Skip redrawing textures no filter reads
    pub skip_unused_textures: bool,
    /// Log a timing summary every this many rendered ticks (0 disables)
    pub stats_interval: u64,
}

impl Default for StackOptions {
    fn default() -> Self {
        Self {
            skip_unused_textures: false,
            stats_interval: 120,
        }
    }
}

/// Texture lookup over the stack's slots, the last output frame included
struct TextureSlots<'a> {
    textures: &'a [TextureInstance],
    last_output: &'a Frame,
}

impl TextureLookup for TextureSlots<'_> {
    fn texture(&self, name: &str) -> Option<&Frame> {
        if name == LAST_OUTPUT_FRAME {
            return Some(self.last_output);
        }
        self.textures.iter().find(|t| t.name() == name).map(|t| t.buffer())
    }
}

pub struct FilterStack {
    state: StackState,
    context: PipelineContext,
    backend: Arc<dyn KernelBackend>,
    filter_types: Arc<FilterRegistry>,
    texture_types: Arc<TextureRegistry>,
    panel_factory: Arc<dyn PanelFactory>,
    video: Option<SharedVideo>,
    dimensions: Option<(u32, u32)>,
    /// Pre-pipeline copy of the video frame
    frame: Frame,
    last_output: Frame,
    textures: Vec<TextureInstance>,
    filters: Vec<FilterInstance>,
    texture_menu: ParamMenu<TextureId>,
    filter_menu: ParamMenu<FilterId>,
    output: Option<Box<dyn OutputSurface>>,
    options: StackOptions,
    profiler: FrameProfiler,
    next_id: u32,
    rendered: u64,
}

impl FilterStack {
    pub fn new(context: PipelineContext, filter_types: Arc<FilterRegistry>, texture_types: Arc<TextureRegistry>) -> Self {
        let mut texture_menu = ParamMenu::new("Textures");
        let mut filter_menu = ParamMenu::new("Filters");
        let slots = vec![LAST_OUTPUT_FRAME.to_string()];
        texture_menu.register_sourcing_data(TEXTURES_SOURCING, slots.clone());
        filter_menu.register_sourcing_data(TEXTURES_SOURCING, slots);

        Self {
            state: StackState::Unconfigured,
            context,
            backend: Arc::new(CpuBackend::default()),
            filter_types,
            texture_types,
            panel_factory: Arc::new(HeadlessPanelFactory),
            video: None,
            dimensions: None,
            frame: Frame::new(0, 0),
            last_output: Frame::new(0, 0),
            textures: Vec::new(),
            filters: Vec::new(),
            texture_menu,
            filter_menu,
            output: None,
            options: StackOptions::default(),
            profiler: FrameProfiler::new(),
            next_id: 1,
            rendered: 0,
        }
    }

    pub fn with_backend(mut self, backend: Arc<dyn KernelBackend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_panel_factory(mut self, factory: Arc<dyn PanelFactory>) -> Self {
        self.panel_factory = factory;
        self
    }

    pub fn with_output(mut self, output: Box<dyn OutputSurface>) -> Self {
        self.output = Some(output);
        self
    }

    pub fn with_options(mut self, options: StackOptions) -> Self {
        self.options = options;
        self
    }

    pub fn state(&self) -> StackState {
        self.state
    }

    pub fn context(&self) -> &PipelineContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut PipelineContext {
        &mut self.context
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.dimensions
    }

    /// The pre-pipeline frame of the last rendered tick
    pub fn input_frame(&self) -> &Frame {
        &self.frame
    }

    /// The presented frame of the last rendered tick
    pub fn last_output(&self) -> &Frame {
        &self.last_output
    }

    /// Rendered ticks so far
    pub fn rendered(&self) -> u64 {
        self.rendered
    }

    pub fn profiler(&self) -> &FrameProfiler {
        &self.profiler
    }

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    // ---- Source ----

    /// Bind the source video and allocate every buffer for its size
    pub fn set_source_video(&mut self, video: SharedVideo) -> Result<(), StackError> {
        let (width, height) = video.lock().dimensions();
        if width == 0 || height == 0 {
            return Err(StackError::SourceNotReady);
        }
        self.video = Some(video);
        self.reallocate(width, height)?;
        if self.state == StackState::Unconfigured {
            self.state = StackState::Configured;
        }
        Ok(())
    }

    /// Reallocation cascade: frame buffers, then textures, then filters
    fn reallocate(&mut self, width: u32, height: u32) -> Result<(), StackError> {
        let resumed = self.state;
        self.state = StackState::Configured;
        tracing::info!(width, height, "Reallocating pipeline");

        self.frame.resize(width, height);
        self.last_output.resize(width, height);
        for texture in &mut self.textures {
            texture.update_dimensions(width, height);
        }
        for filter in &mut self.filters {
            filter.update_dimensions(width, height, self.backend.as_ref())?;
        }
        self.dimensions = Some((width, height));

        if resumed != StackState::Unconfigured {
            self.state = resumed;
        }
        Ok(())
    }

    // ---- Textures ----

    /// Add a texture slot called `name` drawn by generator type `type_name`
    pub fn add_texture_generator(&mut self, name: &str, type_name: &str) -> Result<TextureId, StackError> {
        if name == LAST_OUTPUT_FRAME {
            return Err(StackError::ReservedName(name.to_string()));
        }
        if self.textures.iter().any(|t| t.name() == name) {
            return Err(StackError::DuplicateTexture(name.to_string()));
        }
        let definition = self
            .texture_types
            .get(type_name)
            .ok_or_else(|| StackError::UnknownTextureType(type_name.to_string()))?;

        let id = self.allocate_id();
        let panel = self
            .texture_menu
            .add_item(id, name, &definition.params(), self.panel_factory.as_ref());
        let mut texture = TextureInstance::new(id, name, definition).with_panel(panel);
        if let Some((width, height)) = self.dimensions {
            texture.update_dimensions(width, height);
        }
        self.textures.push(texture);

        let change = SourcingChange::added(name);
        self.texture_menu.sourcing_data_changed(TEXTURES_SOURCING, &change);
        self.filter_menu.sourcing_data_changed(TEXTURES_SOURCING, &change);
        self.sync_texture_users();

        tracing::info!(texture = %name, generator = %type_name, id, "Texture added");
        Ok(id)
    }

    /// Remove a texture slot; filters still selecting it are skipped until changed
    pub fn remove_texture(&mut self, name: &str) -> Result<(), StackError> {
        let index = self
            .textures
            .iter()
            .position(|t| t.name() == name)
            .ok_or_else(|| StackError::UnknownTexture(name.to_string()))?;
        let texture = self.textures.remove(index);
        self.texture_menu.remove_item(texture.id());

        for filter in &mut self.filters {
            if filter.bound_textures().iter().any(|n| n == name) {
                let kept = filter.bound_textures().iter().filter(|n| *n != name).cloned().collect();
                filter.rebind_textures(kept);
            }
        }

        let change = SourcingChange::removed(name);
        self.texture_menu.sourcing_data_changed(TEXTURES_SOURCING, &change);
        self.filter_menu.sourcing_data_changed(TEXTURES_SOURCING, &change);

        tracing::info!(texture = %name, "Texture removed");
        Ok(())
    }

    pub fn texture(&self, name: &str) -> Option<&TextureInstance> {
        self.textures.iter().find(|t| t.name() == name)
    }

    /// Texture slot names in menu order
    pub fn texture_names(&self) -> Vec<String> {
        self.textures.iter().map(|t| t.name().to_string()).collect()
    }

    /// Current `Textures` sourcing list, the last output slot included
    pub fn texture_sourcing(&self) -> Vec<String> {
        self.filter_menu
            .sourcing_data(TEXTURES_SOURCING)
            .map(|s| s.to_vec())
            .unwrap_or_default()
    }

    pub fn move_texture(&mut self, from: usize, to: usize) -> Result<(), StackError> {
        self.texture_menu.move_item(from, to)?;
        let texture = self.textures.remove(from);
        self.textures.insert(to, texture);
        Ok(())
    }

    pub fn set_texture_param(&mut self, name: &str, param: &str, value: ParamValue) -> Result<(), StackError> {
        let texture = self.texture(name).ok_or_else(|| StackError::UnknownTexture(name.to_string()))?;
        let panel = texture.panel().ok_or_else(|| StackError::UnknownTexture(name.to_string()))?;
        panel.lock().set_value(param, value)?;
        Ok(())
    }

    pub fn texture_menu(&self) -> &ParamMenu<TextureId> {
        &self.texture_menu
    }

    // ---- Filters ----

    /// Append a filter of type `type_name`
    pub fn add_filter(&mut self, type_name: &str) -> Result<FilterId, StackError> {
        let definition = self
            .filter_types
            .get(type_name)
            .ok_or_else(|| StackError::UnknownFilterType(type_name.to_string()))?;

        let id = self.allocate_id();
        let panel = self
            .filter_menu
            .add_item(id, type_name, &definition.params(), self.panel_factory.as_ref());
        let mut filter = FilterInstance::new(id, definition, panel);
        if let Some((width, height)) = self.dimensions {
            if let Err(e) = filter.update_dimensions(width, height, self.backend.as_ref()) {
                self.filter_menu.remove_item(id);
                return Err(e.into());
            }
        }
        self.filters.push(filter);
        self.sync_texture_users();

        tracing::info!(filter = %type_name, id, position = self.filters.len() - 1, "Filter added");
        Ok(id)
    }

    /// Remove a filter, releasing the textures it reads
    pub fn remove_filter(&mut self, id: FilterId) -> Result<(), StackError> {
        let index = self.filter_position(id).ok_or(StackError::UnknownFilter(id))?;
        let filter = self.filters.remove(index);
        self.filter_menu.remove_item(id);

        for name in filter.bound_textures() {
            if let Some(texture) = self.textures.iter_mut().find(|t| t.name() == name) {
                texture.unuse();
            }
        }
        tracing::info!(filter = %filter.type_name(), id, "Filter removed");
        Ok(())
    }

    /// Move the filter at `from` to `to`; later filters shift
    pub fn move_filter(&mut self, from: usize, to: usize) -> Result<(), StackError> {
        self.filter_menu.move_item(from, to)?;
        let filter = self.filters.remove(from);
        self.filters.insert(to, filter);
        Ok(())
    }

    pub fn set_bypass(&mut self, id: FilterId, bypassed: bool) -> Result<(), StackError> {
        let index = self.filter_position(id).ok_or(StackError::UnknownFilter(id))?;
        self.filters[index].set_bypassed(bypassed);
        Ok(())
    }

    pub fn set_filter_param(&mut self, id: FilterId, param: &str, value: ParamValue) -> Result<(), StackError> {
        let index = self.filter_position(id).ok_or(StackError::UnknownFilter(id))?;
        self.filters[index].panel().lock().set_value(param, value)?;
        Ok(())
    }

    pub fn filter(&self, id: FilterId) -> Option<&FilterInstance> {
        self.filters.iter().find(|f| f.id() == id)
    }

    fn filter_position(&self, id: FilterId) -> Option<usize> {
        self.filters.iter().position(|f| f.id() == id)
    }

    /// Execution order
    pub fn filter_order(&self) -> Vec<FilterId> {
        self.filters.iter().map(|f| f.id()).collect()
    }

    pub fn filter_menu(&self) -> &ParamMenu<FilterId> {
        &self.filter_menu
    }

    /// Bring texture use counts in line with what each filter selects
    fn sync_texture_users(&mut self) {
        let textures = &mut self.textures;
        for filter in &mut self.filters {
            let wanted: Vec<String> = filter
                .texture_refs()
                .into_iter()
                .filter(|name| textures.iter().any(|t| t.name() == name))
                .collect();
            if wanted.as_slice() == filter.bound_textures() {
                continue;
            }
            for name in filter.rebind_textures(wanted.clone()) {
                if let Some(texture) = textures.iter_mut().find(|t| t.name() == name) {
                    texture.unuse();
                }
            }
            for name in &wanted {
                if let Some(texture) = textures.iter_mut().find(|t| t.name() == name) {
                    texture.use_texture();
                }
            }
        }
    }

    // ---- Run state ----

    /// Start (or resume) ticking; cancels a pending stop
    pub fn start(&mut self) -> Result<(), StackError> {
        match self.state {
            StackState::Unconfigured => Err(StackError::NotConfigured),
            _ => {
                if self.state != StackState::Running {
                    tracing::info!("Pipeline started");
                }
                self.state = StackState::Running;
                Ok(())
            }
        }
    }

    /// Request a stop, honoured at the start of the next tick
    pub fn stop(&mut self) {
        if self.state == StackState::Running {
            self.state = StackState::StopRequested;
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, StackState::Running | StackState::StopRequested)
    }

    /// Run one pipeline step
    pub fn tick(&mut self) -> Result<TickOutcome, StackError> {
        match self.state {
            StackState::Running => {}
            StackState::StopRequested => {
                self.state = StackState::Stopped;
                tracing::info!(rendered = self.rendered, "Pipeline stopped");
                return Ok(TickOutcome::Stopped);
            }
            _ => return Ok(TickOutcome::Idle),
        }
        let Some(video) = self.video.clone() else {
            return Ok(TickOutcome::Idle);
        };
        let video = video.lock();
        if !video.is_ready() {
            return Ok(TickOutcome::NotReady);
        }
        let (width, height) = video.dimensions();
        if width == 0 || height == 0 {
            return Ok(TickOutcome::NotReady);
        }
        if self.dimensions != Some((width, height)) {
            self.reallocate(width, height)?;
        }

        self.profiler.begin_tick();
        self.context.refresh();
        video.copy_frame(&mut self.frame)?;
        drop(video);

        self.sync_texture_users();
        let data = self.context.data();
        for texture in &mut self.textures {
            if self.options.skip_unused_textures && texture.users() == 0 {
                continue;
            }
            texture.draw(&self.frame, data);
        }

        let mut current = self.frame.clone();
        let slots = TextureSlots {
            textures: &self.textures,
            last_output: &self.last_output,
        };
        for filter in &mut self.filters {
            if filter.is_bypassed() {
                continue;
            }
            match filter.process(&current, &slots, data) {
                Ok(next) => current = next,
                Err(e) => tracing::trace!(filter = %filter.type_name(), id = filter.id(), error = %e, "Filter skipped"),
            }
        }

        if let Some(output) = &mut self.output {
            if let Err(e) = output.present(&current, self.rendered) {
                tracing::warn!(error = %e, frame = self.rendered, "Failed to present frame");
            }
        }
        self.last_output = current;
        self.rendered += 1;
        self.profiler.end_tick();

        if self.options.stats_interval > 0 && self.rendered % self.options.stats_interval == 0 {
            let stats = self.profiler.stats();
            tracing::debug!(
                rendered = self.rendered,
                avg_ms = stats.avg_ms,
                p95_ms = stats.p95_ms,
                max_ms = stats.max_ms,
                fps = self.profiler.fps(),
                "Pipeline timing"
            );
        }
        Ok(TickOutcome::Rendered)
    }
}

impl std::fmt::Debug for FilterStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterStack")
            .field("state", &self.state)
            .field("dimensions", &self.dimensions)
            .field("textures", &self.texture_names())
            .field("filters", &self.filter_order())
            .field("rendered", &self.rendered)
            .finish()
    }
}
