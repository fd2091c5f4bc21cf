//! Live filter bindings
//!
//! A `FilterInstance` pairs a definition with its parameter panel and a kernel
//! program compiled for the stack's current dimensions.

use std::collections::HashMap;
use std::sync::Arc;

use super::traits::{FilterDefinition, TextureLookup};
use super::FilterError;
use crate::frame::Frame;
use crate::kernel::{KernelArg, KernelArgs, KernelBackend, KernelProgram, PixelKernel};
use crate::params::{parse_hex_color, EnumOptions, ParamKind, ParamValue, SharedPanel};
use crate::pipeline::ExternalData;
use crate::textures::TEXTURES_SOURCING;

/// Unique identifier for a filter instance within a stack
pub type FilterId = u32;

pub struct FilterInstance {
    id: FilterId,
    definition: Arc<dyn FilterDefinition>,
    kernel: Arc<dyn PixelKernel>,
    /// Compiled for the last `update_dimensions` call
    program: Option<Box<dyn KernelProgram>>,
    panel: SharedPanel,
    bypassed: bool,
    /// Texture slots this filter currently holds a use on
    bound_textures: Vec<String>,
    /// Resolution failures already logged, by parameter name
    reported: HashMap<String, String>,
}

impl FilterInstance {
    pub fn new(id: FilterId, definition: Arc<dyn FilterDefinition>, panel: SharedPanel) -> Self {
        let kernel = definition.kernel();
        Self {
            id,
            definition,
            kernel,
            program: None,
            panel,
            bypassed: false,
            bound_textures: Vec::new(),
            reported: HashMap::new(),
        }
    }

    pub fn id(&self) -> FilterId {
        self.id
    }

    pub fn type_name(&self) -> &str {
        self.definition.name()
    }

    pub fn panel(&self) -> &SharedPanel {
        &self.panel
    }

    pub fn is_bypassed(&self) -> bool {
        self.bypassed
    }

    pub fn set_bypassed(&mut self, bypassed: bool) {
        self.bypassed = bypassed;
    }

    /// Size the current program was compiled for
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.program.as_ref().map(|p| p.dimensions())
    }

    /// Recompile the kernel for a new output size
    pub fn update_dimensions(
        &mut self,
        width: u32,
        height: u32,
        backend: &dyn KernelBackend,
    ) -> Result<(), FilterError> {
        self.program = None;
        self.program = Some(backend.compile(self.kernel.clone(), width, height)?);
        tracing::debug!(filter = %self.type_name(), id = self.id, width, height, "Kernel compiled");
        Ok(())
    }

    /// Texture slot names selected by this filter's parameters
    pub fn texture_refs(&self) -> Vec<String> {
        let panel = self.panel.lock();
        panel
            .specs()
            .iter()
            .zip(panel.values())
            .filter(|(spec, _)| spec.sourcing() == Some(TEXTURES_SOURCING))
            .filter_map(|(_, value)| value.as_str().map(str::to_string))
            .collect()
    }

    pub(crate) fn bound_textures(&self) -> &[String] {
        &self.bound_textures
    }

    /// Record the texture uses now held; returns the previous ones
    pub(crate) fn rebind_textures(&mut self, textures: Vec<String>) -> Vec<String> {
        std::mem::replace(&mut self.bound_textures, textures)
    }

    /// Turn panel values into positional kernel arguments.
    ///
    /// Numbers sourced from external data read it at call time, booleans
    /// become 0/1, colors become RGBA floats and `Textures` enums become the
    /// selected buffer.
    pub fn resolve_args<'a>(
        &self,
        values: &[ParamValue],
        textures: &'a dyn TextureLookup,
        data: &ExternalData,
    ) -> Result<Vec<KernelArg<'a>>, FilterError> {
        let panel = self.panel.lock();
        let mut args = Vec::with_capacity(values.len());

        for (spec, value) in panel.specs().iter().zip(values) {
            let arg = match &spec.kind {
                ParamKind::Number { .. } => {
                    let sourced = spec.source.as_deref().and_then(|key| data.number(key));
                    KernelArg::Number(sourced.or_else(|| value.as_f32()).unwrap_or(0.0))
                }
                ParamKind::Boolean => KernelArg::Number(if value.as_bool().unwrap_or(false) { 1.0 } else { 0.0 }),
                ParamKind::Color => KernelArg::Color(parse_hex_color(value.as_str().unwrap_or_default())?),
                ParamKind::Enum { options } => {
                    let choice = value.as_str().unwrap_or_default();
                    match options {
                        EnumOptions::Sourced(source) if source == TEXTURES_SOURCING => {
                            let texture = textures.texture(choice).ok_or_else(|| FilterError::MissingTexture {
                                param: spec.name.clone(),
                                texture: choice.to_string(),
                            })?;
                            KernelArg::Texture(texture)
                        }
                        EnumOptions::Sourced(sourcing) => {
                            return Err(FilterError::UnresolvableSource {
                                param: spec.name.clone(),
                                sourcing: sourcing.clone(),
                            })
                        }
                        EnumOptions::Static(list) => {
                            let index = list.iter().position(|o| o == choice).unwrap_or(0);
                            KernelArg::Number(index as f32)
                        }
                    }
                }
            };
            args.push(arg);
        }
        Ok(args)
    }

    /// Run the filter over `frame`.
    ///
    /// A resolution failure is logged once per parameter until its value
    /// changes; the caller skips the filter for this tick.
    pub fn process(
        &mut self,
        frame: &Frame,
        textures: &dyn TextureLookup,
        data: &ExternalData,
    ) -> Result<Frame, FilterError> {
        let values = self.panel.lock().values();
        let args = match self.resolve_args(&values, textures, data) {
            Ok(args) => args,
            Err(e) => {
                self.report(&e);
                return Err(e);
            }
        };
        self.reported.clear();

        let program = self.program.as_ref().ok_or(FilterError::NotCompiled)?;
        Ok(program.run(&KernelArgs::new(frame, args))?)
    }

    fn report(&mut self, error: &FilterError) {
        let (param, detail) = match error {
            FilterError::MissingTexture { param, texture } => (param.clone(), texture.clone()),
            FilterError::UnresolvableSource { param, sourcing } => (param.clone(), sourcing.clone()),
            other => (String::new(), other.to_string()),
        };
        if self.reported.get(&param) == Some(&detail) {
            return;
        }
        tracing::error!(filter = %self.type_name(), id = self.id, error = %error, "Filter skipped: configuration error");
        self.reported.insert(param, detail);
    }
}

impl std::fmt::Debug for FilterInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterInstance")
            .field("id", &self.id)
            .field("type", &self.type_name())
            .field("dimensions", &self.dimensions())
            .field("bypassed", &self.bypassed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{BLACK, WHITE};
    use crate::kernel::CpuBackend;
    use crate::params::{HeadlessPanel, ParamSpec};
    use crate::pipeline::keys;
    use crate::registry::Descriptor;

    /// Mixes toward a color by mask * amount; exposes every argument kind
    struct ArgsFilter;

    impl Descriptor for ArgsFilter {
        fn name(&self) -> &str {
            "Args Filter"
        }
    }

    impl FilterDefinition for ArgsFilter {
        fn params(&self) -> Vec<ParamSpec> {
            vec![
                ParamSpec::sourced_choice("Shape", TEXTURES_SOURCING, "mask"),
                ParamSpec::number("Time", 0.0, 1000.0, 0.0).hidden().sourced_from(keys::TIME),
                ParamSpec::boolean("On", true),
                ParamSpec::color("Tint", "#ff0000"),
                ParamSpec::choice("Mode", &["a", "b", "c"], "c"),
            ]
        }

        fn kernel(&self) -> Arc<dyn PixelKernel> {
            Arc::new(|x: u32, y: u32, args: &KernelArgs<'_>| {
                let m = args.mask(0, x, y) * args.number(2);
                let p = args.pixel(x, y);
                let c = args.color(3);
                [p[0] + (c[0] - p[0]) * m, p[1] + (c[1] - p[1]) * m, p[2] + (c[2] - p[2]) * m, 1.0]
            })
        }
    }

    fn instance(sourcing: &[&str]) -> FilterInstance {
        let mut lists = HashMap::new();
        lists.insert(
            TEXTURES_SOURCING.to_string(),
            sourcing.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
        );
        let panel = HeadlessPanel::new("Args Filter", &ArgsFilter.params(), &lists).shared();
        FilterInstance::new(1, Arc::new(ArgsFilter), panel)
    }

    #[test]
    fn test_resolve_positional_args() {
        let filter = instance(&["mask"]);
        let mut textures = HashMap::new();
        textures.insert("mask".to_string(), Frame::filled(2, 2, WHITE));
        let mut data = ExternalData::new();
        data.set_number(keys::TIME, 12.5);

        let values = filter.panel().lock().values();
        let args = filter.resolve_args(&values, &textures, &data).unwrap();
        assert_eq!(args.len(), 5);
        assert!(matches!(args[0], KernelArg::Texture(t) if t.width() == 2));
        assert!(matches!(args[1], KernelArg::Number(v) if v == 12.5));
        assert!(matches!(args[2], KernelArg::Number(v) if v == 1.0));
        assert!(matches!(args[3], KernelArg::Color(c) if c == [1.0, 0.0, 0.0, 1.0]));
        assert!(matches!(args[4], KernelArg::Number(v) if v == 2.0));
    }

    #[test]
    fn test_process_requires_compiled_kernel() {
        let mut filter = instance(&["mask"]);
        let mut textures = HashMap::new();
        textures.insert("mask".to_string(), Frame::filled(2, 2, WHITE));
        let frame = Frame::filled(2, 2, BLACK);

        let err = filter.process(&frame, &textures, &ExternalData::new()).unwrap_err();
        assert!(matches!(err, FilterError::NotCompiled));

        filter.update_dimensions(2, 2, &CpuBackend::default()).unwrap();
        assert_eq!(filter.dimensions(), Some((2, 2)));
        let out = filter.process(&frame, &textures, &ExternalData::new()).unwrap();
        assert_eq!(out.get(1, 1), [1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_missing_texture_is_reported_once() {
        let mut filter = instance(&["mask"]);
        filter.update_dimensions(2, 2, &CpuBackend::default()).unwrap();
        let textures: HashMap<String, Frame> = HashMap::new();
        let frame = Frame::filled(2, 2, BLACK);

        for _ in 0..3 {
            let err = filter.process(&frame, &textures, &ExternalData::new()).unwrap_err();
            assert!(matches!(err, FilterError::MissingTexture { ref texture, .. } if texture == "mask"));
        }
        assert_eq!(filter.reported.len(), 1);
    }

    #[test]
    fn test_texture_refs_and_rebind() {
        let mut filter = instance(&["mask", "other"]);
        assert_eq!(filter.texture_refs(), vec!["mask".to_string()]);

        filter
            .panel()
            .lock()
            .set_value("Shape", ParamValue::Text("other".into()))
            .unwrap();
        assert_eq!(filter.texture_refs(), vec!["other".to_string()]);

        let old = filter.rebind_textures(vec!["other".into()]);
        assert!(old.is_empty());
        assert_eq!(filter.bound_textures(), ["other".to_string()]);
    }
}
