//! Kernel execution
//!
//! A filter's per-pixel function is a `PixelKernel`. A `KernelBackend` compiles
//! it for one output size into a `KernelProgram`, which can then be run any
//! number of times against argument lists of that size. The program's output
//! is a plain `Frame`, so runs chain: the output of one filter is the input
//! frame of the next.
//!
//! `CpuBackend` is the reference executor. It evaluates the kernel once per
//! output pixel with rows shaded in parallel on a rayon pool.

use std::sync::Arc;

use rayon::prelude::*;
use rayon::ThreadPool;
use thiserror::Error;

use crate::frame::{Frame, Pixel};

/// Errors from compiling or running a kernel
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KernelError {
    #[error("Kernel output size must be non-zero, got {width}x{height}")]
    ZeroSize { width: u32, height: u32 },

    #[error("Input '{input}' is {actual:?}, kernel was compiled for {expected:?}")]
    DimensionMismatch {
        input: String,
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("Failed to build kernel thread pool: {0}")]
    ThreadPool(String),
}

/// One positional kernel argument
#[derive(Debug, Clone, Copy)]
pub enum KernelArg<'a> {
    Number(f32),
    Color([f32; 4]),
    Texture(&'a Frame),
}

/// The arguments of one kernel run: the running frame plus the resolved
/// parameters in schema order
#[derive(Debug, Clone)]
pub struct KernelArgs<'a> {
    pub frame: &'a Frame,
    pub params: Vec<KernelArg<'a>>,
}

impl<'a> KernelArgs<'a> {
    pub fn new(frame: &'a Frame, params: Vec<KernelArg<'a>>) -> Self {
        Self { frame, params }
    }

    /// Numeric argument at `index`; 0.0 if absent or not a number
    pub fn number(&self, index: usize) -> f32 {
        match self.params.get(index) {
            Some(KernelArg::Number(v)) => *v,
            _ => 0.0,
        }
    }

    /// Boolean argument (encoded as 0/1)
    pub fn flag(&self, index: usize) -> bool {
        self.number(index) > 0.5
    }

    pub fn color(&self, index: usize) -> [f32; 4] {
        match self.params.get(index) {
            Some(KernelArg::Color(c)) => *c,
            _ => [0.0; 4],
        }
    }

    pub fn texture(&self, index: usize) -> Option<&'a Frame> {
        match self.params.get(index) {
            Some(KernelArg::Texture(t)) => Some(*t),
            _ => None,
        }
    }

    /// Current frame pixel at `(x, y)`
    pub fn pixel(&self, x: u32, y: u32) -> Pixel {
        self.frame.get(x, y)
    }

    /// Mask value at `(x, y)` from the texture argument at `index`.
    ///
    /// The red channel carries the mask; a missing texture masks nothing.
    pub fn mask(&self, index: usize, x: u32, y: u32) -> f32 {
        self.texture(index).map(|t| t.get(x, y)[0]).unwrap_or(0.0)
    }
}

/// A per-pixel function over the running frame and its arguments
pub trait PixelKernel: Send + Sync {
    /// Output pixel at `(x, y)`
    fn shade(&self, x: u32, y: u32, args: &KernelArgs<'_>) -> Pixel;
}

impl<F> PixelKernel for F
where
    F: Fn(u32, u32, &KernelArgs<'_>) -> Pixel + Send + Sync,
{
    fn shade(&self, x: u32, y: u32, args: &KernelArgs<'_>) -> Pixel {
        self(x, y, args)
    }
}

/// A kernel bound to one output size
pub trait KernelProgram: Send {
    fn dimensions(&self) -> (u32, u32);

    /// Run the kernel over every output pixel
    fn run(&self, args: &KernelArgs<'_>) -> Result<Frame, KernelError>;
}

/// Compiles kernels into runnable programs
pub trait KernelBackend: Send + Sync {
    fn compile(
        &self,
        kernel: Arc<dyn PixelKernel>,
        width: u32,
        height: u32,
    ) -> Result<Box<dyn KernelProgram>, KernelError>;
}

/// Reference CPU executor
///
/// Runs on rayon's global pool unless built with a dedicated one.
#[derive(Debug, Clone, Default)]
pub struct CpuBackend {
    pool: Option<Arc<ThreadPool>>,
}

impl CpuBackend {
    /// Backend with its own pool of `threads` workers (at least one)
    pub fn with_threads(threads: usize) -> Result<Self, KernelError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("pose-fx-kernel-{i}"))
            .build()
            .map_err(|e| KernelError::ThreadPool(e.to_string()))?;
        Ok(Self {
            pool: Some(Arc::new(pool)),
        })
    }

    /// Worker count of the pool kernels run on
    pub fn threads(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }
}

impl KernelBackend for CpuBackend {
    fn compile(
        &self,
        kernel: Arc<dyn PixelKernel>,
        width: u32,
        height: u32,
    ) -> Result<Box<dyn KernelProgram>, KernelError> {
        if width == 0 || height == 0 {
            return Err(KernelError::ZeroSize { width, height });
        }
        Ok(Box::new(CpuProgram {
            kernel,
            width,
            height,
            pool: self.pool.clone(),
        }))
    }
}

struct CpuProgram {
    kernel: Arc<dyn PixelKernel>,
    width: u32,
    height: u32,
    pool: Option<Arc<ThreadPool>>,
}

impl CpuProgram {
    fn check(&self, name: &str, frame: &Frame) -> Result<(), KernelError> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(KernelError::DimensionMismatch {
                input: name.to_string(),
                expected: (self.width, self.height),
                actual: frame.dimensions(),
            });
        }
        Ok(())
    }

    fn shade_rows(&self, args: &KernelArgs<'_>, pixels: &mut [Pixel]) {
        pixels
            .par_chunks_mut(self.width as usize)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, pixel) in row.iter_mut().enumerate() {
                    *pixel = self.kernel.shade(x as u32, y as u32, args);
                }
            });
    }
}

impl KernelProgram for CpuProgram {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn run(&self, args: &KernelArgs<'_>) -> Result<Frame, KernelError> {
        self.check("frame", args.frame)?;
        for (i, arg) in args.params.iter().enumerate() {
            if let KernelArg::Texture(t) = arg {
                self.check(&format!("param {}", i), t)?;
            }
        }

        let mut pixels = vec![[0.0f32; 4]; self.width as usize * self.height as usize];
        match &self.pool {
            Some(pool) => pool.install(|| self.shade_rows(args, &mut pixels)),
            None => self.shade_rows(args, &mut pixels),
        }

        Ok(Frame::from_pixels(self.width, self.height, pixels))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::WHITE;

    fn invert() -> Arc<dyn PixelKernel> {
        Arc::new(|x: u32, y: u32, args: &KernelArgs<'_>| {
            let p = args.pixel(x, y);
            [1.0 - p[0], 1.0 - p[1], 1.0 - p[2], p[3]]
        })
    }

    #[test]
    fn test_compile_rejects_zero_size() {
        let backend = CpuBackend::default();
        let err = backend.compile(invert(), 0, 10).err();
        assert_eq!(err, Some(KernelError::ZeroSize { width: 0, height: 10 }));
    }

    #[test]
    fn test_run_applies_kernel() {
        let program = CpuBackend::default().compile(invert(), 4, 3).unwrap();
        let frame = Frame::filled(4, 3, WHITE);
        let out = program.run(&KernelArgs::new(&frame, vec![])).unwrap();
        assert!(out.pixels().iter().all(|p| *p == [0.0, 0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_run_rejects_mismatched_frame() {
        let program = CpuBackend::default().compile(invert(), 4, 3).unwrap();
        let frame = Frame::new(5, 3);
        let err = program.run(&KernelArgs::new(&frame, vec![])).unwrap_err();
        assert!(matches!(err, KernelError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_run_rejects_mismatched_texture() {
        let program = CpuBackend::default().compile(invert(), 4, 3).unwrap();
        let frame = Frame::new(4, 3);
        let mask = Frame::new(2, 2);
        let args = KernelArgs::new(&frame, vec![KernelArg::Texture(&mask)]);
        assert!(program.run(&args).is_err());
    }

    #[test]
    fn test_pool_size_does_not_change_output() {
        let gradient: Arc<dyn PixelKernel> = Arc::new(|x: u32, y: u32, args: &KernelArgs<'_>| {
            let scale = args.number(0);
            [x as f32 * scale, y as f32 * scale, 0.0, 1.0]
        });
        let frame = Frame::new(7, 9);
        let args = KernelArgs::new(&frame, vec![KernelArg::Number(0.1)]);

        let single = CpuBackend::with_threads(1).unwrap();
        let multi = CpuBackend::with_threads(4).unwrap();
        assert_eq!(single.threads(), 1);
        assert_eq!(multi.threads(), 4);

        let expected = Frame::from_fn(7, 9, |x, y| [x as f32 * 0.1, y as f32 * 0.1, 0.0, 1.0]);
        for backend in [single, multi, CpuBackend::default()] {
            let program = backend.compile(gradient.clone(), 7, 9).unwrap();
            assert_eq!(program.run(&args).unwrap().as_bytes(), expected.as_bytes());
        }
    }

    #[test]
    fn test_arg_accessors() {
        let frame = Frame::new(1, 1);
        let mask = Frame::filled(1, 1, WHITE);
        let args = KernelArgs::new(
            &frame,
            vec![
                KernelArg::Number(1.0),
                KernelArg::Color([0.5, 0.25, 0.0, 1.0]),
                KernelArg::Texture(&mask),
            ],
        );
        assert!(args.flag(0));
        assert_eq!(args.color(1), [0.5, 0.25, 0.0, 1.0]);
        assert_eq!(args.mask(2, 0, 0), 1.0);
        assert_eq!(args.number(1), 0.0);
        assert!(args.texture(0).is_none());
        assert_eq!(args.mask(5, 0, 0), 0.0);
    }
}
