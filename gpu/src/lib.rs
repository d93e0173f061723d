//! gpu-invoke — run one custom GPU compute kernel over caller-owned buffers.
//!
//! A [`Dispatcher`] takes a kernel source string, an entry-point name and an
//! ordered list of device buffers. It validates the arguments, compiles the
//! kernel (or reuses the cached compilation when device, name and source are
//! unchanged), binds the buffers as sequential arguments, dispatches one
//! thread per element of the first buffer and blocks until the GPU is done.
//!
//! Backends plug in through the [`Backend`] trait: Metal (feature
//! `metal-backend`, macOS) and WebGPU (feature `webgpu-backend`).
//!
//! ```rust,ignore
//! use gpu_invoke::metal::{buffer_ops, device_init, Metal};
//! use gpu_invoke::Dispatcher;
//!
//! let device = device_init::system_default_device().unwrap();
//! let a = buffer_ops::from_slice(&device, vec![4], &[1.0f32, 2.0, 3.0, 4.0]).unwrap();
//! let b = buffer_ops::from_slice(&device, vec![4], &[1.0f32; 4]).unwrap();
//! let s = buffer_ops::from_slice(&device, vec![1], &[0.5f32]).unwrap();
//!
//! let mut dispatcher = Dispatcher::<Metal>::new();
//! dispatcher.invoke_buffers("scaleaccum", &[&a, &b, &s], SCALEACCUM_MSL)?;
//! ```

pub mod backend;
pub mod buffer;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod kernel_cache;
pub mod logging;
pub mod validate;

#[cfg(all(target_os = "macos", feature = "metal-backend"))]
pub mod metal;

#[cfg(feature = "webgpu-backend")]
pub mod wgpu_backend;

pub use backend::Backend;
pub use buffer::{DType, Element, GpuBuffer, KernelArg};
pub use config::DispatchOptions;
pub use dispatch::Dispatcher;
pub use error::{CompileStep, DispatchStep, ErrorKind, KernelError, ValidationError};
pub use kernel_cache::{CacheStats, CompiledKernel, KernelCache};
