//! WebGPU backend for kernel invocation (cross-platform via wgpu)
//!
//! Kernels are WGSL; buffer `i` of the argument list is bound at
//! `@group(0) @binding(i)`. The entry point's `@workgroup_size` must match
//! [`DispatchOptions::workgroup_size`].

pub mod buffer_ops;
pub mod compile;
pub mod device_init;
pub mod dispatch;

use std::sync::Arc;

use crate::backend::Backend;
use crate::config::DispatchOptions;

pub use buffer_ops::WgpuStorage;
pub use compile::{WgpuFunction, WgpuLibrary, WgpuPipeline};
pub use device_init::{WgpuContext, WgpuDevice};
pub use dispatch::{WgpuCommandBuffer, WgpuEncoder};

/// Marker type selecting the wgpu backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct Wgpu;

impl Backend for Wgpu {
    type Device = WgpuDevice;
    type Storage = WgpuStorage;
    type Library = WgpuLibrary;
    type Function = WgpuFunction;
    type Pipeline = WgpuPipeline;
    /// wgpu has one queue per device.
    type Queue = WgpuDevice;
    type CommandBuffer = WgpuCommandBuffer;
    type Encoder = WgpuEncoder;

    const NAME: &'static str = "wgpu";

    fn same_device(a: &WgpuDevice, b: &WgpuDevice) -> bool {
        Arc::ptr_eq(a, b)
    }

    fn describe_device(device: &WgpuDevice) -> String {
        format!("{} ({:?})", device.info.name, device.info.backend)
    }

    fn compile_library(device: &WgpuDevice, source: &str) -> Result<WgpuLibrary, String> {
        compile::compile_library(device, source)
    }

    fn function(library: &WgpuLibrary, name: &str) -> Result<WgpuFunction, String> {
        compile::find_function(library, name)
    }

    fn pipeline(device: &WgpuDevice, function: &WgpuFunction) -> Result<WgpuPipeline, String> {
        compile::create_pipeline(device, function)
    }

    fn command_queue(device: &WgpuDevice) -> Result<WgpuDevice, String> {
        Ok(Arc::clone(device))
    }

    fn command_buffer(queue: &WgpuDevice) -> Result<WgpuCommandBuffer, String> {
        dispatch::command_buffer(queue)
    }

    fn compute_encoder(command_buffer: &mut WgpuCommandBuffer) -> Result<WgpuEncoder, String> {
        dispatch::compute_encoder(command_buffer)
    }

    fn set_pipeline(encoder: &mut WgpuEncoder, pipeline: &WgpuPipeline) -> Result<(), String> {
        dispatch::set_pipeline(encoder, pipeline);
        Ok(())
    }

    fn set_buffer(
        encoder: &mut WgpuEncoder,
        storage: &WgpuStorage,
        slot: usize,
    ) -> Result<(), String> {
        dispatch::set_buffer(encoder, storage, slot)
    }

    fn dispatch_threads(
        encoder: &mut WgpuEncoder,
        pipeline: &WgpuPipeline,
        count: usize,
        options: &DispatchOptions,
    ) -> Result<(), String> {
        dispatch::dispatch_threads(encoder, pipeline, count, options)
    }

    fn end_encoding(
        command_buffer: &mut WgpuCommandBuffer,
        encoder: WgpuEncoder,
    ) -> Result<(), String> {
        dispatch::end_encoding(command_buffer, encoder)
    }

    fn commit(command_buffer: &mut WgpuCommandBuffer) -> Result<(), String> {
        dispatch::commit(command_buffer)
    }

    fn wait_until_completed(command_buffer: WgpuCommandBuffer) -> Result<(), String> {
        dispatch::wait_until_completed(command_buffer)
    }
}
