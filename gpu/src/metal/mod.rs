//! Metal backend for kernel invocation (macOS)
//!
//! Kernels are Metal Shading Language source; buffer `i` of the argument
//! list is bound at `[[buffer(i)]]` and the grid is one-dimensional
//! (`[[thread_position_in_grid]]`).

pub mod buffer_ops;
pub mod compile;
pub mod device_init;
pub mod dispatch;

use objc2_metal::MTLDevice;

use crate::backend::Backend;
use crate::config::DispatchOptions;

pub use buffer_ops::MetalStorage;
pub use compile::{MetalFunction, MetalLibrary, MetalPipeline, MetalQueue};
pub use device_init::MetalDevice;
pub use dispatch::{MetalCommandBuffer, MetalEncoder};

/// Marker type selecting the Metal backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct Metal;

impl Backend for Metal {
    type Device = MetalDevice;
    type Storage = MetalStorage;
    type Library = MetalLibrary;
    type Function = MetalFunction;
    type Pipeline = MetalPipeline;
    type Queue = MetalQueue;
    type CommandBuffer = MetalCommandBuffer;
    type Encoder = MetalEncoder;

    const NAME: &'static str = "metal";

    fn same_device(a: &MetalDevice, b: &MetalDevice) -> bool {
        std::ptr::eq(&**a, &**b)
    }

    fn describe_device(device: &MetalDevice) -> String {
        device.name().to_string()
    }

    fn compile_library(device: &MetalDevice, source: &str) -> Result<MetalLibrary, String> {
        compile::compile_library(device, source)
    }

    fn function(library: &MetalLibrary, name: &str) -> Result<MetalFunction, String> {
        compile::find_function(library, name)
    }

    fn pipeline(device: &MetalDevice, function: &MetalFunction) -> Result<MetalPipeline, String> {
        compile::create_pipeline(device, function)
    }

    fn command_queue(device: &MetalDevice) -> Result<MetalQueue, String> {
        compile::create_queue(device)
    }

    fn command_buffer(queue: &MetalQueue) -> Result<MetalCommandBuffer, String> {
        dispatch::command_buffer(queue)
    }

    fn compute_encoder(command_buffer: &mut MetalCommandBuffer) -> Result<MetalEncoder, String> {
        dispatch::compute_encoder(command_buffer)
    }

    fn set_pipeline(encoder: &mut MetalEncoder, pipeline: &MetalPipeline) -> Result<(), String> {
        dispatch::set_pipeline(encoder, pipeline);
        Ok(())
    }

    fn set_buffer(
        encoder: &mut MetalEncoder,
        storage: &MetalStorage,
        slot: usize,
    ) -> Result<(), String> {
        dispatch::set_buffer(encoder, storage, slot);
        Ok(())
    }

    fn dispatch_threads(
        encoder: &mut MetalEncoder,
        pipeline: &MetalPipeline,
        count: usize,
        options: &DispatchOptions,
    ) -> Result<(), String> {
        dispatch::dispatch_threads(encoder, pipeline, count, options)
    }

    fn end_encoding(
        _command_buffer: &mut MetalCommandBuffer,
        encoder: MetalEncoder,
    ) -> Result<(), String> {
        dispatch::end_encoding(encoder);
        Ok(())
    }

    fn commit(command_buffer: &mut MetalCommandBuffer) -> Result<(), String> {
        dispatch::commit(command_buffer)
    }

    fn wait_until_completed(command_buffer: MetalCommandBuffer) -> Result<(), String> {
        dispatch::wait_until_completed(&command_buffer)
    }
}
