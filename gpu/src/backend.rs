//! Backend abstraction — the GPU collaborators a kernel invocation talks to.
//!
//! A backend is a zero-sized marker type (`Metal`, `Wgpu`) whose associated
//! types wrap the platform objects. All operations are associated functions
//! so the dispatcher can stay generic without holding a backend value.
//!
//! Every fallible step returns `Result<_, String>`; `Err` carries the
//! platform's message and the dispatcher attaches the step it belongs to.

use crate::config::DispatchOptions;

pub trait Backend: Sized {
    /// Identity-comparable device handle.
    type Device: Clone;
    /// Device memory backing a [`GpuBuffer`](crate::GpuBuffer).
    type Storage;
    type Library;
    type Function;
    type Pipeline;
    type Queue;
    type CommandBuffer;
    type Encoder;

    /// Short backend name used in log output.
    const NAME: &'static str;

    /// Identity comparison: two handles to the same physical/logical device.
    fn same_device(a: &Self::Device, b: &Self::Device) -> bool;

    /// Human-readable device description for diagnostics.
    fn describe_device(device: &Self::Device) -> String;

    // -- compilation -------------------------------------------------------

    fn compile_library(device: &Self::Device, source: &str) -> Result<Self::Library, String>;

    fn function(library: &Self::Library, name: &str) -> Result<Self::Function, String>;

    fn pipeline(
        device: &Self::Device,
        function: &Self::Function,
    ) -> Result<Self::Pipeline, String>;

    fn command_queue(device: &Self::Device) -> Result<Self::Queue, String>;

    // -- per-invocation encoding ------------------------------------------

    fn command_buffer(queue: &Self::Queue) -> Result<Self::CommandBuffer, String>;

    fn compute_encoder(command_buffer: &mut Self::CommandBuffer) -> Result<Self::Encoder, String>;

    fn set_pipeline(encoder: &mut Self::Encoder, pipeline: &Self::Pipeline) -> Result<(), String>;

    /// Bind `storage` as kernel argument `slot` (0-based).
    fn set_buffer(
        encoder: &mut Self::Encoder,
        storage: &Self::Storage,
        slot: usize,
    ) -> Result<(), String>;

    /// Size the dispatch grid to `count` threads using the pipeline's limits.
    fn dispatch_threads(
        encoder: &mut Self::Encoder,
        pipeline: &Self::Pipeline,
        count: usize,
        options: &DispatchOptions,
    ) -> Result<(), String>;

    fn end_encoding(
        command_buffer: &mut Self::CommandBuffer,
        encoder: Self::Encoder,
    ) -> Result<(), String>;

    fn commit(command_buffer: &mut Self::CommandBuffer) -> Result<(), String>;

    /// Block until the GPU finishes. `Err` means the work itself failed.
    fn wait_until_completed(command_buffer: Self::CommandBuffer) -> Result<(), String>;
}
