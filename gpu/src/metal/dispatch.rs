//! Metal compute dispatch — encodes and submits one kernel invocation.

use objc2::rc::Retained;
use objc2::runtime::ProtocolObject;
use objc2_foundation::NSString;
use objc2_metal::{
    MTLCommandBuffer, MTLCommandBufferStatus, MTLCommandEncoder, MTLCommandQueue,
    MTLComputeCommandEncoder, MTLComputePipelineState, MTLSize,
};

use super::buffer_ops::MetalStorage;
use super::compile::{MetalPipeline, MetalQueue};
use crate::config::DispatchOptions;

pub type MetalCommandBuffer = Retained<ProtocolObject<dyn MTLCommandBuffer>>;
pub type MetalEncoder = Retained<ProtocolObject<dyn MTLComputeCommandEncoder>>;

pub fn command_buffer(queue: &MetalQueue) -> Result<MetalCommandBuffer, String> {
    queue
        .commandBuffer()
        .ok_or_else(|| "failed to create command buffer".to_string())
}

pub fn compute_encoder(command_buffer: &MetalCommandBuffer) -> Result<MetalEncoder, String> {
    command_buffer
        .computeCommandEncoder()
        .ok_or_else(|| "failed to create compute encoder".to_string())
}

pub fn set_pipeline(encoder: &MetalEncoder, pipeline: &MetalPipeline) {
    encoder.setComputePipelineState(pipeline);
}

pub fn set_buffer(encoder: &MetalEncoder, storage: &MetalStorage, slot: usize) {
    unsafe {
        encoder.setBuffer_offset_atIndex(Some(storage), 0, slot);
    }
}

/// Dispatch `count` threads in a 1-D grid. The threadgroup width is the
/// pipeline maximum, clamped by the options and by `count`. The encoder
/// takes the options' label.
pub fn dispatch_threads(
    encoder: &MetalEncoder,
    pipeline: &MetalPipeline,
    count: usize,
    options: &DispatchOptions,
) -> Result<(), String> {
    let pipeline_max = pipeline.maxTotalThreadsPerThreadgroup();
    if pipeline_max == 0 {
        return Err("pipeline reports zero threads per threadgroup".to_string());
    }
    let threads_per_group = options.threads_per_group(pipeline_max, count);

    let grid_size = MTLSize {
        width: count,
        height: 1,
        depth: 1,
    };
    let threadgroup_size = MTLSize {
        width: threads_per_group,
        height: 1,
        depth: 1,
    };
    encoder.setLabel(Some(&NSString::from_str(&options.label)));
    encoder.dispatchThreads_threadsPerThreadgroup(grid_size, threadgroup_size);
    Ok(())
}

pub fn end_encoding(encoder: MetalEncoder) {
    encoder.endEncoding();
}

pub fn commit(command_buffer: &MetalCommandBuffer) -> Result<(), String> {
    command_buffer.commit();
    if command_buffer.status() == MTLCommandBufferStatus::Error {
        return Err(command_error(command_buffer));
    }
    Ok(())
}

pub fn wait_until_completed(command_buffer: &MetalCommandBuffer) -> Result<(), String> {
    command_buffer.waitUntilCompleted();
    let status = command_buffer.status();
    if status == MTLCommandBufferStatus::Completed {
        Ok(())
    } else if status == MTLCommandBufferStatus::Error {
        Err(command_error(command_buffer))
    } else {
        Err(format!("command buffer finished in state {:?}", status))
    }
}

fn command_error(command_buffer: &MetalCommandBuffer) -> String {
    match command_buffer.error() {
        Some(error) => error.localizedDescription().to_string(),
        None => "command buffer reported an error".to_string(),
    }
}
