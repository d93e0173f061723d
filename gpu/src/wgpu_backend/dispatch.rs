//! WebGPU compute dispatch — records one compute pass and submits it.
//!
//! wgpu binds resources through a bind group rather than per-slot calls, so
//! the encoder collects slot bindings and the grid size, and the pass is
//! recorded when encoding ends.

use std::sync::Arc;

use log::{debug, trace};

use super::buffer_ops::WgpuStorage;
use super::compile::WgpuPipeline;
use super::device_init::WgpuDevice;
use crate::config::DispatchOptions;

/// Command encoder awaiting submission.
pub struct WgpuCommandBuffer {
    ctx: WgpuDevice,
    encoder: Option<wgpu::CommandEncoder>,
    submission: Option<wgpu::SubmissionIndex>,
}

/// State of the compute pass being encoded.
pub struct WgpuEncoder {
    pipeline: Option<WgpuPipeline>,
    bindings: Vec<(u32, WgpuStorage)>,
    workgroups: Option<(u32, u32, u32)>,
    label: String,
}

pub fn command_buffer(ctx: &WgpuDevice) -> Result<WgpuCommandBuffer, String> {
    // Errors raised before this invocation began are not its failures.
    if let Some(stale) = ctx.take_uncaptured_error() {
        debug!("[wgpu] discarding error from earlier work: {}", stale);
    }
    let encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("gpu_invoke_dispatch"),
        });
    Ok(WgpuCommandBuffer {
        ctx: Arc::clone(ctx),
        encoder: Some(encoder),
        submission: None,
    })
}

pub fn compute_encoder(command_buffer: &WgpuCommandBuffer) -> Result<WgpuEncoder, String> {
    if command_buffer.encoder.is_none() {
        return Err("command buffer was already submitted".to_string());
    }
    Ok(WgpuEncoder {
        pipeline: None,
        bindings: Vec::new(),
        workgroups: None,
        label: String::new(),
    })
}

pub fn set_pipeline(encoder: &mut WgpuEncoder, pipeline: &WgpuPipeline) {
    encoder.pipeline = Some(Arc::clone(pipeline));
}

pub fn set_buffer(
    encoder: &mut WgpuEncoder,
    storage: &WgpuStorage,
    slot: usize,
) -> Result<(), String> {
    let binding = u32::try_from(slot).map_err(|_| format!("slot {} out of range", slot))?;
    encoder.bindings.push((binding, Arc::clone(storage)));
    Ok(())
}

/// Split `count` threads into workgroups of `workgroup_size`, spilling into
/// the y dimension when x would exceed `max_per_dimension`.
///
/// Kernels dispatched with more than `max_per_dimension` workgroups must
/// compute their linear index as
/// `gid.x + gid.y * num_workgroups.x * workgroup_size`.
pub fn workgroup_grid(
    count: usize,
    workgroup_size: u32,
    max_per_dimension: u32,
) -> Result<(u32, u32, u32), String> {
    if workgroup_size == 0 || max_per_dimension == 0 {
        return Err("workgroup size and dimension limit must be non-zero".to_string());
    }
    let groups = count.div_ceil(workgroup_size as usize);
    let max = max_per_dimension as usize;
    if groups <= max {
        return Ok((groups as u32, 1, 1));
    }
    let rows = groups.div_ceil(max);
    if rows > max {
        return Err(format!(
            "{} threads need {} workgroups, more than {}x{} allows",
            count, groups, max, max
        ));
    }
    Ok((max_per_dimension, rows as u32, 1))
}

pub fn dispatch_threads(
    encoder: &mut WgpuEncoder,
    pipeline: &WgpuPipeline,
    count: usize,
    options: &DispatchOptions,
) -> Result<(), String> {
    if pipeline.workgroup_size != [options.workgroup_size, 1, 1] {
        return Err(format!(
            "kernel declares @workgroup_size{:?}, dispatch options expect ({}, 1, 1)",
            pipeline.workgroup_size, options.workgroup_size
        ));
    }
    let grid = workgroup_grid(
        count,
        options.workgroup_size,
        pipeline.max_workgroups_per_dimension,
    )?;
    trace!("[wgpu] {} threads -> workgroups {:?}", count, grid);
    encoder.workgroups = Some(grid);
    encoder.label = options.label.clone();
    Ok(())
}

/// Build the bind group and record the compute pass.
pub fn end_encoding(
    command_buffer: &mut WgpuCommandBuffer,
    encoder: WgpuEncoder,
) -> Result<(), String> {
    let ctx = Arc::clone(&command_buffer.ctx);
    let command_encoder = command_buffer
        .encoder
        .as_mut()
        .ok_or("command buffer was already submitted")?;
    let pipeline = encoder.pipeline.ok_or("no pipeline bound")?;
    let (x, y, z) = encoder.workgroups.ok_or("dispatch grid was never set")?;

    let entries: Vec<wgpu::BindGroupEntry> = encoder
        .bindings
        .iter()
        .map(|(binding, buffer)| wgpu::BindGroupEntry {
            binding: *binding,
            resource: buffer.as_entire_binding(),
        })
        .collect();

    ctx.validation_scope(|| {
        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(encoder.label.as_str()),
            layout: &pipeline.bind_group_layout,
            entries: &entries,
        });

        let mut pass = command_encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(encoder.label.as_str()),
            timestamp_writes: None,
        });
        pass.set_pipeline(&pipeline.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.dispatch_workgroups(x, y, z);
    })
}

pub fn commit(command_buffer: &mut WgpuCommandBuffer) -> Result<(), String> {
    let encoder = command_buffer
        .encoder
        .take()
        .ok_or("command buffer was already submitted")?;
    let ctx = &command_buffer.ctx;
    let index = ctx.validation_scope(|| ctx.queue.submit(std::iter::once(encoder.finish())))?;
    command_buffer.submission = Some(index);
    Ok(())
}

/// Block until the submission finishes; errors raised while it ran are
/// reported here.
pub fn wait_until_completed(command_buffer: WgpuCommandBuffer) -> Result<(), String> {
    let WgpuCommandBuffer {
        ctx, submission, ..
    } = command_buffer;
    let index = submission.ok_or("command buffer was never committed")?;

    let (tx, rx) = std::sync::mpsc::channel();
    ctx.queue.on_submitted_work_done(move || {
        let _ = tx.send(());
    });
    let _ = ctx.device.poll(wgpu::Maintain::wait_for(index));
    let completed = match rx.try_recv() {
        Ok(()) => true,
        Err(_) => {
            let _ = ctx.device.poll(wgpu::Maintain::Wait);
            rx.try_recv().is_ok()
        }
    };

    if let Some(error) = ctx.take_uncaptured_error() {
        return Err(error);
    }
    if completed {
        Ok(())
    } else {
        Err("GPU did not report completion (device lost?)".to_string())
    }
}
