//! WebGPU buffer helpers — upload host data, read results back.

use std::sync::Arc;

use wgpu::util::DeviceExt;

use super::device_init::WgpuDevice;
use super::Wgpu;
use crate::buffer::{element_count, Element, GpuBuffer};

pub type WgpuStorage = Arc<wgpu::Buffer>;

const STORAGE_USAGE: wgpu::BufferUsages = wgpu::BufferUsages::STORAGE
    .union(wgpu::BufferUsages::COPY_SRC)
    .union(wgpu::BufferUsages::COPY_DST);

fn as_bytes<T: Element>(data: &[T]) -> &[u8] {
    unsafe { std::slice::from_raw_parts(data.as_ptr() as *const u8, std::mem::size_of_val(data)) }
}

/// Copy `data` into a new storage buffer with the given shape.
pub fn from_slice<T: Element>(
    ctx: &WgpuDevice,
    shape: Vec<usize>,
    data: &[T],
) -> Option<GpuBuffer<Wgpu>> {
    if element_count(&shape)? != data.len() || data.is_empty() {
        return None;
    }

    let buffer = ctx
        .device
        .create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("gpu_invoke_buffer"),
            contents: as_bytes(data),
            usage: STORAGE_USAGE,
        });

    Some(GpuBuffer::new(
        Arc::clone(ctx),
        shape,
        T::DTYPE,
        Arc::new(buffer),
    ))
}

/// Allocate a zero-initialized storage buffer for `shape`.
pub fn zeros<T: Element>(ctx: &WgpuDevice, shape: Vec<usize>) -> Option<GpuBuffer<Wgpu>> {
    let byte_size = element_count(&shape)?.checked_mul(std::mem::size_of::<T>())?;
    if byte_size == 0 {
        return None;
    }

    let buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("gpu_invoke_buffer"),
        size: byte_size as u64,
        usage: STORAGE_USAGE,
        mapped_at_creation: false,
    });

    Some(GpuBuffer::new(
        Arc::clone(ctx),
        shape,
        T::DTYPE,
        Arc::new(buffer),
    ))
}

/// Read buffer contents back to host memory via a staging buffer.
///
/// Returns `None` if `T` does not match the buffer's dtype or the map fails.
pub fn read_to_vec<T: Element>(buffer: &GpuBuffer<Wgpu>) -> Option<Vec<T>> {
    if buffer.dtype() != T::DTYPE {
        return None;
    }
    let ctx = buffer.device();
    let count = buffer.element_count()?;
    let read_size = count.checked_mul(buffer.dtype().byte_size())? as u64;
    if read_size > buffer.storage().size() {
        return None;
    }

    let staging = ctx.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("gpu_invoke_staging"),
        size: read_size,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("gpu_invoke_readback"),
        });
    encoder.copy_buffer_to_buffer(buffer.storage(), 0, &staging, 0, read_size);
    ctx.queue.submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    let _ = ctx.device.poll(wgpu::Maintain::Wait);

    match rx.recv() {
        Ok(Ok(())) => {
            let mut out = vec![T::default(); count];
            {
                let mapped = slice.get_mapped_range();
                unsafe {
                    std::ptr::copy_nonoverlapping(
                        mapped.as_ptr(),
                        out.as_mut_ptr() as *mut u8,
                        read_size as usize,
                    );
                }
            }
            staging.unmap();
            Some(out)
        }
        _ => None,
    }
}
