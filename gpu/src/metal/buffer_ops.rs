//! Metal buffer helpers — wrap shared-storage MTLBuffers as `GpuBuffer`s.
//!
//! Buffer ownership stays with the caller; these helpers exist so callers
//! and tests can put host data on the device and read results back.

use std::ptr::NonNull;

use objc2::rc::Retained;
use objc2::runtime::ProtocolObject;
use objc2_metal::{MTLBuffer, MTLDevice, MTLResourceOptions};

use super::device_init::MetalDevice;
use super::Metal;
use crate::buffer::{element_count, Element, GpuBuffer};

pub type MetalStorage = Retained<ProtocolObject<dyn MTLBuffer>>;

/// Copy `data` into a new shared-storage buffer with the given shape.
///
/// Returns `None` if `data.len()` does not match the shape, the shape is
/// empty, or Metal refuses the allocation.
pub fn from_slice<T: Element>(
    device: &MetalDevice,
    shape: Vec<usize>,
    data: &[T],
) -> Option<GpuBuffer<Metal>> {
    if element_count(&shape)? != data.len() || data.is_empty() {
        return None;
    }

    let byte_size = std::mem::size_of_val(data);
    let ptr = NonNull::new(data.as_ptr() as *mut std::ffi::c_void)?;
    let storage = unsafe {
        device.newBufferWithBytes_length_options(
            ptr,
            byte_size,
            MTLResourceOptions::StorageModeShared,
        )
    }?;

    Some(GpuBuffer::new(device.clone(), shape, T::DTYPE, storage))
}

/// Allocate a zero-initialized shared-storage buffer for `shape`.
pub fn zeros<T: Element>(device: &MetalDevice, shape: Vec<usize>) -> Option<GpuBuffer<Metal>> {
    let byte_size = element_count(&shape)?.checked_mul(std::mem::size_of::<T>())?;
    if byte_size == 0 {
        return None;
    }

    let storage =
        device.newBufferWithLength_options(byte_size, MTLResourceOptions::StorageModeShared)?;

    Some(GpuBuffer::new(device.clone(), shape, T::DTYPE, storage))
}

/// Copy the buffer contents back to host memory.
///
/// Returns `None` if `T` does not match the buffer's dtype.
pub fn read_to_vec<T: Element>(buffer: &GpuBuffer<Metal>) -> Option<Vec<T>> {
    if buffer.dtype() != T::DTYPE {
        return None;
    }
    let count = buffer.element_count()?;
    let byte_size = count.checked_mul(std::mem::size_of::<T>())?;
    if byte_size > buffer.storage().length() {
        return None;
    }

    let src = buffer.storage().contents().as_ptr() as *const T;
    let mut out = vec![T::default(); count];
    unsafe {
        std::ptr::copy_nonoverlapping(src, out.as_mut_ptr(), count);
    }
    Some(out)
}
