//! Device buffer handles and kernel arguments.
//!
//! `GpuBuffer` pairs backend storage with the device it lives on and its
//! logical shape. Buffers are owned by the caller; an invocation only reads
//! the device and the shape and binds the storage.

use std::fmt;

use crate::backend::Backend;

/// Element type of a device buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    F32,
    F64,
    I32,
    I64,
}

impl DType {
    /// Byte size per element.
    pub fn byte_size(self) -> usize {
        match self {
            DType::F32 | DType::I32 => 4,
            DType::F64 | DType::I64 => 8,
        }
    }
}

/// Host element types that can be uploaded into a buffer.
pub trait Element: Copy + Default + 'static {
    const DTYPE: DType;
}

impl Element for f32 {
    const DTYPE: DType = DType::F32;
}

impl Element for f64 {
    const DTYPE: DType = DType::F64;
}

impl Element for i32 {
    const DTYPE: DType = DType::I32;
}

impl Element for i64 {
    const DTYPE: DType = DType::I64;
}

/// Caller-owned handle to a device-resident array.
pub struct GpuBuffer<B: Backend> {
    device: B::Device,
    shape: Vec<usize>,
    dtype: DType,
    storage: B::Storage,
}

impl<B: Backend> GpuBuffer<B> {
    /// Wrap existing device storage. `shape` is in elements, not bytes.
    pub fn new(device: B::Device, shape: Vec<usize>, dtype: DType, storage: B::Storage) -> Self {
        GpuBuffer {
            device,
            shape,
            dtype,
            storage,
        }
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn storage(&self) -> &B::Storage {
        &self.storage
    }

    /// Total element count (product of the shape), `None` on overflow.
    /// A zero-dimensional shape holds one element.
    pub fn element_count(&self) -> Option<usize> {
        element_count(&self.shape)
    }
}

impl<B: Backend> fmt::Debug for GpuBuffer<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuBuffer")
            .field("device", &B::describe_device(&self.device))
            .field("shape", &self.shape)
            .field("dtype", &self.dtype)
            .finish()
    }
}

pub(crate) fn element_count(shape: &[usize]) -> Option<usize> {
    shape.iter().try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
}

/// One entry of a kernel argument list.
///
/// Only `Buffer` can be bound; the other variants exist so callers holding a
/// mixed argument list get a validation error instead of a silent skip.
pub enum KernelArg<'a, B: Backend> {
    Buffer(&'a GpuBuffer<B>),
    /// A host-side scalar. Upload it into a 1-element buffer first.
    Scalar(f64),
    /// Host memory that has not been uploaded to the device.
    Host(&'a [u8]),
}

impl<'a, B: Backend> KernelArg<'a, B> {
    /// Name of the argument's kind, used in validation errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            KernelArg::Buffer(_) => "device buffer",
            KernelArg::Scalar(_) => "host scalar",
            KernelArg::Host(_) => "host slice",
        }
    }
}

// Manual impls: derive would require `B: Clone`.
impl<'a, B: Backend> Clone for KernelArg<'a, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, B: Backend> Copy for KernelArg<'a, B> {}

impl<'a, B: Backend> From<&'a GpuBuffer<B>> for KernelArg<'a, B> {
    fn from(buffer: &'a GpuBuffer<B>) -> Self {
        KernelArg::Buffer(buffer)
    }
}

impl<'a, B: Backend> From<f64> for KernelArg<'a, B> {
    fn from(value: f64) -> Self {
        KernelArg::Scalar(value)
    }
}
