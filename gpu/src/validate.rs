//! Argument validation — runs before anything is compiled or encoded.

use crate::backend::Backend;
use crate::buffer::{GpuBuffer, KernelArg};
use crate::error::ValidationError;

/// Arguments that passed validation.
pub struct ValidatedArgs<'a, B: Backend> {
    /// Buffers in argument order; never empty.
    pub buffers: Vec<&'a GpuBuffer<B>>,
    /// Element count of the first buffer.
    pub grid_size: usize,
}

impl<'a, B: Backend> ValidatedArgs<'a, B> {
    /// Device shared by every buffer.
    pub fn device(&self) -> &'a B::Device {
        self.buffers[0].device()
    }
}

/// Check the function name, the source, and that every argument is a device
/// buffer on the same device as the first one.
pub fn validate<'a, B: Backend>(
    function_name: &str,
    args: &[KernelArg<'a, B>],
    source: &str,
) -> Result<ValidatedArgs<'a, B>, ValidationError> {
    check_function_name(function_name)?;
    if source.trim().is_empty() {
        return Err(ValidationError::EmptySource);
    }

    let mut buffers = Vec::with_capacity(args.len());
    for (index, arg) in args.iter().enumerate() {
        match arg {
            KernelArg::Buffer(buffer) => buffers.push(*buffer),
            other => {
                return Err(ValidationError::NotADeviceBuffer {
                    index,
                    found: other.kind_name(),
                })
            }
        }
    }

    let first = match buffers.first() {
        Some(first) => *first,
        None => return Err(ValidationError::NoArguments),
    };

    for (index, buffer) in buffers.iter().enumerate().skip(1) {
        if !B::same_device(first.device(), buffer.device()) {
            return Err(ValidationError::DeviceMismatch {
                index,
                expected: B::describe_device(first.device()),
                found: B::describe_device(buffer.device()),
            });
        }
    }

    let grid_size = first
        .element_count()
        .ok_or_else(|| ValidationError::ElementCountOverflow {
            shape: first.shape().to_vec(),
        })?;

    Ok(ValidatedArgs { buffers, grid_size })
}

fn check_function_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::EmptyFunctionName);
    }
    if name.chars().any(char::is_control) {
        return Err(ValidationError::MalformedFunctionName(name.to_string()));
    }
    Ok(())
}
