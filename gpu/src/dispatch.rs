//! Kernel invocation — validate, compile if needed, encode, commit, wait.

use log::{debug, trace};

use crate::backend::Backend;
use crate::buffer::{GpuBuffer, KernelArg};
use crate::config::DispatchOptions;
use crate::error::{DispatchStep, KernelError};
use crate::kernel_cache::KernelCache;
use crate::validate::validate;

/// Runs custom compute kernels over caller-owned buffers.
///
/// Owns the kernel cache, so repeated calls with the same device, function
/// name and source reuse one compiled pipeline. `invoke` takes `&mut self`;
/// share a dispatcher between threads behind a mutex.
pub struct Dispatcher<B: Backend> {
    cache: KernelCache<B>,
    options: DispatchOptions,
}

impl<B: Backend> Default for Dispatcher<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> Dispatcher<B> {
    pub fn new() -> Self {
        Self::with_options(DispatchOptions::default())
    }

    pub fn with_options(options: DispatchOptions) -> Self {
        Dispatcher {
            cache: KernelCache::new(),
            options,
        }
    }

    pub fn options(&self) -> &DispatchOptions {
        &self.options
    }

    pub fn cache(&self) -> &KernelCache<B> {
        &self.cache
    }

    /// Run `function_name` from `source` once over `args` and wait for the GPU.
    ///
    /// Buffers are bound to argument slots in order (`args[i]` → slot `i`).
    /// The grid has one thread per element of the first buffer; when that
    /// buffer is empty the kernel is compiled but not dispatched.
    ///
    /// Returns on GPU completion. On error nothing is retried, and the device
    /// contents are unspecified if the failure happened after commit.
    pub fn invoke(
        &mut self,
        function_name: &str,
        args: &[KernelArg<'_, B>],
        source: &str,
    ) -> Result<(), KernelError> {
        let validated = validate(function_name, args, source)?;
        let grid_size = validated.grid_size;

        let kernel = self
            .cache
            .ensure_compiled(validated.device(), function_name, source)?;

        if grid_size == 0 {
            debug!(
                "[{}] '{}': first buffer is empty, nothing to dispatch",
                B::NAME,
                function_name
            );
            return Ok(());
        }

        let mut command_buffer = B::command_buffer(&kernel.queue)
            .map_err(|e| KernelError::dispatch(DispatchStep::CommandBuffer, e))?;
        let mut encoder = B::compute_encoder(&mut command_buffer)
            .map_err(|e| KernelError::dispatch(DispatchStep::Encoder, e))?;

        B::set_pipeline(&mut encoder, &kernel.pipeline)
            .map_err(|e| KernelError::dispatch(DispatchStep::BindPipeline, e))?;

        for (slot, buffer) in validated.buffers.iter().enumerate() {
            trace!(
                "[{}] bind slot {} shape {:?} {:?}",
                B::NAME,
                slot,
                buffer.shape(),
                buffer.dtype()
            );
            B::set_buffer(&mut encoder, buffer.storage(), slot)
                .map_err(|e| KernelError::dispatch(DispatchStep::BindBuffer { slot }, e))?;
        }

        B::dispatch_threads(&mut encoder, &kernel.pipeline, grid_size, &self.options)
            .map_err(|e| KernelError::dispatch(DispatchStep::DispatchGrid, e))?;
        B::end_encoding(&mut command_buffer, encoder)
            .map_err(|e| KernelError::dispatch(DispatchStep::EndEncoding, e))?;
        B::commit(&mut command_buffer)
            .map_err(|e| KernelError::dispatch(DispatchStep::Commit, e))?;

        debug!(
            "[{}] '{}' committed: {} threads, {} buffers",
            B::NAME,
            function_name,
            grid_size,
            validated.buffers.len()
        );

        B::wait_until_completed(command_buffer).map_err(KernelError::Execution)
    }

    /// [`invoke`](Self::invoke) for an argument list made only of buffers.
    pub fn invoke_buffers(
        &mut self,
        function_name: &str,
        buffers: &[&GpuBuffer<B>],
        source: &str,
    ) -> Result<(), KernelError> {
        let args: Vec<KernelArg<'_, B>> = buffers.iter().map(|b| KernelArg::Buffer(*b)).collect();
        self.invoke(function_name, &args, source)
    }
}
